//! Memcached ASCII protocol framing.
//!
//! Commands are encoded as a single text line, followed by a data block for
//! storage commands. Replies are decoded one line at a time; `VALUE` lines
//! are only emitted once their data block has fully arrived.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use shared::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Longest reply line accepted before the stream is considered garbage.
const MAX_LINE_LENGTH: usize = 2048;

/// Largest data block accepted in a `VALUE` reply. Memcached's default item
/// limit is 1 MiB; anything past this is treated as a corrupt stream.
const MAX_VALUE_LENGTH: usize = 2 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreVerb {
    Set,
    Add,
    Replace,
    Cas(u64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithVerb {
    Incr,
    Decr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Store {
        verb: StoreVerb,
        key: String,
        flags: u32,
        exptime: i32,
        data: Bytes,
    },
    Gets {
        keys: Vec<String>,
    },
    Delete {
        key: String,
    },
    Arith {
        verb: ArithVerb,
        key: String,
        delta: u64,
    },
    Touch {
        key: String,
        exptime: i32,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Value {
        key: String,
        flags: u32,
        cas: u64,
        data: Bytes,
    },
    End,
    Stored,
    NotStored,
    Exists,
    NotFound,
    Deleted,
    Touched,
    Number(u64),
    /// `ERROR`, `CLIENT_ERROR <msg>` or `SERVER_ERROR <msg>`
    Error(String),
}

impl Reply {
    /// Whether this reply ends the server's answer to a command.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Reply::Value { .. })
    }
}

#[derive(Debug, Default)]
pub struct MemcacheCodec;

impl Encoder<Command> for MemcacheCodec {
    type Error = Error;

    fn encode(&mut self, command: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = match &command {
            Command::Store { verb, key, flags, exptime, data } => {
                let len = data.len();
                match verb {
                    StoreVerb::Set => format!("set {key} {flags} {exptime} {len}\r\n"),
                    StoreVerb::Add => format!("add {key} {flags} {exptime} {len}\r\n"),
                    StoreVerb::Replace => format!("replace {key} {flags} {exptime} {len}\r\n"),
                    StoreVerb::Cas(cas) => format!("cas {key} {flags} {exptime} {len} {cas}\r\n"),
                }
            }
            Command::Gets { keys } => format!("gets {}\r\n", keys.join(" ")),
            Command::Delete { key } => format!("delete {key}\r\n"),
            Command::Arith { verb: ArithVerb::Incr, key, delta } => format!("incr {key} {delta}\r\n"),
            Command::Arith { verb: ArithVerb::Decr, key, delta } => format!("decr {key} {delta}\r\n"),
            Command::Touch { key, exptime } => format!("touch {key} {exptime}\r\n"),
        };

        dst.put_slice(line.as_bytes());
        if let Command::Store { data, .. } = &command {
            dst.reserve(data.len() + 2);
            dst.put_slice(data);
            dst.put_slice(b"\r\n");
        }
        Ok(())
    }
}

impl Decoder for MemcacheCodec {
    type Item = Reply;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(line_end) = src.windows(2).position(|w| w == b"\r\n") else {
            if src.len() > MAX_LINE_LENGTH {
                return Err(protocol_error("reply line too long"));
            }
            return Ok(None);
        };

        let line = std::str::from_utf8(&src[..line_end])
            .map_err(|_| protocol_error("reply line is not utf-8"))?
            .to_string();

        if let Some(header) = line.strip_prefix("VALUE ") {
            let (key, flags, len, cas) = parse_value_header(header)?;
            let frame_len = (line_end + 2)
                .checked_add(len)
                .and_then(|n| n.checked_add(2))
                .ok_or_else(|| protocol_error("VALUE length overflows"))?;
            if src.len() < frame_len {
                src.reserve(frame_len - src.len());
                return Ok(None);
            }
            if &src[frame_len - 2..frame_len] != b"\r\n" {
                return Err(protocol_error("data block not terminated by CRLF"));
            }

            src.advance(line_end + 2);
            let data = src.split_to(len).freeze();
            src.advance(2);
            return Ok(Some(Reply::Value { key, flags, cas, data }));
        }

        src.advance(line_end + 2);
        let reply = match line.as_str() {
            "END" => Reply::End,
            "STORED" => Reply::Stored,
            "NOT_STORED" => Reply::NotStored,
            "EXISTS" => Reply::Exists,
            "NOT_FOUND" => Reply::NotFound,
            "DELETED" => Reply::Deleted,
            "TOUCHED" => Reply::Touched,
            "ERROR" => Reply::Error("ERROR".to_string()),
            other if other.starts_with("CLIENT_ERROR") || other.starts_with("SERVER_ERROR") => {
                Reply::Error(other.to_string())
            }
            other => match other.trim_end().parse::<u64>() {
                Ok(n) => Reply::Number(n),
                Err(_) => return Err(protocol_error(&format!("unexpected reply '{other}'"))),
            },
        };
        Ok(Some(reply))
    }
}

fn parse_value_header(header: &str) -> Result<(String, u32, usize, u64), Error> {
    let mut parts = header.split(' ');
    let malformed = || protocol_error(&format!("malformed VALUE line '{header}'"));

    let key = parts.next().ok_or_else(malformed)?.to_string();
    let flags = parts.next().and_then(|p| p.parse().ok()).ok_or_else(malformed)?;
    let len: usize = parts.next().and_then(|p| p.parse().ok()).ok_or_else(malformed)?;
    if len > MAX_VALUE_LENGTH {
        return Err(protocol_error(&format!("VALUE length {len} exceeds {MAX_VALUE_LENGTH}")));
    }
    let cas = match parts.next() {
        Some(p) => p.parse().map_err(|_| malformed())?,
        None => 0,
    };
    Ok((key, flags, len, cas))
}

fn protocol_error(msg: &str) -> Error {
    Error::Backend(format!("protocol: {msg}"))
}
