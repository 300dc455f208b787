mod codec;

pub use codec::{ArithVerb, Command, MemcacheCodec, Reply, StoreVerb};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use memproxy::domain::validate_key;
use memproxy::{CacheItem, CacheService, Context};
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::debug;

type Connection = Framed<TcpStream, MemcacheCodec>;

/// Memcached client speaking the ASCII protocol to a single server.
///
/// Connections are opened on demand and kept in a small idle pool. A
/// connection is only returned to the pool after a complete exchange, so a
/// call that errors or is dropped mid-flight never leaves a half-read reply
/// behind for the next caller.
pub struct MemcacheClient {
    addr: String,
    max_idle: usize,
    connect_timeout: Duration,
    idle: Mutex<Vec<Connection>>,
}

impl MemcacheClient {
    pub fn new(addr: impl Into<String>, max_idle: usize, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            max_idle,
            connect_timeout,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn idle_connections(&self) -> usize {
        self.idle.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    async fn acquire(&self) -> Result<Connection> {
        let pooled = self.idle.lock().unwrap_or_else(|e| e.into_inner()).pop();
        if let Some(conn) = pooled {
            return Ok(conn);
        }

        debug!("Opening memcached connection to {}", self.addr);
        let stream = timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| Error::Backend(format!("connect to {} timed out", self.addr)))??;
        stream.set_nodelay(true).ok();
        Ok(Framed::new(stream, MemcacheCodec))
    }

    fn release(&self, conn: Connection) {
        let mut idle = self.idle.lock().unwrap_or_else(|e| e.into_inner());
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
    }

    /// Sends one command and collects replies up to the terminal one.
    async fn exchange(&self, command: Command) -> Result<Vec<Reply>> {
        let mut conn = self.acquire().await?;
        conn.send(command).await?;

        let mut replies = Vec::new();
        loop {
            let reply = match conn.next().await {
                Some(reply) => reply?,
                None => return Err(Error::Backend("connection closed by server".to_string())),
            };
            let done = reply.is_terminal();
            replies.push(reply);
            if done {
                break;
            }
        }

        self.release(conn);
        Ok(replies)
    }

    /// Exchange for commands that answer with exactly one line.
    async fn single(&self, command: Command) -> Result<Reply> {
        let mut replies = self.exchange(command).await?;
        replies
            .pop()
            .ok_or_else(|| Error::Backend("empty reply".to_string()))
    }

    async fn store(&self, verb: StoreVerb, item: &CacheItem) -> Result<()> {
        validate_key(&item.key)?;
        let command = Command::Store {
            verb,
            key: item.key.clone(),
            flags: item.flags,
            exptime: item.expiration,
            data: item.value.clone(),
        };

        match self.single(command).await? {
            Reply::Stored => Ok(()),
            Reply::NotStored => Err(Error::NotStored),
            Reply::Exists => Err(Error::CasConflict),
            Reply::NotFound => Err(Error::CacheMiss),
            other => Err(unexpected(other)),
        }
    }

    async fn arith(&self, verb: ArithVerb, key: &str, delta: u64) -> Result<u64> {
        validate_key(key)?;
        let command = Command::Arith {
            verb,
            key: key.to_string(),
            delta,
        };

        match self.single(command).await? {
            Reply::Number(n) => Ok(n),
            Reply::NotFound => Err(Error::CacheMiss),
            Reply::Error(msg) if msg.contains("non-numeric") => Err(Error::NonNumeric),
            other => Err(unexpected(other)),
        }
    }

    async fn gets(&self, keys: &[String]) -> Result<HashMap<String, CacheItem>> {
        for key in keys {
            validate_key(key)?;
        }

        let replies = self.exchange(Command::Gets { keys: keys.to_vec() }).await?;
        let mut found = HashMap::with_capacity(replies.len());
        for reply in replies {
            match reply {
                Reply::Value { key, flags, cas, data } => {
                    let item = CacheItem::new(key.clone(), data)
                        .with_flags(flags)
                        .with_cas_token(cas);
                    found.insert(key, item);
                }
                Reply::End => {}
                other => return Err(unexpected(other)),
            }
        }
        Ok(found)
    }
}

fn unexpected(reply: Reply) -> Error {
    match reply {
        Reply::Error(msg) => Error::Backend(msg),
        other => Error::Backend(format!("unexpected reply {:?}", other)),
    }
}

#[async_trait]
impl CacheService for MemcacheClient {
    async fn add(&self, _ctx: &Context, item: &CacheItem) -> Result<()> {
        self.store(StoreVerb::Add, item).await
    }

    async fn compare_and_swap(&self, _ctx: &Context, item: &CacheItem) -> Result<()> {
        self.store(StoreVerb::Cas(item.cas_token), item).await
    }

    async fn decrement(&self, _ctx: &Context, key: &str, delta: u64) -> Result<u64> {
        self.arith(ArithVerb::Decr, key, delta).await
    }

    async fn delete(&self, _ctx: &Context, key: &str) -> Result<()> {
        validate_key(key)?;
        match self.single(Command::Delete { key: key.to_string() }).await? {
            Reply::Deleted => Ok(()),
            Reply::NotFound => Err(Error::CacheMiss),
            other => Err(unexpected(other)),
        }
    }

    async fn get(&self, _ctx: &Context, key: &str) -> Result<CacheItem> {
        let mut found = self.gets(&[key.to_string()]).await?;
        found.remove(key).ok_or(Error::CacheMiss)
    }

    async fn get_multi(&self, _ctx: &Context, keys: &[String]) -> Result<HashMap<String, CacheItem>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        self.gets(keys).await
    }

    async fn increment(&self, _ctx: &Context, key: &str, delta: u64) -> Result<u64> {
        self.arith(ArithVerb::Incr, key, delta).await
    }

    async fn replace(&self, _ctx: &Context, item: &CacheItem) -> Result<()> {
        self.store(StoreVerb::Replace, item).await
    }

    async fn set(&self, _ctx: &Context, item: &CacheItem) -> Result<()> {
        self.store(StoreVerb::Set, item).await
    }

    async fn touch(&self, _ctx: &Context, key: &str, seconds: i32) -> Result<()> {
        validate_key(key)?;
        let command = Command::Touch {
            key: key.to_string(),
            exptime: seconds,
        };
        match self.single(command).await? {
            Reply::Touched => Ok(()),
            Reply::NotFound => Err(Error::CacheMiss),
            other => Err(unexpected(other)),
        }
    }
}

impl std::fmt::Debug for MemcacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcacheClient")
            .field("addr", &self.addr)
            .field("max_idle", &self.max_idle)
            .field("idle", &self.idle_connections())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// Serves one connection, answering each expected request line in order.
    /// Storage commands have their data block read and checked as well.
    async fn scripted_server(script: Vec<(&'static str, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            for (expected, reply) in script {
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                let (head, body) = expected.split_once("\r\n").unwrap_or((expected, ""));
                assert_eq!(line.trim_end(), head);
                if !body.is_empty() {
                    let mut block = vec![0u8; body.len()];
                    reader.read_exact(&mut block).await.unwrap();
                    assert_eq!(block, body.as_bytes());
                }
                reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
            }
        });

        addr
    }

    /// Like `scripted_server`, but keeps the connection open without
    /// answering once the script runs out.
    async fn stalling_server(script: Vec<(&'static str, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            for (expected, reply) in script {
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                assert_eq!(line.trim_end(), expected);
                reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
            }
            std::future::pending::<()>().await;
        });

        addr
    }

    fn client(addr: String) -> MemcacheClient {
        MemcacheClient::new(addr, 4, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_set_then_get_over_one_connection() {
        let addr = scripted_server(vec![
            ("set k 7 0 5\r\nhello\r\n", "STORED\r\n"),
            ("gets k", "VALUE k 7 5 31\r\nhello\r\nEND\r\n"),
        ])
        .await;
        let client = client(addr);
        let ctx = Context::new();

        client
            .set(&ctx, &CacheItem::new("k", "hello").with_flags(7))
            .await
            .unwrap();
        let item = client.get(&ctx, "k").await.unwrap();

        assert_eq!(item.value, Bytes::from("hello"));
        assert_eq!(item.flags, 7);
        assert_eq!(item.cas_token, 31);
        assert_eq!(client.idle_connections(), 1);
    }

    #[tokio::test]
    async fn test_get_multi_is_one_round_trip() {
        let addr = scripted_server(vec![(
            "gets a b c",
            "VALUE a 0 1 1\r\nx\r\nVALUE c 0 1 2\r\nz\r\nEND\r\n",
        )])
        .await;
        let client = client(addr);

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let found = client.get_multi(&Context::new(), &keys).await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found["a"].value, Bytes::from("x"));
        assert_eq!(found["c"].value, Bytes::from("z"));
    }

    #[tokio::test]
    async fn test_status_replies_map_to_errors() {
        let addr = scripted_server(vec![
            ("add k 0 0 1\r\nv\r\n", "NOT_STORED\r\n"),
            ("cas k 0 0 1 9\r\nv\r\n", "EXISTS\r\n"),
            ("gets missing", "END\r\n"),
            ("delete missing", "NOT_FOUND\r\n"),
            ("touch missing 10", "NOT_FOUND\r\n"),
        ])
        .await;
        let client = client(addr);
        let ctx = Context::new();
        let item = CacheItem::new("k", "v");

        assert_eq!(client.add(&ctx, &item).await, Err(Error::NotStored));
        assert_eq!(
            client.compare_and_swap(&ctx, &item.clone().with_cas_token(9)).await,
            Err(Error::CasConflict)
        );
        assert_eq!(client.get(&ctx, "missing").await, Err(Error::CacheMiss));
        assert_eq!(client.delete(&ctx, "missing").await, Err(Error::CacheMiss));
        assert_eq!(client.touch(&ctx, "missing", 10).await, Err(Error::CacheMiss));
    }

    #[tokio::test]
    async fn test_counters() {
        let addr = scripted_server(vec![
            ("incr n 5", "15\r\n"),
            ("decr n 100", "0\r\n"),
            (
                "incr text 1",
                "CLIENT_ERROR cannot increment or decrement non-numeric value\r\n",
            ),
        ])
        .await;
        let client = client(addr);
        let ctx = Context::new();

        assert_eq!(client.increment(&ctx, "n", 5).await, Ok(15));
        assert_eq!(client.decrement(&ctx, "n", 100).await, Ok(0));
        assert_eq!(client.increment(&ctx, "text", 1).await, Err(Error::NonNumeric));
    }

    #[tokio::test]
    async fn test_malformed_key_never_reaches_server() {
        // nothing is listening here; validation must fail first
        let client = client("127.0.0.1:1".to_string());
        assert_eq!(client.delete(&Context::new(), "two words").await, Err(Error::MalformedKey));
        assert_eq!(client.idle_connections(), 0);
    }

    #[tokio::test]
    async fn test_closed_connection_is_a_backend_error() {
        let addr = scripted_server(vec![]).await;
        let client = client(addr);

        let result = client.delete(&Context::new(), "k").await;

        assert!(matches!(result, Err(Error::Backend(_))));
        assert_eq!(client.idle_connections(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_call_does_not_return_connection_to_pool() {
        let addr = stalling_server(vec![("delete k", "DELETED\r\n")]).await;
        let client = client(addr);
        let ctx = Context::new();

        client.delete(&ctx, "k").await.unwrap();
        assert_eq!(client.idle_connections(), 1);

        let result = tokio::time::timeout(Duration::from_millis(100), client.get(&ctx, "k")).await;

        assert!(result.is_err());
        assert_eq!(client.idle_connections(), 0);
    }
}
