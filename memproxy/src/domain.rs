use bytes::Bytes;
use serde::{Deserialize, Serialize};
use shared::{Error, Result};

/// Longest key memcached accepts.
pub const MAX_KEY_LENGTH: usize = 250;

/// A single cache entry as it travels between the HTTP surface and a backend.
///
/// `value` is carried as base64 text on the wire. `cas_token` is opaque: it is
/// whatever the backend handed out on the last read and is only meaningful to
/// `compare_and_swap`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheItem {
    #[serde(alias = "Key")]
    pub key: String,
    #[serde(default, alias = "Value", with = "base64_bytes")]
    pub value: Bytes,
    #[serde(default, alias = "Flags")]
    pub flags: u32,
    #[serde(default, alias = "Expiration")]
    pub expiration: i32,
    #[serde(default, rename = "cas")]
    pub cas_token: u64,
}

impl CacheItem {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_expiration(mut self, seconds: i32) -> Self {
        self.expiration = seconds;
        self
    }

    pub fn with_cas_token(mut self, cas_token: u64) -> Self {
        self.cas_token = cas_token;
        self
    }
}

/// Rejects keys memcached would refuse: empty, longer than 250 bytes, or
/// containing whitespace or control characters.
pub fn validate_key(key: &str) -> Result<()> {
    let legal = !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && key.bytes().all(|b| b > b' ' && b != 0x7f);
    if legal { Ok(()) } else { Err(Error::MalformedKey) }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(de::Error::custom)
    }
}
