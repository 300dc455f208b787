use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub enum Backend {
    Memory { max_entries: Option<u64> },
    Memcached { addr: String, max_idle: usize, connect_timeout: Duration },
}

pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub backend: Backend,
    pub request_timeout: Option<Duration>,
    pub allowed_origins: Vec<String>,
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_HTTP_PORT: u16 = 8080;
    const DEFAULT_MEMCACHED_ADDR: &str = "127.0.0.1:11211";
    const DEFAULT_MAX_IDLE: usize = 8;
    const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1000;
    const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let backend = match lookup("MEMPROXY_BACKEND").as_deref() {
            Some("memcached") => Backend::Memcached {
                addr: lookup("MEMPROXY_MEMCACHED_ADDR")
                    .unwrap_or_else(|| Self::DEFAULT_MEMCACHED_ADDR.to_string()),
                max_idle: parse_or(&lookup, "MEMPROXY_MEMCACHED_MAX_IDLE", Self::DEFAULT_MAX_IDLE),
                connect_timeout: Duration::from_millis(parse_or(
                    &lookup,
                    "MEMPROXY_CONNECT_TIMEOUT_MS",
                    Self::DEFAULT_CONNECT_TIMEOUT_MS,
                )),
            },
            Some("memory") | None => Backend::Memory {
                max_entries: lookup("MEMPROXY_MAX_ENTRIES").and_then(|raw| match raw.parse() {
                    Ok(n) => Some(n),
                    Err(_) => {
                        warn!("MEMPROXY_MAX_ENTRIES={} is not a number, store is unbounded", raw);
                        None
                    }
                }),
            },
            Some(other) => {
                warn!("Unknown MEMPROXY_BACKEND '{}', using in-process memory store", other);
                Backend::Memory { max_entries: None }
            }
        };

        let timeout_ms = parse_or(&lookup, "MEMPROXY_REQUEST_TIMEOUT_MS", Self::DEFAULT_REQUEST_TIMEOUT_MS);

        Self {
            host: lookup("MEMPROXY_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            http_port: parse_or(&lookup, "MEMPROXY_HTTP_PORT", Self::DEFAULT_HTTP_PORT),
            backend,
            request_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            allowed_origins: lookup("MEMPROXY_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

impl Backend {
    pub fn name(&self) -> &str {
        match self {
            Backend::Memory { .. } => "memory",
            Backend::Memcached { .. } => "memcached",
        }
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{}={} could not be parsed, using default {}", name, raw, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.backend.name(), "memory");
        assert_eq!(config.request_timeout, Some(Duration::from_millis(5000)));
        assert_eq!(config.allowed_origins, vec!["*".to_string()]);
    }

    #[test]
    fn test_memcached_backend() {
        let config = config_from(&[
            ("MEMPROXY_BACKEND", "memcached"),
            ("MEMPROXY_MEMCACHED_ADDR", "cache:11211"),
            ("MEMPROXY_MEMCACHED_MAX_IDLE", "2"),
        ]);
        match config.backend {
            Backend::Memcached { addr, max_idle, connect_timeout } => {
                assert_eq!(addr, "cache:11211");
                assert_eq!(max_idle, 2);
                assert_eq!(connect_timeout, Duration::from_millis(1000));
            }
            Backend::Memory { .. } => panic!("Expected memcached backend"),
        }
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let config = config_from(&[("MEMPROXY_REQUEST_TIMEOUT_MS", "0")]);
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_bad_port_falls_back() {
        let config = config_from(&[("MEMPROXY_HTTP_PORT", "http"), ("MEMPROXY_HOST", "127.0.0.1")]);
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_origins_are_split() {
        let config = config_from(&[("MEMPROXY_ALLOWED_ORIGINS", "http://a.test, http://b.test,")]);
        assert_eq!(config.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }
}
