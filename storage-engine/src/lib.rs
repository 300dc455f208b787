//! Cache backends the gateway can sit in front of.

pub mod memcache;
pub mod moka_store;

pub use memcache::MemcacheClient;
pub use moka_store::MokaStore;

use memproxy::CacheService;
use shared::config::Backend;
use std::sync::Arc;

/// Builds the backend selected in the configuration.
pub fn from_config(backend: &Backend) -> Arc<dyn CacheService> {
    match backend {
        Backend::Memory { max_entries } => Arc::new(MokaStore::new(*max_entries)),
        Backend::Memcached { addr, max_idle, connect_timeout } => {
            Arc::new(MemcacheClient::new(addr.clone(), *max_idle, *connect_timeout))
        }
    }
}
