#![deny(clippy::all)]

pub mod context;
pub mod domain;
pub mod endpoints;
pub mod middleware;
pub mod ports;

pub use context::Context;
pub use domain::CacheItem;
pub use endpoints::Endpoints;
pub use middleware::{CacheServiceExt, DeadlineMiddleware, Interceptor, Layered, LoggingMiddleware};
pub use ports::CacheService;

#[cfg(test)]
pub(crate) mod testing;
