//! Per-operation adapters between transport-neutral request/response values
//! and [`CacheService`] calls.
//!
//! Adapters never fail themselves: whatever the cache returns, including its
//! error, is packed into the response so the transport decides success or
//! failure in one place via [`Outcome`].

mod request;
mod response;

pub use request::{GetMultiRequest, IncrDecrRequest, ItemRequest, KeyRequest, Request, TouchRequest};
pub use response::{
    BaseResponse, GetMultiResponse, GetResponse, IncrDecrResponse, Outcome, Response,
};

use crate::context::Context;
use crate::ports::CacheService;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct Endpoints {
    service: Arc<dyn CacheService>,
}

impl Endpoints {
    pub fn new(service: Arc<dyn CacheService>) -> Self {
        Self { service }
    }

    /// Routes a request to the adapter for its operation.
    pub async fn serve(&self, ctx: &Context, request: Request) -> Response {
        debug!("Dispatching {} request", request.name());
        match request {
            Request::Add(req) => Response::Base(self.add(ctx, req).await),
            Request::CompareAndSwap(req) => Response::Base(self.compare_and_swap(ctx, req).await),
            Request::Decrement(req) => Response::IncrDecr(self.decrement(ctx, req).await),
            Request::Delete(req) => Response::Base(self.delete(ctx, req).await),
            Request::Get(req) => Response::Get(self.get(ctx, req).await),
            Request::GetMulti(req) => Response::GetMulti(self.get_multi(ctx, req).await),
            Request::Increment(req) => Response::IncrDecr(self.increment(ctx, req).await),
            Request::Replace(req) => Response::Base(self.replace(ctx, req).await),
            Request::Set(req) => Response::Base(self.set(ctx, req).await),
            Request::Touch(req) => Response::Base(self.touch(ctx, req).await),
        }
    }

    pub async fn add(&self, ctx: &Context, req: ItemRequest) -> BaseResponse {
        self.service.add(ctx, &req.item).await.into()
    }

    pub async fn compare_and_swap(&self, ctx: &Context, req: ItemRequest) -> BaseResponse {
        self.service.compare_and_swap(ctx, &req.item).await.into()
    }

    pub async fn decrement(&self, ctx: &Context, req: IncrDecrRequest) -> IncrDecrResponse {
        self.service.decrement(ctx, &req.key, req.delta).await.into()
    }

    pub async fn delete(&self, ctx: &Context, req: KeyRequest) -> BaseResponse {
        self.service.delete(ctx, &req.key).await.into()
    }

    pub async fn get(&self, ctx: &Context, req: KeyRequest) -> GetResponse {
        self.service.get(ctx, &req.key).await.into()
    }

    /// Issues one batched lookup for all keys.
    pub async fn get_multi(&self, ctx: &Context, req: GetMultiRequest) -> GetMultiResponse {
        self.service.get_multi(ctx, &req.keys).await.into()
    }

    pub async fn increment(&self, ctx: &Context, req: IncrDecrRequest) -> IncrDecrResponse {
        self.service.increment(ctx, &req.key, req.delta).await.into()
    }

    pub async fn replace(&self, ctx: &Context, req: ItemRequest) -> BaseResponse {
        self.service.replace(ctx, &req.item).await.into()
    }

    pub async fn set(&self, ctx: &Context, req: ItemRequest) -> BaseResponse {
        self.service.set(ctx, &req.item).await.into()
    }

    pub async fn touch(&self, ctx: &Context, req: TouchRequest) -> BaseResponse {
        self.service.touch(ctx, &req.key, req.seconds).await.into()
    }
}

impl std::fmt::Debug for Endpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoints")
            .field("service", &"<dyn CacheService>")
            .finish()
    }
}
