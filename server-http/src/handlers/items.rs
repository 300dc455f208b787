use crate::api::{Encoded, JsonBody, KeyParam, KeysParam};
use crate::state::AppState;
use axum::extract::State;
use memproxy::endpoints::{
    GetMultiRequest, IncrDecrRequest, ItemRequest, KeyRequest, Request, Response, TouchRequest,
};
use memproxy::CacheItem;

async fn serve(state: &AppState, request: Request) -> Encoded<Response> {
    Encoded(state.endpoints.serve(&state.context(), request).await)
}

/// POST /item/
pub async fn set_item(
    State(state): State<AppState>,
    JsonBody(item): JsonBody<CacheItem>,
) -> Encoded<Response> {
    serve(&state, Request::Set(ItemRequest { item })).await
}

/// GET /item/?key=
pub async fn get_item(State(state): State<AppState>, KeyParam(key): KeyParam) -> Encoded<Response> {
    serve(&state, Request::Get(KeyRequest { key })).await
}

/// DELETE /item/?key=
pub async fn delete_item(
    State(state): State<AppState>,
    KeyParam(key): KeyParam,
) -> Encoded<Response> {
    serve(&state, Request::Delete(KeyRequest { key })).await
}

/// GET /items/?keys=&keys=
pub async fn get_items(
    State(state): State<AppState>,
    KeysParam(keys): KeysParam,
) -> Encoded<Response> {
    serve(&state, Request::GetMulti(GetMultiRequest { keys })).await
}

/// POST /item/add/
pub async fn add_item(
    State(state): State<AppState>,
    JsonBody(item): JsonBody<CacheItem>,
) -> Encoded<Response> {
    serve(&state, Request::Add(ItemRequest { item })).await
}

/// PUT /item/compareandswap/
pub async fn compare_and_swap_item(
    State(state): State<AppState>,
    JsonBody(item): JsonBody<CacheItem>,
) -> Encoded<Response> {
    serve(&state, Request::CompareAndSwap(ItemRequest { item })).await
}

/// PUT /item/increment/
pub async fn increment_item(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<IncrDecrRequest>,
) -> Encoded<Response> {
    serve(&state, Request::Increment(req)).await
}

/// PUT /item/decrement/
pub async fn decrement_item(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<IncrDecrRequest>,
) -> Encoded<Response> {
    serve(&state, Request::Decrement(req)).await
}

/// PUT /item/replace/
pub async fn replace_item(
    State(state): State<AppState>,
    JsonBody(item): JsonBody<CacheItem>,
) -> Encoded<Response> {
    serve(&state, Request::Replace(ItemRequest { item })).await
}

/// PUT /item/touch/
pub async fn touch_item(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<TouchRequest>,
) -> Encoded<Response> {
    serve(&state, Request::Touch(req)).await
}
