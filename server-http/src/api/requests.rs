//! Decoders turning HTTP requests into operation request values.
//!
//! Each one rejects with [`DecodeError`], so a malformed request is answered
//! before any handler, endpoint or cache call runs.

use super::responses::DecodeError;
use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use bytes::Bytes;
use serde::de::DeserializeOwned;

/// JSON body, parsed whatever the `Content-Type` says.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = DecodeError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| DecodeError::new(e.body_text()))?;

        serde_json::from_slice(&body)
            .map(JsonBody)
            .map_err(|e| DecodeError::new(format!("invalid JSON body: {}", e)))
    }
}

/// The `key` query parameter. Required.
pub struct KeyParam(pub String);

impl<S: Send + Sync> FromRequestParts<S> for KeyParam {
    type Rejection = DecodeError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        query_pairs(parts)?
            .into_iter()
            .find(|(name, _)| name == "key")
            .map(|(_, value)| KeyParam(value))
            .ok_or_else(|| DecodeError::new("missing required parameter 'key'"))
    }
}

/// Every `keys` query parameter, in order. At least one is required.
pub struct KeysParam(pub Vec<String>);

impl<S: Send + Sync> FromRequestParts<S> for KeysParam {
    type Rejection = DecodeError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let keys: Vec<String> = query_pairs(parts)?
            .into_iter()
            .filter(|(name, _)| name == "keys")
            .map(|(_, value)| value)
            .collect();

        if keys.is_empty() {
            return Err(DecodeError::new("missing required parameter 'keys'"));
        }
        Ok(KeysParam(keys))
    }
}

fn query_pairs(parts: &Parts) -> Result<Vec<(String, String)>, DecodeError> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
        .map_err(|e| DecodeError::new(e.body_text()))?;
    Ok(pairs)
}
