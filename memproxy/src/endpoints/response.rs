use crate::domain::CacheItem;
use serde::Serialize;
use shared::Error;
use std::collections::HashMap;

/// Exposes the error a response carries, if any.
///
/// Callers must check this before reading a response's payload: when an error
/// is present the payload fields hold defaults, not results.
pub trait Outcome {
    fn error(&self) -> Option<&Error>;
}

/// Reply for operations with no result payload. Serialises as `{}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BaseResponse {
    #[serde(skip)]
    pub err: Option<Error>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IncrDecrResponse {
    #[serde(rename = "newvalue")]
    pub new_value: u64,
    #[serde(skip)]
    pub err: Option<Error>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GetResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<CacheItem>,
    #[serde(skip)]
    pub err: Option<Error>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GetMultiResponse {
    pub items: HashMap<String, CacheItem>,
    #[serde(skip)]
    pub err: Option<Error>,
}

/// Mirrors [`super::Request`]: one case per result shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Base(BaseResponse),
    IncrDecr(IncrDecrResponse),
    Get(GetResponse),
    GetMulti(GetMultiResponse),
}

impl Outcome for BaseResponse {
    fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }
}

impl Outcome for IncrDecrResponse {
    fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }
}

impl Outcome for GetResponse {
    fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }
}

impl Outcome for GetMultiResponse {
    fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }
}

impl Outcome for Response {
    fn error(&self) -> Option<&Error> {
        match self {
            Response::Base(r) => r.error(),
            Response::IncrDecr(r) => r.error(),
            Response::Get(r) => r.error(),
            Response::GetMulti(r) => r.error(),
        }
    }
}

impl From<shared::Result<()>> for BaseResponse {
    fn from(result: shared::Result<()>) -> Self {
        Self { err: result.err() }
    }
}

impl From<shared::Result<u64>> for IncrDecrResponse {
    fn from(result: shared::Result<u64>) -> Self {
        match result {
            Ok(new_value) => Self { new_value, err: None },
            Err(err) => Self { new_value: 0, err: Some(err) },
        }
    }
}

impl From<shared::Result<CacheItem>> for GetResponse {
    fn from(result: shared::Result<CacheItem>) -> Self {
        match result {
            Ok(item) => Self { item: Some(item), err: None },
            Err(err) => Self { item: None, err: Some(err) },
        }
    }
}

impl From<shared::Result<HashMap<String, CacheItem>>> for GetMultiResponse {
    fn from(result: shared::Result<HashMap<String, CacheItem>>) -> Self {
        match result {
            Ok(items) => Self { items, err: None },
            Err(err) => Self { items: HashMap::new(), err: Some(err) },
        }
    }
}
