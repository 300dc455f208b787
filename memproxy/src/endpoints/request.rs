use crate::domain::CacheItem;
use serde::Deserialize;

/// Add, CompareAndSwap, Replace and Set all take a whole item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemRequest {
    pub item: CacheItem,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRequest {
    pub key: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct IncrDecrRequest {
    #[serde(alias = "Key")]
    pub key: String,
    #[serde(alias = "Delta")]
    pub delta: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetMultiRequest {
    pub keys: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TouchRequest {
    #[serde(alias = "Key")]
    pub key: String,
    #[serde(alias = "Seconds")]
    pub seconds: i32,
}

/// One case per cache operation. The transport builds the case for the route
/// it matched, so an operation can only ever receive its own request shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Add(ItemRequest),
    CompareAndSwap(ItemRequest),
    Decrement(IncrDecrRequest),
    Delete(KeyRequest),
    Get(KeyRequest),
    GetMulti(GetMultiRequest),
    Increment(IncrDecrRequest),
    Replace(ItemRequest),
    Set(ItemRequest),
    Touch(TouchRequest),
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Add(_) => "Add",
            Request::CompareAndSwap(_) => "CompareAndSwap",
            Request::Decrement(_) => "Decrement",
            Request::Delete(_) => "Delete",
            Request::Get(_) => "Get",
            Request::GetMulti(_) => "GetMulti",
            Request::Increment(_) => "Increment",
            Request::Replace(_) => "Replace",
            Request::Set(_) => "Set",
            Request::Touch(_) => "Touch",
        }
    }
}
