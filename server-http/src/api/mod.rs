pub mod requests;
pub mod responses;

pub use requests::{JsonBody, KeyParam, KeysParam};
pub use responses::{DecodeError, Encoded, ErrorResponse, HealthResponse};
