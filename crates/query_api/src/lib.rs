pub mod http;
pub mod query_api;

pub use http::*;
pub use query_api::*;
