mod ingest_service;
mod retry;

pub use ingest_service::*;
pub use retry::*;
