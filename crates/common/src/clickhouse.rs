mod client;
mod event_repository;

pub use client::*;
pub use event_repository::*;
