mod aggregate_repository;
mod client;

pub use aggregate_repository::*;
pub use client::*;
