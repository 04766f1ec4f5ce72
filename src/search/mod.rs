// src/search/mod.rs
pub mod client;
pub mod models;

pub use client::{transcript_query, SearchProvider, SerperClient};
pub use models::{SearchResponse, SearchResult};
