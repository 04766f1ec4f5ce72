// src/llm/mod.rs
pub mod classifier;
pub mod client;

pub use classifier::{company_matches, DocumentClassifier, PeriodClassifier};
pub use client::{ChatClient, ChatMessage, ChatModel};
