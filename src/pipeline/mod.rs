// src/pipeline/mod.rs
pub mod orchestrator;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_support;

pub use orchestrator::{Orchestrator, PairOutcome, RunSummary};
pub use validator::{Rejection, ValidationOutcome, Validator};
