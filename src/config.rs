// src/config.rs
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SEARCH_URL: &str = "https://google.serper.dev/search";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

/// API secrets, injected into the clients that need them and never mutated afterwards.
#[derive(Clone)]
pub struct Credentials {
    pub search_api_key: String,
    pub llm_api_key: String,
}

// Keep keys out of `{:?}` log lines.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("search_api_key", &"<redacted>")
            .field("llm_api_key", &"<redacted>")
            .finish()
    }
}

/// What to do with a downloaded file that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OnFailure {
    Delete,
    Retain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    /// Also applied when validation errors out before a decision is reached.
    pub company_mismatch: OnFailure,
    pub period_unresolved: OnFailure,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            company_mismatch: OnFailure::Delete,
            period_unresolved: OnFailure::Retain,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first request.
    pub max_retries: u32,
    /// Delay before retry `n` (0-based) is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    pub retry_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub fn should_retry_status(&self, status: reqwest::StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(retry)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base: Duration::from_secs(1),
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub years: RangeInclusive<u16>,
    pub pair_timeout: Duration,
    pub max_pages: usize,
    pub model: String,
    pub llm_base_url: String,
    pub search_url: String,
    pub retry: RetryPolicy,
    /// Certificate checks are off unless asked for: many investor-relations
    /// hosts serve broken chains. This weakens transport security.
    pub verify_tls: bool,
    pub stop_on_first_match: bool,
    pub failure_policy: FailurePolicy,
    pub debug: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            years: 2018..=2024,
            pair_timeout: Duration::from_secs(30),
            max_pages: 2,
            model: DEFAULT_MODEL.to_string(),
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            retry: RetryPolicy::default(),
            verify_tls: false,
            stop_on_first_match: false,
            failure_policy: FailurePolicy::default(),
            debug: false,
        }
    }
}
