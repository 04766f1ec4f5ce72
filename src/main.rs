// src/main.rs
mod config;
mod download;
mod extractors;
mod llm;
mod pipeline;
mod roster;
mod search;
mod storage;
mod utils;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use config::{Credentials, FailurePolicy, OnFailure, PipelineConfig, RetryPolicy};
use download::Downloader;
use extractors::{TesseractOcr, TextExtractor};
use llm::{ChatClient, ChatModel, DocumentClassifier, PeriodClassifier};
use pipeline::{Orchestrator, Validator};
use roster::Roster;
use search::SerperClient;
use storage::StorageManager;
use utils::AppError;

/// Fetch earnings call transcript PDFs and file them by company, quarter and fiscal year
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Serper.dev API key
    #[arg(long, env = "SERPER_API_KEY", hide_env_values = true)]
    search_api_key: String,

    /// API key for the OpenAI-compatible chat endpoint (Groq by default)
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    llm_api_key: String,

    /// JSON object mapping ticker to company name (built-in roster if omitted)
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Only process these tickers (repeatable)
    #[arg(short, long)]
    ticker: Vec<String>,

    /// First year to search for
    #[arg(long, default_value_t = 2018)]
    start_year: u16,

    /// Last year to search for (inclusive)
    #[arg(long, default_value_t = 2024)]
    end_year: u16,

    /// Output directory for downloaded transcripts
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// Seconds to wait for a validated file per ticker and year
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Pages of text sent to the model
    #[arg(long, default_value_t = extractors::text::DEFAULT_MAX_PAGES)]
    max_pages: usize,

    #[arg(long, default_value = config::DEFAULT_MODEL)]
    model: String,

    #[arg(long, default_value = config::DEFAULT_LLM_BASE_URL)]
    llm_base_url: String,

    #[arg(long, default_value = config::DEFAULT_SEARCH_URL)]
    search_url: String,

    /// Download retries on 429/5xx and connection errors
    #[arg(long, default_value_t = 5)]
    max_retries: u32,

    /// Verify TLS certificates when downloading
    #[arg(long)]
    verify_tls: bool,

    /// Stop trying further results once one file validates
    #[arg(long)]
    stop_on_first_match: bool,

    #[arg(long, value_enum, default_value_t = OnFailure::Delete)]
    on_company_mismatch: OnFailure,

    #[arg(long, value_enum, default_value_t = OnFailure::Retain)]
    on_period_unresolved: OnFailure,

    /// Tesseract language for scanned documents
    #[arg(long, default_value = "eng")]
    ocr_lang: String,

    /// Debug mode - save annotated extracted text for each download
    #[arg(short, long)]
    debug: bool,

    /// Enable debug logging for this crate
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn credentials(&self) -> Result<Credentials, AppError> {
        for (name, value) in [("search API key", &self.search_api_key), ("LLM API key", &self.llm_api_key)] {
            if value.trim().is_empty() {
                return Err(AppError::Config(format!("{} is empty", name)));
            }
        }
        Ok(Credentials {
            search_api_key: self.search_api_key.clone(),
            llm_api_key: self.llm_api_key.clone(),
        })
    }

    fn pipeline_config(&self) -> Result<PipelineConfig, AppError> {
        if self.start_year > self.end_year {
            return Err(AppError::Config(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::Config("timeout must be at least one second".to_string()));
        }
        if self.max_pages == 0 {
            return Err(AppError::Config("max pages must be at least 1".to_string()));
        }

        Ok(PipelineConfig {
            output_dir: self.output_dir.clone(),
            years: self.start_year..=self.end_year,
            pair_timeout: Duration::from_secs(self.timeout_secs),
            max_pages: self.max_pages,
            model: self.model.clone(),
            llm_base_url: self.llm_base_url.clone(),
            search_url: self.search_url.clone(),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                ..RetryPolicy::default()
            },
            verify_tls: self.verify_tls,
            stop_on_first_match: self.stop_on_first_match,
            failure_policy: FailurePolicy {
                company_mismatch: self.on_company_mismatch,
                period_unresolved: self.on_period_unresolved,
            },
            debug: self.debug,
        })
    }

    fn load_roster(&self) -> Result<Roster, AppError> {
        match &self.roster {
            Some(path) => Roster::load(path),
            None => Ok(Roster::builtin()),
        }
    }

    /// Narrows the roster to `--ticker` entries, if any were given.
    fn select(&self, roster: Roster) -> Result<Roster, AppError> {
        let roster = roster.filtered(&self.ticker);
        if roster.is_empty() {
            return Err(AppError::Config(format!("no roster entries match tickers {:?}", self.ticker)));
        }
        Ok(roster)
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI arguments (secrets may come from the environment)
    let args = Args::parse();

    // 2. Setup logging (RUST_LOG overrides)
    utils::logging::setup_logging(args.verbose);

    // 3. Validate configuration
    let credentials = args.credentials()?;
    let config = args.pipeline_config()?;
    let full_roster = args.load_roster()?;
    // The classifier chooses among every known company, not just the selected ones.
    let company_names = full_roster.company_names();
    let roster = args.select(full_roster)?;
    tracing::info!("Starting run with {:?}", config);
    tracing::info!("Processing {} tickers for years {:?}", roster.records().len(), config.years);

    // 4. Initialize storage and clients
    let storage = Arc::new(StorageManager::new(&config.output_dir)?);
    let search = Arc::new(SerperClient::new(config.search_url.as_str(), credentials.search_api_key.as_str())?);
    let fetcher = Arc::new(Downloader::new(config.retry.clone(), config.verify_tls)?);
    let model: Arc<dyn ChatModel> = Arc::new(ChatClient::new(
        config.llm_base_url.as_str(),
        config.model.as_str(),
        credentials.llm_api_key.as_str(),
    )?);

    // 5. Assemble the validation pipeline
    let extractor = Arc::new(TextExtractor::new(config.max_pages, Arc::new(TesseractOcr::new(args.ocr_lang.as_str()))));
    let validator = Arc::new(Validator::new(
        extractor,
        DocumentClassifier::new(model.clone(), company_names),
        PeriodClassifier::new(model),
        storage.clone(),
        config.failure_policy,
        config.debug,
    ));
    let orchestrator = Orchestrator::new(search, fetcher, validator, storage, &config);

    // 6. Run every (ticker, year) pair
    let summary = orchestrator.run(&roster, config.years.clone()).await;
    tracing::info!("Finished. {}", summary);

    Ok(())
}
