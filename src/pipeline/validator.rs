// src/pipeline/validator.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::config::{FailurePolicy, OnFailure};
use crate::extractors::period::{parse_fiscal_period, FiscalPeriod, DEBUG_PATTERNS};
use crate::extractors::TextExtractor;
use crate::llm::{company_matches, DocumentClassifier, PeriodClassifier};
use crate::roster::TickerRecord;
use crate::storage::{StorageManager, TranscriptMetadata};
use crate::utils::error::ExtractError;
use crate::utils::text_debug;

/// Why a downloaded file was not accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    CompanyMismatch { response: String },
    PeriodUnresolved { response: String, period: FiscalPeriod },
    /// Validation could not run to a decision (unreadable PDF, LLM failure, I/O).
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Renamed(PathBuf),
    Rejected { rejection: Rejection, file_kept: bool },
}

impl ValidationOutcome {
    pub fn is_renamed(&self) -> bool {
        matches!(self, ValidationOutcome::Renamed(_))
    }
}

/// Confirms a downloaded PDF is the expected company's transcript and gives
/// it its canonical `{company}_Q{n}_FY{year}.pdf` name.
pub struct Validator {
    extractor: Arc<TextExtractor>,
    documents: DocumentClassifier,
    periods: PeriodClassifier,
    storage: Arc<StorageManager>,
    policy: FailurePolicy,
    debug: bool,
}

impl Validator {
    pub fn new(
        extractor: Arc<TextExtractor>,
        documents: DocumentClassifier,
        periods: PeriodClassifier,
        storage: Arc<StorageManager>,
        policy: FailurePolicy,
        debug: bool,
    ) -> Self {
        Self { extractor, documents, periods, storage, policy, debug }
    }

    /// Never errors: every failure is logged and reported as a rejection.
    pub async fn validate_and_rename(&self, pdf_path: &Path, record: &TickerRecord, url: Option<&str>) -> ValidationOutcome {
        match self.run_steps(pdf_path, record, url).await {
            Ok(renamed) => ValidationOutcome::Renamed(renamed),
            Err(rejection) => self.reject(pdf_path, record, rejection),
        }
    }

    async fn run_steps(&self, pdf_path: &Path, record: &TickerRecord, url: Option<&str>) -> Result<PathBuf, Rejection> {
        let company = &record.company_name;

        // 1. Text (an empty result still goes to the classifier)
        let text = self.extract_text(pdf_path).await.map_err(|e| Rejection::Failed {
            reason: format!("text extraction: {}", e),
        })?;
        if text.trim().is_empty() {
            tracing::warn!("No text recovered from {}, classifying empty document", pdf_path.display());
        }
        if self.debug {
            self.save_debug_text(pdf_path, record, &text).await;
        }

        // 2. Company
        let company_response = self.documents.classify(&text).await.map_err(|e| Rejection::Failed {
            reason: format!("company classification: {}", e),
        })?;
        tracing::info!("Company classification for {}: '{}'", pdf_path.display(), company_response);
        if !company_matches(&company_response, company) {
            return Err(Rejection::CompanyMismatch { response: company_response });
        }

        // 3. Period
        let period_response = self.periods.classify(&text, url).await.map_err(|e| Rejection::Failed {
            reason: format!("period classification: {}", e),
        })?;
        let period = parse_fiscal_period(&period_response);
        tracing::info!(
            "Period classification for {} ({}): {} from '{}'",
            pdf_path.display(), company, period, period_response.trim()
        );
        let (Some(quarter), Some(fiscal_year)) = (period.quarter, period.fiscal_year) else {
            return Err(Rejection::PeriodUnresolved { response: period_response, period });
        };

        // 4-5. Canonical name, last write wins
        let canonical = self.storage.canonical_path(record, quarter, fiscal_year);
        self.storage.promote(pdf_path, &canonical).map_err(|e| Rejection::Failed {
            reason: format!("rename to {}: {}", canonical.display(), e),
        })?;
        tracing::info!("File renamed: {} -> {}", pdf_path.display(), canonical.display());

        let metadata = TranscriptMetadata {
            ticker: record.ticker.clone(),
            company_name: company.clone(),
            quarter: quarter.number(),
            fiscal_year,
            source_url: url.map(str::to_string),
            company_response,
            period_response,
            validated_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Err(e) = self.storage.save_metadata(&canonical, &metadata) {
            tracing::warn!("Failed to save metadata for {}: {}", canonical.display(), e);
        }

        Ok(canonical)
    }

    async fn extract_text(&self, pdf_path: &Path) -> Result<String, ExtractError> {
        let extractor = Arc::clone(&self.extractor);
        let path = pdf_path.to_path_buf();
        tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .map_err(|e| ExtractError::Task(e.to_string()))?
    }

    async fn save_debug_text(&self, pdf_path: &Path, record: &TickerRecord, text: &str) {
        let stem = pdf_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let debug_path = self.storage.debug_dir(&record.ticker).join(format!("{}.txt", stem));
        let company_pattern = format!("(?i){}", regex::escape(&record.company_name));
        let text = text.to_string();

        let result = tokio::task::spawn_blocking(move || {
            let mut patterns: Vec<(&str, &str)> = DEBUG_PATTERNS.to_vec();
            patterns.push((company_pattern.as_str(), "company"));
            text_debug::create_debug_text(&text, &debug_path, &patterns)
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Failed to save debug text for {}: {}", pdf_path.display(), e),
            Err(e) => tracing::warn!("Debug text task failed for {}: {}", pdf_path.display(), e),
        }
    }

    fn reject(&self, pdf_path: &Path, record: &TickerRecord, rejection: Rejection) -> ValidationOutcome {
        let action = match &rejection {
            Rejection::CompanyMismatch { response } => {
                tracing::warn!(
                    "Validation failed: {} does not match {} (model answered '{}')",
                    pdf_path.display(), record.company_name, response
                );
                self.policy.company_mismatch
            }
            Rejection::PeriodUnresolved { response, period } => {
                tracing::warn!(
                    "Could not determine quarter/fiscal year for {} ({}): {} from '{}'",
                    pdf_path.display(), record.company_name, period, response.trim()
                );
                self.policy.period_unresolved
            }
            Rejection::Failed { reason } => {
                tracing::error!("Error during validation/renaming of {}: {}", pdf_path.display(), reason);
                self.policy.company_mismatch
            }
        };

        let file_kept = match action {
            OnFailure::Delete => match self.storage.discard(pdf_path) {
                Ok(()) => {
                    tracing::info!("Deleted {}", pdf_path.display());
                    false
                }
                Err(e) => {
                    tracing::error!("Failed to delete {}: {}", pdf_path.display(), e);
                    pdf_path.exists()
                }
            },
            OnFailure::Retain => {
                tracing::info!("Keeping {} for manual inspection", pdf_path.display());
                true
            }
        };

        ValidationOutcome::Rejected { rejection, file_kept }
    }
}
