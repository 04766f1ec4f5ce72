// src/pipeline/test_support.rs
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use crate::config::FailurePolicy;
use crate::extractors::ocr::{OcrEngine, OcrPage};
use crate::extractors::text::DEFAULT_MAX_PAGES;
use crate::extractors::TextExtractor;
use crate::llm::{ChatMessage, ChatModel, DocumentClassifier, PeriodClassifier};
use crate::pipeline::validator::Validator;
use crate::roster::{Roster, TickerRecord};
use crate::storage::StorageManager;
use crate::utils::error::{ExtractError, LlmError};

pub fn asian_paints() -> TickerRecord {
    TickerRecord {
        ticker: "ASIANPAINT.NS".to_string(),
        company_name: "Asian Paints Limited".to_string(),
    }
}

/// OCR that never recognizes anything.
pub struct NoOcr;

impl OcrEngine for NoOcr {
    fn recognize(&self, _pdf_path: &Path) -> Result<Vec<OcrPage>, ExtractError> {
        Ok(Vec::new())
    }
}

/// Answers the company prompt and the period prompt with fixed strings.
pub struct ScriptedModel {
    company_reply: Option<String>,
    period_reply: String,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(company_reply: &str, period_reply: &str) -> Arc<Self> {
        Arc::new(Self {
            company_reply: Some(company_reply.to_string()),
            period_reply: period_reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            company_reply: None,
            period_reply: String::new(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(company_reply) = &self.company_reply else {
            return Err(LlmError::EmptyResponse);
        };
        let asks_company = messages
            .first()
            .map(|m| m.content.starts_with("Which company"))
            .unwrap_or(false);
        if asks_company {
            Ok(company_reply.clone())
        } else {
            Ok(self.period_reply.clone())
        }
    }
}

pub fn build_validator(
    storage: Arc<StorageManager>,
    model: Arc<ScriptedModel>,
    policy: FailurePolicy,
    debug: bool,
) -> Validator {
    let model: Arc<dyn ChatModel> = model;
    let extractor = Arc::new(TextExtractor::new(DEFAULT_MAX_PAGES, Arc::new(NoOcr)));
    Validator::new(
        extractor,
        DocumentClassifier::new(model.clone(), Roster::builtin().company_names()),
        PeriodClassifier::new(model),
        storage,
        policy,
        debug,
    )
}
