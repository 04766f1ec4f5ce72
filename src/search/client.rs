// src/search/client.rs
use async_trait::async_trait;
use reqwest::header;
use std::time::Duration;
use crate::search::models::SearchResponse;
use crate::utils::error::SearchError;

const SEARCH_TIMEOUT_SECS: u64 = 20;

/// Web search capability: a query in, ranked results out.
#[async_trait]
pub trait SearchProvider: Send + Sync + 'static {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError>;
}

/// Builds the per-(company, year) query.
pub fn transcript_query(company_name: &str, year: u16) -> String {
    format!("{} earnings call transcript {} filetype:pdf", company_name, year)
}

/// Client for the Serper Google search API.
pub struct SerperClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl SerperClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl SearchProvider for SerperClient {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        tracing::info!("Searching: {}", query);

        let response = self.client.post(&self.url)
            .header("X-API-KEY", &self.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&serde_json::json!({ "q": query }))
            .send()
            .await?; // Propagates reqwest::Error as SearchError::Network

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Search HTTP error status: {} for query: {}", status, query);
            return Err(SearchError::Http(status));
        }

        let body = response.text().await?;
        tracing::debug!("Search response for '{}': {}", query, body);

        serde_json::from_str(&body).map_err(|e| SearchError::Parse(e.to_string()))
    }
}
