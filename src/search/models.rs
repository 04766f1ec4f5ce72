// src/search/models.rs
use serde::{Deserialize, Serialize};

/// Body of a Serper `/search` call. Only the organic listing is used;
/// ads, knowledge graph and "people also ask" blocks are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub organic: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: String,
}

impl SearchResult {
    /// Literal suffix check, query strings and upper-case extensions do not count.
    pub fn is_pdf_link(&self) -> bool {
        self.link.ends_with(".pdf")
    }
}

impl SearchResponse {
    /// Organic results pointing at PDFs, in ranking order, paired with their 1-based rank.
    pub fn pdf_results(&self) -> Vec<(usize, &SearchResult)> {
        self.organic
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_pdf_link())
            .map(|(i, r)| (i + 1, r))
            .collect()
    }
}
