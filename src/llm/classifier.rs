// src/llm/classifier.rs
use std::sync::Arc;
use crate::llm::client::{ChatMessage, ChatModel};
use crate::utils::error::LlmError;

/// Asks the model which roster company a document belongs to.
pub struct DocumentClassifier {
    model: Arc<dyn ChatModel>,
    roster_names: Vec<String>,
}

impl DocumentClassifier {
    pub fn new(model: Arc<dyn ChatModel>, roster_names: Vec<String>) -> Self {
        Self { model, roster_names }
    }

    pub fn messages(&self, text: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::user(format!(
            "Which company does the following document belong to? Please provide only the company name from the following list: {}\n\n{}",
            self.roster_names.join(", "),
            text
        ))]
    }

    /// Returns the model's answer with whitespace, quotes and a trailing period stripped.
    pub async fn classify(&self, text: &str) -> Result<String, LlmError> {
        let response = self.model.complete(&self.messages(text)).await?;
        Ok(clean_company_response(&response))
    }
}

/// Asks the model for the fiscal quarter and year of a document, optionally
/// hinting with the URL it was downloaded from.
pub struct PeriodClassifier {
    model: Arc<dyn ChatModel>,
}

impl PeriodClassifier {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub fn messages(&self, text: &str, url: Option<&str>) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::user(format!(
            "What is the fiscal quarter and fiscal year in the following document?\n\n{}",
            text
        ))];
        if let Some(url) = url {
            messages.push(ChatMessage::user(format!(
                "Based on the URL, the quarter and fiscal year might be included: {}",
                url
            )));
        }
        messages
    }

    pub async fn classify(&self, text: &str, url: Option<&str>) -> Result<String, LlmError> {
        self.model.complete(&self.messages(text, url)).await
    }
}

fn clean_company_response(response: &str) -> String {
    response
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim_end_matches('.')
        .trim()
        .to_string()
}

fn normalize_company(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let word = word.to_lowercase();
            match word.as_str() {
                "limited" | "ltd" | "ltd." => "ltd".to_string(),
                _ => word,
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive comparison that treats "Limited" and "Ltd" as the same word.
pub fn company_matches(response: &str, expected: &str) -> bool {
    let response = clean_company_response(response);
    !response.is_empty() && normalize_company(&response) == normalize_company(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingModel {
        reply: String,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }
    }

    fn recording(reply: &str) -> Arc<RecordingModel> {
        Arc::new(RecordingModel {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_ltd_matches_limited() {
        assert!(company_matches("Axis Bank Ltd", "Axis Bank Limited"));
        assert!(company_matches("axis bank limited", "Axis Bank Limited"));
        assert!(company_matches("Axis Bank Ltd.", "Axis Bank Limited"));
        assert!(company_matches("Axis Bank Limited", "Axis Bank Ltd"));
    }

    #[test]
    fn test_different_company_is_a_mismatch() {
        assert!(!company_matches("HDFC Bank Limited", "Axis Bank Limited"));
        assert!(!company_matches("The document belongs to Axis Bank Limited", "Axis Bank Limited"));
        assert!(!company_matches("", "Axis Bank Limited"));
    }

    #[test]
    fn test_response_cleanup() {
        assert!(company_matches("  \"Asian Paints Limited.\"\n", "Asian Paints Limited"));
    }

    #[tokio::test]
    async fn test_document_prompt_lists_roster() {
        let model = recording("  Asian Paints Limited \n");
        let classifier = DocumentClassifier::new(
            model.clone(),
            vec!["Asian Paints Limited".to_string(), "Axis Bank Limited".to_string()],
        );

        let answer = classifier.classify("transcript text").await.unwrap();

        assert_eq!(answer, "Asian Paints Limited");
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 1);
        assert_eq!(seen[0][0].role, "user");
        assert!(seen[0][0].content.contains("from the following list: Asian Paints Limited, Axis Bank Limited\n\ntranscript text"));
    }

    #[tokio::test]
    async fn test_period_prompt_appends_url_hint() {
        let model = recording("Q1 FY2023");
        let classifier = PeriodClassifier::new(model.clone());

        classifier.classify("text", Some("https://example.com/q1-fy23.pdf")).await.unwrap();
        classifier.classify("text", None).await.unwrap();

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].len(), 2);
        assert_eq!(
            seen[0][1].content,
            "Based on the URL, the quarter and fiscal year might be included: https://example.com/q1-fy23.pdf"
        );
        assert_eq!(seen[1].len(), 1);
        assert!(seen[1][0].content.starts_with("What is the fiscal quarter and fiscal year"));
    }
}
