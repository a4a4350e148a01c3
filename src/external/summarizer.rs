use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::EXTERNAL_CALL_TIMEOUT;
use crate::directory::CustomerProfile;
use crate::error::{Result, ServiceError};

/// LLM-backed summarization service
///
/// Callers must treat any error as a normal failure mode and substitute a
/// deterministic fallback; nothing here is allowed to abort a transfer.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        transcript: &str,
        category: &str,
        profile: Option<&CustomerProfile>,
    ) -> Result<String>;
}

/// Chat-completions client for the summarization service
pub struct HttpSummarizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

impl HttpSummarizer {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn build_prompt(
        transcript: &str,
        category: &str,
        profile: Option<&CustomerProfile>,
    ) -> String {
        let mut prompt = format!(
            "Please summarize the following {} support conversation into a very short \
             and clear paragraph that an agent can quickly read out loud to another \
             agent for a warm transfer. Focus on the customer's issue and what has \
             been done so far. Keep it under 3 sentences and make it conversational:\
             \n\n{}",
            category, transcript
        );

        if let Some(p) = profile {
            prompt.push_str(&format!("\n\nCustomer: {} ({}). {}", p.name, p.identity, p.notes));
        }

        prompt
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(
        &self,
        transcript: &str,
        category: &str,
        profile: Option<&CustomerProfile>,
    ) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a helpful assistant that creates concise call \
                                summaries for warm transfers between customer service agents."
                },
                {
                    "role": "user",
                    "content": Self::build_prompt(transcript, category, profile)
                }
            ],
            "max_tokens": 150,
            "temperature": 0.7
        });

        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send();

        let response = tokio::time::timeout(EXTERNAL_CALL_TIMEOUT, request)
            .await
            .map_err(|_| ServiceError::timeout("summarization request"))?
            .map_err(|e| ServiceError::upstream(format!("summarization request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::upstream(format!(
                "summarization service returned {}",
                response.status()
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::upstream(format!("malformed summarization response: {}", e)))?;

        let summary = completion
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();

        if summary.is_empty() {
            return Err(ServiceError::upstream("summarization returned no text"));
        }

        info!("Generated call summary ({} chars)", summary.len());
        Ok(summary)
    }
}
