//! Generative answer client
//!
//! Turns a question plus retrieved rule context into a natural-language
//! answer through an OpenRouter-compatible chat-completions endpoint. The
//! retrieval core is indifferent to how the answer is produced; this module
//! is a boundary collaborator behind the `AnswerGenerator` trait so tests
//! can swap in a fixture.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Produces an answer from a question and its retrieved context
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, question: &str, context: &[String]) -> Result<String>;
}

/// Chat-completions client for OpenRouter-compatible APIs
pub struct OpenRouterClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenRouterClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    fn build_prompt(question: &str, context: &[String]) -> String {
        format!(
            "You are a professional trading-card-game judge. Use the context to give \
             a specific answer, even if the exact term does not appear.\n\n\
             ### Context:\n{}\n\n### Question:\n{}\n\n### Answer:",
            context.join("\n"),
            question
        )
    }
}

#[async_trait]
impl AnswerGenerator for OpenRouterClient {
    async fn generate(&self, question: &str, context: &[String]) -> Result<String> {
        let prompt = Self::build_prompt(question, context);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": 0.7,
                "max_tokens": 500,
            }))
            .send()
            .await
            .context("Answer generation request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Answer generation failed: {} - {}", status, body);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse answer generation response")?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .context("Answer generation response contained no choices")?;

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_context_and_question() {
        let context = vec!["510.1. Combat damage.".to_string(), "510.2. Ordering.".to_string()];
        let prompt = OpenRouterClient::build_prompt("how does combat damage work?", &context);

        assert!(prompt.contains("510.1. Combat damage."));
        assert!(prompt.contains("510.2. Ordering."));
        assert!(prompt.contains("how does combat damage work?"));
        assert!(prompt.ends_with("### Answer:"));
    }

    #[test]
    fn test_parses_chat_response() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Yes, it can.  "}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.trim(), "Yes, it can.");
    }
}
