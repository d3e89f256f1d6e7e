use log::{ error, warn };
use reqwest::header::{ HeaderMap, HeaderValue, CONTENT_TYPE };
use serde::{ Deserialize, Serialize };
use std::error::Error;
use std::time::Duration;

use crate::cli::Args;
use crate::models::chat::{ ChatMessage, MessageRole };

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize, Debug)]
struct CompletionRequest {
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Debug)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize, Debug)]
struct Usage {
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Clone, Debug)]
pub struct GptReply {
    pub content: String,
    pub model_used: String,
    pub tokens_used: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SentimentResult {
    pub sentiment: String,
    pub confidence: f32,
}

/// Direct chat-completions client for the jobs that do not need the agent
/// run machinery: agent invocations, sentiment analysis, summaries.
/// Unconfigured instances answer from canned mock text.
pub struct GptClient {
    http: Option<reqwest::Client>,
    endpoint: String,
    api_version: String,
    deployment: String,
}

impl GptClient {
    pub fn from_args(args: &Args) -> Self {
        if !args.openai_configured() {
            warn!("Chat-completions endpoint not configured, using mock mode");
            return Self {
                http: None,
                endpoint: String::new(),
                api_version: args.openai_api_version.clone(),
                deployment: args.model_deployment.clone(),
            };
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(key) = HeaderValue::from_str(&args.openai_api_key) {
            headers.insert("api-key", key);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .ok();
        if http.is_none() {
            error!("Failed to build chat-completions HTTP client, using mock mode");
        }

        Self {
            http,
            endpoint: args.openai_endpoint.trim_end_matches('/').to_string(),
            api_version: args.openai_api_version.clone(),
            deployment: args.model_deployment.clone(),
        }
    }

    pub fn is_mock(&self) -> bool {
        self.http.is_none()
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint,
            self.deployment,
            self.api_version
        )
    }

    async fn complete(
        &self,
        messages: Vec<WireMessage>,
        temperature: f32,
        max_tokens: u32
    ) -> Result<GptReply, Box<dyn Error + Send + Sync>> {
        let http = self.http.as_ref().ok_or("chat-completions client not configured")?;
        let request = CompletionRequest { messages, temperature, max_tokens };

        let response = http
            .post(self.completions_url())
            .json(&request)
            .send().await?
            .error_for_status()?;
        let body: CompletionResponse = response.json().await?;

        let choice = body.choices.into_iter().next().ok_or("completion returned no choices")?;
        Ok(GptReply {
            content: choice.message.content,
            model_used: self.deployment.clone(),
            tokens_used: body.usage.map(|u| u.total_tokens),
        })
    }

    /// Chat completion over the session history plus the newest user message.
    pub async fn generate_chat_response(
        &self,
        user_message: &str,
        history: &[ChatMessage],
        system_prompt: &str,
        temperature: f32,
        max_tokens: u32
    ) -> Result<GptReply, Box<dyn Error + Send + Sync>> {
        if self.is_mock() {
            return Ok(GptReply {
                content: format!("Mock response to: {}", user_message),
                model_used: "mock-model".to_string(),
                tokens_used: Some(50),
            });
        }

        let mut messages = vec![WireMessage {
            role: "system".to_string(),
            content: system_prompt.to_string(),
        }];
        // Last 10 turns keep the prompt bounded.
        for msg in history.iter().rev().take(10).rev() {
            messages.push(WireMessage {
                role: match msg.role {
                    MessageRole::Assistant => "assistant".to_string(),
                    _ => "user".to_string(),
                },
                content: msg.content.clone(),
            });
        }
        messages.push(WireMessage {
            role: "user".to_string(),
            content: user_message.to_string(),
        });

        self.complete(messages, temperature, max_tokens).await
    }

    /// Classifies text as positive, negative, or neutral. Never fails:
    /// unparseable or failed completions report neutral with low confidence.
    pub async fn analyze_sentiment(&self, text: &str) -> SentimentResult {
        if self.is_mock() {
            return SentimentResult { sentiment: "neutral".to_string(), confidence: 0.5 };
        }

        let messages = vec![
            WireMessage {
                role: "system".to_string(),
                content: "Classify the sentiment of the user's text. Answer with exactly one word: positive, negative, or neutral.".to_string(),
            },
            WireMessage { role: "user".to_string(), content: text.to_string() }
        ];

        match self.complete(messages, 0.0, 10).await {
            Ok(reply) => {
                let label = reply.content.trim().to_lowercase();
                if ["positive", "negative", "neutral"].contains(&label.as_str()) {
                    SentimentResult { sentiment: label, confidence: 0.9 }
                } else {
                    warn!("Unexpected sentiment label: {}", label);
                    SentimentResult { sentiment: "neutral".to_string(), confidence: 0.3 }
                }
            }
            Err(e) => {
                error!("Sentiment analysis failed: {}", e);
                SentimentResult { sentiment: "neutral".to_string(), confidence: 0.0 }
            }
        }
    }

    /// Short prose summary of a conversation. Returns a fixed apology line
    /// when the completion fails, so the endpoint never errors.
    pub async fn summarize_conversation(&self, history: &[ChatMessage]) -> String {
        if history.is_empty() {
            return "No conversation to summarize.".to_string();
        }
        if self.is_mock() {
            return format!("Mock summary of a conversation with {} messages.", history.len());
        }

        let transcript = history
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = vec![
            WireMessage {
                role: "system".to_string(),
                content: "Summarize the following conversation in two or three sentences.".to_string(),
            },
            WireMessage { role: "user".to_string(), content: transcript }
        ];

        match self.complete(messages, 0.3, 200).await {
            Ok(reply) => reply.content,
            Err(e) => {
                error!("Conversation summary failed: {}", e);
                "Unable to generate conversation summary.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn mock_client() -> GptClient {
        GptClient::from_args(&Args::parse_from(["foundry-agent"]))
    }

    #[tokio::test]
    async fn mock_chat_echoes_message() {
        let client = mock_client();
        assert!(client.is_mock());
        let reply = client
            .generate_chat_response("ping", &[], "be helpful", 0.7, 100).await
            .unwrap();
        assert!(reply.content.contains("ping"));
        assert_eq!(reply.model_used, "mock-model");
    }

    #[tokio::test]
    async fn mock_sentiment_is_neutral() {
        let client = mock_client();
        let result = client.analyze_sentiment("I love this").await;
        assert_eq!(result.sentiment, "neutral");
    }

    #[tokio::test]
    async fn empty_history_summary_has_fixed_text() {
        let client = mock_client();
        assert_eq!(client.summarize_conversation(&[]).await, "No conversation to summarize.");
    }
}
