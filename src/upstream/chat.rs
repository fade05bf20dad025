use std::time::Duration;

use anyhow::Context;
use serde::Serialize;

use super::{read_json, UpstreamError};

const SERVICE: &str = "Chat API";

/// The assistant only answers app and diet questions; anything else is
/// politely refused upstream.
const SYSTEM_PROMPT: &str = "You are the NutriLog assistant. Only answer questions \
about NutriLog (features, navigation) and diet/calorie guidance (foods, calories, \
macros, portions, meal ideas). If the question is unrelated, refuse politely.";

const TEMPERATURE: f32 = 0.6;
const MAX_TOKENS: u32 = 300;

/// Relay to an OpenAI-compatible chat completions endpoint.
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl ChatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("build chat http client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
        })
    }

    /// One-shot completion; returns the assistant text (empty when the
    /// upstream returns no usable choice).
    pub async fn complete(&self, message: &str) -> Result<String, UpstreamError> {
        let url = format!("{}/chat/completions", self.base_url);
        let req = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ChatCompletionBody {
                model: &self.model,
                messages: [
                    ChatMessage {
                        role: "system",
                        content: SYSTEM_PROMPT,
                    },
                    ChatMessage {
                        role: "user",
                        content: message,
                    },
                ],
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            })
            .timeout(self.timeout);

        let payload = read_json(SERVICE, req).await?;
        let text = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        Ok(text)
    }
}
