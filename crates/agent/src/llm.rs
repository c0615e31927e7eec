use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use teller_core::config::{LlmConfig, LlmProvider};
use tracing::debug;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Single-prompt completion over HTTP against one of the supported providers.
pub struct HttpLlmClient {
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build llm http client")?;

        Ok(Self {
            provider: config.provider,
            base_url: config.effective_base_url(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| anyhow!("llm api key is not configured for {}", self.provider.as_str()))
    }

    fn request(&self, prompt: &str) -> Result<reqwest::RequestBuilder> {
        let request = match self.provider {
            LlmProvider::Ollama => self
                .client
                .post(format!("{}/api/generate", self.base_url))
                .json(&json!({ "model": self.model, "prompt": prompt, "stream": false })),
            LlmProvider::OpenAi => self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(self.api_key()?)
                .json(&json!({
                    "model": self.model,
                    "temperature": 0,
                    "messages": [{ "role": "user", "content": prompt }]
                })),
            LlmProvider::Anthropic => self
                .client
                .post(format!("{}/v1/messages", self.base_url))
                .header("x-api-key", self.api_key()?)
                .header("anthropic-version", "2023-06-01")
                .json(&json!({
                    "model": self.model,
                    "max_tokens": 512,
                    "messages": [{ "role": "user", "content": prompt }]
                })),
            LlmProvider::Gemini => self
                .client
                .post(format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model))
                .query(&[("key", self.api_key()?)])
                .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] })),
        };
        Ok(request)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .request(prompt)?
            .send()
            .await
            .with_context(|| format!("{} request failed", self.provider.as_str()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("{} returned {status}: {body}", self.provider.as_str()));
        }

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("{} returned a non-json body", self.provider.as_str()))?;

        debug!(
            event_name = "llm.completion.received",
            provider = self.provider.as_str(),
            model = %self.model
        );

        completion_text(self.provider, &body).ok_or_else(|| {
            anyhow!("{} response carried no completion text", self.provider.as_str())
        })
    }
}

/// Pulls the generated text out of a provider response body.
pub fn completion_text(provider: LlmProvider, body: &Value) -> Option<String> {
    let text = match provider {
        LlmProvider::Ollama => body.get("response"),
        LlmProvider::OpenAi => body.pointer("/choices/0/message/content"),
        LlmProvider::Anthropic => body.pointer("/content/0/text"),
        LlmProvider::Gemini => body.pointer("/candidates/0/content/parts/0/text"),
    };
    text.and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use teller_core::config::{LlmConfig, LlmProvider};

    use super::{completion_text, HttpLlmClient};

    #[test]
    fn completion_text_reads_each_provider_shape() {
        assert_eq!(
            completion_text(LlmProvider::Ollama, &json!({ "response": "{\"a\":1}", "done": true })),
            Some("{\"a\":1}".to_string())
        );
        assert_eq!(
            completion_text(
                LlmProvider::OpenAi,
                &json!({ "choices": [{ "message": { "role": "assistant", "content": "hi" } }] })
            ),
            Some("hi".to_string())
        );
        assert_eq!(
            completion_text(
                LlmProvider::Anthropic,
                &json!({ "content": [{ "type": "text", "text": "yo" }] })
            ),
            Some("yo".to_string())
        );
        assert_eq!(
            completion_text(
                LlmProvider::Gemini,
                &json!({ "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }] })
            ),
            Some("ok".to_string())
        );
    }

    #[test]
    fn missing_completion_text_is_none() {
        assert_eq!(completion_text(LlmProvider::OpenAi, &json!({ "choices": [] })), None);
        assert_eq!(completion_text(LlmProvider::Ollama, &json!({ "response": 42 })), None);
    }

    #[test]
    fn hosted_provider_without_key_cannot_build_a_request() {
        let config =
            LlmConfig { provider: LlmProvider::Anthropic, api_key: None, ..LlmConfig::default() };
        let client = match HttpLlmClient::from_config(&config) {
            Ok(client) => client,
            Err(error) => panic!("client should build without a key: {error}"),
        };

        assert!(client.request("hello").is_err());
        assert_eq!(client.model(), "llama3.1");
    }

    #[test]
    fn ollama_uses_local_default_endpoint() {
        let client = match HttpLlmClient::from_config(&LlmConfig::default()) {
            Ok(client) => client,
            Err(error) => panic!("client should build: {error}"),
        };

        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.provider(), LlmProvider::Ollama);
    }
}
