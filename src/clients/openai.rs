//! OpenAI-compatible chat-completions client used for parser enhancement
//! and shortlist reranking. JSON response mode, low temperature.

use crate::config::RuntimeConfig;
use crate::error::{PlanError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    endpoint: String,
    model: String,
    api_key: String,
    client: Client,
}

impl OpenAiClient {
    /// Build from runtime config. `Ok(None)` when no API key is set, so
    /// the pipeline silently runs rule-only.
    pub fn from_runtime(runtime: &RuntimeConfig) -> Result<Option<Self>> {
        let Some(api_key) = runtime.openai_api_key.clone() else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(Duration::from_millis(runtime.completion_timeout_ms))
            .build()
            .map_err(|e| PlanError::Config {
                message: format!("failed to build completion HTTP client: {e}"),
            })?;
        Ok(Some(Self {
            endpoint: runtime.completion_endpoint.clone(),
            model: runtime.completion_model.clone(),
            api_key,
            client,
        }))
    }
}

#[async_trait]
impl super::traits::CompletionPort for OpenAiClient {
    async fn complete_json(&self, system: &str, prompt: &str) -> Result<Value> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.1,
            "response_format": {"type": "json_object"}
        });

        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PlanError::Upstream {
                service: "completion".to_string(),
                message: format!("completion endpoint returned {}: {}", status, text),
            });
        }

        let response_json: Value = res.json().await?;
        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| PlanError::Format {
                message: "completion response missing message content".to_string(),
            })?;

        serde_json::from_str(content.trim()).map_err(|e| PlanError::Format {
            message: format!("completion content is not valid JSON: {}", e),
        })
    }
}
