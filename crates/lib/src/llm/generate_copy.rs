//! HTTP client for the hosted `generate-copy` function.
//! Authenticates with the project's anon key (sent both as `apikey` and as a bearer token).

use crate::config::{self, Config};
use crate::llm::{GenerateRequest, GenerateResponse, Generator, LlmError};
use async_trait::async_trait;
use std::time::Duration;

const GENERATE_COPY_PATH: &str = "/functions/v1/generate-copy";

/// Client for the generate-copy edge function.
#[derive(Clone)]
pub struct GenerateCopyClient {
    base_url: String,
    anon_key: Option<String>,
    client: reqwest::Client,
}

impl GenerateCopyClient {
    /// `timeout` of `None` waits for the backend indefinitely.
    pub fn new(
        base_url: impl Into<String>,
        anon_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, LlmError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key,
            client: builder.build()?,
        })
    }

    /// Build from config; base URL and anon key honour their env overrides.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let base_url = config::resolve_base_url(config)
            .ok_or(LlmError::NotConfigured("backend.baseUrl (or COPYDESK_BASE_URL)"))?;
        Self::new(
            base_url,
            config::resolve_anon_key(config),
            config.backend.timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, GENERATE_COPY_PATH)
    }
}

#[async_trait]
impl Generator for GenerateCopyClient {
    /// POST /functions/v1/generate-copy — non-streaming. A body with `success: false`
    /// or without text is reported as an api error even when the status is 2xx.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let mut req = self.client.post(self.endpoint()).json(&request);
        if let Some(key) = &self.anon_key {
            req = req.header("apikey", key).bearer_auth(key);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{} {}", status, error_message(&body))));
        }
        let data: GenerateResponse = res.json().await?;
        if !data.success {
            return Err(LlmError::Api("backend reported success=false".to_string()));
        }
        if data.text.trim().is_empty() {
            return Err(LlmError::Api("backend returned no text".to_string()));
        }
        Ok(data)
    }
}

/// Prefer the `error` field of a JSON error body; fall back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_trailing_slash() {
        let c = GenerateCopyClient::new("https://proj.example.co/", None, None).unwrap();
        assert_eq!(
            c.endpoint(),
            "https://proj.example.co/functions/v1/generate-copy"
        );
    }

    #[test]
    fn error_message_prefers_json_error_field() {
        assert_eq!(error_message(r#"{"error":"quota exceeded"}"#), "quota exceeded");
        assert_eq!(error_message("  bad gateway \n"), "bad gateway");
    }

    #[test]
    fn from_config_requires_base_url() {
        let config = Config::default();
        if std::env::var("COPYDESK_BASE_URL").is_err() {
            assert!(matches!(
                GenerateCopyClient::from_config(&config),
                Err(LlmError::NotConfigured(_))
            ));
        }
    }
}
