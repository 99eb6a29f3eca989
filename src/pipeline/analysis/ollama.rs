use serde::{Deserialize, Serialize};

use super::types::LlmClient;
use super::AnalysisError;
use crate::config::OllamaConfig;

const SERVICE: &str = "Ollama";

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalysisError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    format: &'a str,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl LlmClient for OllamaClient {
    fn generate(&self, prompt: &str, system: &str) -> Result<String, AnalysisError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            system: system.trim(),
            stream: false,
            format: "json",
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    AnalysisError::Connection {
                        service: SERVICE,
                        url: self.base_url.clone(),
                    }
                } else if e.is_timeout() {
                    AnalysisError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    AnalysisError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::Api {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        Ok(parsed.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Mock LLM client for testing. Returns a configurable response or error.
pub struct MockLlmClient {
    response: Result<String, String>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
        }
    }

    /// Every call fails as if the service were unreachable.
    pub fn unreachable(reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
        }
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _prompt: &str, _system: &str) -> Result<String, AnalysisError> {
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(reason) => Err(AnalysisError::Connection {
                service: "mock",
                url: reason.clone(),
            }),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_client_returns_configured_response() {
        let client = MockLlmClient::new("test response");
        assert_eq!(client.generate("prompt", "system").unwrap(), "test response");
    }

    #[test]
    fn unreachable_mock_fails() {
        let client = MockLlmClient::unreachable("offline");
        assert!(matches!(
            client.generate("p", "s"),
            Err(AnalysisError::Connection { .. })
        ));
    }

    #[test]
    fn ollama_client_trims_trailing_slash() {
        let config = OllamaConfig {
            base_url: "http://localhost:11434/".into(),
            ..OllamaConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.timeout_secs, 300);
    }

    #[test]
    fn request_asks_for_json_format() {
        let body = OllamaGenerateRequest {
            model: "llama3.1:8b",
            prompt: "p",
            system: "s",
            stream: false,
            format: "json",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
    }
}
