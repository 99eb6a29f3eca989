use serde::{Deserialize, Serialize};

use super::types::LlmClient;
use super::AnalysisError;
use crate::config::OpenRouterConfig;

const SERVICE: &str = "OpenRouter";

/// OpenRouter chat-completions client.
pub struct OpenRouterClient {
    api_url: String,
    api_key: String,
    model: String,
    site_url: String,
    site_name: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenRouterClient {
    pub fn new(config: &OpenRouterConfig) -> Result<Self, AnalysisError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AnalysisError::MissingApiKey)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalysisError::HttpClient(e.to_string()))?;

        Ok(Self {
            api_url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            site_url: config.site_url.clone(),
            site_name: config.site_name.clone(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl LlmClient for OpenRouterClient {
    fn generate(&self, prompt: &str, system: &str) -> Result<String, AnalysisError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatRequestMessage {
                    role: "system",
                    content: system.trim(),
                },
                ChatRequestMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.1,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.site_url)
            .header("X-Title", &self.site_name)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    AnalysisError::Connection {
                        service: SERVICE,
                        url: self.api_url.clone(),
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

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AnalysisError::MalformedResponse("No choices in completion".into()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(key: Option<&str>) -> OpenRouterConfig {
        OpenRouterConfig {
            api_key: key.map(String::from),
            base_url: "https://openrouter.ai/api/v1/".into(),
            ..OpenRouterConfig::default()
        }
    }

    #[test]
    fn requires_api_key() {
        assert!(matches!(
            OpenRouterClient::new(&config_with_key(None)),
            Err(AnalysisError::MissingApiKey)
        ));
        assert!(matches!(
            OpenRouterClient::new(&config_with_key(Some("  "))),
            Err(AnalysisError::MissingApiKey)
        ));
    }

    #[test]
    fn builds_completions_url() {
        let client = OpenRouterClient::new(&config_with_key(Some("sk-test"))).unwrap();
        assert_eq!(client.api_url, "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(client.model(), "openai/chatgpt-4o-latest");
    }

    #[test]
    fn request_serializes_low_temperature() {
        let body = ChatRequest {
            model: "m",
            messages: vec![ChatRequestMessage { role: "user", content: "hi" }],
            temperature: 0.1,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert!((json["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn response_content_is_extracted() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"a\":1}"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{\"a\":1}"));
    }
}
