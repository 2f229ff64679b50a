//! Ollama chat client.
//!
//! Prompt strategies send one non-streaming chat request per analysis and
//! expect a JSON `{"findings": [...]}` document back.

use crate::error::AnalyzerError;
use crate::models::{Audit, Finding};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the LLM client.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.1,
            timeout_seconds: 600,
        }
    }
}

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: &'a str,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Client for Ollama's `/api/chat` endpoint.
pub struct OllamaClient {
    config: LlmConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new client.
    pub fn new(config: LlmConfig) -> Result<Self> {
        info!(
            "Initializing LLM client with model {} at {}",
            config.model_name, config.ollama_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Name of the model requests are sent to.
    pub fn model(&self) -> &str {
        &self.config.model_name
    }

    /// Send a system + user prompt and return the assistant's reply text.
    pub async fn chat(&self, system: &str, prompt: &str) -> Result<String, AnalyzerError> {
        let url = format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'));

        let request = OllamaChatRequest {
            model: &self.config.model_name,
            messages: vec![ChatMessage::system(system), ChatMessage::user(prompt)],
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Sending chat request to {} ({} prompt bytes)", url, prompt.len());

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalyzerError::TimedOut {
                        after: Duration::from_secs(self.config.timeout_seconds),
                    }
                } else if e.is_connect() {
                    AnalyzerError::Request(format!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.config.ollama_url
                    ))
                } else {
                    AnalyzerError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Api { status, body });
        }

        let chat_response: OllamaChatResponse = response.json().await.map_err(|e| {
            AnalyzerError::InvalidResponse(format!("Failed to parse Ollama response: {}", e))
        })?;

        Ok(chat_response.message.content)
    }
}

/// Parse findings out of a model reply.
///
/// Accepts a `{"findings": [...]}` envelope or a bare array, optionally
/// wrapped in a Markdown code fence.
pub fn parse_findings(content: &str) -> Result<Vec<Finding>, AnalyzerError> {
    let body = strip_code_fence(content.trim());

    if body.is_empty() {
        return Err(AnalyzerError::InvalidResponse("empty response".to_string()));
    }

    if body.starts_with('[') {
        serde_json::from_str::<Vec<Finding>>(body)
            .map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))
    } else {
        serde_json::from_str::<Audit>(body)
            .map(|audit| audit.findings)
            .map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))
    }
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };

    // Drop the info string ("json") on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => return "",
    };

    rest.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
pub(crate) mod test_support {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    /// Serve exactly one HTTP response on a random local port.
    ///
    /// Returns the base URL and a receiver for the raw request text.
    pub async fn serve_once(status: &'static str, body: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            let _ = tx.send(request);
        });

        (format!("http://{}", addr), rx)
    }

    /// Build an Ollama chat response whose message content is `content`.
    pub fn chat_body(content: &str) -> String {
        serde_json::json!({
            "model": "test-model",
            "message": {"role": "assistant", "content": content},
            "done": true
        })
        .to_string()
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= pos + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{chat_body, serve_once};
    use super::*;

    fn client_for(url: String) -> OllamaClient {
        OllamaClient::new(LlmConfig {
            ollama_url: url,
            model_name: "test-model".to_string(),
            temperature: 0.0,
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_llm_config_default() {
        let config = LlmConfig::default();
        assert_eq!(config.model_name, "llama3.2:latest");
        assert_eq!(config.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn test_parse_findings_envelope() {
        let content = r#"{"findings": [{"title": "Reentrancy", "description": "d", "severity": "High", "file_paths": ["Bank.sol"]}]}"#;
        let findings = parse_findings(content).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].locations, vec!["Bank.sol"]);
    }

    #[test]
    fn test_parse_findings_fenced_array() {
        let content = "```json\n[{\"title\": \"t\", \"description\": \"d\", \"severity\": \"Low\", \"locations\": []}]\n```";
        let findings = parse_findings(content).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, "Low");
    }

    #[test]
    fn test_parse_findings_rejects_garbage() {
        assert!(matches!(
            parse_findings("I found no issues."),
            Err(AnalyzerError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_findings("   "),
            Err(AnalyzerError::InvalidResponse(_))
        ));
        // A finding missing required fields fails the whole response.
        assert!(parse_findings(r#"{"findings": [{"title": "t"}]}"#).is_err());
    }

    #[tokio::test]
    async fn test_chat_returns_message_content() {
        let (url, request) = serve_once("200 OK", chat_body("{\"findings\": []}")).await;
        let client = client_for(url);

        let reply = client.chat("system prompt", "user prompt").await.unwrap();
        assert_eq!(reply, "{\"findings\": []}");

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /api/chat"));
        assert!(request.contains("\"model\":\"test-model\""));
        assert!(request.contains("\"format\":\"json\""));
        assert!(request.contains("user prompt"));
    }

    #[tokio::test]
    async fn test_chat_maps_http_errors() {
        let (url, _request) = serve_once("500 Internal Server Error", "boom".to_string()).await;
        let client = client_for(url);

        let err = client.chat("s", "p").await.unwrap_err();
        assert_eq!(
            err,
            AnalyzerError::Api {
                status: 500,
                body: "boom".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_body() {
        let (url, _request) = serve_once("200 OK", "{\"unexpected\": true}".to_string()).await;
        let client = client_for(url);

        let err = client.chat("s", "p").await.unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidResponse(_)));
    }
}
