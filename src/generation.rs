//! Client for the remote text-generation service.
//!
//! A [`Generator`] turns one prompt (plus prior turns) into the model's raw
//! text output. Nothing here interprets that text; see [`crate::interpret`].
//! Each call makes exactly one request: there is no retry and no timeout
//! beyond the transport's own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::StudioConfig;
use crate::error::{Result, StudioError};
use crate::templates;

/// Value of the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One earlier turn of the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Clone, Copy, Debug)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    /// Sent as a header, never in the body.
    pub api_key: &'a str,
    pub prior_messages: &'a [PriorMessage],
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Issue one request and return the model's text verbatim.
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String>;
}

/// [`Generator`] backed by the Anthropic Messages API.
#[derive(Clone, Debug)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_base: impl Into<String>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            model: model.into(),
            max_tokens,
        }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new(&config.api_base, &config.model, config.max_tokens)
    }

    /// Replace the underlying HTTP client (proxy settings, TLS roots, ...).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.api_base.trim_end_matches('/'))
    }

    fn request_body(&self, request: &GenerationRequest<'_>) -> Value {
        let mut messages: Vec<Value> = request
            .prior_messages
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();
        messages.push(json!({ "role": Role::User, "content": request.prompt }));

        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": templates::system_prompt(),
            "messages": messages,
        })
    }
}

#[async_trait]
impl Generator for AnthropicClient {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String> {
        let body = self.request_body(&request);
        debug!(
            model = %self.model,
            prior_messages = request.prior_messages.len(),
            "sending generation request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", request.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Error bodies are best effort; a non-JSON body falls back to the generic message.
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body["error"]["message"]
                .as_str()
                .or_else(|| body["error"].as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Failed to generate project (HTTP {status})"));
            warn!(%status, %message, "generation request failed");
            return Err(StudioError::Remote(message));
        }

        let body: Value = response.json().await?;
        let text = body["content"]
            .as_array()
            .and_then(|blocks| blocks.iter().find(|b| b["type"] == "text"))
            .and_then(|block| block["text"].as_str())
            .ok_or_else(|| StudioError::Remote("The model returned no text".into()))?;

        info!(chars = text.len(), "generation response received");
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Accept one connection, answer it with `status_line` and `body`, and
    /// hand back the raw request text.
    async fn serve_once(status_line: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
            request
        });
        (format!("http://{addr}"), handle)
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (key, value) = line.split_once(':')?;
                        if key.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn client(base: String) -> AnthropicClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        AnthropicClient::new(base, "test-model", 1024).with_http_client(http)
    }

    #[tokio::test]
    async fn returns_first_text_block_verbatim() {
        let reply = json!({
            "content": [{ "type": "text", "text": "{\"files\":[]}" }]
        })
        .to_string();
        let (base, server) = serve_once("200 OK", reply).await;

        let prior = vec![
            PriorMessage { role: Role::User, content: "make a page".into() },
            PriorMessage { role: Role::Assistant, content: "done".into() },
        ];
        let text = client(base)
            .generate(GenerationRequest {
                prompt: "add a footer",
                api_key: "test-key",
                prior_messages: &prior,
            })
            .await
            .unwrap();
        assert_eq!(text, "{\"files\":[]}");

        let request = server.await.unwrap();
        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        let head = head.to_ascii_lowercase();
        assert!(head.starts_with("post /v1/messages"));
        assert!(head.contains("x-api-key: test-key"));
        assert!(head.contains("anthropic-version: 2023-06-01"));

        let body: Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["system"], templates::system_prompt());
        assert!(body.get("api_key").is_none());
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[2]["content"], "add a footer");
    }

    #[tokio::test]
    async fn surfaces_service_error_message() {
        let reply = json!({
            "type": "error",
            "error": { "type": "authentication_error", "message": "invalid x-api-key" }
        })
        .to_string();
        let (base, _server) = serve_once("401 Unauthorized", reply).await;

        let err = client(base)
            .generate(GenerationRequest { prompt: "hi", api_key: "bad", prior_messages: &[] })
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Remote(ref m) if m == "invalid x-api-key"));
    }

    #[tokio::test]
    async fn falls_back_to_generic_error() {
        let (base, _server) = serve_once("500 Internal Server Error", "oops".into()).await;

        let err = client(base)
            .generate(GenerationRequest { prompt: "hi", api_key: "k", prior_messages: &[] })
            .await
            .unwrap_err();
        match err {
            StudioError::Remote(message) => {
                assert!(message.starts_with("Failed to generate project"));
                assert!(message.contains("500"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_text_is_an_error() {
        let (base, _server) = serve_once("200 OK", json!({ "content": [] }).to_string()).await;

        let err = client(base)
            .generate(GenerationRequest { prompt: "hi", api_key: "k", prior_messages: &[] })
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Remote(_)));
    }
}
