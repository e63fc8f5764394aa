//! Chat-completion response client
//!
//! `generate_text_response` never fails loudly: every error is logged and
//! collapsed into `None`. `try_generate_text_response` keeps the cause for
//! callers that want it.

use crate::config::ModelConfig;
use crate::llm::types::*;
use thiserror::Error;

/// Fixed system instruction sent ahead of every prompt
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Why a completion call produced no text
#[derive(Error, Debug)]
pub enum GenerateError {
    /// Connection, DNS, TLS or body read failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not a chat-completion response
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Response contained zero choices
    #[error("response contained no choices")]
    NoChoices,

    /// First choice had no message content
    #[error("first choice has no message content")]
    MissingContent,
}

/// Stateless client for an OpenAI-compatible chat-completion endpoint
#[derive(Debug, Clone)]
pub struct ResponseClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl ResponseClient {
    /// Create a client. No network activity happens here.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: ModelConfig::default().api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from the `[models]` configuration section
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.base_url.clone(), config.model.clone())
            .with_api_key(config.api_key.clone())
    }

    /// Replace the bearer token
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full chat-completion URL
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Build the two-message payload for a prompt
    pub fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
        }
    }

    /// Generate a reply, returning the failure cause on error
    pub async fn try_generate_text_response(
        &self,
        prompt: &str,
    ) -> Result<String, GenerateError> {
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let completion: ChatCompletionResponse = serde_json::from_slice(&bytes)?;

        completion
            .choices
            .into_iter()
            .next()
            .ok_or(GenerateError::NoChoices)?
            .message
            .content
            .ok_or(GenerateError::MissingContent)
    }

    /// Generate a reply, or `None` if anything went wrong (the cause is logged)
    pub async fn generate_text_response(&self, prompt: &str) -> Option<String> {
        match self.try_generate_text_response(prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    model = %self.model,
                    url = %self.completions_url(),
                    "Error generating text response"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::State,
        http::{header, HeaderMap, StatusCode},
        response::IntoResponse,
        routing::post,
        Json, Router,
    };
    use std::sync::{Arc, Mutex};

    /// What the stub endpoint saw
    #[derive(Debug, Clone)]
    struct Captured {
        body: serde_json::Value,
        authorization: Option<String>,
    }

    #[derive(Clone)]
    struct StubState {
        status: StatusCode,
        body: String,
        captured: Arc<Mutex<Vec<Captured>>>,
    }

    async fn stub_completions(
        State(state): State<StubState>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> impl IntoResponse {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        state.captured.lock().unwrap().push(Captured {
            body,
            authorization,
        });
        (
            state.status,
            [(header::CONTENT_TYPE, "application/json")],
            state.body.clone(),
        )
    }

    /// Serve a canned response on an ephemeral port; returns the base URL
    async fn spawn_stub(status: StatusCode, body: String) -> (String, Arc<Mutex<Vec<Captured>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            status,
            body,
            captured: captured.clone(),
        };
        let app = Router::new()
            .route("/v1/chat/completions", post(stub_completions))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/v1", addr), captured)
    }

    /// Client pointed at a stub; bypasses any proxy set in the environment
    fn stub_client(base_url: String) -> ResponseClient {
        let mut client = ResponseClient::new(base_url, "gemma:3b");
        client.client = reqwest::Client::builder().no_proxy().build().unwrap();
        client
    }

    fn completion_body(content: &str) -> String {
        serde_json::json!({
            "id": "chatcmpl-stub",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
        .to_string()
    }

    #[test]
    fn test_new_keeps_configuration() {
        let client = ResponseClient::new("http://localhost:11434/v1", "gemma:3b");
        assert_eq!(client.base_url(), "http://localhost:11434/v1");
        assert_eq!(client.model(), "gemma:3b");
    }

    #[test]
    fn test_completions_url() {
        let client = ResponseClient::new("http://localhost:11434/v1", "gemma:3b");
        assert_eq!(
            client.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );

        let trailing = ResponseClient::new("http://localhost:11434/v1/", "gemma:3b");
        assert_eq!(
            trailing.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_from_config() {
        let config = ModelConfig {
            base_url: "http://gpu-box:11434/v1".to_string(),
            model: "llama3:8b".to_string(),
            api_key: "secret".to_string(),
        };
        let client = ResponseClient::from_config(&config);
        assert_eq!(client.base_url(), "http://gpu-box:11434/v1");
        assert_eq!(client.model(), "llama3:8b");
        assert_eq!(client.api_key, "secret");
    }

    #[test]
    fn test_build_request() {
        let client = ResponseClient::new("http://localhost:11434/v1", "gemma:3b");
        let request = client.build_request("What is the mission of Core Dispatch 2.0?");

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "model": "gemma:3b",
                "messages": [
                    {"role": "system", "content": "You are a helpful assistant."},
                    {"role": "user", "content": "What is the mission of Core Dispatch 2.0?"}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_returns_first_choice_verbatim() {
        let reply = "  Core Dispatch coordinates help.\nFast.  ";
        let (base_url, captured) = spawn_stub(StatusCode::OK, completion_body(reply)).await;
        let client = stub_client(base_url);

        let text = client
            .generate_text_response("What is the mission of Core Dispatch 2.0?")
            .await;
        assert_eq!(text.as_deref(), Some(reply));

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(
            captured[0].body,
            serde_json::json!({
                "model": "gemma:3b",
                "messages": [
                    {"role": "system", "content": "You are a helpful assistant."},
                    {"role": "user", "content": "What is the mission of Core Dispatch 2.0?"}
                ]
            })
        );
        assert_eq!(captured[0].authorization.as_deref(), Some("Bearer ollama"));
    }

    #[tokio::test]
    async fn test_only_first_choice_used() {
        let body = serde_json::json!({
            "choices": [
                {"message": {"role": "assistant", "content": "first"}},
                {"message": {"role": "assistant", "content": "second"}}
            ]
        })
        .to_string();
        let (base_url, _) = spawn_stub(StatusCode::OK, body).await;
        let client = stub_client(base_url);

        assert_eq!(
            client.generate_text_response("pick one").await.as_deref(),
            Some("first")
        );
    }

    #[tokio::test]
    async fn test_sequential_calls_do_not_leak_prompts() {
        let (base_url, captured) = spawn_stub(StatusCode::OK, completion_body("ok")).await;
        let client = stub_client(base_url);

        client.generate_text_response("first prompt").await.unwrap();
        client.generate_text_response("second prompt").await.unwrap();

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 2);
        let messages = captured[1].body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], SYSTEM_PROMPT);
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "second prompt");
        assert!(!captured[1].body.to_string().contains("first prompt"));
    }

    #[tokio::test]
    async fn test_transport_error_returns_none() {
        // Reserve a port, then free it so nothing is listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = stub_client(format!("http://{}/v1", addr));
        assert!(client.generate_text_response("hello").await.is_none());

        let err = client.try_generate_text_response("hello").await.unwrap_err();
        assert!(matches!(err, GenerateError::Transport(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_zero_choices_returns_none() {
        let (base_url, _) = spawn_stub(StatusCode::OK, r#"{"choices":[]}"#.to_string()).await;
        let client = stub_client(base_url);

        assert!(client.generate_text_response("hello").await.is_none());
        let err = client.try_generate_text_response("hello").await.unwrap_err();
        assert!(matches!(err, GenerateError::NoChoices));
    }

    #[tokio::test]
    async fn test_non_success_status_returns_none() {
        let (base_url, _) = spawn_stub(
            StatusCode::NOT_FOUND,
            r#"{"error":{"message":"model 'gemma:3b' not found"}}"#.to_string(),
        )
        .await;
        let client = stub_client(base_url);

        assert!(client.generate_text_response("hello").await.is_none());
        match client.try_generate_text_response("hello").await.unwrap_err() {
            GenerateError::Status { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("not found"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_returns_none() {
        let (base_url, _) = spawn_stub(StatusCode::OK, "<html>oops</html>".to_string()).await;
        let client = stub_client(base_url);

        assert!(client.generate_text_response("hello").await.is_none());
        let err = client.try_generate_text_response("hello").await.unwrap_err();
        assert!(matches!(err, GenerateError::Decode(_)));
    }

    #[tokio::test]
    async fn test_null_content_returns_none() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let (base_url, _) = spawn_stub(StatusCode::OK, body.to_string()).await;
        let client = stub_client(base_url);

        assert!(client.generate_text_response("hello").await.is_none());
        let err = client.try_generate_text_response("hello").await.unwrap_err();
        assert!(matches!(err, GenerateError::MissingContent));
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_independent() {
        let (base_url, captured) = spawn_stub(StatusCode::OK, completion_body("ok")).await;
        let client = stub_client(base_url);

        let (a, b) = tokio::join!(
            client.generate_text_response("alpha"),
            client.generate_text_response("beta")
        );
        assert_eq!(a.as_deref(), Some("ok"));
        assert_eq!(b.as_deref(), Some("ok"));

        let captured = captured.lock().unwrap();
        let mut prompts: Vec<String> = captured
            .iter()
            .map(|c| c.body["messages"][1]["content"].as_str().unwrap().to_string())
            .collect();
        prompts.sort();
        assert_eq!(prompts, vec!["alpha".to_string(), "beta".to_string()]);
    }
}
