use crate::config::{default_model, find_model, Config, ModelInfo};
use crate::error::PromptError;
use crate::llm::prompt::PromptBuilder;
use crate::llm::retry::{retry_with_backoff, RetryPolicy};
use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

static LABEL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*improved prompt:").expect("label regex is valid"));

/// Failure of one request to the completion endpoint.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("API request failed: {0}")]
    Api(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response format: {0}")]
    Format(String),
}

impl RequestError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, RequestError::RateLimited(_))
            || self.to_string().to_lowercase().contains("rate limit")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Sends one chat request and returns the first choice's content.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, RequestError>;
}

pub struct HttpBackend {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpBackend {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self, PromptError> {
        if api_key.trim().is_empty() {
            return Err(PromptError::Configuration(
                "API key is missing. Please check your API key.".to_string(),
            ));
        }

        Ok(Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<String, RequestError> {
        debug!("Sending request to LLM: {:?}", request);

        let url = format!("{}/chat/completions", self.api_url);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!("API error body: {}", text);
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(RequestError::RateLimited(format!("{} - {}", status, text)));
            }
            return Err(RequestError::Api(format!("{} - {}", status, text)));
        }

        let body = response.text().await?;
        let chat_response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| RequestError::Format(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RequestError::Format("LLM returned empty response".to_string()))
    }
}

/// Strips a leading "Improved Prompt:" label and surrounding whitespace.
pub fn clean_response(content: &str) -> String {
    LABEL_PREFIX.replace(content, "").trim().to_string()
}

/// Rewrites prompts through a completion backend, retrying on rate limits.
pub struct PromptImprover {
    backend: Box<dyn CompletionBackend>,
    model: &'static ModelInfo,
    temperature: f32,
    retry_policy: RetryPolicy,
}

impl PromptImprover {
    pub fn new(backend: Box<dyn CompletionBackend>, model_key: &str) -> Self {
        let model = find_model(model_key).unwrap_or_else(|| {
            warn!(
                "Unknown model '{}', falling back to {}",
                model_key,
                default_model().key
            );
            default_model()
        });

        Self {
            backend,
            model,
            temperature: 0.7,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Builds an HTTP-backed improver. Fails when no API key is available.
    pub fn from_config(config: &Config, api_key: Option<&str>) -> Result<Self, PromptError> {
        let api_key = api_key.ok_or_else(|| {
            PromptError::Configuration("API key is missing. Please check your API key.".to_string())
        })?;
        let backend = HttpBackend::new(&config.llm.api_url, api_key)?;

        Ok(Self::new(Box::new(backend), &config.llm.model)
            .with_temperature(config.llm.temperature)
            .with_retry_policy(RetryPolicy::from(&config.retry)))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn current_model(&self) -> &'static ModelInfo {
        self.model
    }

    pub fn set_model(&mut self, model_key: &str) -> Result<(), PromptError> {
        let model = find_model(model_key)
            .ok_or_else(|| PromptError::InvalidModel(model_key.to_string()))?;
        self.model = model;
        Ok(())
    }

    fn build_request(&self, instruction: &str, context: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.id.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: PromptBuilder::build_system_prompt(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: PromptBuilder::build_user_prompt(instruction, context),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.model.max_tokens,
            stream: false,
        }
    }

    pub async fn improve<R>(
        &self,
        instruction: &str,
        context: &str,
        on_retry: R,
    ) -> Result<String, PromptError>
    where
        R: FnMut(u32, Duration),
    {
        if instruction.trim().is_empty() {
            return Err(PromptError::empty_instruction());
        }

        let request = self.build_request(instruction, context);
        let content = retry_with_backoff(
            &self.retry_policy,
            || self.backend.complete(&request),
            on_retry,
        )
        .await?;

        Ok(clean_response(&content))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    /// Replays canned results and records every request it receives.
    #[derive(Clone, Default)]
    pub(crate) struct ScriptedBackend {
        responses: Arc<Mutex<VecDeque<Result<String, RequestError>>>>,
        pub(crate) requests: Arc<Mutex<Vec<ChatRequest>>>,
    }

    impl ScriptedBackend {
        pub(crate) fn new(responses: Vec<Result<String, RequestError>>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into())),
                requests: Arc::default(),
            }
        }

        pub(crate) fn rate_limited_then(times: usize, content: &str) -> Self {
            let mut responses: Vec<Result<String, RequestError>> = (0..times)
                .map(|_| Err(RequestError::RateLimited("429 Too Many Requests".into())))
                .collect();
            responses.push(Ok(content.to_string()));
            Self::new(responses)
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, request: &ChatRequest) -> Result<String, RequestError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RequestError::RateLimited("429 Too Many Requests".into())))
        }
    }

    fn improver(backend: &ScriptedBackend) -> PromptImprover {
        PromptImprover::new(Box::new(backend.clone()), "qwen72b")
    }

    #[test]
    fn strips_label_and_whitespace() {
        assert_eq!(clean_response("Improved Prompt: Do the thing.  "), "Do the thing.");
        assert_eq!(clean_response("\n  improved PROMPT:\nDo it"), "Do it");
        assert_eq!(clean_response("  plain text \n"), "plain text");
        assert_eq!(
            clean_response("Keep Improved Prompt: inside"),
            "Keep Improved Prompt: inside"
        );
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let config = Config::default();
        assert!(matches!(
            PromptImprover::from_config(&config, None),
            Err(PromptError::Configuration(_))
        ));
        assert!(matches!(
            PromptImprover::from_config(&config, Some("   ")),
            Err(PromptError::Configuration(_))
        ));
        assert!(PromptImprover::from_config(&config, Some("secret")).is_ok());
    }

    #[test]
    fn set_model_rejects_unknown_key() {
        let backend = ScriptedBackend::default();
        let mut improver = improver(&backend);

        let err = improver.set_model("gpt-4").unwrap_err();
        assert!(matches!(err, PromptError::InvalidModel(ref id) if id == "gpt-4"));
        assert_eq!(improver.current_model().key, "qwen72b");

        improver.set_model("mistral7b").unwrap();
        assert_eq!(improver.current_model().key, "mistral7b");
    }

    #[test]
    fn unknown_initial_model_falls_back_to_default() {
        let backend = ScriptedBackend::default();
        let improver = PromptImprover::new(Box::new(backend), "nope");
        assert_eq!(improver.current_model().key, "qwen72b");
    }

    #[tokio::test]
    async fn sends_system_and_user_messages() {
        let backend = ScriptedBackend::new(vec![Ok("Improved Prompt: Better".into())]);
        let mut improver = improver(&backend);
        improver.set_model("mistral7b").unwrap();

        let result = improver
            .improve("Write a blog post", "About AI", |_, _| {})
            .await
            .unwrap();
        assert_eq!(result, "Better");

        let requests = backend.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.model, "hf:mistralai/Mistral-7B-Instruct-v0.3");
        assert_eq!(request.max_tokens, 2048);
        assert!(!request.stream);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].role, "user");
        assert!(request.messages[1].content.contains("Context: About AI"));
    }

    #[tokio::test]
    async fn empty_instruction_issues_no_request() {
        let backend = ScriptedBackend::new(vec![Ok("unused".into())]);
        let err = improver(&backend)
            .improve("   ", "context", |_, _| {})
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_through_rate_limits() {
        for failures in 0..3 {
            let backend = ScriptedBackend::rate_limited_then(failures, "Sharper prompt");
            let mut delays: Vec<Duration> = Vec::new();

            let result = improver(&backend)
                .improve("explain tides", "", |_, delay| delays.push(delay))
                .await
                .unwrap();

            assert_eq!(result, "Sharper prompt");
            assert_eq!(backend.calls(), failures + 1);
            assert_eq!(delays.len(), failures);
            for pair in delays.windows(2) {
                assert!(pair[1] >= pair[0] * 2 || pair[1] == Duration::from_secs(10));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_rate_limit_fails_after_three_retries() {
        let backend = ScriptedBackend::default();
        let mut retries = Vec::new();

        let err = improver(&backend)
            .improve("explain tides", "", |attempt, _| retries.push(attempt))
            .await
            .unwrap_err();

        assert_eq!(backend.calls(), 4);
        assert_eq!(retries, vec![1, 2, 3]);
        assert!(matches!(err, PromptError::RateLimit { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn remote_error_surfaces_verbatim() {
        let backend = ScriptedBackend::new(vec![Err(RequestError::Api(
            "401 Unauthorized - bad key".into(),
        ))]);

        let err = improver(&backend)
            .improve("explain tides", "", |_, _| {})
            .await
            .unwrap_err();

        assert_eq!(backend.calls(), 1);
        assert!(err.to_string().contains("401 Unauthorized - bad key"));
    }

    fn local_backend(api_url: String) -> HttpBackend {
        HttpBackend {
            client: Client::builder().no_proxy().build().unwrap(),
            api_url,
            api_key: "key".into(),
        }
    }

    fn sample_request() -> ChatRequest {
        ChatRequest {
            model: "hf:Qwen/Qwen2.5-72B-Instruct".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "hi".into(),
            }],
            temperature: 0.7,
            max_tokens: 16,
            stream: false,
        }
    }

    async fn completions_endpoint(server: &mut ServerGuard, status: usize, body: &str) -> mockito::Mock {
        server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer key")
            .match_body(Matcher::PartialJson(json!({
                "model": "hf:Qwen/Qwen2.5-72B-Instruct",
                "max_tokens": 16,
                "stream": false,
            })))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn http_backend_reads_first_choice() {
        let mut server = Server::new_async().await;
        let mock = completions_endpoint(
            &mut server,
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"Improved Prompt: hello"}},{"message":{"role":"assistant","content":"second"}}]}"#,
        )
        .await;
        let backend = local_backend(server.url());

        let content = backend.complete(&sample_request()).await.unwrap();
        assert_eq!(content, "Improved Prompt: hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_backend_classifies_429() {
        let mut server = Server::new_async().await;
        let mock = completions_endpoint(&mut server, 429, r#"{"error":"slow down"}"#).await;
        let backend = local_backend(server.url());

        let err = backend.complete(&sample_request()).await.unwrap_err();
        assert!(matches!(err, RequestError::RateLimited(_)));
        assert!(err.is_rate_limit());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_backend_reports_other_statuses() {
        let mut server = Server::new_async().await;
        let mock = completions_endpoint(&mut server, 500, r#"{"error":"boom"}"#).await;
        let backend = local_backend(server.url());

        let err = backend.complete(&sample_request()).await.unwrap_err();
        assert!(matches!(err, RequestError::Api(ref msg) if msg.contains("boom")));
        assert!(!err.is_rate_limit());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_backend_rejects_empty_choices() {
        let mut server = Server::new_async().await;
        let mock = completions_endpoint(&mut server, 200, r#"{"choices":[]}"#).await;
        let backend = local_backend(server.url());

        let err = backend.complete(&sample_request()).await.unwrap_err();
        assert!(matches!(err, RequestError::Format(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_backend_sends_bearer_key_from_constructor() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer secret")
            .match_header("content-type", Matcher::Regex("application/json".into()))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"ok"}}]}"#)
            .create_async()
            .await;
        let mut backend = HttpBackend::new(&format!("{}/", server.url()), "secret").unwrap();
        backend.client = Client::builder().no_proxy().build().unwrap();

        assert_eq!(backend.complete(&sample_request()).await.unwrap(), "ok");
        mock.assert_async().await;
    }
}
