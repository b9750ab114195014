//! OpenAI chat-completions classifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use autocat_core::CancellationToken;

use crate::classifier::Classifier;
use crate::prompt::PromptTemplate;
use crate::result::{AiError, Classification};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Request timeout for a single completion call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub template: PromptTemplate,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            template: PromptTemplate::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Classifier backed by an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClassifier {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClassifier {
    pub fn new(config: OpenAiConfig) -> Result<Self, AiError> {
        if config.api_key.trim().is_empty() {
            return Err(AiError::InvalidConfig("missing API key".to_string()));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AiError::InvalidConfig(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::service(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::service(Some(status.as_u16()), body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AiError::MalformedResponse("no completion choice returned".to_string()))
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(
        &self,
        categories: &[String],
        destination_name: &str,
        description: &str,
        cancel: &CancellationToken,
    ) -> Result<Classification, AiError> {
        let template = self.config.template;
        let prompt = template.render(categories, destination_name, description);

        // Dropping the request future aborts the HTTP exchange.
        let content = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AiError::Cancelled),
            content = self.complete(&prompt) => content?,
        };

        debug!(model = %self.config.model, response = %content, "classifier answered");

        match template.match_guess(categories, &content) {
            Some(category) => Ok(Classification::matched(category.clone(), prompt, content)),
            None => {
                warn!(
                    prompt = %prompt,
                    guess = %PromptTemplate::clean_guess(&content),
                    "classifier could not classify the transaction"
                );
                Ok(Classification::unmatched(prompt, content))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{MatchMode, PromptLocale};
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};
    use std::time::{Duration, Instant};

    async fn spawn_stub(status: StatusCode, body: Value) -> String {
        spawn_delayed_stub(status, body, Duration::ZERO).await
    }

    async fn spawn_delayed_stub(status: StatusCode, body: Value, delay: Duration) -> String {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(request): Json<Value>| {
                let body = body.clone();
                async move {
                    assert_eq!(request["messages"][0]["role"], "user");
                    tokio::time::sleep(delay).await;
                    (status, Json(body))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn completion(content: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    fn categories() -> Vec<String> {
        vec!["Groceries".into(), "Shopping".into()]
    }

    fn classifier(base_url: String, mode: MatchMode) -> OpenAiClassifier {
        OpenAiClassifier::new(
            OpenAiConfig::new("sk-test")
                .with_base_url(base_url)
                .with_template(PromptTemplate::new(PromptLocale::En, mode)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn exact_guess_is_accepted() {
        let base = spawn_stub(StatusCode::OK, completion("Shopping\n")).await;
        let result = classifier(base, MatchMode::Exact)
            .classify(&categories(), "Amazon", "Order", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.category.as_deref(), Some("Shopping"));
        assert_eq!(result.response, "Shopping\n");
        assert!(result.prompt.contains("\"Amazon\""));
    }

    #[tokio::test]
    async fn unknown_guess_is_an_unmatched_outcome() {
        let base = spawn_stub(StatusCode::OK, completion("Travel")).await;
        let result = classifier(base, MatchMode::Exact)
            .classify(&categories(), "Airline", "Ticket", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.category, None);
        assert_eq!(result.response, "Travel");
    }

    #[tokio::test]
    async fn substring_mode_matches_verbose_guess() {
        let base = spawn_stub(StatusCode::OK, completion("Probably groceries.")).await;
        let result = classifier(base, MatchMode::SubstringContains)
            .classify(&categories(), "Market", "Weekly", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.category.as_deref(), Some("Groceries"));
    }

    #[tokio::test]
    async fn non_success_status_is_a_service_error() {
        let base = spawn_stub(StatusCode::TOO_MANY_REQUESTS, json!({"error": "slow down"})).await;
        let err = classifier(base, MatchMode::Exact)
            .classify(&categories(), "Amazon", "Order", &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            AiError::Service { status, body } => {
                assert_eq!(status, Some(429));
                assert!(body.contains("slow down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_request() {
        let token = CancellationToken::new();
        token.cancel();
        let err = classifier("http://127.0.0.1:9".to_string(), MatchMode::Exact)
            .classify(&categories(), "Amazon", "Order", &token)
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_request_in_flight() {
        let base = spawn_delayed_stub(StatusCode::OK, completion("Shopping"), Duration::from_secs(10)).await;
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = classifier(base, MatchMode::Exact)
            .classify(&categories(), "Amazon", "Order", &token)
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(
            OpenAiClassifier::new(OpenAiConfig::new(" ")),
            Err(AiError::InvalidConfig(_))
        ));
    }
}
