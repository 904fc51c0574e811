//! OpenAI-compatible Chat Completions transport.
//!
//! Sends the whole transcript plus the fixed tool set on every call, with
//! text-only response framing and `tool_choice: "auto"`. A 429 is retried per
//! [`RetryPolicy`]; every other non-2xx status fails at once with the body
//! logged.

use async_trait::async_trait;
use pathcoach_config::AppConfig;
use pathcoach_core::error::ProviderError;
use pathcoach_core::message::{Message, MessageToolCall, Role};
use pathcoach_core::provider::*;
use pathcoach_core::tool::ToolDefinition;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::retry::RetryPolicy;

/// An OpenAI-compatible completion provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    organization: Option<String>,
    model: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider. Fails with `NotConfigured` when the key is blank.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "an API key is required (set OPENAI_API_KEY)".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            organization: None,
            model: model.into(),
            retry: RetryPolicy::default(),
            client,
        })
    }

    /// Build the provider described by the loaded configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let provider = &config.provider;
        let api_key = provider.api_key.clone().unwrap_or_default();
        let mut this = Self::new("openai", &provider.base_url, api_key, &provider.model)?
            .with_retry(RetryPolicy::from_config(&config.retry));
        this.organization = provider.organization.clone();
        this.client = reqwest::Client::builder()
            .timeout(Duration::from_secs(provider.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(this)
    }

    /// Send `OpenAI-Organization` with every request.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The exact JSON body posted for `request`.
    fn request_body(&self, request: &CompletionRequest) -> ChatCompletionBody {
        ChatCompletionBody {
            model: self.model.clone(),
            messages: Self::to_api_messages(&request.messages),
            tools: Self::to_api_tools(&request.tools),
            tool_choice: "auto",
            response_format: ResponseFormat { r#type: "text" },
            max_completion_tokens: request.max_completion_tokens,
        }
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().into(),
                content: m.content.clone(),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
                name: m.tool_name.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Decode the first choice of a successful response.
    fn decode(api_response: ApiResponse) -> Result<CompletionResponse, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let tool_calls: Vec<MessageToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| MessageToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let text = extract_text(choice.message.content.as_ref());
        let message = Message {
            role: Role::Assistant,
            content: (!text.is_empty()).then_some(text),
            tool_calls,
            tool_call_id: None,
            tool_name: None,
        };

        Ok(CompletionResponse {
            message,
            finish_reason: FinishReason::parse(choice.finish_reason.as_deref()),
            usage: api_response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: api_response.model.unwrap_or_default(),
        })
    }
}

/// Flatten message content: a plain string, or an array of parts carrying
/// `text` or `content`.
fn extract_text(content: Option<&serde_json::Value>) -> String {
    match content {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(parts)) => parts
            .iter()
            .map(|p| {
                p.get("text")
                    .and_then(|t| t.as_str())
                    .or_else(|| p.get("content").and_then(|c| c.as_str()))
                    .unwrap_or("")
            })
            .collect(),
        _ => String::new(),
    }
}

#[async_trait]
impl pathcoach_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        for attempt in 0..self.retry.max_attempts {
            debug!(
                provider = %self.name,
                model = %self.model,
                attempt = attempt + 1,
                has_org = self.organization.is_some(),
                max_completion_tokens = request.max_completion_tokens,
                "Sending completion request"
            );

            let mut builder = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json");
            if let Some(org) = &self.organization {
                builder = builder.header("OpenAI-Organization", org);
            }

            let response = builder
                .json(&body)
                .send()
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?;

            let status = response.status().as_u16();
            debug!(status, "Completion response status");

            if status == 429 {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);

                if attempt + 1 >= self.retry.max_attempts {
                    warn!(attempt = attempt + 1, "Rate limited on final attempt");
                    break;
                }

                let delay = self.retry.delay_for(attempt, retry_after.as_deref());
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !response.status().is_success() {
                let error_body = response.text().await.unwrap_or_default();
                warn!(status, body = %error_body, "Provider returned error");
                return Err(ProviderError::ApiError {
                    status_code: status,
                    body: error_body,
                });
            }

            let api_response: ApiResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

            return Self::decode(api_response);
        }

        Err(ProviderError::RateLimitExhausted {
            attempts: self.retry.max_attempts,
        })
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ChatCompletionBody {
    model: String,
    messages: Vec<ApiMessage>,
    tools: Vec<ApiToolDefinition>,
    tool_choice: &'static str,
    response_format: ResponseFormat,
    max_completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<serde_json::Value>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
