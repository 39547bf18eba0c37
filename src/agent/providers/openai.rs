//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Talks to any `OpenAI`-compatible endpoint. The default endpoint is the
//! Keywords AI gateway, which reads attribution from `X-Keywords-*`
//! headers. Those headers are derived from each request's
//! [`RequestContext`], so the HTTP client is configured per call.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent, ChatCompletionTool,
    ChatCompletionToolType, CreateChatCompletionRequest, FunctionCall, FunctionObject,
    ResponseFormat,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use crate::agent::config::AgentConfig;
use crate::agent::message::{
    ChatMessage, ChatRequest, ChatResponse, RequestContext, Role, TokenUsage,
};
use crate::agent::provider::LlmProvider;
use crate::agent::tool::ToolCall;
use crate::error::AgentError;

const HEADER_SOURCE: &str = "x-keywords-source";
const HEADER_CACHE_TTL: &str = "x-keywords-cache-ttl";
const HEADER_AGENT: &str = "x-keywords-agent";
const HEADER_CUSTOMER: &str = "x-keywords-customer-id";
const HEADER_THREAD: &str = "x-keywords-thread-id";

/// `OpenAI`-compatible LLM provider with gateway attribution headers.
pub struct OpenAiProvider {
    openai_config: OpenAIConfig,
    source_tag: String,
    cache_ttl_secs: u64,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Creates a new provider from agent configuration.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(config.base_url.trim_end_matches('/'));

        Self {
            openai_config,
            source_tag: config.source_tag.clone(),
            cache_ttl_secs: config.cache_ttl_secs,
            timeout: config.timeout,
        }
    }

    /// Attribution headers for one request.
    ///
    /// Customer and thread headers are only present when the context
    /// carries them. Values that are not valid header text are dropped.
    fn attribution_headers(&self, ctx: &RequestContext) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let ttl = self.cache_ttl_secs.to_string();
        let pairs = [
            (HEADER_SOURCE, Some(self.source_tag.as_str())),
            (HEADER_CACHE_TTL, Some(ttl.as_str())),
            (HEADER_AGENT, Some(ctx.agent.as_deref().unwrap_or("default"))),
            (HEADER_CUSTOMER, ctx.customer_id.as_deref()),
            (HEADER_THREAD, ctx.thread_id.as_deref()),
        ];

        for (name, value) in pairs {
            let Some(value) = value else { continue };
            match HeaderValue::from_str(value) {
                Ok(v) => {
                    headers.insert(HeaderName::from_static(name), v);
                }
                Err(_) => warn!(header = name, "dropping header with invalid value"),
            }
        }
        headers
    }

    /// Builds a client carrying the request's attribution headers.
    fn client_for(&self, ctx: &RequestContext) -> Result<Client<OpenAIConfig>, AgentError> {
        let http = reqwest::Client::builder()
            .default_headers(self.attribution_headers(ctx))
            .timeout(self.timeout)
            .build()
            .map_err(|e| AgentError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Client::with_config(self.openai_config.clone()).with_http_client(http))
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
            Role::Assistant => {
                let tool_calls = (!msg.tool_calls.is_empty()).then(|| {
                    msg.tool_calls
                        .iter()
                        .map(|tc| ChatCompletionMessageToolCall {
                            id: tc.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect()
                });

                let content = (!msg.content.is_empty()).then(|| {
                    ChatCompletionRequestAssistantMessageContent::Text(msg.content.clone())
                });

                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content,
                    name: None,
                    tool_calls,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
            Role::Tool => ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                content: ChatCompletionRequestToolMessageContent::Text(msg.content.clone()),
                tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
            }),
        }
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();

        let response_format = request.json_mode.then_some(ResponseFormat::JsonObject);

        let tools = (!request.tools.is_empty()).then(|| {
            request
                .tools
                .iter()
                .map(|td| ChatCompletionTool {
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionObject {
                        name: td.name.clone(),
                        description: Some(td.description.clone()),
                        parameters: Some(td.parameters.clone()),
                        strict: None,
                    },
                })
                .collect()
        });

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
            response_format,
            tools,
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("source_tag", &self.source_tag)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let client = self.client_for(&request.context)?;
        let openai_request = Self::build_request(request);
        debug!(
            model = %request.model,
            agent = request.context.agent.as_deref().unwrap_or("default"),
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending chat completion"
        );

        let response = client
            .chat()
            .create(openai_request)
            .await
            .map_err(|e| AgentError::ApiRequest {
                message: e.to_string(),
                status: None,
            })?;

        let choice = response.choices.first();

        let content = choice
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .unwrap_or_default();

        let tool_calls = choice
            .and_then(|c| c.message.tool_calls.as_ref())
            .map(|tcs| {
                tcs.iter()
                    .map(|tc| ToolCall {
                        id: tc.id.clone(),
                        name: tc.function.name.clone(),
                        arguments: tc.function.arguments.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let finish_reason = choice.and_then(|c| {
            c.finish_reason
                .as_ref()
                .map(|fr| format!("{fr:?}").to_lowercase())
        });

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        Ok(ChatResponse {
            content,
            usage,
            tool_calls,
            finish_reason,
        })
    }
}
