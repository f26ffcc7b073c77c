//! OpenAI-compatible chat backend for the memory engine.
//!
//! Every call sends the whole turn history followed by the new prompt and
//! returns the first choice's text. Uses [`async_openai`] for the request
//! and response types.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use secrecy::{ExposeSecret, SecretString};

use relaybot_core::backend::ChatBackend;
use relaybot_types::config::MemoryConfig;
use relaybot_types::error::BackendError;
use relaybot_types::session::{MessageRole, Turn};

/// Chat backend for any OpenAI-compatible endpoint.
///
/// Does NOT derive Debug: the `async_openai::Client` holds the API key.
pub struct OpenAiChatBackend {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    max_input_tokens: u32,
    max_reply_tokens: u32,
}

impl OpenAiChatBackend {
    /// Build the backend. With no API key every ask fails authentication.
    pub fn new(config: &MemoryConfig, api_key: Option<SecretString>) -> Self {
        let client = api_key.map(|key| {
            let openai_config = OpenAIConfig::new()
                .with_api_key(key.expose_secret())
                .with_api_base(&config.base_url);
            Client::with_config(openai_config)
        });

        Self {
            client,
            model: config.model.clone(),
            max_input_tokens: config.max_input_tokens,
            max_reply_tokens: config.reply_reserve_tokens,
        }
    }

    /// Read the key from the environment variable named in the config.
    pub fn from_env(config: &MemoryConfig) -> Self {
        let key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .map(SecretString::from);
        if key.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "memory engine API key not set, asks will fail"
            );
        }
        Self::new(config, key)
    }

    fn build_request(&self, history: &[Turn], prompt: &str) -> CreateChatCompletionRequest {
        let mut messages: Vec<ChatCompletionRequestMessage> = history
            .iter()
            .map(|turn| to_message(turn.role, &turn.content))
            .collect();
        messages.push(to_message(MessageRole::User, prompt));

        CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_completion_tokens: Some(self.max_reply_tokens),
            temperature: Some(0.0),
            ..Default::default()
        }
    }
}

fn to_message(role: MessageRole, content: &str) -> ChatCompletionRequestMessage {
    match role {
        MessageRole::System => {
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(content.to_string()),
                name: None,
            })
        }
        MessageRole::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(content.to_string()),
            name: None,
        }),
        MessageRole::Assistant => {
            #[allow(deprecated)]
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                    content.to_string(),
                )),
                refusal: None,
                name: None,
                audio: None,
                tool_calls: None,
                function_call: None,
            })
        }
    }
}

impl ChatBackend for OpenAiChatBackend {
    fn name(&self) -> &str {
        &self.model
    }

    fn max_input_tokens(&self) -> u32 {
        self.max_input_tokens
    }

    async fn complete(&self, history: &[Turn], prompt: &str) -> Result<String, BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::AuthenticationFailed)?;
        let request = self.build_request(history, prompt);

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(BackendError::EmptyResponse)
    }
}

/// Map an `async_openai::error::OpenAIError` to a [`BackendError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> BackendError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "invalid_api_key"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
            {
                BackendError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                BackendError::RateLimited
            } else if code == "context_length_exceeded"
                || api_err.message.contains("maximum context length")
            {
                BackendError::ContextLengthExceeded {
                    max: 0,
                    requested: 0,
                }
            } else {
                BackendError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status().map(|s| s.as_u16()) {
            Some(401) => BackendError::AuthenticationFailed,
            Some(429) => BackendError::RateLimited,
            _ => BackendError::Provider {
                message: err.to_string(),
            },
        },
        _ => BackendError::Provider {
            message: err.to_string(),
        },
    }
}
