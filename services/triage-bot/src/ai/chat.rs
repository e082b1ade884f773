//! Prompt-templated chat completions.

use crate::error::ApiError;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use minijinja::{Environment, UndefinedBehavior};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

/// Fill `{{ name }}` placeholders from `vars`.
///
/// Undefined variables are an error rather than rendering empty.
pub fn render_template(
    template: &str,
    vars: &HashMap<String, String>,
) -> Result<String, ApiError> {
    let env = ENV.get_or_init(|| {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env
    });

    env.render_str(template, vars).map_err(|e| ApiError::Template {
        template: template.to_string(),
        details: e.to_string(),
    })
}

/// A prompt template bound to a chat model
pub struct ChatChain {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    prompt: Vec<(Role, String)>,
}

impl ChatChain {
    pub fn new(api_key: &str, prompt: Vec<(Role, String)>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.0,
            prompt,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// The prompt with `vars` substituted
    pub fn render(
        &self,
        vars: &HashMap<String, String>,
    ) -> Result<Vec<(Role, String)>, ApiError> {
        self.prompt
            .iter()
            .map(|(role, template)| Ok((*role, render_template(template, vars)?)))
            .collect()
    }

    fn message(role: Role, content: String) -> Result<ChatCompletionRequestMessage, ApiError> {
        let message: Result<ChatCompletionRequestMessage, _> = match role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(content)
                .build()
                .map(Into::into),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()
                .map(Into::into),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(content)
                .build()
                .map(Into::into),
        };
        message.map_err(|e| ApiError::request("chat/completions", e))
    }

    /// Render the prompt, run the completion and return the reply text
    pub async fn invoke(&self, vars: &HashMap<String, String>) -> Result<String, ApiError> {
        let messages = self
            .render(vars)?
            .into_iter()
            .map(|(role, content)| Self::message(role, content))
            .collect::<Result<Vec<_>, _>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .temperature(self.temperature)
            .messages(messages)
            .build()
            .map_err(|e| ApiError::request("chat/completions", e))?;

        debug!(model = %self.model, "Requesting chat completion");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ApiError::request("chat/completions", e))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ApiError::decode("chat/completions", "no content in first choice"))
    }
}
