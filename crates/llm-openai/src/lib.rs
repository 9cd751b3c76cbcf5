//! OpenAI implementation of [`llm::LlmClient`], extending the teacher's
//! `llm-client::OpenAILlmClient` / `openai-client::OpenAIClient` wrapping
//! style with `async-openai`'s function-calling (`ChatCompletionTool`) API
//! so the reason-act executor can drive real tool-calling completions
//! (spec §6 "Model providers").

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionObjectArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use llm::{ChatOutcome, ChatRequest, ChatResponse, LlmClient, LlmError, Result, ToolCallRequest, Usage};
use prompt::{ChatMessage, MessageRole};
use tracing::instrument;

#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
}

impl OpenAiLlmClient {
    pub fn new(api_key: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
        }
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key).with_api_base(base_url);
        Self {
            client: Client::with_config(config),
        }
    }
}

fn to_openai_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let content = message.content.clone();
    let built = match message.role {
        MessageRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| LlmError::Provider(e.to_string()))?
            .into(),
        MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| LlmError::Provider(e.to_string()))?
            .into(),
        MessageRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| LlmError::Provider(e.to_string()))?
            .into(),
    };
    Ok(built)
}

fn to_openai_tool(tool: &llm::ToolDefinition) -> Result<ChatCompletionTool> {
    let function = FunctionObjectArgs::default()
        .name(tool.name.clone())
        .description(tool.description.clone())
        .parameters(tool.parameters.clone())
        .build()
        .map_err(|e| LlmError::Provider(e.to_string()))?;

    ChatCompletionToolArgs::default()
        .r#type(ChatCompletionToolType::Function)
        .function(function)
        .build()
        .map_err(|e| LlmError::Provider(e.to_string()))
}

#[async_trait]
impl LlmClient for OpenAiLlmClient {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
        let mut messages = Vec::with_capacity(request.messages.len());
        for message in &request.messages {
            messages.push(to_openai_message(message)?);
        }

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(request.model)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens);

        if !request.tools.is_empty() {
            let mut tools = Vec::with_capacity(request.tools.len());
            for tool in &request.tools {
                tools.push(to_openai_tool(tool)?);
            }
            builder.tools(tools);
        }

        let built = builder.build().map_err(|e| LlmError::Provider(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(built)
            .await
            .map_err(|e| LlmError::Provider(e.to_string()))?;

        let usage = response.usage.as_ref().map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        });

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Provider("no choices returned".into()))?;

        let outcome = match choice.message.tool_calls {
            Some(tool_calls) if !tool_calls.is_empty() => {
                let mut calls = Vec::with_capacity(tool_calls.len());
                for call in tool_calls {
                    let arguments = serde_json::from_str(&call.function.arguments)
                        .unwrap_or(serde_json::Value::Null);
                    calls.push(ToolCallRequest {
                        id: call.id,
                        name: call.function.name,
                        arguments,
                    });
                }
                ChatOutcome::ToolCalls(calls)
            }
            _ => ChatOutcome::Final {
                text: choice.message.content.unwrap_or_default(),
            },
        };

        Ok(ChatResponse { outcome, usage })
    }
}
