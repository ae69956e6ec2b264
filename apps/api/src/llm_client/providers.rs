//! Provider table: endpoint, secret name and wire shape for each supported back-end.
//!
//! Three providers speak the OpenAI-compatible chat shape; HuggingFace's hosted
//! inference speaks a plain text-generation shape. Both are modelled as tagged
//! variants of `ProviderShape` over the same `complete` capability.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm_client::{CompletionRequest, LlmError};

const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const TOGETHER_URL: &str = "https://api.together.xyz/v1/chat/completions";
const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const HUGGINGFACE_URL_TEMPLATE: &str = "https://api-inference.huggingface.co/models/{model}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    Groq,
    Together,
    OpenRouter,
    HuggingFace,
}

impl ProviderTag {
    pub const ALL: [ProviderTag; 4] = [
        ProviderTag::Groq,
        ProviderTag::Together,
        ProviderTag::OpenRouter,
        ProviderTag::HuggingFace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderTag::Groq => "groq",
            ProviderTag::Together => "together",
            ProviderTag::OpenRouter => "openrouter",
            ProviderTag::HuggingFace => "huggingface",
        }
    }

    pub fn secret_name(&self) -> &'static str {
        match self {
            ProviderTag::Groq => "GROQ_API_KEY",
            ProviderTag::Together => "TOGETHER_API_KEY",
            ProviderTag::OpenRouter => "OPENROUTER_API_KEY",
            ProviderTag::HuggingFace => "HUGGINGFACE_API_KEY",
        }
    }

    /// Model used when the caller does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderTag::Groq => "llama3-70b-8192",
            ProviderTag::Together => "togethercomputer/Command-R+",
            ProviderTag::OpenRouter => "openai/gpt-4-turbo",
            ProviderTag::HuggingFace => "mistralai/Mistral-7B-Instruct-v0.1",
        }
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderTag {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ProviderTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == wanted)
            .ok_or_else(|| LlmError::UnsupportedProvider(s.to_string()))
    }
}

/// Request/response convention of a back-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderShape {
    /// OpenAI-style `messages` in, `choices[0].message.content` out.
    Chat { url: String },
    /// `[INST]`-wrapped `inputs` in, `[0].generated_text` out.
    Text { url: String },
}

/// Immutable per-call description of where and how to send a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub tag: ProviderTag,
    pub model: String,
    pub shape: ProviderShape,
    pub secret_name: &'static str,
}

impl ProviderSelection {
    pub fn resolve(tag: ProviderTag, model: &str) -> Self {
        let model = match model.trim() {
            "" => tag.default_model().to_string(),
            m => m.to_string(),
        };
        let shape = match tag {
            ProviderTag::Groq => ProviderShape::Chat {
                url: GROQ_URL.to_string(),
            },
            ProviderTag::Together => ProviderShape::Chat {
                url: TOGETHER_URL.to_string(),
            },
            ProviderTag::OpenRouter => ProviderShape::Chat {
                url: OPENROUTER_URL.to_string(),
            },
            ProviderTag::HuggingFace => ProviderShape::Text {
                url: HUGGINGFACE_URL_TEMPLATE.replace("{model}", &model),
            },
        };
        Self {
            tag,
            model,
            shape,
            secret_name: tag.secret_name(),
        }
    }

    pub fn url(&self) -> &str {
        match &self.shape {
            ProviderShape::Chat { url } | ProviderShape::Text { url } => url,
        }
    }

    /// Serializes the JSON body for this provider's wire shape, fields in wire order.
    pub fn request_body(&self, request: &CompletionRequest) -> Result<Vec<u8>, LlmError> {
        let body = match self.shape {
            ProviderShape::Chat { .. } => serde_json::to_vec(&ChatRequest {
                model: &self.model,
                messages: [
                    ChatMessage {
                        role: "system",
                        content: &request.system_prompt,
                    },
                    ChatMessage {
                        role: "user",
                        content: &request.prompt,
                    },
                ],
                max_tokens: request.sampling.max_tokens,
                temperature: request.sampling.temperature,
            })?,
            ProviderShape::Text { .. } => serde_json::to_vec(&TextRequest {
                inputs: format!(
                    "[INST] <<SYS>> {} <</SYS>> {} [/INST]",
                    request.system_prompt, request.prompt
                ),
                parameters: TextParameters {
                    return_full_text: false,
                    temperature: request.sampling.temperature,
                    max_new_tokens: request.sampling.max_new_tokens,
                },
            })?,
        };
        Ok(body)
    }

    /// Pulls the generated text out of a successful response body.
    pub fn extract_output(&self, body: &str) -> Result<String, LlmError> {
        match self.shape {
            ProviderShape::Chat { .. } => {
                let envelope: ChatResponse = serde_json::from_str(body).map_err(|e| {
                    LlmError::MalformedEnvelope(format!("chat completion envelope: {e}"))
                })?;
                envelope
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .map(|content| content.trim().to_string())
                    .ok_or_else(|| {
                        LlmError::MalformedEnvelope("response has no choices[0].message.content".into())
                    })
            }
            ProviderShape::Text { .. } => {
                let value: Value = serde_json::from_str(body).map_err(|e| {
                    LlmError::MalformedEnvelope(format!("text generation envelope: {e}"))
                })?;
                value
                    .as_array()
                    .and_then(|items| items.first())
                    .and_then(|first| first.get("generated_text"))
                    .and_then(Value::as_str)
                    .map(|text| text.trim().to_string())
                    .ok_or_else(|| {
                        LlmError::MalformedEnvelope(format!("Hugging Face API Error: {value}"))
                    })
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct TextRequest {
    inputs: String,
    parameters: TextParameters,
}

#[derive(Debug, Serialize)]
struct TextParameters {
    return_full_text: bool,
    temperature: f64,
    max_new_tokens: u32,
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
    content: Option<String>,
}
