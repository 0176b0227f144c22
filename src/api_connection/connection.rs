use base64::{engine::general_purpose, Engine as _};
use dotenv::dotenv;
use reqwest::Client;
use std::env;
use std::error::Error;
use std::fmt;

use super::endpoints::{
    CandidatePart, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Content,
    GenerateContentRequest, GenerateContentResponse, InlineData, Part, Provider, ResponseFormat,
    DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_MODEL, GEMINI_BASE_URL, OPENAI_BASE_URL,
};

#[derive(Debug)]
pub enum ApiConnectionError {
    MissingApiKey(String),
    NetworkError(reqwest::Error),
    SerializationError(serde_json::Error),
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
    EmptyResponse(String),
    UnsupportedProvider(String),
}

impl fmt::Display for ApiConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiConnectionError::MissingApiKey(key_name) => {
                write!(f, "API key not found in environment: {}", key_name)
            }
            ApiConnectionError::NetworkError(err) => write!(f, "Network error: {}", err),
            ApiConnectionError::SerializationError(err) => {
                write!(f, "Serialization error: {}", err)
            }
            ApiConnectionError::ApiError { status, error_body } => {
                write!(f, "API error {}: {}", status, error_body)
            }
            ApiConnectionError::EmptyResponse(detail) => {
                write!(f, "API returned no usable content: {}", detail)
            }
            ApiConnectionError::UnsupportedProvider(detail) => {
                write!(f, "Unsupported provider operation: {}", detail)
            }
        }
    }
}

impl Error for ApiConnectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiConnectionError::NetworkError(err) => Some(err),
            ApiConnectionError::SerializationError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiConnectionError {
    fn from(err: reqwest::Error) -> Self {
        ApiConnectionError::NetworkError(err)
    }
}

impl From<serde_json::Error> for ApiConnectionError {
    fn from(err: serde_json::Error) -> Self {
        ApiConnectionError::SerializationError(err)
    }
}

impl Provider {
    pub fn gemini(api_key_env_var_name: &str) -> Self {
        dotenv().ok();
        Self::Gemini {
            api_key_env: api_key_env_var_name.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn gemini_with_base_url(api_key_env_var_name: &str, base_url: &str) -> Self {
        dotenv().ok();
        Self::Gemini {
            api_key_env: api_key_env_var_name.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn openai(api_key_env_var_name: &str) -> Self {
        dotenv().ok();
        Self::OpenAi {
            api_key_env: api_key_env_var_name.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn openai_with_base_url(api_key_env_var_name: &str, base_url: &str) -> Self {
        dotenv().ok();
        Self::OpenAi {
            api_key_env: api_key_env_var_name.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn resolve_api_key(&self) -> Result<String, ApiConnectionError> {
        let env_var_name = match self {
            Provider::Gemini { api_key_env, .. } => api_key_env,
            Provider::OpenAi { api_key_env, .. } => api_key_env,
        };
        dotenv().ok();
        env::var(env_var_name).map_err(|_| ApiConnectionError::MissingApiKey(env_var_name.clone()))
    }

    /// Sends a text prompt and returns the raw text content of the first
    /// candidate/choice. Callers are responsible for digging any structured
    /// payload out of that text.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, ApiConnectionError> {
        match self {
            Provider::Gemini {
                model, base_url, ..
            } => {
                let request = GenerateContentRequest {
                    contents: vec![Content {
                        parts: vec![Part::Text {
                            text: prompt.to_string(),
                        }],
                    }],
                };
                self.call_generate_content(base_url, model, request).await
            }
            Provider::OpenAi {
                model, base_url, ..
            } => {
                let request = ChatCompletionRequest {
                    model: model.clone(),
                    messages: vec![ChatMessage {
                        role: "user".to_string(),
                        content: prompt.to_string(),
                    }],
                    response_format: Some(ResponseFormat {
                        format_type: "json_object".to_string(),
                    }),
                    temperature: Some(0.2),
                    max_tokens: Some(500),
                };
                self.call_chat_completion(base_url, request).await
            }
        }
    }

    /// Sends a text prompt plus an inline image. Only the Gemini variant can
    /// carry image parts; the OpenAI variant reports `UnsupportedProvider`.
    pub async fn generate_vision(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, ApiConnectionError> {
        match self {
            Provider::Gemini {
                model, base_url, ..
            } => {
                let encoded = general_purpose::STANDARD.encode(image);
                let request = GenerateContentRequest {
                    contents: vec![Content {
                        parts: vec![
                            Part::Text {
                                text: prompt.to_string(),
                            },
                            Part::InlineData {
                                inline_data: InlineData {
                                    mime_type: mime_type.to_string(),
                                    data: encoded,
                                },
                            },
                        ],
                    }],
                };
                self.call_generate_content(base_url, model, request).await
            }
            Provider::OpenAi { .. } => Err(ApiConnectionError::UnsupportedProvider(
                "the OpenAI-compatible provider is text-only; use the Gemini provider for images"
                    .to_string(),
            )),
        }
    }

    async fn call_generate_content(
        &self,
        base_url: &str,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<String, ApiConnectionError> {
        let api_key = self.resolve_api_key()?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            base_url, model, api_key
        );

        let client = Client::new();
        let response = client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(ApiConnectionError::ApiError { status, error_body });
        }

        let body: GenerateContentResponse = response.json().await?;
        let text = body
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part: &CandidatePart| part.text.clone());

        match text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ApiConnectionError::EmptyResponse(
                "no candidates with text parts in generateContent response".to_string(),
            )),
        }
    }

    async fn call_chat_completion(
        &self,
        base_url: &str,
        request: ChatCompletionRequest,
    ) -> Result<String, ApiConnectionError> {
        let api_key = self.resolve_api_key()?;
        let url = format!("{}/v1/chat/completions", base_url);

        let client = Client::new();
        let response = client
            .post(&url)
            .bearer_auth(api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(ApiConnectionError::ApiError { status, error_body });
        }

        let body: ChatCompletionResponse = response.json().await?;
        match body.choices.first() {
            Some(choice) if !choice.message.content.trim().is_empty() => {
                Ok(choice.message.content.clone())
            }
            _ => Err(ApiConnectionError::EmptyResponse(
                "no choices with content in chat completion response".to_string(),
            )),
        }
    }
}
