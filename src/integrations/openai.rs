use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Transformer;
use crate::error::RelayError;

const SERVICE: &str = "openai";

/// 改写人设：去掉可识别的写作习惯，保留原意
const PERSONA_PROMPT: &str = "Rewrite the user's message so its meaning is preserved \
but the author's personal writing style cannot be recognised. Use neutral, plain \
language, keep it roughly the same length, and reply with the rewritten message only.";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// 调用 chat completions 接口改写文本
pub struct OpenAiTransformer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiTransformer {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Transformer for OpenAiTransformer {
    async fn transform(&self, text: &str) -> Result<String, RelayError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: PERSONA_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.7,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::upstream(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::upstream(SERVICE, format!("HTTP {}", status)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| RelayError::upstream(SERVICE, e))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| RelayError::upstream(SERVICE, "empty completion"))
    }
}

/// 不改写，原样返回
pub struct PassthroughTransformer;

#[async_trait]
impl Transformer for PassthroughTransformer {
    async fn transform(&self, text: &str) -> Result<String, RelayError> {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_response() {
        let body: ChatResponse = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": " rewritten "}}]
        }))
        .unwrap();
        assert_eq!(body.choices[0].message.content.as_deref(), Some(" rewritten "));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let t = OpenAiTransformer::new(
            "https://example.test/v1/".to_string(),
            "key".to_string(),
            "model".to_string(),
        );
        assert_eq!(t.base_url, "https://example.test/v1");
    }
}
