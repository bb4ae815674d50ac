//! Ollama API payloads used by the synthesizer

use serde::{Deserialize, Serialize};

/// Response from Ollama /api/tags endpoint
#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagModel>,
}

/// Installed model entry
#[derive(Debug, Deserialize)]
pub struct TagModel {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model: String,
}

impl TagModel {
    /// Name as reported, falling back to the `model` field
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.model
        } else {
            &self.name
        }
    }
}

/// One chat turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Generation options
#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

/// Request body for POST /api/chat
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ChatOptions,
}

/// Non-streaming /api/chat response
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
}

/// Error body Ollama returns on failures
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_response_accepts_name_or_model() {
        let json = r#"{"models":[{"name":"llama3.2:latest"},{"model":"qwen2.5:7b"}]}"#;
        let tags: TagsResponse = serde_json::from_str(json).unwrap();
        let labels: Vec<&str> = tags.models.iter().map(TagModel::label).collect();
        assert_eq!(labels, vec!["llama3.2:latest", "qwen2.5:7b"]);
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "llama3.2".to_string(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            stream: false,
            options: ChatOptions {
                temperature: 0.3,
                num_predict: 1000,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["options"]["num_predict"], 1000);
    }

    #[test]
    fn test_chat_response_parse() {
        let json = r#"{"model":"llama3.2","message":{"role":"assistant","content":" Paris. "},"done":true}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.message.content, " Paris. ");
    }
}
