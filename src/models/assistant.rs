use serde::{Deserialize, Serialize};

/// POST /api/ai/query body
#[derive(Debug, Deserialize)]
pub struct AssistantQuery {
    #[serde(default)]
    pub query: Option<serde_json::Value>,
    #[serde(default, rename = "includeImage")]
    pub include_image: bool,
}

/// Reply returned by both assistant endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub text: String,
    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl AssistantReply {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: None,
        }
    }
}
