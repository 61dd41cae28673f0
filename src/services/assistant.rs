//! Boundary adapter for the hosted completion and image generation API.
//!
//! Upstream failures never leave this module: callers always get a
//! well-formed [`AssistantReply`], falling back to canned text.

use serde::Deserialize;
use serde_json::json;

use crate::config::AssistantConfig;
use crate::error::{AppError, Result};
use crate::models::AssistantReply;

const SYSTEM_PROMPT: &str = "You are Lovely, a friendly and helpful AI assistant for an image upload website. \
Your goal is to help users understand how to use the website's features:
- Upload images via drag and drop or file selection
- Preview images before uploading
- Track upload progress
- View the gallery of uploaded images
- Delete images they no longer want
- Download images to their device

Keep your responses concise, friendly, and helpful. Sign your responses with \"~ Lovely 💖\".
If you don't know the answer to a question, politely say so and offer to help with something else.";

const EMPTY_COMPLETION_TEXT: &str = "I'm sorry, I couldn't generate a response. ~ Lovely 💖";

pub const QUERY_FALLBACK_TEXT: &str = "I'm sorry, I encountered an error while processing your request. \
Please try again later. ~ Lovely 💖";

const WELCOME_TEXT: &str = "Welcome to our Image Uploader! I'm Lovely, your assistant. \
I can help you learn how to upload, manage, and share your images. \
Feel free to ask me any questions about using this website! ~ Lovely 💖";

pub const WELCOME_FALLBACK_TEXT: &str = "Welcome to our Image Uploader! I'm Lovely, your assistant. \
I'm here to help you with any questions you might have about using this website! ~ Lovely 💖";

const AVATAR_PROMPT: &str = "Create a friendly, cute anime-style avatar for an AI assistant named Lovely \
with pink hair and a soft, welcoming expression. The image should be in a soft, pastel color palette, \
perfect for a user interface. The character should appear approachable and helpful.";

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ImageGeneration {
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

/// Assistant service
#[derive(Clone)]
pub struct AssistantService {
    client: reqwest::Client,
    config: AssistantConfig,
}

impl AssistantService {
    pub fn new(config: AssistantConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Answer a user question, optionally with an illustration
    pub async fn reply(&self, query: &str, include_image: bool) -> AssistantReply {
        match self.try_reply(query, include_image).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Error generating assistant response: {}", e);
                AssistantReply::text_only(QUERY_FALLBACK_TEXT)
            }
        }
    }

    /// Greeting with a generated avatar
    pub async fn welcome(&self) -> AssistantReply {
        match self.generate_image(AVATAR_PROMPT).await {
            Ok(image_url) => AssistantReply {
                text: WELCOME_TEXT.to_string(),
                image_url,
            },
            Err(e) => {
                tracing::error!("Error generating welcome message: {}", e);
                AssistantReply::text_only(WELCOME_FALLBACK_TEXT)
            }
        }
    }

    async fn try_reply(&self, query: &str, include_image: bool) -> Result<AssistantReply> {
        let text = self.complete(query).await?;

        let image_url = if include_image {
            let prompt = format!(
                "Create a simple, friendly, and helpful illustration related to: {}. \
                 The image should be cute, pastel-colored, and appealing. \
                 Perfect for a user interface of an image uploader website.",
                query
            );
            self.generate_image(&prompt).await?
        } else {
            None
        };

        Ok(AssistantReply { text, image_url })
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Internal("Assistant API key is not configured".to_string()))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn complete(&self, query: &str) -> Result<String> {
        let body = json!({
            "model": self.config.chat_model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": query },
            ],
            "max_tokens": self.config.max_tokens,
        });

        let completion: ChatCompletion = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(self.api_key()?)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .unwrap_or_else(|| EMPTY_COMPLETION_TEXT.to_string());

        Ok(text)
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<String>> {
        let body = json!({
            "model": self.config.image_model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
            "quality": "standard",
        });

        let generation: ImageGeneration = self
            .client
            .post(self.endpoint("images/generations"))
            .bearer_auth(self.api_key()?)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(generation.data.into_iter().next().and_then(|image| image.url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};

    /// Serve a fake upstream on an ephemeral port and return its base URL
    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config_for(base_url: String) -> AssistantConfig {
        AssistantConfig {
            api_key: Some("sk-test".to_string()),
            base_url,
            ..AssistantConfig::default()
        }
    }

    #[tokio::test]
    async fn test_falls_back_without_api_key() {
        let service = AssistantService::new(AssistantConfig::default());

        let reply = service.reply("how do I upload?", true).await;
        assert_eq!(reply, AssistantReply::text_only(QUERY_FALLBACK_TEXT));

        let welcome = service.welcome().await;
        assert_eq!(welcome, AssistantReply::text_only(WELCOME_FALLBACK_TEXT));
    }

    #[tokio::test]
    async fn test_reply_with_image() {
        let router = Router::new()
            .route(
                "/chat/completions",
                post(|| async {
                    let message = json!({ "content": "Drag files in! ~ Lovely 💖" });
                    Json(json!({ "choices": [{ "message": message }] }))
                }),
            )
            .route(
                "/images/generations",
                post(|| async {
                    Json(json!({ "data": [{ "url": "https://img.example/1.png" }] }))
                }),
            );
        let service = AssistantService::new(config_for(spawn_upstream(router).await));

        let reply = service.reply("how do I upload?", true).await;
        assert_eq!(reply.text, "Drag files in! ~ Lovely 💖");
        assert_eq!(reply.image_url.as_deref(), Some("https://img.example/1.png"));

        let text_only = service.reply("hi", false).await;
        assert!(text_only.image_url.is_none());

        let welcome = service.welcome().await;
        assert_eq!(welcome.text, WELCOME_TEXT);
        assert!(welcome.image_url.is_some());
    }

    #[tokio::test]
    async fn test_upstream_error_is_absorbed() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded for key sk-test") }),
        );
        let service = AssistantService::new(config_for(spawn_upstream(router).await));

        let reply = service.reply("hello", false).await;
        assert_eq!(reply.text, QUERY_FALLBACK_TEXT);
        assert!(!reply.text.contains("quota"));
    }
}
