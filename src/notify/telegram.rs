use crate::notify::Notifier;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://api.telegram.org";
/// Telegram allows up to 10 items per album; offers send at most 9.
const MAX_IMAGES: usize = 9;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
}

/// Sends offers through the Telegram Bot API
pub struct TelegramNotifier {
    client: Client,
    token: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create Telegram client")?;
        Ok(Self {
            client,
            token: token.into(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        let url = format!("{API_BASE}/bot{}/{method}", self.token);
        let response: ApiResponse<T> = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Telegram {method} request failed"))?
            .json()
            .await
            .with_context(|| format!("Malformed Telegram {method} response"))?;

        if !response.ok {
            bail!(
                "Telegram {method} failed: {}",
                response.description.unwrap_or_default()
            );
        }
        response
            .result
            .ok_or_else(|| anyhow!("Telegram {method} returned no result"))
    }

    /// Sends the photos and returns the id of the first media message.
    async fn send_images(&self, chat_id: i64, images: &[String]) -> Result<Option<i64>> {
        let Some((method, body)) = media_request(chat_id, images) else {
            return Ok(None);
        };
        let first = if method == "sendMediaGroup" {
            let messages: Vec<Message> = self.call(method, &body).await?;
            messages.first().map(|m| m.message_id)
        } else {
            let message: Message = self.call(method, &body).await?;
            Some(message.message_id)
        };
        Ok(first)
    }
}

/// Album for two or more images, a single photo otherwise.
fn media_request(chat_id: i64, images: &[String]) -> Option<(&'static str, Value)> {
    let images = &images[..images.len().min(MAX_IMAGES)];
    match images {
        [] => None,
        [photo] => Some(("sendPhoto", json!({ "chat_id": chat_id, "photo": photo }))),
        _ => {
            let media: Vec<Value> = images
                .iter()
                .map(|url| json!({ "type": "photo", "media": url }))
                .collect();
            Some(("sendMediaGroup", json!({ "chat_id": chat_id, "media": media })))
        }
    }
}

fn message_request(chat_id: i64, text: &str, reply_to: Option<i64>) -> Value {
    let mut body = json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "HTML",
    });
    if let Some(id) = reply_to {
        body["reply_to_message_id"] = json!(id);
    }
    body
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, user_id: i64, text: &str, images: &[String]) -> Result<()> {
        let reply_to = self.send_images(user_id, images).await?;
        let _: Message = self
            .call("sendMessage", &message_request(user_id, text, reply_to))
            .await?;
        debug!("Sent offer to user {} ({} images)", user_id, images.len());
        Ok(())
    }
}
