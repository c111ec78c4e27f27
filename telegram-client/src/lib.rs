pub mod format;

pub use format::{
    build_buttons, escape_html, format_candidate, outbound_for, truncate_chars, truncate_html,
};

use format::{CAPTION_LIMIT, MESSAGE_LIMIT};
use radar_core::{CoreError, TelegramCredentials, TelegramError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Button {
    pub label: String,
    pub url: String,
}

/// A formatted message ready for delivery.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutboundMessage {
    /// HTML-formatted body, used as the photo caption when it fits.
    pub text: String,
    pub photo_url: Option<String>,
    pub buttons: Vec<Button>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Outbound delivery channel. A returned error means the message must be
/// treated as not delivered.
// Futures are awaited on the caller's task; no `Send` bound.
#[allow(async_fn_in_trait)]
pub trait MessageChannel {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), CoreError>;
}

#[derive(Debug, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error_code: Option<u16>,
    pub description: Option<String>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatInfo {
    pub id: i64,
    pub title: Option<String>,
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Bot API method name and JSON body for `message`.
///
/// A photo is sent with the text as its caption only when the text fits the
/// caption limit; otherwise the text goes out alone with previews disabled.
pub fn build_request(chat_id: &str, message: &OutboundMessage) -> (&'static str, Value) {
    let mut body = match message.photo_url.as_deref() {
        Some(photo) if message.text.chars().count() <= CAPTION_LIMIT => json!({
            "chat_id": chat_id,
            "photo": photo,
            "caption": message.text,
            "parse_mode": "HTML",
        }),
        _ => json!({
            "chat_id": chat_id,
            "text": truncate_html(&message.text, MESSAGE_LIMIT),
            "parse_mode": "HTML",
            "link_preview_options": { "is_disabled": true },
        }),
    };

    if !message.buttons.is_empty() {
        let rows: Vec<Value> = message
            .buttons
            .iter()
            .map(|b| json!([{ "text": b.label, "url": b.url }]))
            .collect();
        body["reply_markup"] = json!({ "inline_keyboard": rows });
    }

    let method = if body.get("photo").is_some() {
        "sendPhoto"
    } else {
        "sendMessage"
    };
    (method, body)
}

/// Turn a Bot API envelope into its result or a typed error.
pub fn into_result<T>(
    status: u16,
    response: TelegramResponse<T>,
    chat_id: &str,
) -> Result<T, TelegramError> {
    if response.ok {
        return response.result.ok_or_else(|| TelegramError::InvalidResponse {
            details: "ok response without a result".to_string(),
        });
    }

    let code = response.error_code.unwrap_or(status);
    let description = response
        .description
        .unwrap_or_else(|| "no description".to_string());

    Err(match code {
        401 => TelegramError::Unauthorized,
        429 => TelegramError::RateLimited {
            retry_after: response
                .parameters
                .and_then(|p| p.retry_after)
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        _ if description.to_lowercase().contains("chat not found") => {
            TelegramError::ChatNotFound {
                chat_id: chat_id.to_string(),
            }
        }
        _ => TelegramError::Api { code, description },
    })
}

/// Telegram Bot API channel for a single chat.
pub struct TelegramChannel {
    http_client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("api_base", &self.api_base)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramChannel {
    pub fn new(credentials: TelegramCredentials<'_>, timeout: Duration) -> Result<Self, CoreError> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: credentials.bot_token.to_string(),
            chat_id: credentials.chat_id.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, CoreError> {
        let url = format!("{}/bot{}/{}", self.api_base, self.bot_token, method);
        debug!("Calling Telegram {}", method);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("Network error calling Telegram {}: {}", method, e);
                if e.is_timeout() {
                    CoreError::Telegram(TelegramError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status().as_u16();
        let envelope: TelegramResponse<T> = response.json().await.map_err(|e| {
            error!("Failed to parse Telegram {} response: {}", method, e.without_url());
            CoreError::Telegram(TelegramError::InvalidResponse {
                details: format!("HTTP {} with an unreadable body", status),
            })
        })?;

        into_result(status, envelope, &self.chat_id).map_err(CoreError::Telegram)
    }

    pub async fn get_me(&self) -> Result<BotUser, CoreError> {
        self.call("getMe", &json!({})).await
    }

    pub async fn get_chat(&self) -> Result<ChatInfo, CoreError> {
        self.call("getChat", &json!({ "chat_id": self.chat_id })).await
    }

    /// Check the token and access to the configured chat.
    pub async fn test_connection(&self) -> Result<(BotUser, ChatInfo), CoreError> {
        let me = self.get_me().await?;
        info!(
            "Bot connected successfully: @{}",
            me.username.as_deref().unwrap_or("unknown")
        );

        let chat = self.get_chat().await?;
        info!(
            "Channel access confirmed: {}",
            chat.title
                .as_deref()
                .or(chat.username.as_deref())
                .unwrap_or(&self.chat_id)
        );
        Ok((me, chat))
    }

    pub async fn send_text(&self, text: &str) -> Result<(), CoreError> {
        self.deliver(&OutboundMessage::text(text)).await
    }
}

impl MessageChannel for TelegramChannel {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), CoreError> {
        let (method, body) = build_request(&self.chat_id, message);

        match self.call::<Value>(method, &body).await {
            Ok(_) => {
                info!("Delivered message via {}", method);
                Ok(())
            }
            Err(CoreError::Telegram(TelegramError::Api { code: 400, description }))
                if method == "sendPhoto" =>
            {
                warn!(
                    "Telegram rejected the photo ({}), sending text only",
                    description
                );
                let text_only = OutboundMessage {
                    photo_url: None,
                    ..message.clone()
                };
                let (method, body) = build_request(&self.chat_id, &text_only);
                self.call::<Value>(method, &body).await.map(|_| ())
            }
            Err(e) => Err(e),
        }
    }
}
