//! Telegram front door: answers `/start` with a button that opens the mini app.

use std::future::Future;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::BotConfig;
use crate::error::{KhlError, Result};

pub const BUTTON_TEXT: &str = "Открыть статистику";
pub const WELCOME_TEXT: &str =
    "Добро пожаловать! Нажмите кнопку ниже, чтобы открыть мини-приложение.";
pub const NOT_CONFIGURED_TEXT: &str = "WEB_APP_URL is not configured on the server.";

/// Pause after a failed poll before trying again.
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub web_app: WebAppInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppInfo {
    pub url: String,
}

/// Whether `text` is the `/start` command, with or without a bot mention or payload.
fn is_start_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or_default();
    let command = command.split('@').next().unwrap_or_default();
    command == "/start"
}

/// The answer to one incoming message, if it needs one.
pub fn reply_for(chat_id: i64, text: &str, web_app_url: Option<&str>) -> Option<SendMessage> {
    if !is_start_command(text) {
        return None;
    }
    let reply = match web_app_url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => SendMessage {
            chat_id,
            text: WELCOME_TEXT.to_string(),
            reply_markup: Some(InlineKeyboardMarkup {
                inline_keyboard: vec![vec![InlineKeyboardButton {
                    text: BUTTON_TEXT.to_string(),
                    web_app: WebAppInfo {
                        url: url.to_string(),
                    },
                }]],
            }),
        },
        None => SendMessage {
            chat_id,
            text: NOT_CONFIGURED_TEXT.to_string(),
            reply_markup: None,
        },
    };
    Some(reply)
}

/// Long-polling Telegram bot. Holds no state besides the update offset.
pub struct TelegramBot {
    http: reqwest::Client,
    /// `{api_url}/bot{token}`; never logged.
    endpoint: String,
    web_app_url: Option<String>,
    poll_timeout_secs: u64,
    offset: i64,
}

impl TelegramBot {
    pub fn from_config(config: &BotConfig) -> Result<Self> {
        let token = config
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| KhlError::Bot("bot token is not configured".to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 10))
            .build()
            .map_err(KhlError::ClientBuild)?;
        Ok(Self {
            http,
            endpoint: format!("{}/bot{token}", config.api_url.trim_end_matches('/')),
            web_app_url: config.web_app_url.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
            offset: 0,
        })
    }

    async fn call<B: Serialize, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T> {
        let url = format!("{}/{method}", self.endpoint);
        // reqwest errors carry the URL, which carries the token
        let http_err = |source: reqwest::Error| KhlError::Http {
            url: format!("telegram:{method}"),
            source: source.without_url(),
        };
        let response: ApiResponse<T> = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(http_err)?
            .json()
            .await
            .map_err(http_err)?;
        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(KhlError::Bot(format!(
                "{method}: {}",
                description.unwrap_or_else(|| "no result".to_string())
            ))),
        }
    }

    /// Fetch one batch of updates and answer them. Returns how many replies were sent.
    #[instrument(skip(self), fields(offset = self.offset))]
    pub async fn poll_once(&mut self) -> Result<usize> {
        let request = GetUpdates {
            offset: self.offset,
            timeout: self.poll_timeout_secs,
            allowed_updates: ["message"],
        };
        let updates: Vec<Update> = self.call("getUpdates", &request).await?;

        let mut sent = 0;
        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };
            let text = message.text.as_deref().unwrap_or_default();
            let Some(reply) = reply_for(message.chat.id, text, self.web_app_url.as_deref()) else {
                continue;
            };
            debug!(chat_id = reply.chat_id, "answering /start");
            let _: serde_json::Value = self.call("sendMessage", &reply).await?;
            sent += 1;
        }
        Ok(sent)
    }

    /// Poll until `shutdown` resolves. Failed polls are logged and retried after a pause.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        info!("bot started and waiting for messages");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                result = self.poll_once() => {
                    if let Err(e) = result {
                        warn!(error = %e, "polling failed");
                        tokio::select! {
                            _ = &mut shutdown => break,
                            _ = tokio::time::sleep(RETRY_DELAY) => {}
                        }
                    }
                }
            }
        }
        info!("bot stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn test_start_command_variants() {
        assert!(is_start_command("/start"));
        assert!(is_start_command("/start@khl_stats_bot"));
        assert!(is_start_command("  /start deep-link"));
        assert!(!is_start_command("/stats"));
        assert!(!is_start_command("start"));
        assert!(!is_start_command(""));
    }

    #[test]
    fn test_reply_with_button() {
        let reply = reply_for(42, "/start", Some("https://example.com/app")).unwrap();
        assert_eq!(reply.chat_id, 42);
        let markup = reply.reply_markup.unwrap();
        assert_eq!(markup.inline_keyboard.len(), 1);
        assert_eq!(markup.inline_keyboard[0][0].text, BUTTON_TEXT);
        assert_eq!(markup.inline_keyboard[0][0].web_app.url, "https://example.com/app");
    }

    #[test]
    fn test_reply_without_web_app_url() {
        let reply = reply_for(42, "/start", Some("  ")).unwrap();
        assert_eq!(reply.text, NOT_CONFIGURED_TEXT);
        assert!(reply.reply_markup.is_none());
        assert!(reply_for(42, "hello", None).is_none());
    }

    #[test]
    fn test_missing_token() {
        assert!(matches!(
            TelegramBot::from_config(&BotConfig::default()),
            Err(KhlError::Bot(_))
        ));
    }

    type Sent = Arc<Mutex<Vec<Value>>>;

    async fn spawn_api() -> (String, Sent) {
        let sent: Sent = Arc::default();
        let app = Router::new()
            .route(
                "/botTOKEN/getUpdates",
                post(|| async {
                    Json(json!({
                        "ok": true,
                        "result": [
                            {"update_id": 7, "message": {"chat": {"id": 1}, "text": "/start"}},
                            {"update_id": 8, "message": {"chat": {"id": 2}, "text": "hi"}},
                            {"update_id": 9, "edited_message": {"chat": {"id": 3}}}
                        ]
                    }))
                }),
            )
            .route(
                "/botTOKEN/sendMessage",
                post(|State(sent): State<Sent>, Json(body): Json<Value>| async move {
                    sent.lock().unwrap().push(body);
                    Json(json!({"ok": true, "result": {"message_id": 1}}))
                }),
            )
            .with_state(sent.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        (format!("http://{addr}"), sent)
    }

    #[tokio::test]
    async fn test_poll_once_answers_start() {
        let (api_url, sent) = spawn_api().await;
        let mut bot = TelegramBot::from_config(&BotConfig {
            token: Some("TOKEN".to_string()),
            web_app_url: Some("https://example.com/app".to_string()),
            api_url,
            poll_timeout_secs: 0,
        })
        .unwrap();

        assert_eq!(bot.poll_once().await.unwrap(), 1);
        assert_eq!(bot.offset, 10);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["chat_id"], 1);
        assert_eq!(
            sent[0]["reply_markup"]["inline_keyboard"][0][0]["web_app"]["url"],
            "https://example.com/app"
        );
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let (api_url, _) = spawn_api().await;
        let mut bot = TelegramBot::from_config(&BotConfig {
            token: Some("WRONG".to_string()),
            api_url,
            poll_timeout_secs: 0,
            ..BotConfig::default()
        })
        .unwrap();
        assert!(bot.poll_once().await.is_err());
    }
}
