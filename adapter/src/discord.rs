use async_trait::async_trait;
use kernel::model::id::{ChannelId, MessageId};
use kernel::port::chat::{Attachment, ChatPort};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use shared::{
    config::DiscordConfig,
    error::{AppError, AppResult},
};
use tokio::sync::OnceCell;

const API_BASE: &str = "https://discord.com/api/v10";

/// Discord REST API 経由の ChatPort 実装。
/// フォームやセレクタなどの対話面はゲートウェイ側の責務で、ここでは
/// メッセージの送信・編集・削除だけを扱う。
pub struct DiscordClient {
    http: Client,
    token: String,
    own_user_id: OnceCell<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Deserialize)]
struct HistoryMessage {
    id: String,
    author: MessageAuthor,
}

#[derive(Deserialize)]
struct MessageAuthor {
    id: String,
}

impl DiscordClient {
    pub fn new(cfg: &DiscordConfig) -> Self {
        Self {
            http: Client::new(),
            token: cfg.bot_token.clone(),
            own_user_id: OnceCell::new(),
        }
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn own_user_id(&self) -> AppResult<&str> {
        #[derive(Deserialize)]
        struct Me {
            id: String,
        }

        self.own_user_id
            .get_or_try_init(|| async {
                let me: Me = self
                    .http
                    .get(format!("{API_BASE}/users/@me"))
                    .header("Authorization", self.auth())
                    .send()
                    .await
                    .map_err(external)?
                    .error_for_status()
                    .map_err(external)?
                    .json()
                    .await
                    .map_err(external)?;
                Ok::<_, AppError>(me.id)
            })
            .await
            .map(String::as_str)
    }

    // 本文と添付を multipart に組み立てる。添付を差し替えるときは
    // attachments を明示的に上書きする必要がある。
    fn build_form(content: &str, attachment: Option<Attachment>) -> Form {
        let payload = match &attachment {
            Some(a) => serde_json::json!({
                "content": content,
                "attachments": [{ "id": 0, "filename": a.filename }],
            }),
            None => serde_json::json!({ "content": content, "attachments": [] }),
        };

        let mut form = Form::new().text("payload_json", payload.to_string());
        if let Some(a) = attachment {
            form = form.part("files[0]", Part::bytes(a.bytes).file_name(a.filename));
        }
        form
    }
}

#[async_trait]
impl ChatPort for DiscordClient {
    async fn send(
        &self,
        channel: ChannelId,
        content: &str,
        attachment: Option<Attachment>,
    ) -> AppResult<MessageId> {
        let message: SentMessage = self
            .http
            .post(format!("{API_BASE}/channels/{}/messages", channel.raw()))
            .header("Authorization", self.auth())
            .multipart(Self::build_form(content, attachment))
            .send()
            .await
            .map_err(external)?
            .error_for_status()
            .map_err(external)?
            .json()
            .await
            .map_err(external)?;

        let raw = message.id.parse().map_err(|_| {
            AppError::ConversionEntityError(format!("invalid message id: {}", message.id))
        })?;
        Ok(MessageId::new(raw))
    }

    async fn edit(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: &str,
        attachment: Option<Attachment>,
    ) -> AppResult<()> {
        self.http
            .patch(format!(
                "{API_BASE}/channels/{}/messages/{}",
                channel.raw(),
                message.raw()
            ))
            .header("Authorization", self.auth())
            .multipart(Self::build_form(content, attachment))
            .send()
            .await
            .map_err(external)?
            .error_for_status()
            .map_err(external)?;

        Ok(())
    }

    async fn delete(&self, channel: ChannelId, message: MessageId) -> AppResult<()> {
        self.http
            .delete(format!(
                "{API_BASE}/channels/{}/messages/{}",
                channel.raw(),
                message.raw()
            ))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(external)?
            .error_for_status()
            .map_err(external)?;

        Ok(())
    }

    async fn purge_own(&self, channel: ChannelId, lookback: u8) -> AppResult<()> {
        let own_id = self.own_user_id().await?.to_string();

        let history: Vec<HistoryMessage> = self
            .http
            .get(format!("{API_BASE}/channels/{}/messages", channel.raw()))
            .header("Authorization", self.auth())
            .query(&[("limit", lookback.to_string())])
            .send()
            .await
            .map_err(external)?
            .error_for_status()
            .map_err(external)?
            .json()
            .await
            .map_err(external)?;

        for message in history.into_iter().filter(|m| m.author.id == own_id) {
            let raw: u64 = match message.id.parse() {
                Ok(raw) => raw,
                Err(_) => continue,
            };
            self.delete(channel, MessageId::new(raw)).await?;
        }

        Ok(())
    }
}

fn external(e: impl std::fmt::Display) -> AppError {
    AppError::ExternalServiceError(format!("Discord API error: {e}"))
}
