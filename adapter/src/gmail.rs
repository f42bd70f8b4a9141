use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use kernel::port::mailbox::{MailMessage, MailboxPort};
use reqwest::Client;
use serde::Deserialize;
use shared::{
    config::GmailConfig,
    error::{AppError, AppResult},
};

const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Gmail REST API 経由の MailboxPort 実装。
/// トークンは設定から渡される前提で、ここでは取得フローを持たない。
pub struct GmailClient {
    http: Client,
    access_token: String,
}

#[derive(Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Deserialize)]
struct Message {
    id: String,
    #[serde(default)]
    snippet: String,
    payload: MessagePart,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct PartBody {
    data: Option<String>,
}

impl GmailClient {
    pub fn new(cfg: &GmailConfig) -> Self {
        Self {
            http: Client::new(),
            access_token: cfg.access_token.clone(),
        }
    }

    // text/plain と text/html のパートを集めて結合する
    fn collect_text(part: &MessagePart, texts: &mut Vec<String>) {
        if part.mime_type == "text/plain" || part.mime_type == "text/html" {
            if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_ref()) {
                if let Some(decoded) = decode_body(data) {
                    texts.push(decoded);
                }
            }
        }
        for child in &part.parts {
            Self::collect_text(child, texts);
        }
    }
}

// Gmail の本文はパディングの有無が揺れる base64url
fn decode_body(data: &str) -> Option<String> {
    general_purpose::URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| general_purpose::URL_SAFE.decode(data))
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl MailboxPort for GmailClient {
    async fn fetch_recent(&self, subject: &str, limit: usize) -> AppResult<Vec<MailMessage>> {
        let list: MessageList = self
            .http
            .get(format!("{API_BASE}/messages"))
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", format!("subject:\"{subject}\"")),
                ("maxResults", limit.to_string()),
            ])
            .send()
            .await
            .map_err(external)?
            .error_for_status()
            .map_err(external)?
            .json()
            .await
            .map_err(external)?;

        let mut messages = Vec::with_capacity(list.messages.len());
        for reference in list.messages {
            let message: Message = self
                .http
                .get(format!("{API_BASE}/messages/{}", reference.id))
                .bearer_auth(&self.access_token)
                .query(&[("format", "full")])
                .send()
                .await
                .map_err(external)?
                .error_for_status()
                .map_err(external)?
                .json()
                .await
                .map_err(external)?;

            let subject = message
                .payload
                .headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case("subject"))
                .map(|h| h.value.clone())
                .unwrap_or_default();

            let mut texts = Vec::new();
            Self::collect_text(&message.payload, &mut texts);
            if texts.is_empty() {
                texts.push(message.snippet.clone());
            }

            messages.push(MailMessage {
                id: message.id,
                subject,
                body: texts.join("\n\n"),
            });
        }

        Ok(messages)
    }
}

fn external(e: impl std::fmt::Display) -> AppError {
    AppError::ExternalServiceError(format!("Gmail API error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_body_accepts_both_paddings() {
        let encoded = general_purpose::URL_SAFE_NO_PAD.encode("code: 123456");
        assert_eq!(decode_body(&encoded).unwrap(), "code: 123456");

        let padded = general_purpose::URL_SAFE.encode("code: 123456");
        assert_eq!(decode_body(&padded).unwrap(), "code: 123456");
    }

    #[test]
    fn collect_text_walks_nested_parts() {
        let part = MessagePart {
            mime_type: "multipart/alternative".into(),
            headers: vec![],
            body: None,
            parts: vec![
                MessagePart {
                    mime_type: "text/plain".into(),
                    body: Some(PartBody {
                        data: Some(general_purpose::URL_SAFE_NO_PAD.encode("plain")),
                    }),
                    ..Default::default()
                },
                MessagePart {
                    mime_type: "text/html".into(),
                    body: Some(PartBody {
                        data: Some(general_purpose::URL_SAFE_NO_PAD.encode("<p>html</p>")),
                    }),
                    ..Default::default()
                },
            ],
        };

        let mut texts = Vec::new();
        GmailClient::collect_text(&part, &mut texts);
        assert_eq!(texts, vec!["plain".to_string(), "<p>html</p>".to_string()]);
    }
}
