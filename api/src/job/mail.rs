use std::collections::HashSet;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local};
use kernel::model::id::ChannelId;
use regex::Regex;
use registry::AppRegistry;
use shared::error::AppResult;
use tokio::sync::Mutex;

use super::Job;

const POLL_SECONDS: i64 = 60;
const FETCH_LIMIT: usize = 5;

fn code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)Your\s+verification\s+code\s+is:\s*(\d{6})").expect("valid regex")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

/// HTML タグを落としてから 6 桁の認証コードを探す。
pub fn extract_code(body: &str) -> Option<String> {
    let text = tag_regex().replace_all(body, " ");
    code_regex()
        .captures(&text)
        .map(|captures| captures[1].to_string())
}

struct WatchState {
    seen: HashSet<String>,
    primed: bool,
}

/// 受信箱をポーリングし、対象件名のメールから認証コードを抜き出して
/// 転送する。初回は既存メールを既読扱いにするだけで通知しない。
pub struct MailWatchJob {
    registry: AppRegistry,
    state: Mutex<WatchState>,
}

impl MailWatchJob {
    pub fn new(registry: AppRegistry) -> Self {
        Self {
            registry,
            state: Mutex::new(WatchState {
                seen: HashSet::new(),
                primed: false,
            }),
        }
    }
}

#[async_trait]
impl Job for MailWatchJob {
    fn name(&self) -> &'static str {
        "mail_watch"
    }

    fn next_fire(&self, now: DateTime<Local>) -> DateTime<Local> {
        now + Duration::seconds(POLL_SECONDS)
    }

    async fn run(&self) -> AppResult<()> {
        let subject = self.registry.config().gmail.watch_subject.clone();
        let messages = self
            .registry
            .mailbox()
            .fetch_recent(&subject, FETCH_LIMIT)
            .await?;
        let mut state = self.state.lock().await;
        if !state.primed {
            state.seen.extend(messages.into_iter().map(|m| m.id));
            state.primed = true;
            return Ok(());
        }
        for message in messages {
            if state.seen.contains(&message.id) {
                continue;
            }
            state.seen.insert(message.id.clone());
            if !message.subject.contains(&subject) {
                continue;
            }
            if let Some(code) = extract_code(&message.body) {
                self.registry
                    .chat()
                    .send(
                        ChannelId::new(self.registry.config().discord.mail_channel),
                        &format!("{subject}: **{code}**"),
                        None,
                    )
                    .await?;
                // 通知するのは新着のうち最新の 1 通だけ
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_code_in_plain_text() {
        let body = "Your verification code is: 123456\nThanks.";
        assert_eq!(extract_code(body).as_deref(), Some("123456"));
    }

    #[test]
    fn finds_code_behind_html_tags() {
        let body = "<p>Your verification <b>code</b> is: <span>654321</span></p>";
        assert_eq!(extract_code(body).as_deref(), Some("654321"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let body = "YOUR VERIFICATION CODE IS: 000111";
        assert_eq!(extract_code(body).as_deref(), Some("000111"));
    }

    #[test]
    fn short_codes_are_ignored() {
        assert_eq!(extract_code("Your verification code is: 12345"), None);
        assert_eq!(extract_code("no code here"), None);
    }
}
