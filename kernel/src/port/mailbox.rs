use async_trait::async_trait;
use shared::error::AppResult;

#[derive(Debug, Clone)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailboxPort: Send + Sync {
    // サブジェクトに一致する直近のメールを新しい順に返す
    async fn fetch_recent(&self, subject: &str, limit: usize) -> AppResult<Vec<MailMessage>>;
}
