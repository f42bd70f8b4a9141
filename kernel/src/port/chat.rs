use crate::model::id::{ChannelId, MessageId};
use async_trait::async_trait;
use shared::error::AppResult;

/// メッセージに添付するファイル。レンダラが生成した表のバイト列を運ぶ。
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn send(
        &self,
        channel: ChannelId,
        content: &str,
        attachment: Option<Attachment>,
    ) -> AppResult<MessageId>;
    // 投稿済みメッセージを編集して差し替える
    async fn edit(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: &str,
        attachment: Option<Attachment>,
    ) -> AppResult<()>;
    async fn delete(&self, channel: ChannelId, message: MessageId) -> AppResult<()>;
    // 自分（ボット）が投稿した直近のメッセージを削除する
    async fn purge_own(&self, channel: ChannelId, lookback: u8) -> AppResult<()>;
}
