use crate::{
    model::{id::ChannelId, reservation::Reservation},
    port::{
        chat::{Attachment, ChatPort},
        renderer::TableRenderer,
    },
    service::table,
};
use shared::error::AppResult;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
}

impl AuditAction {
    fn header(self) -> &'static str {
        match self {
            AuditAction::Created => "✅ 予約を追加しました",
            AuditAction::Updated => "✏️ 予約を変更しました",
            AuditAction::Deleted => "❌ 予約を取消しました",
        }
    }
}

/// 予約操作のログをログチャンネルに表画像つきで投稿する。
pub struct AuditLog {
    chat: Arc<dyn ChatPort>,
    renderer: Arc<dyn TableRenderer>,
    channel: ChannelId,
}

impl AuditLog {
    pub fn new(
        chat: Arc<dyn ChatPort>,
        renderer: Arc<dyn TableRenderer>,
        channel: ChannelId,
    ) -> Self {
        Self {
            chat,
            renderer,
            channel,
        }
    }

    pub async fn record(&self, action: AuditAction, reservation: &Reservation) -> AppResult<()> {
        let rows = table::audit_rows(reservation);
        let bytes = self.renderer.render(&rows)?;
        self.chat
            .send(
                self.channel,
                action.header(),
                Some(Attachment {
                    filename: "log_table.txt".to_string(),
                    bytes,
                }),
            )
            .await?;
        Ok(())
    }
}
