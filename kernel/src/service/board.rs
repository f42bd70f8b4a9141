use crate::{
    model::id::{ChannelId, MessageId},
    port::{
        chat::{Attachment, ChatPort},
        renderer::TableRenderer,
    },
    repository::reservation::ReservationRepository,
    service::table,
};
use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use shared::error::AppResult;
use std::sync::Arc;
use tokio::sync::Mutex;

const PURGE_LOOKBACK: u8 = 10;

/// 予約一覧を 1 通のメッセージとして保つ。変更のたびに同じメッセージを
/// 編集するので、チャンネルには常に最新の予約表が 1 つだけ残る。
pub struct ReservationBoard {
    chat: Arc<dyn ChatPort>,
    renderer: Arc<dyn TableRenderer>,
    repository: Arc<dyn ReservationRepository>,
    channel: ChannelId,
    message: Mutex<Option<MessageId>>,
}

impl ReservationBoard {
    pub fn new(
        chat: Arc<dyn ChatPort>,
        renderer: Arc<dyn TableRenderer>,
        repository: Arc<dyn ReservationRepository>,
        channel: ChannelId,
    ) -> Self {
        Self {
            chat,
            renderer,
            repository,
            channel,
            message: Mutex::new(None),
        }
    }

    /// 起動時に呼ぶ: 過去の自分の投稿を片づけてから予約表を新規投稿する
    pub async fn init(&self) -> AppResult<()> {
        if let Err(e) = self.chat.purge_own(self.channel, PURGE_LOOKBACK).await {
            tracing::warn!(error = %e, "予約表の削除に失敗しました");
        }

        let (content, attachment) = self.build().await?;
        let id = self.chat.send(self.channel, &content, Some(attachment)).await?;
        *self.message.lock().await = Some(id);
        Ok(())
    }

    /// 予約が変化したときに呼ぶ。編集の失敗は記録するだけで、呼び出し元の
    /// 操作は失敗にしない。
    pub async fn refresh(&self) -> AppResult<()> {
        let (content, attachment) = self.build().await?;

        let mut message = self.message.lock().await;
        match *message {
            Some(id) => {
                if let Err(e) = self
                    .chat
                    .edit(self.channel, id, &content, Some(attachment))
                    .await
                {
                    tracing::warn!(error = %e, "予約表メッセージの編集に失敗しました");
                }
            }
            None => {
                let id = self.chat.send(self.channel, &content, Some(attachment)).await?;
                *message = Some(id);
            }
        }
        Ok(())
    }

    async fn build(&self) -> AppResult<(String, Attachment)> {
        let since = month_start(Local::now());
        let reservations = self.repository.find_in_range(since, far_future()).await?;
        let rows = table::board_rows(&reservations);
        let bytes = self.renderer.render(&rows)?;
        Ok((
            "**予約一覧**".to_string(),
            Attachment {
                filename: "current_month.txt".to_string(),
                bytes,
            },
        ))
    }
}

/// 今月 1 日 0 時を UTC で返す。予約表はここから先を表示する。
pub fn month_start(now: DateTime<Local>) -> DateTime<Utc> {
    let date = now.date_naive();
    let first = date.with_day(1).unwrap_or(date);
    let midnight = first.and_time(chrono::NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => now.with_timezone(&Utc),
    }
}

pub fn far_future() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_start_is_first_midnight() {
        let now = Local.with_ymd_and_hms(2025, 1, 23, 15, 30, 0).unwrap();
        let start = month_start(now).with_timezone(&Local);
        assert_eq!(start.day(), 1);
        assert_eq!(start.month(), 1);
        assert_eq!(start.format("%H:%M:%S").to_string(), "00:00:00");
    }

    #[test]
    fn far_future_is_after_any_reservation() {
        assert!(far_future() > Utc::now());
    }
}
