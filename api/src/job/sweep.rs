use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, Utc};
use derive_new::new;
use registry::AppRegistry;
use shared::error::AppResult;

use super::Job;

const INTERVAL_SECONDS: i64 = 60;

/// 終了時刻を過ぎた予約を定期的に消し込む。消したときだけ予約表を
/// 引き直す。
#[derive(new)]
pub struct ExpirySweepJob {
    registry: AppRegistry,
}

#[async_trait]
impl Job for ExpirySweepJob {
    fn name(&self) -> &'static str {
        "expiry_sweep"
    }

    fn next_fire(&self, now: DateTime<Local>) -> DateTime<Local> {
        now + Duration::seconds(INTERVAL_SECONDS)
    }

    async fn run(&self) -> AppResult<()> {
        let deleted = self
            .registry
            .reservation_repository()
            .delete_expired(Utc::now())
            .await?;
        if deleted > 0 {
            tracing::info!(deleted, "期限切れの予約を削除しました");
            if let Err(e) = self.registry.reservation_board().refresh().await {
                tracing::warn!(error = %e, "予約表の更新に失敗しました");
            }
        }
        Ok(())
    }
}
