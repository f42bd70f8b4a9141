use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use registry::AppRegistry;
use shared::error::AppResult;

pub mod daily;
pub mod mail;
pub mod meter;
pub mod sweep;
pub mod weekly;

/// 常駐ジョブ。次回実行時刻は毎サイクル now から計算し直すので、
/// 実行の遅延が次回以降に累積しない。
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;
    fn next_fire(&self, now: DateTime<Local>) -> DateTime<Local>;
    async fn run(&self) -> AppResult<()>;
}

pub struct Scheduler {
    jobs: Vec<Arc<dyn Job>>,
}

impl Scheduler {
    pub fn new(registry: AppRegistry) -> Self {
        Self {
            jobs: vec![
                Arc::new(daily::DailyDigestJob::new(registry.clone())),
                Arc::new(weekly::WeeklyDigestJob::new(registry.clone())),
                Arc::new(sweep::ExpirySweepJob::new(registry.clone())),
                Arc::new(meter::MeterWatchJob::new(registry.clone())),
                Arc::new(mail::MailWatchJob::new(registry)),
            ],
        }
    }

    /// ジョブごとに独立したタスクで回す。1 つが失敗しても他は止まらない。
    pub fn spawn_all(self) {
        for job in self.jobs {
            tokio::spawn(run_loop(job));
        }
    }
}

async fn run_loop(job: Arc<dyn Job>) {
    loop {
        let now = Local::now();
        let fire_at = job.next_fire(now);
        let wait = (fire_at - now).to_std().unwrap_or_default();
        tracing::debug!(job = job.name(), %fire_at, "次回実行を待機します");
        tokio::time::sleep(wait).await;
        if let Err(e) = job.run().await {
            tracing::warn!(job = job.name(), error = %e, "ジョブの実行に失敗しました");
        }
    }
}

/// ローカル日時の組み立て。夏時間の切り替わりで存在しない時刻に
/// 当たった場合は fallback を返す。
pub(crate) fn local_at(
    fallback: DateTime<Local>,
    date: NaiveDate,
    time: NaiveTime,
) -> DateTime<Local> {
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .unwrap_or(fallback)
}
