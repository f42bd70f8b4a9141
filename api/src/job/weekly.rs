use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Local, NaiveTime, Utc, Weekday};
use derive_new::new;
use kernel::model::id::ChannelId;
use kernel::port::chat::Attachment;
use kernel::service::table;
use registry::AppRegistry;
use shared::error::AppResult;

use super::{local_at, Job};

/// 毎週月曜 6 時に、その週（月曜 0 時から 7 日間）の予約を投稿する。
#[derive(new)]
pub struct WeeklyDigestJob {
    registry: AppRegistry,
}

pub fn next_weekly_fire(now: DateTime<Local>) -> DateTime<Local> {
    let six = NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN);
    if now.weekday() == Weekday::Mon {
        let today = local_at(now, now.date_naive(), six);
        if now < today {
            return today;
        }
    }
    let mut days_ahead = (7 - now.weekday().num_days_from_monday()) % 7;
    if days_ahead == 0 {
        days_ahead = 7;
    }
    local_at(
        now,
        now.date_naive() + Duration::days(days_ahead as i64),
        six,
    )
}

#[async_trait]
impl Job for WeeklyDigestJob {
    fn name(&self) -> &'static str {
        "weekly_digest"
    }

    fn next_fire(&self, now: DateTime<Local>) -> DateTime<Local> {
        next_weekly_fire(now)
    }

    async fn run(&self) -> AppResult<()> {
        let now = Local::now();
        let monday = now.date_naive()
            - Duration::days(now.weekday().num_days_from_monday() as i64);
        let week_start = local_at(now, monday, NaiveTime::MIN).with_timezone(&Utc);
        let week_end =
            local_at(now, monday + Duration::days(7), NaiveTime::MIN).with_timezone(&Utc);
        let reservations = self
            .registry
            .reservation_repository()
            .find_in_range(week_start, week_end)
            .await?;
        if reservations.is_empty() {
            tracing::info!("今週の予約はありません");
            return Ok(());
        }
        let bytes = self
            .registry
            .renderer()
            .render(&table::weekly_rows(&reservations))?;
        self.registry
            .chat()
            .send(
                ChannelId::new(self.registry.config().discord.log_channel),
                "**今週の予約スケジュール**",
                Some(Attachment {
                    filename: "weekly_reservations.txt".to_string(),
                    bytes,
                }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // 2025-01-06 は月曜
    fn monday(hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 6, hour, 0, 0).unwrap()
    }

    #[test]
    fn monday_before_six_fires_today() {
        assert_eq!(next_weekly_fire(monday(5)), monday(6));
    }

    #[test]
    fn monday_after_six_fires_next_week() {
        assert_eq!(
            next_weekly_fire(monday(7)),
            Local.with_ymd_and_hms(2025, 1, 13, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn midweek_fires_on_coming_monday() {
        let wednesday = Local.with_ymd_and_hms(2025, 1, 8, 12, 0, 0).unwrap();
        assert_eq!(
            next_weekly_fire(wednesday),
            Local.with_ymd_and_hms(2025, 1, 13, 6, 0, 0).unwrap()
        );
    }
}
