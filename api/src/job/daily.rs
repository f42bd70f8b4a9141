use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveTime, Utc};
use derive_new::new;
use kernel::model::id::ChannelId;
use kernel::model::reservation::Reservation;
use kernel::port::chat::Attachment;
use kernel::service::table;
use registry::AppRegistry;
use shared::error::AppResult;

use super::{local_at, Job};

const FIRE_TIME: (u32, u32) = (6, 0);

/// 毎朝 6 時に当日の予約をまとめて投稿する。既に個別通知済みの
/// 予約（notified 済み）は載せない。
#[derive(new)]
pub struct DailyDigestJob {
    registry: AppRegistry,
}

/// ダイジェストに載せる行: 当日の窓に入っていて、まだ個別通知して
/// いないもの。翌日以降や通知済みの行はそのまま残す。
pub fn digest_targets(
    reservations: Vec<Reservation>,
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
) -> Vec<Reservation> {
    reservations
        .into_iter()
        .filter(|r| !r.notified && r.start_at >= day_start && r.start_at < day_end)
        .collect()
}

pub fn next_daily_fire(now: DateTime<Local>) -> DateTime<Local> {
    let time = NaiveTime::from_hms_opt(FIRE_TIME.0, FIRE_TIME.1, 0).unwrap_or(NaiveTime::MIN);
    let today = local_at(now, now.date_naive(), time);
    if now < today {
        today
    } else {
        local_at(now, now.date_naive() + Duration::days(1), time)
    }
}

#[async_trait]
impl Job for DailyDigestJob {
    fn name(&self) -> &'static str {
        "daily_digest"
    }

    fn next_fire(&self, now: DateTime<Local>) -> DateTime<Local> {
        next_daily_fire(now)
    }

    async fn run(&self) -> AppResult<()> {
        let now = Local::now();
        let day_start = local_at(now, now.date_naive(), NaiveTime::MIN).with_timezone(&Utc);
        let day_end = local_at(now, now.date_naive() + Duration::days(1), NaiveTime::MIN)
            .with_timezone(&Utc);
        let repository = self.registry.reservation_repository();
        let pending = digest_targets(
            repository.find_in_range(day_start, day_end).await?,
            day_start,
            day_end,
        );
        if pending.is_empty() {
            tracing::info!("当日の未通知の予約はありません");
            return Ok(());
        }
        let bytes = self.registry.renderer().render(&table::daily_rows(&pending))?;
        self.registry
            .chat()
            .send(
                ChannelId::new(self.registry.config().discord.log_channel),
                "**本日の予約一覧**",
                Some(Attachment {
                    filename: "today_reservations.txt".to_string(),
                    bytes,
                }),
            )
            .await?;
        for reservation in &pending {
            repository.mark_notified(reservation.id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use kernel::model::id::{ReservationId, UserId};

    fn at(hour: u32, min: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 10, hour, min, 0).unwrap()
    }

    fn reservation(id: i64, start: DateTime<Utc>, notified: bool) -> Reservation {
        Reservation {
            id: ReservationId::new(id),
            owner_id: UserId::new("u1"),
            organization: "IT研究会".to_string(),
            room: "大部屋".to_string(),
            start_at: start,
            end_at: start + Duration::hours(2),
            created_at: start,
            notified,
        }
    }

    #[test]
    fn digest_covers_only_unnotified_same_day_rows() {
        let day_start = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let day_end = day_start + Duration::days(1);

        let fresh = reservation(1, day_start + Duration::hours(14), false);
        let already_sent = reservation(2, day_start + Duration::hours(10), true);
        let tomorrow = reservation(3, day_end + Duration::hours(9), false);

        let targets = digest_targets(vec![fresh.clone(), already_sent, tomorrow], day_start, day_end);

        // 通知済みと翌日の行は対象外なので、フラグが立つのは当日の未通知分だけ
        assert_eq!(targets, vec![fresh]);
    }

    #[test]
    fn fires_later_today_before_six() {
        assert_eq!(next_daily_fire(at(5, 30)), at(6, 0));
    }

    #[test]
    fn fires_tomorrow_after_six() {
        let next = next_daily_fire(at(7, 0));
        assert_eq!(
            next,
            Local.with_ymd_and_hms(2025, 1, 11, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn exactly_six_waits_for_tomorrow() {
        let next = next_daily_fire(at(6, 0));
        assert_eq!(
            next,
            Local.with_ymd_and_hms(2025, 1, 11, 6, 0, 0).unwrap()
        );
    }
}
