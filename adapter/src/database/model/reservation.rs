use kernel::model::{
    id::{ReservationId, UserId},
    reservation::Reservation,
};
use sqlx::types::chrono::{DateTime, Utc};

// 予約一覧の取得に使う型
#[derive(Debug, sqlx::FromRow)]
pub struct ReservationRow {
    pub id: ReservationId,
    pub owner_id: UserId,
    pub organization: String,
    pub room: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub notified: bool,
}

impl From<ReservationRow> for Reservation {
    fn from(value: ReservationRow) -> Self {
        let ReservationRow {
            id,
            owner_id,
            organization,
            room,
            start_at,
            end_at,
            created_at,
            notified,
        } = value;
        Reservation {
            id,
            owner_id,
            organization,
            room,
            start_at,
            end_at,
            created_at,
            notified,
        }
    }
}
