use crate::database::{model::reservation::ReservationRow, ConnectionPool};
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use derive_new::new;
use kernel::model::{
    id::{ReservationId, UserId},
    reservation::{
        event::{CreateReservation, UpdateReservation},
        Reservation,
    },
};
use kernel::repository::reservation::ReservationRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct ReservationRepositoryImpl {
    db: ConnectionPool,
}

const COLUMNS: &str = "id, owner_id, organization, room, start_at, end_at, created_at, notified";

#[async_trait]
impl ReservationRepository for ReservationRepositoryImpl {
    async fn create(&self, event: CreateReservation) -> AppResult<ReservationId> {
        // 時系列の検証はワークフロー側の責務だが、ストアとしても拒否しておく
        if event.start_at >= event.end_at {
            return Err(AppError::UnprocessableEntity(
                "開始時刻は終了時刻より前です。".into(),
            ));
        }

        let mut tx = self.db.begin().await?;

        // 重複チェックと INSERT を同一トランザクションで評価する。
        // 並行する申請が同じ空き枠を同時に通過することはない。
        if let Some(conflict) =
            find_overlap(&mut tx, &event.room, event.start_at, event.end_at, None).await?
        {
            return Err(conflict_error(&conflict));
        }

        let res = sqlx::query(
            r#"
            INSERT INTO reservations
                (owner_id, organization, room, start_at, end_at, created_at, notified)
            VALUES (?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(&event.owner_id)
        .bind(&event.organization)
        .bind(&event.room)
        .bind(event.start_at)
        .bind(event.end_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let id = ReservationId::new(res.last_insert_rowid());

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(id)
    }

    async fn find_by_id(&self, id: ReservationId) -> AppResult<Option<Reservation>> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM reservations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(row.map(Reservation::from))
    }

    async fn find_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS} FROM reservations
            WHERE datetime(start_at) >= datetime(?)
              AND datetime(start_at) < datetime(?)
            ORDER BY datetime(start_at) ASC
            "#
        ))
        .bind(start)
        .bind(end)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(Reservation::from).collect())
    }

    async fn find_future(&self, owner: Option<&UserId>) -> AppResult<Vec<Reservation>> {
        let now = Utc::now();
        let rows: Vec<ReservationRow> = match owner {
            Some(owner) => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {COLUMNS} FROM reservations
                    WHERE datetime(start_at) >= datetime(?)
                      AND owner_id = ?
                    ORDER BY datetime(start_at) ASC
                    "#
                ))
                .bind(now)
                .bind(owner)
                .fetch_all(self.db.inner_ref())
                .await
            }
            None => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {COLUMNS} FROM reservations
                    WHERE datetime(start_at) >= datetime(?)
                    ORDER BY datetime(start_at) ASC
                    "#
                ))
                .bind(now)
                .fetch_all(self.db.inner_ref())
                .await
            }
        }
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(Reservation::from).collect())
    }

    async fn update(&self, event: UpdateReservation) -> AppResult<()> {
        if event.start_at >= event.end_at {
            return Err(AppError::UnprocessableEntity(
                "開始時刻は終了時刻より前です。".into(),
            ));
        }

        let mut tx = self.db.begin().await?;

        // 自分自身を除いて重複を再評価する
        if let Some(conflict) = find_overlap(
            &mut tx,
            &event.room,
            event.start_at,
            event.end_at,
            Some(event.reservation_id),
        )
        .await?
        {
            return Err(conflict_error(&conflict));
        }

        let res = sqlx::query(
            r#"
            UPDATE reservations
            SET organization = ?, room = ?, start_at = ?, end_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&event.organization)
        .bind(&event.room)
        .bind(event.start_at)
        .bind(event.end_at)
        .bind(event.reservation_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(
                "該当する予約が見つかりませんでした。".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(())
    }

    async fn delete(&self, id: ReservationId) -> AppResult<()> {
        let res = sqlx::query("DELETE FROM reservations WHERE id = ?")
            .bind(id)
            .execute(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(
                "該当する予約が見つかりませんでした。".into(),
            ));
        }

        Ok(())
    }

    async fn mark_notified(&self, id: ReservationId) -> AppResult<()> {
        let res = sqlx::query("UPDATE reservations SET notified = 1 WHERE id = ?")
            .bind(id)
            .execute(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(
                "該当する予約が見つかりませんでした。".into(),
            ));
        }

        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let res = sqlx::query(
            "DELETE FROM reservations WHERE datetime(end_at) <= datetime(?)",
        )
        .bind(now)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(res.rows_affected())
    }

    async fn find_all(&self) -> AppResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM reservations ORDER BY id ASC"
        ))
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(Reservation::from).collect())
    }

    async fn delete_all(&self) -> AppResult<u64> {
        let res = sqlx::query("DELETE FROM reservations")
            .execute(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;

        Ok(res.rows_affected())
    }
}

// 対象の部屋で [start, end) と交差する予約を 1 件探す。
// 交差条件: existing.start < end AND existing.end > start
async fn find_overlap(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    room: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<ReservationId>,
) -> AppResult<Option<ReservationRow>> {
    sqlx::query_as(&format!(
        r#"
        SELECT {COLUMNS} FROM reservations
        WHERE room = ?
          AND datetime(start_at) < datetime(?)
          AND datetime(end_at) > datetime(?)
          AND id != ?
        LIMIT 1
        "#
    ))
    .bind(room)
    .bind(end)
    .bind(start)
    .bind(exclude.map(|id| id.raw()).unwrap_or(-1))
    .fetch_optional(&mut **tx)
    .await
    .map_err(AppError::SpecificOperationError)
}

fn conflict_error(conflict: &ReservationRow) -> AppError {
    let start = conflict.start_at.with_timezone(&Local);
    let end = conflict.end_at.with_timezone(&Local);
    AppError::ReservationConflict(format!(
        "その時間帯には既に予約があります（{}: {} - {}）。",
        conflict.organization,
        start.format("%m/%d %H:%M"),
        end.format("%H:%M"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use sqlx::SqlitePool;

    async fn setup(pool: SqlitePool) -> ReservationRepositoryImpl {
        let db = ConnectionPool::new(pool);
        crate::database::init_schema(&db).await.unwrap();
        ReservationRepositoryImpl::new(db)
    }

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, hour, min, 0).unwrap()
    }

    fn event(
        owner: &str,
        org: &str,
        room: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CreateReservation {
        CreateReservation::new(
            UserId::new(owner),
            org.to_string(),
            room.to_string(),
            start,
            end,
        )
    }

    #[sqlx::test]
    async fn create_and_get_roundtrip(pool: SqlitePool) -> anyhow::Result<()> {
        let repo = setup(pool).await;

        let id = repo
            .create(event("u1", "IT研究会", "大部屋", at(14, 0), at(16, 0)))
            .await?;

        let rsv = repo.find_by_id(id).await?.unwrap();
        assert_eq!(rsv.id, id);
        assert_eq!(rsv.owner_id, UserId::new("u1"));
        assert_eq!(rsv.organization, "IT研究会");
        assert_eq!(rsv.room, "大部屋");
        assert_eq!(rsv.start_at, at(14, 0));
        assert_eq!(rsv.end_at, at(16, 0));
        assert!(!rsv.notified);

        Ok(())
    }

    #[sqlx::test]
    async fn store_rejects_reversed_interval(pool: SqlitePool) -> anyhow::Result<()> {
        let repo = setup(pool).await;

        let res = repo
            .create(event("u1", "漫研", "大部屋", at(16, 0), at(14, 0)))
            .await;
        assert!(matches!(res, Err(AppError::UnprocessableEntity(_))));

        let res = repo
            .create(event("u1", "漫研", "大部屋", at(14, 0), at(14, 0)))
            .await;
        assert!(matches!(res, Err(AppError::UnprocessableEntity(_))));

        assert!(repo.find_all().await?.is_empty());
        Ok(())
    }

    #[sqlx::test]
    async fn overlap_is_rejected_but_touching_is_not(pool: SqlitePool) -> anyhow::Result<()> {
        let repo = setup(pool).await;

        repo.create(event("u1", "IT研究会", "大部屋", at(14, 0), at(16, 0)))
            .await?;

        // 15:00-17:00 は 14:00-16:00 と交差する
        let res = repo
            .create(event("u2", "Gamma", "大部屋", at(15, 0), at(17, 0)))
            .await;
        assert!(matches!(res, Err(AppError::ReservationConflict(_))));

        // 端が接しているだけなら交差ではない
        repo.create(event("u2", "Gamma", "大部屋", at(16, 0), at(17, 0)))
            .await?;
        repo.create(event("u3", "漫研", "大部屋", at(13, 0), at(14, 0)))
            .await?;

        assert_eq!(repo.find_all().await?.len(), 3);
        Ok(())
    }

    #[sqlx::test]
    async fn same_slot_in_other_room_is_allowed(pool: SqlitePool) -> anyhow::Result<()> {
        let repo = setup(pool).await;

        repo.create(event("u1", "IT研究会", "大部屋", at(14, 0), at(16, 0)))
            .await?;
        repo.create(event("u2", "Gamma", "小部屋", at(14, 0), at(16, 0)))
            .await?;

        assert_eq!(repo.find_all().await?.len(), 2);
        Ok(())
    }

    #[sqlx::test]
    async fn conflicting_update_leaves_original_unchanged(pool: SqlitePool) -> anyhow::Result<()> {
        let repo = setup(pool).await;

        repo.create(event("u1", "IT研究会", "大部屋", at(14, 0), at(16, 0)))
            .await?;
        let id = repo
            .create(event("u2", "Gamma", "大部屋", at(17, 0), at(18, 0)))
            .await?;

        let res = repo
            .update(UpdateReservation::new(
                id,
                "Gamma".into(),
                "大部屋".into(),
                at(15, 0),
                at(17, 0),
            ))
            .await;
        assert!(matches!(res, Err(AppError::ReservationConflict(_))));

        let rsv = repo.find_by_id(id).await?.unwrap();
        assert_eq!(rsv.start_at, at(17, 0));
        assert_eq!(rsv.end_at, at(18, 0));
        Ok(())
    }

    #[sqlx::test]
    async fn update_excludes_itself_from_overlap_check(pool: SqlitePool) -> anyhow::Result<()> {
        let repo = setup(pool).await;

        let id = repo
            .create(event("u1", "IT研究会", "大部屋", at(14, 0), at(16, 0)))
            .await?;

        // 自分の枠と重なる変更は衝突扱いにならない
        repo.update(UpdateReservation::new(
            id,
            "IT研究会".into(),
            "大部屋".into(),
            at(15, 0),
            at(17, 0),
        ))
        .await?;

        let rsv = repo.find_by_id(id).await?.unwrap();
        assert_eq!(rsv.start_at, at(15, 0));
        assert_eq!(rsv.end_at, at(17, 0));
        Ok(())
    }

    #[sqlx::test]
    async fn missing_id_operations_fail_with_not_found(pool: SqlitePool) -> anyhow::Result<()> {
        let repo = setup(pool).await;

        let id = repo
            .create(event("u1", "IT研究会", "大部屋", at(14, 0), at(16, 0)))
            .await?;

        let missing = ReservationId::new(9999);
        assert!(matches!(
            repo.delete(missing).await,
            Err(AppError::EntityNotFound(_))
        ));
        assert!(matches!(
            repo.mark_notified(missing).await,
            Err(AppError::EntityNotFound(_))
        ));
        assert!(repo.find_by_id(missing).await?.is_none());

        // 失敗してもテーブルは変化しない
        assert_eq!(repo.find_all().await?, vec![repo.find_by_id(id).await?.unwrap()]);
        Ok(())
    }

    #[sqlx::test]
    async fn sweep_removes_only_expired_and_is_idempotent(pool: SqlitePool) -> anyhow::Result<()> {
        let repo = setup(pool).await;

        let expired = repo
            .create(event("u1", "IT研究会", "大部屋", at(10, 0), at(12, 0)))
            .await?;
        let alive = repo
            .create(event("u1", "IT研究会", "大部屋", at(14, 0), at(16, 0)))
            .await?;

        // 12:00 ちょうどで end <= now の予約が消える
        assert_eq!(repo.delete_expired(at(12, 0)).await?, 1);
        assert!(repo.find_by_id(expired).await?.is_none());
        assert!(repo.find_by_id(alive).await?.is_some());

        // 2 回目は何も消えない
        assert_eq!(repo.delete_expired(at(12, 0)).await?, 0);
        Ok(())
    }

    #[sqlx::test]
    async fn mark_notified_sets_flag_once(pool: SqlitePool) -> anyhow::Result<()> {
        let repo = setup(pool).await;

        let id = repo
            .create(event("u1", "IT研究会", "大部屋", at(14, 0), at(16, 0)))
            .await?;
        repo.mark_notified(id).await?;

        assert!(repo.find_by_id(id).await?.unwrap().notified);
        Ok(())
    }

    #[sqlx::test]
    async fn find_future_filters_by_owner_and_orders_by_start(
        pool: SqlitePool,
    ) -> anyhow::Result<()> {
        let repo = setup(pool).await;

        let base = Utc::now() + Duration::days(1);
        repo.create(event("u1", "IT研究会", "大部屋", base + Duration::hours(4), base + Duration::hours(5)))
            .await?;
        repo.create(event("u2", "Gamma", "大部屋", base, base + Duration::hours(1)))
            .await?;
        // 過去の予約は将来一覧に出ない
        repo.create(event("u1", "漫研", "大部屋", at(10, 0), at(11, 0)))
            .await?;

        let all = repo.find_future(None).await?;
        assert_eq!(all.len(), 2);
        assert!(all[0].start_at < all[1].start_at);

        let owner = UserId::new("u1");
        let mine = repo.find_future(Some(&owner)).await?;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].owner_id, owner);
        Ok(())
    }

    #[sqlx::test]
    async fn find_in_range_is_half_open(pool: SqlitePool) -> anyhow::Result<()> {
        let repo = setup(pool).await;

        repo.create(event("u1", "IT研究会", "大部屋", at(14, 0), at(16, 0)))
            .await?;
        repo.create(event("u1", "Gamma", "大部屋", at(18, 0), at(19, 0)))
            .await?;

        let hits = repo.find_in_range(at(14, 0), at(18, 0)).await?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].organization, "IT研究会");
        Ok(())
    }

    #[tokio::test]
    async fn racing_creates_leave_one_winner_and_a_conflict() -> anyhow::Result<()> {
        use crate::database::connect_database_with;
        use shared::config::DatabaseConfig;
        use std::sync::Arc;

        let path = std::env::temp_dir().join(format!("reservations-{}.db", uuid::Uuid::new_v4()));
        let db = connect_database_with(&DatabaseConfig {
            filename: path.to_string_lossy().into_owned(),
        });
        crate::database::init_schema(&db).await?;
        let repo = Arc::new(ReservationRepositoryImpl::new(db));

        // 同じ空き枠への申請を同時に流す。勝者は 1 件だけで、敗者は
        // SQLITE_BUSY ではなく確定済みの予約に対する衝突エラーを受け取る。
        for round in 0..10 {
            let room = format!("部屋{round}");
            let first = {
                let repo = Arc::clone(&repo);
                let room = room.clone();
                tokio::spawn(async move {
                    repo.create(event("u1", "IT研究会", &room, at(14, 0), at(16, 0)))
                        .await
                })
            };
            let second = {
                let repo = Arc::clone(&repo);
                let room = room.clone();
                tokio::spawn(async move {
                    repo.create(event("u2", "Gamma", &room, at(15, 0), at(17, 0)))
                        .await
                })
            };

            match (first.await?, second.await?) {
                (Ok(_), Err(e)) | (Err(e), Ok(_)) => {
                    assert!(matches!(e, AppError::ReservationConflict(_)), "{e:?}");
                }
                other => panic!("どちらか一方だけが成功するはず: {other:?}"),
            }
        }

        drop(repo);
        let _ = std::fs::remove_file(&path);
        Ok(())
    }

    #[sqlx::test]
    async fn delete_all_wipes_the_table(pool: SqlitePool) -> anyhow::Result<()> {
        let repo = setup(pool).await;

        repo.create(event("u1", "IT研究会", "大部屋", at(14, 0), at(16, 0)))
            .await?;
        repo.create(event("u2", "Gamma", "大部屋", at(16, 0), at(17, 0)))
            .await?;

        assert_eq!(repo.delete_all().await?, 2);
        assert!(repo.find_all().await?.is_empty());
        Ok(())
    }
}
