use crate::model::{
    id::{ReservationId, UserId},
    reservation::{
        event::{CreateReservation, UpdateReservation},
        Reservation,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::error::AppResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    // 予約を作成する。重複チェックは書き込みと同一トランザクションで評価される
    async fn create(&self, event: CreateReservation) -> AppResult<ReservationId>;
    // 予約 ID から予約を取得する
    async fn find_by_id(&self, id: ReservationId) -> AppResult<Option<Reservation>>;
    // 開始時刻が [start, end) に入る予約を開始時刻の昇順で返す
    async fn find_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Reservation>>;
    // これから始まる予約。owner 指定ありならそのユーザーの分のみ
    async fn find_future(&self, owner: Option<&UserId>) -> AppResult<Vec<Reservation>>;
    // 予約内容を更新する。重複チェックは自分自身を除いて再評価される
    async fn update(&self, event: UpdateReservation) -> AppResult<()>;
    // 予約を物理削除する
    async fn delete(&self, id: ReservationId) -> AppResult<()>;
    // 当日通知に含めた予約へフラグを立てる
    async fn mark_notified(&self, id: ReservationId) -> AppResult<()>;
    // 終了時刻が過ぎた予約をすべて削除して件数を返す
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
    // デバッグ用: 全件を取得する
    async fn find_all(&self) -> AppResult<Vec<Reservation>>;
    // デバッグ用: 全件を削除して件数を返す
    async fn delete_all(&self) -> AppResult<u64>;
}
