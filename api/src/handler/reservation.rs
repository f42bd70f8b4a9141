use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Local, Utc};
use garde::Validate;
use kernel::model::{
    id::ReservationId,
    reservation::{
        event::{CreateReservation, UpdateReservation},
        Reservation, DEFAULT_ROOM, ORGANIZATIONS,
    },
};
use kernel::service::{audit::AuditAction, board};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::extractor::AuthorizedUser;
use crate::model::reservation::{
    parse_schedule, validate_edit_schedule, validate_new_schedule, year_for_edit,
    OrganizationsResponse, ReservationFormRequest, ReservationResponse, ReservationsResponse,
    SelectableReservationsResponse,
};

/// 今月以降の予約の一覧。予約表と同じ範囲を返す。
pub async fn show_reservation_list(
    _user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationsResponse>> {
    let reservations = registry
        .reservation_repository()
        .find_in_range(board::month_start(Local::now()), board::far_future())
        .await?;
    Ok(Json(ReservationsResponse::from(reservations)))
}

/// 変更・取消メニューの候補。一般ユーザーには自分の予約だけを出し、
/// 管理者には全件を出す。
pub async fn show_selectable_reservations(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<SelectableReservationsResponse>> {
    let owner = if user.is_admin() { None } else { Some(user.id()) };
    let reservations = registry
        .reservation_repository()
        .find_future(owner.as_ref())
        .await?;
    Ok(Json(SelectableReservationsResponse::from(reservations)))
}

pub async fn show_organizations() -> Json<OrganizationsResponse> {
    Json(OrganizationsResponse {
        items: ORGANIZATIONS.iter().map(|name| name.to_string()).collect(),
    })
}

pub async fn reserve_room(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<ReservationFormRequest>,
) -> AppResult<(StatusCode, Json<ReservationResponse>)> {
    req.validate()?;
    let (start_at, end_at) =
        parse_schedule(Local::now().year(), &req.date, &req.start_time, &req.end_time)?;
    validate_new_schedule(start_at, end_at, Utc::now())?;
    let room = req.room.clone().unwrap_or_else(|| DEFAULT_ROOM.to_string());
    let repository = registry.reservation_repository();
    let reservation_id = repository
        .create(CreateReservation::new(
            user.id(),
            req.organization.clone(),
            room,
            start_at,
            end_at,
        ))
        .await?;
    let reservation = repository
        .find_by_id(reservation_id)
        .await?
        .ok_or_else(|| AppError::EntityNotFound("作成した予約が見つかりませんでした。".to_string()))?;
    publish_mutation(&registry, AuditAction::Created, &reservation).await;
    Ok((StatusCode::CREATED, Json(reservation.into())))
}

pub async fn update_reservation(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<ReservationFormRequest>,
) -> AppResult<Json<ReservationResponse>> {
    req.validate()?;
    let repository = registry.reservation_repository();
    let existing = repository
        .find_by_id(reservation_id)
        .await?
        .ok_or_else(not_found)?;
    ensure_owned(&user, &existing)?;
    let (start_at, end_at) = parse_schedule(
        year_for_edit(existing.start_at),
        &req.date,
        &req.start_time,
        &req.end_time,
    )?;
    validate_edit_schedule(
        start_at,
        end_at,
        Utc::now(),
        registry.config().reservation.allow_past_edit,
    )?;
    let room = req.room.clone().unwrap_or_else(|| existing.room.clone());
    repository
        .update(UpdateReservation::new(
            reservation_id,
            req.organization.clone(),
            room,
            start_at,
            end_at,
        ))
        .await?;
    let updated = repository
        .find_by_id(reservation_id)
        .await?
        .ok_or_else(not_found)?;
    publish_mutation(&registry, AuditAction::Updated, &updated).await;
    Ok(Json(updated.into()))
}

pub async fn delete_reservation(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    let repository = registry.reservation_repository();
    let existing = repository
        .find_by_id(reservation_id)
        .await?
        .ok_or_else(not_found)?;
    ensure_owned(&user, &existing)?;
    repository.delete(reservation_id).await?;
    publish_mutation(&registry, AuditAction::Deleted, &existing).await;
    Ok(StatusCode::NO_CONTENT)
}

/// 選択メニューの時点で絞り込んでいても、操作時にもう一度所有権を確かめる。
fn ensure_owned(user: &AuthorizedUser, reservation: &Reservation) -> AppResult<()> {
    if user.is_admin() || reservation.owner_id == user.user_id {
        Ok(())
    } else {
        Err(AppError::ForbiddenOperation)
    }
}

/// ストアへの書き込みは確定済みなので、通知側の失敗は記録だけして
/// 巻き戻さない。
async fn publish_mutation(registry: &AppRegistry, action: AuditAction, reservation: &Reservation) {
    if let Err(e) = registry.audit_log().record(action, reservation).await {
        tracing::warn!(error = %e, "操作ログの投稿に失敗しました");
    }
    if let Err(e) = registry.reservation_board().refresh().await {
        tracing::warn!(error = %e, "予約表の更新に失敗しました");
    }
}

fn not_found() -> AppError {
    AppError::EntityNotFound("該当する予約が見つかりませんでした。".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use kernel::model::{id::UserId, role::Role};

    fn reservation_of(owner: &str) -> Reservation {
        let start = Utc.with_ymd_and_hms(2025, 1, 10, 5, 0, 0).unwrap();
        Reservation {
            id: ReservationId::new(1),
            owner_id: UserId::new(owner),
            organization: "IT研究会".to_string(),
            room: DEFAULT_ROOM.to_string(),
            start_at: start,
            end_at: start + chrono::Duration::hours(2),
            created_at: start,
            notified: false,
        }
    }

    fn user(id: &str, role: Role) -> AuthorizedUser {
        AuthorizedUser {
            user_id: UserId::new(id),
            role,
        }
    }

    #[test]
    fn owner_may_touch_own_reservation() {
        let reservation = reservation_of("U1");
        assert!(ensure_owned(&user("U1", Role::User), &reservation).is_ok());
    }

    #[test]
    fn other_users_are_rejected() {
        let reservation = reservation_of("U1");
        let result = ensure_owned(&user("U2", Role::User), &reservation);
        assert!(matches!(result, Err(AppError::ForbiddenOperation)));
    }

    #[test]
    fn admin_may_touch_anyone() {
        let reservation = reservation_of("U1");
        assert!(ensure_owned(&user("ADMIN", Role::Admin), &reservation).is_ok());
    }
}
