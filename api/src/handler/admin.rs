use axum::{extract::State, Json};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::extractor::AuthorizedUser;
use crate::model::admin::WipeResponse;

/// テーブル全件の生ダンプ。動作確認用で、誰でも呼べる。
pub async fn dump_reservations(
    _user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<String> {
    let reservations = registry.reservation_repository().find_all().await?;
    if reservations.is_empty() {
        return Ok("DBには予約が登録されていません。".to_string());
    }
    let mut out = String::from("DB:\n");
    for r in reservations {
        out.push_str(&format!(
            "({}, {}, {}, {}, {}, {}, {}, {})\n",
            r.id,
            r.owner_id,
            r.organization,
            r.room,
            r.start_at,
            r.end_at,
            r.created_at,
            r.notified as i64,
        ));
    }
    Ok(out)
}

/// テーブルを空にする。管理者のみ。
pub async fn wipe_reservations(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<WipeResponse>> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }
    let deleted = registry.reservation_repository().delete_all().await?;
    if let Err(e) = registry.reservation_board().refresh().await {
        tracing::warn!(error = %e, "予約表の更新に失敗しました");
    }
    Ok(Json(WipeResponse { deleted }))
}
