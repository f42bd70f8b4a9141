use axum::{extract::State, Json};
use registry::AppRegistry;
use shared::error::AppResult;

use crate::extractor::AuthorizedUser;
use crate::model::meter::MeterStatusResponse;

pub async fn show_meter_status(
    _user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<MeterStatusResponse>> {
    let status = registry.meter().status().await?;
    Ok(Json(MeterStatusResponse::from(status)))
}
