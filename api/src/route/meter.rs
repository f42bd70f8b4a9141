use axum::{routing::get, Router};
use registry::AppRegistry;

use crate::handler::meter::show_meter_status;

pub fn build_meter_routers() -> Router<AppRegistry> {
    let routers = Router::new().route("/status", get(show_meter_status));
    Router::new().nest("/meter", routers)
}
