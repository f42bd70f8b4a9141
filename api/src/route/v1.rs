use axum::Router;
use registry::AppRegistry;

use super::{meter, reservation};

pub fn routes() -> Router<AppRegistry> {
    let router = Router::new()
        .merge(reservation::build_reservation_routers())
        .merge(meter::build_meter_routers());
    Router::new().nest("/api/v1", router)
}
