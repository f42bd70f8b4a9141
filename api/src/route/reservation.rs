use axum::{
    routing::{delete, get, put},
    Router,
};
use registry::AppRegistry;

use crate::handler::admin::{dump_reservations, wipe_reservations};
use crate::handler::reservation::{
    delete_reservation, reserve_room, show_organizations, show_reservation_list,
    show_selectable_reservations, update_reservation,
};

pub fn build_reservation_routers() -> Router<AppRegistry> {
    let routers = Router::new()
        .route("/", get(show_reservation_list).post(reserve_room))
        .route("/selectable", get(show_selectable_reservations))
        .route("/organizations", get(show_organizations))
        .route("/dump", get(dump_reservations))
        .route("/all", delete(wipe_reservations))
        .route(
            "/:reservation_id",
            put(update_reservation).delete(delete_reservation),
        );
    Router::new().nest("/reservations", routers)
}
