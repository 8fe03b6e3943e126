use axum::{
    Json, Router, middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::require_admin;
use crate::state::AppState;
use crate::{channels, records, upload, users};

pub fn router(state: AppState) -> Router {
    let upload_route = post(upload::upload).fallback(upload::wrong_method);

    let public_routes = Router::new()
        .route("/{channel_id}/upload/", upload_route.clone())
        .route("/{channel_id}/upload", upload_route)
        .route("/health", get(health));

    let admin_routes = Router::new()
        .route("/users", post(users::create_user))
        .route("/channels", post(channels::create_channel))
        .route(
            "/channels/{channel_id}",
            get(channels::get_channel).delete(channels::delete_channel),
        )
        .route(
            "/channels/{channel_id}/write_key",
            post(channels::regenerate_write_key),
        )
        .route(
            "/channels/{channel_id}/fields/{field_no}",
            put(channels::set_field_encoding),
        )
        .route("/channels/{channel_id}/records", get(records::list_records))
        .route(
            "/channels/{channel_id}/records/{record_id}/fields/{field_no}",
            get(records::get_field_value),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
