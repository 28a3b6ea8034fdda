use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/get_doctors_by_department", get(handlers::get_doctors_by_department))
        .route("/{doctor_id}/get_availability", get(handlers::get_availability));

    let protected_routes = Router::new()
        .route("/{doctor_id}/set_availability", post(handlers::set_availability))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_availability))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
