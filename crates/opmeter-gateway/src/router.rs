//! Axum router wiring.
//!
//! Every matched route runs under the request measurement middleware.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, obs, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/v1/ops/:svc", post(transport::operation::run_operation))
        .route_layer(middleware::from_fn_with_state(state.clone(), obs::measure_request))
        .with_state(state)
}
