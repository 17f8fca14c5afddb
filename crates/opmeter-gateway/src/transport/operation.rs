//! `POST /v1/ops/:svc`: run a registered operation on a JSON body.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::Value;

use crate::app_state::AppState;
use crate::error::ApiError;

pub async fn run_operation(
    State(app): State<AppState>,
    Path(svc): Path<String>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let identity = app.identity_of(&headers);
    let out = app
        .dispatcher()
        .dispatch(app.registry(), &svc, identity, input)
        .await?;
    Ok(Json(out))
}
