use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use opmeter_core::{correlation, MeasurementContext, Result};

use crate::app_state::AppState;
use crate::config::NameBy;

/// Wrap one request in a correlation scope and a measurement context named
/// after its route (or path).
pub async fn measure_request(State(state): State<AppState>, req: Request, next: Next) -> Response {
    correlation::scope(async move {
        let name = operation_name(state.cfg().metrics.name_by, &req);
        let mut act = state.registry().activate(&name);
        if let Some(user) = state.identity_of(req.headers()) {
            act.set_identity_user_id(user);
        }

        let response = next.run(req).await;

        if let Err(e) = record_status(&mut act, response.status()) {
            tracing::warn!(op = %name, error = %e, "failed to record response status");
        }
        if let Err(e) = act.finish() {
            tracing::warn!(op = %name, error = %e, "failed to emit request measurement");
        }
        response
    })
    .await
}

fn operation_name(name_by: NameBy, req: &Request) -> String {
    match name_by {
        NameBy::Route => req
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string()),
        NameBy::Path => req.uri().path().to_string(),
    }
}

fn record_status(m: &mut MeasurementContext, status: StatusCode) -> Result<()> {
    m.increment("requests")?;
    m.increment(&format!("status_{}", status.as_u16()))?;
    if status.is_server_error() {
        m.add_exception("ServerError")?;
    }
    Ok(())
}

/// Header lookup helper shared with operation handlers.
pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
