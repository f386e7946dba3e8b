// HTTP request handlers
use crate::domain::error::DashboardError;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::infrastructure::json_mapper::{dashboard_to_dto, table_to_dto};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct LagQuery {
    pub lag: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Full dashboard description, recomputed from the source on every call
pub async fn get_dashboard(
    Query(query): Query<LagQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);

    let lag = match parse_lag(query.lag.as_deref()) {
        Ok(lag) => lag,
        Err(e) => return error_response(e, compress).await,
    };

    match state.dashboard_service.get_dashboard(lag).await {
        Ok(dashboard) => respond(StatusCode::OK, &dashboard_to_dto(dashboard), compress).await,
        Err(e) => error_response(e, compress).await,
    }
}

/// Raw table only
pub async fn get_table(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let compress = accepts_brotli(&headers);

    match state.dashboard_service.get_table().await {
        Ok(table) => respond(StatusCode::OK, &table_to_dto(table), compress).await,
        Err(e) => error_response(e, compress).await,
    }
}

fn parse_lag(raw: Option<&str>) -> Result<Option<usize>, DashboardError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => match text.parse::<usize>() {
            Ok(0) | Err(_) => Err(DashboardError::invalid(format!(
                "lag must be a positive integer, got {}",
                text
            ))),
            Ok(lag) => Ok(Some(lag)),
        },
    }
}

pub fn status_for(error: &DashboardError) -> StatusCode {
    match error {
        DashboardError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DashboardError::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn error_response(error: DashboardError, compress: bool) -> Response {
    let status = status_for(&error);
    tracing::warn!("Request failed with {}: {}", status, error);
    let body = ErrorBody {
        error: error.to_string(),
    };
    respond(status, &body, compress).await
}

async fn respond<T: Serialize>(status: StatusCode, body: &T, compress: bool) -> Response {
    match json_response(status, body, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
