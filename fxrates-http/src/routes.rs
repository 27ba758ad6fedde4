use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use fxrates_core::{AuditContext, QueryEngine, SeriesId};

use crate::dto::{CreateCurrencyRequest, ExchangeRatesQuery, ListCurrenciesQuery, UpdateCurrencyRequest};
use crate::error::ApiError;
use crate::state::AppState;

/// Build the `/v1` router. The caller supplies `state`; this crate never
/// constructs its own collaborators.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/currencies", get(list_currencies))
        .route("/v1/admin/currencies", post(create_currency))
        .route("/v1/admin/currencies/:id", get(get_currency))
        .route("/v1/admin/currencies/:id", put(update_currency))
        .route("/v1/exchange-rates", get(get_exchange_rates))
        .route("/v1/admin/exchange-rates/import", post(trigger_import))
        .with_state(state)
}

async fn list_currencies(
    State(state): State<AppState>,
    Query(query): Query<ListCurrenciesQuery>,
) -> Result<Response, ApiError> {
    let series = state.catalog.get_all(query.enabled_only).await?;
    Ok(Json(series).into_response())
}

async fn create_currency(
    State(state): State<AppState>,
    Json(body): Json<CreateCurrencyRequest>,
) -> Result<Response, ApiError> {
    let audit = AuditContext::system(Utc::now());
    let created = state
        .catalog
        .create(&body.currency_code, &body.provider_series_id, body.enabled, &audit)
        .await?;

    let mut response = (StatusCode::CREATED, Json(created.clone())).into_response();
    if let Ok(location) = HeaderValue::from_str(&format!("/v1/admin/currencies/{}", created.id)) {
        response.headers_mut().insert(axum::http::header::LOCATION, location);
    }
    Ok(response)
}

async fn get_currency(
    State(state): State<AppState>,
    Path(id): Path<SeriesId>,
) -> Result<Response, ApiError> {
    let series = state.catalog.get_by_id(id).await?;
    Ok(Json(series).into_response())
}

async fn update_currency(
    State(state): State<AppState>,
    Path(id): Path<SeriesId>,
    Json(body): Json<UpdateCurrencyRequest>,
) -> Result<Response, ApiError> {
    let audit = AuditContext::system(Utc::now());
    let updated = state.catalog.update(id, body.enabled, &audit).await?;
    Ok(Json(updated).into_response())
}

async fn get_exchange_rates(
    State(state): State<AppState>,
    Query(query): Query<ExchangeRatesQuery>,
) -> Result<Response, ApiError> {
    let rows = state
        .query_engine
        .get_exchange_rates(&query.target_currency, query.start_date, query.end_date)
        .await?;
    Ok(Json(rows).into_response())
}

/// Manually trigger an incremental import across every enabled series.
/// Per-series failures are reported in the body rather than failing the
/// call; the call itself only errors (503) if listing the catalog fails
/// outright.
async fn trigger_import(State(state): State<AppState>) -> Result<Response, ApiError> {
    let outcomes = state.import_engine.import_latest_exchange_rates().await?;
    Ok(Json(outcomes).into_response())
}
