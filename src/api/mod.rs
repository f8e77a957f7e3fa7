use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    alerts::CheckReport,
    app::App,
    display::{AlertView, ForecastView},
    error::WindRadarError,
    models::{AlertDraft, CitySelection, GeocodingResult},
    orchestrator::UiState,
    weather::ForecastMode,
};

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

pub type AppState = Arc<App>;

pub struct ApiError(WindRadarError);

impl From<WindRadarError> for ApiError {
    fn from(error: WindRadarError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WindRadarError::Validation { .. } => StatusCode::BAD_REQUEST,
            WindRadarError::NotFound { .. } => StatusCode::NOT_FOUND,
            WindRadarError::Api { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.user_message() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
pub struct ForecastResponse {
    pub mode: ForecastMode,
    #[serde(flatten)]
    pub state: UiState<ForecastView>,
}

#[derive(Deserialize)]
pub struct ModeRequest {
    pub mode: ForecastMode,
}

#[derive(Deserialize)]
pub struct EnabledRequest {
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct CityQuery {
    #[serde(default)]
    pub name: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/forecast", get(get_forecast))
        .route("/forecast/mode", put(set_mode))
        .route("/forecast/refresh", post(refresh_forecast))
        .route("/alerts", get(list_alerts).post(create_alert))
        .route("/alerts/check", post(check_alerts))
        .route("/alerts/{id}", delete(delete_alert))
        .route("/alerts/{id}/enabled", put(set_alert_enabled))
        .route("/cities", get(search_cities))
        .route("/city", get(get_city).put(select_city))
        .with_state(state)
}

fn forecast_response(app: &App) -> ForecastResponse {
    let state = match app.forecast.state() {
        UiState::Loading => UiState::Loading,
        UiState::Ready(result) => UiState::Ready(ForecastView::from(&result)),
        UiState::Error(message) => UiState::Error(message),
    };
    ForecastResponse {
        mode: app.forecast.mode(),
        state,
    }
}

async fn get_forecast(State(app): State<AppState>) -> Json<ForecastResponse> {
    Json(forecast_response(&app))
}

async fn set_mode(
    State(app): State<AppState>,
    Json(request): Json<ModeRequest>,
) -> Json<ForecastResponse> {
    app.forecast.set_mode(request.mode);
    Json(forecast_response(&app))
}

async fn refresh_forecast(State(app): State<AppState>) -> StatusCode {
    app.forecast.refresh();
    StatusCode::ACCEPTED
}

async fn list_alerts(State(app): State<AppState>) -> Json<Vec<AlertView>> {
    let alerts = app.alerts.list().await;
    Json(alerts.iter().map(|a| AlertView::new(a, &app.wind_unit)).collect())
}

async fn create_alert(
    State(app): State<AppState>,
    Json(draft): Json<AlertDraft>,
) -> ApiResult<(StatusCode, Json<AlertView>)> {
    let alert = app.create_alert(draft).await?;
    Ok((StatusCode::CREATED, Json(AlertView::new(&alert, &app.wind_unit))))
}

async fn set_alert_enabled(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<EnabledRequest>,
) -> ApiResult<Json<AlertView>> {
    let alert = app.alerts.set_enabled(&id, request.enabled).await?;
    Ok(Json(AlertView::new(&alert, &app.wind_unit)))
}

async fn delete_alert(State(app): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    app.delete_alert(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn check_alerts(State(app): State<AppState>) -> ApiResult<Json<CheckReport>> {
    Ok(Json(app.check.run_now().await?))
}

async fn search_cities(
    State(app): State<AppState>,
    Query(query): Query<CityQuery>,
) -> Json<Vec<GeocodingResult>> {
    Json(app.suggestions.lookup(&query.name, LOOKUP_TIMEOUT).await)
}

async fn get_city(State(app): State<AppState>) -> ApiResult<Json<CitySelection>> {
    app.cities
        .current()
        .map(Json)
        .ok_or_else(|| WindRadarError::not_found("no city selected").into())
}

async fn select_city(
    State(app): State<AppState>,
    Json(picked): Json<GeocodingResult>,
) -> ApiResult<Json<CitySelection>> {
    Ok(Json(app.select_city(picked).await?))
}
