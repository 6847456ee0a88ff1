/// HTTP request handlers
use crate::chart::CoverageChart;
use crate::clients::ObservatoryClient;
use crate::domain::{
    Health, PasswordCheck, SubmitReceipt, VisibilityQuery, WeatherReport, DEFAULT_SPEC_FILE,
};
use crate::errors::ApiError;
use crate::services::{
    AccessService, DashboardService, FormReview, FormService, VisibilityPanel,
};
use crate::views::form::FormDraft;
use crate::views::schedule::{ScheduleFilters, SchedulePanel};
use crate::views::status::StatusPanel;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: Arc<DashboardService<ObservatoryClient>>,
    pub form_service: Arc<FormService<ObservatoryClient>>,
    pub access_service: Arc<AccessService<ObservatoryClient>>,
}

/// Successful response wrapper
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordBody {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusParams {
    pub details: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleParams {
    pub show_unscheduled: Option<bool>,
    pub show_observed: Option<bool>,
}

impl From<ScheduleParams> for ScheduleFilters {
    fn from(params: ScheduleParams) -> Self {
        let defaults = ScheduleFilters::default();
        ScheduleFilters {
            show_unscheduled: params.show_unscheduled.unwrap_or(defaults.show_unscheduled),
            show_observed: params.show_observed.unwrap_or(defaults.show_observed),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SpecFileParams {
    pub file: Option<String>,
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

/// Check the shared form password
pub async fn auth(
    State(state): State<AppState>,
    Json(body): Json<PasswordBody>,
) -> Result<Json<SuccessResponse<PasswordCheck>>, ApiError> {
    let check = state.access_service.check_password(&body.password).await?;
    Ok(Json(SuccessResponse::new(check)))
}

/// Current weather and safety flag
pub async fn get_weather(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<WeatherReport>>, ApiError> {
    let report = state.dashboard_service.weather().await?;
    Ok(Json(SuccessResponse::new(report)))
}

/// Telescope status board
pub async fn get_status(
    Query(params): Query<StatusParams>,
    State(state): State<AppState>,
) -> Json<SuccessResponse<StatusPanel>> {
    let panel = state
        .dashboard_service
        .status_panel(params.details.unwrap_or(false))
        .await;
    Json(SuccessResponse::new(panel))
}

/// Daily observing schedule
pub async fn get_schedule(
    Query(params): Query<ScheduleParams>,
    State(state): State<AppState>,
) -> Json<SuccessResponse<SchedulePanel>> {
    let panel = state.dashboard_service.schedule_panel(params.into()).await;
    Json(SuccessResponse::new(panel))
}

/// Catalog of named targets
pub async fn list_targets(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let targets = state.form_service.targets().await?;
    Ok(Json(serde_json::json!(SuccessResponse::new(
        serde_json::json!({
            "targets": targets
        })
    ))))
}

/// Selectable spectral-mode files
pub async fn list_spec_options(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let options = state.form_service.spec_options().await?;
    Ok(Json(serde_json::json!(SuccessResponse::new(
        serde_json::json!({
            "options": options
        })
    ))))
}

/// Coverage of one spectral-mode file
pub async fn get_spec_file(
    Query(params): Query<SpecFileParams>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<CoverageChart>>, ApiError> {
    let file = params
        .file
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SPEC_FILE.to_string());
    let chart = state.form_service.spec_coverage(&file).await?;
    Ok(Json(SuccessResponse::new(chart)))
}

/// Visibility chart for one coordinate pair
pub async fn get_visibility(
    Query(query): Query<VisibilityQuery>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<VisibilityPanel>>, ApiError> {
    let panel = state.form_service.visibility_panel(&query).await?;
    Ok(Json(SuccessResponse::new(panel)))
}

/// Run the pre-submit checks and return the confirmation summary
pub async fn validate_form(
    State(state): State<AppState>,
    Json(draft): Json<FormDraft>,
) -> Result<Json<SuccessResponse<FormReview>>, ApiError> {
    let review = state.form_service.review(draft).await?;
    Ok(Json(SuccessResponse::new(review)))
}

/// Confirm and send a request
pub async fn submit_form(
    State(state): State<AppState>,
    Json(draft): Json<FormDraft>,
) -> Result<Json<SuccessResponse<SubmitReceipt>>, ApiError> {
    let receipt = state.form_service.submit(draft).await?;
    Ok(Json(SuccessResponse::new(receipt)))
}
