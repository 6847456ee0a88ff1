/// Business logic services layer
use crate::chart::lifecycle::{ChartManager, RenderedChart, SnapshotSurface};
use crate::chart::{build_coverage, CoverageChart};
use crate::clients::ObservatoryApi;
use crate::coords::{self, Axis};
use crate::domain::{
    PasswordCheck, SubmitReceipt, Target, VisibilityOutcome, VisibilityQuery, WeatherReport,
};
use crate::errors::{ApiError, ApiResult, ValidationError};
use crate::views::form::{
    ConfirmationSummary, Effect, FormDraft, FormMessage, Phase, TargetForm, SUBMIT_FAILED_MESSAGE,
};
use crate::views::schedule::{ScheduleFilters, SchedulePanel, ScheduleView};
use crate::views::status::{StatusPanel, StatusView};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const INCORRECT_PASSWORD: &str = "Incorrect password. Please try again.";

/// Log a failed fetch and turn it into the text a view shows instead of data
fn load_failure(what: &str, err: ApiError) -> String {
    error!("{} fetch failed: {}", what, err);
    err.user_message()
}

/// Status board and daily schedule
pub struct DashboardService<A> {
    api: Arc<A>,
}

impl<A: ObservatoryApi> DashboardService<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Mount the status view, fetch status and filters together, render once
    pub async fn status_panel(&self, details: bool) -> StatusPanel {
        let mut view = StatusView::new();
        view.set_details_expanded(details);
        let result = tokio::try_join!(self.api.fetch_status(), self.api.fetch_filter_info());
        view.loaded(result.map_err(|e| load_failure("status", e)));
        view.render()
    }

    pub async fn schedule_panel(&self, filters: ScheduleFilters) -> SchedulePanel {
        let mut view = ScheduleView::new(filters);
        let result = self.api.fetch_daily_schedule().await;
        view.loaded(result.map_err(|e| load_failure("schedule", e)));
        view.render()
    }

    pub async fn weather(&self) -> ApiResult<WeatherReport> {
        self.api.fetch_weather().await
    }
}

/// Visibility answer for one RA/Dec pair
#[derive(Debug, Clone, Serialize)]
pub struct VisibilityPanel {
    pub observable_tonight: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<RenderedChart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A draft that passed every pre-submit check
#[derive(Debug, Clone, Serialize)]
pub struct FormReview {
    pub summary: ConfirmationSummary,
    pub observable_tonight: bool,
    /// RA/Dec were taken from the catalog
    pub catalog_target: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<RenderedChart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageChart>,
}

/// Request form: option lists, visibility and submission
pub struct FormService<A> {
    api: Arc<A>,
}

impl<A: ObservatoryApi> FormService<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub async fn targets(&self) -> ApiResult<Vec<Target>> {
        self.api.fetch_targets().await
    }

    pub async fn spec_options(&self) -> ApiResult<Vec<String>> {
        self.api.fetch_spec_options().await
    }

    pub async fn spec_coverage(&self, file: &str) -> ApiResult<CoverageChart> {
        let coverage = self.api.fetch_spec_file(file).await?;
        Ok(build_coverage(&coverage))
    }

    /// Query staralt for one coordinate pair and draw the chart for it
    pub async fn visibility_panel(&self, query: &VisibilityQuery) -> ApiResult<VisibilityPanel> {
        check_coordinate(Axis::Ra, &query.ra)?;
        check_coordinate(Axis::Dec, &query.dec)?;

        let outcome = self.api.fetch_visibility(query).await?;
        let mut manager = ChartManager::new(SnapshotSurface::default());
        manager.mount();
        manager.show(&outcome);

        let error = match &outcome {
            VisibilityOutcome::Failed(reason) => Some(reason.clone()),
            VisibilityOutcome::Track(_) => None,
        };
        Ok(VisibilityPanel {
            observable_tonight: outcome.is_observable_tonight(),
            chart: manager.chart().cloned(),
            error,
        })
    }

    /// Replay a draft and run the pre-submit checks against fresh visibility
    pub async fn review(&self, draft: FormDraft) -> ApiResult<FormReview> {
        let form = self.prepare(draft).await?;
        Ok(review_of(&form))
    }

    /// Replay a draft, confirm it and post the request
    pub async fn submit(&self, draft: FormDraft) -> ApiResult<SubmitReceipt> {
        let mut form = self.prepare(draft).await?;
        let request = match form.update(FormMessage::Confirmed) {
            Effect::Post(request) => request,
            other => {
                return Err(ApiError::Internal(format!(
                    "confirmation produced {:?} instead of a post",
                    other
                )))
            }
        };

        match self.api.send_request(&request).await {
            Ok(receipt) => {
                info!("request for {} sent by {}", request.target, request.requester);
                form.update(FormMessage::Submitted(Ok(receipt.clone())));
                Ok(receipt)
            }
            Err(e) => {
                error!("sending request for {} failed: {}", request.target, e);
                form.update(FormMessage::Submitted(Err(e.to_string())));
                Err(ApiError::SubmitFailed(SUBMIT_FAILED_MESSAGE.to_string()))
            }
        }
    }

    /// Drive a fresh form to the confirmation step.
    ///
    /// Only the last visibility query the replay issues is sent; earlier ones are
    /// already superseded by the time the draft is fully entered.
    async fn prepare(&self, draft: FormDraft) -> ApiResult<TargetForm<SnapshotSurface>> {
        let mut form = TargetForm::new(SnapshotSurface::default());
        for effect in form.mount() {
            self.run(&mut form, effect).await;
        }

        let mut latest_query = None;
        for message in draft.into_messages() {
            match form.update(message) {
                Effect::QueryVisibility { seq, query } => latest_query = Some((seq, query)),
                effect => self.run(&mut form, effect).await,
            }
        }

        if let Some((seq, query)) = latest_query {
            match self.api.fetch_visibility(&query).await {
                Ok(outcome) => {
                    form.update(FormMessage::VisibilityLoaded {
                        seq,
                        result: Ok(outcome),
                    });
                }
                Err(e) => {
                    error!("visibility fetch for {:?} failed: {}", query, e);
                    return Err(e);
                }
            }
        }

        form.update(FormMessage::SubmitPressed);
        if form.phase() != Phase::Confirming {
            return Err(match form.validate() {
                Err(err) => ApiError::Validation(err),
                Ok(()) => ApiError::Internal("form did not reach confirmation".to_string()),
            });
        }
        Ok(form)
    }

    /// Perform one effect and feed its result back into the form
    async fn run(&self, form: &mut TargetForm<SnapshotSurface>, effect: Effect) {
        let message = match effect {
            Effect::None => return,
            Effect::LoadCatalog => FormMessage::CatalogLoaded(
                self.api
                    .fetch_targets()
                    .await
                    .map_err(|e| load_failure("catalog", e)),
            ),
            Effect::LoadSpecOptions => FormMessage::SpecOptionsLoaded(
                self.api
                    .fetch_spec_options()
                    .await
                    .map_err(|e| load_failure("spec options", e)),
            ),
            Effect::LoadSpecFile(file) => {
                let result = self
                    .api
                    .fetch_spec_file(&file)
                    .await
                    .map_err(|e| load_failure("spec file", e));
                FormMessage::SpecFileLoaded { file, result }
            }
            Effect::QueryVisibility { seq, query } => FormMessage::VisibilityLoaded {
                seq,
                result: self
                    .api
                    .fetch_visibility(&query)
                    .await
                    .map_err(|e| load_failure("visibility", e)),
            },
            Effect::Post(request) => FormMessage::Submitted(
                self.api
                    .send_request(&request)
                    .await
                    .map_err(|e| load_failure("submit", e)),
            ),
        };
        match form.update(message) {
            Effect::None => {}
            followup => debug!("ignoring follow-up effect {:?}", followup),
        }
    }
}

fn check_coordinate(axis: Axis, value: &str) -> Result<(), ValidationError> {
    if coords::is_valid(axis, value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCoordinate {
            axis: axis.label(),
            value: value.to_string(),
        })
    }
}

fn review_of(form: &TargetForm<SnapshotSurface>) -> FormReview {
    FormReview {
        summary: form.summary(),
        observable_tonight: form.visibility().map_or(false, |v| v.is_observable_tonight()),
        catalog_target: form.coords_locked(),
        chart: form.chart().chart().cloned(),
        coverage: form.coverage().map(build_coverage),
    }
}

/// Shared-password gate in front of the request form
pub struct AccessService<A> {
    api: Arc<A>,
}

impl<A: ObservatoryApi> AccessService<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub async fn check_password(&self, password: &str) -> ApiResult<PasswordCheck> {
        if password.is_empty() {
            return Err(ApiError::Unauthorized(INCORRECT_PASSWORD.to_string()));
        }
        if self.api.validate_password(password).await? {
            Ok(PasswordCheck { valid: true })
        } else {
            Err(ApiError::Unauthorized(INCORRECT_PASSWORD.to_string()))
        }
    }
}
