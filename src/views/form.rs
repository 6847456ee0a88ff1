//! Target-of-opportunity request form.
//!
//! The form is a plain state machine: [`TargetForm::update`] applies one
//! [`FormMessage`] and answers with the [`Effect`] the caller must run (a fetch or
//! the final post). Results come back in as messages. Visibility queries are
//! fenced by sequence number so only the answer to the latest query is used.
use crate::chart::lifecycle::{ChartManager, ChartSurface};
use crate::coords::{self, Axis};
use crate::domain::{
    DetailedSettings, ModeSettings, ObsMode, ObservationRequest, SpecFileCoverage, SubmitReceipt,
    Target, VisibilityOutcome, VisibilityQuery, BINNING_CHOICES, DEEP_FILTER_CHOICES,
    DEFAULT_SPEC_FILE, MAX_TELESCOPES,
};
use crate::errors::{ValidationError, RETRY_MESSAGE};
use crate::utils::normalize_exposure_text;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to send the email. Please try again.";
const DEFAULT_EXPOSURE: &str = "300";
const DEFAULT_TEL_NUMBER: u8 = 10;

pub fn is_valid_email(text: &str) -> bool {
    EMAIL.is_match(text)
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormMessage {
    RequesterChanged(String),
    TargetChanged(String),
    RaChanged(String),
    DecChanged(String),
    ExposureChanged(String),
    ExposureBlurred,
    ObsModeSelected(ObsMode),
    SpecFileSelected(String),
    FilterToggled(String),
    TelNumberSelected(u8),
    FrameExposureChanged(f64),
    ImageCountChanged(u32),
    PriorityChanged(i64),
    GainChanged(i64),
    BinningSelected(u8),
    StartTimeChanged(String),
    RadiusChanged(Option<f64>),
    ResetDetails,
    CommentsChanged(String),
    AbortToggled(bool),
    VisibilityPanelShown(bool),
    CatalogLoaded(Result<Vec<Target>, String>),
    SpecOptionsLoaded(Result<Vec<String>, String>),
    SpecFileLoaded {
        file: String,
        result: Result<SpecFileCoverage, String>,
    },
    VisibilityLoaded {
        seq: u64,
        result: Result<VisibilityOutcome, String>,
    },
    SubmitPressed,
    Confirmed,
    Submitted(Result<SubmitReceipt, String>),
}

/// Work the form asks its driver to perform
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    LoadCatalog,
    LoadSpecOptions,
    LoadSpecFile(String),
    QueryVisibility { seq: u64, query: VisibilityQuery },
    Post(ObservationRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Editing,
    Confirming,
    Sending,
    Sent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum Notice {
    Error(String),
    Success(String),
}

/// Latest issued visibility query and the last answer received
#[derive(Debug, Default)]
struct VisibilityState {
    issued: u64,
    received: Option<(u64, VisibilityOutcome)>,
}

impl VisibilityState {
    fn current(&self) -> Option<&VisibilityOutcome> {
        match &self.received {
            Some((seq, outcome)) if *seq == self.issued => Some(outcome),
            _ => None,
        }
    }
}

pub struct TargetForm<S: ChartSurface> {
    catalog: Vec<Target>,
    requester: String,
    target: String,
    ra: String,
    dec: String,
    coords_locked: bool,
    exposure: String,
    obsmode: ObsMode,
    spec_options: Vec<String>,
    selected_spec_file: String,
    coverage: Option<SpecFileCoverage>,
    selected_filters: Vec<String>,
    selected_tel_number: u8,
    details: DetailedSettings,
    comments: String,
    abort_observation: bool,
    visibility: VisibilityState,
    chart: ChartManager<S>,
    phase: Phase,
    notice: Option<Notice>,
}

impl<S: ChartSurface> TargetForm<S> {
    pub fn new(surface: S) -> Self {
        Self {
            catalog: Vec::new(),
            requester: String::new(),
            target: String::new(),
            ra: String::new(),
            dec: String::new(),
            coords_locked: false,
            exposure: DEFAULT_EXPOSURE.to_string(),
            obsmode: ObsMode::Spec,
            spec_options: vec![DEFAULT_SPEC_FILE.to_string()],
            selected_spec_file: DEFAULT_SPEC_FILE.to_string(),
            coverage: None,
            selected_filters: vec!["g".to_string()],
            selected_tel_number: DEFAULT_TEL_NUMBER,
            details: DetailedSettings::default(),
            comments: String::new(),
            abort_observation: false,
            visibility: VisibilityState::default(),
            chart: ChartManager::new(surface),
            phase: Phase::Editing,
            notice: None,
        }
    }

    /// Show the form: the visibility canvas starts visible and the catalog and
    /// spectral options are fetched once.
    pub fn mount(&mut self) -> Vec<Effect> {
        self.chart.mount();
        vec![
            Effect::LoadCatalog,
            Effect::LoadSpecOptions,
            Effect::LoadSpecFile(self.selected_spec_file.clone()),
        ]
    }

    pub fn coverage(&self) -> Option<&SpecFileCoverage> {
        self.coverage.as_ref()
    }

    /// RA/Dec come from the catalog and cannot be edited
    pub fn coords_locked(&self) -> bool {
        self.coords_locked
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Visibility for the current inputs, if it has arrived
    pub fn visibility(&self) -> Option<&VisibilityOutcome> {
        self.visibility.current()
    }

    pub fn chart(&self) -> &ChartManager<S> {
        &self.chart
    }

    pub fn update(&mut self, message: FormMessage) -> Effect {
        match message {
            FormMessage::RequesterChanged(value) => {
                self.requester = value;
                Effect::None
            }
            FormMessage::TargetChanged(value) => {
                self.target = value;
                let known = self.catalog.iter().find(|t| t.name == self.target).cloned();
                if let Some(entry) = known {
                    self.ra = entry.ra;
                    self.dec = entry.dec;
                    self.coords_locked = true;
                } else if self.coords_locked {
                    self.ra.clear();
                    self.dec.clear();
                    self.coords_locked = false;
                }
                self.coordinates_changed()
            }
            FormMessage::RaChanged(value) => {
                if self.coords_locked {
                    return Effect::None;
                }
                self.ra = value;
                self.coordinates_changed()
            }
            FormMessage::DecChanged(value) => {
                if self.coords_locked {
                    return Effect::None;
                }
                self.dec = value;
                self.coordinates_changed()
            }
            FormMessage::ExposureChanged(value) => {
                if let Ok(total) = value.trim().parse::<f64>() {
                    self.details.single_frame_exposure = total / self.details.image_count as f64;
                }
                self.exposure = value;
                Effect::None
            }
            FormMessage::ExposureBlurred => {
                self.exposure = normalize_exposure_text(&self.exposure);
                Effect::None
            }
            FormMessage::ObsModeSelected(mode) => {
                self.obsmode = mode;
                match mode {
                    ObsMode::Spec => Effect::LoadSpecOptions,
                    ObsMode::Deep => Effect::None,
                }
            }
            FormMessage::SpecFileSelected(file) => {
                if !self.spec_options.contains(&file) {
                    warn!(
                        "{} is not a listed spectral mode, keeping {}",
                        file, self.selected_spec_file
                    );
                    return Effect::None;
                }
                self.selected_spec_file = file.clone();
                self.coverage = None;
                Effect::LoadSpecFile(file)
            }
            FormMessage::FilterToggled(filter) => {
                if !DEEP_FILTER_CHOICES.contains(&filter.as_str()) {
                    return Effect::None;
                }
                if self.selected_filters.contains(&filter) {
                    self.selected_filters.retain(|f| *f != filter);
                } else {
                    self.selected_filters.push(filter);
                }
                Effect::None
            }
            FormMessage::TelNumberSelected(n) => {
                self.selected_tel_number = n.clamp(1, MAX_TELESCOPES);
                Effect::None
            }
            FormMessage::FrameExposureChanged(seconds) => {
                self.details.single_frame_exposure = seconds;
                self.sync_total_exposure();
                Effect::None
            }
            FormMessage::ImageCountChanged(count) => {
                self.details.image_count = count.max(1);
                self.sync_total_exposure();
                Effect::None
            }
            FormMessage::PriorityChanged(priority) => {
                self.details.priority = priority;
                Effect::None
            }
            FormMessage::GainChanged(gain) => {
                self.details.gain = gain;
                Effect::None
            }
            FormMessage::BinningSelected(binning) => {
                if BINNING_CHOICES.contains(&binning) {
                    self.details.binning = binning;
                }
                Effect::None
            }
            FormMessage::StartTimeChanged(value) => {
                self.details.obs_start_time = value;
                Effect::None
            }
            FormMessage::RadiusChanged(radius) => {
                self.details.radius = radius;
                Effect::None
            }
            FormMessage::ResetDetails => {
                self.details = DetailedSettings::default();
                self.sync_total_exposure();
                Effect::None
            }
            FormMessage::CommentsChanged(value) => {
                self.comments = value;
                Effect::None
            }
            FormMessage::AbortToggled(abort) => {
                self.abort_observation = abort;
                Effect::None
            }
            FormMessage::VisibilityPanelShown(true) => {
                self.chart.mount();
                Effect::None
            }
            FormMessage::VisibilityPanelShown(false) => {
                self.chart.unmount();
                Effect::None
            }
            FormMessage::CatalogLoaded(Ok(targets)) => {
                self.catalog = targets;
                Effect::None
            }
            FormMessage::CatalogLoaded(Err(err)) => {
                warn!("target catalog unavailable: {}", err);
                Effect::None
            }
            FormMessage::SpecOptionsLoaded(Ok(options)) => {
                self.spec_options = options;
                Effect::None
            }
            FormMessage::SpecOptionsLoaded(Err(err)) => {
                warn!("spectral mode options unavailable: {}", err);
                Effect::None
            }
            FormMessage::SpecFileLoaded { file, result } => {
                if file != self.selected_spec_file {
                    return Effect::None;
                }
                match result {
                    Ok(coverage) => self.coverage = Some(coverage),
                    Err(err) => warn!("spec file {} unavailable: {}", file, err),
                }
                Effect::None
            }
            FormMessage::VisibilityLoaded { seq, result } => {
                if seq != self.visibility.issued {
                    debug!(
                        "dropping visibility answer {} (latest is {})",
                        seq, self.visibility.issued
                    );
                    return Effect::None;
                }
                match result {
                    Ok(outcome) => {
                        if let VisibilityOutcome::Failed(reason) = &outcome {
                            warn!("visibility query {} failed upstream: {}", seq, reason);
                        }
                        self.chart.show(&outcome);
                        self.visibility.received = Some((seq, outcome));
                    }
                    Err(err) => {
                        warn!("visibility query {} did not complete: {}", seq, err);
                        self.notice = Some(Notice::Error(RETRY_MESSAGE.to_string()));
                    }
                }
                Effect::None
            }
            FormMessage::SubmitPressed => {
                if self.phase == Phase::Sending {
                    return Effect::None;
                }
                match self.validate() {
                    Ok(()) => {
                        self.notice = None;
                        self.phase = Phase::Confirming;
                    }
                    Err(err) => {
                        self.notice = Some(Notice::Error(err.to_string()));
                        self.phase = Phase::Editing;
                    }
                }
                Effect::None
            }
            FormMessage::Confirmed => {
                if self.phase != Phase::Confirming {
                    return Effect::None;
                }
                // late answers may have changed the picture since the dialog opened
                if let Err(err) = self.validate() {
                    self.notice = Some(Notice::Error(err.to_string()));
                    self.phase = Phase::Editing;
                    return Effect::None;
                }
                self.phase = Phase::Sending;
                Effect::Post(self.build_request())
            }
            FormMessage::Submitted(Ok(receipt)) => {
                self.phase = Phase::Sent;
                self.notice = Some(Notice::Success(receipt.message));
                Effect::None
            }
            FormMessage::Submitted(Err(err)) => {
                warn!("request submission failed: {}", err);
                self.phase = Phase::Editing;
                self.notice = Some(Notice::Error(SUBMIT_FAILED_MESSAGE.to_string()));
                Effect::None
            }
        }
    }

    /// Any of RA, Dec or name changed: supersede in-flight queries and issue a
    /// new one when both coordinates are valid.
    fn coordinates_changed(&mut self) -> Effect {
        self.visibility.issued += 1;
        if coords::is_valid_pair(&self.ra, &self.dec) {
            Effect::QueryVisibility {
                seq: self.visibility.issued,
                query: VisibilityQuery {
                    ra: self.ra.trim().to_string(),
                    dec: self.dec.trim().to_string(),
                    objname: self.target.clone(),
                },
            }
        } else {
            self.chart.clear();
            Effect::None
        }
    }

    fn sync_total_exposure(&mut self) {
        let total = self.details.single_frame_exposure * self.details.image_count as f64;
        self.exposure = total.to_string();
    }

    /// Typed total exposure in seconds, `None` unless a positive number
    fn typed_exposure(&self) -> Option<f64> {
        self.exposure
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
    }

    fn exposure_seconds(&self) -> f64 {
        self.typed_exposure().unwrap_or(
            self.details.single_frame_exposure * self.details.image_count as f64,
        )
    }

    /// Pre-submit checks; the first failing check wins
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [&self.requester, &self.target, &self.ra, &self.dec];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(ValidationError::MissingFields);
        }
        if !is_valid_email(self.requester.trim()) {
            return Err(ValidationError::InvalidEmail);
        }
        for (axis, value) in [(Axis::Ra, &self.ra), (Axis::Dec, &self.dec)] {
            if !coords::is_valid(axis, value) {
                return Err(ValidationError::InvalidCoordinate {
                    axis: axis.label(),
                    value: value.trim().to_string(),
                });
            }
        }
        if self.typed_exposure().is_none() {
            return Err(ValidationError::InvalidExposure);
        }
        match self.visibility.current() {
            None => Err(ValidationError::VisibilityPending),
            Some(outcome) if !outcome.is_observable_tonight() => Err(ValidationError::NotObservable),
            Some(_) => Ok(()),
        }
    }

    fn mode_settings(&self) -> ModeSettings {
        match self.obsmode {
            ObsMode::Spec => ModeSettings::Spec {
                selected_spec_file: self.selected_spec_file.clone(),
            },
            ObsMode::Deep => ModeSettings::Deep {
                selected_filters: DEEP_FILTER_CHOICES
                    .iter()
                    .filter(|f| self.selected_filters.iter().any(|s| s == *f))
                    .map(|f| f.to_string())
                    .collect(),
                selected_tel_number: self.selected_tel_number,
            },
        }
    }

    /// The payload exactly as it will be posted
    pub fn build_request(&self) -> ObservationRequest {
        ObservationRequest {
            requester: self.requester.trim().to_string(),
            target: self.target.clone(),
            ra: self.ra.clone(),
            dec: self.dec.clone(),
            exposure: self.exposure_seconds(),
            mode: self.mode_settings(),
            comments: self.comments.clone(),
            abort_observation: self.abort_observation,
            details: self.details.clone(),
        }
    }

    /// What the confirmation dialog shows before the request is sent
    pub fn summary(&self) -> ConfirmationSummary {
        let mode = match self.mode_settings() {
            ModeSettings::Spec { selected_spec_file } => format!("Spec ({})", selected_spec_file),
            ModeSettings::Deep {
                selected_filters,
                selected_tel_number,
            } => format!(
                "Deep (Filters: {} | Telescopes: {})",
                selected_filters.join(", "),
                selected_tel_number
            ),
        };
        ConfirmationSummary {
            target: self.target.clone(),
            ra: self.ra.clone(),
            dec: self.dec.clone(),
            ra_deg: coords::to_degrees(Axis::Ra, &self.ra),
            dec_deg: coords::to_degrees(Axis::Dec, &self.dec),
            exposure: format!("{} seconds", self.exposure_seconds()),
            obsmode: mode,
            comments: self.comments.clone(),
            abort_observation: if self.abort_observation { "Yes" } else { "No" },
            single_frame_exposure: format!("{} seconds", self.details.single_frame_exposure),
            image_count: self.details.image_count,
            priority: self.details.priority,
            gain: self.details.gain,
            binning: self.details.binning,
            obs_start_time: self.details.obs_start_time.clone(),
        }
    }
}

#[cfg(test)]
impl<S: ChartSurface> TargetForm<S> {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn ra(&self) -> &str {
        &self.ra
    }

    pub fn dec(&self) -> &str {
        &self.dec
    }

    pub fn exposure(&self) -> &str {
        &self.exposure
    }

    pub fn details(&self) -> &DetailedSettings {
        &self.details
    }

    pub fn selected_filters(&self) -> &[String] {
        &self.selected_filters
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationSummary {
    pub target: String,
    pub ra: String,
    pub dec: String,
    pub ra_deg: Option<f64>,
    pub dec_deg: Option<f64>,
    pub exposure: String,
    pub obsmode: String,
    pub comments: String,
    pub abort_observation: &'static str,
    pub single_frame_exposure: String,
    pub image_count: u32,
    pub priority: i64,
    pub gain: i64,
    pub binning: u8,
    pub obs_start_time: String,
}

/// A filled-in form as posted by a browser; replayed as edits so it goes
/// through the same rules as interactive input.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormDraft {
    pub requester: String,
    pub target: String,
    pub ra: String,
    pub dec: String,
    pub exposure: Option<String>,
    pub obsmode: Option<ObsMode>,
    pub selected_spec_file: Option<String>,
    pub selected_filters: Option<Vec<String>>,
    pub selected_tel_number: Option<u8>,
    pub details: Option<DetailedSettings>,
    /// The detailed settings were reset to their defaults
    pub reset_details: bool,
    /// Whether the visibility plot is open
    pub show_visibility: Option<bool>,
    pub comments: String,
    pub abort_observation: bool,
}

impl FormDraft {
    /// Messages that turn a freshly mounted form into this draft
    pub fn into_messages(self) -> Vec<FormMessage> {
        let mut messages = vec![
            FormMessage::TargetChanged(self.target),
            FormMessage::RaChanged(self.ra),
            FormMessage::DecChanged(self.dec),
            FormMessage::RequesterChanged(self.requester),
        ];
        if let Some(shown) = self.show_visibility {
            messages.push(FormMessage::VisibilityPanelShown(shown));
        }
        if self.reset_details {
            messages.push(FormMessage::ResetDetails);
        } else if let Some(details) = self.details {
            messages.extend([
                FormMessage::ImageCountChanged(details.image_count),
                FormMessage::FrameExposureChanged(details.single_frame_exposure),
                FormMessage::PriorityChanged(details.priority),
                FormMessage::GainChanged(details.gain),
                FormMessage::BinningSelected(details.binning),
                FormMessage::StartTimeChanged(details.obs_start_time),
                FormMessage::RadiusChanged(details.radius),
            ]);
        }
        if !self.reset_details {
            if let Some(exposure) = self.exposure {
                messages.push(FormMessage::ExposureChanged(exposure));
                messages.push(FormMessage::ExposureBlurred);
            }
        }
        let mode = self.obsmode.unwrap_or(ObsMode::Spec);
        messages.push(FormMessage::ObsModeSelected(mode));
        if let Some(file) = self.selected_spec_file {
            messages.push(FormMessage::SpecFileSelected(file));
        }
        if let Some(filters) = self.selected_filters {
            // the form starts with "g" selected
            for choice in DEEP_FILTER_CHOICES {
                let wanted = filters.iter().any(|f| f == choice);
                if wanted != (choice == "g") {
                    messages.push(FormMessage::FilterToggled(choice.to_string()));
                }
            }
        }
        if let Some(n) = self.selected_tel_number {
            messages.push(FormMessage::TelNumberSelected(n));
        }
        messages.push(FormMessage::CommentsChanged(self.comments));
        messages.push(FormMessage::AbortToggled(self.abort_observation));
        messages
    }
}
