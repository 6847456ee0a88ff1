/// Domain models for the application
use crate::utils::{de_text, de_timestamp, de_timestamps};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Minimum target altitude (deg) used for every visibility query
pub const TARGET_MINALT: f64 = 30.0;
/// Minimum target-moon separation (deg) used for every visibility query
pub const TARGET_MINMOONSEP: f64 = 40.0;

pub const DEFAULT_SPEC_FILE: &str = "specall.specmode";
pub const DEEP_FILTER_CHOICES: [&str; 3] = ["g", "r", "i"];
pub const BROAD_BANDS: [&str; 5] = ["u", "g", "r", "i", "z"];
pub const MAX_TELESCOPES: u8 = 20;
pub const BINNING_CHOICES: [u8; 2] = [1, 2];

/// Catalog entry for a named target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    #[serde(deserialize_with = "de_text")]
    pub ra: String,
    #[serde(deserialize_with = "de_text")]
    pub dec: String,
}

/// Per-sample observability code of the target track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColorCode {
    Observable,
    Marginal,
    Unobservable,
    Other(String),
}

impl From<String> for ColorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "g" => ColorCode::Observable,
            "k" => ColorCode::Marginal,
            "r" => ColorCode::Unobservable,
            _ => ColorCode::Other(code),
        }
    }
}

impl From<ColorCode> for String {
    fn from(code: ColorCode) -> Self {
        match code {
            ColorCode::Observable => "g".to_string(),
            ColorCode::Marginal => "k".to_string(),
            ColorCode::Unobservable => "r".to_string(),
            ColorCode::Other(s) => s,
        }
    }
}

/// Tonight's twilight boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tonight {
    #[serde(deserialize_with = "de_timestamp")]
    pub sunset_night: DateTime<Utc>,
    #[serde(deserialize_with = "de_timestamp")]
    pub sunrise_night: DateTime<Utc>,
    #[serde(deserialize_with = "de_timestamp")]
    pub sunset_civil: DateTime<Utc>,
    #[serde(deserialize_with = "de_timestamp")]
    pub sunrise_civil: DateTime<Utc>,
}

/// Altitude tracks for target, sun and moon over tonight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityTrack {
    #[serde(default)]
    pub objname: Option<String>,
    #[serde(deserialize_with = "de_timestamps")]
    pub target_times: Vec<DateTime<Utc>>,
    pub target_alts: Vec<f64>,
    #[serde(deserialize_with = "de_timestamps")]
    pub moon_times: Vec<DateTime<Utc>>,
    pub moon_alts: Vec<f64>,
    #[serde(deserialize_with = "de_timestamps")]
    pub sun_times: Vec<DateTime<Utc>>,
    pub sun_alts: Vec<f64>,
    #[serde(default)]
    pub target_moonsep: Vec<f64>,
    pub color_target: Vec<ColorCode>,
    pub tonight: Tonight,
    pub target_minalt: f64,
    pub target_minmoonsep: f64,
}

impl VisibilityTrack {
    /// True when at least one sample tonight meets every criterion
    pub fn is_observable_tonight(&self) -> bool {
        self.color_target.contains(&ColorCode::Observable)
    }
}

/// Result of one visibility query that reached the backend
#[derive(Debug, Clone, PartialEq)]
pub enum VisibilityOutcome {
    Track(Box<VisibilityTrack>),
    /// The backend answered, but with an error payload
    Failed(String),
}

impl VisibilityOutcome {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if let Some(err) = value.get("error") {
            let message = err
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            return Ok(VisibilityOutcome::Failed(message));
        }
        let track: VisibilityTrack = serde_json::from_value(value)?;
        Ok(VisibilityOutcome::Track(Box::new(track)))
    }

    pub fn track(&self) -> Option<&VisibilityTrack> {
        match self {
            VisibilityOutcome::Track(t) => Some(t.as_ref()),
            VisibilityOutcome::Failed(_) => None,
        }
    }

    pub fn is_observable_tonight(&self) -> bool {
        self.track().map_or(false, VisibilityTrack::is_observable_tonight)
    }
}

/// Parameters of a single staralt request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityQuery {
    pub ra: String,
    pub dec: String,
    #[serde(default)]
    pub objname: String,
}

/// Health vocabulary for telescope subsystems, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", rename_all = "lowercase")]
pub enum StatusState {
    Operational,
    Unknown,
    Degraded,
    Maintenance,
    Offline,
    Error,
}

impl Default for StatusState {
    fn default() -> Self {
        StatusState::Unknown
    }
}

impl From<String> for StatusState {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "operational" => StatusState::Operational,
            "degraded" => StatusState::Degraded,
            // the backend has historically spelled it "maintanance"
            "maintenance" | "maintanance" => StatusState::Maintenance,
            "offline" => StatusState::Offline,
            "error" => StatusState::Error,
            _ => StatusState::Unknown,
        }
    }
}

/// A subsystem reported as `null` has not been heard from
impl From<Option<String>> for StatusState {
    fn from(s: Option<String>) -> Self {
        s.map(StatusState::from).unwrap_or_default()
    }
}

impl StatusState {
    /// Worst-first reduction of several subsystem states.
    ///
    /// An error anywhere summarises as offline; an empty set is unknown.
    pub fn summarize<I: IntoIterator<Item = StatusState>>(states: I) -> StatusState {
        match states.into_iter().max() {
            Some(StatusState::Error) => StatusState::Offline,
            Some(worst) => worst,
            None => StatusState::Unknown,
        }
    }
}

/// Health of one telescope's subsystems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRow {
    #[serde(rename = "Telescope")]
    pub telescope: String,
    #[serde(rename = "Mount", default)]
    pub mount: StatusState,
    #[serde(rename = "Focuser", default)]
    pub focuser: StatusState,
    #[serde(rename = "Filterwheel", default)]
    pub filterwheel: StatusState,
    #[serde(rename = "Camera", default)]
    pub camera: StatusState,
}

impl StatusRow {
    pub fn subsystems(&self) -> [(&'static str, StatusState); 4] {
        [
            ("Mount", self.mount),
            ("Focuser", self.focuser),
            ("Filterwheel", self.filterwheel),
            ("Camera", self.camera),
        ]
    }

    pub fn summary(&self) -> StatusState {
        StatusState::summarize(self.subsystems().iter().map(|(_, s)| *s))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestReport {
    #[serde(default)]
    pub reported_by: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload of `/api/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub table: Vec<StatusRow>,
    #[serde(default)]
    pub latest_report: LatestReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterInfo {
    #[serde(rename = "Telescope")]
    pub telescope: String,
    #[serde(rename = "Filters", default)]
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScheduleStatus {
    Observed,
    Scheduled,
    Unscheduled,
    Other(String),
}

impl Default for ScheduleStatus {
    fn default() -> Self {
        ScheduleStatus::Other(String::new())
    }
}

impl From<String> for ScheduleStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "observed" => ScheduleStatus::Observed,
            "scheduled" => ScheduleStatus::Scheduled,
            "unscheduled" => ScheduleStatus::Unscheduled,
            _ => ScheduleStatus::Other(s),
        }
    }
}

impl From<ScheduleStatus> for String {
    fn from(s: ScheduleStatus) -> Self {
        match s {
            ScheduleStatus::Observed => "observed".to_string(),
            ScheduleStatus::Scheduled => "scheduled".to_string(),
            ScheduleStatus::Unscheduled => "unscheduled".to_string(),
            ScheduleStatus::Other(s) => s,
        }
    }
}

/// One slot of the daily schedule; cells are kept loosely typed as the
/// schedule file is read column by column upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    #[serde(default)]
    pub objname: Value,
    #[serde(rename = "RA", default)]
    pub ra: Value,
    #[serde(rename = "De", default)]
    pub dec: Value,
    #[serde(default)]
    pub exptime: Value,
    #[serde(default)]
    pub count: Value,
    #[serde(default)]
    pub status: ScheduleStatus,
    #[serde(default)]
    pub obs_starttime: Value,
    #[serde(default)]
    pub obsmode: Value,
    #[serde(default)]
    pub specmode: Value,
    #[serde(default)]
    pub ntelescope: Value,
    #[serde(default)]
    pub objtype: Value,
    #[serde(default)]
    pub priority: Value,
}

/// Wavelength and broad-band coverage of a spectral-mode file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecFileCoverage {
    /// Medium-band centres in nm
    pub wavelengths: Vec<f64>,
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    #[serde(default, alias = "safe")]
    pub is_safe: Option<bool>,
    #[serde(flatten)]
    pub readings: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObsMode {
    Spec,
    Deep,
}

/// Settings that only exist for one observing mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "obsmode")]
pub enum ModeSettings {
    Spec {
        #[serde(rename = "selectedSpecFile")]
        selected_spec_file: String,
    },
    Deep {
        #[serde(rename = "selectedFilters")]
        selected_filters: Vec<String>,
        #[serde(rename = "selectedTelNumber")]
        selected_tel_number: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailedSettings {
    pub single_frame_exposure: f64,
    pub image_count: u32,
    pub priority: i64,
    pub gain: i64,
    pub binning: u8,
    /// Fixed start time as typed, empty when the scheduler decides
    pub obs_start_time: String,
    /// Search radius in arcmin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

impl Default for DetailedSettings {
    fn default() -> Self {
        Self {
            single_frame_exposure: 60.0,
            image_count: 5,
            priority: 50,
            gain: 2750,
            binning: 1,
            obs_start_time: String::new(),
            radius: None,
        }
    }
}

/// Payload posted to `/api/send_email`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRequest {
    pub requester: String,
    pub target: String,
    pub ra: String,
    pub dec: String,
    /// Total exposure in seconds
    pub exposure: f64,
    #[serde(flatten)]
    pub mode: ModeSettings,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub abort_observation: bool,
    #[serde(flatten)]
    pub details: DetailedSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordCheck {
    pub valid: bool,
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_summary_precedence() {
        use StatusState::*;
        let row = |m, f, w, c| StatusRow {
            telescope: "7DT01".into(),
            mount: m,
            focuser: f,
            filterwheel: w,
            camera: c,
        };
        assert_eq!(row(Operational, Operational, Operational, Operational).summary(), Operational);
        assert_eq!(row(Operational, Error, Operational, Operational).summary(), Offline);
        assert_eq!(row(Maintenance, Operational, Offline, Operational).summary(), Offline);
        assert_eq!(row(Degraded, Maintenance, Operational, Operational).summary(), Maintenance);
        assert_eq!(row(Degraded, Operational, Operational, Operational).summary(), Degraded);
    }

    #[test]
    fn test_status_summary_is_order_independent() {
        use StatusState::*;
        let all = [Operational, Unknown, Degraded, Maintenance, Offline, Error];
        for a in all {
            for b in all {
                let ab = StatusState::summarize([a, b]);
                let ba = StatusState::summarize([b, a]);
                assert_eq!(ab, ba);
                // the summary is never better than either input, errors aside
                let worst = a.max(b);
                if worst == Error {
                    assert_eq!(ab, Offline);
                } else {
                    assert_eq!(ab, worst);
                }
            }
        }
    }

    #[test]
    fn test_status_state_accepts_legacy_spelling() {
        let row: StatusRow = serde_json::from_value(serde_json::json!({
            "Telescope": "7DT03",
            "Mount": "maintanance",
            "Focuser": "operational",
            "Filterwheel": "???",
        }))
        .unwrap();
        assert_eq!(row.mount, StatusState::Maintenance);
        assert_eq!(row.filterwheel, StatusState::Unknown);
        assert_eq!(row.camera, StatusState::Unknown);
    }

    #[test]
    fn test_null_subsystem_is_unknown() {
        let report: StatusReport = serde_json::from_value(serde_json::json!({
            "table": [
                {"Telescope": "7DT01", "Mount": "operational", "Focuser": null},
                {"Telescope": "7DT02", "Mount": "operational", "Focuser": "operational"}
            ]
        }))
        .unwrap();
        assert_eq!(report.table.len(), 2);
        assert_eq!(report.table[0].focuser, StatusState::Unknown);
        assert_eq!(report.table[1].focuser, StatusState::Operational);
    }

    #[test]
    fn test_catalog_target_numeric_coordinates() {
        let t: Target =
            serde_json::from_value(serde_json::json!({"name": "GRB250101A", "ra": 83.82, "dec": -5.39}))
                .unwrap();
        assert_eq!(t.ra, "83.82");
        assert_eq!(t.dec, "-5.39");
    }

    #[test]
    fn test_visibility_outcome_error_payload() {
        let outcome =
            VisibilityOutcome::from_value(serde_json::json!({"error": "bad coordinates"})).unwrap();
        assert_eq!(outcome, VisibilityOutcome::Failed("bad coordinates".into()));
        assert!(!outcome.is_observable_tonight());
    }

    #[test]
    fn test_spec_mode_payload_omits_deep_fields() {
        let req = ObservationRequest {
            requester: "a@b.org".into(),
            target: "M42".into(),
            ra: "05:35:17".into(),
            dec: "-05:23:28".into(),
            exposure: 300.0,
            mode: ModeSettings::Spec {
                selected_spec_file: DEFAULT_SPEC_FILE.into(),
            },
            comments: String::new(),
            abort_observation: false,
            details: DetailedSettings::default(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["obsmode"], "Spec");
        assert_eq!(json["selectedSpecFile"], DEFAULT_SPEC_FILE);
        assert_eq!(json["singleFrameExposure"], 60.0);
        assert_eq!(json["abortObservation"], false);
        assert!(json.get("selectedFilters").is_none());
        assert!(json.get("selectedTelNumber").is_none());
        assert!(json.get("radius").is_none());
    }

    #[test]
    fn test_deep_mode_payload_omits_spec_file() {
        let json = serde_json::to_value(ModeSettings::Deep {
            selected_filters: vec!["g".into(), "r".into()],
            selected_tel_number: 10,
        })
        .unwrap();
        assert_eq!(json["obsmode"], "Deep");
        assert_eq!(json["selectedTelNumber"], 10);
        assert!(json.get("selectedSpecFile").is_none());
    }
}
