//! Chart series building for the visibility plot and the spectral coverage strip.
//!
//! Everything here is a pure function of its input: the same track always yields
//! the same datasets and overlay geometry.
pub mod lifecycle;

use crate::domain::{ColorCode, SpecFileCoverage, VisibilityTrack, BROAD_BANDS};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

const NIGHT_SHADE: &str = "rgba(0,0,0,0.3)";
const CIVIL_SHADE: &str = "rgba(0,0,0,0.1)";
const LIMIT_SHADE: &str = "rgba(255,0,0,0.3)";
const ALTITUDE_CEILING: f64 = 90.0;
/// Criteria legend sits this long before night start
const LEGEND_LEAD_MINUTES: i64 = 42;
const LEGEND_ALTITUDE: f64 = 80.0;

/// Medium-band filter half width in nm
const MEDIUM_BAND_HALF_WIDTH: f64 = 12.5;
const COVERAGE_AXIS_MIN: f64 = 3500.0;
const COVERAGE_AXIS_MAX: f64 = 9500.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Milliseconds since the Unix epoch
    pub x: i64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<ChartPoint>,
    /// Per-point fill, empty when every point uses `background_color`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub point_background_color: Vec<String>,
    pub border_color: String,
    pub background_color: String,
    pub point_radius: f64,
    pub show_line: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Annotation {
    #[serde(rename_all = "camelCase")]
    Line {
        id: String,
        x_min: i64,
        x_max: i64,
        border_color: String,
        border_width: u32,
        label: String,
    },
    #[serde(rename = "box", rename_all = "camelCase")]
    Region {
        id: String,
        x_min: i64,
        x_max: i64,
        y_min: f64,
        y_max: f64,
        background_color: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Label {
        id: String,
        x_value: i64,
        y_value: f64,
        content: Vec<String>,
    },
}

#[cfg(test)]
impl Annotation {
    pub fn id(&self) -> &str {
        match self {
            Annotation::Line { id, .. } | Annotation::Region { id, .. } | Annotation::Label { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Axes {
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for Axes {
    fn default() -> Self {
        Self {
            x_title: "Time (UTC)",
            y_title: "Altitude [deg]",
            y_min: 0.0,
            y_max: ALTITUDE_CEILING,
        }
    }
}

/// Everything a chart toolkit needs to draw the visibility plot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub datasets: Vec<Dataset>,
    pub annotations: Vec<Annotation>,
    pub axes: Axes,
}

/// Display colour of one target sample
pub fn target_color(code: Option<&ColorCode>) -> String {
    match code {
        Some(ColorCode::Observable) => "green".to_string(),
        Some(ColorCode::Unobservable) => "red".to_string(),
        Some(ColorCode::Marginal) => "black".to_string(),
        Some(ColorCode::Other(raw)) => raw.clone(),
        None => "gray".to_string(),
    }
}

fn points(times: &[DateTime<Utc>], alts: &[f64]) -> Vec<ChartPoint> {
    times
        .iter()
        .zip(alts)
        .map(|(t, alt)| ChartPoint {
            x: t.timestamp_millis(),
            y: *alt,
        })
        .collect()
}

fn body_dataset(label: &str, color: &str, data: Vec<ChartPoint>) -> Dataset {
    Dataset {
        label: label.to_string(),
        data,
        point_background_color: Vec::new(),
        border_color: color.to_string(),
        background_color: color.to_string(),
        point_radius: 1.0,
        show_line: false,
    }
}

fn night_marker(id: &str, at: DateTime<Utc>, label: &str) -> Annotation {
    Annotation::Line {
        id: id.to_string(),
        x_min: at.timestamp_millis(),
        x_max: at.timestamp_millis(),
        border_color: "black".to_string(),
        border_width: 1,
        label: label.to_string(),
    }
}

fn shaded(id: &str, from: DateTime<Utc>, to: DateTime<Utc>, y_max: f64, color: &str) -> Annotation {
    Annotation::Region {
        id: id.to_string(),
        x_min: from.timestamp_millis(),
        x_max: to.timestamp_millis(),
        y_min: 0.0,
        y_max,
        background_color: color.to_string(),
        label: None,
    }
}

pub fn chart_title(objname: Option<&str>) -> String {
    match objname {
        Some(name) if !name.trim().is_empty() => format!("Altitude of {}", name),
        _ => "Altitude of the Target".to_string(),
    }
}

/// Overlay geometry derived from tonight's boundaries and the thresholds
pub fn build_annotations(track: &VisibilityTrack) -> Vec<Annotation> {
    let night = &track.tonight;
    let mut limit = shaded(
        "minAltFill",
        night.sunset_night,
        night.sunrise_night,
        track.target_minalt,
        LIMIT_SHADE,
    );
    if let Annotation::Region { label, .. } = &mut limit {
        *label = Some("Observation limit".to_string());
    }

    vec![
        night_marker("nightStartLine", night.sunset_night, "Night start"),
        night_marker("nightEndLine", night.sunrise_night, "Night end"),
        shaded("nightBox", night.sunset_night, night.sunrise_night, ALTITUDE_CEILING, NIGHT_SHADE),
        shaded("civilBox", night.sunset_civil, night.sunrise_civil, ALTITUDE_CEILING, CIVIL_SHADE),
        limit,
        Annotation::Label {
            id: "criteriaText".to_string(),
            x_value: (night.sunset_night - Duration::minutes(LEGEND_LEAD_MINUTES)).timestamp_millis(),
            y_value: LEGEND_ALTITUDE,
            content: vec![
                "Current observation criteria:".to_string(),
                format!("- Altitude > {} deg", track.target_minalt),
                format!("- Moon separation > {} deg", track.target_minmoonsep),
            ],
        },
    ]
}

/// Turn a visibility track into sun, moon and target datasets plus overlays
pub fn build_chart(track: &VisibilityTrack) -> ChartSpec {
    let sun = body_dataset("Sun", "red", points(&track.sun_times, &track.sun_alts));
    let moon = body_dataset("Moon", "blue", points(&track.moon_times, &track.moon_alts));

    let target_points = points(&track.target_times, &track.target_alts);
    let target_colors = (0..target_points.len())
        .map(|i| target_color(track.color_target.get(i)))
        .collect();
    let target = Dataset {
        label: "Target".to_string(),
        data: target_points,
        point_background_color: target_colors,
        border_color: "black".to_string(),
        background_color: "black".to_string(),
        point_radius: 2.0,
        show_line: false,
    };

    ChartSpec {
        title: chart_title(track.objname.as_deref()),
        datasets: vec![sun, moon, target],
        annotations: build_annotations(track),
        axes: Axes::default(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandSpan {
    /// Angstrom
    pub center: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadBand {
    pub name: &'static str,
    pub active: bool,
}

/// Medium-band strip and broad-band table for a spectral-mode file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageChart {
    pub axis_min: f64,
    pub axis_max: f64,
    pub spans: Vec<BandSpan>,
    pub broad_bands: Vec<BroadBand>,
}

pub fn build_coverage(coverage: &SpecFileCoverage) -> CoverageChart {
    let mut spans: Vec<BandSpan> = coverage
        .wavelengths
        .iter()
        .map(|nm| BandSpan {
            center: nm * 10.0,
            min: (nm - MEDIUM_BAND_HALF_WIDTH) * 10.0,
            max: (nm + MEDIUM_BAND_HALF_WIDTH) * 10.0,
        })
        .collect();
    spans.sort_by(|a, b| a.center.total_cmp(&b.center));

    let broad_bands = BROAD_BANDS
        .into_iter()
        .map(|name| BroadBand {
            name,
            active: coverage.filters.iter().any(|f| f == name),
        })
        .collect();

    CoverageChart {
        axis_min: COVERAGE_AXIS_MIN,
        axis_max: COVERAGE_AXIS_MAX,
        spans,
        broad_bands,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::Tonight;
    use chrono::TimeZone;

    pub(crate) fn sample_track(codes: &[&str]) -> VisibilityTrack {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let times: Vec<DateTime<Utc>> = (0..codes.len())
            .map(|i| start + Duration::minutes(5 * i as i64))
            .collect();
        VisibilityTrack {
            objname: Some("M42".to_string()),
            target_times: times.clone(),
            target_alts: (0..codes.len()).map(|i| 10.0 + i as f64).collect(),
            moon_times: times.clone(),
            moon_alts: vec![5.0; codes.len()],
            sun_times: times,
            sun_alts: vec![-20.0; codes.len()],
            target_moonsep: vec![90.0; codes.len()],
            color_target: codes.iter().map(|c| ColorCode::from(c.to_string())).collect(),
            tonight: Tonight {
                sunset_night: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
                sunrise_night: Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap(),
                sunset_civil: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
                sunrise_civil: Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap(),
            },
            target_minalt: 30.0,
            target_minmoonsep: 40.0,
        }
    }

    #[test]
    fn test_build_chart_is_deterministic() {
        let track = sample_track(&["r", "g", "k", "g"]);
        assert_eq!(build_chart(&track), build_chart(&track));
        assert_eq!(build_chart(&track.clone()), build_chart(&track));
    }

    #[test]
    fn test_target_points_take_palette_colors() {
        let track = sample_track(&["r", "g", "k", "purple"]);
        let chart = build_chart(&track);
        let labels: Vec<&str> = chart.datasets.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["Sun", "Moon", "Target"]);
        assert_eq!(
            chart.datasets[2].point_background_color,
            ["red", "green", "black", "purple"]
        );
        assert_eq!(chart.datasets[2].data[1].y, 11.0);
        assert_eq!(chart.title, "Altitude of M42");
    }

    #[test]
    fn test_missing_color_codes_fall_back_to_gray() {
        let mut track = sample_track(&["g", "g"]);
        track.color_target.truncate(1);
        let chart = build_chart(&track);
        assert_eq!(chart.datasets[2].point_background_color, ["green", "gray"]);
    }

    #[test]
    fn test_annotation_geometry() {
        let track = sample_track(&["g"]);
        let annotations = build_annotations(&track);
        let ids: Vec<&str> = annotations.iter().map(Annotation::id).collect();
        assert_eq!(
            ids,
            ["nightStartLine", "nightEndLine", "nightBox", "civilBox", "minAltFill", "criteriaText"]
        );

        let night_start = track.tonight.sunset_night.timestamp_millis();
        match &annotations[4] {
            Annotation::Region { x_min, x_max, y_min, y_max, label, .. } => {
                assert_eq!(*x_min, night_start);
                assert_eq!(*x_max, track.tonight.sunrise_night.timestamp_millis());
                assert_eq!((*y_min, *y_max), (0.0, 30.0));
                assert_eq!(label.as_deref(), Some("Observation limit"));
            }
            other => panic!("unexpected annotation {:?}", other),
        }
        match &annotations[5] {
            Annotation::Label { x_value, y_value, content, .. } => {
                assert_eq!(*x_value, night_start - 42 * 60 * 1000);
                assert_eq!(*y_value, 80.0);
                assert_eq!(content[1], "- Altitude > 30 deg");
                assert_eq!(content[2], "- Moon separation > 40 deg");
            }
            other => panic!("unexpected annotation {:?}", other),
        }
    }

    #[test]
    fn test_untitled_target() {
        assert_eq!(chart_title(None), "Altitude of the Target");
        assert_eq!(chart_title(Some("  ")), "Altitude of the Target");
    }

    #[test]
    fn test_build_coverage() {
        let coverage = SpecFileCoverage {
            wavelengths: vec![500.0, 400.0],
            filters: vec!["g".into(), "z".into()],
        };
        let chart = build_coverage(&coverage);
        assert_eq!(chart.spans[0], BandSpan { center: 4000.0, min: 3875.0, max: 4125.0 });
        assert_eq!(chart.spans[1].center, 5000.0);
        let active: Vec<&str> = chart
            .broad_bands
            .iter()
            .filter(|b| b.active)
            .map(|b| b.name)
            .collect();
        assert_eq!(active, ["g", "z"]);
    }
}
