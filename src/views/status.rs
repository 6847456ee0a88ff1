//! Telescope status board
use super::{Indicator, Load};
use crate::domain::{FilterInfo, LatestReport, StatusReport, StatusState};
use serde::Serialize;

/// Telescopes per row of the compact summary grid
const SUMMARY_ROW_WIDTH: usize = 10;

pub fn status_indicator(state: StatusState) -> Indicator {
    match state {
        StatusState::Operational => Indicator { color: "green", label: "Operational" },
        StatusState::Degraded => Indicator { color: "orange", label: "Degraded" },
        StatusState::Maintenance => Indicator { color: "yellow", label: "Maintenance" },
        StatusState::Offline => Indicator { color: "red", label: "Offline" },
        StatusState::Error => Indicator { color: "red", label: "Error" },
        StatusState::Unknown => Indicator { color: "gray", label: "Unknown" },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelescopeStatus {
    pub telescope: String,
    pub subsystems: [(&'static str, StatusState); 4],
    pub summary: StatusState,
    pub filters: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusBoard {
    pub telescopes: Vec<TelescopeStatus>,
    pub latest_report: LatestReport,
}

impl StatusBoard {
    /// Join the status table with each telescope's installed filters
    pub fn merge(report: StatusReport, filters: &[FilterInfo]) -> Self {
        let telescopes = report
            .table
            .iter()
            .map(|row| TelescopeStatus {
                telescope: row.telescope.clone(),
                subsystems: row.subsystems(),
                summary: row.summary(),
                filters: filters
                    .iter()
                    .find(|f| f.telescope == row.telescope)
                    .map(|f| f.filters.join(", "))
                    .unwrap_or_else(|| "No filters available".to_string()),
            })
            .collect();
        Self {
            telescopes,
            latest_report: report.latest_report,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCell {
    pub telescope: String,
    pub indicator: Indicator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsystemCell {
    pub name: &'static str,
    pub indicator: Indicator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub telescope: String,
    pub subsystems: Vec<SubsystemCell>,
    pub filters: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailTable {
    pub rows: Vec<DetailRow>,
    pub footer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum StatusPanel {
    Loading,
    Failed {
        message: String,
    },
    Ready {
        summary: Vec<Vec<SummaryCell>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<DetailTable>,
    },
}

#[derive(Debug)]
pub struct StatusView {
    board: Load<StatusBoard>,
    details_expanded: bool,
}

impl Default for StatusView {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusView {
    pub fn new() -> Self {
        Self {
            board: Load::Loading,
            details_expanded: false,
        }
    }

    pub fn loaded(&mut self, result: Result<(StatusReport, Vec<FilterInfo>), String>) {
        self.board = Load::from_result(result.map(|(report, filters)| StatusBoard::merge(report, &filters)));
    }

    pub fn set_details_expanded(&mut self, expanded: bool) {
        self.details_expanded = expanded;
    }

    pub fn render(&self) -> StatusPanel {
        let board = match &self.board {
            Load::Loading => return StatusPanel::Loading,
            Load::Failed(message) => {
                return StatusPanel::Failed {
                    message: message.clone(),
                }
            }
            Load::Loaded(board) => board,
        };

        let summary = board
            .telescopes
            .chunks(SUMMARY_ROW_WIDTH)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|t| SummaryCell {
                        telescope: t.telescope.clone(),
                        indicator: status_indicator(t.summary),
                    })
                    .collect()
            })
            .collect();

        let details = self.details_expanded.then(|| DetailTable {
            rows: board
                .telescopes
                .iter()
                .map(|t| DetailRow {
                    telescope: t.telescope.clone(),
                    subsystems: t
                        .subsystems
                        .iter()
                        .map(|&(name, state)| SubsystemCell {
                            name,
                            indicator: status_indicator(state),
                        })
                        .collect(),
                    filters: t.filters.clone(),
                })
                .collect(),
            footer: format!(
                "Reported by {} on {}",
                board.latest_report.reported_by.as_deref().unwrap_or("unknown"),
                board.latest_report.timestamp.as_deref().unwrap_or("unknown"),
            ),
        });

        StatusPanel::Ready { summary, details }
    }
}
