//! Daily observing schedule table
use super::{Indicator, Load};
use crate::domain::{ScheduleEntry, ScheduleStatus};
use crate::utils::{cell_or_na, cell_text, display_cell};
use serde::Serialize;

pub fn schedule_indicator(status: &ScheduleStatus) -> Indicator {
    match status {
        ScheduleStatus::Observed => Indicator { color: "green", label: "Observed" },
        ScheduleStatus::Unscheduled => Indicator { color: "red", label: "Unscheduled" },
        ScheduleStatus::Scheduled => Indicator { color: "gray", label: "Scheduled" },
        ScheduleStatus::Other(_) => Indicator { color: "gray", label: "Unknown" },
    }
}

/// Client-side show/hide switches; toggling never refetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleFilters {
    pub show_unscheduled: bool,
    pub show_observed: bool,
}

impl Default for ScheduleFilters {
    fn default() -> Self {
        Self {
            show_unscheduled: false,
            show_observed: true,
        }
    }
}

impl ScheduleFilters {
    pub fn admits(&self, status: &ScheduleStatus) -> bool {
        match status {
            ScheduleStatus::Unscheduled => self.show_unscheduled,
            ScheduleStatus::Observed => self.show_observed,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRow {
    pub objname: String,
    pub ra: String,
    pub dec: String,
    pub exptime: String,
    pub count: String,
    pub status: Indicator,
    pub start_time: String,
    pub obsmode: String,
    pub specmode: String,
    pub ntelescope: String,
    pub objtype: String,
    pub priority: String,
}

impl From<&ScheduleEntry> for ScheduleRow {
    fn from(entry: &ScheduleEntry) -> Self {
        Self {
            objname: cell_text(&entry.objname),
            ra: cell_text(&entry.ra),
            dec: cell_text(&entry.dec),
            exptime: display_cell(&entry.exptime),
            count: display_cell(&entry.count),
            status: schedule_indicator(&entry.status),
            start_time: cell_text(&entry.obs_starttime),
            obsmode: cell_or_na(&entry.obsmode),
            specmode: cell_or_na(&entry.specmode),
            ntelescope: cell_or_na(&entry.ntelescope),
            objtype: cell_or_na(&entry.objtype),
            priority: cell_text(&entry.priority),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SchedulePanel {
    Loading,
    Failed {
        message: String,
    },
    Ready {
        rows: Vec<ScheduleRow>,
        hidden: usize,
        show_unscheduled: bool,
        show_observed: bool,
    },
}

#[derive(Debug)]
pub struct ScheduleView {
    entries: Load<Vec<ScheduleEntry>>,
    filters: ScheduleFilters,
}

impl Default for ScheduleView {
    fn default() -> Self {
        Self::new(ScheduleFilters::default())
    }
}

impl ScheduleView {
    pub fn new(filters: ScheduleFilters) -> Self {
        Self {
            entries: Load::Loading,
            filters,
        }
    }

    pub fn loaded(&mut self, result: Result<Vec<ScheduleEntry>, String>) {
        self.entries = Load::from_result(result);
    }

    pub fn visible_entries(&self) -> Vec<&ScheduleEntry> {
        self.entries
            .loaded()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| self.filters.admits(&e.status))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn render(&self) -> SchedulePanel {
        match &self.entries {
            Load::Loading => SchedulePanel::Loading,
            Load::Failed(message) => SchedulePanel::Failed {
                message: message.clone(),
            },
            Load::Loaded(entries) => {
                let rows: Vec<ScheduleRow> = self
                    .visible_entries()
                    .into_iter()
                    .map(ScheduleRow::from)
                    .collect();
                SchedulePanel::Ready {
                    hidden: entries.len() - rows.len(),
                    rows,
                    show_unscheduled: self.filters.show_unscheduled,
                    show_observed: self.filters.show_observed,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries() -> Vec<ScheduleEntry> {
        serde_json::from_value(json!([
            {"objname": "NGC1566", "RA": "04:20:00", "De": "-54:56:16", "exptime": "100,100",
             "count": 3, "status": "observed", "obs_starttime": "2024-03-01 23:10:00",
             "obsmode": "Deep", "ntelescope": 10, "objtype": "Galaxy", "priority": 1},
            {"objname": "GRB240301A", "RA": 83.8, "De": -5.4, "status": "unscheduled"},
            {"objname": "T09614", "RA": "10:00:00", "De": "-30:00:00", "status": "scheduled",
             "specmode": "specall"}
        ]))
        .unwrap()
    }

    #[test]
    fn test_defaults_hide_unscheduled_only() {
        let mut view = ScheduleView::default();
        view.loaded(Ok(entries()));
        let names: Vec<String> = view
            .visible_entries()
            .iter()
            .map(|e| cell_text(&e.objname))
            .collect();
        assert_eq!(names, ["NGC1566", "T09614"]);
    }

    #[test]
    fn test_filters_apply_to_loaded_rows() {
        let mut view = ScheduleView::new(ScheduleFilters {
            show_unscheduled: true,
            show_observed: true,
        });
        view.loaded(Ok(entries()));
        assert_eq!(view.visible_entries().len(), 3);

        let mut view = ScheduleView::new(ScheduleFilters {
            show_unscheduled: true,
            show_observed: false,
        });
        view.loaded(Ok(entries()));
        assert_eq!(view.visible_entries().len(), 2);

        match view.render() {
            SchedulePanel::Ready { rows, hidden, show_observed, .. } => {
                assert_eq!(hidden, 1);
                assert!(!show_observed);
                assert_eq!(rows[0].status.color, "red");
                assert_eq!(rows[0].ra, "83.8");
                assert_eq!(rows[0].obsmode, "N/A");
            }
            other => panic!("unexpected panel {:?}", other),
        }
    }

    #[test]
    fn test_rows_collapse_repeated_cells() {
        let mut view = ScheduleView::default();
        view.loaded(Ok(entries()));
        let row = ScheduleRow::from(view.visible_entries()[0]);
        assert_eq!(row.exptime, "100");
        assert_eq!(row.count, "3");
        assert_eq!(row.status, Indicator { color: "green", label: "Observed" });
    }

    #[test]
    fn test_only_exposure_and_count_collapse() {
        let entry: ScheduleEntry = serde_json::from_value(json!({
            "objname": null, "RA": "04:20:00", "De": "-54:56:16",
            "exptime": "60,60", "count": "5,5", "status": "scheduled",
            "obsmode": "Deep,Deep", "specmode": "", "ntelescope": 0
        }))
        .unwrap();
        let row = ScheduleRow::from(&entry);
        assert_eq!(row.objname, "");
        assert_eq!(row.exptime, "60");
        assert_eq!(row.count, "5");
        assert_eq!(row.start_time, "");
        assert_eq!(row.obsmode, "Deep,Deep");
        assert_eq!(row.specmode, "N/A");
        assert_eq!(row.ntelescope, "N/A");
        assert_eq!(row.objtype, "N/A");
    }

    #[test]
    fn test_unknown_status_is_gray() {
        let status = ScheduleStatus::from("pending".to_string());
        assert_eq!(schedule_indicator(&status).color, "gray");
        assert!(ScheduleFilters::default().admits(&status));
    }
}
