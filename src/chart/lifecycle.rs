//! Chart instance lifecycle: a chart is either absent or present on its canvas.
//!
//! The drawing toolkit sits behind [`ChartSurface`]; the manager decides when an
//! instance is created, updated in place or destroyed.
use super::{build_chart, ChartSpec};
use crate::domain::VisibilityOutcome;
use serde::Serialize;
use tracing::debug;

/// The drawing toolkit a chart lives on
pub trait ChartSurface {
    type Chart;

    fn create(&mut self, spec: &ChartSpec) -> Self::Chart;
    fn update(&mut self, chart: &mut Self::Chart, spec: &ChartSpec);
    fn destroy(&mut self, chart: Self::Chart);
}

#[derive(Debug)]
pub enum ChartState<C> {
    Absent,
    Present(C),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Created,
    Updated,
    Destroyed,
    Unchanged,
}

pub struct ChartManager<S: ChartSurface> {
    surface: S,
    state: ChartState<S::Chart>,
    mounted: bool,
    /// Last good spec, kept while the canvas is hidden
    latest: Option<ChartSpec>,
}

impl<S: ChartSurface> ChartManager<S> {
    /// A manager whose canvas is not mounted yet
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            state: ChartState::Absent,
            mounted: false,
            latest: None,
        }
    }

    pub fn chart(&self) -> Option<&S::Chart> {
        match &self.state {
            ChartState::Present(chart) => Some(chart),
            ChartState::Absent => None,
        }
    }

    /// The canvas became visible
    pub fn mount(&mut self) -> Transition {
        self.mounted = true;
        self.render()
    }

    /// The canvas was hidden or its view went away
    pub fn unmount(&mut self) -> Transition {
        self.mounted = false;
        self.teardown()
    }

    /// Feed a new visibility outcome; a failed outcome removes the chart
    pub fn show(&mut self, outcome: &VisibilityOutcome) -> Transition {
        match outcome.track() {
            Some(track) => {
                self.latest = Some(build_chart(track));
                self.render()
            }
            None => self.clear(),
        }
    }

    /// Inputs became invalid: forget the data and drop the chart
    pub fn clear(&mut self) -> Transition {
        self.latest = None;
        self.teardown()
    }

    fn render(&mut self) -> Transition {
        if !self.mounted {
            return Transition::Unchanged;
        }
        let Some(spec) = &self.latest else {
            return Transition::Unchanged;
        };
        if let ChartState::Present(chart) = &mut self.state {
            self.surface.update(chart, spec);
            return Transition::Updated;
        }
        debug!("creating chart {:?}", spec.title);
        let chart = self.surface.create(spec);
        self.state = ChartState::Present(chart);
        Transition::Created
    }

    fn teardown(&mut self) -> Transition {
        match std::mem::replace(&mut self.state, ChartState::Absent) {
            ChartState::Present(chart) => {
                self.surface.destroy(chart);
                Transition::Destroyed
            }
            ChartState::Absent => Transition::Unchanged,
        }
    }
}

impl<S: ChartSurface> Drop for ChartManager<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// A chart as handed to a browser: its `ChartSpec` plus identity and revision so the
/// client can tell a fresh instance from an in-place update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedChart {
    pub instance: u64,
    pub revision: u32,
    pub spec: ChartSpec,
}

/// Surface that records charts as serialisable snapshots
#[derive(Debug, Default)]
pub struct SnapshotSurface {
    next_instance: u64,
    live: usize,
}

impl ChartSurface for SnapshotSurface {
    type Chart = RenderedChart;

    fn create(&mut self, spec: &ChartSpec) -> RenderedChart {
        self.next_instance += 1;
        self.live += 1;
        RenderedChart {
            instance: self.next_instance,
            revision: 0,
            spec: spec.clone(),
        }
    }

    fn update(&mut self, chart: &mut RenderedChart, spec: &ChartSpec) {
        chart.revision += 1;
        chart.spec = spec.clone();
    }

    fn destroy(&mut self, chart: RenderedChart) {
        self.live -= 1;
        debug!("chart {} destroyed, {} live", chart.instance, self.live);
    }
}

#[cfg(test)]
impl<S: ChartSurface> ChartManager<S> {
    pub fn is_present(&self) -> bool {
        matches!(self.state, ChartState::Present(_))
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

#[cfg(test)]
impl SnapshotSurface {
    pub fn live(&self) -> usize {
        self.live
    }
}
