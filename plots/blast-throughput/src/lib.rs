use std::path::Path;

use common::{
    aggregate::{GroupBy, Reducer, aggregate},
    dataset::derive_ops,
    error::Result,
    loader::load_json_lines,
    plot::Plot,
    render::{Chart, Panel, PanelKind},
};
use tracing::debug;

pub const DEFAULT_TITLE: &str = "Blast Throughput: Sync Map, Macbook Pro Local";
const THROUGHPUT_COLOR: &str = "#2980b9";
const FAILURES_COLOR: &str = "#e74c3c";

/// p95 throughput of blast runs by number of requests, read from the JSON
/// lines the blast harness prints
#[derive(Debug, Default, Clone)]
pub struct BlastThroughput {
    pub title: Option<String>,
    /// Adds a failures panel under the throughput one
    pub failures: bool,
}

impl Plot for BlastThroughput {
    fn name(&self) -> &'static str {
        "blast-throughput"
    }

    fn build(&self, data_path: &Path) -> Result<Chart> {
        let mut data = load_json_lines(data_path)?;
        data.require_columns(&["requests", "failures", "throughput"])?;
        derive_ops(&mut data)?;
        debug!("Got {} blast records", data.len());

        let throughput = aggregate(
            &data,
            &GroupBy::new("ops", "throughput").reducer(Reducer::P95),
        )?;
        let keys = throughput.keys.clone();
        let top = Panel::new(PanelKind::Bar, throughput, "throughput (ops/sec)")
            .x_label("number of requests")
            .color(THROUGHPUT_COLOR)
            .legend(false);
        let title = self.title.as_deref().unwrap_or(DEFAULT_TITLE);

        if !self.failures {
            return Ok(Chart::single(title, top));
        }

        // Both panels share the x axis, so failures only count where a
        // throughput bar exists
        let mut failures = aggregate(
            &data,
            &GroupBy::new("ops", "failures").reducer(Reducer::MeanStd),
        )?;
        for series in &mut failures.series {
            series.points.retain(|p| keys.contains(&p.x));
        }
        failures.keys = keys;
        let bottom = Panel::new(PanelKind::Bar, failures, "failures")
            .color(FAILURES_COLOR)
            .legend(false);
        Ok(Chart::stacked(title, top, bottom))
    }
}
