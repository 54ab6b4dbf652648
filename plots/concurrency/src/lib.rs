use std::path::Path;

use common::{
    aggregate::{GroupBy, Reducer, XOrder, aggregate},
    dataset::title_case,
    error::Result,
    loader::load_csv,
    plot::Plot,
    render::{Chart, Panel, PanelKind},
};
use tracing::debug;

pub const DEFAULT_DATA: &str = "fixtures/data/results.csv";
const COLUMNS: &[&str] = &["concurrency", "store", "throughput", "workload"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Bar,
    Line,
}

/// Store throughput against the number of concurrent clients, for a results
/// file holding a single workload
#[derive(Debug, Default, Clone)]
pub struct ConcurrencyResults {
    pub title: Option<String>,
    pub mode: Mode,
}

impl Plot for ConcurrencyResults {
    fn name(&self) -> &'static str {
        "concurrency"
    }

    fn build(&self, data_path: &Path) -> Result<Chart> {
        let data = load_csv(data_path)?;
        data.require_columns(COLUMNS)?;
        let workload = data.single_value("workload")?;
        debug!("Plotting {} rows of workload {workload}", data.len());

        let group = GroupBy::new("concurrency", "throughput")
            .series("store")
            .reducer(Reducer::MeanStd);
        let (kind, group) = match self.mode {
            Mode::Bar => (PanelKind::Bar, group),
            Mode::Line => (PanelKind::LineBand, group.order(XOrder::Numeric)),
        };
        let panel = Panel::new(kind, aggregate(&data, &group)?, "throughput (ops/sec)")
            .x_label("number of concurrent clients");

        let title = match &self.title {
            Some(title) => title.clone(),
            None => format!("Concurrent Map Access for {} Workload", title_case(&workload)),
        };
        Ok(Chart::single(&title, panel))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use common::{aggregate::XKey, error::PlotError};
    use pretty_assertions::assert_eq;

    use super::*;

    fn fixture(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const RESULTS: &str = "concurrency,store,throughput,workload\n\
        4,sync,300,read-heavy\n\
        1,sync,100,read-heavy\n\
        1,shard,150,read-heavy\n\
        4,shard,500,read-heavy\n\
        1,sync,120,read-heavy\n";

    #[test]
    fn bar_mode_titles_workload() {
        let file = fixture(RESULTS);
        let chart = ConcurrencyResults::default().build(file.path()).unwrap();
        assert_eq!(chart.title, "Concurrent Map Access for Read-Heavy Workload");

        let panel = &chart.panels[0];
        assert_eq!(panel.kind, PanelKind::Bar);
        assert_eq!(panel.x_label.as_deref(), Some("number of concurrent clients"));
        assert_eq!(
            panel.aggregation.keys,
            vec![XKey::Category("4".into()), XKey::Category("1".into())]
        );
        let names = panel
            .aggregation
            .series
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["sync", "shard"]);
    }

    #[test]
    fn line_mode_sorts_concurrency() {
        let file = fixture(RESULTS);
        let plot = ConcurrencyResults {
            title: Some("custom".into()),
            mode: Mode::Line,
        };
        let chart = plot.build(file.path()).unwrap();
        assert_eq!(chart.title, "custom");

        let panel = &chart.panels[0];
        assert_eq!(panel.kind, PanelKind::LineBand);
        assert_eq!(panel.aggregation.keys, vec![XKey::Numeric(1.0), XKey::Numeric(4.0)]);
        let sync = &panel.aggregation.series[0];
        assert_eq!(sync.points[0].summary.center(), 110.0);
        assert_eq!(sync.points[1].summary.std(), Some(0.0));
    }

    #[test]
    fn multiple_workloads_rejected() {
        let file = fixture(
            "concurrency,store,throughput,workload\n1,sync,100,read-heavy\n1,sync,90,write-heavy\n",
        );
        match ConcurrencyResults::default().build(file.path()) {
            Err(PlotError::MultipleWorkloads { values, .. }) => {
                assert_eq!(values, vec!["read-heavy", "write-heavy"])
            }
            other => panic!("expected MultipleWorkloads, got {other:?}"),
        }
    }

    #[test]
    fn wrong_header_rejected() {
        let file = fixture("clients,store,throughput\n1,sync,100\n");
        assert!(matches!(
            ConcurrencyResults::default().build(file.path()),
            Err(PlotError::MalformedInput { .. })
        ));
    }
}
