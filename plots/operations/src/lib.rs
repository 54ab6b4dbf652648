use std::path::Path;

use common::{
    aggregate::{GroupBy, aggregate},
    error::Result,
    loader::load_csv,
    plot::Plot,
    render::{Chart, Panel, PanelKind},
};
use tracing::debug;

/// Which per-operation measurement to draw
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Viz {
    /// Go benchmark ns/op, `op,store,benchmark`
    #[default]
    Ops,
    /// Blast throughput, `op,store,throughput`
    Blast,
}

impl Viz {
    pub fn value_column(&self) -> &'static str {
        match self {
            Viz::Ops => "benchmark",
            Viz::Blast => "throughput",
        }
    }

    pub fn y_label(&self) -> &'static str {
        match self {
            Viz::Ops => "ns/op",
            Viz::Blast => "throughput (ops/sec)",
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            Viz::Ops => "Sequential Access Go Benchmark",
            Viz::Blast => "Blast of 5000 Concurrent Accesses: Throughput",
        }
    }

    pub fn default_data(&self) -> &'static str {
        match self {
            Viz::Ops => "fixtures/data/ops.csv",
            Viz::Blast => "fixtures/data/blast.csv",
        }
    }

    pub fn default_output(&self) -> &'static str {
        match self {
            Viz::Ops => "fixtures/figures/benchmark_operations.png",
            Viz::Blast => "fixtures/figures/benchmark_blast_throughput.png",
        }
    }
}

/// Mean of a per-operation metric, one bar per store
#[derive(Debug, Default, Clone)]
pub struct Operations {
    pub viz: Viz,
    pub title: Option<String>,
}

impl Plot for Operations {
    fn name(&self) -> &'static str {
        "operations"
    }

    fn build(&self, data_path: &Path) -> Result<Chart> {
        let value = self.viz.value_column();
        let data = load_csv(data_path)?;
        data.require_columns(&["op", "store", value])?;
        debug!("Got {} {:?} rows", data.len(), self.viz);

        let agg = aggregate(&data, &GroupBy::new("op", value).series("store"))?;
        let panel = Panel::new(PanelKind::Bar, agg, self.viz.y_label()).x_label("operation");
        let title = self.title.as_deref().unwrap_or(self.viz.default_title());
        Ok(Chart::single(title, panel))
    }
}
