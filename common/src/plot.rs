use core::fmt::Debug;
use std::path::Path;

use tracing::debug;

use crate::{config::Style, error::Result, render::Chart, sink::Sink};

pub trait Plot: Debug {
    /// Name of the plot, for identification
    fn name(&self) -> &'static str;
    /// Loads the results file and turns it into a chart
    ///
    /// Arguments:
    /// * `data_path` - The benchmark results, CSV or JSON lines depending on the plot
    fn build(&self, data_path: &Path) -> Result<Chart>;
}

/// Runs a plot end to end, from results file to `sink`
pub fn plot(plot: &dyn Plot, data_path: &Path, sink: &Sink, style: &Style) -> Result<()> {
    debug!("Building {} from {}", plot.name(), data_path.display());
    let chart = plot.build(data_path)?;
    sink.emit(&chart, style)
}
