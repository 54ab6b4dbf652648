use std::{
    env, fs,
    path::{Path, PathBuf},
    process::Command,
};

use plotters::prelude::*;
use tracing::{debug, info};

use crate::{
    config::Style,
    error::{PlotError, Result},
    render::Chart,
};

/// Environment variable naming the program used to show charts on screen
pub const VIEWER_ENV: &str = "BENCHPLOT_VIEWER";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Svg,
    Bitmap,
}

impl ImageKind {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => ImageKind::Svg,
            _ => ImageKind::Bitmap,
        }
    }
}

/// Where a finished chart goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    File(PathBuf),
    Display,
}

impl Sink {
    pub fn from_output(output: Option<PathBuf>) -> Self {
        match output {
            Some(path) => Sink::File(path),
            None => Sink::Display,
        }
    }

    pub fn emit(&self, chart: &Chart, style: &Style) -> Result<()> {
        match self {
            Sink::File(path) => {
                write_image(chart, style, path)?;
                info!("Saved {} to {}", chart.title, path.display());
                Ok(())
            }
            Sink::Display => display(chart, style),
        }
    }
}

/// Renders `chart` to `path`, picking the backend from its extension
pub fn write_image(chart: &Chart, style: &Style, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }

    let size = (style.width, style.height);
    match ImageKind::for_path(path) {
        ImageKind::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            chart.draw(&root, style)?;
            root.present()?;
        }
        ImageKind::Bitmap => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            chart.draw(&root, style)?;
            root.present()?;
        }
    }
    debug!("Wrote {:?} image {}", ImageKind::for_path(path), path.display());
    Ok(())
}

/// Renders to a temporary PNG and waits on the platform viewer
fn display(chart: &Chart, style: &Style) -> Result<()> {
    show(chart, style, viewer_command).map(|_| ())
}

/// Runs `viewer` on a temporary rendering of `chart`, removing the image once
/// the viewer returns. Gives back the path the image was written to
fn show<F>(chart: &Chart, style: &Style, viewer: F) -> Result<PathBuf>
where
    F: FnOnce(&Path) -> Command,
{
    let image = tempfile::Builder::new()
        .prefix("benchplot-")
        .suffix(".png")
        .tempfile()?;
    let path = image.path().to_path_buf();
    write_image(chart, style, &path)?;

    let mut cmd = viewer(&path);
    debug!("Opening viewer {cmd:?}");
    let status = cmd
        .status()
        .map_err(|err| PlotError::Viewer(format!("{cmd:?}: {err}")))?;
    image.close()?;
    if !status.success() {
        return Err(PlotError::Viewer(format!("{cmd:?} exited with {status}")));
    }
    info!("Displayed {}", chart.title);
    Ok(path)
}

fn viewer_command(path: &Path) -> Command {
    if let Ok(viewer) = env::var(VIEWER_ENV)
        && !viewer.trim().is_empty()
    {
        let mut parts = viewer.split_whitespace();
        let mut cmd = Command::new(parts.next().unwrap_or_default());
        cmd.args(parts).arg(path);
        return cmd;
    }

    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg("-W").arg(path);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", "/WAIT", ""]).arg(path);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        aggregate::{AggregatedSeries, Aggregation, Point, Summary, XKey},
        render::{Panel, PanelKind},
    };

    fn aggregation(keys: &[XKey], series: &[(&str, Vec<(usize, f64, f64)>)]) -> Aggregation {
        Aggregation {
            keys: keys.to_vec(),
            series: series
                .iter()
                .map(|(name, points)| AggregatedSeries {
                    name: name.to_string(),
                    points: points
                        .iter()
                        .map(|&(key, mean, std)| Point {
                            x: keys[key].clone(),
                            summary: Summary::MeanStd { mean, std },
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    fn categories() -> Vec<XKey> {
        ["put", "get", "delete"]
            .iter()
            .map(|k| XKey::Category(k.to_string()))
            .collect()
    }

    fn clients(keys: &[f64]) -> Vec<XKey> {
        keys.iter().map(|k| XKey::Numeric(*k)).collect()
    }

    fn assert_renders_svg(chart: &Chart) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figures").join("chart.svg");
        write_image(chart, &Style::default(), &path).unwrap();
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"), "{svg}");
        assert!(svg.len() > 1000);
    }

    #[test]
    fn renders_bar_chart() {
        let agg = aggregation(
            &categories(),
            &[
                ("basic", vec![(0, 182.0, 4.0), (1, 97.0, 0.0), (2, 121.0, 2.5)]),
                ("sync", vec![(0, 264.0, 10.0), (2, 203.0, 0.0)]),
            ],
        );
        let chart = Chart::single(
            "Sequential Access Go Benchmark",
            Panel::new(PanelKind::Bar, agg, "ns/op").x_label("operation"),
        );
        assert_renders_svg(&chart);
    }

    #[test]
    fn renders_line_band_chart() {
        let keys = clients(&[1.0, 2.0, 4.0, 8.0]);
        let agg = aggregation(
            &keys,
            &[
                ("sync", vec![(0, 100.0, 5.0), (1, 180.0, 20.0), (2, 260.0, 30.0), (3, 300.0, 0.0)]),
                ("shard", vec![(0, 20.0, 40.0), (1, 200.0, 10.0), (2, 390.0, 15.0), (3, 700.0, 25.0)]),
            ],
        );
        let chart = Chart::single(
            "Concurrent Map Access for Read-Heavy Workload",
            Panel::new(PanelKind::LineBand, agg, "throughput (ops/sec)")
                .x_label("number of concurrent clients"),
        );
        assert_renders_svg(&chart);
    }

    #[test]
    fn renders_sparse_line_chart() {
        let keys = clients(&[1.0, 16.0]);
        let agg = aggregation(
            &keys,
            &[
                ("sync", vec![(0, 10.0, 1.0), (1, 20.0, 2.0)]),
                ("shard", vec![(1, 5.0, 0.0)]),
            ],
        );
        let chart = Chart::single(
            "sparse",
            Panel::new(PanelKind::LineBand, agg, "throughput").x_label("clients"),
        );
        assert_renders_svg(&chart);
    }

    #[test]
    fn renders_stacked_bar_charts() {
        let keys = vec![XKey::Category("1000".into()), XKey::Category("5000".into())];
        let top = Panel::new(
            PanelKind::Bar,
            aggregation(&keys, &[("throughput", vec![(0, 2500.0, 0.0), (1, 2650.0, 0.0)])]),
            "throughput (ops/sec)",
        )
        .x_label("number of requests")
        .color("#2980b9")
        .legend(false);
        let bottom = Panel::new(
            PanelKind::Bar,
            aggregation(&keys, &[("failures", vec![(0, 1.0, 1.4), (1, 13.0, 8.5)])]),
            "failures",
        )
        .color("#e74c3c")
        .legend(false);
        assert_renders_svg(&Chart::stacked("Blast Throughput", top, bottom));
    }

    #[cfg(unix)]
    #[test]
    fn displayed_image_is_removed() {
        let agg = aggregation(&categories(), &[("basic", vec![(0, 1.0, 0.0)])]);
        let chart = Chart::single("shown", Panel::new(PanelKind::Bar, agg, "ns/op"));
        let mut seen = None;
        let path = show(&chart, &Style::default(), |path| {
            seen = Some(fs::metadata(path).map(|m| m.len()).unwrap_or_default());
            Command::new("true")
        })
        .unwrap();
        assert!(seen.unwrap_or_default() > 0);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn failing_viewer_still_removes_image() {
        let agg = aggregation(&categories(), &[("basic", vec![(0, 1.0, 0.0)])]);
        let chart = Chart::single("shown", Panel::new(PanelKind::Bar, agg, "ns/op"));
        let mut shown = PathBuf::new();
        let result = show(&chart, &Style::default(), |path| {
            shown = path.to_path_buf();
            Command::new("false")
        });
        assert!(matches!(result, Err(PlotError::Viewer(_))));
        assert!(!shown.exists());
    }

    #[test]
    fn output_path_selects_file_sink() {
        assert_eq!(Sink::from_output(None), Sink::Display);
        assert_eq!(
            Sink::from_output(Some(PathBuf::from("figures/out.png"))),
            Sink::File(PathBuf::from("figures/out.png"))
        );
    }

    #[test]
    fn image_kind_from_extension() {
        assert_eq!(ImageKind::for_path(Path::new("a.svg")), ImageKind::Svg);
        assert_eq!(ImageKind::for_path(Path::new("a.SVG")), ImageKind::Svg);
        assert_eq!(ImageKind::for_path(Path::new("a.png")), ImageKind::Bitmap);
        assert_eq!(ImageKind::for_path(Path::new("a")), ImageKind::Bitmap);
    }

    #[test]
    fn default_viewer_gets_the_image() {
        let cmd = viewer_command(Path::new("/tmp/chart.png"));
        assert!(cmd.get_args().any(|a| a == "/tmp/chart.png"));
    }
}
