use plotters::{coord::Shift, prelude::*};
use tracing::debug;

use crate::{
    aggregate::{AggregatedSeries, Aggregation, XKey},
    config::{Style, parse_color},
    error::{PlotError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    /// Clustered bars, one color per series
    Bar,
    /// Mean line per series with a shaded `mean ± std` band
    LineBand,
}

/// One set of axes within a [`Chart`]
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub kind: PanelKind,
    pub aggregation: Aggregation,
    pub x_label: Option<String>,
    pub y_label: String,
    /// Overrides the palette for the first series
    pub color: Option<String>,
    pub legend: bool,
}

impl Panel {
    pub fn new(kind: PanelKind, aggregation: Aggregation, y_label: &str) -> Self {
        Self {
            kind,
            aggregation,
            x_label: None,
            y_label: y_label.to_owned(),
            color: None,
            legend: true,
        }
    }

    pub fn x_label(mut self, label: &str) -> Self {
        self.x_label = Some(label.to_owned());
        self
    }

    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(color.to_owned());
        self
    }

    pub fn legend(mut self, legend: bool) -> Self {
        self.legend = legend;
        self
    }

    fn series_color(&self, style: &Style, idx: usize) -> Result<RGBColor> {
        match (&self.color, idx) {
            (Some(color), 0) => parse_color(color).map_err(|e| PlotError::Render(format!("{e:#}"))),
            _ => Ok(style.color(idx)),
        }
    }

    fn draw<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>, style: &Style) -> Result<()> {
        match self.kind {
            PanelKind::Bar => self.draw_bars(area, style),
            PanelKind::LineBand => self.draw_lines(area, style),
        }
    }

    fn draw_bars<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        style: &Style,
    ) -> Result<()> {
        let agg = &self.aggregation;
        let labels = agg.keys.iter().map(ToString::to_string).collect::<Vec<_>>();
        let (y_lo, y_hi) = padded_range(bar_value_range(agg), 0.05);
        let x_range = -0.5..labels.len().max(1) as f64 - 0.5;

        let mut chart = ChartBuilder::on(area)
            .margin(style.margin)
            .x_label_area_size(if self.x_label.is_some() { 50 } else { 30 })
            .y_label_area_size(80)
            .build_cartesian_2d(x_range, y_lo..y_hi)?;

        let formatter = |x: &f64| category_label(&labels, *x);
        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .x_labels(labels.len().max(1))
            .x_label_formatter(&formatter)
            .y_desc(self.y_label.as_str())
            .label_style(font(style, style.tick_font_size))
            .axis_desc_style(font(style, style.label_font_size));
        if let Some(x_label) = &self.x_label {
            mesh.x_desc(x_label.as_str());
        }
        if !style.grid {
            mesh.disable_y_mesh();
        }
        mesh.draw()?;

        let n_series = agg.series.len();
        for (idx, series) in agg.series.iter().enumerate() {
            let color = self.series_color(style, idx)?;
            let rects = bar_rects(&agg.keys, series, idx, n_series, style.bar_group_width);

            let anno = chart.draw_series(
                rects
                    .iter()
                    .map(|r| Rectangle::new([(r.x0, 0.0), (r.x1, r.value)], color.filled())),
            )?;
            if self.legend {
                anno.label(series.name.as_str()).legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
                });
            }

            chart.draw_series(rects.iter().filter_map(|r| {
                let std = r.std?;
                let center = (r.x0 + r.x1) / 2.0;
                Some(ErrorBar::new_vertical(
                    center,
                    r.value - std,
                    r.value,
                    r.value + std,
                    BLACK.stroke_width(1),
                    6,
                ))
            }))?;
        }

        if self.legend && n_series > 0 {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .label_font(font(style, style.tick_font_size))
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        Ok(())
    }

    fn draw_lines<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        style: &Style,
    ) -> Result<()> {
        let agg = &self.aggregation;
        let (x_lo, x_hi) = match agg.key_range() {
            Some((lo, hi)) if lo < hi => (lo, hi),
            Some((lo, _)) => (lo - 0.5, lo + 0.5),
            None => (0.0, 1.0),
        };
        let bands = agg
            .series
            .iter()
            .map(|s| band(s, style.clip_band_at_zero))
            .collect::<Vec<_>>();
        let y_range = bands
            .iter()
            .flatten()
            .flat_map(|p| [p.lower, p.upper])
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            });
        let (y_lo, y_hi) = padded_range(y_range, 0.05);

        let mut chart = ChartBuilder::on(area)
            .margin(style.margin)
            .x_label_area_size(if self.x_label.is_some() { 50 } else { 30 })
            .y_label_area_size(80)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

        let formatter = |x: &f64| {
            if x.fract() == 0.0 {
                format!("{x:.0}")
            } else {
                format!("{x:.1}")
            }
        };
        let mut mesh = chart.configure_mesh();
        mesh.x_labels(contiguous_ticks(x_lo, x_hi))
            .x_label_formatter(&formatter)
            .y_desc(self.y_label.as_str())
            .label_style(font(style, style.tick_font_size))
            .axis_desc_style(font(style, style.label_font_size));
        if let Some(x_label) = &self.x_label {
            mesh.x_desc(x_label.as_str());
        }
        if !style.grid {
            mesh.disable_mesh();
        }
        mesh.draw()?;

        for (idx, (series, band)) in agg.series.iter().zip(&bands).enumerate() {
            let color = self.series_color(style, idx)?;
            if band.iter().any(|p| p.upper > p.lower) {
                let outline = band
                    .iter()
                    .map(|p| (p.x, p.upper))
                    .chain(band.iter().rev().map(|p| (p.x, p.lower)))
                    .collect::<Vec<_>>();
                chart.draw_series(std::iter::once(Polygon::new(
                    outline,
                    color.mix(style.band_alpha).filled(),
                )))?;
            }

            let anno = chart.draw_series(LineSeries::new(
                band.iter().map(|p| (p.x, p.mean)),
                color.stroke_width(2),
            ))?;
            if self.legend {
                anno.label(series.name.as_str()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            }
            chart.draw_series(
                band.iter()
                    .map(|p| Circle::new((p.x, p.mean), 3, color.filled())),
            )?;
        }

        if self.legend && !agg.series.is_empty() {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .label_font(font(style, style.tick_font_size))
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        Ok(())
    }
}

/// A titled figure made of one or more vertically stacked panels
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub panels: Vec<Panel>,
}

impl Chart {
    pub fn single(title: &str, panel: Panel) -> Self {
        Self {
            title: title.to_owned(),
            panels: vec![panel],
        }
    }

    /// Stacks `bottom` under `top`, the pair sharing one x axis label
    pub fn stacked(title: &str, top: Panel, bottom: Panel) -> Self {
        let x_label = top.x_label.clone().or_else(|| bottom.x_label.clone());
        let top = Panel {
            x_label: None,
            ..top
        };
        let bottom = Panel { x_label, ..bottom };
        Self {
            title: title.to_owned(),
            panels: vec![top, bottom],
        }
    }

    pub fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>, style: &Style) -> Result<()> {
        root.fill(&WHITE)?;
        let root = root.titled(&self.title, font(style, style.title_font_size))?;
        let areas = root.split_evenly((self.panels.len().max(1), 1));
        for (panel, area) in self.panels.iter().zip(areas.iter()) {
            panel.draw(area, style)?;
        }
        debug!("Drew {} panels for {}", self.panels.len(), self.title);
        Ok(())
    }
}

fn font(style: &Style, size: u32) -> FontDesc<'_> {
    FontDesc::new(
        FontFamily::from(style.font_family.as_str()),
        size as f64,
        FontStyle::Normal,
    )
}

/// Horizontal extent of one bar, in category slot coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct BarRect {
    pub x0: f64,
    pub x1: f64,
    pub value: f64,
    pub std: Option<f64>,
}

/// Dodges the bars of series `idx` of `n_series` within each category slot.
/// Slot `i` is centered on `i`, the cluster spans `group_width` of it
pub fn bar_rects(
    keys: &[XKey],
    series: &AggregatedSeries,
    idx: usize,
    n_series: usize,
    group_width: f64,
) -> Vec<BarRect> {
    let width = group_width / n_series.max(1) as f64;
    let offset = -group_width / 2.0 + width * idx as f64;
    series
        .points
        .iter()
        .filter_map(|p| {
            let slot = keys.iter().position(|k| k == &p.x)? as f64;
            Some(BarRect {
                x0: slot + offset,
                x1: slot + offset + width,
                value: p.summary.center(),
                std: p.summary.std(),
            })
        })
        .collect()
}

/// Label of the category slot centered on `x`, blank between slots
fn category_label(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() > 1e-6 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// Bars always include zero
fn bar_value_range(agg: &Aggregation) -> Option<(f64, f64)> {
    agg.value_range().map(|(lo, hi)| (lo.min(0.0), hi.max(0.0)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandPoint {
    pub x: f64,
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

/// `mean ± std` over the observed points of a series. X values without a
/// group stay absent, nothing is interpolated
pub fn band(series: &AggregatedSeries, clip_at_zero: bool) -> Vec<BandPoint> {
    series
        .points
        .iter()
        .filter_map(|p| {
            let x = p.x.as_f64()?;
            let (mut lower, upper) = p.summary.extent();
            if clip_at_zero {
                lower = lower.max(0.0);
            }
            Some(BandPoint {
                x,
                mean: p.summary.center(),
                lower,
                upper,
            })
        })
        .collect()
}

/// Tick count covering every integer in `[lo, hi]`, capped to stay legible
fn contiguous_ticks(lo: f64, hi: f64) -> usize {
    ((hi.floor() - lo.ceil()) as usize + 1).clamp(2, 20)
}

fn padded_range(range: Option<(f64, f64)>, pad: f64) -> (f64, f64) {
    match range {
        Some((lo, hi)) if hi > lo => {
            let span = hi - lo;
            (
                if lo == 0.0 { 0.0 } else { lo - span * pad },
                if hi == 0.0 { 0.0 } else { hi + span * pad },
            )
        }
        Some((v, _)) if v != 0.0 => (v.min(0.0), v.max(0.0) + v.abs() * pad),
        _ => (0.0, 1.0),
    }
}
