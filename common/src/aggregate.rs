use std::{cmp::Ordering, collections::HashMap, fmt};

use itertools::Itertools;
use tracing::debug;

use crate::{
    dataset::{Dataset, Value},
    error::Result,
};

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1). A single observation has no spread
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PercentileMethod {
    /// Interpolates between the closest ranks, `rank / 100 * (n - 1)`
    #[default]
    Linear,
    /// Smallest value with at least `rank` percent of the data at or below it
    NearestRank,
}

pub fn percentile(values: &[f64], rank: f64, method: PercentileMethod) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let sorted = values
        .iter()
        .copied()
        .sorted_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .collect::<Vec<_>>();
    let rank = rank.clamp(0.0, 100.0);
    match method {
        PercentileMethod::Linear => {
            let pos = rank / 100.0 * (sorted.len() - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = pos.ceil() as usize;
            sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
        }
        PercentileMethod::NearestRank => {
            let idx = (rank / 100.0 * sorted.len() as f64).ceil() as usize;
            sorted[idx.saturating_sub(1)]
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum Reducer {
    #[default]
    Mean,
    Percentile {
        rank: f64,
        method: PercentileMethod,
    },
    MeanStd,
}

impl Reducer {
    pub const P95: Reducer = Reducer::Percentile {
        rank: 95.0,
        method: PercentileMethod::Linear,
    };

    pub fn reduce(&self, values: &[f64]) -> Summary {
        match *self {
            Reducer::Mean => Summary::Value(mean(values)),
            Reducer::Percentile { rank, method } => Summary::Value(percentile(values, rank, method)),
            Reducer::MeanStd => Summary::MeanStd {
                mean: mean(values),
                std: sample_std(values),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Summary {
    Value(f64),
    MeanStd { mean: f64, std: f64 },
}

impl Summary {
    pub fn center(&self) -> f64 {
        match *self {
            Summary::Value(v) => v,
            Summary::MeanStd { mean, .. } => mean,
        }
    }

    pub fn std(&self) -> Option<f64> {
        match *self {
            Summary::Value(_) => None,
            Summary::MeanStd { std, .. } => Some(std),
        }
    }

    /// `(low, high)` extent, `center ± std` when a deviation is known
    pub fn extent(&self) -> (f64, f64) {
        let c = self.center();
        let s = self.std().unwrap_or(0.0);
        (c - s, c + s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum XKey {
    Category(String),
    Numeric(f64),
}

impl XKey {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            XKey::Numeric(v) => Some(*v),
            XKey::Category(_) => None,
        }
    }
}

impl fmt::Display for XKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XKey::Category(s) => f.write_str(s),
            XKey::Numeric(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum XOrder {
    /// Categories in the order they first appear in the data
    #[default]
    FirstSeen,
    /// Numeric keys sorted increasing
    Numeric,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: XKey,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSeries {
    pub name: String,
    pub points: Vec<Point>,
}

impl AggregatedSeries {
    pub fn get(&self, x: &XKey) -> Option<&Summary> {
        self.points.iter().find(|p| &p.x == x).map(|p| &p.summary)
    }
}

/// Reduced values for every series, with the x keys all series share
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub keys: Vec<XKey>,
    pub series: Vec<AggregatedSeries>,
}

impl Aggregation {
    /// `(low, high)` over every summary extent
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.series
            .iter()
            .flat_map(|s| s.points.iter())
            .map(|p| p.summary.extent())
            .filter(|(lo, hi)| lo.is_finite() && hi.is_finite())
            .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)))
    }

    /// `(min, max)` of numeric keys
    pub fn key_range(&self) -> Option<(f64, f64)> {
        self.keys
            .iter()
            .filter_map(XKey::as_f64)
            .minmax()
            .into_option()
    }
}

#[derive(Debug, Clone)]
pub struct GroupBy {
    pub x: Vec<String>,
    pub y: String,
    pub series: Option<String>,
    pub reducer: Reducer,
    pub order: XOrder,
}

impl GroupBy {
    pub fn new(x: &str, y: &str) -> Self {
        Self {
            x: vec![x.to_owned()],
            y: y.to_owned(),
            series: None,
            reducer: Reducer::default(),
            order: XOrder::default(),
        }
    }

    pub fn with_keys(mut self, x: &[&str]) -> Self {
        self.x = x.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn series(mut self, column: &str) -> Self {
        self.series = Some(column.to_owned());
        self
    }

    pub fn reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn order(mut self, order: XOrder) -> Self {
        self.order = order;
        self
    }
}

/// Groups `dataset` by x key and series, reducing the y column of each group
pub fn aggregate(dataset: &Dataset, group: &GroupBy) -> Result<Aggregation> {
    if group.x.is_empty() {
        return Err(dataset.malformed("No grouping column"));
    }
    let x_idx = group
        .x
        .iter()
        .map(|c| dataset.column_index(c))
        .collect::<Result<Vec<_>>>()?;
    let y_idx = dataset.column_index(&group.y)?;
    let series_idx = group
        .series
        .as_deref()
        .map(|c| dataset.column_index(c))
        .transpose()?;

    let mut key_labels: Vec<String> = Vec::new();
    let mut series_names: Vec<String> = Vec::new();
    let mut groups: HashMap<(String, String), Vec<f64>> = HashMap::new();

    for record in &dataset.records {
        let y = match &record.values[y_idx] {
            Value::Null => continue,
            v => v.as_f64().ok_or_else(|| {
                dataset.malformed(format!("Non-numeric {} value {v}", group.y))
            })?,
        };
        let key = x_idx.iter().map(|i| record.values[*i].to_string()).join(" / ");
        let series = match series_idx {
            Some(i) => record.values[i].to_string(),
            None => group.y.clone(),
        };
        if !key_labels.contains(&key) {
            key_labels.push(key.clone());
        }
        if !series_names.contains(&series) {
            series_names.push(series.clone());
        }
        groups.entry((series, key)).or_default().push(y);
    }

    let keys = match group.order {
        XOrder::FirstSeen => key_labels
            .iter()
            .map(|k| (k.clone(), XKey::Category(k.clone())))
            .collect::<Vec<_>>(),
        XOrder::Numeric => {
            let mut keys = key_labels
                .iter()
                .map(|k| {
                    k.parse::<f64>()
                        .map(|v| (k.clone(), XKey::Numeric(v)))
                        .map_err(|_| dataset.malformed(format!("Non-numeric x value {k}")))
                })
                .collect::<Result<Vec<_>>>()?;
            keys.sort_by(|(_, a), (_, b)| {
                a.as_f64()
                    .partial_cmp(&b.as_f64())
                    .unwrap_or(Ordering::Equal)
            });
            keys
        }
    };

    let series = series_names
        .into_iter()
        .map(|name| {
            let points = keys
                .iter()
                .filter_map(|(label, x)| {
                    groups.get(&(name.clone(), label.clone())).map(|values| Point {
                        x: x.clone(),
                        summary: group.reducer.reduce(values),
                    })
                })
                .collect();
            AggregatedSeries { name, points }
        })
        .collect::<Vec<_>>();

    debug!(
        "Aggregated {} by {} into {} series over {} keys",
        group.y,
        group.x.join(","),
        series.len(),
        keys.len()
    );
    Ok(Aggregation {
        keys: keys.into_iter().map(|(_, x)| x).collect(),
        series,
    })
}
