use std::{
    fmt,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use tracing::debug;

use crate::error::{PlotError, Result};

/// A single cell, with numeric-ness inferred when loaded
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Value {
    /// Integer first, then float, otherwise text. Empty strings are [`Value::Null`]
    pub fn infer(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            Value::Null
        } else if let Ok(v) = raw.parse::<i64>() {
            Value::Int(v)
        } else if let Ok(v) = raw.parse::<f64>() {
            Value::Float(v)
        } else {
            Value::Text(raw.to_owned())
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Text(b.to_string()),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(s) => s.parse().ok(),
            Value::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Null => Ok(()),
        }
    }
}

/// One observation, cells aligned with [`Dataset::columns`]
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: Vec<Value>,
}

/// Rows sharing a schema, as read from a single results file
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: PathBuf,
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(source: &Path, columns: Vec<String>) -> Self {
        Self {
            source: source.to_path_buf(),
            columns,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| self.malformed(format!("Missing column {name}")))
    }

    /// Fails if any of `names` is not in the header
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        let missing = names
            .iter()
            .filter(|n| !self.columns.iter().any(|c| c == *n))
            .collect::<Vec<_>>();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(self.malformed(format!(
                "Missing columns {} (header: {})",
                missing.iter().join(", "),
                self.columns.join(",")
            )))
        }
    }

    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value>> {
        let idx = self.column_index(name)?;
        Ok(self.records.iter().map(move |r| &r.values[idx]))
    }

    /// Distinct values of a column in first-seen order
    pub fn unique(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.column(name)?.map(|v| v.to_string()).unique().collect())
    }

    /// The one value shared by every record in `name`
    pub fn single_value(&self, name: &str) -> Result<String> {
        let values = self.unique(name)?;
        match values.len() {
            0 => Err(self.malformed("No records")),
            1 => Ok(values.into_iter().next().unwrap_or_default()),
            _ => Err(PlotError::MultipleWorkloads {
                column: name.to_owned(),
                values,
            }),
        }
    }

    /// Appends a column computed from each record
    pub fn add_column<F>(&mut self, name: &str, mut derive: F) -> Result<()>
    where
        F: FnMut(&Dataset, &Record) -> Result<Value>,
    {
        let derived = self
            .records
            .iter()
            .map(|r| derive(self, r))
            .collect::<Result<Vec<_>>>()?;
        self.columns.push(name.to_owned());
        for (record, value) in self.records.iter_mut().zip(derived) {
            record.values.push(value);
        }
        debug!("Derived column {name} for {} records", self.records.len());
        Ok(())
    }

    pub fn malformed(&self, reason: impl Into<String>) -> PlotError {
        PlotError::malformed(&self.source, reason)
    }
}

/// Adds `ops = requests + failures` to every record
pub fn derive_ops(dataset: &mut Dataset) -> Result<()> {
    let requests = dataset.column_index("requests")?;
    let failures = dataset.column_index("failures")?;
    dataset.add_column("ops", |ds, record| {
        match (&record.values[requests], &record.values[failures]) {
            (Value::Int(r), Value::Int(f)) if r.checked_add(*f).is_some() => Ok(Value::Int(r + f)),
            (r, f) => match (r.as_f64(), f.as_f64()) {
                (Some(r), Some(f)) => Ok(Value::Float(r + f)),
                _ => Err(ds.malformed(format!(
                    "Non-numeric requests/failures: {r:?}, {f:?}"
                ))),
            },
        }
    })
}

/// Capitalizes the first letter of each word, `read-heavy` becomes `Read-Heavy`
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut boundary = true;
    for c in s.chars() {
        if boundary {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        boundary = !c.is_alphabetic();
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> Dataset {
        let mut ds = Dataset::new(
            Path::new("test.csv"),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        ds.records = rows
            .iter()
            .map(|row| Record {
                values: row.iter().map(|v| Value::infer(v)).collect(),
            })
            .collect();
        ds
    }

    #[test]
    fn infers_values() {
        assert_eq!(Value::infer("42"), Value::Int(42));
        assert_eq!(Value::infer(" 4.5 "), Value::Float(4.5));
        assert_eq!(Value::infer("sync"), Value::Text("sync".into()));
        assert_eq!(Value::infer(""), Value::Null);
    }

    #[test]
    fn single_workload() {
        let ds = dataset(&["workload"], &[&["read-heavy"], &["read-heavy"]]);
        assert_eq!(ds.single_value("workload").unwrap(), "read-heavy");
    }

    #[test]
    fn multiple_workloads_rejected() {
        let ds = dataset(
            &["workload"],
            &[&["read-heavy"], &["write-heavy"], &["read-heavy"]],
        );
        match ds.single_value("workload") {
            Err(PlotError::MultipleWorkloads { column, values }) => {
                assert_eq!(column, "workload");
                assert_eq!(values, vec!["read-heavy", "write-heavy"]);
            }
            other => panic!("expected MultipleWorkloads, got {other:?}"),
        }
    }

    #[test]
    fn ops_is_requests_plus_failures() {
        let mut ds = dataset(
            &["requests", "failures", "throughput"],
            &[&["100", "3", "10.5"], &["250", "0", "8"], &["7.5", "1", "1"]],
        );
        derive_ops(&mut ds).unwrap();
        let ops = ds.column_index("ops").unwrap();
        for record in &ds.records {
            let expected = record.values[0].as_f64().unwrap() + record.values[1].as_f64().unwrap();
            assert_eq!(record.values[ops].as_f64().unwrap(), expected);
        }
        assert_eq!(ds.records[0].values[ops], Value::Int(103));
    }

    #[test]
    fn missing_columns_reported() {
        let ds = dataset(&["op", "store"], &[]);
        let err = ds.require_columns(&["op", "store", "benchmark"]).unwrap_err();
        assert!(matches!(err, PlotError::MalformedInput { .. }));
        assert!(err.to_string().contains("benchmark"));
    }

    #[test]
    fn title_cases_workloads() {
        assert_eq!(title_case("read-heavy"), "Read-Heavy");
        assert_eq!(title_case("UNIFORM mix"), "Uniform Mix");
    }
}
