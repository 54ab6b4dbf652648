use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use csv::{ErrorKind, ReaderBuilder, Trim};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use crate::{
    dataset::{Dataset, Record, Value},
    error::{PlotError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    JsonLines,
}

impl Format {
    /// Guess the format from the file extension, defaulting to CSV
    pub fn detect(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json" | "jsonl" | "ndjson" | "log") => Format::JsonLines,
            _ => Format::Csv,
        }
    }
}

pub fn load(path: &Path, format: Format) -> Result<Dataset> {
    match format {
        Format::Csv => load_csv(path),
        Format::JsonLines => load_json_lines(path),
    }
}

/// Reads a CSV file with a header row
pub fn load_csv(path: &Path) -> Result<Dataset> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|err| csv_error(path, err))?
        .iter()
        .map(|h| h.to_owned())
        .collect::<Vec<_>>();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(PlotError::malformed(path, "Missing header"));
    }

    let mut dataset = Dataset::new(path, headers);
    for row in reader.records() {
        let row = row.map_err(|err| csv_error(path, err))?;
        dataset.records.push(Record {
            values: row.iter().map(Value::infer).collect(),
        });
    }

    if dataset.is_empty() {
        warn!("{} has a header but no rows", path.display());
    }
    debug!(
        "Loaded {} rows with columns [{}] from {}",
        dataset.len(),
        dataset.columns.join(","),
        path.display()
    );
    Ok(dataset)
}

fn csv_error(path: &Path, err: csv::Error) -> PlotError {
    match err.into_kind() {
        ErrorKind::Io(err) => PlotError::Io(err),
        ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => PlotError::malformed(
            path,
            format!(
                "Row {} has {len} columns, expected {expected_len}",
                pos.map(|p| p.line()).unwrap_or_default()
            ),
        ),
        kind => PlotError::malformed(path, format!("{kind:?}")),
    }
}

/// Reads newline delimited JSON objects. Lines not starting with `{` are
/// treated as log noise and skipped
pub fn load_json_lines(path: &Path) -> Result<Dataset> {
    let mut objects: Vec<Map<String, JsonValue>> = Vec::new();
    let mut skipped = 0usize;
    {
        let reader = BufReader::new(File::open(path)?);
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if !line.starts_with('{') {
                skipped += 1;
                continue;
            }
            let object = serde_json::from_str::<Map<String, JsonValue>>(&line).map_err(|err| {
                PlotError::malformed(path, format!("Line {}: {err}", idx + 1))
            })?;
            objects.push(object);
        }
    }

    if objects.is_empty() {
        return Err(PlotError::malformed(path, "No JSON records"));
    }
    debug!(
        "Read {} JSON records from {}, skipped {skipped} lines",
        objects.len(),
        path.display()
    );

    let mut columns: Vec<String> = Vec::new();
    for key in objects.iter().flat_map(|o| o.keys()) {
        if !columns.contains(key) {
            columns.push(key.clone());
        }
    }

    let mut dataset = Dataset::new(path, columns);
    dataset.records = objects
        .iter()
        .map(|object| Record {
            values: dataset
                .columns
                .iter()
                .map(|c| object.get(c).map(Value::from_json).unwrap_or(Value::Null))
                .collect(),
        })
        .collect();
    Ok(dataset)
}
