use std::path::{Path, PathBuf};

use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlotError>;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Malformed input {}: {reason}", path.display())]
    MalformedInput { path: PathBuf, reason: String },
    #[error("Results span multiple {column} values ({}), filter them to a single one", values.join(", "))]
    MultipleWorkloads { column: String, values: Vec<String> },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Render chart: {0}")]
    Render(String),
    #[error("Open viewer: {0}")]
    Viewer(String),
}

impl PlotError {
    pub fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        PlotError::MalformedInput {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl<E> From<DrawingAreaErrorKind<E>> for PlotError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        PlotError::Render(err.to_string())
    }
}
