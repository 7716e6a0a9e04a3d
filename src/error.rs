//! Error taxonomy for the marker tool.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("input directory not found: {0}")]
    InputDirMissing(PathBuf),
    #[error("no supported images (jpg, jpeg, png) in {0}")]
    NoImages(PathBuf),
    #[error("cannot read label file {path}: {source}")]
    LabelFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("label file {0} contains no labels")]
    EmptyLabels(PathBuf),
    #[error("label {0:?} appears more than once in the label file")]
    DuplicateLabel(String),
    #[error("snapshot {path} is corrupt: {source}")]
    SnapshotCorrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("snapshot {path} was recorded in {found} mode, session is in {expected} mode")]
    SnapshotModeMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot decode or encode image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("{0} export is not implemented")]
    NotImplemented(&'static str),
}

impl MarkerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MarkerError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MarkerError>;
