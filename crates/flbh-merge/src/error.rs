//! Error types for metadata merging and the merge pipeline.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use flbh_replay::FormatError;
use zip::result::ZipError;

/// Errors from [`merge_metadata`](crate::metadata::merge_metadata).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataError {
    /// The base metadata is not a JSON object.
    NotAnObject {
        /// JSON type that was found instead.
        found: &'static str,
    },
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject { found } => {
                write!(f, "metadata must be a JSON object, found {found}")
            }
        }
    }
}

impl std::error::Error for MetadataError {}

/// Errors that abort a merge run.
///
/// Every variant is fatal. Recoverable problems (a damaged event record)
/// are reported as warnings in the [`MergeReport`](crate::merge::MergeReport)
/// instead.
#[derive(Debug)]
pub enum MergeError {
    /// Reading or writing a file failed.
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The zip layer rejected an archive.
    Archive {
        /// Archive involved.
        path: PathBuf,
        /// Underlying error.
        source: ZipError,
    },
    /// A source archive has no `metadata.json`.
    MissingMetadata {
        /// Archive involved.
        path: PathBuf,
    },
    /// `metadata.json` is not valid JSON.
    InvalidMetadata {
        /// Archive involved.
        path: PathBuf,
        /// Parser message.
        detail: String,
    },
    /// The base archive has no replay container entry.
    MissingContainer {
        /// Archive involved.
        path: PathBuf,
    },
    /// A container header could not be decoded.
    Format {
        /// Archive involved.
        path: PathBuf,
        /// Entry within the archive.
        entry: String,
        /// Decode error.
        source: FormatError,
    },
    /// Metadata could not be merged.
    Metadata(MetadataError),
    /// Merged metadata could not be serialized.
    Json(serde_json::Error),
}

impl MergeError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn archive(path: &Path, source: ZipError) -> Self {
        match source {
            ZipError::Io(source) => Self::io(path, source),
            source => Self::Archive {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, .. } => write!(f, "I/O error on {}", path.display()),
            Self::Archive { path, .. } => write!(f, "cannot read archive {}", path.display()),
            Self::MissingMetadata { path } => {
                write!(f, "{} has no metadata.json", path.display())
            }
            Self::InvalidMetadata { path, detail } => {
                write!(f, "invalid metadata.json in {}: {detail}", path.display())
            }
            Self::MissingContainer { path } => {
                write!(f, "{} has no replay container entry", path.display())
            }
            Self::Format { path, entry, .. } => {
                write!(f, "malformed container '{entry}' in {}", path.display())
            }
            Self::Metadata(e) => write!(f, "cannot merge metadata: {e}"),
            Self::Json(e) => write!(f, "cannot serialize merged metadata: {e}"),
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Archive { source, .. } => Some(source),
            Self::Format { source, .. } => Some(source),
            Self::Metadata(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MetadataError> for MergeError {
    fn from(e: MetadataError) -> Self {
        Self::Metadata(e)
    }
}

impl From<serde_json::Error> for MergeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
