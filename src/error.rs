//! Error type shared by the clustering, mapping and cable modules

use thiserror::Error;

/// Errors raised by the pre-processing core and its file readers.
///
/// Per-item outcomes such as an unmatched subject or a link without a cable
/// path are not errors; they are reported in the batch results instead.
#[derive(Debug, Error)]
pub enum NetGeoError {
    /// A call received input it cannot work with (empty point set, unknown id, bad threshold).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Nearest-neighbor mapping was asked to run against zero reference points.
    #[error("reference point set is empty")]
    EmptyReferenceSet,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A line-oriented topology or mapping file has a line that does not parse.
    #[error("malformed {kind} line {line}: {reason}")]
    Malformed {
        kind: &'static str,
        line: usize,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, NetGeoError>;
