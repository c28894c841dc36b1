use std::io;
use std::path::PathBuf;

use thiserror::Error;

use rankflow_collection::utils::ReadError;

use crate::driver::Stage;

/// A problem with a single input line.  Line errors travel through the collection
/// as values, so they are cheap to clone.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    #[error("malformed edge {line:?}: expected `<source> <neighbor>`")]
    Malformed { line: String },

    #[error(transparent)]
    Read(#[from] ReadError),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: io::Error,
    },

    #[error(transparent)]
    Line(#[from] LineError),

    #[error("scheduler did not produce a result ({stage})")]
    Incomplete { stage: Stage },
}

pub type Result<T> = std::result::Result<T, Error>;
