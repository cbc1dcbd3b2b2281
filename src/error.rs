use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while comparing or normalizing trace logs.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("cannot open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("cannot write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot replace {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("terminal error: {0}")]
    Terminal(#[source] io::Error),

    /// Only raised in strict normalization.
    #[error("line {line} is not a trace record: {content:?}")]
    Unmatched { line: usize, content: String },
}
