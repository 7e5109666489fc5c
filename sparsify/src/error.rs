use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A feature:count pair in a sparse line is missing its `:` delimiter or
    /// carries a non-numeric feature id. The offending line is skipped;
    /// processing continues.
    #[error("malformed record: pair {pair:?} has no valid feature:count form")]
    MalformedRecord { pair: String },

    /// An expected file is not there. Recoverable for the persisted
    /// compaction map (a fresh one is created); fatal for a required input,
    /// but only to that unit of work.
    #[error("missing resource: {}", path.display())]
    AbsentResource { path: PathBuf },

    /// A persisted artifact exists but does not deserialize to the expected
    /// structure. Never recovered silently: resetting would discard prior
    /// compaction history.
    #[error("corrupt persisted state in {}: {source}", path.display())]
    CorruptState {
        path: PathBuf,
        source: bincode::Error,
    },

    #[error("{context}: {source}")]
    IoFailure {
        context: String,
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error::IoFailure {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
