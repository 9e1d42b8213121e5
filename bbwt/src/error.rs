use thiserror::Error;

/// Errors produced while building, writing or loading an index.
///
/// Queries on a loaded index never fail. Positions past the end of the index saturate
/// instead (see the individual query methods).
#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing one of the index files failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The index files do not contain a structure this crate wrote.
    #[error("invalid index file: {0}")]
    InvalidFormat(String),

    /// A [`BuildConfig`](crate::config::BuildConfig) or layout parameter is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A run of length zero was appended to a builder.
    #[error("run length must be positive")]
    EmptyRun,

    /// A symbol the builder's alphabet cannot represent was appended.
    #[error("symbol {0:#04x} is not part of the alphabet")]
    UnknownSymbol(u8),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
