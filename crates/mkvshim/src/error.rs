use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ShimError {
    #[error("real symbol `{0}` not found via dlsym(RTLD_NEXT)")]
    SymbolNotFound(&'static str),

    #[error("failed to create endpoint {path}: {source}")]
    EndpointCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open endpoint {path} for writing: {source}")]
    EndpointOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("channel disabled")]
    ChannelDisabled,

    #[error("channel write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("short write on channel: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("message contains an interior NUL byte")]
    InteriorNul,

    #[error("signal delivery failed: {0}")]
    Signal(#[from] nix::Error),
}

pub type Result<T> = std::result::Result<T, ShimError>;
