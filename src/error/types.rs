use thiserror::Error;

/// Unified result type for the grid panel crate.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Errors surfaced by panel construction, mutation and dispatch.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("slot {index} is outside the panel (size {size})")]
    OutOfRange { index: i64, size: usize },
    #[error("only 1 to 6 rows are allowed, but {0} rows were given")]
    InvalidRows(i64),
    #[error("handler failed: {0}")]
    Handler(String),
    #[error("display error: {0}")]
    Display(String),
    #[error("panel lock poisoned")]
    Poisoned,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PanelError {
    /// Convenience constructor for handler implementations.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}
