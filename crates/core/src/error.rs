/// Result alias that carries the custom [`PortfolioError`] type.
pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Common error type for the core crate.
///
/// View-state transitions never produce one of these; they only surface at
/// the edges (configuration files, raster surfaces, command line parsing).
#[derive(Debug, thiserror::Error)]
pub enum PortfolioError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A configuration or catalog document could not be decoded.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// A textual view identifier outside the known set.
    #[error("unknown view `{0}`")]
    UnknownView(String),
    /// The drawing surface could not be allocated or encoded.
    #[error("surface error: {0}")]
    Surface(String),
}

impl PortfolioError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}
