use thiserror::Error;

/// Unified error type for mod-release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Expression error: {0}")]
    Expression(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Version control error: {0}")]
    Vcs(String),

    #[error("Channel '{channel}' failed: {message}")]
    Channel { channel: String, message: String },

    #[error("Step '{step}' failed: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<ReleaseError>,
    },
}

/// Convenience type alias for Results in mod-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ReleaseError::Version(msg.into())
    }

    /// Create a parse error with context
    pub fn parse(msg: impl Into<String>) -> Self {
        ReleaseError::Parse(msg.into())
    }

    /// Create an expression evaluation error with context
    pub fn expression(msg: impl Into<String>) -> Self {
        ReleaseError::Expression(msg.into())
    }

    /// Create a render error with context
    pub fn render(msg: impl Into<String>) -> Self {
        ReleaseError::Render(msg.into())
    }

    /// Create a version control error with context
    pub fn vcs(msg: impl Into<String>) -> Self {
        ReleaseError::Vcs(msg.into())
    }

    /// Create a distribution channel error
    pub fn channel(channel: impl Into<String>, msg: impl Into<String>) -> Self {
        ReleaseError::Channel {
            channel: channel.into(),
            message: msg.into(),
        }
    }

    /// Wrap an error with the name of the pipeline step that produced it
    pub fn step(step: impl Into<String>, source: ReleaseError) -> Self {
        ReleaseError::Step {
            step: step.into(),
            source: Box::new(source),
        }
    }

    /// Name of the failing step, if this error came out of the pipeline
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            ReleaseError::Step { step, .. } => Some(step),
            _ => None,
        }
    }
}
