use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RebalancerError {
    /// Malformed or missing input, detected before any command runs.
    #[error("{0}")]
    Validation(String),

    /// A required deployment value (RPC URL, signing key, contract address) is absent.
    #[error("{0}")]
    Configuration(String),

    /// The external command exited non-zero or could not be spawned.
    #[error("{message}")]
    Execution { message: String, details: String },

    /// The command succeeded but its output could not be interpreted.
    #[error("{message}")]
    ResponseParse { message: String, raw_output: String },
}

impl RebalancerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Diagnostic text attached to the error, if any.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Validation(_) | Self::Configuration(_) => None,
            Self::Execution { details, .. } => Some(details),
            Self::ResponseParse { raw_output, .. } => Some(raw_output),
        }
    }
}
