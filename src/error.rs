use thiserror::Error;

/// Failures surfaced by the setup pipeline and the status inspector
#[derive(Debug, Error)]
pub enum DeployError {
    /// A configuration field could not be given a valid value
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("could not connect to {host}: {reason}")]
    Connection { host: String, reason: String },

    /// A stage precondition or post-check failed
    #[error("{reason}")]
    StageFailed { reason: String },

    /// A remote command exited non-zero and the caller did not allow it
    #[error("command exited with status {status}: {command}")]
    CommandFailed {
        command: String,
        description: Option<String>,
        status: i32,
        output: String,
    },

    #[error("cancelled by user")]
    Cancelled,

    /// A status probe could not run to completion
    #[error("{probe} check could not complete: {reason}")]
    Probe { probe: &'static str, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DeployError {
    pub fn stage(reason: impl Into<String>) -> Self {
        DeployError::StageFailed {
            reason: reason.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DeployError::Cancelled)
    }
}

pub type DeployResult<T> = std::result::Result<T, DeployError>;
