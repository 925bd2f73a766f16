use crate::verify::VerifyError;

/// Result type for issuance operations
pub type IssueResult<T> = Result<T, IssueError>;

/// Errors that end an issuance attempt
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid CSR: {0}")]
    Csr(String),

    /// A transport client call failed; the source is passed through untouched
    #[error("{operation} failed: {source:#}")]
    Transport {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Authorization for {domain} offers no challenges")]
    NoChallenges { domain: String },

    #[error("Failed to provision challenge record for {domain}: {source:#}")]
    Provisioning {
        domain: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Verification(#[from] VerifyError),

    #[error("Challenge for {domain} did not become valid: {source:#}")]
    ChallengeFailed {
        domain: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Issuance cancelled")]
    Cancelled,
}

impl IssueError {
    pub(crate) fn transport(operation: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| IssueError::Transport { operation, source }
    }

    /// Domain the error is attributed to, if any
    pub fn domain(&self) -> Option<&str> {
        match self {
            IssueError::NoChallenges { domain }
            | IssueError::Provisioning { domain, .. }
            | IssueError::ChallengeFailed { domain, .. } => Some(domain),
            IssueError::Verification(e) => Some(e.domain()),
            _ => None,
        }
    }
}
