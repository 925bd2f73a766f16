pub mod acme;
pub mod config;
mod error;
pub mod issuance;
pub mod metrics;
pub mod verify;

pub use config::Config;
pub use error::{IssueError, IssueResult};
pub use issuance::{issue, ChallengeHooks, IssuanceObserver, IssueOptions, Orchestrator};
pub use verify::{ChallengeVerifier, Verifier, VerifierConfig, VerifyError};
