mod hooks;
mod observer;
mod options;
mod orchestrator;
mod select;

#[cfg(test)]
pub(crate) mod testing;

pub use hooks::ChallengeHooks;
pub use observer::{IssuanceObserver, Phase, TracingObserver};
pub use options::{default_challenge_priority, IssueOptions, DEFAULT_SETTLE_DELAY, DEFAULT_STAGGER};
pub use orchestrator::{issue, Orchestrator};
pub use select::select_challenge;
