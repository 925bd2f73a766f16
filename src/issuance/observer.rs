use crate::metrics::Metrics;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stages of an issuance attempt, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Account,
    Order,
    Selection,
    Provisioning,
    Settle,
    Verification,
    Cleanup,
    Finalization,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Account => "account",
            Phase::Order => "order",
            Phase::Selection => "selection",
            Phase::Provisioning => "provisioning",
            Phase::Settle => "settle",
            Phase::Verification => "verification",
            Phase::Cleanup => "cleanup",
            Phase::Finalization => "finalization",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle notifications emitted while an issuance attempt runs.
/// Every method defaults to doing nothing.
pub trait IssuanceObserver: Send + Sync {
    fn phase_started(&self, _phase: Phase) {}

    fn phase_finished(&self, _phase: Phase, _success: bool, _elapsed: Duration) {}

    fn challenge_selected(&self, _domain: &str, _challenge_type: &str) {}

    fn record_provisioned(&self, _domain: &str, _error: Option<&anyhow::Error>) {}

    fn challenge_valid(&self, _domain: &str) {}

    fn cleanup_failed(&self, _domain: &str, _error: &anyhow::Error) {}
}

impl<O: IssuanceObserver + ?Sized> IssuanceObserver for Arc<O> {
    fn phase_started(&self, phase: Phase) {
        (**self).phase_started(phase)
    }

    fn phase_finished(&self, phase: Phase, success: bool, elapsed: Duration) {
        (**self).phase_finished(phase, success, elapsed)
    }

    fn challenge_selected(&self, domain: &str, challenge_type: &str) {
        (**self).challenge_selected(domain, challenge_type)
    }

    fn record_provisioned(&self, domain: &str, error: Option<&anyhow::Error>) {
        (**self).record_provisioned(domain, error)
    }

    fn challenge_valid(&self, domain: &str) {
        (**self).challenge_valid(domain)
    }

    fn cleanup_failed(&self, domain: &str, error: &anyhow::Error) {
        (**self).cleanup_failed(domain, error)
    }
}

/// Observer that logs through `tracing` and records metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl IssuanceObserver for TracingObserver {
    fn phase_started(&self, phase: Phase) {
        debug!(phase = %phase, "Issuance phase started");
    }

    fn phase_finished(&self, phase: Phase, success: bool, elapsed: Duration) {
        if success {
            debug!(phase = %phase, elapsed_ms = elapsed.as_millis() as u64, "Issuance phase finished");
        } else {
            warn!(phase = %phase, elapsed_ms = elapsed.as_millis() as u64, "Issuance phase failed");
        }
        Metrics::record_phase(phase.as_str(), success, elapsed);
    }

    fn challenge_selected(&self, domain: &str, challenge_type: &str) {
        info!(domain = %domain, challenge = %challenge_type, "Selected challenge");
        Metrics::record_challenge_selected(challenge_type);
    }

    fn record_provisioned(&self, domain: &str, error: Option<&anyhow::Error>) {
        match error {
            None => info!(domain = %domain, "Challenge record created"),
            Some(e) => warn!(domain = %domain, error = %format!("{:#}", e), "Failed to create challenge record"),
        }
        Metrics::record_provisioning(error.is_none());
    }

    fn challenge_valid(&self, domain: &str) {
        info!(domain = %domain, "Challenge valid");
        Metrics::record_challenge_valid();
    }

    fn cleanup_failed(&self, domain: &str, error: &anyhow::Error) {
        warn!(domain = %domain, error = %format!("{:#}", error), "Failed to remove challenge record");
        Metrics::record_cleanup_failure();
    }
}
