use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Register metric descriptions with the installed recorder
pub fn init_metrics() {
    describe_counter!(
        "acme_phase_total",
        "Issuance phases completed, labelled by phase and outcome"
    );
    describe_histogram!(
        "acme_phase_duration_seconds",
        "Time spent in each issuance phase"
    );
    describe_counter!(
        "acme_challenges_selected_total",
        "Challenges selected, labelled by challenge type"
    );
    describe_counter!(
        "acme_challenge_records_total",
        "Challenge record provisioning attempts, labelled by outcome"
    );
    describe_counter!(
        "acme_challenges_valid_total",
        "Challenges the ACME server reported valid"
    );
    describe_counter!(
        "acme_cleanup_failures_total",
        "Challenge record removals that failed"
    );
}

pub struct Metrics;

impl Metrics {
    /// Record the end of an issuance phase
    #[inline]
    pub fn record_phase(phase: &str, success: bool, duration: Duration) {
        let labels = [
            ("phase", phase.to_string()),
            ("outcome", outcome(success).to_string()),
        ];

        counter!("acme_phase_total", &labels).increment(1);
        histogram!("acme_phase_duration_seconds", &labels).record(duration.as_secs_f64());
    }

    #[inline]
    pub fn record_challenge_selected(challenge_type: &str) {
        let labels = [("type", challenge_type.to_string())];
        counter!("acme_challenges_selected_total", &labels).increment(1);
    }

    #[inline]
    pub fn record_provisioning(success: bool) {
        let labels = [("outcome", outcome(success).to_string())];
        counter!("acme_challenge_records_total", &labels).increment(1);
    }

    #[inline]
    pub fn record_challenge_valid() {
        counter!("acme_challenges_valid_total").increment(1);
    }

    #[inline]
    pub fn record_cleanup_failure() {
        counter!("acme_cleanup_failures_total").increment(1);
    }
}

fn outcome(success: bool) -> &'static str {
    if success { "success" } else { "failure" }
}
