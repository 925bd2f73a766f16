use super::Duration;
use crate::issuance::{default_challenge_priority, DEFAULT_SETTLE_DELAY, DEFAULT_STAGGER};
use serde::Deserialize;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the PEM or DER certificate signing request
    pub csr: PathBuf,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub terms_of_service_agreed: bool,

    #[serde(default)]
    pub preferred_chain: Option<String>,

    #[serde(default = "default_challenge_priority")]
    pub challenge_priority: Vec<String>,

    #[serde(default)]
    pub skip_challenge_verification: bool,

    #[serde(default = "default_stagger")]
    pub stagger: Duration,

    #[serde(default = "default_settle_delay")]
    pub settle_delay: Duration,

    #[serde(default)]
    pub verifier: VerifierSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifierSettings {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default = "default_http_timeout")]
    pub http_timeout: Duration,

    /// Resolvers for dns-01 checks; empty uses the host resolver configuration
    #[serde(default)]
    pub nameservers: Vec<IpAddr>,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            http_timeout: default_http_timeout(),
            nameservers: Vec::new(),
        }
    }
}

fn default_stagger() -> Duration {
    DEFAULT_STAGGER.into()
}

fn default_settle_delay() -> Duration {
    DEFAULT_SETTLE_DELAY.into()
}

fn default_http_port() -> u16 {
    80
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}
