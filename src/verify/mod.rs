//! Local pre-flight checks that a challenge response is publicly visible
//! before the ACME server is asked to validate it.

mod dns;
mod http;

pub use dns::{challenge_record_name, DnsLookup, HickoryLookup};
pub use http::http01_url;

#[cfg(test)]
pub(crate) use dns::StaticLookup;

use crate::acme::{Authorization, Challenge, DNS_01, HTTP_01};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// A challenge response could not be confirmed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{challenge_type} verification failed for {domain}: {reason}")]
pub struct VerifyError {
    pub domain: String,
    pub challenge_type: String,
    pub reason: String,
}

impl VerifyError {
    pub fn new(domain: &str, challenge_type: &str, reason: impl Into<String>) -> Self {
        Self {
            domain: domain.to_string(),
            challenge_type: challenge_type.to_string(),
            reason: reason.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// Checks that a challenge's key authorization is visible where the CA will
/// look for it. Implementations must be free of side effects so they can be
/// retried and run concurrently across domains.
#[async_trait]
pub trait ChallengeVerifier: Send + Sync {
    async fn verify(
        &self,
        authorization: &Authorization,
        challenge: &Challenge,
        key_authorization: &str,
    ) -> Result<(), VerifyError>;
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Port http-01 checks connect to
    pub http_port: u16,
    pub http_timeout: Duration,
    /// Nameservers for dns-01 checks (empty = host resolver configuration)
    pub nameservers: Vec<IpAddr>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            http_port: 80,
            http_timeout: Duration::from_secs(30),
            nameservers: Vec::new(),
        }
    }
}

/// http-01 / dns-01 verifier
pub struct Verifier<L = HickoryLookup> {
    http_client: reqwest::Client,
    http_port: u16,
    dns: L,
}

impl Verifier<HickoryLookup> {
    pub fn new(config: &VerifierConfig) -> anyhow::Result<Self> {
        let dns = HickoryLookup::new(&config.nameservers);
        Self::with_lookup(config, dns)
    }
}

impl<L: DnsLookup> Verifier<L> {
    /// Build a verifier that resolves through the given lookup
    pub fn with_lookup(config: &VerifierConfig, dns: L) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            http_client,
            http_port: config.http_port,
            dns,
        })
    }
}

#[async_trait]
impl<L: DnsLookup> ChallengeVerifier for Verifier<L> {
    async fn verify(
        &self,
        authorization: &Authorization,
        challenge: &Challenge,
        key_authorization: &str,
    ) -> Result<(), VerifyError> {
        let domain = authorization.domain();

        match challenge.challenge_type.as_str() {
            HTTP_01 => {
                self.verify_http01(domain, &challenge.token, key_authorization)
                    .await
            }
            DNS_01 => self.verify_dns01(domain, key_authorization).await,
            other => Err(VerifyError::new(
                domain,
                other,
                "challenge type cannot be verified locally",
            )),
        }
    }
}
