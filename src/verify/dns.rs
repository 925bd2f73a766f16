use super::{Verifier, VerifyError};
use crate::acme::DNS_01;
use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{Resolver, TokioResolver};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Name of the TXT record a dns-01 challenge is published under
pub fn challenge_record_name(domain: &str) -> String {
    let domain = domain.trim_start_matches("*.");
    format!("_acme-challenge.{}", domain)
}

/// DNS queries used by dns-01 verification
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// CNAME target of `name`, `None` when the name has no CNAME
    async fn cname(&self, name: &str) -> anyhow::Result<Option<String>>;

    /// TXT values at `name`, multi-segment answers joined; empty when none exist
    async fn txt(&self, name: &str) -> anyhow::Result<Vec<String>>;
}

/// hickory-resolver backed lookups with caching disabled
pub struct HickoryLookup {
    resolver: TokioResolver,
}

impl HickoryLookup {
    /// Resolver using `nameservers`, or the host's resolver configuration
    /// when the list is empty. An unreadable host configuration falls back
    /// to hickory's default upstream servers.
    pub fn new(nameservers: &[IpAddr]) -> Self {
        let mut builder = match explicit_config(nameservers) {
            Some(config) => {
                Resolver::builder_with_config(config, TokioConnectionProvider::default())
            }
            None => Resolver::builder_tokio().unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read system resolver configuration, using defaults");
                Resolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
            }),
        };

        let opts = builder.options_mut();
        opts.timeout = Duration::from_secs(5);
        opts.attempts = 3;
        // Stale answers would hide freshly published records
        opts.cache_size = 0;

        Self {
            resolver: builder.build(),
        }
    }
}

fn explicit_config(nameservers: &[IpAddr]) -> Option<ResolverConfig> {
    if nameservers.is_empty() {
        return None;
    }

    let mut config = ResolverConfig::new();
    for ip in nameservers {
        config.add_name_server(NameServerConfig::new(SocketAddr::new(*ip, 53), Protocol::Udp));
    }
    Some(config)
}

/// NXDOMAIN and empty answers are expected while records propagate
fn is_missing_record(err: &impl std::fmt::Display) -> bool {
    let err_str = err.to_string().to_lowercase();
    err_str.contains("no records found")
        || err_str.contains("nxdomain")
        || err_str.contains("record not found")
}

#[async_trait]
impl DnsLookup for HickoryLookup {
    async fn cname(&self, name: &str) -> anyhow::Result<Option<String>> {
        match self.resolver.lookup(name, RecordType::CNAME).await {
            Ok(lookup) => Ok(lookup.iter().find_map(|rdata| match rdata {
                RData::CNAME(target) => Some(target.0.to_utf8()),
                _ => None,
            })),
            Err(e) if is_missing_record(&e) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("CNAME lookup failed for '{}': {}", name, e)),
        }
    }

    async fn txt(&self, name: &str) -> anyhow::Result<Vec<String>> {
        match self.resolver.txt_lookup(name).await {
            Ok(records) => Ok(records
                .iter()
                .map(|record| {
                    record
                        .txt_data()
                        .iter()
                        .map(|data| String::from_utf8_lossy(data))
                        .collect::<String>()
                })
                .collect()),
            Err(e) if is_missing_record(&e) => Ok(Vec::new()),
            Err(e) => Err(anyhow::anyhow!("TXT lookup failed for '{}': {}", name, e)),
        }
    }
}

impl<L: DnsLookup> Verifier<L> {
    /// Confirm `key_authorization` is among the TXT values published for
    /// `domain`, following a CNAME on the challenge name when present
    pub async fn verify_dns01(
        &self,
        domain: &str,
        key_authorization: &str,
    ) -> Result<(), VerifyError> {
        let record_name = challenge_record_name(domain);

        let lookup_name = match self.dns.cname(&record_name).await {
            Ok(Some(target)) => {
                debug!(record = %record_name, target = %target, "Following CNAME for dns-01 challenge");
                target
            }
            Ok(None) => record_name.clone(),
            Err(e) => {
                warn!(record = %record_name, error = %e, "CNAME lookup failed, assuming no CNAME");
                record_name.clone()
            }
        };

        let values = self
            .dns
            .txt(&lookup_name)
            .await
            .map_err(|e| VerifyError::new(domain, DNS_01, e.to_string()))?;

        trace!(record = %lookup_name, values = ?values, "Resolved TXT records");

        if values.iter().any(|value| value == key_authorization) {
            debug!(domain = %domain, record = %lookup_name, "dns-01 record verified");
            Ok(())
        } else if values.is_empty() {
            Err(VerifyError::new(
                domain,
                DNS_01,
                format!("no TXT records found at {}", lookup_name),
            ))
        } else {
            Err(VerifyError::new(
                domain,
                DNS_01,
                format!("key authorization not found in TXT records at {}", lookup_name),
            ))
        }
    }
}

/// In-memory lookup that records every name it was asked about
#[cfg(test)]
#[derive(Default)]
pub(crate) struct StaticLookup {
    cnames: std::collections::HashMap<String, String>,
    txt: std::collections::HashMap<String, Vec<String>>,
    queried: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl StaticLookup {
    pub fn with_cname(mut self, name: &str, target: &str) -> Self {
        self.cnames.insert(name.to_string(), target.to_string());
        self
    }

    pub fn with_txt(mut self, name: &str, values: &[&str]) -> Self {
        self.txt
            .insert(name.to_string(), values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl DnsLookup for StaticLookup {
    async fn cname(&self, name: &str) -> anyhow::Result<Option<String>> {
        self.queried.lock().unwrap().push(format!("CNAME {}", name));
        Ok(self.cnames.get(name).cloned())
    }

    async fn txt(&self, name: &str) -> anyhow::Result<Vec<String>> {
        self.queried.lock().unwrap().push(format!("TXT {}", name));
        Ok(self.txt.get(name).cloned().unwrap_or_default())
    }
}
