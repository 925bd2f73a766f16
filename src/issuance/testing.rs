//! Fakes shared by the orchestrator tests. Every fake writes into one
//! [`EventLog`] so tests can assert on the interleaving of calls.

use super::hooks::ChallengeHooks;
use super::observer::{IssuanceObserver, Phase};
use crate::acme::{
    Account, AcmeTransport, Authorization, Challenge, Identifier, NewAccount, NewOrder, Order,
    DNS_01, HTTP_01,
};
use crate::verify::{ChallengeVerifier, VerifyError};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const CERTIFICATE_PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn first(&self, prefix: &str) -> Option<usize> {
        self.events().iter().position(|e| e.starts_with(prefix))
    }

    pub fn last(&self, prefix: &str) -> Option<usize> {
        self.events().iter().rposition(|e| e.starts_with(prefix))
    }
}

/// PEM CSR with the given subject common name and DNS SANs
pub fn csr_pem(common_name: Option<&str>, alt_names: &[&str]) -> Vec<u8> {
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

    let mut params =
        CertificateParams::new(alt_names.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .unwrap();
    params.distinguished_name = DistinguishedName::new();
    if let Some(cn) = common_name {
        params.distinguished_name.push(DnType::CommonName, cn);
    }
    let key = KeyPair::generate().unwrap();
    params
        .serialize_request(&key)
        .unwrap()
        .pem()
        .unwrap()
        .into_bytes()
}

/// Pending authorization offering the given challenge types. Tokens equal
/// the domain so log lines name the domain.
pub fn authorization(domain: &str, types: &[&str]) -> Authorization {
    Authorization {
        url: format!("https://ca.test/authz/{}", domain),
        identifier: Identifier::dns(domain),
        status: "pending".to_string(),
        challenges: types
            .iter()
            .map(|t| Challenge {
                challenge_type: t.to_string(),
                url: format!("https://ca.test/chall/{}/{}", domain, t),
                token: domain.to_string(),
                status: "pending".to_string(),
            })
            .collect(),
        wildcard: false,
    }
}

pub struct FakeTransport {
    log: EventLog,
    registered: bool,
    failing_account: bool,
    authorizations: Option<Vec<Authorization>>,
    invalid: HashSet<String>,
}

impl FakeTransport {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            registered: false,
            failing_account: false,
            authorizations: None,
            invalid: HashSet::new(),
        }
    }

    pub fn registered(mut self) -> Self {
        self.registered = true;
        self
    }

    pub fn failing_account(mut self) -> Self {
        self.failing_account = true;
        self
    }

    /// Serve these authorizations instead of deriving them from the order
    pub fn with_authorizations(mut self, authorizations: Vec<Authorization>) -> Self {
        self.authorizations = Some(authorizations);
        self
    }

    /// Make the server report the domain's challenge invalid
    pub fn failing_challenge(mut self, domain: &str) -> Self {
        self.invalid.insert(domain.to_string());
        self
    }
}

#[async_trait]
impl AcmeTransport for FakeTransport {
    async fn account_url(&self) -> Result<String> {
        self.log.push("account_url");
        if self.registered {
            Ok("https://ca.test/acct/1".to_string())
        } else {
            anyhow::bail!("account does not exist")
        }
    }

    async fn create_account(&self, request: &NewAccount) -> Result<Account> {
        self.log.push(format!(
            "create_account tos={} contact={}",
            request.terms_of_service_agreed,
            request.contact.join(",")
        ));
        if self.failing_account {
            anyhow::bail!("urn:ietf:params:acme:error:invalidContact");
        }
        Ok(Account {
            url: Some("https://ca.test/acct/1".to_string()),
            status: "valid".to_string(),
            contact: request.contact.clone(),
        })
    }

    async fn create_order(&self, request: &NewOrder) -> Result<Order> {
        let domains: Vec<&str> = request
            .identifiers
            .iter()
            .map(|i| i.value.as_str())
            .collect();
        self.log.push(format!("create_order {}", domains.join(",")));

        Ok(Order {
            url: "https://ca.test/order/1".to_string(),
            status: "pending".to_string(),
            expires: None,
            identifiers: request.identifiers.clone(),
            authorizations: domains
                .iter()
                .map(|d| format!("https://ca.test/authz/{}", d))
                .collect(),
            finalize: "https://ca.test/order/1/finalize".to_string(),
            certificate: None,
        })
    }

    async fn authorizations(&self, order: &Order) -> Result<Vec<Authorization>> {
        self.log.push("authorizations");
        Ok(self.authorizations.clone().unwrap_or_else(|| {
            order
                .identifiers
                .iter()
                .map(|i| authorization(&i.value, &[HTTP_01, DNS_01]))
                .collect()
        }))
    }

    async fn challenge_key_authorization(&self, challenge: &Challenge) -> Result<String> {
        Ok(format!("{}.thumbprint", challenge.token))
    }

    async fn verify_challenge(
        &self,
        authorization: &Authorization,
        _challenge: &Challenge,
    ) -> Result<()> {
        self.log.push(format!("precheck {}", authorization.domain()));
        Ok(())
    }

    async fn complete_challenge(&self, challenge: &Challenge) -> Result<()> {
        self.log.push(format!("complete {}", challenge.token));
        Ok(())
    }

    async fn wait_for_valid_status(&self, challenge: &Challenge) -> Result<()> {
        self.log.push(format!("wait {}", challenge.token));
        if self.invalid.contains(&challenge.token) {
            anyhow::bail!("challenge is invalid: urn:ietf:params:acme:error:unauthorized");
        }
        Ok(())
    }

    async fn finalize_order(&self, order: &Order, _csr: &[u8]) -> Result<Order> {
        self.log.push("finalize");
        let mut order = order.clone();
        order.status = "valid".to_string();
        order.certificate = Some("https://ca.test/cert/1".to_string());
        Ok(order)
    }

    async fn certificate(&self, _order: &Order, preferred_chain: Option<&str>) -> Result<String> {
        self.log
            .push(format!("certificate {}", preferred_chain.unwrap_or("default")));
        Ok(CERTIFICATE_PEM.to_string())
    }
}

pub struct RecordingHooks {
    log: EventLog,
    failing_create: HashSet<String>,
    failing_remove: HashSet<String>,
    cancel_after: Option<(String, CancellationToken)>,
    clock: Instant,
    created_at: Mutex<Vec<(String, Duration)>>,
}

impl RecordingHooks {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            failing_create: HashSet::new(),
            failing_remove: HashSet::new(),
            cancel_after: None,
            clock: Instant::now(),
            created_at: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_create(mut self, domain: &str) -> Self {
        self.failing_create.insert(domain.to_string());
        self
    }

    pub fn failing_remove(mut self, domain: &str) -> Self {
        self.failing_remove.insert(domain.to_string());
        self
    }

    /// Fire `cancel` once the record for `domain` has been created
    pub fn cancel_after_create(mut self, domain: &str, cancel: CancellationToken) -> Self {
        self.cancel_after = Some((domain.to_string(), cancel));
        self
    }

    /// When each create_record call started, relative to construction
    pub fn created_at(&self) -> Vec<(String, Duration)> {
        self.created_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChallengeHooks for RecordingHooks {
    type Record = String;

    async fn create_record(
        &self,
        authorization: &Authorization,
        challenge: &Challenge,
        key_authorization: &str,
    ) -> Result<String> {
        let domain = authorization.domain();
        self.created_at
            .lock()
            .unwrap()
            .push((domain.to_string(), self.clock.elapsed()));
        self.log.push(format!(
            "create {} {} {}",
            domain, challenge.challenge_type, key_authorization
        ));

        if self.failing_create.contains(domain) {
            anyhow::bail!("provider rejected record for {}", domain);
        }
        if let Some((cancel_domain, cancel)) = &self.cancel_after {
            if cancel_domain == domain {
                cancel.cancel();
            }
        }
        Ok(format!("record-{}", domain))
    }

    async fn remove_record(
        &self,
        authorization: &Authorization,
        _challenge: &Challenge,
        _key_authorization: &str,
        record: String,
    ) -> Result<()> {
        let domain = authorization.domain();
        self.log.push(format!("remove {} {}", domain, record));

        if self.failing_remove.contains(domain) {
            anyhow::bail!("provider failed to delete {}", record);
        }
        Ok(())
    }
}

pub struct StubVerifier {
    log: EventLog,
    failing: HashSet<String>,
}

impl StubVerifier {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, domain: &str) -> Self {
        self.failing.insert(domain.to_string());
        self
    }
}

#[async_trait]
impl ChallengeVerifier for StubVerifier {
    async fn verify(
        &self,
        authorization: &Authorization,
        challenge: &Challenge,
        _key_authorization: &str,
    ) -> Result<(), VerifyError> {
        let domain = authorization.domain();
        self.log
            .push(format!("verify {} {}", domain, challenge.challenge_type));

        if self.failing.contains(domain) {
            return Err(VerifyError::new(
                domain,
                &challenge.challenge_type,
                "key authorization not visible",
            ));
        }
        Ok(())
    }
}

pub struct RecordingObserver {
    log: EventLog,
}

impl RecordingObserver {
    pub fn new(log: &EventLog) -> Self {
        Self { log: log.clone() }
    }
}

impl IssuanceObserver for RecordingObserver {
    fn phase_started(&self, phase: Phase) {
        self.log.push(format!("started {}", phase));
    }

    fn phase_finished(&self, phase: Phase, success: bool, _elapsed: Duration) {
        let outcome = if success { "ok" } else { "failed" };
        self.log.push(format!("finished {} {}", phase, outcome));
    }

    fn challenge_selected(&self, domain: &str, challenge_type: &str) {
        self.log.push(format!("selected {} {}", domain, challenge_type));
    }

    fn challenge_valid(&self, domain: &str) {
        self.log.push(format!("valid {}", domain));
    }

    fn cleanup_failed(&self, domain: &str, _error: &anyhow::Error) {
        self.log.push(format!("cleanup_failed {}", domain));
    }
}
