use crate::acme::{DNS_01, HTTP_01};
use crate::error::{IssueError, IssueResult};
use crate::verify::VerifierConfig;
use std::time::Duration;

pub const DEFAULT_STAGGER: Duration = Duration::from_secs(2);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(30);

pub fn default_challenge_priority() -> Vec<String> {
    vec![HTTP_01.to_string(), DNS_01.to_string()]
}

/// Inputs of one issuance attempt
#[derive(Debug, Clone)]
pub struct IssueOptions {
    /// PKCS#10 request, PEM or DER; also submitted when finalizing
    pub csr: Vec<u8>,
    pub email: Option<String>,
    pub terms_of_service_agreed: bool,
    /// Issuer common name of the alternate chain to download, if offered
    pub preferred_chain: Option<String>,
    /// Challenge types in order of preference
    pub challenge_priority: Vec<String>,
    pub skip_challenge_verification: bool,
    /// Per-domain delay step between hook invocations
    pub stagger: Duration,
    /// Wait between provisioning and verification for records to propagate
    pub settle_delay: Duration,
    pub verifier: VerifierConfig,
}

impl IssueOptions {
    pub fn new(csr: impl Into<Vec<u8>>) -> Self {
        Self {
            csr: csr.into(),
            email: None,
            terms_of_service_agreed: false,
            preferred_chain: None,
            challenge_priority: default_challenge_priority(),
            skip_challenge_verification: false,
            stagger: DEFAULT_STAGGER,
            settle_delay: DEFAULT_SETTLE_DELAY,
            verifier: VerifierConfig::default(),
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn agree_to_terms(mut self) -> Self {
        self.terms_of_service_agreed = true;
        self
    }

    pub fn preferred_chain(mut self, chain: impl Into<String>) -> Self {
        self.preferred_chain = Some(chain.into());
        self
    }

    pub fn challenge_priority<S: Into<String>>(
        mut self,
        priority: impl IntoIterator<Item = S>,
    ) -> Self {
        self.challenge_priority = priority.into_iter().map(Into::into).collect();
        self
    }

    pub fn skip_challenge_verification(mut self, skip: bool) -> Self {
        self.skip_challenge_verification = skip;
        self
    }

    pub fn stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn validate(&self) -> IssueResult<()> {
        if self.csr.iter().all(u8::is_ascii_whitespace) {
            return Err(IssueError::Config("a CSR is required".to_string()));
        }
        if let Some(email) = &self.email {
            if email.trim().is_empty() || !email.contains('@') {
                return Err(IssueError::Config(format!("invalid contact email '{}'", email)));
            }
        }
        Ok(())
    }

    /// `mailto:` contact list for account registration
    pub(crate) fn contact(&self) -> Vec<String> {
        self.email
            .iter()
            .map(|email| format!("mailto:{}", email.trim()))
            .collect()
    }
}
