pub mod duration;
mod types;

pub use duration::Duration;
pub use types::*;

use crate::acme::SUPPORTED_CHALLENGE_TYPES;
use crate::issuance::IssueOptions;
use crate::verify::VerifierConfig;
use anyhow::{Context, Result};
use std::path::Path;

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::from_yaml(&content)?;

        // A relative CSR path is taken relative to the config file
        match path.parent() {
            Some(dir) if config.csr.is_relative() => Ok(Config {
                csr: dir.join(&config.csr),
                ..config
            }),
            _ => Ok(config),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config =
            serde_yml::from_str(content).with_context(|| "Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.csr.as_os_str().is_empty() {
            anyhow::bail!("'csr' must point to a certificate signing request");
        }

        if self.challenge_priority.is_empty() {
            anyhow::bail!("'challenge_priority' must list at least one challenge type");
        }

        if !self.skip_challenge_verification {
            for challenge_type in &self.challenge_priority {
                if !SUPPORTED_CHALLENGE_TYPES.contains(&challenge_type.as_str()) {
                    anyhow::bail!(
                        "Challenge type '{}' cannot be verified locally; supported types are {:?} \
                         (or set skip_challenge_verification)",
                        challenge_type,
                        SUPPORTED_CHALLENGE_TYPES
                    );
                }
            }
        }

        if let Some(email) = &self.email {
            if !email.contains('@') {
                anyhow::bail!("Invalid contact email '{}'", email);
            }
        }

        if self.verifier.http_port == 0 {
            anyhow::bail!("'verifier.http_port' must not be 0");
        }

        Ok(())
    }

    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            http_port: self.verifier.http_port,
            http_timeout: self.verifier.http_timeout.as_std(),
            nameservers: self.verifier.nameservers.clone(),
        }
    }

    /// Read the CSR and build the options for one issuance attempt
    pub fn issue_options(&self) -> Result<IssueOptions> {
        let csr = std::fs::read(&self.csr)
            .with_context(|| format!("Failed to read CSR: {:?}", self.csr))?;

        let mut options = IssueOptions::new(csr)
            .challenge_priority(self.challenge_priority.iter().cloned())
            .skip_challenge_verification(self.skip_challenge_verification)
            .stagger(self.stagger.as_std())
            .settle_delay(self.settle_delay.as_std());

        options.email = self.email.clone();
        options.terms_of_service_agreed = self.terms_of_service_agreed;
        options.preferred_chain = self.preferred_chain.clone();
        options.verifier = self.verifier_config();

        Ok(options)
    }
}
