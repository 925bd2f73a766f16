use super::types::{Account, Authorization, Challenge, NewAccount, NewOrder, Order};
use anyhow::Result;
use async_trait::async_trait;

/// Authenticated ACME client the orchestrator drives.
///
/// Implementations own directory discovery, JWS signing, nonces and any
/// retry/backoff policy. Every method is a suspension point; none of them
/// is retried by the orchestrator.
#[async_trait]
pub trait AcmeTransport: Send + Sync {
    /// URL of the registered account. Errors when no account is registered yet.
    async fn account_url(&self) -> Result<String>;

    async fn create_account(&self, request: &NewAccount) -> Result<Account>;

    async fn create_order(&self, request: &NewOrder) -> Result<Order>;

    /// Fetch every authorization of an order. Ordering is server-defined.
    async fn authorizations(&self, order: &Order) -> Result<Vec<Authorization>>;

    /// Value to publish for a challenge (key authorization for http-01,
    /// its base64url SHA-256 digest for dns-01)
    async fn challenge_key_authorization(&self, challenge: &Challenge) -> Result<String>;

    /// Optional server-side pre-check run after local verification succeeds
    async fn verify_challenge(
        &self,
        _authorization: &Authorization,
        _challenge: &Challenge,
    ) -> Result<()> {
        Ok(())
    }

    /// Tell the server the challenge is ready to be validated
    async fn complete_challenge(&self, challenge: &Challenge) -> Result<()>;

    /// Poll until the challenge is valid; errors on "invalid" or when the
    /// client's own poll budget runs out
    async fn wait_for_valid_status(&self, challenge: &Challenge) -> Result<()>;

    async fn finalize_order(&self, order: &Order, csr: &[u8]) -> Result<Order>;

    /// Download the certificate chain (PEM), preferring an alternate chain
    /// whose issuer matches `preferred_chain` when the server offers one
    async fn certificate(&self, order: &Order, preferred_chain: Option<&str>) -> Result<String>;
}
