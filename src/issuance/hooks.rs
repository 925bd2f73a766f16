use crate::acme::{Authorization, Challenge};
use anyhow::Result;
use async_trait::async_trait;

/// Caller-supplied provisioning of challenge responses (DNS records, files
/// on a web root, ...).
///
/// For every record `create_record` returns, the orchestrator calls
/// `remove_record` exactly once with that record before the issuance attempt
/// returns, whatever its outcome. `remove_record` is never called for a
/// failed `create_record`.
#[async_trait]
pub trait ChallengeHooks: Send + Sync {
    /// Handle to whatever `create_record` provisioned
    type Record: Send + Sync;

    async fn create_record(
        &self,
        authorization: &Authorization,
        challenge: &Challenge,
        key_authorization: &str,
    ) -> Result<Self::Record>;

    async fn remove_record(
        &self,
        authorization: &Authorization,
        challenge: &Challenge,
        key_authorization: &str,
        record: Self::Record,
    ) -> Result<()>;
}
