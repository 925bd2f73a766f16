use super::hooks::ChallengeHooks;
use super::observer::{IssuanceObserver, Phase, TracingObserver};
use super::options::IssueOptions;
use super::select::select_challenge;
use crate::acme::{
    read_csr_domains, AcmeTransport, Authorization, Challenge, Identifier, NewAccount, NewOrder,
    Order,
};
use crate::error::{IssueError, IssueResult};
use crate::verify::{ChallengeVerifier, Verifier};
use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Selected challenge of one pending authorization
struct ChallengeInfo {
    /// Position among the selected challenges; drives the stagger delay
    index: usize,
    authorization: Authorization,
    challenge: Challenge,
    key_authorization: String,
}

impl ChallengeInfo {
    fn domain(&self) -> &str {
        self.authorization.domain()
    }
}

/// A record created by the hooks that has not been removed yet
struct Provisioned<'a, R> {
    info: &'a ChallengeInfo,
    record: R,
}

/// Drives an ACME order from account lookup to certificate download.
///
/// Phases run strictly one after another: account, order, challenge
/// selection, provisioning (all domains), settle wait, verification (all
/// domains), cleanup, finalization. Within provisioning, verification and
/// cleanup every domain runs concurrently, hook calls staggered by index.
/// Cleanup runs whenever provisioning was attempted and never changes the
/// outcome of the attempt.
pub struct Orchestrator<T, H> {
    transport: T,
    hooks: H,
    verifier: Box<dyn ChallengeVerifier>,
    observer: Box<dyn IssuanceObserver>,
}

impl<T: AcmeTransport, H: ChallengeHooks> Orchestrator<T, H> {
    pub fn new(transport: T, hooks: H, verifier: impl ChallengeVerifier + 'static) -> Self {
        Self {
            transport,
            hooks,
            verifier: Box::new(verifier),
            observer: Box::new(TracingObserver),
        }
    }

    /// Replace the default tracing observer
    pub fn with_observer(mut self, observer: impl IssuanceObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Run one issuance attempt and return the certificate chain (PEM)
    pub async fn issue(&self, options: &IssueOptions) -> IssueResult<String> {
        self.issue_with_cancellation(options, &CancellationToken::new()).await
    }

    /// Like [`issue`](Self::issue), abandoning the attempt with
    /// [`IssueError::Cancelled`] once `cancel` fires. Records already
    /// provisioned are still removed before returning.
    pub async fn issue_with_cancellation(
        &self,
        options: &IssueOptions,
        cancel: &CancellationToken,
    ) -> IssueResult<String> {
        options.validate()?;

        let (order, challenges) = cancellable(cancel, self.prepare(options)).await?;

        self.observer.phase_started(Phase::Provisioning);
        let started = Instant::now();
        let (provisioned, provisioning) =
            self.provision(&challenges, options.stagger, cancel).await;
        self.observer.phase_finished(Phase::Provisioning, provisioning.is_ok(), started.elapsed());

        let validation = match provisioning {
            Ok(()) => cancellable(cancel, self.settle_and_validate(&challenges, options)).await,
            Err(e) => Err(e),
        };

        if !provisioned.is_empty() {
            self.observer.phase_started(Phase::Cleanup);
            let started = Instant::now();
            let clean = self.release(provisioned, options.stagger).await;
            self.observer.phase_finished(Phase::Cleanup, clean, started.elapsed());
        }

        validation?;

        cancellable(
            cancel,
            self.observed(Phase::Finalization, self.finalize(&order, options)),
        )
        .await
    }

    /// Account, order and challenge selection; nothing to clean up yet
    async fn prepare(&self, options: &IssueOptions) -> IssueResult<(Order, Vec<ChallengeInfo>)> {
        self.observed(Phase::Account, self.ensure_account(options)).await?;

        let (order, authorizations) = self
            .observed(Phase::Order, self.place_order(options))
            .await?;

        let challenges = self
            .observed(
                Phase::Selection,
                self.select_challenges(authorizations, &options.challenge_priority),
            )
            .await?;

        Ok((order, challenges))
    }

    async fn ensure_account(&self, options: &IssueOptions) -> IssueResult<()> {
        match self.transport.account_url().await {
            Ok(url) => {
                debug!(account = %url, "Using existing ACME account");
                Ok(())
            }
            Err(e) => {
                debug!(reason = %e, "No usable ACME account, registering");

                let request = NewAccount {
                    terms_of_service_agreed: options.terms_of_service_agreed,
                    contact: options.contact(),
                };
                self.transport
                    .create_account(&request)
                    .await
                    .map_err(IssueError::transport("createAccount"))?;

                info!("ACME account registered");
                Ok(())
            }
        }
    }

    async fn place_order(
        &self,
        options: &IssueOptions,
    ) -> IssueResult<(Order, Vec<Authorization>)> {
        let domains = read_csr_domains(&options.csr)?.identifiers();
        if domains.is_empty() {
            return Err(IssueError::Config(
                "CSR names no domain to order".to_string(),
            ));
        }

        info!(domains = ?domains, "Placing certificate order");

        let request = NewOrder {
            identifiers: domains.iter().map(|d| Identifier::dns(d.as_str())).collect(),
        };
        let order = self
            .transport
            .create_order(&request)
            .await
            .map_err(IssueError::transport("createOrder"))?;

        let authorizations = self
            .transport
            .authorizations(&order)
            .await
            .map_err(IssueError::transport("getAuthorizations"))?;

        Ok((order, authorizations))
    }

    /// One challenge per pending authorization, keyed by the authorization's
    /// own identifier rather than its position in the order
    async fn select_challenges(
        &self,
        authorizations: Vec<Authorization>,
        priority: &[String],
    ) -> IssueResult<Vec<ChallengeInfo>> {
        let mut selected = Vec::with_capacity(authorizations.len());

        for authorization in authorizations {
            if authorization.is_valid() {
                debug!(domain = %authorization.domain(), "Authorization already valid, skipping");
                continue;
            }

            let challenge = select_challenge(&authorization, priority)?.clone();
            self.observer
                .challenge_selected(authorization.domain(), &challenge.challenge_type);
            selected.push((authorization, challenge));
        }

        let keys = join_all(
            selected
                .iter()
                .map(|(_, challenge)| self.transport.challenge_key_authorization(challenge)),
        )
        .await;

        selected
            .into_iter()
            .zip(keys)
            .enumerate()
            .map(|(index, ((authorization, challenge), key))| {
                key.map(|key_authorization| ChallengeInfo {
                    index,
                    authorization,
                    challenge,
                    key_authorization,
                })
                .map_err(IssueError::transport("getChallengeKeyAuthorization"))
            })
            .collect()
    }

    /// Create every challenge record. Failures are collected rather than
    /// raised so each domain gets its attempt; the first failure by index
    /// is returned alongside the records that were created.
    async fn provision<'a>(
        &self,
        challenges: &'a [ChallengeInfo],
        stagger: Duration,
        cancel: &CancellationToken,
    ) -> (Vec<Provisioned<'a, H::Record>>, IssueResult<()>) {
        let attempts = join_all(challenges.iter().map(|info| async move {
            // Only the stagger wait is interruptible; a hook call that has
            // started must finish so its record can be removed
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(IssueError::Cancelled),
                _ = sleep(stagger_delay(stagger, info.index)) => {}
            }

            let result = self
                .hooks
                .create_record(&info.authorization, &info.challenge, &info.key_authorization)
                .await;
            self.observer
                .record_provisioned(info.domain(), result.as_ref().err());

            result.map_err(|source| IssueError::Provisioning {
                domain: info.domain().to_string(),
                source,
            })
        }))
        .await;

        let mut provisioned = Vec::with_capacity(challenges.len());
        let mut first_error = None;
        for (info, attempt) in challenges.iter().zip(attempts) {
            match attempt {
                Ok(record) => provisioned.push(Provisioned { info, record }),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        (provisioned, first_error.map_or(Ok(()), Err))
    }

    async fn settle_and_validate(
        &self,
        challenges: &[ChallengeInfo],
        options: &IssueOptions,
    ) -> IssueResult<()> {
        if challenges.is_empty() {
            return Ok(());
        }

        self.observed(Phase::Settle, async {
            sleep(options.settle_delay).await;
            Ok(())
        })
        .await?;

        self.observed(Phase::Verification, async {
            join_all(
                challenges
                    .iter()
                    .map(|info| self.validate(info, options.skip_challenge_verification)),
            )
            .await
            .into_iter()
            .collect::<IssueResult<Vec<()>>>()
            .map(|_| ())
        })
        .await
    }

    /// Pre-flight check, then have the server validate the challenge
    async fn validate(&self, info: &ChallengeInfo, skip_verification: bool) -> IssueResult<()> {
        if !skip_verification {
            self.verifier
                .verify(&info.authorization, &info.challenge, &info.key_authorization)
                .await?;

            self.transport
                .verify_challenge(&info.authorization, &info.challenge)
                .await
                .map_err(IssueError::transport("verifyChallenge"))?;
        }

        self.transport
            .complete_challenge(&info.challenge)
            .await
            .map_err(IssueError::transport("completeChallenge"))?;

        self.transport
            .wait_for_valid_status(&info.challenge)
            .await
            .map_err(|source| IssueError::ChallengeFailed {
                domain: info.domain().to_string(),
                source,
            })?;

        self.observer.challenge_valid(info.domain());
        Ok(())
    }

    /// Remove every provisioned record; returns false if any removal failed
    async fn release(
        &self,
        provisioned: Vec<Provisioned<'_, H::Record>>,
        stagger: Duration,
    ) -> bool {
        join_all(
            provisioned
                .into_iter()
                .map(|Provisioned { info, record }| async move {
                    sleep(stagger_delay(stagger, info.index)).await;

                    let removed = self
                        .hooks
                        .remove_record(
                            &info.authorization,
                            &info.challenge,
                            &info.key_authorization,
                            record,
                        )
                        .await;

                    match removed {
                        Ok(()) => true,
                        Err(e) => {
                            self.observer.cleanup_failed(info.domain(), &e);
                            false
                        }
                    }
                }),
        )
        .await
        .into_iter()
        .all(|removed| removed)
    }

    async fn finalize(&self, order: &Order, options: &IssueOptions) -> IssueResult<String> {
        let order = self
            .transport
            .finalize_order(order, &options.csr)
            .await
            .map_err(IssueError::transport("finalizeOrder"))?;

        let certificate = self
            .transport
            .certificate(&order, options.preferred_chain.as_deref())
            .await
            .map_err(IssueError::transport("getCertificate"))?;

        info!("Certificate issued");
        Ok(certificate)
    }

    async fn observed<R>(
        &self,
        phase: Phase,
        work: impl Future<Output = IssueResult<R>>,
    ) -> IssueResult<R> {
        self.observer.phase_started(phase);
        let started = Instant::now();
        let result = work.await;
        self.observer.phase_finished(phase, result.is_ok(), started.elapsed());
        result
    }
}

/// Issue a certificate with the built-in http-01/dns-01 verifier
pub async fn issue<T: AcmeTransport, H: ChallengeHooks>(
    transport: T,
    hooks: H,
    options: &IssueOptions,
) -> IssueResult<String> {
    let verifier = Verifier::new(&options.verifier).map_err(|e| {
        IssueError::Config(format!("failed to build challenge verifier: {:#}", e))
    })?;

    Orchestrator::new(transport, hooks, verifier)
        .issue(options)
        .await
}

fn stagger_delay(stagger: Duration, index: usize) -> Duration {
    stagger.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
}

async fn cancellable<R>(
    cancel: &CancellationToken,
    work: impl Future<Output = IssueResult<R>>,
) -> IssueResult<R> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(IssueError::Cancelled),
        result = work => result,
    }
}
