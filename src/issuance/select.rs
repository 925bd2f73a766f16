use crate::acme::{Authorization, Challenge};
use crate::error::{IssueError, IssueResult};

/// Pick the challenge whose type appears earliest in `priority`.
///
/// Types missing from `priority` rank after every listed type; ties keep
/// the authorization's own order, so with no listed type at all the first
/// offered challenge wins.
pub fn select_challenge<'a>(
    authorization: &'a Authorization,
    priority: &[String],
) -> IssueResult<&'a Challenge> {
    authorization
        .challenges
        .iter()
        .min_by_key(|challenge| {
            priority
                .iter()
                .position(|t| *t == challenge.challenge_type)
                .unwrap_or(priority.len())
        })
        .ok_or_else(|| IssueError::NoChallenges {
            domain: authorization.domain().to_string(),
        })
}
