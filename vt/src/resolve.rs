//! Name resolution and disambiguation
//!
//! Maps caller-supplied emails and extracted name tokens to directory users.
//! Emails are resolved first; a name token that belongs to a user already
//! picked by email is skipped, which is how a clarification round-trip
//! settles a previously ambiguous name.

use std::collections::HashSet;

use async_trait::async_trait;
use taskstore::{Store, StoreError, User, fold_name};
use tracing::{debug, info};

use crate::blocking::run_blocking;
use crate::domain::{AmbiguityRecord, Candidate};
use crate::error::{FlowError, UserRef};

/// Lookup capability over registered users
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Exact match on the normalized (trimmed, lower-cased) email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Case-insensitive exact full-string match, in directory order
    async fn find_by_name(&self, name: &str) -> Result<Vec<User>, StoreError>;
}

#[async_trait]
impl UserDirectory for Store {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_string();
        run_blocking(self, move |store| store.user_by_email(&email)).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<User>, StoreError> {
        let name = name.to_string();
        run_blocking(self, move |store| store.users_by_name(&name)).await
    }
}

/// Result of resolving every assignee reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every reference matched exactly one user; de-duplicated, first-seen order
    Resolved(Vec<User>),
    /// At least one name matched several users; nothing should be persisted
    Ambiguous(Vec<AmbiguityRecord>),
}

/// Resolve emails, then name tokens, to directory users
///
/// Any reference matching nobody aborts the whole resolution with
/// [`FlowError::UserNotFound`].
pub async fn resolve_assignees(
    directory: &dyn UserDirectory,
    emails: &[String],
    names: &[String],
) -> Result<Resolution, FlowError> {
    debug!(?emails, ?names, "resolve_assignees: called");
    let mut resolved: Vec<User> = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for email in emails {
        // A blank email is looked up like any other and matches nobody
        let email = email.trim().to_lowercase();
        let user = directory
            .find_by_email(&email)
            .await?
            .ok_or_else(|| FlowError::UserNotFound(UserRef::Email(email.clone())))?;
        debug!(%email, id = %user.id, "resolve_assignees: email matched");
        if seen_ids.insert(user.id.clone()) {
            resolved.push(user);
        }
    }

    // Names already covered by an explicit email are not looked up again
    let by_email: HashSet<String> = resolved.iter().map(|u| fold_name(&u.name)).collect();

    let mut ambiguous: Vec<AmbiguityRecord> = Vec::new();
    let mut flagged: HashSet<String> = HashSet::new();

    for name in names {
        let folded = fold_name(name);
        if folded.is_empty() || by_email.contains(&folded) {
            debug!(%name, "resolve_assignees: skipping token");
            continue;
        }

        let mut matches = directory.find_by_name(name).await?;
        match matches.len() {
            0 => return Err(FlowError::UserNotFound(UserRef::Name(name.clone()))),
            1 => {
                let user = matches.remove(0);
                if seen_ids.insert(user.id.clone()) {
                    resolved.push(user);
                }
            }
            n => {
                debug!(%name, candidates = n, "resolve_assignees: ambiguous");
                if flagged.insert(folded) {
                    ambiguous.push(AmbiguityRecord {
                        name: name.clone(),
                        options: matches.iter().map(Candidate::from).collect(),
                    });
                }
            }
        }
    }

    if !ambiguous.is_empty() {
        info!(count = ambiguous.len(), "Assignee names need clarification");
        return Ok(Resolution::Ambiguous(ambiguous));
    }

    info!(count = resolved.len(), "Resolved assignees");
    Ok(Resolution::Resolved(resolved))
}
