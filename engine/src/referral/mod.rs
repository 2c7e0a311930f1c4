//! Referral Graph
//!
//! Read-only view of the sponsor tree used for commission fan-out. The
//! graph is strictly a tree: every account has at most one sponsor
//! pointer, and acyclicity is validated when the link is created (an
//! ancestor walk bounded by [`MAX_REFERRAL_DEPTH`]), never re-checked on
//! the commission hot path.
//!
//! Each cycle run takes one snapshot of the sponsor pointers, so a batch
//! sees a consistent tree even if accounts are registered concurrently.

use crate::ledger::InMemoryLedger;
use std::collections::HashMap;
use thiserror::Error;

/// Upper bound on any ancestor walk. A chain deeper than this is treated
/// as a data-integrity failure rather than walked further.
pub const MAX_REFERRAL_DEPTH: usize = 32;

/// Errors from referral-tree validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferralError {
    /// The sponsor chain loops back onto the account (or exceeds
    /// [`MAX_REFERRAL_DEPTH`], which is indistinguishable from a loop)
    #[error("Referral cycle detected at account {account_id}")]
    CycleDetected { account_id: String },

    #[error("Unknown sponsor account {sponsor_id}")]
    UnknownSponsor { sponsor_id: String },
}

/// Immutable snapshot of the sponsor tree.
#[derive(Debug, Clone)]
pub struct ReferralGraph {
    sponsors: HashMap<String, Option<String>>,
}

impl ReferralGraph {
    /// Snapshot the sponsor pointers from the ledger store.
    pub fn snapshot(ledger: &InMemoryLedger) -> Self {
        Self {
            sponsors: ledger.sponsor_map(),
        }
    }

    /// Build a graph from explicit pointers (tests, validation).
    pub fn from_links(sponsors: HashMap<String, Option<String>>) -> Self {
        Self { sponsors }
    }

    /// Direct sponsor of an account, if any.
    pub fn sponsor_of(&self, account_id: &str) -> Option<&str> {
        self.sponsors.get(account_id)?.as_deref()
    }

    /// Ancestors of an account from the direct sponsor upward, at most
    /// `max_levels` deep. The walk stops silently at the tree root.
    pub fn ancestor_chain(&self, account_id: &str, max_levels: usize) -> Vec<String> {
        let mut chain: Vec<String> = Vec::new();
        let mut current = account_id.to_string();
        while chain.len() < max_levels {
            match self.sponsor_of(&current) {
                Some(sponsor) => {
                    current = sponsor.to_string();
                    chain.push(current.clone());
                }
                None => break,
            }
        }
        chain
    }

    /// Validate that linking `account_id` under `sponsor_id` keeps the
    /// tree acyclic. Called at account registration, before the link is
    /// persisted.
    pub fn validate_new_link(
        &self,
        account_id: &str,
        sponsor_id: &str,
    ) -> Result<(), ReferralError> {
        if !self.sponsors.contains_key(sponsor_id) {
            return Err(ReferralError::UnknownSponsor {
                sponsor_id: sponsor_id.to_string(),
            });
        }
        if sponsor_id == account_id {
            return Err(ReferralError::CycleDetected {
                account_id: account_id.to_string(),
            });
        }

        // Walk from the proposed sponsor to the root; finding the new
        // account on the way up means the link would close a loop.
        let mut current = sponsor_id;
        for _ in 0..MAX_REFERRAL_DEPTH {
            match self.sponsor_of(current) {
                Some(ancestor) if ancestor == account_id => {
                    return Err(ReferralError::CycleDetected {
                        account_id: account_id.to_string(),
                    });
                }
                Some(ancestor) => current = ancestor,
                None => return Ok(()),
            }
        }

        // Depth bound exceeded: treat as a cycle rather than walking on.
        Err(ReferralError::CycleDetected {
            account_id: account_id.to_string(),
        })
    }
}
