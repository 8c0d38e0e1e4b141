//! Acting on reconciliation results.
//!
//! [`TodoApplier`] turns each [`ToDo`] into a store change or a fetch:
//!
//! - `EntryNeeded`: fetch the content from the peer, then journal it at the
//!   peer's timestamp.
//! - `TimeAdjust`: move the local record if the [`TimestampPolicy`] says so.
//! - `RemoteNeeds`: collected in the report; the node offers them back.
//!
//! A failing item is recorded in the report and the rest still run.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use journal_core::{ContentHash, Epoch, JournalRecord, ToDo};
use journal_store::{InsertResult, JournalStore};
use journal_sync::{PeerId, TimestampPolicy};

/// Retrieves content from a peer so it can be journaled locally.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, peer: &PeerId, hash: &ContentHash) -> anyhow::Result<()>;
}

/// One item that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyFailure {
    pub hash: ContentHash,
    pub reason: String,
}

/// Outcome of applying one ToDo list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Content fetched and newly journaled.
    pub fetched: usize,
    /// Local records moved to a new timestamp.
    pub adjusted: usize,
    /// Items that needed no change under the policy.
    pub unchanged: usize,
    /// Local records the peer lacks, in reconciliation order.
    pub remote_needs: Vec<JournalRecord>,
    /// Records offered back to the peer.
    pub offered: usize,
    pub failures: Vec<ApplyFailure>,
    /// Why offering `remote_needs` back stopped short, if it did.
    pub offer_error: Option<String>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.offer_error.is_none()
    }

    /// Items not acted on: failed fetches and moves plus records that were
    /// due to be offered but were not.
    pub fn failed(&self) -> usize {
        let unoffered = match self.offer_error {
            Some(_) => self.remote_needs.len() - self.offered,
            None => 0,
        };
        self.failures.len() + unoffered
    }
}

pub struct TodoApplier<S> {
    store: S,
    fetcher: Arc<dyn ContentFetcher>,
    policy: TimestampPolicy,
}

impl<S: JournalStore> TodoApplier<S> {
    pub fn new(store: S, fetcher: Arc<dyn ContentFetcher>, policy: TimestampPolicy) -> Self {
        Self {
            store,
            fetcher,
            policy,
        }
    }

    pub fn policy(&self) -> TimestampPolicy {
        self.policy
    }

    pub async fn apply(&self, peer: &PeerId, todos: Vec<ToDo>) -> ApplyReport {
        let mut report = ApplyReport::default();

        for todo in todos {
            match todo {
                ToDo::EntryNeeded {
                    hash,
                    remote_timestamp,
                } => {
                    if let Err(e) = self.fetcher.fetch(peer, &hash).await {
                        warn!(peer = %peer, hash = %hash, error = %e, "fetch failed");
                        report.failures.push(ApplyFailure {
                            hash,
                            reason: format!("fetch failed: {:#}", e),
                        });
                        continue;
                    }
                    match self.journal_fetched(&hash, remote_timestamp).await {
                        Ok(Outcome::Journaled) => report.fetched += 1,
                        Ok(Outcome::Moved) => report.adjusted += 1,
                        Ok(Outcome::Kept) => report.unchanged += 1,
                        Err(reason) => report.failures.push(ApplyFailure { hash, reason }),
                    }
                }
                ToDo::TimeAdjust {
                    hash,
                    local_timestamp,
                    remote_timestamp,
                } => match self.adjust(&hash, local_timestamp, remote_timestamp).await {
                    Ok(Outcome::Moved) => report.adjusted += 1,
                    Ok(_) => report.unchanged += 1,
                    Err(reason) => report.failures.push(ApplyFailure { hash, reason }),
                },
                ToDo::RemoteNeeds {
                    hash,
                    local_timestamp,
                } => report
                    .remote_needs
                    .push(JournalRecord::new(local_timestamp, hash)),
            }
        }

        debug!(
            peer = %peer,
            fetched = report.fetched,
            adjusted = report.adjusted,
            remote_needs = report.remote_needs.len(),
            failures = report.failures.len(),
            "applied reconciliation"
        );
        report
    }

    /// Journal fetched content. If it was journaled meanwhile at another
    /// time, settle the two times through the policy.
    async fn journal_fetched(
        &self,
        hash: &ContentHash,
        remote_timestamp: Epoch,
    ) -> std::result::Result<Outcome, String> {
        let record = JournalRecord::new(remote_timestamp, hash.clone());
        match self.store.append(&record).await {
            Ok(InsertResult::Inserted) => Ok(Outcome::Journaled),
            Ok(InsertResult::AlreadyExists) => Ok(Outcome::Kept),
            Ok(InsertResult::Conflict { existing_timestamp }) => {
                self.adjust(hash, existing_timestamp, remote_timestamp).await
            }
            Err(e) => Err(e.to_string()),
        }
    }

    async fn adjust(
        &self,
        hash: &ContentHash,
        local: Epoch,
        remote: Epoch,
    ) -> std::result::Result<Outcome, String> {
        let target = self.policy.resolve(local, remote);
        if target == local {
            return Ok(Outcome::Kept);
        }
        match self.store.set_timestamp(hash, target).await {
            Ok(true) => Ok(Outcome::Moved),
            Ok(false) => Err("record no longer journaled".into()),
            Err(e) => Err(e.to_string()),
        }
    }
}

enum Outcome {
    Journaled,
    Moved,
    Kept,
}
