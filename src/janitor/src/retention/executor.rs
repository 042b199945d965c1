//! Per-element deletion with outcome classification.

use chrono::{DateTime, Utc};

use common::model::CandidateElement;

use super::MANAGER_ID;
use super::scope::ScopeAdapter;
use crate::stores::StoreError;

/// What happened to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// Deleted by this run.
    Deleted,
    /// The deletion guard refused the element; it leaves the run's
    /// statistics entirely.
    Ineligible,
    /// Another actor deleted it first. Expected race, treated as success.
    AlreadyAbsent,
    /// The deletion failed for any other reason. Logged, contained, and
    /// optimistically still counted as deleted.
    Failed,
}

/// Deletes candidates through the scope's adapter.
///
/// Every error is contained here: the outcome classifies what happened, and
/// nothing escalates past the element level.
pub(crate) struct DeletionExecutor<'a> {
    adapter: &'a ScopeAdapter<'a>,
    rule_name: &'a str,
}

impl<'a> DeletionExecutor<'a> {
    pub fn new(adapter: &'a ScopeAdapter<'a>, rule_name: &'a str) -> Self {
        Self { adapter, rule_name }
    }

    pub async fn delete_candidate(
        &self,
        candidate: CandidateElement,
        now: DateTime<Utc>,
    ) -> DeletionOutcome {
        match self.guard(&candidate).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    rule = self.rule_name,
                    id = candidate.id(),
                    "Retention manager cannot delete protected element"
                );
                return DeletionOutcome::Ineligible;
            }
            Err(error) => {
                tracing::error!(
                    manager = MANAGER_ID,
                    rule = self.rule_name,
                    id = candidate.id(),
                    error = %error,
                    "Deletion guard check failed"
                );
                return DeletionOutcome::Failed;
            }
        }

        let result = match (self.adapter, &candidate) {
            (ScopeAdapter::Knowledge(store), CandidateElement::Knowledge(element)) => {
                store
                    .delete(&element.internal_id, &element.entity_type)
                    .await
            }
            (ScopeAdapter::Files { store, .. }, CandidateElement::File(file)) => {
                store.delete(&file.id).await
            }
            // A candidate can only come from the adapter that queried it.
            _ => Err(StoreError::Backend(format!(
                "candidate {} does not match rule scope",
                candidate.id()
            ))),
        };

        match result {
            Ok(()) => {
                tracing::debug!(
                    rule = self.rule_name,
                    id = candidate.id(),
                    age = %humanized_age(now, &candidate),
                    "Retention manager deleted element"
                );
                DeletionOutcome::Deleted
            }
            Err(StoreError::AlreadyDeleted { .. }) => {
                // Concurrent deletion by another actor; benign.
                tracing::debug!(
                    rule = self.rule_name,
                    id = candidate.id(),
                    "Element already deleted"
                );
                DeletionOutcome::AlreadyAbsent
            }
            Err(error) => {
                tracing::error!(
                    manager = MANAGER_ID,
                    rule = self.rule_name,
                    id = candidate.id(),
                    error = %error,
                    "Retention manager deletion error"
                );
                DeletionOutcome::Failed
            }
        }
    }

    async fn guard(&self, candidate: &CandidateElement) -> Result<bool, StoreError> {
        match (self.adapter, candidate) {
            (ScopeAdapter::Knowledge(store), CandidateElement::Knowledge(element)) => {
                store.can_delete(element).await
            }
            // File candidates were already status-filtered by the query.
            _ => Ok(true),
        }
    }
}

fn humanized_age(now: DateTime<Utc>, candidate: &CandidateElement) -> String {
    match (now - candidate.updated_at()).to_std() {
        Ok(age) => {
            humantime::format_duration(std::time::Duration::from_secs(age.as_secs())).to_string()
        }
        Err(_) => "0s".to_string(),
    }
}
