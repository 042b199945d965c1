//! Store seams the janitor operates through.
//!
//! The janitor never talks to the query engine, the file storage or the rule
//! database directly. Production deployments implement these traits on top of
//! their real backends; the [`memory`] module provides in-memory twins for
//! standalone mode and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use common::model::{
    FilterExpression, KnowledgeElement, RetentionRule, RuleExecutionPatch, StoredFile,
};

pub mod memory;

/// One page of query results plus the total match count.
///
/// `global_count` reflects the query before any eligibility post-filtering;
/// the page items may be fewer than the count suggests.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub global_count: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            global_count: 0,
        }
    }
}

/// Errors surfaced by the store backends.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The target no longer exists. Deletions racing with another deleter are
    /// expected; backends must report this distinguishably instead of a
    /// generic failure.
    #[error("element {id} is already deleted")]
    AlreadyDeleted { id: String },

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_already_deleted(&self) -> bool {
        matches!(self, StoreError::AlreadyDeleted { .. })
    }
}

/// Access to the persisted retention rules.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// The full set of active rules (non-paginated).
    async fn active_rules(&self) -> Result<Vec<RetentionRule>, StoreError>;

    /// Write the per-cycle bookkeeping onto a rule.
    async fn patch_execution(
        &self,
        rule_id: Uuid,
        patch: RuleExecutionPatch,
    ) -> Result<(), StoreError>;
}

/// Access to the indexed knowledge-graph entities.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// One page of stix-indexed entities last modified before `before`,
    /// combined with an optional opaque filter expression. Ordering must be
    /// deterministic so that repeated queries return the same page.
    async fn paginate(
        &self,
        before: DateTime<Utc>,
        filters: Option<FilterExpression>,
        first: usize,
    ) -> Result<Page<KnowledgeElement>, StoreError>;

    /// Deletion guard: protected elements (for example user individuals)
    /// refuse deletion here.
    async fn can_delete(&self, element: &KnowledgeElement) -> Result<bool, StoreError>;

    /// Delete an entity by internal id. `entity_type` is a routing hint for
    /// the backend.
    async fn delete(&self, internal_id: &str, entity_type: &str) -> Result<(), StoreError>;
}

/// Access to uploaded files and pending import workbenches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// One page of files under `root_path` not modified since `before`, with
    /// deterministic ordering.
    async fn paginate(
        &self,
        root_path: &str,
        before: DateTime<Utc>,
        first: usize,
    ) -> Result<Page<StoredFile>, StoreError>;

    /// Delete a file by id.
    async fn delete(&self, file_id: &str) -> Result<(), StoreError>;
}

/// The three store seams bundled for wiring.
#[derive(Clone)]
pub struct RetentionStores {
    pub rules: std::sync::Arc<dyn RuleStore>,
    pub knowledge: std::sync::Arc<dyn KnowledgeStore>,
    pub documents: std::sync::Arc<dyn DocumentStore>,
}
