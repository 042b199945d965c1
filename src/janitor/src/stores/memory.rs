//! In-memory store backends.
//!
//! These back standalone mode and the test suite. They reproduce the contract
//! the janitor relies on — deterministic ordering, `AlreadyDeleted` on
//! repeat deletes, a total count alongside each page — without any real
//! query engine behind them. The knowledge backend cannot interpret filter
//! expressions (those belong to the real engine) and ignores them.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use common::model::{
    FilterExpression, KnowledgeElement, RetentionRule, RuleExecutionPatch, StoredFile,
};

use super::{DocumentStore, KnowledgeStore, Page, RuleStore, StoreError};

/// Rule store holding rules in memory.
#[derive(Default)]
pub struct InMemoryRuleStore {
    rules: Arc<RwLock<Vec<RetentionRule>>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, rule: RetentionRule) {
        self.rules.write().await.push(rule);
    }

    /// Fetch a rule by id, for inspection in tests and standalone mode.
    pub async fn get(&self, rule_id: Uuid) -> Option<RetentionRule> {
        self.rules
            .read()
            .await
            .iter()
            .find(|rule| rule.id == rule_id)
            .cloned()
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn active_rules(&self) -> Result<Vec<RetentionRule>, StoreError> {
        Ok(self.rules.read().await.clone())
    }

    async fn patch_execution(
        &self,
        rule_id: Uuid,
        patch: RuleExecutionPatch,
    ) -> Result<(), StoreError> {
        let mut rules = self.rules.write().await;
        let rule = rules
            .iter_mut()
            .find(|rule| rule.id == rule_id)
            .ok_or_else(|| StoreError::Backend(format!("unknown rule {rule_id}")))?;
        rule.last_execution_date = Some(patch.last_execution_date);
        rule.remaining_count = Some(patch.remaining_count);
        rule.last_deleted_count = Some(patch.last_deleted_count);
        Ok(())
    }
}

/// Knowledge store holding indexed elements in memory.
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    elements: Arc<RwLock<Vec<KnowledgeElement>>>,
    protected: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, element: KnowledgeElement) {
        self.elements.write().await.push(element);
    }

    /// Mark an element as protected: the deletion guard will refuse it.
    pub async fn protect(&self, internal_id: &str) {
        self.protected.write().await.insert(internal_id.to_string());
    }

    pub async fn len(&self) -> usize {
        self.elements.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.elements.read().await.is_empty()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn paginate(
        &self,
        before: DateTime<Utc>,
        _filters: Option<FilterExpression>,
        first: usize,
    ) -> Result<Page<KnowledgeElement>, StoreError> {
        let elements = self.elements.read().await;
        let mut matches: Vec<KnowledgeElement> = elements
            .iter()
            .filter(|element| element.updated_at < before)
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            a.updated_at
                .cmp(&b.updated_at)
                .then_with(|| a.internal_id.cmp(&b.internal_id))
        });
        let global_count = matches.len() as u64;
        matches.truncate(first);
        Ok(Page {
            items: matches,
            global_count,
        })
    }

    async fn can_delete(&self, element: &KnowledgeElement) -> Result<bool, StoreError> {
        Ok(!self.protected.read().await.contains(&element.internal_id))
    }

    async fn delete(&self, internal_id: &str, _entity_type: &str) -> Result<(), StoreError> {
        let mut elements = self.elements.write().await;
        let position = elements
            .iter()
            .position(|element| element.internal_id == internal_id);
        match position {
            Some(index) => {
                elements.remove(index);
                Ok(())
            }
            None => Err(StoreError::AlreadyDeleted {
                id: internal_id.to_string(),
            }),
        }
    }
}

/// Document store holding files in memory, keyed by their full path id.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    files: Arc<RwLock<Vec<StoredFile>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, file: StoredFile) {
        self.files.write().await.push(file);
    }

    pub async fn contains(&self, file_id: &str) -> bool {
        self.files.read().await.iter().any(|file| file.id == file_id)
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn paginate(
        &self,
        root_path: &str,
        before: DateTime<Utc>,
        first: usize,
    ) -> Result<Page<StoredFile>, StoreError> {
        let files = self.files.read().await;
        let mut matches: Vec<StoredFile> = files
            .iter()
            .filter(|file| file.id.starts_with(root_path) && file.last_modified < before)
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            a.last_modified
                .cmp(&b.last_modified)
                .then_with(|| a.id.cmp(&b.id))
        });
        let global_count = matches.len() as u64;
        matches.truncate(first);
        Ok(Page {
            items: matches,
            global_count,
        })
    }

    async fn delete(&self, file_id: &str) -> Result<(), StoreError> {
        let mut files = self.files.write().await;
        let position = files.iter().position(|file| file.id == file_id);
        match position {
            Some(index) => {
                files.remove(index);
                Ok(())
            }
            None => Err(StoreError::AlreadyDeleted {
                id: file_id.to_string(),
            }),
        }
    }
}
