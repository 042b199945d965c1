//! One rule's full cleanup cycle.

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use common::model::{RetentionRule, RuleExecutionPatch};

use super::RetentionError;
use super::batch::run_in_waves;
use super::executor::{DeletionExecutor, DeletionOutcome};
use super::metrics::RetentionMetrics;
use super::query::elements_to_delete;
use super::scope::Scope;
use crate::stores::RetentionStores;

/// Result of processing a single rule.
#[derive(Debug, Clone)]
pub struct RuleRunResult {
    pub rule_id: Uuid,
    pub rule_name: String,
    pub scope: Scope,
    /// Total matches reported by the query, before eligibility filtering.
    pub global_count: u64,
    /// Page size after eligibility filtering.
    pub candidates: usize,
    /// Elements counted as deleted by this run.
    pub deleted_count: i64,
    /// Matches still remaining after this run.
    pub remaining_count: i64,
    pub duration_ms: u64,
}

/// Execute one cleanup cycle for `rule` and persist the bookkeeping.
///
/// Counter semantics, preserved from the observed behavior:
/// - an ineligible element leaves both tallies (`remaining` and `deleted`);
/// - an element found already deleted counts as a normal deletion;
/// - a failed deletion is logged but optimistically still counted as deleted
///   (best-effort accounting, deliberately not reconciled);
/// - elements whose waves never started because of cancellation are not
///   counted as deleted.
///
/// The bookkeeping patch is written unconditionally once the query has
/// succeeded — also when nothing matched. An unknown scope fails before the
/// query and leaves the rule record untouched.
pub(crate) async fn process_rule(
    stores: &RetentionStores,
    metrics: &RetentionMetrics,
    batch_size: usize,
    max_concurrency: usize,
    signal: &CancellationToken,
    rule: &RetentionRule,
) -> Result<RuleRunResult, RetentionError> {
    tracing::debug!(rule = %rule.name, "Executing retention rule");

    let scope = Scope::resolve(&rule.scope, &rule.name)?;
    let adapter = scope.bind(stores);
    let now = Utc::now();
    let before = rule.threshold(now);

    let page = elements_to_delete(&adapter, before, rule.filters.clone(), batch_size).await?;
    let candidates = page.items.len();
    let global_count = page.global_count;

    let mut remaining_deletions = global_count as i64;
    let mut deleted_count = candidates as i64;
    let started = std::time::Instant::now();

    if !page.items.is_empty() {
        tracing::debug!(
            rule = %rule.name,
            elements = candidates,
            "Retention manager clearing elements"
        );

        let executor = DeletionExecutor::new(&adapter, &rule.name);
        let outcomes = run_in_waves(page.items, max_concurrency, signal, |candidate| {
            executor.delete_candidate(candidate, now)
        })
        .await;

        // Candidates left unprocessed by a cancellation are not deleted.
        deleted_count -= (candidates - outcomes.len()) as i64;

        for outcome in &outcomes {
            match outcome {
                DeletionOutcome::Deleted => metrics.record_deleted(),
                DeletionOutcome::Ineligible => {
                    // Remove the element from this run's statistics entirely
                    remaining_deletions -= 1;
                    deleted_count -= 1;
                    metrics.record_skipped();
                }
                DeletionOutcome::AlreadyAbsent => metrics.record_already_absent(),
                DeletionOutcome::Failed => metrics.record_failure(),
            }
        }

        tracing::debug!(
            rule = %rule.name,
            elements = candidates,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retention manager batch complete"
        );
    }

    let patch = RuleExecutionPatch {
        last_execution_date: Utc::now(),
        remaining_count: remaining_deletions,
        last_deleted_count: deleted_count,
    };
    stores.rules.patch_execution(rule.id, patch).await?;

    let duration_ms = started.elapsed().as_millis() as u64;
    metrics.record_rule_processed();
    metrics.record_duration_ms(duration_ms);

    Ok(RuleRunResult {
        rule_id: rule.id,
        rule_name: rule.name.clone(),
        scope,
        global_count,
        candidates,
        deleted_count,
        remaining_count: remaining_deletions,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::{
        InMemoryDocumentStore, InMemoryKnowledgeStore, InMemoryRuleStore,
    };
    use chrono::Duration;
    use common::model::{KnowledgeElement, RetentionUnit, StoredFile, UploadStatus};
    use std::sync::Arc;

    fn stores(
        rules: InMemoryRuleStore,
        knowledge: InMemoryKnowledgeStore,
        documents: InMemoryDocumentStore,
    ) -> (RetentionStores, Arc<InMemoryRuleStore>) {
        let rules = Arc::new(rules);
        let stores = RetentionStores {
            rules: rules.clone(),
            knowledge: Arc::new(knowledge),
            documents: Arc::new(documents),
        };
        (stores, rules)
    }

    fn knowledge_rule(name: &str, max_retention: u32) -> RetentionRule {
        RetentionRule {
            id: Uuid::new_v4(),
            name: name.to_string(),
            scope: "knowledge".to_string(),
            max_retention,
            retention_unit: RetentionUnit::Days,
            filters: None,
            last_execution_date: None,
            remaining_count: None,
            last_deleted_count: None,
        }
    }

    fn element(id: &str, age_days: i64) -> KnowledgeElement {
        KnowledgeElement {
            internal_id: id.to_string(),
            entity_type: "Report".to_string(),
            updated_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[tokio::test]
    async fn test_full_batch_deletion() {
        let knowledge = InMemoryKnowledgeStore::new();
        for index in 0..5 {
            knowledge.insert(element(&format!("e{index}"), 60)).await;
        }
        let rules = InMemoryRuleStore::new();
        let rule = knowledge_rule("old knowledge", 30);
        rules.insert(rule.clone()).await;
        let (stores, rules) = stores(rules, knowledge, InMemoryDocumentStore::new());

        let metrics = RetentionMetrics::new();
        let signal = CancellationToken::new();
        let result = process_rule(&stores, &metrics, 1500, 2, &signal, &rule)
            .await
            .unwrap();

        assert_eq!(result.global_count, 5);
        assert_eq!(result.deleted_count, 5);
        assert_eq!(result.remaining_count, 5);
        assert_eq!(metrics.elements_deleted(), 5);

        let patched = rules.get(rule.id).await.unwrap();
        assert!(patched.last_execution_date.is_some());
        assert_eq!(patched.last_deleted_count, Some(5));
        assert_eq!(patched.remaining_count, Some(5));
    }

    #[tokio::test]
    async fn test_ineligible_element_decrements_both_counters() {
        let knowledge = InMemoryKnowledgeStore::new();
        for index in 0..5 {
            knowledge.insert(element(&format!("e{index}"), 60)).await;
        }
        knowledge.protect("e2").await;
        let rules = InMemoryRuleStore::new();
        let rule = knowledge_rule("old knowledge", 30);
        rules.insert(rule.clone()).await;
        let (stores, rules) = stores(rules, knowledge, InMemoryDocumentStore::new());

        let metrics = RetentionMetrics::new();
        let signal = CancellationToken::new();
        let result = process_rule(&stores, &metrics, 1500, 2, &signal, &rule)
            .await
            .unwrap();

        // Exactly one less than the no-rejection case on both tallies
        assert_eq!(result.deleted_count, 4);
        assert_eq!(result.remaining_count, 4);
        assert_eq!(metrics.elements_skipped(), 1);

        let patched = rules.get(rule.id).await.unwrap();
        assert_eq!(patched.last_deleted_count, Some(4));
        assert_eq!(patched.remaining_count, Some(4));
    }

    #[tokio::test]
    async fn test_empty_match_still_patches_rule() {
        let rules = InMemoryRuleStore::new();
        let rule = knowledge_rule("nothing to do", 30);
        rules.insert(rule.clone()).await;
        let (stores, rules) = stores(
            rules,
            InMemoryKnowledgeStore::new(),
            InMemoryDocumentStore::new(),
        );

        let metrics = RetentionMetrics::new();
        let signal = CancellationToken::new();
        let result = process_rule(&stores, &metrics, 1500, 2, &signal, &rule)
            .await
            .unwrap();

        assert_eq!(result.global_count, 0);
        assert_eq!(result.deleted_count, 0);
        assert_eq!(result.remaining_count, 0);

        let patched = rules.get(rule.id).await.unwrap();
        assert!(patched.last_execution_date.is_some());
        assert_eq!(patched.last_deleted_count, Some(0));
        assert_eq!(patched.remaining_count, Some(0));
    }

    #[tokio::test]
    async fn test_unknown_scope_fails_without_patching() {
        let rules = InMemoryRuleStore::new();
        let mut rule = knowledge_rule("misconfigured", 30);
        rule.scope = "bogus".to_string();
        rules.insert(rule.clone()).await;
        let (stores, rules) = stores(
            rules,
            InMemoryKnowledgeStore::new(),
            InMemoryDocumentStore::new(),
        );

        let metrics = RetentionMetrics::new();
        let signal = CancellationToken::new();
        let result = process_rule(&stores, &metrics, 1500, 2, &signal, &rule).await;

        assert!(matches!(
            result,
            Err(RetentionError::UnknownScope { .. })
        ));
        let untouched = rules.get(rule.id).await.unwrap();
        assert!(untouched.last_execution_date.is_none());
        assert_eq!(metrics.rules_processed(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_before_waves_reports_zero_deletions() {
        let knowledge = InMemoryKnowledgeStore::new();
        for index in 0..5 {
            knowledge.insert(element(&format!("e{index}"), 60)).await;
        }
        let rules = InMemoryRuleStore::new();
        let rule = knowledge_rule("cancelled", 30);
        rules.insert(rule.clone()).await;
        let (stores, rules) = stores(rules, knowledge, InMemoryDocumentStore::new());

        let metrics = RetentionMetrics::new();
        let signal = CancellationToken::new();
        signal.cancel();
        let result = process_rule(&stores, &metrics, 1500, 2, &signal, &rule)
            .await
            .unwrap();

        assert_eq!(result.deleted_count, 0);
        assert_eq!(result.remaining_count, 5);

        // The rule record is still updated
        let patched = rules.get(rule.id).await.unwrap();
        assert!(patched.last_execution_date.is_some());
        assert_eq!(patched.last_deleted_count, Some(0));
        assert_eq!(patched.remaining_count, Some(5));
    }

    #[tokio::test]
    async fn test_file_scope_discrepancy_between_count_and_page() {
        let documents = InMemoryDocumentStore::new();
        for index in 0..4 {
            documents
                .insert(StoredFile {
                    id: format!("import/global/ok-{index}"),
                    upload_status: UploadStatus::Complete,
                    works: vec![],
                    last_modified: Utc::now() - Duration::days(30),
                })
                .await;
        }
        for index in 0..6 {
            documents
                .insert(StoredFile {
                    id: format!("import/global/busy-{index}"),
                    upload_status: UploadStatus::Progress,
                    works: vec![],
                    last_modified: Utc::now() - Duration::days(30),
                })
                .await;
        }
        let rules = InMemoryRuleStore::new();
        let rule = RetentionRule {
            scope: "file".to_string(),
            max_retention: 7,
            ..knowledge_rule("old uploads", 7)
        };
        rules.insert(rule.clone()).await;
        let (stores, rules) = stores(rules, InMemoryKnowledgeStore::new(), documents);

        let metrics = RetentionMetrics::new();
        let signal = CancellationToken::new();
        let result = process_rule(&stores, &metrics, 1500, 2, &signal, &rule)
            .await
            .unwrap();

        // The post-filter shrinks the page but not the reported total
        assert_eq!(result.global_count, 10);
        assert_eq!(result.candidates, 4);
        assert_eq!(result.deleted_count, 4);
        assert_eq!(result.remaining_count, 10);

        let patched = rules.get(rule.id).await.unwrap();
        assert_eq!(patched.last_deleted_count, Some(4));
        assert_eq!(patched.remaining_count, Some(10));
    }

    #[tokio::test]
    async fn test_already_absent_does_not_change_counters() {
        use crate::stores::{MockKnowledgeStore, Page, StoreError};

        let mut knowledge = MockKnowledgeStore::new();
        let items = vec![element("a", 60), element("b", 60)];
        knowledge.expect_paginate().returning(move |_, _, _| {
            Ok(Page {
                items: items.clone(),
                global_count: 2,
            })
        });
        knowledge.expect_can_delete().returning(|_| Ok(true));
        // "a" races with a concurrent deleter, "b" deletes normally
        knowledge.expect_delete().returning(|id, _| {
            if id == "a" {
                Err(StoreError::AlreadyDeleted { id: id.to_string() })
            } else {
                Ok(())
            }
        });

        let rules = InMemoryRuleStore::new();
        let rule = knowledge_rule("racy", 30);
        rules.insert(rule.clone()).await;
        let rules = Arc::new(rules);
        let stores = RetentionStores {
            rules: rules.clone(),
            knowledge: Arc::new(knowledge),
            documents: Arc::new(InMemoryDocumentStore::new()),
        };

        let metrics = RetentionMetrics::new();
        let signal = CancellationToken::new();
        let result = process_rule(&stores, &metrics, 1500, 2, &signal, &rule)
            .await
            .unwrap();

        assert_eq!(result.deleted_count, 2);
        assert_eq!(result.remaining_count, 2);
        assert_eq!(metrics.elements_already_absent(), 1);
        assert_eq!(metrics.deletion_failures(), 0);
    }

    #[tokio::test]
    async fn test_failed_deletion_keeps_optimistic_counts() {
        use crate::stores::{MockKnowledgeStore, Page, StoreError};

        let mut knowledge = MockKnowledgeStore::new();
        let items = vec![element("a", 60), element("b", 60)];
        knowledge.expect_paginate().returning(move |_, _, _| {
            Ok(Page {
                items: items.clone(),
                global_count: 2,
            })
        });
        knowledge.expect_can_delete().returning(|_| Ok(true));
        knowledge.expect_delete().returning(|id, _| {
            if id == "a" {
                Err(StoreError::Backend("index timeout".to_string()))
            } else {
                Ok(())
            }
        });

        let rules = InMemoryRuleStore::new();
        let rule = knowledge_rule("flaky", 30);
        rules.insert(rule.clone()).await;
        let rules = Arc::new(rules);
        let stores = RetentionStores {
            rules: rules.clone(),
            knowledge: Arc::new(knowledge),
            documents: Arc::new(InMemoryDocumentStore::new()),
        };

        let metrics = RetentionMetrics::new();
        let signal = CancellationToken::new();
        let result = process_rule(&stores, &metrics, 1500, 2, &signal, &rule)
            .await
            .unwrap();

        // Optimistic accounting: the failed element is still counted
        assert_eq!(result.deleted_count, 2);
        assert_eq!(result.remaining_count, 2);
        assert_eq!(metrics.deletion_failures(), 1);
    }
}
