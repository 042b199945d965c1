//! Scheduled execution of retention cycles.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::lock::LockProvider;
use crate::retention::RetentionManager;

/// Run the retention manager on its configured schedule until `shutdown` is
/// requested.
///
/// Every tick tries to take the configured named lock; when another holder
/// has it the tick is skipped — some other replica is already cleaning up.
/// Cycle errors are logged and the schedule keeps going: a failed cycle is
/// retried from scratch on the next tick, which is safe because cycles carry
/// no state across runs.
pub async fn run_scheduler(
    manager: Arc<RetentionManager>,
    locks: Arc<dyn LockProvider>,
    shutdown: CancellationToken,
) {
    let settings = manager.settings().clone();

    if !settings.enabled {
        tracing::info!("Retention manager disabled by configuration");
        return;
    }
    if !settings.start_enabled {
        tracing::info!("Retention manager enabled but automatic start is disabled");
        return;
    }

    tracing::info!(
        interval = ?settings.schedule_interval,
        lock_key = %settings.lock_key,
        batch_size = settings.batch_size,
        max_deletion_concurrency = settings.max_deletion_concurrency,
        "Starting retention scheduler"
    );

    let mut ticker = tokio::time::interval(settings.schedule_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match locks.try_lock(&settings.lock_key).await {
            Ok(Some(lease)) => match manager.run_cycle(lease.as_ref()).await {
                Ok(summary) => {
                    if summary.total_deleted() > 0 {
                        tracing::info!(
                            rules = summary.rules_processed,
                            deleted = summary.total_deleted(),
                            cancelled = summary.cancelled,
                            "Retention cycle complete"
                        );
                    } else {
                        tracing::debug!(
                            rules = summary.rules_processed,
                            "Retention cycle complete, nothing to delete"
                        );
                    }
                }
                Err(error) => {
                    tracing::error!(error = %error, "Retention cycle failed");
                }
            },
            Ok(None) => {
                tracing::debug!(
                    lock_key = %settings.lock_key,
                    "Retention lock held elsewhere, skipping cycle"
                );
            }
            Err(error) => {
                tracing::error!(error = %error, "Retention lock acquisition failed");
            }
        }
    }

    tracing::info!("Retention scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LocalLockProvider;
    use crate::stores::RetentionStores;
    use crate::stores::memory::{
        InMemoryDocumentStore, InMemoryKnowledgeStore, InMemoryRuleStore,
    };
    use chrono::{Duration as ChronoDuration, Utc};
    use common::config::RetentionSettings;
    use common::model::{KnowledgeElement, RetentionRule, RetentionUnit};
    use std::time::Duration;
    use uuid::Uuid;

    fn settings(enabled: bool, start_enabled: bool) -> RetentionSettings {
        RetentionSettings {
            enabled,
            start_enabled,
            schedule_interval: Duration::from_millis(20),
            ..Default::default()
        }
    }

    fn manager(settings: RetentionSettings) -> (Arc<RetentionManager>, Arc<InMemoryRuleStore>) {
        let rules = Arc::new(InMemoryRuleStore::new());
        let stores = RetentionStores {
            rules: rules.clone(),
            knowledge: Arc::new(InMemoryKnowledgeStore::new()),
            documents: Arc::new(InMemoryDocumentStore::new()),
        };
        (
            Arc::new(RetentionManager::new(stores, settings).unwrap()),
            rules,
        )
    }

    #[tokio::test]
    async fn test_disabled_manager_returns_immediately() {
        let (manager, _) = manager(settings(false, true));
        let locks = Arc::new(LocalLockProvider::new(CancellationToken::new()));
        // Completes without the shutdown token ever firing
        run_scheduler(manager, locks, CancellationToken::new()).await;
    }

    #[tokio::test]
    async fn test_start_disabled_manager_returns_immediately() {
        let (manager, _) = manager(settings(true, false));
        let locks = Arc::new(LocalLockProvider::new(CancellationToken::new()));
        run_scheduler(manager, locks, CancellationToken::new()).await;
    }

    #[tokio::test]
    async fn test_scheduler_runs_cycles_until_shutdown() {
        let rules = Arc::new(InMemoryRuleStore::new());
        let knowledge = Arc::new(InMemoryKnowledgeStore::new());
        knowledge
            .insert(KnowledgeElement {
                internal_id: "stale".to_string(),
                entity_type: "Report".to_string(),
                updated_at: Utc::now() - ChronoDuration::days(90),
            })
            .await;
        let rule_id = Uuid::new_v4();
        rules
            .insert(RetentionRule {
                id: rule_id,
                name: "old knowledge".to_string(),
                scope: "knowledge".to_string(),
                max_retention: 30,
                retention_unit: RetentionUnit::Days,
                filters: None,
                last_execution_date: None,
                remaining_count: None,
                last_deleted_count: None,
            })
            .await;
        let stores = RetentionStores {
            rules: rules.clone(),
            knowledge: knowledge.clone(),
            documents: Arc::new(InMemoryDocumentStore::new()),
        };
        let manager =
            Arc::new(RetentionManager::new(stores, settings(true, true)).unwrap());

        let shutdown = CancellationToken::new();
        let locks = Arc::new(LocalLockProvider::new(shutdown.clone()));
        let scheduler = tokio::spawn(run_scheduler(
            manager.clone(),
            locks,
            shutdown.clone(),
        ));

        // Give the scheduler a few ticks, then stop it
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();
        scheduler.await.unwrap();

        assert!(manager.metrics().cycles_completed() >= 1);
        assert!(knowledge.is_empty().await);
        let rule = rules.get(rule_id).await.unwrap();
        assert!(rule.last_execution_date.is_some());
        // Later cycles find nothing and self-correct the tallies to zero
        assert!(rule.last_deleted_count.is_some());
    }
}
