//! The lock-holding retention cycle.

use chrono::{DateTime, Utc};

use common::config::{RetentionSettings, RetentionSettingsError};

use super::metrics::RetentionMetrics;
use super::processor::{RuleRunResult, process_rule};
use super::RetentionError;
use crate::lock::CycleLease;
use crate::stores::RetentionStores;

/// Result of one complete retention cycle.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub rules_processed: usize,
    /// True when the cycle stopped early because cancellation was requested.
    pub cancelled: bool,
    pub rule_results: Vec<RuleRunResult>,
}

impl CycleSummary {
    pub fn total_deleted(&self) -> i64 {
        self.rule_results.iter().map(|r| r.deleted_count).sum()
    }
}

/// The retention manager.
///
/// One instance serves one process; every scheduled invocation runs under a
/// cluster-exclusive lock acquired by the caller, so at most one replica
/// executes a cycle at a time. The manager holds no mutable state of its
/// own — all progress lives in the rule records, recomputed each cycle.
pub struct RetentionManager {
    stores: RetentionStores,
    settings: RetentionSettings,
    metrics: RetentionMetrics,
}

impl RetentionManager {
    /// Create a manager from validated settings.
    pub fn new(
        stores: RetentionStores,
        settings: RetentionSettings,
    ) -> Result<Self, RetentionSettingsError> {
        settings.validate()?;
        Ok(Self {
            stores,
            settings,
            metrics: RetentionMetrics::new(),
        })
    }

    pub fn settings(&self) -> &RetentionSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &RetentionMetrics {
        &self.metrics
    }

    /// Run one retention cycle under the given lease.
    ///
    /// Rules are processed strictly sequentially. The cancellation signal is
    /// checked between rules; later rules are left for the next cycle. There
    /// is deliberately no per-rule error handling: a rule-level failure (an
    /// unknown scope, a store outage) aborts the remainder of the cycle,
    /// which is safe because every cycle recomputes from scratch.
    pub async fn run_cycle(
        &self,
        lease: &dyn CycleLease,
    ) -> Result<CycleSummary, RetentionError> {
        let started_at = Utc::now();
        let rules = self.stores.rules.active_rules().await?;
        tracing::debug!(
            rules = rules.len(),
            "Retention manager execution"
        );

        let mut rule_results = Vec::with_capacity(rules.len());
        let mut cancelled = false;

        for rule in &rules {
            if lease.signal().is_cancelled() {
                tracing::info!(
                    processed = rule_results.len(),
                    remaining = rules.len() - rule_results.len(),
                    "Retention cycle cancelled between rules"
                );
                cancelled = true;
                break;
            }

            let result = process_rule(
                &self.stores,
                &self.metrics,
                self.settings.batch_size,
                self.settings.max_deletion_concurrency,
                lease.signal(),
                rule,
            )
            .await?;

            tracing::debug!(
                rule = %result.rule_name,
                scope = %result.scope,
                deleted = result.deleted_count,
                remaining = result.remaining_count,
                "Retention rule processed"
            );
            rule_results.push(result);
        }

        self.metrics.record_cycle_completed();

        Ok(CycleSummary {
            started_at,
            completed_at: Utc::now(),
            rules_processed: rule_results.len(),
            cancelled,
            rule_results,
        })
    }
}
