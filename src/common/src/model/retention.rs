//! Retention rule records as persisted by the rule store.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unit for a rule's retention period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionUnit {
    #[default]
    Days,
    Weeks,
    Months,
    Years,
}

impl RetentionUnit {
    /// Compute the cutoff instant `magnitude` units before `now`.
    ///
    /// Months and years are calendar-aware; a cutoff that underflows the
    /// representable range saturates to the minimum instant, which matches
    /// everything.
    pub fn threshold(&self, now: DateTime<Utc>, magnitude: u32) -> DateTime<Utc> {
        match self {
            RetentionUnit::Days => now
                .checked_sub_signed(chrono::Duration::days(i64::from(magnitude)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            RetentionUnit::Weeks => now
                .checked_sub_signed(chrono::Duration::weeks(i64::from(magnitude)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            RetentionUnit::Months => now
                .checked_sub_months(Months::new(magnitude))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            RetentionUnit::Years => magnitude
                .checked_mul(12)
                .and_then(|months| now.checked_sub_months(Months::new(months)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }
}

/// Opaque, externally-validated filter expression.
///
/// The retention core passes this through to the knowledge store unchanged
/// and asserts nothing about its internal structure beyond being combinable
/// with the store's query options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterExpression(serde_json::Value);

impl FilterExpression {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for FilterExpression {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// A persisted retention rule.
///
/// Rules are created and edited outside this service; the janitor reads the
/// active set at the start of each cycle and writes back the bookkeeping
/// fields exactly once per rule per cycle. The bookkeeping fields are never
/// read for decision-making — every cycle recomputes from the current data
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionRule {
    pub id: Uuid,
    pub name: String,
    /// Raw persisted scope value (`knowledge`, `file` or `workbench`).
    ///
    /// Kept as a string on purpose: the value is operator-supplied
    /// configuration, and an unrecognized scope must fail the rule's
    /// eligibility query, not the decoding of the whole rule set.
    pub scope: String,
    /// Positive retention period magnitude.
    pub max_retention: u32,
    #[serde(default)]
    pub retention_unit: RetentionUnit,
    /// Scope-specific filter expression, applied only for knowledge scope.
    #[serde(default)]
    pub filters: Option<FilterExpression>,
    #[serde(default)]
    pub last_execution_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remaining_count: Option<i64>,
    #[serde(default)]
    pub last_deleted_count: Option<i64>,
}

impl RetentionRule {
    /// Cutoff instant for this rule relative to `now`.
    pub fn threshold(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.retention_unit.threshold(now, self.max_retention)
    }
}

/// Bookkeeping written onto a rule at the end of each processing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleExecutionPatch {
    pub last_execution_date: DateTime<Utc>,
    pub remaining_count: i64,
    pub last_deleted_count: i64,
}
