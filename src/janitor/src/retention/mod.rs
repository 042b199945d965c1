//! Retention management core.
//!
//! One cycle walks every active rule in order, translates each rule's scope
//! and age threshold into a bounded store query, deletes the resulting
//! candidates in fixed-width concurrent waves, and writes the bookkeeping
//! back onto the rule.
//!
//! ## Architecture
//!
//! - `scope`: scope resolution and adapter binding
//! - `query`: eligibility query translation and post-filtering
//! - `executor`: per-element deletion with outcome classification
//! - `batch`: bounded-concurrency wave controller
//! - `processor`: one rule's full cycle
//! - `scheduler`: the lock-holding cycle loop
//! - `metrics`: run counters

pub mod batch;
pub mod executor;
pub mod metrics;
pub mod processor;
pub mod query;
pub mod scheduler;
pub mod scope;

use thiserror::Error;

use crate::stores::StoreError;

/// Identity attached to every log line the manager emits about failures.
pub const MANAGER_ID: &str = "RETENTION_MANAGER";

/// Errors that abort a rule — and with it the remainder of the cycle.
///
/// Element-level deletion failures never surface here; they are contained by
/// the executor and only show up in logs and counters.
#[derive(Error, Debug)]
pub enum RetentionError {
    /// The rule carries a scope value the manager does not know. This is a
    /// configuration error: the rule is skipped along with the rest of the
    /// cycle, and retried on the next schedule.
    #[error("scope {scope} not existing for retention rule {rule}")]
    UnknownScope { scope: String, rule: String },

    /// A store call outside the per-element path failed (rule listing,
    /// candidate query, bookkeeping write).
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub use metrics::RetentionMetrics;
pub use processor::RuleRunResult;
pub use scheduler::{CycleSummary, RetentionManager};
pub use scope::Scope;
