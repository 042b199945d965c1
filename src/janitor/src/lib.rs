//! GraphVault janitor: background retention management.
//!
//! The janitor consumes the set of active retention rules and turns them into
//! safe, rate-limited deletions of aged knowledge elements, uploaded files
//! and pending import (workbench) files. The heavy machinery around it — the
//! distributed lock framework, the indexed query engine, the file storage —
//! stays behind the narrow seams in [`stores`] and [`lock`].

pub mod lock;
pub mod retention;
pub mod service;
pub mod stores;

pub use retention::scheduler::RetentionManager;
