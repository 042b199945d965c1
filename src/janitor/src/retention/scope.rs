//! Scope resolution and adapter binding.

use std::fmt;

use crate::stores::{DocumentStore, KnowledgeStore, RetentionStores};

use super::RetentionError;

/// Root path for uploaded files.
pub const FILES_ROOT: &str = "import/global";
/// Root path for pending import workbenches.
pub const WORKBENCH_ROOT: &str = "import/pending";

/// The resource category a retention rule targets.
///
/// Rules persist the scope as a raw string; it is resolved to this enum once
/// per rule per cycle so that an unrecognized value fails that rule's
/// processing instead of the rule-set decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Knowledge,
    File,
    Workbench,
}

impl Scope {
    /// Resolve a rule's raw scope value.
    pub fn resolve(raw: &str, rule_name: &str) -> Result<Self, RetentionError> {
        match raw {
            "knowledge" => Ok(Scope::Knowledge),
            "file" => Ok(Scope::File),
            "workbench" => Ok(Scope::Workbench),
            _ => Err(RetentionError::UnknownScope {
                scope: raw.to_string(),
                rule: rule_name.to_string(),
            }),
        }
    }

    /// Bind this scope to its store adapter.
    pub(crate) fn bind<'a>(&self, stores: &'a RetentionStores) -> ScopeAdapter<'a> {
        match self {
            Scope::Knowledge => ScopeAdapter::Knowledge(stores.knowledge.as_ref()),
            Scope::File => ScopeAdapter::Files {
                store: stores.documents.as_ref(),
                root: FILES_ROOT,
            },
            Scope::Workbench => ScopeAdapter::Files {
                store: stores.documents.as_ref(),
                root: WORKBENCH_ROOT,
            },
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Knowledge => "knowledge",
            Scope::File => "file",
            Scope::Workbench => "workbench",
        };
        write!(f, "{name}")
    }
}

/// A scope resolved to the store it queries and deletes through.
pub(crate) enum ScopeAdapter<'a> {
    Knowledge(&'a dyn KnowledgeStore),
    Files {
        store: &'a dyn DocumentStore,
        root: &'static str,
    },
}
