//! Transient candidate elements returned by the store queries.
//!
//! Nothing here is persisted by the janitor; candidates are fetched, judged
//! and deleted within a single rule cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of an uploaded file or of one of its processing works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Progress,
    Wait,
    Complete,
    Error,
    Timeout,
}

impl UploadStatus {
    /// Whether this status permits deletion.
    ///
    /// Only terminal states are deletable; in-progress and queued uploads or
    /// works block deletion of the file they belong to.
    pub fn is_deletable(&self) -> bool {
        matches!(
            self,
            UploadStatus::Complete | UploadStatus::Error | UploadStatus::Timeout
        )
    }
}

/// An indexed knowledge-graph element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeElement {
    pub internal_id: String,
    pub entity_type: String,
    pub updated_at: DateTime<Utc>,
}

/// A processing work attached to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWork {
    pub status: UploadStatus,
}

/// An uploaded file or pending import workbench entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: String,
    pub upload_status: UploadStatus,
    /// Associated works; a missing entry does not block deletion.
    #[serde(default)]
    pub works: Vec<Option<FileWork>>,
    pub last_modified: DateTime<Utc>,
}

impl StoredFile {
    /// A file is deletion-eligible only if its own status and every present
    /// work status are deletable.
    pub fn is_deletable(&self) -> bool {
        self.upload_status.is_deletable()
            && self
                .works
                .iter()
                .all(|work| work.as_ref().is_none_or(|w| w.status.is_deletable()))
    }
}

/// A deletion candidate, in the shape of the store it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateElement {
    Knowledge(KnowledgeElement),
    File(StoredFile),
}

impl CandidateElement {
    /// The identifier handed to the scope's deletion adapter.
    pub fn id(&self) -> &str {
        match self {
            CandidateElement::Knowledge(element) => &element.internal_id,
            CandidateElement::File(file) => &file.id,
        }
    }

    /// Last-modification instant, where the variant carries one.
    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            CandidateElement::Knowledge(element) => element.updated_at,
            CandidateElement::File(file) => file.last_modified,
        }
    }
}
