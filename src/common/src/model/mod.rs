pub mod element;
pub mod retention;

pub use element::{CandidateElement, FileWork, KnowledgeElement, StoredFile, UploadStatus};
pub use retention::{FilterExpression, RetentionRule, RetentionUnit, RuleExecutionPatch};
