//! Eligibility query translation.

use chrono::{DateTime, Utc};

use common::model::{CandidateElement, FilterExpression};

use super::RetentionError;
use super::scope::ScopeAdapter;
use crate::stores::Page;

/// Fetch one page of deletion candidates for a rule.
///
/// Knowledge scope combines the rule's opaque filter expression with the
/// implicit "last modified before threshold" predicate against the indexed
/// entities. File scopes query their fixed root path with "not modified
/// since" semantics; filter expressions are not supported there and are
/// ignored.
///
/// For file scopes the page is additionally reduced to candidates whose own
/// status and every present work status are deletable. `global_count` is
/// intentionally NOT reduced by this post-filter — only the page shrinks.
/// The processor reconciles the difference through its counter
/// initialization.
pub(crate) async fn elements_to_delete(
    adapter: &ScopeAdapter<'_>,
    before: DateTime<Utc>,
    filters: Option<FilterExpression>,
    batch_size: usize,
) -> Result<Page<CandidateElement>, RetentionError> {
    match adapter {
        ScopeAdapter::Knowledge(store) => {
            let page = store.paginate(before, filters, batch_size).await?;
            Ok(Page {
                global_count: page.global_count,
                items: page
                    .items
                    .into_iter()
                    .map(CandidateElement::Knowledge)
                    .collect(),
            })
        }
        ScopeAdapter::Files { store, root } => {
            if filters.is_some() {
                tracing::debug!(root = *root, "Filter expression ignored for file scope");
            }
            let page = store.paginate(*root, before, batch_size).await?;
            let discarded = page.items.iter().filter(|file| !file.is_deletable()).count();
            if discarded > 0 {
                tracing::debug!(
                    root = *root,
                    discarded,
                    "Discarded non-deletable files from page"
                );
            }
            Ok(Page {
                global_count: page.global_count,
                items: page
                    .items
                    .into_iter()
                    .filter(|file| file.is_deletable())
                    .map(CandidateElement::File)
                    .collect(),
            })
        }
    }
}
