//! Merge decoded pages into one result

use crate::document::{Document, TotalHits};
use crate::page::Page;
use serde::{Deserialize, Serialize};

/// Every document of a scroll, in fetch order, with the first page's total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub total: TotalHits,
    pub documents: Vec<Document>,
    /// Transport calls made to produce this result, the final empty round included.
    pub rounds: usize,
}

impl AggregatedResult {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Merge pages in fetch order.
///
/// The total comes from the first page only; continuation pages may omit it
/// or carry a stale one. A first page without a total yields the zero value.
pub fn aggregate(pages: Vec<Page>) -> AggregatedResult {
    let rounds = pages.len();
    let total = pages
        .first()
        .and_then(|page| page.total)
        .unwrap_or_default();

    let mut documents = Vec::with_capacity(pages.iter().map(Page::hit_count).sum());
    for page in pages {
        documents.extend(page.documents);
    }

    AggregatedResult {
        total,
        documents,
        rounds,
    }
}
