/// Diversifier
///
/// Limits how often a single author or primary tag repeats within one page.
/// Items over the cap are demoted, never dropped: they fall past the page
/// boundary and lead the next page, where the caps start fresh.

use crate::models::{Cursor, ScoredItem};
use std::collections::HashMap;
use tracing::debug;

pub struct Diversifier {
    author_cap: usize,
    tag_cap: usize,
}

pub struct DiversifiedPage {
    pub page: Vec<ScoredItem>,
    /// Inclusive start boundary of the next page: the highest-ranked item
    /// that was not emitted, demoted items first.
    pub next_cursor: Option<Cursor>,
}

impl Diversifier {
    pub fn new(author_cap: usize, tag_cap: usize) -> Self {
        Self {
            author_cap: author_cap.max(1),
            tag_cap: tag_cap.max(1),
        }
    }

    /// Walk the (score desc, id asc) sorted list and assemble one page.
    pub fn build_page(&self, sorted: Vec<ScoredItem>, page_size: usize) -> DiversifiedPage {
        let mut page: Vec<ScoredItem> = Vec::with_capacity(page_size);
        let mut demoted: Vec<ScoredItem> = Vec::new();
        let mut leftovers: Vec<ScoredItem> = Vec::new();
        let mut author_counts: HashMap<i64, usize> = HashMap::new();
        let mut tag_counts: HashMap<String, usize> = HashMap::new();

        let mut iter = sorted.into_iter();
        for item in iter.by_ref() {
            if page.len() == page_size {
                leftovers.push(item);
                break;
            }
            if self.violates_caps(&item, &author_counts, &tag_counts) {
                demoted.push(item);
                continue;
            }
            *author_counts.entry(item.author_id).or_default() += 1;
            if let Some(tag) = &item.primary_tag {
                *tag_counts.entry(tag.clone()).or_default() += 1;
            }
            page.push(item);
        }
        leftovers.extend(iter);

        if !demoted.is_empty() {
            debug!(
                demoted = demoted.len(),
                "Diversification demoted items to the next page"
            );
        }

        // Demoted items sit earlier in the sorted order than anything the
        // walk never reached, so they define the next boundary.
        let next_cursor = demoted
            .first()
            .or_else(|| leftovers.first())
            .map(|item| Cursor {
                score: item.score,
                item_id: item.item_id,
            });

        DiversifiedPage { page, next_cursor }
    }

    fn violates_caps(
        &self,
        item: &ScoredItem,
        author_counts: &HashMap<i64, usize>,
        tag_counts: &HashMap<String, usize>,
    ) -> bool {
        if author_counts.get(&item.author_id).copied().unwrap_or(0) >= self.author_cap {
            return true;
        }
        if let Some(tag) = &item.primary_tag {
            if tag_counts.get(tag).copied().unwrap_or(0) >= self.tag_cap {
                return true;
            }
        }
        false
    }
}
