/// Ranker
///
/// Imposes the (score desc, item id asc) total order, applies the pagination
/// cursor, and hands the remainder to the diversifier to assemble a page.
/// The total order is what makes pagination reproducible: a cursor is a
/// position in that order, not an offset, so concurrent success-score
/// feedback cannot shift page boundaries mid-scroll.

use crate::services::diversity::{DiversifiedPage, Diversifier};
use crate::models::{Cursor, ScoredItem};
use std::cmp::Ordering;

pub struct Ranker {
    diversifier: Diversifier,
}

impl Ranker {
    pub fn new(diversifier: Diversifier) -> Self {
        Self { diversifier }
    }

    pub fn paginate(
        &self,
        mut scored: Vec<ScoredItem>,
        cursor: Option<Cursor>,
        page_size: usize,
    ) -> DiversifiedPage {
        // Scores are finite by construction (the scorer neutralizes NaN and
        // infinities), so this comparison chain is a total order.
        scored.sort_by(compare_rank);

        if let Some(cursor) = cursor {
            scored.retain(|item| at_or_after(item, &cursor));
        }

        self.diversifier.build_page(scored, page_size)
    }
}

fn compare_rank(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.item_id.cmp(&b.item_id))
}

/// Inclusive cursor check: an item is on this page if its sort key sits at
/// or after the cursor position in the descending total order.
fn at_or_after(item: &ScoredItem, cursor: &Cursor) -> bool {
    if item.score < cursor.score {
        return true;
    }
    if item.score > cursor.score {
        return false;
    }
    item.item_id >= cursor.item_id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(item_id: i64, author_id: i64, score: f32) -> ScoredItem {
        ScoredItem {
            item_id,
            author_id,
            primary_tag: None,
            score,
        }
    }

    fn ranker() -> Ranker {
        Ranker::new(Diversifier::new(10, 10))
    }

    #[test]
    fn sorts_by_score_desc_then_id_asc() {
        let scored_items = vec![
            scored(3, 1, 0.5),
            scored(1, 1, 0.9),
            scored(4, 1, 0.5),
            scored(2, 1, 0.7),
        ];

        let page = ranker().paginate(scored_items, None, 10);
        let ids: Vec<i64> = page.page.iter().map(|i| i.item_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn page_is_non_increasing_in_score() {
        let scored_items: Vec<ScoredItem> =
            (0..20).map(|i| scored(i, i, (i as f32 * 7.3) % 1.0)).collect();

        let page = ranker().paginate(scored_items, None, 20);
        for window in page.page.windows(2) {
            assert!(window[0].score >= window[1].score);
        }
    }

    #[test]
    fn cursor_resumes_where_the_last_page_ended() {
        let scored_items = vec![
            scored(1, 1, 0.9),
            scored(2, 2, 0.8),
            scored(3, 3, 0.7),
            scored(4, 4, 0.6),
        ];

        let first = ranker().paginate(scored_items.clone(), None, 2);
        let ids: Vec<i64> = first.page.iter().map(|i| i.item_id).collect();
        assert_eq!(ids, vec![1, 2]);

        let second = ranker().paginate(scored_items, first.next_cursor, 2);
        let ids: Vec<i64> = second.page.iter().map(|i| i.item_id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert!(second.next_cursor.is_none());
    }

    #[test]
    fn cursor_is_stable_across_equal_scores() {
        let scored_items: Vec<ScoredItem> = (1..=4).map(|i| scored(i, i, 0.5)).collect();

        let first = ranker().paginate(scored_items.clone(), None, 2);
        let ids: Vec<i64> = first.page.iter().map(|i| i.item_id).collect();
        assert_eq!(ids, vec![1, 2]);

        let second = ranker().paginate(scored_items, first.next_cursor, 2);
        let ids: Vec<i64> = second.page.iter().map(|i| i.item_id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn demoted_item_surfaces_on_the_next_page() {
        let ranker = Ranker::new(Diversifier::new(1, 10));
        let scored_items = vec![
            scored(1, 100, 0.9),
            scored(2, 100, 0.8),
            scored(3, 300, 0.7),
            scored(4, 200, 0.6),
        ];

        let first = ranker.paginate(scored_items.clone(), None, 2);
        let served: Vec<i64> = first.page.iter().map(|i| i.item_id).collect();
        assert_eq!(served, vec![1, 3]);
        // Cursor parked on the demoted item, which outranks everything unserved.
        assert_eq!(first.next_cursor.unwrap().item_id, 2);

        // The serving layer excludes already-seen ids on the follow-up request.
        let remaining: Vec<ScoredItem> = scored_items
            .into_iter()
            .filter(|i| !served.contains(&i.item_id))
            .collect();
        let second = ranker.paginate(remaining, first.next_cursor, 2);
        let ids: Vec<i64> = second.page.iter().map(|i| i.item_id).collect();
        assert_eq!(ids, vec![2, 4]);
    }
}
