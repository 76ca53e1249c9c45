//! Shopping list merge engine.
//!
//! Pure functions over an in-memory working list: no catalog lookups and no
//! database access. Callers resolve ingredient and unit identities first and
//! persist the result afterwards.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::models::{LineKey, ShoppingListItem};

/// One line of a shopping list as seen by the merge engine.
///
/// `id` is `None` for lines created during the current pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub id: Option<i64>,
    pub key: LineKey,
    pub quantity: String,
    pub checked: bool,
}

impl From<&ShoppingListItem> for LineItem {
    fn from(item: &ShoppingListItem) -> Self {
        Self {
            id: Some(item.id),
            key: item.line_key(),
            quantity: item.quantity.clone(),
            checked: item.checked,
        }
    }
}

/// An ingredient entry waiting to be placed on a list.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub key: LineKey,
    pub quantity: String,
}

impl Candidate {
    #[must_use]
    pub fn new(key: LineKey, quantity: impl Into<String>) -> Self {
        Self {
            key,
            quantity: quantity.into(),
        }
    }

    /// Apply a meal plan repeat count to the quantity.
    #[must_use]
    pub fn scaled(self, count: u32) -> Self {
        Self {
            quantity: scale_quantity(&self.quantity, count),
            key: self.key,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The quantity of the line at `index` absorbed the candidate.
    Merged { index: usize },
    /// No line matched; the caller appends and persists this one.
    New(LineItem),
}

/// Parse a quantity as a decimal number. The empty string counts as zero.
#[must_use]
pub fn parse_quantity(quantity: &str) -> Option<f64> {
    if quantity.is_empty() {
        return Some(0.0);
    }
    quantity
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Render a number the way shopping lists show it: `9.0` as `"9"`, `4.5` as `"4.5"`.
#[must_use]
pub fn format_quantity(value: f64) -> String {
    if value == 0.0 {
        // also folds -0.0
        return "0".to_string();
    }
    // f64's Display already drops the fractional part of whole numbers and
    // never switches to exponent notation.
    format!("{value}")
}

/// Combine two quantities for the same line.
///
/// Numbers add up. Anything else is joined as text, keeping whichever side is
/// non-empty when only one is.
#[must_use]
pub fn combine_quantities(existing: &str, candidate: &str) -> String {
    if let (Some(a), Some(b)) = (parse_quantity(existing), parse_quantity(candidate)) {
        let sum = a + b;
        if sum.is_finite() {
            return format_quantity(sum);
        }
    }
    if !existing.is_empty() && !candidate.is_empty() {
        format!("{existing} + {candidate}")
    } else if !existing.is_empty() || candidate.is_empty() {
        existing.to_string()
    } else {
        candidate.to_string()
    }
}

/// Multiply a quantity by a meal plan repeat count.
///
/// Counts of one or less leave the text untouched, numeric or not.
#[must_use]
pub fn scale_quantity(quantity: &str, count: u32) -> String {
    if count <= 1 {
        return quantity.to_string();
    }
    match parse_quantity(quantity).map(|v| v * f64::from(count)) {
        Some(scaled) if scaled.is_finite() => format_quantity(scaled),
        _ if quantity.is_empty() => count.to_string(),
        _ => format!("{quantity} × {count}"),
    }
}

/// Place one candidate against the working list.
///
/// The first line whose key matches absorbs the quantity in place. Without a
/// match a fresh unchecked line is returned for the caller to append.
pub fn merge_candidate(items: &mut [LineItem], candidate: Candidate) -> MergeOutcome {
    for (index, item) in items.iter_mut().enumerate() {
        if item.key.matches(&candidate.key) {
            let merged = combine_quantities(&item.quantity, &candidate.quantity);
            debug!(
                index,
                before = %item.quantity,
                added = %candidate.quantity,
                after = %merged,
                "merged into existing line"
            );
            item.quantity = merged;
            return MergeOutcome::Merged { index };
        }
    }
    debug!(quantity = %candidate.quantity, "no matching line, appending");
    MergeOutcome::New(LineItem {
        id: None,
        key: candidate.key,
        quantity: candidate.quantity,
        checked: false,
    })
}

/// Request-local list that a generation pass merges into.
///
/// Tracks which already-persisted lines changed so the caller can write back
/// only those plus the newly appended ones.
#[derive(Debug, Clone, Default)]
pub struct WorkingList {
    items: Vec<LineItem>,
    touched: BTreeSet<usize>,
}

impl WorkingList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_items(items: Vec<LineItem>) -> Self {
        Self {
            items,
            touched: BTreeSet::new(),
        }
    }

    pub fn merge(&mut self, candidate: Candidate) {
        match merge_candidate(&mut self.items, candidate) {
            MergeOutcome::Merged { index } => {
                if self.items[index].id.is_some() {
                    self.touched.insert(index);
                }
            }
            MergeOutcome::New(item) => self.items.push(item),
        }
    }

    pub fn merge_all<I>(&mut self, candidates: I)
    where
        I: IntoIterator<Item = Candidate>,
    {
        for candidate in candidates {
            self.merge(candidate);
        }
    }

    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Persisted lines whose quantity changed during this pass.
    pub fn touched(&self) -> impl Iterator<Item = &LineItem> {
        self.touched.iter().map(|&i| &self.items[i])
    }

    /// Lines created during this pass, in append order.
    pub fn new_items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter().filter(|i| i.id.is_none())
    }

    #[must_use]
    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flour_g(qty: &str) -> Candidate {
        Candidate::new(LineKey::canonical(1, Some(10)), qty)
    }

    fn merged_quantity(existing: &str, added: &str) -> String {
        let mut items = vec![LineItem {
            id: Some(1),
            key: LineKey::canonical(1, Some(10)),
            quantity: existing.to_string(),
            checked: false,
        }];
        let outcome = merge_candidate(&mut items, flour_g(added));
        assert_eq!(outcome, MergeOutcome::Merged { index: 0 });
        items.remove(0).quantity
    }

    #[test]
    fn test_numeric_quantities_add() {
        assert_eq!(merged_quantity("4", "5"), "9");
        assert_eq!(merged_quantity("4.5", "4.5"), "9");
        assert_eq!(merged_quantity("2.5", "1"), "3.5");
    }

    #[test]
    fn test_empty_quantity_counts_as_zero() {
        assert_eq!(merged_quantity("", "3"), "3");
        assert_eq!(merged_quantity("2", ""), "2");
        assert_eq!(merged_quantity("", ""), "0");
    }

    #[test]
    fn test_non_numeric_joins_text() {
        assert_eq!(
            merged_quantity("al gusto", "un poco"),
            "al gusto + un poco"
        );
        assert_eq!(merged_quantity("2", "al gusto"), "2 + al gusto");
    }

    #[test]
    fn test_text_fallback_keeps_non_empty_side() {
        assert_eq!(combine_quantities("", "to taste"), "to taste");
        assert_eq!(combine_quantities("to taste", ""), "to taste");
        assert_eq!(combine_quantities(" ", ""), " ");
    }

    #[test]
    fn test_non_finite_text_is_not_numeric() {
        assert_eq!(combine_quantities("inf", "1"), "inf + 1");
        assert_eq!(combine_quantities("NaN", "1"), "NaN + 1");
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(""), Some(0.0));
        assert_eq!(parse_quantity(" 2.5 "), Some(2.5));
        assert_eq!(parse_quantity("   "), None);
        assert_eq!(parse_quantity("2-3"), None);
        assert_eq!(parse_quantity("1e400"), None);
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(9.0), "9");
        assert_eq!(format_quantity(4.5), "4.5");
        assert_eq!(format_quantity(-0.0), "0");
        assert_eq!(format_quantity(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_quantity(1e20), "100000000000000000000");
    }

    #[test]
    fn test_distinct_units_stay_separate() {
        let mut list = WorkingList::new();
        list.merge(Candidate::new(LineKey::canonical(1, Some(10)), "200"));
        list.merge(Candidate::new(LineKey::canonical(1, Some(11)), "2"));
        assert_eq!(list.len(), 2);
        assert_eq!(list.items()[0].quantity, "200");
        assert_eq!(list.items()[1].quantity, "2");
    }

    #[test]
    fn test_repeated_candidate_accumulates_into_one_line() {
        let mut list = WorkingList::new();
        list.merge_all(vec![flour_g("100"), flour_g("50"), flour_g("25.5")]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.items()[0].quantity, "175.5");
        assert!(list.items()[0].id.is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let key = LineKey::canonical(1, None);
        let mut items = vec![
            LineItem {
                id: Some(1),
                key: key.clone(),
                quantity: "1".to_string(),
                checked: false,
            },
            LineItem {
                id: Some(2),
                key: key.clone(),
                quantity: "7".to_string(),
                checked: false,
            },
        ];
        let outcome = merge_candidate(&mut items, Candidate::new(key, "2"));
        assert_eq!(outcome, MergeOutcome::Merged { index: 0 });
        assert_eq!(items[0].quantity, "3");
        assert_eq!(items[1].quantity, "7");
    }

    #[test]
    fn test_merge_leaves_checked_flag_alone() {
        let mut list = WorkingList::from_items(vec![LineItem {
            id: Some(5),
            key: LineKey::canonical(1, Some(10)),
            quantity: "1".to_string(),
            checked: true,
        }]);
        list.merge(flour_g("1"));
        assert!(list.items()[0].checked);
        assert_eq!(list.items()[0].quantity, "2");
    }

    #[test]
    fn test_legacy_lines_match_loosely() {
        let mut list = WorkingList::new();
        list.merge(Candidate::new(LineKey::legacy("Flour", "g"), "100"));
        list.merge(Candidate::new(LineKey::legacy("flour", " G "), "50"));
        assert_eq!(list.len(), 1);
        assert_eq!(list.items()[0].quantity, "150");
    }

    #[test]
    fn test_legacy_and_canonical_do_not_mix() {
        let mut list = WorkingList::new();
        list.merge(Candidate::new(LineKey::canonical(1, None), "1"));
        list.merge(Candidate::new(LineKey::legacy("flour", ""), "1"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_new_line_keeps_candidate_quantity() {
        let mut items = Vec::new();
        let outcome = merge_candidate(&mut items, flour_g("a handful"));
        match outcome {
            MergeOutcome::New(item) => {
                assert_eq!(item.quantity, "a handful");
                assert!(!item.checked);
                assert!(item.id.is_none());
            }
            MergeOutcome::Merged { .. } => panic!("expected a new line"),
        }
    }

    #[test]
    fn test_scale_quantity() {
        assert_eq!(scale_quantity("2", 3), "6");
        assert_eq!(scale_quantity("1.5", 2), "3");
        assert_eq!(scale_quantity("a pinch", 3), "a pinch × 3");
        assert_eq!(scale_quantity("a pinch", 1), "a pinch");
        assert_eq!(scale_quantity("2.50", 1), "2.50");
        assert_eq!(scale_quantity("2", 0), "2");
        assert_eq!(scale_quantity("", 3), "0");
    }

    #[test]
    fn test_touched_tracks_only_persisted_lines() {
        let mut list = WorkingList::from_items(vec![LineItem {
            id: Some(9),
            key: LineKey::canonical(1, Some(10)),
            quantity: "1".to_string(),
            checked: false,
        }]);
        list.merge(flour_g("2"));
        list.merge(Candidate::new(LineKey::canonical(2, None), "1"));
        list.merge(Candidate::new(LineKey::canonical(2, None), "1"));

        let touched: Vec<_> = list.touched().map(|i| i.id).collect();
        assert_eq!(touched, vec![Some(9)]);

        let new: Vec<_> = list.new_items().map(|i| i.quantity.as_str()).collect();
        assert_eq!(new, vec!["2"]);
    }

    #[test]
    fn test_into_items_keeps_list_order() {
        let mut list = WorkingList::new();
        list.merge(Candidate::new(LineKey::legacy("Eggs", ""), "2"));
        list.merge(flour_g("100"));
        list.merge(Candidate::new(LineKey::legacy("eggs", " "), "4"));

        let items = list.into_items();
        let quantities: Vec<_> = items.iter().map(|i| i.quantity.as_str()).collect();
        assert_eq!(quantities, vec!["6", "100"]);
        assert!(items.iter().all(|i| i.id.is_none() && !i.checked));
    }

    #[test]
    fn test_candidate_scaled() {
        let c = flour_g("250").scaled(2);
        assert_eq!(c.quantity, "500");
    }
}
