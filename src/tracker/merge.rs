use std::collections::HashSet;

use super::model::{FoodItem, MealLog, MealSlot};

/// Combine a saved day's log with the current draft without losing any
/// previously saved item, even when the draft was loaded from a stale
/// snapshot. Per slot: existing items keep precedence at the front, then
/// draft items, deduplicated by content signature (first occurrence wins).
/// Totals must be recomputed from the result; the stored cache is stale
/// after a merge.
pub fn merge_meal_logs(existing: &MealLog, incoming: &MealLog) -> MealLog {
    let mut merged = MealLog::default();
    for slot in MealSlot::ALL {
        *merged.items_mut(slot) =
            dedupe(existing.items(slot).iter().chain(incoming.items(slot)));
    }
    merged
}

fn dedupe<'a, I>(items: I) -> Vec<FoodItem>
where
    I: IntoIterator<Item = &'a FoodItem>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.signature()) {
            out.push(item.clone());
        }
    }
    out
}
