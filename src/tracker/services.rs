use std::collections::BTreeMap;

use serde_json::Value;
use time::{Date, OffsetDateTime};
use tracing::warn;

use crate::config::AppConfig;
use crate::upstream::nutrients::MacroProfile;

use super::merge::merge_meal_logs;
use super::model::{
    compute_totals, date_key, parse_date_key, round1, DayRecord, Draft, FoodItem, MealSlot,
};
use super::repo::DayRepo;

/// Resolve the working state for `today`.
///
/// Precedence: an existing draft for the same date key wins; otherwise a
/// saved record for the key is adopted and a mirroring draft is
/// materialized; otherwise defaults. Never fails — storage trouble reads
/// as the empty state.
pub async fn current_day(repo: &DayRepo, cfg: &AppConfig, today: Date) -> Draft {
    let key = date_key(today);

    if let Some(draft) = repo.load_draft().await {
        if draft.date_key == key {
            return draft;
        }
    }

    let days = repo.load_days().await;
    if let Some(saved) = days.get(&key) {
        let draft = Draft::mirroring(saved, OffsetDateTime::now_utc());
        if let Err(e) = repo.save_draft(&draft).await {
            warn!(error = %e, "could not materialize draft from saved day");
        }
        return draft;
    }

    Draft::empty(key, cfg.default_goal, cfg.default_steps)
}

/// Build a log entry from a USDA food-detail payload and a portion size.
pub fn food_item_from_detail(food: &Value, grams: f64, now: OffsetDateTime) -> FoodItem {
    let per_portion = MacroProfile::from_food(food).for_grams(grams);
    FoodItem {
        description: food
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        brand_name: food
            .get("brandName")
            .or_else(|| food.get("brandOwner"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        data_type: food
            .get("dataType")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        grams,
        kcal: per_portion.kcal.round(),
        protein: round1(per_portion.protein),
        carbs: round1(per_portion.carbs),
        fat: round1(per_portion.fat),
        ts: Some(now),
    }
}

/// Prepend an item to a slot (most recent first) and persist the draft.
pub async fn add_food(
    repo: &DayRepo,
    cfg: &AppConfig,
    today: Date,
    now: OffsetDateTime,
    slot: MealSlot,
    item: FoodItem,
) -> anyhow::Result<Draft> {
    let mut draft = current_day(repo, cfg, today).await;
    draft.meal_log.items_mut(slot).insert(0, item);
    draft.updated_at = Some(now);
    repo.save_draft(&draft).await?;
    Ok(draft)
}

/// Remove the item at `index` within a slot. `None` when out of range.
pub async fn remove_food(
    repo: &DayRepo,
    cfg: &AppConfig,
    today: Date,
    now: OffsetDateTime,
    slot: MealSlot,
    index: usize,
) -> anyhow::Result<Option<Draft>> {
    let mut draft = current_day(repo, cfg, today).await;
    let items = draft.meal_log.items_mut(slot);
    if index >= items.len() {
        return Ok(None);
    }
    items.remove(index);
    draft.updated_at = Some(now);
    repo.save_draft(&draft).await?;
    Ok(Some(draft))
}

#[derive(Debug, Default, Clone)]
pub struct DayPatch {
    pub water_cups: Option<u32>,
    pub steps: Option<u32>,
    pub mode: Option<super::model::Mode>,
    pub daily_goal: Option<u32>,
}

/// Apply field edits to the working state and persist the draft.
pub async fn update_day(
    repo: &DayRepo,
    cfg: &AppConfig,
    today: Date,
    now: OffsetDateTime,
    patch: DayPatch,
) -> anyhow::Result<Draft> {
    let mut draft = current_day(repo, cfg, today).await;
    if let Some(water) = patch.water_cups {
        draft.water_cups = water;
    }
    if let Some(steps) = patch.steps {
        draft.steps = steps;
    }
    if let Some(mode) = patch.mode {
        draft.mode = mode;
    }
    if let Some(goal) = patch.daily_goal {
        draft.daily_goal = goal.max(1);
    }
    draft.updated_at = Some(now);
    repo.save_draft(&draft).await?;
    Ok(draft)
}

/// Save the working state as today's historical record.
///
/// The working log is merged with any previously saved log for the same
/// date key so older items never get deleted, totals are recomputed from
/// the merged log, and the draft is overwritten to mirror the saved
/// record. Saving twice with no edits produces the same meal data (the
/// merge dedup makes the second pass a no-op).
pub async fn save_day(
    repo: &DayRepo,
    cfg: &AppConfig,
    today: Date,
    now: OffsetDateTime,
) -> anyhow::Result<DayRecord> {
    let draft = current_day(repo, cfg, today).await;
    let key = date_key(today);

    let mut days = repo.load_days().await;
    let existing_log = days
        .get(&key)
        .map(|d| d.meal_log.clone())
        .unwrap_or_default();

    let merged = merge_meal_logs(&existing_log, &draft.meal_log);
    let totals = compute_totals(&merged);
    let burned = (f64::from(draft.steps) * cfg.step_kcal_burn).round() as i64;

    let record = DayRecord {
        date_key: key.clone(),
        saved_at: Some(now),
        mode: draft.mode,
        goal: draft.daily_goal,
        water_cups: draft.water_cups,
        steps: draft.steps,
        burned,
        meal_log: merged.clone(),
        totals: Some(totals),
    };
    days.insert(key.clone(), record.clone());
    repo.save_days(&days).await?;

    let mirror = Draft {
        date_key: key,
        meal_log: merged,
        water_cups: draft.water_cups,
        steps: draft.steps,
        mode: draft.mode,
        daily_goal: draft.daily_goal,
        last_saved_at: Some(now),
        updated_at: Some(now),
    };
    repo.save_draft(&mirror).await?;

    Ok(record)
}

/// Drop the draft and reset the working state to defaults. Saved history,
/// including any record already saved for today, is untouched.
pub async fn clear_day(repo: &DayRepo, cfg: &AppConfig, today: Date) -> anyhow::Result<Draft> {
    repo.clear_draft().await?;
    Ok(Draft::empty(
        date_key(today),
        cfg.default_goal,
        cfg.default_steps,
    ))
}

#[derive(Debug, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: bool,
    /// Where the history view should move its selection: the most recent
    /// remaining date, falling back to today's key.
    pub next_selected: Option<String>,
}

/// Remove one saved day. When the deleted key matches the active draft's
/// key the draft is cleared too, so the lifecycle falls back to the empty
/// state instead of resurrecting the deleted day on the next save.
pub async fn delete_day(repo: &DayRepo, key: &str, today: Date) -> anyhow::Result<DeleteOutcome> {
    let mut days = repo.load_days().await;
    if days.remove(key).is_none() {
        return Ok(DeleteOutcome {
            deleted: false,
            next_selected: None,
        });
    }
    repo.save_days(&days).await?;

    if let Some(draft) = repo.load_draft().await {
        if draft.date_key == key {
            repo.clear_draft().await?;
        }
    }

    let next = days
        .keys()
        .next_back()
        .cloned()
        .unwrap_or_else(|| date_key(today));
    Ok(DeleteOutcome {
        deleted: true,
        next_selected: Some(next),
    })
}

#[derive(Debug, Default, Clone)]
pub struct HistoryFilter {
    /// Only days within the last N calendar days (N includes today).
    pub last: Option<u32>,
    pub from: Option<Date>,
    pub to: Option<Date>,
    pub meal: Option<MealSlot>,
    /// Case-insensitive substring match on item descriptions.
    pub q: Option<String>,
}

/// Saved-day keys newest first, narrowed by the history view's filters.
pub fn filter_keys(
    days: &BTreeMap<String, DayRecord>,
    filter: &HistoryFilter,
    today: Date,
) -> Vec<String> {
    let mut keys: Vec<String> = days.keys().rev().cloned().collect();

    if let Some(n) = filter.last.filter(|n| *n > 0) {
        let cutoff = today - time::Duration::days(i64::from(n) - 1);
        keys.retain(|k| parse_date_key(k).is_some_and(|d| d >= cutoff));
    }
    if let Some(from) = filter.from {
        keys.retain(|k| parse_date_key(k).is_some_and(|d| d >= from));
    }
    if let Some(to) = filter.to {
        keys.retain(|k| parse_date_key(k).is_some_and(|d| d <= to));
    }

    let q = filter
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    if filter.meal.is_some() || q.is_some() {
        keys.retain(|k| {
            let Some(day) = days.get(k) else { return false };
            let slots: &[MealSlot] = match filter.meal {
                Some(ref m) => std::slice::from_ref(m),
                None => &MealSlot::ALL,
            };
            let mut items = slots.iter().flat_map(|m| day.meal_log.items(*m).iter());
            match &q {
                Some(q) => items.any(|it| it.description.to_lowercase().contains(q)),
                None => items.next().is_some(),
            }
        });
    }

    keys
}
