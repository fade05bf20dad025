use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

/// Calendar-date primary key, YYYY-MM-DD in the user's local timezone.
const DATE_KEY_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn date_key(date: Date) -> String {
    date.format(&DATE_KEY_FORMAT).unwrap_or_default()
}

pub fn parse_date_key(key: &str) -> Option<Date> {
    Date::parse(key, &DATE_KEY_FORMAT).ok()
}

/// Local calendar date for "today". Falls back to UTC when the local
/// offset cannot be determined (multi-threaded processes on some
/// platforms).
pub fn today_local() -> Date {
    let now = OffsetDateTime::now_utc();
    match UtcOffset::current_local_offset() {
        Ok(offset) => now.to_offset(offset).date(),
        Err(_) => now.date(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealSlot {
    pub const ALL: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Dinner,
        MealSlot::Snack,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "breakfast" => Some(Self::Breakfast),
            "lunch" => Some(Self::Lunch),
            "dinner" => Some(Self::Dinner),
            "snack" => Some(Self::Snack),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
            Self::Snack => "Snack",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Cut,
    #[default]
    Maintain,
    Bulk,
}

impl Mode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cut" => Some(Self::Cut),
            "maintain" => Some(Self::Maintain),
            "bulk" => Some(Self::Bulk),
            _ => None,
        }
    }
}

/// One logged food entry. Immutable once created by the search-and-add
/// flow; the content signature below drives merge deduplication.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub grams: f64,
    pub kcal: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ts: Option<OffsetDateTime>,
}

impl FoodItem {
    /// Lenient construction from persisted JSON: wrong-typed fields
    /// degrade to zero/empty instead of failing, non-objects are dropped.
    pub(crate) fn from_value(v: &Value) -> Option<Self> {
        if !v.is_object() {
            return None;
        }
        Some(Self {
            description: str_field(v, "description"),
            brand_name: opt_str_field(v, "brandName"),
            data_type: opt_str_field(v, "dataType"),
            grams: num_field(v, "grams"),
            kcal: num_field(v, "kcal"),
            protein: num_field(v, "protein"),
            carbs: num_field(v, "carbs"),
            fat: num_field(v, "fat"),
            ts: v
                .get("ts")
                .and_then(Value::as_str)
                .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok()),
        })
    }

    /// Composite identity used by merge dedup: two entries with the same
    /// description, portion, calories and timestamp are the same log event.
    pub(crate) fn signature(&self) -> String {
        let ts = self
            .ts
            .map(|t| t.unix_timestamp_nanos().to_string())
            .unwrap_or_default();
        format!("{}|{}|{}|{}", self.description, self.grams, self.kcal, ts)
    }
}

fn str_field(v: &Value, key: &str) -> String {
    v.get(key).and_then(Value::as_str).unwrap_or("").to_string()
}

fn opt_str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn num_field(v: &Value, key: &str) -> f64 {
    match v.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// A day's meal log. All four slots are always present; ordering inside a
/// slot is add-time, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MealLog {
    pub breakfast: Vec<FoodItem>,
    pub lunch: Vec<FoodItem>,
    pub dinner: Vec<FoodItem>,
    pub snack: Vec<FoodItem>,
}

// Persisted logs come from an uncontrolled store: deserialization must
// normalize malformed shapes (non-object, slot not an array, junk items)
// into a valid empty-ish log instead of erroring.
impl<'de> Deserialize<'de> for MealLog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::sanitize(&value))
    }
}

impl MealLog {
    pub fn sanitize(value: &Value) -> Self {
        let slot = |name: &str| -> Vec<FoodItem> {
            value
                .get(name)
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(FoodItem::from_value).collect())
                .unwrap_or_default()
        };
        Self {
            breakfast: slot("Breakfast"),
            lunch: slot("Lunch"),
            dinner: slot("Dinner"),
            snack: slot("Snack"),
        }
    }

    pub fn items(&self, slot: MealSlot) -> &[FoodItem] {
        match slot {
            MealSlot::Breakfast => &self.breakfast,
            MealSlot::Lunch => &self.lunch,
            MealSlot::Dinner => &self.dinner,
            MealSlot::Snack => &self.snack,
        }
    }

    pub fn items_mut(&mut self, slot: MealSlot) -> &mut Vec<FoodItem> {
        match slot {
            MealSlot::Breakfast => &mut self.breakfast,
            MealSlot::Lunch => &mut self.lunch,
            MealSlot::Dinner => &mut self.dinner,
            MealSlot::Snack => &mut self.snack,
        }
    }

    pub fn iter_all(&self) -> impl Iterator<Item = &FoodItem> {
        MealSlot::ALL.iter().flat_map(|slot| self.items(*slot).iter())
    }

    pub fn item_count(&self) -> usize {
        self.iter_all().count()
    }
}

/// Derived aggregate for a meal log; stored alongside a saved day only as
/// a cache, never authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    #[serde(default)]
    pub calories: i64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
}

pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Sum kcal/macros across all four slots. Calories round to the nearest
/// integer, macro grams to one decimal.
pub fn compute_totals(log: &MealLog) -> Totals {
    let (mut kcal, mut protein, mut carbs, mut fat) = (0.0, 0.0, 0.0, 0.0);
    for item in log.iter_all() {
        kcal += item.kcal;
        protein += item.protein;
        carbs += item.carbs;
        fat += item.fat;
    }
    Totals {
        calories: kcal.round() as i64,
        protein: round1(protein),
        carbs: round1(carbs),
        fat: round1(fat),
    }
}

fn default_goal() -> u32 {
    2000
}

fn default_steps() -> u32 {
    2500
}

/// A saved historical day, keyed by date in the days map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    #[serde(default)]
    pub date_key: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub saved_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_goal")]
    pub goal: u32,
    #[serde(default)]
    pub water_cups: u32,
    #[serde(default)]
    pub steps: u32,
    #[serde(default)]
    pub burned: i64,
    #[serde(default)]
    pub meal_log: MealLog,
    #[serde(default)]
    pub totals: Option<Totals>,
}

impl DayRecord {
    /// Stored totals when present, otherwise recomputed from the log.
    pub fn effective_totals(&self) -> Totals {
        self.totals
            .unwrap_or_else(|| compute_totals(&self.meal_log))
    }

    /// Stored burn estimate when positive, otherwise derived from steps.
    pub fn burned_estimate(&self, step_kcal: f64) -> i64 {
        if self.burned > 0 {
            self.burned
        } else {
            (f64::from(self.steps) * step_kcal).round() as i64
        }
    }
}

/// The single in-progress working state for the current date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    #[serde(default)]
    pub date_key: String,
    #[serde(default)]
    pub meal_log: MealLog,
    #[serde(default)]
    pub water_cups: u32,
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_goal")]
    pub daily_goal: u32,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_saved_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl Draft {
    pub fn empty(date_key: String, goal: u32, steps: u32) -> Self {
        Self {
            date_key,
            meal_log: MealLog::default(),
            water_cups: 0,
            steps,
            mode: Mode::default(),
            daily_goal: goal,
            last_saved_at: None,
            updated_at: None,
        }
    }

    /// Draft mirroring a saved record, so edits after adoption don't need
    /// to re-read the saved day.
    pub fn mirroring(saved: &DayRecord, now: OffsetDateTime) -> Self {
        Self {
            date_key: saved.date_key.clone(),
            meal_log: saved.meal_log.clone(),
            water_cups: saved.water_cups,
            steps: saved.steps,
            mode: saved.mode,
            daily_goal: saved.goal,
            last_saved_at: saved.saved_at,
            updated_at: Some(now),
        }
    }
}
