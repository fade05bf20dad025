use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::metrics::{BmiCategory, MacroTargets};
use super::model::{compute_totals, DayRecord, Draft, MealLog, Mode, Totals};

/// Working state plus the derived figures the dashboard shows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub date_key: String,
    pub meal_log: MealLog,
    pub water_cups: u32,
    pub steps: u32,
    pub mode: Mode,
    pub daily_goal: u32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_saved_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    pub totals: Totals,
    pub remaining: i64,
    pub percent: u8,
}

impl From<Draft> for DayView {
    fn from(d: Draft) -> Self {
        let totals = compute_totals(&d.meal_log);
        let remaining = (i64::from(d.daily_goal) - totals.calories).max(0);
        let percent = if d.daily_goal == 0 {
            0
        } else {
            ((totals.calories as f64 / f64::from(d.daily_goal) * 100.0).round())
                .clamp(0.0, 100.0) as u8
        };
        Self {
            date_key: d.date_key,
            meal_log: d.meal_log,
            water_cups: d.water_cups,
            steps: d.steps,
            mode: d.mode,
            daily_goal: d.daily_goal,
            last_saved_at: d.last_saved_at,
            updated_at: d.updated_at,
            totals,
            remaining,
            percent,
        }
    }
}

/// Upstream food ids arrive as numbers from search payloads but are
/// opaque strings to us.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FdcId {
    Num(u64),
    Str(String),
}

impl FdcId {
    pub fn into_string(self) -> String {
        match self {
            Self::Num(n) => n.to_string(),
            Self::Str(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFoodRequest {
    pub meal: String,
    pub fdc_id: FdcId,
    pub grams: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDayRequest {
    pub water_cups: Option<u32>,
    pub steps: Option<u32>,
    pub mode: Option<Mode>,
    pub daily_goal: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date_key: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub saved_at: Option<OffsetDateTime>,
    pub mode: Mode,
    pub goal: u32,
    pub totals: Totals,
    pub items: usize,
}

impl From<&DayRecord> for DaySummary {
    fn from(day: &DayRecord) -> Self {
        Self {
            date_key: day.date_key.clone(),
            saved_at: day.saved_at,
            mode: day.mode,
            goal: day.goal,
            totals: day.effective_totals(),
            items: day.meal_log.item_count(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub last: Option<u32>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub meal: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDayResponse {
    pub next_selected: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQuery {
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub bmi: Option<f64>,
    pub category: Option<BmiCategory>,
    pub suggested_calories: Option<u32>,
    pub targets: MacroTargets,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeekQuery {
    /// Date key the 7-day window ends at; defaults to today.
    pub end: Option<String>,
}
