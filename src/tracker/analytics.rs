use std::collections::BTreeMap;

use serde::Serialize;
use time::Date;

use super::model::{date_key, round1, DayRecord, Mode, Totals};

/// One bar in the 7-day trend.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayPoint {
    pub date_key: String,
    pub calories: i64,
    pub goal: u32,
    /// Share of the goal consumed, clamped to 100.
    pub pct: u8,
    pub has_data: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroSplit {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Aggregate view for the analytics page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub daily_goal: u32,
    pub mode: Mode,
    pub last7: Vec<DayPoint>,
    /// Average calories over the window's days that have data, one decimal.
    pub avg7: f64,
    pub best_day: i64,
    pub worst_day: i64,
    /// Share (0-100) of logged days in the window at or under the goal.
    pub hit_rate: u8,
    pub consumed_today: i64,
    pub remaining_today: i64,
    pub burned_today: i64,
    pub net_today: i64,
    pub macros: MacroSplit,
    pub has_today: bool,
}

fn percent(calories: i64, goal: u32) -> u8 {
    if goal == 0 {
        return 0;
    }
    let pct = (calories as f64 / f64::from(goal) * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// The seven local calendar days ending at `end`, as trend bars. Days
/// without a saved record contribute zero calories and the fallback goal.
pub fn week_trend(
    days: &BTreeMap<String, DayRecord>,
    end: Date,
    fallback_goal: u32,
) -> Vec<DayPoint> {
    (0..7)
        .rev()
        .map(|offset| {
            let date = end - time::Duration::days(offset);
            let key = date_key(date);
            match days.get(&key) {
                Some(day) => {
                    let calories = day.effective_totals().calories;
                    let goal = if day.goal > 0 { day.goal } else { fallback_goal };
                    DayPoint {
                        date_key: key,
                        calories,
                        goal,
                        pct: percent(calories, goal),
                        has_data: true,
                    }
                }
                None => DayPoint {
                    date_key: key,
                    calories: 0,
                    goal: fallback_goal,
                    pct: 0,
                    has_data: false,
                },
            }
        })
        .collect()
}

/// Analytics over the whole days map, anchored at `today`. Averages and
/// best/worst only consider window days with calories above zero so unsaved
/// days don't drag the numbers down.
pub fn summarize(
    days: &BTreeMap<String, DayRecord>,
    today: Date,
    default_goal: u32,
    step_kcal: f64,
) -> Summary {
    let today_rec = days.get(&date_key(today));
    let daily_goal = today_rec
        .map(|d| d.goal)
        .filter(|g| *g > 0)
        .unwrap_or(default_goal);
    let mode = today_rec.map(|d| d.mode).unwrap_or_default();

    let last7 = week_trend(days, today, daily_goal);
    let logged: Vec<i64> = last7
        .iter()
        .filter(|p| p.calories > 0)
        .map(|p| p.calories)
        .collect();

    let avg7 = if logged.is_empty() {
        0.0
    } else {
        round1(logged.iter().sum::<i64>() as f64 / logged.len() as f64)
    };
    let best_day = logged.iter().copied().max().unwrap_or(0);
    let worst_day = logged.iter().copied().min().unwrap_or(0);
    let hit_rate = if logged.is_empty() {
        0
    } else {
        let hits = logged
            .iter()
            .filter(|c| **c <= i64::from(daily_goal))
            .count();
        (hits as f64 / logged.len() as f64 * 100.0).round() as u8
    };

    let totals = today_rec
        .map(DayRecord::effective_totals)
        .unwrap_or(Totals::default());
    let consumed_today = totals.calories;
    let burned_today = today_rec
        .map(|d| d.burned_estimate(step_kcal))
        .unwrap_or(0);

    Summary {
        daily_goal,
        mode,
        last7,
        avg7,
        best_day,
        worst_day,
        hit_rate,
        consumed_today,
        remaining_today: (i64::from(daily_goal) - consumed_today).max(0),
        burned_today,
        net_today: (consumed_today - burned_today).max(0),
        macros: MacroSplit {
            protein: totals.protein,
            carbs: totals.carbs,
            fat: totals.fat,
        },
        has_today: today_rec.is_some(),
    }
}
