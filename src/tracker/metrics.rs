use serde::Serialize;

use super::model::{round1, Mode};

// Fixed business rules carried over from the product, not validated
// physiology. Calorie bands are kcal per kg of body weight.
const CUT_BAND: (f64, f64) = (20.0, 25.0);
const MAINTAIN_BAND: (f64, f64) = (25.0, 30.0);
const BULK_BAND: (f64, f64) = (30.0, 35.0);

const UNDERWEIGHT_ADJUST: i64 = 150;
const OVERWEIGHT_ADJUST: i64 = -150;
const OBESITY_ADJUST: i64 = -250;

const MIN_SUGGESTED_CALORIES: i64 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obesity,
}

/// Daily macro gram targets per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroTargets {
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
}

/// BMI to one decimal; `None` when height is missing/zero.
pub fn bmi(height_cm: f64, weight_kg: f64) -> Option<f64> {
    let height_m = height_cm / 100.0;
    if height_m <= 0.0 {
        return None;
    }
    Some(round1(weight_kg.max(0.0) / (height_m * height_m)))
}

pub fn bmi_category(bmi: f64) -> BmiCategory {
    if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Overweight
    } else {
        BmiCategory::Obesity
    }
}

/// Suggested daily calorie goal: midpoint of the mode's per-kg band,
/// nudged by BMI category, never below the floor. `None` without a usable
/// weight.
pub fn suggested_calories(weight_kg: f64, mode: Mode, category: Option<BmiCategory>) -> Option<u32> {
    if weight_kg <= 0.0 {
        return None;
    }
    let (low, high) = match mode {
        Mode::Cut => CUT_BAND,
        Mode::Maintain => MAINTAIN_BAND,
        Mode::Bulk => BULK_BAND,
    };
    let adjust = match category {
        Some(BmiCategory::Underweight) => UNDERWEIGHT_ADJUST,
        Some(BmiCategory::Overweight) => OVERWEIGHT_ADJUST,
        Some(BmiCategory::Obesity) => OBESITY_ADJUST,
        _ => 0,
    };
    let mid = ((low + high) / 2.0 * weight_kg).round() as i64 + adjust;
    Some(mid.max(MIN_SUGGESTED_CALORIES) as u32)
}

pub fn macro_targets(mode: Mode) -> MacroTargets {
    match mode {
        Mode::Cut => MacroTargets {
            protein: 160,
            carbs: 180,
            fat: 55,
        },
        Mode::Maintain => MacroTargets {
            protein: 150,
            carbs: 220,
            fat: 65,
        },
        Mode::Bulk => MacroTargets {
            protein: 170,
            carbs: 280,
            fat: 75,
        },
    }
}
