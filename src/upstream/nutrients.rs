use serde_json::Value;

/// Macro amounts per 100 g of a food.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MacroProfile {
    pub kcal: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

// Canonical macro keys mapped to acceptable upstream name fragments,
// matched case-insensitively. USDA nutrient names vary across data types
// ("Energy", "Energy (Atwater General Factors)", "Carbohydrate, by
// difference", "Total lipid (fat)"), so exact-name lookups miss entries.
const KCAL_NAMES: &[&str] = &["energy"];
const PROTEIN_NAMES: &[&str] = &["protein"];
const CARB_NAMES: &[&str] = &["carbohydrate"];
const FAT_NAMES: &[&str] = &["total lipid", "total fat"];

impl MacroProfile {
    /// Pull the four macro amounts out of a USDA food-detail payload.
    /// Tolerates both nutrient shapes the API emits: the nested
    /// `{nutrient: {name, unitName}, amount}` form and the flat
    /// `{nutrientName, unitName, value}` form. Unknown or missing
    /// nutrients contribute zero.
    pub fn from_food(food: &Value) -> Self {
        let empty = Vec::new();
        let nutrients = food
            .get("foodNutrients")
            .and_then(Value::as_array)
            .unwrap_or(&empty);

        Self {
            // Energy appears in both kcal and kJ rows; prefer the kcal one.
            kcal: find_amount(nutrients, KCAL_NAMES, Some("kcal")),
            protein: find_amount(nutrients, PROTEIN_NAMES, None),
            carbs: find_amount(nutrients, CARB_NAMES, None),
            fat: find_amount(nutrients, FAT_NAMES, None),
        }
    }

    /// Scale from per-100 g to a portion.
    pub fn for_grams(&self, grams: f64) -> Self {
        let ratio = grams / 100.0;
        Self {
            kcal: self.kcal * ratio,
            protein: self.protein * ratio,
            carbs: self.carbs * ratio,
            fat: self.fat * ratio,
        }
    }
}

fn find_amount(nutrients: &[Value], needles: &[&str], prefer_unit: Option<&str>) -> f64 {
    let matches = |n: &Value| -> bool {
        let name = nutrient_name(n).to_lowercase();
        needles.iter().any(|needle| name.contains(needle))
    };

    if let Some(unit) = prefer_unit {
        let preferred = nutrients
            .iter()
            .find(|n| matches(n) && nutrient_unit(n).eq_ignore_ascii_case(unit));
        if let Some(n) = preferred {
            return nutrient_amount(n);
        }
    }

    nutrients
        .iter()
        .find(|n| matches(n))
        .map(nutrient_amount)
        .unwrap_or(0.0)
}

fn nutrient_name(n: &Value) -> &str {
    n.pointer("/nutrient/name")
        .or_else(|| n.get("nutrientName"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn nutrient_unit(n: &Value) -> &str {
    n.pointer("/nutrient/unitName")
        .or_else(|| n.get("unitName"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn nutrient_amount(n: &Value) -> f64 {
    n.get("amount")
        .or_else(|| n.get("value"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}
