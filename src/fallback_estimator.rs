use crate::nutrition_estimator::NutritionEstimate;
use crate::unit_classifier::{Quantity, SizeCategory, UnitKind};

/// Confidence pinned on every fallback result so downstream consumers can
/// tell the estimate is degraded.
pub const FALLBACK_CONFIDENCE: f32 = 0.3;

const CALORIES_PER_GRAM: f32 = 1.5;
const CALORIES_PER_ML: f32 = 0.6;
const CALORIES_PER_TEASPOON: f32 = 20.0;
const CALORIES_PER_GLASS: f32 = 120.0;
const CALORIES_PER_SLICE: f32 = 70.0;
const CALORIES_PER_PIECE: f32 = 120.0;

// Per-piece overrides for foods whose typical serving is far from the
// generic piece constant.
const PIECE_OVERRIDES: &[(&str, f32)] = &[
    ("roti", 80.0),
    ("chapati", 80.0),
    ("pizza", 285.0),
    ("samosa", 260.0),
];

fn per_piece_calories(food_name: &str) -> f32 {
    let lowered = food_name.to_lowercase();
    for (keyword, calories) in PIECE_OVERRIDES {
        if lowered.contains(keyword) {
            return *calories;
        }
    }
    CALORIES_PER_PIECE
}

fn size_calories(category: SizeCategory) -> f32 {
    match category {
        SizeCategory::Small => 600.0,
        SizeCategory::Medium | SizeCategory::Regular => 850.0,
        SizeCategory::Large => 1200.0,
    }
}

fn numeric_amount(quantity: &Quantity) -> f32 {
    match quantity {
        Quantity::Amount(amount) => amount.max(0.0),
        // A categorical quantity under a non-size unit counts as one serving.
        Quantity::Size(_) => 1.0,
    }
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

/// Deterministic estimator used whenever the model call fails or returns
/// garbage. Total: always returns a value. Macro fields are fixed fractions
/// of the calorie figure — an approximation, not a physical conversion.
pub fn fallback_estimate(food_name: &str, quantity: &Quantity, unit: UnitKind) -> NutritionEstimate {
    let calories = match unit {
        UnitKind::Grams => numeric_amount(quantity) * CALORIES_PER_GRAM,
        UnitKind::Ml => numeric_amount(quantity) * CALORIES_PER_ML,
        UnitKind::Teaspoon => numeric_amount(quantity) * CALORIES_PER_TEASPOON,
        UnitKind::Glass => numeric_amount(quantity) * CALORIES_PER_GLASS,
        UnitKind::Slices => numeric_amount(quantity) * CALORIES_PER_SLICE,
        UnitKind::Quantity => numeric_amount(quantity) * per_piece_calories(food_name),
        UnitKind::Size => match quantity {
            Quantity::Size(category) => size_calories(*category),
            Quantity::Amount(amount) => amount.max(0.0) * size_calories(SizeCategory::Medium),
        },
    };

    NutritionEstimate {
        calories: round1(calories),
        protein: round1(calories * 0.10),
        carbs: round1(calories * 0.15),
        fat: round1(calories * 0.05),
        fiber: round1(calories * 0.03),
        sugar: Some(round1(calories * 0.02)),
        confidence: FALLBACK_CONFIDENCE,
    }
}
