use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api_connection::endpoints::Provider;
use crate::nutrition_estimator::{estimate_or_fallback, NutritionEstimate};
use crate::unit_classifier::{FoodQuery, Quantity, SizeCategory, UnitKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        };
        f.write_str(label)
    }
}

/// The finalized record handed to the persistence collaborator. This module
/// only produces it; storage, date-range queries and deletion live outside
/// the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub name: String,
    pub calories: f32,
    pub protein: f32,
    pub carbs: f32,
    pub fat: f32,
    pub fiber: f32,
    #[serde(rename = "type")]
    pub meal_type: MealType,
    pub weight: f32,
}

const GRAMS_PER_TEASPOON: f32 = 5.0;
const GRAMS_PER_GLASS: f32 = 225.0;
const GRAMS_PER_SLICE: f32 = 25.0;
const GRAMS_PER_PIECE: f32 = 80.0;

fn size_weight_grams(category: SizeCategory) -> f32 {
    match category {
        SizeCategory::Small => 400.0,
        SizeCategory::Medium | SizeCategory::Regular => 600.0,
        SizeCategory::Large => 900.0,
    }
}

/// Coarse per-unit weight of one line item, used only to fill the record's
/// `weight` field. Liquids count 1 g/ml.
pub fn approximate_weight_grams(query: &FoodQuery) -> f32 {
    let amount = match &query.quantity {
        Quantity::Amount(amount) => amount.max(0.0),
        Quantity::Size(category) => {
            return size_weight_grams(*category);
        }
    };
    match query.unit {
        UnitKind::Grams | UnitKind::Ml => amount,
        UnitKind::Teaspoon => amount * GRAMS_PER_TEASPOON,
        UnitKind::Glass => amount * GRAMS_PER_GLASS,
        UnitKind::Slices => amount * GRAMS_PER_SLICE,
        UnitKind::Quantity => amount * GRAMS_PER_PIECE,
        UnitKind::Size => amount * size_weight_grams(SizeCategory::Medium),
    }
}

/// Pure aggregation of already-estimated items. The record name preserves
/// the input order.
pub fn aggregate(items: &[(FoodQuery, NutritionEstimate)], meal_type: MealType) -> MealRecord {
    let mut record = MealRecord {
        name: String::new(),
        calories: 0.0,
        protein: 0.0,
        carbs: 0.0,
        fat: 0.0,
        fiber: 0.0,
        meal_type,
        weight: 0.0,
    };

    let names: Vec<&str> = items.iter().map(|(query, _)| query.name.as_str()).collect();
    record.name = names.join(", ");

    for (query, estimate) in items {
        record.calories += estimate.calories;
        record.protein += estimate.protein;
        record.carbs += estimate.carbs;
        record.fat += estimate.fat;
        record.fiber += estimate.fiber;
        record.weight += approximate_weight_grams(query);
    }
    record
}

/// Estimates a whole meal, one item at a time, in list order. Sequential on
/// purpose: a meal is typically 1-5 items and per-item model latency
/// dominates regardless of ordering. Each item degrades to the fallback
/// independently, so this never fails.
pub async fn calculate_meal(
    provider: &Provider,
    queries: &[FoodQuery],
    meal_type: MealType,
) -> MealRecord {
    let mut items: Vec<(FoodQuery, NutritionEstimate)> = Vec::with_capacity(queries.len());
    for (index, query) in queries.iter().enumerate() {
        println!(
            "Estimating item {}/{}: {} ({} {})",
            index + 1,
            queries.len(),
            query.name,
            query.quantity,
            query.unit
        );
        let estimate = estimate_or_fallback(provider, query).await;
        items.push((query.clone(), estimate));
    }
    aggregate(&items, meal_type)
}
