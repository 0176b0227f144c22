use anyhow::{anyhow, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of measurement units a food line item can be entered in.
/// The unit drives both the prompt sent to the model and the fallback
/// arithmetic, so adding a variant means touching both of those paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Grams,
    Ml,
    Quantity,
    Slices,
    Size,
    Teaspoon,
    Glass,
}

impl UnitKind {
    pub fn label(&self) -> &'static str {
        match self {
            UnitKind::Grams => "grams",
            UnitKind::Ml => "ml",
            UnitKind::Quantity => "quantity",
            UnitKind::Slices => "slices",
            UnitKind::Size => "size",
            UnitKind::Teaspoon => "teaspoon",
            UnitKind::Glass => "glass",
        }
    }

    /// Sensible starting quantity when the user has not entered one yet.
    pub fn default_quantity(&self) -> Quantity {
        match self {
            UnitKind::Grams => Quantity::Amount(100.0),
            UnitKind::Ml => Quantity::Amount(200.0),
            UnitKind::Size => Quantity::Size(SizeCategory::Medium),
            _ => Quantity::Amount(1.0),
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SizeCategory {
    Small,
    Medium,
    Regular,
    Large,
}

impl SizeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            SizeCategory::Small => "small",
            SizeCategory::Medium => "medium",
            SizeCategory::Regular => "regular",
            SizeCategory::Large => "large",
        }
    }
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Numeric for every unit except `size`, where the "quantity" is one of the
/// fixed size categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Size(SizeCategory),
    Amount(f32),
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Size(category) => f.write_str(category.label()),
            Quantity::Amount(amount) => write!(f, "{}", amount),
        }
    }
}

/// One user-edited line item, transient, discarded once it has produced an
/// estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodQuery {
    pub name: String,
    pub quantity: Quantity,
    pub unit: UnitKind,
}

impl FoodQuery {
    pub fn validate(&self) -> Result<()> {
        match (&self.quantity, self.unit) {
            (Quantity::Size(_), UnitKind::Size) => Ok(()),
            (Quantity::Size(category), unit) => Err(anyhow!(
                "categorical quantity '{}' is only valid for the size unit, not '{}'",
                category,
                unit
            )),
            (Quantity::Amount(amount), _) => {
                if amount.is_finite() && *amount >= 0.0 {
                    Ok(())
                } else {
                    Err(anyhow!("quantity must be a non-negative number, got {}", amount))
                }
            }
        }
    }
}

/// Result of classifying a food name: the default unit, the question to put
/// to the user, and the selector options. Options are display labels; for
/// most categories they are unit names with the default first, for pizza
/// they are the size categories.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub unit: UnitKind,
    pub prompt: &'static str,
    pub options: &'static [&'static str],
}

struct Refinement {
    keywords: &'static [&'static str],
    unit: UnitKind,
    prompt: &'static str,
    options: &'static [&'static str],
}

struct UnitRule {
    keywords: &'static [&'static str],
    unit: UnitKind,
    prompt: &'static str,
    options: &'static [&'static str],
    refinements: &'static [Refinement],
}

const LIQUID_KEYWORDS: &[&str] = &[
    "tea", "coffee", "juice", "milk", "water", "lassi", "shake", "smoothie", "coke", "cola",
    "soda", "sharbat", "beer", "wine",
];

const COUNTED_KEYWORDS: &[&str] = &[
    "roti", "chapati", "paratha", "naan", "idli", "dosa", "samosa", "vada", "momo", "egg",
    "banana", "apple", "biscuit", "cookie", "laddu", "gulab jamun",
];

const SLICED_KEYWORDS: &[&str] = &["cheese", "bread", "toast", "cake", "ham", "salami"];

const ICE_CREAM_KEYWORDS: &[&str] = &["ice cream", "icecream", "kulfi"];

const CONDIMENT_KEYWORDS: &[&str] = &[
    "sugar", "honey", "jam", "ketchup", "sauce", "chutney", "masala", "powder", "salt",
    "turmeric",
];

const ICE_CREAM_REFINEMENTS: &[Refinement] = &[Refinement {
    keywords: &["cone", "stick", "bar", "candy"],
    unit: UnitKind::Quantity,
    prompt: "How many?",
    options: &["quantity", "grams", "ml"],
}];

/// Standard rule set: liquids are measured in ml and the ice-cream branch
/// carries the cone/stick sub-cases.
const STANDARD_RULES: &[UnitRule] = &[
    UnitRule {
        keywords: LIQUID_KEYWORDS,
        unit: UnitKind::Ml,
        prompt: "How many ml?",
        options: &["ml", "glass", "teaspoon", "grams"],
        refinements: &[],
    },
    UnitRule {
        keywords: &["pizza"],
        unit: UnitKind::Size,
        prompt: "What size?",
        options: &["small", "medium", "regular", "large"],
        refinements: &[],
    },
    UnitRule {
        keywords: COUNTED_KEYWORDS,
        unit: UnitKind::Quantity,
        prompt: "How many pieces?",
        options: &["quantity", "grams", "slices"],
        refinements: &[],
    },
    UnitRule {
        keywords: SLICED_KEYWORDS,
        unit: UnitKind::Slices,
        prompt: "How many slices?",
        options: &["slices", "grams", "quantity"],
        refinements: &[],
    },
    UnitRule {
        keywords: ICE_CREAM_KEYWORDS,
        unit: UnitKind::Grams,
        prompt: "How many grams?",
        options: &["grams", "quantity", "ml"],
        refinements: ICE_CREAM_REFINEMENTS,
    },
    UnitRule {
        keywords: CONDIMENT_KEYWORDS,
        unit: UnitKind::Teaspoon,
        prompt: "How many teaspoons?",
        options: &["teaspoon", "grams", "ml"],
        refinements: &[],
    },
];

/// Weight-entry rule set: the variant used by weight-based flows, where
/// liquids default to glasses and ice cream has no sub-cases.
const WEIGHT_ENTRY_RULES: &[UnitRule] = &[
    UnitRule {
        keywords: LIQUID_KEYWORDS,
        unit: UnitKind::Glass,
        prompt: "How many glasses?",
        options: &["glass", "ml", "teaspoon", "grams"],
        refinements: &[],
    },
    UnitRule {
        keywords: &["pizza"],
        unit: UnitKind::Size,
        prompt: "What size?",
        options: &["small", "medium", "regular", "large"],
        refinements: &[],
    },
    UnitRule {
        keywords: COUNTED_KEYWORDS,
        unit: UnitKind::Quantity,
        prompt: "How many pieces?",
        options: &["quantity", "grams", "slices"],
        refinements: &[],
    },
    UnitRule {
        keywords: SLICED_KEYWORDS,
        unit: UnitKind::Slices,
        prompt: "How many slices?",
        options: &["slices", "grams", "quantity"],
        refinements: &[],
    },
    UnitRule {
        keywords: ICE_CREAM_KEYWORDS,
        unit: UnitKind::Grams,
        prompt: "How many grams?",
        options: &["grams", "quantity", "ml"],
        refinements: &[],
    },
    UnitRule {
        keywords: CONDIMENT_KEYWORDS,
        unit: UnitKind::Teaspoon,
        prompt: "How many teaspoons?",
        options: &["teaspoon", "grams", "ml"],
        refinements: &[],
    },
];

const DEFAULT_CLASSIFICATION: Classification = Classification {
    unit: UnitKind::Grams,
    prompt: "How many grams?",
    options: &[
        "grams", "quantity", "ml", "slices", "teaspoon", "glass", "size",
    ],
};

pub struct UnitClassifier {
    rules: &'static [UnitRule],
}

impl UnitClassifier {
    pub fn standard() -> Self {
        Self {
            rules: STANDARD_RULES,
        }
    }

    pub fn weight_entry() -> Self {
        Self {
            rules: WEIGHT_ENTRY_RULES,
        }
    }

    /// Case-insensitive substring match against the rule table, first rule
    /// wins, refinements apply only inside the matched rule. Total: falls
    /// through to grams when nothing matches.
    pub fn classify(&self, food_name: &str) -> Classification {
        let lowered = food_name.to_lowercase();
        for rule in self.rules {
            if rule.keywords.iter().any(|keyword| lowered.contains(keyword)) {
                for refinement in rule.refinements {
                    if refinement
                        .keywords
                        .iter()
                        .any(|keyword| lowered.contains(keyword))
                    {
                        return Classification {
                            unit: refinement.unit,
                            prompt: refinement.prompt,
                            options: refinement.options,
                        };
                    }
                }
                return Classification {
                    unit: rule.unit,
                    prompt: rule.prompt,
                    options: rule.options,
                };
            }
        }
        DEFAULT_CLASSIFICATION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liquids_default_to_ml_with_unit_label_first() {
        let classifier = UnitClassifier::standard();
        for name in ["tea", "orange juice", "milk", "mango lassi"] {
            let classification = classifier.classify(name);
            assert_eq!(classification.unit, UnitKind::Ml, "for {}", name);
            assert!(!classification.options.is_empty());
            assert_eq!(classification.options[0], "ml");
        }
    }

    #[test]
    fn weight_entry_variant_maps_liquids_to_glass() {
        let classifier = UnitClassifier::weight_entry();
        let classification = classifier.classify("masala tea");
        assert_eq!(classification.unit, UnitKind::Glass);
        assert_eq!(classification.options[0], "glass");
    }

    #[test]
    fn pizza_is_sized_with_exact_options() {
        let classification = UnitClassifier::standard().classify("Chicken Pizza");
        assert_eq!(classification.unit, UnitKind::Size);
        assert_eq!(
            classification.options,
            &["small", "medium", "regular", "large"]
        );
    }

    #[test]
    fn counted_items_use_quantity() {
        let classifier = UnitClassifier::standard();
        assert_eq!(classifier.classify("roti").unit, UnitKind::Quantity);
        assert_eq!(classifier.classify("2 samosas").unit, UnitKind::Quantity);
    }

    #[test]
    fn sliceable_items_use_slices() {
        let classification = UnitClassifier::standard().classify("cheddar cheese");
        assert_eq!(classification.unit, UnitKind::Slices);
        assert_eq!(classification.options[0], "slices");
    }

    #[test]
    fn ice_cream_cone_refinement_only_in_standard_rules() {
        let standard = UnitClassifier::standard().classify("ice cream cone");
        assert_eq!(standard.unit, UnitKind::Quantity);

        let weight = UnitClassifier::weight_entry().classify("ice cream cone");
        assert_eq!(weight.unit, UnitKind::Grams);
    }

    #[test]
    fn plain_ice_cream_stays_in_grams() {
        let classification = UnitClassifier::standard().classify("vanilla ice cream");
        assert_eq!(classification.unit, UnitKind::Grams);
    }

    #[test]
    fn condiments_use_teaspoons() {
        let classification = UnitClassifier::standard().classify("honey");
        assert_eq!(classification.unit, UnitKind::Teaspoon);
    }

    #[test]
    fn butter_falls_through_to_grams_default() {
        let classification = UnitClassifier::standard().classify("butter");
        assert_eq!(classification.unit, UnitKind::Grams);
        assert_eq!(classification.options[0], "grams");
    }

    #[test]
    fn classification_is_case_insensitive() {
        let classifier = UnitClassifier::standard();
        assert_eq!(classifier.classify("PIZZA").unit, UnitKind::Size);
        assert_eq!(classifier.classify("Roti").unit, UnitKind::Quantity);
    }

    #[test]
    fn query_validation_rejects_mismatched_quantities() {
        let bad = FoodQuery {
            name: "tea".to_string(),
            quantity: Quantity::Size(SizeCategory::Large),
            unit: UnitKind::Ml,
        };
        assert!(bad.validate().is_err());

        let negative = FoodQuery {
            name: "rice".to_string(),
            quantity: Quantity::Amount(-5.0),
            unit: UnitKind::Grams,
        };
        assert!(negative.validate().is_err());

        let good = FoodQuery {
            name: "pizza".to_string(),
            quantity: Quantity::Size(SizeCategory::Medium),
            unit: UnitKind::Size,
        };
        assert!(good.validate().is_ok());
    }
}
