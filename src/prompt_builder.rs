use crate::unit_classifier::{Quantity, UnitKind};

/// Shared instruction suffix fixing the output shape. Every unit template
/// ends with this so the estimation client can parse one format.
const RESPONSE_SHAPE_SUFFIX: &str = "Respond with a single JSON object and nothing else, \
in exactly this form: \
{\"nutrition\": {\"calories\": number, \"protein\": number, \"carbs\": number, \
\"fat\": number, \"fiber\": number, \"sugar\": number}, \"confidence\": number}. \
All nutrition values except calories are grams. \
confidence is your certainty in the estimate, between 0 and 1.";

/// Builds the natural-language instruction for one food line item. Pure text
/// construction; the unit picks a context block carrying the measurement
/// heuristics the model should apply.
pub fn build_prompt(food_name: &str, quantity: &Quantity, unit: UnitKind) -> String {
    let context = match unit {
        UnitKind::Grams => format!(
            "Estimate the nutrition of {} grams of {}. \
Base the estimate on the cooked, as-served form unless the name says otherwise.",
            quantity, food_name
        ),
        UnitKind::Ml => format!(
            "Estimate the nutrition of {} ml of {}. \
The quantity is a liquid volume in milliliters.",
            quantity, food_name
        ),
        UnitKind::Teaspoon => format!(
            "Estimate the nutrition of {} teaspoon(s) of {}. \
Assume 1 teaspoon = 5 ml, which is roughly 4 to 7 grams for most condiments and spices.",
            quantity, food_name
        ),
        UnitKind::Glass => format!(
            "Estimate the nutrition of {} glass(es) of {}. \
Assume 1 Indian glass is roughly 200-250 ml; use 225 ml if unsure.",
            quantity, food_name
        ),
        UnitKind::Quantity => format!(
            "Estimate the nutrition of {} piece(s) of {}. \
Use typical Indian serving weights for counted items: one roti is about 40 g, \
one idli about 50 g, one samosa about 100 g, one egg about 50 g.",
            quantity, food_name
        ),
        UnitKind::Slices => format!(
            "Estimate the nutrition of {} slice(s) of {}. \
Assume one slice of bread is about 25 g and one slice of cheese about 20 g.",
            quantity, food_name
        ),
        UnitKind::Size => format!(
            "Estimate the nutrition of one {} {}. \
For pizza, use these calorie bands: a small pizza is about 500-650 kcal in total, \
a medium or regular one about 750-900 kcal, a large one about 1100-1300 kcal.",
            quantity, food_name
        ),
    };

    format!("{} {}", context, RESPONSE_SHAPE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit_classifier::SizeCategory;

    #[test]
    fn teaspoon_prompt_carries_volume_heuristic() {
        let prompt = build_prompt("honey", &Quantity::Amount(2.0), UnitKind::Teaspoon);
        assert!(prompt.contains("2 teaspoon(s) of honey"));
        assert!(prompt.contains("1 teaspoon = 5 ml"));
    }

    #[test]
    fn glass_prompt_carries_indian_glass_volume() {
        let prompt = build_prompt("lassi", &Quantity::Amount(1.0), UnitKind::Glass);
        assert!(prompt.contains("200-250 ml"));
    }

    #[test]
    fn size_prompt_embeds_the_categorical_quantity() {
        let prompt = build_prompt(
            "pizza",
            &Quantity::Size(SizeCategory::Large),
            UnitKind::Size,
        );
        assert!(prompt.contains("one large pizza"));
        assert!(prompt.contains("1100-1300 kcal"));
    }

    #[test]
    fn every_unit_ends_with_the_shared_shape_suffix() {
        for unit in [
            UnitKind::Grams,
            UnitKind::Ml,
            UnitKind::Quantity,
            UnitKind::Slices,
            UnitKind::Size,
            UnitKind::Teaspoon,
            UnitKind::Glass,
        ] {
            let quantity = unit.default_quantity();
            let prompt = build_prompt("food", &quantity, unit);
            assert!(
                prompt.ends_with(RESPONSE_SHAPE_SUFFIX),
                "missing suffix for {:?}",
                unit
            );
        }
    }

    #[test]
    fn prompt_is_deterministic() {
        let a = build_prompt("roti", &Quantity::Amount(2.0), UnitKind::Quantity);
        let b = build_prompt("roti", &Quantity::Amount(2.0), UnitKind::Quantity);
        assert_eq!(a, b);
    }
}
