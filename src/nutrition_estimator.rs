use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::Duration;

use crate::api_connection::connection::ApiConnectionError;
use crate::api_connection::endpoints::Provider;
use crate::fallback_estimator::fallback_estimate;
use crate::json_scan::{extract_json_object, strip_code_fences};
use crate::prompt_builder::build_prompt;
use crate::unit_classifier::FoodQuery;

/// Universal output of the estimation pipeline. Both the model path and the
/// deterministic fallback produce this shape, so downstream aggregation
/// cannot tell the source apart structurally — only `confidence` hints at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionEstimate {
    pub calories: f32,
    pub protein: f32,
    pub carbs: f32,
    pub fat: f32,
    pub fiber: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f32>,
    pub confidence: f32,
}

#[derive(Debug)]
pub enum EstimationError {
    Api(ApiConnectionError),
    NoJsonFound,
    Malformed(serde_json::Error),
    InvalidValues(String),
}

impl fmt::Display for EstimationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimationError::Api(err) => write!(f, "API call failed: {}", err),
            EstimationError::NoJsonFound => {
                write!(f, "no JSON object found in the model response")
            }
            EstimationError::Malformed(err) => {
                write!(f, "model response JSON did not match the expected shape: {}", err)
            }
            EstimationError::InvalidValues(detail) => {
                write!(f, "model response contained invalid values: {}", detail)
            }
        }
    }
}

impl Error for EstimationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EstimationError::Api(err) => Some(err),
            EstimationError::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiConnectionError> for EstimationError {
    fn from(err: ApiConnectionError) -> Self {
        EstimationError::Api(err)
    }
}

#[derive(Debug, Deserialize)]
struct NutritionFields {
    calories: f32,
    protein: f32,
    carbs: f32,
    fat: f32,
    fiber: f32,
    sugar: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct NutritionPayload {
    nutrition: NutritionFields,
    confidence: f32,
}

/// Parses and validates an estimate out of raw model text. Every required
/// field must be present, numeric, finite and non-negative; confidence is
/// clamped into [0, 1]. Anything else is an error the caller turns into a
/// fallback.
pub fn parse_estimate(text: &str) -> Result<NutritionEstimate, EstimationError> {
    let stripped = strip_code_fences(text);
    let object = extract_json_object(stripped).ok_or(EstimationError::NoJsonFound)?;
    let payload: NutritionPayload =
        serde_json::from_str(object).map_err(EstimationError::Malformed)?;

    let required = [
        ("calories", payload.nutrition.calories),
        ("protein", payload.nutrition.protein),
        ("carbs", payload.nutrition.carbs),
        ("fat", payload.nutrition.fat),
        ("fiber", payload.nutrition.fiber),
    ];
    for (field, value) in required {
        if !value.is_finite() || value < 0.0 {
            return Err(EstimationError::InvalidValues(format!(
                "{} must be a non-negative number, got {}",
                field, value
            )));
        }
    }
    if let Some(sugar) = payload.nutrition.sugar {
        if !sugar.is_finite() || sugar < 0.0 {
            return Err(EstimationError::InvalidValues(format!(
                "sugar must be a non-negative number, got {}",
                sugar
            )));
        }
    }
    if !payload.confidence.is_finite() {
        return Err(EstimationError::InvalidValues(format!(
            "confidence must be a number, got {}",
            payload.confidence
        )));
    }

    Ok(NutritionEstimate {
        calories: payload.nutrition.calories,
        protein: payload.nutrition.protein,
        carbs: payload.nutrition.carbs,
        fat: payload.nutrition.fat,
        fiber: payload.nutrition.fiber,
        sugar: payload.nutrition.sugar,
        confidence: payload.confidence.clamp(0.0, 1.0),
    })
}

/// One model call for one line item. No retry here; callers that want
/// graceful degradation use `estimate_or_fallback`.
pub async fn estimate(
    provider: &Provider,
    query: &FoodQuery,
) -> Result<NutritionEstimate, EstimationError> {
    let prompt = build_prompt(&query.name, &query.quantity, query.unit);
    let text = provider.generate_text(&prompt).await?;
    parse_estimate(&text)
}

/// Never fails: any estimation error degrades to the deterministic fallback
/// so the caller always gets a number.
pub async fn estimate_or_fallback(provider: &Provider, query: &FoodQuery) -> NutritionEstimate {
    match estimate(provider, query).await {
        Ok(result) => result,
        Err(err) => {
            eprintln!(
                "   -> Estimation failed for '{}': {}. Using fallback.",
                query.name, err
            );
            fallback_estimate(&query.name, &query.quantity, query.unit)
        }
    }
}

const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Entry point for quantity/unit edits: retries once after a fixed delay
/// before degrading to the fallback. This is the only retrying call site;
/// the bulk meal path fails straight to the fallback.
pub async fn refresh_estimate(provider: &Provider, query: &FoodQuery) -> NutritionEstimate {
    match estimate(provider, query).await {
        Ok(result) => result,
        Err(first_err) => {
            eprintln!(
                "   -> Refresh estimate for '{}' failed ({}), retrying in {:?}...",
                query.name, first_err, RETRY_DELAY
            );
            tokio::time::sleep(RETRY_DELAY).await;
            match estimate(provider, query).await {
                Ok(result) => result,
                Err(retry_err) => {
                    eprintln!(
                        "   -> Retry also failed for '{}': {}. Using fallback.",
                        query.name, retry_err
                    );
                    fallback_estimate(&query.name, &query.quantity, query.unit)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let text = r#"{"nutrition": {"calories": 220, "protein": 7, "carbs": 30, "fat": 8, "fiber": 4, "sugar": 3}, "confidence": 0.85}"#;
        let estimate = parse_estimate(text).unwrap();
        assert_eq!(estimate.calories, 220.0);
        assert_eq!(estimate.sugar, Some(3.0));
        assert_eq!(estimate.confidence, 0.85);
    }

    #[test]
    fn parses_json_wrapped_in_prose_and_fences() {
        let text = "Here is my estimate:\n```json\n{\"nutrition\": {\"calories\": 160, \"protein\": 5, \"carbs\": 28, \"fat\": 3, \"fiber\": 4}, \"confidence\": 0.7}\n```\nLet me know!";
        let estimate = parse_estimate(text).unwrap();
        assert_eq!(estimate.calories, 160.0);
        assert_eq!(estimate.sugar, None);
    }

    #[test]
    fn missing_field_is_malformed() {
        let text = r#"{"nutrition": {"calories": 100, "protein": 2, "carbs": 10, "fat": 1}, "confidence": 0.5}"#;
        assert!(matches!(
            parse_estimate(text),
            Err(EstimationError::Malformed(_))
        ));
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        let text = r#"{"nutrition": {"calories": "lots", "protein": 2, "carbs": 10, "fat": 1, "fiber": 1}, "confidence": 0.5}"#;
        assert!(matches!(
            parse_estimate(text),
            Err(EstimationError::Malformed(_))
        ));
    }

    #[test]
    fn negative_macro_is_rejected() {
        let text = r#"{"nutrition": {"calories": 100, "protein": -2, "carbs": 10, "fat": 1, "fiber": 1}, "confidence": 0.5}"#;
        assert!(matches!(
            parse_estimate(text),
            Err(EstimationError::InvalidValues(_))
        ));
    }

    #[test]
    fn confidence_is_clamped_into_unit_interval() {
        let text = r#"{"nutrition": {"calories": 100, "protein": 2, "carbs": 10, "fat": 1, "fiber": 1}, "confidence": 1.4}"#;
        let estimate = parse_estimate(text).unwrap();
        assert_eq!(estimate.confidence, 1.0);
    }

    #[test]
    fn text_without_json_is_no_json_found() {
        assert!(matches!(
            parse_estimate("I cannot estimate that."),
            Err(EstimationError::NoJsonFound)
        ));
    }
}
