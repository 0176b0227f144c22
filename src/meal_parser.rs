use std::error::Error;
use std::fmt;

use crate::api_connection::connection::ApiConnectionError;
use crate::api_connection::endpoints::Provider;
use crate::json_scan::{extract_json_array, strip_code_fences};

/// Word-count ceiling for the single-item fast path. A tunable heuristic,
/// not a grammar.
pub const SINGLE_ITEM_MAX_WORDS: usize = 3;

const CONJUNCTION_WORDS: &[&str] = &["and", "with"];

#[derive(Debug)]
pub enum ParseError {
    Api(ApiConnectionError),
    NoArrayFound,
    Malformed(serde_json::Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Api(err) => write!(f, "API call failed: {}", err),
            ParseError::NoArrayFound => write!(f, "no JSON array found in the model response"),
            ParseError::Malformed(err) => {
                write!(f, "model response array did not parse: {}", err)
            }
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParseError::Api(err) => Some(err),
            ParseError::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiConnectionError> for ParseError {
    fn from(err: ApiConnectionError) -> Self {
        ParseError::Api(err)
    }
}

/// Short descriptions without conjunction markers are one food item; they
/// skip the model call entirely.
pub fn is_single_item(description: &str) -> bool {
    if description.contains(',') {
        return false;
    }
    let words: Vec<&str> = description.split_whitespace().collect();
    if words.len() > SINGLE_ITEM_MAX_WORDS {
        return false;
    }
    !words
        .iter()
        .any(|word| CONJUNCTION_WORDS.contains(&word.to_lowercase().as_str()))
}

// Deterministic last resort: only these foods are recognizable without the
// model. Returned in order of first occurrence; empty means "nothing
// recognizable", which is a valid terminal outcome.
const KNOWN_FOODS: &[(&str, &[&str])] = &[
    ("pizza", &["pizza"]),
    ("coke", &["coke", "cola"]),
    ("roti", &["roti", "chapati"]),
];

pub fn keyword_fallback(description: &str) -> Vec<String> {
    let lowered = description.to_lowercase();
    let mut found: Vec<(usize, &str)> = Vec::new();
    for (canonical, keywords) in KNOWN_FOODS {
        if let Some(position) = keywords.iter().filter_map(|k| lowered.find(k)).min() {
            found.push((position, canonical));
        }
    }
    found.sort_by_key(|(position, _)| *position);
    found
        .into_iter()
        .map(|(_, canonical)| canonical.to_string())
        .collect()
}

async fn split_with_model(
    provider: &Provider,
    description: &str,
) -> Result<Vec<String>, ParseError> {
    let prompt = format!(
        "Split the following meal description into its individual food items. \
Respond with a JSON array of strings and nothing else, one string per distinct food item, \
each a short food name without quantities. \
Meal description: \"{}\"",
        description
    );

    let text = provider.generate_text(&prompt).await?;
    let stripped = strip_code_fences(&text);
    let array = extract_json_array(stripped).ok_or(ParseError::NoArrayFound)?;
    let items: Vec<String> = serde_json::from_str(array).map_err(ParseError::Malformed)?;
    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

/// Segments a free-text description into discrete food names. Never fails:
/// model trouble degrades to the keyword fallback, and an empty list is a
/// legitimate "no recognizable foods" answer.
pub async fn parse(provider: &Provider, description: &str) -> Vec<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if is_single_item(trimmed) {
        return vec![trimmed.to_string()];
    }
    match split_with_model(provider, trimmed).await {
        Ok(items) => items,
        Err(err) => {
            eprintln!(
                "   -> Food splitting failed for '{}': {}. Using keyword fallback.",
                trimmed, err
            );
            keyword_fallback(trimmed)
        }
    }
}
