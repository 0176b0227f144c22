use anyhow::{Context, Result};
use snapcal::api_connection::endpoints::Provider;
use snapcal::cli::parse_args;
use snapcal::image_recognition::recognize;
use snapcal::meal_aggregator::{aggregate, calculate_meal};
use snapcal::meal_parser::parse;
use snapcal::nutrition_estimator::refresh_estimate;
use snapcal::unit_classifier::{FoodQuery, Quantity, UnitClassifier};
use tokio::fs;

const GEMINI_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

fn mime_for_path(path: &str) -> &'static str {
    let lowered = path.to_lowercase();
    if lowered.ends_with(".png") {
        "image/png"
    } else if lowered.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli_args = parse_args();
    let provider = Provider::gemini(GEMINI_KEY_ENV_VAR);

    let description = if let Some(image_path) = &cli_args.image {
        println!("Reading image file: {}", image_path);
        let image_bytes = fs::read(image_path)
            .await
            .with_context(|| format!("Failed to read image file '{}'", image_path))?;
        let recognized = recognize(&provider, &image_bytes, mime_for_path(image_path))
            .await
            .map_err(|e| anyhow::anyhow!("Image recognition failed: {}", e))?;
        println!("Recognized food description: {}", recognized);
        recognized
    } else if let Some(description) = &cli_args.description {
        description.clone()
    } else {
        anyhow::bail!("Provide either --description or --image");
    };

    println!("\nSplitting description into food items...");
    let items = parse(&provider, &description).await;
    if items.is_empty() {
        println!("No recognizable food items in '{}'.", description);
        return Ok(());
    }

    let classifier = UnitClassifier::standard();
    let mut queries: Vec<FoodQuery> = Vec::with_capacity(items.len());
    for item in &items {
        let classification = classifier.classify(item);
        println!(
            " > '{}' measured in {} ({})",
            item,
            classification.unit.label(),
            classification.prompt
        );
        queries.push(FoodQuery {
            name: item.clone(),
            quantity: classification.unit.default_quantity(),
            unit: classification.unit,
        });
    }

    let has_override = cli_args.quantity.is_some() || cli_args.unit.is_some();
    let record = if queries.len() == 1 && has_override {
        // Edited quantity/unit path: the one call site that retries once.
        let query = &mut queries[0];
        if let Some(unit) = cli_args.unit {
            query.unit = unit;
            query.quantity = unit.default_quantity();
        }
        if let Some(amount) = cli_args.quantity {
            query.quantity = Quantity::Amount(amount);
        }
        query
            .validate()
            .with_context(|| format!("Invalid quantity for '{}'", query.name))?;
        println!(
            "\nRefreshing estimate for {} ({} {})...",
            query.name, query.quantity, query.unit
        );
        let estimate = refresh_estimate(&provider, query).await;
        aggregate(&[(query.clone(), estimate)], cli_args.meal_type)
    } else {
        if has_override {
            println!("Ignoring --quantity/--unit: they only apply to single-item entries.");
        }
        println!("\nCalculating nutrition for {} item(s)...", queries.len());
        calculate_meal(&provider, &queries, cli_args.meal_type).await
    };

    println!("\nFinal meal record:");
    println!("{:#?}", record);

    Ok(())
}
