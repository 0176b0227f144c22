pub mod api_connection;
pub mod cli;
pub mod fallback_estimator;
pub mod image_recognition;
pub mod json_scan;
pub mod meal_aggregator;
pub mod meal_parser;
pub mod nutrition_estimator;
pub mod prompt_builder;
pub mod unit_classifier;
