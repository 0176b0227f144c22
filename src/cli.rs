use clap::Parser;

use crate::meal_aggregator::MealType;
use crate::unit_classifier::UnitKind;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Free-text meal description, e.g. "2 rotis and a glass of lassi"
    #[arg(short, long, conflicts_with = "image")]
    pub description: Option<String>,

    /// Path to a food photo to run through the vision model instead
    #[arg(short, long)]
    pub image: Option<String>,

    /// Which meal this entry belongs to
    #[arg(short, long, value_enum, default_value_t = MealType::Lunch)]
    pub meal_type: MealType,

    /// Override the detected quantity (single-item entries only)
    #[arg(short, long)]
    pub quantity: Option<f32>,

    /// Override the detected unit (single-item entries only)
    #[arg(short, long, value_enum)]
    pub unit: Option<UnitKind>,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
