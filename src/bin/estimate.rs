//! Ad-hoc estimator harness. Prints the fingerprint and the ValueEstimate as JSON.

use clap::{Parser, ValueEnum};

use gunrack_tracker::estimator::estimate;
use gunrack_tracker::fingerprint::fingerprint_parts;
use gunrack_tracker::types::Condition;

#[derive(Parser, Debug)]
#[command(name = "estimate", about = "Value one firearm the way a scrape pass would")]
struct EstimateCli {
    /// Manufacturer as listed ("S&W", "Glock", ...)
    manufacturer: String,

    /// Model as listed ("19 Gen5", "686 Plus", ...)
    model: String,

    /// Caliber as listed ("9mm", ".357 mag", ...)
    caliber: String,

    /// Listing condition
    #[arg(value_enum, default_value_t = ConditionArg::Unknown)]
    condition: ConditionArg,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ConditionArg {
    New,
    #[value(alias = "used")]
    UsedGood,
    UsedFair,
    Unknown,
}

impl From<ConditionArg> for Condition {
    fn from(arg: ConditionArg) -> Self {
        match arg {
            ConditionArg::New => Condition::New,
            ConditionArg::UsedGood => Condition::UsedGood,
            ConditionArg::UsedFair => Condition::UsedFair,
            ConditionArg::Unknown => Condition::Unknown,
        }
    }
}

fn main() {
    let cli = EstimateCli::parse();
    let condition = Condition::from(cli.condition);
    let value = estimate(&cli.manufacturer, &cli.model, &cli.caliber, condition);
    let out = serde_json::json!({
        "fingerprint": fingerprint_parts(&cli.manufacturer, &cli.model, &cli.caliber),
        "condition": condition,
        "estimate": value,
    });

    match serde_json::to_string_pretty(&out) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            eprintln!("Serialize error: {e}");
            std::process::exit(1);
        }
    }
}
