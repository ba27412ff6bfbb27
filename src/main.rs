// Command-line front end: runs the extraction pipeline over OCR text
// dumps of a label's two regions and prints the resulting record.

use clap::Parser;
use std::fs;
use std::path::PathBuf;

use vaxtract::models::RawOcrText;
use vaxtract::validation::validate;
use vaxtract::LabelExtractor;

#[derive(Parser, Debug)]
#[command(
    name = "vaxtract",
    about = "Extract structured vaccine-label data from OCR text dumps"
)]
struct Args {
    /// Path to the OCR text of the printed label region
    label_text: PathBuf,

    /// Path to the OCR text of the lot-specific data region
    data_text: PathBuf,

    /// Emit the record and completeness flags as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let label = fs::read_to_string(&args.label_text)?;
    let data = fs::read_to_string(&args.data_text)?;

    let record = LabelExtractor::extract(&RawOcrText::new(label, data));
    let result = validate(&record);

    if args.json {
        let output = serde_json::json!({
            "record": record,
            "validation": result,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("\n===============================================");
    println!("        VACCINE LABEL EXTRACTION REPORT");
    println!("===============================================\n");
    println!("{}", record.render_report());

    println!("\nCOMPLETENESS:");
    println!("  Identity:     {}", if result.has_identity { "FOUND" } else { "MISSING" });
    println!("  Serial:       {}", if result.has_serial { "FOUND" } else { "MISSING" });
    println!("  Dates:        {}", if result.has_dates { "FOUND" } else { "MISSING" });
    println!("  Manufacturer: {}", if result.has_manufacturer { "FOUND" } else { "MISSING" });
    println!(
        "\nOVERALL: {}",
        if result.is_complete { "COMPLETE" } else { "INCOMPLETE" }
    );

    Ok(())
}
