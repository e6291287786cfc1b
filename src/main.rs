use anyhow::{bail, Context, Result};
use residuals_pipeline::{pipeline, RawInputs, ReportingPeriod, RuleSet, Table};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Input file names expected inside the input directory. These mirror the
/// extract names the back office uploads each month.
const INPUT_FILES: [(&str, &str); 8] = [
    ("TSYS roster", "synoptic_tsys.csv"),
    ("Fiserv roster", "synoptic_fiserv.csv"),
    ("Partner S1", "partner_s1.csv"),
    ("Partner S2", "partner_s2.csv"),
    ("Fee ledger", "fee_ledger.csv"),
    ("Rate extract", "rate_extract.csv"),
    ("Wireless report", "wireless_report.csv"),
    ("ISO report", "iso_report.csv"),
];

fn usage() -> ! {
    eprintln!("Usage: residuals-pipeline <month 1-12> <year> <input-dir> <output-dir> [rules.json]");
    eprintln!();
    eprintln!("Expects these files inside <input-dir>:");
    for (name, file) in INPUT_FILES {
        eprintln!("  {:<20} {}", file, name);
    }
    std::process::exit(2);
}

fn load(name: &str, dir: &Path, file: &str) -> Result<Table> {
    let path = dir.join(file);
    Table::from_csv_path(name, &path).with_context(|| format!("Failed to load {:?}", path))
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 5 || args.len() > 6 {
        usage();
    }

    let month: u32 = args[1].parse().context("month must be a number 1-12")?;
    let year: i32 = args[2].parse().context("year must be a number")?;
    let input_dir = PathBuf::from(&args[3]);
    let output_dir = PathBuf::from(&args[4]);

    let rules = match args.get(5) {
        Some(path) => RuleSet::from_file(path)?,
        None => RuleSet::default(),
    };

    let Some(period) = ReportingPeriod::for_month(year, month) else {
        bail!("Invalid reporting month: {}/{}", month, year);
    };
    println!("Reporting cutoff: {}", period.cutoff);
    println!("Dormancy floor:   {}", period.dormancy_floor);

    let inputs = RawInputs {
        tsys_roster: load(INPUT_FILES[0].0, &input_dir, INPUT_FILES[0].1)?,
        fiserv_roster: load(INPUT_FILES[1].0, &input_dir, INPUT_FILES[1].1)?,
        partner_s1: load(INPUT_FILES[2].0, &input_dir, INPUT_FILES[2].1)?,
        partner_s2: load(INPUT_FILES[3].0, &input_dir, INPUT_FILES[3].1)?,
        fee_ledger: load(INPUT_FILES[4].0, &input_dir, INPUT_FILES[4].1)?,
        rate_extract: load(INPUT_FILES[5].0, &input_dir, INPUT_FILES[5].1)?,
        wireless_report: load(INPUT_FILES[6].0, &input_dir, INPUT_FILES[6].1)?,
        iso_report: load(INPUT_FILES[7].0, &input_dir, INPUT_FILES[7].1)?,
    };

    // The transform is all-or-nothing: nothing is written unless every
    // stage succeeded.
    let outputs = pipeline::run(&inputs, &period, &rules)?;

    fs::create_dir_all(&output_dir)?;
    let bundle_dir = output_dir.join("fee_bundle");
    fs::create_dir_all(&bundle_dir)?;

    outputs.partner.save_csv(&output_dir.join("partner_output.csv"))?;
    outputs.rate.save_csv(&output_dir.join("rate_output.csv"))?;
    outputs.iso.save_csv(&output_dir.join("iso_output.csv"))?;
    outputs.wireless.save_csv(&output_dir.join("wireless_output.csv"))?;
    outputs.fee_bundle.fiserv.save_csv(&bundle_dir.join("fiserv.csv"))?;
    outputs.fee_bundle.step1_placeholder.save_csv(&bundle_dir.join("step1.csv"))?;
    outputs.fee_bundle.tsys.save_csv(&bundle_dir.join("tsys.csv"))?;
    outputs.fee_bundle.rate.save_csv(&bundle_dir.join("rate.csv"))?;

    println!("✓ Partner output:  {} rows", outputs.partner.len());
    println!("✓ Rate output:     {} rows", outputs.rate.len());
    println!(
        "✓ Fee bundle:      {} Fiserv / {} TSYS rows",
        outputs.fee_bundle.fiserv.len(),
        outputs.fee_bundle.tsys.len()
    );
    println!("✓ ISO output:      {} rows", outputs.iso.len());
    println!("✓ Wireless output: {} rows", outputs.wireless.len());
    println!("Outputs written to {:?}", output_dir);

    Ok(())
}
