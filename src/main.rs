use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use std::path::{Path, PathBuf};

use injecthunt::detector::{Detector, LogSink};
use injecthunt::indicators::{DomainList, IndicatorSet};
use injecthunt::{history, locator, output};

#[derive(Parser)]
#[command(
    name = "injecthunt",
    about = "InjectHunt — Safari History Injection Hunter",
    long_about = "Reconstructs redirect chains from Safari's History.db and flags covert\n\
                  HTTP-to-HTTPS redirects that change domain within a sub-second window,\n\
                  a signature of on-path traffic injection. Optionally checks every visit\n\
                  against known-malicious domain lists.\n\n\
                  Set RUST_LOG=debug for verbose logging.",
    version
)]
struct Cli {
    /// Path to a History.db file, an iOS backup directory, or a filesystem dump
    #[arg(short, long)]
    input: PathBuf,

    /// Newline-delimited files of known-malicious domains (repeatable)
    #[arg(long = "iocs", value_name = "FILE")]
    iocs: Vec<PathBuf>,

    /// Output CSV file for the full visit report (omit to write to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the report as a JSON array to this path
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    let db_path = locator::locate(&cli.input)?;
    info!("Found Safari history database at path: {}", db_path.display());

    let records = history::load(&db_path)?;
    info!("Extracted a total of {} history items", records.len());

    let indicator_list = if cli.iocs.is_empty() {
        None
    } else {
        let list = DomainList::from_files(&cli.iocs)?;
        info!("Loaded {} unique indicator domain(s)", list.len());
        Some(list)
    };

    let detector = Detector::new();
    let mut sink = LogSink;
    let detected = detector.check_indicators(
        &records,
        indicator_list.as_ref().map(|l| l as &dyn IndicatorSet),
        &mut sink,
    );

    if !detected.is_empty() {
        warn!(
            "{} history visit(s) matched known-malicious indicators",
            detected.len()
        );
    }

    match &cli.output {
        Some(out) => {
            let count = output::write_csv(&records, out)?;
            info!("Wrote {} visit(s) to {}", count, out.display());
            if !detected.is_empty() {
                let det_path = sibling(out, "_detected");
                let count = output::write_csv(&detected, &det_path)?;
                info!("Wrote {} detection(s) to {}", count, det_path.display());
            }
        }
        None => {
            output::write_csv_stdout(&records)?;
        }
    }

    if let Some(json_path) = &cli.json {
        let count = output::write_json(&records, json_path)?;
        info!("Wrote {} visit(s) to {}", count, json_path.display());
        if !detected.is_empty() {
            let det_path = sibling(json_path, "_detected");
            output::write_json(&detected, &det_path)?;
            info!("Wrote detections to {}", det_path.display());
        }
    }

    Ok(())
}

/// `report.csv` -> `report_detected.csv`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}{suffix}.{ext}"),
        None => format!("{stem}{suffix}"),
    };
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}
