//! Voice Soundboard asset validation
//!
//! Checks audio event recordings before they land, for CI or by hand.
//!
//! # Usage
//!
//! ```bash
//! # Validate a manifest and every recording it references
//! soundboard-validate-assets assets/audio_events/manifest.json
//!
//! # Also write a markdown report, failing on warnings too
//! soundboard-validate-assets assets/audio_events/manifest.json --report report.md --strict
//!
//! # Check a directory of WAVs without a manifest
//! soundboard-validate-assets scan ./recordings --sample-rate 24000
//! ```
//!
//! Exit code 1 when any file has a fatal issue.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use soundboard_core::events::{
    generate_asset_report, validate_asset, validate_assets_directory, AssetReport,
    AudioEventManifest,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_MANIFEST: &str = "assets/audio_events/manifest.json";

/// Validate audio event manifests and recordings
#[derive(Parser)]
#[command(name = "soundboard-validate-assets")]
#[command(author, version)]
#[command(about = "Validate Voice Soundboard audio event assets")]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    check: CheckArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Validate every .wav under a directory without a manifest
    Scan {
        /// Directory to scan recursively
        dir: PathBuf,

        /// Expected sample rate
        #[arg(long, default_value_t = 24000)]
        sample_rate: u32,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(ClapArgs)]
struct CheckArgs {
    /// Path to manifest.json
    #[arg(default_value = DEFAULT_MANIFEST)]
    manifest: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(ClapArgs)]
struct OutputArgs {
    /// Write a markdown report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Treat warnings (silence, peaks, long clips) as failures
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Setup logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let passed = match args.command {
        Some(Command::Scan {
            dir,
            sample_rate,
            output,
        }) => scan(&dir, sample_rate, &output)?,
        None => check(&args.check.manifest, &args.check.output)?,
    };

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Validate a manifest and the recordings it references
fn check(manifest_path: &Path, output: &OutputArgs) -> Result<bool> {
    println!("Validating audio events: {}", manifest_path.display());

    let manifest = AudioEventManifest::load(manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;

    let manifest_issues = manifest.validate();
    for issue in &manifest_issues {
        println!("FAIL {}", issue);
    }

    let mut reports = Vec::new();
    for (event_type, variant) in manifest.variants() {
        // Missing files are already reported by the manifest check
        if !variant.file.exists() {
            continue;
        }

        let mut report = validate_asset(&variant.file, manifest.sample_rate());
        report.display_path = format!("{}/{}", event_type, variant.id);
        tracing::debug!(file = %variant.file.display(), issues = report.issues.len(), "checked variant");
        reports.push(report);
    }

    let files_passed = print_reports(&reports, output.strict);
    write_report(&reports, output)?;

    Ok(manifest_issues.is_empty() && files_passed)
}

fn scan(dir: &Path, sample_rate: u32, output: &OutputArgs) -> Result<bool> {
    if !dir.is_dir() {
        anyhow::bail!("Directory not found: {}", dir.display());
    }
    println!("Scanning assets: {} ({} Hz)", dir.display(), sample_rate);

    let reports = validate_assets_directory(dir, sample_rate)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;
    if reports.is_empty() {
        tracing::warn!("no .wav files under {}", dir.display());
    }

    let passed = print_reports(&reports, output.strict);
    write_report(&reports, output)?;
    Ok(passed)
}

fn is_fatal(report: &AssetReport, strict: bool) -> bool {
    !report.is_valid() || (strict && report.has_warnings())
}

/// Print one line per file plus its issues; true when nothing is fatal
fn print_reports(reports: &[AssetReport], strict: bool) -> bool {
    let mut failed = 0;

    for report in reports {
        let fatal = is_fatal(report, strict);
        if fatal {
            failed += 1;
        }

        let status = if fatal { "FAIL" } else { "ok  " };
        if report.channels > 0 {
            println!(
                "{} {} ({} ch, {}-bit, {} Hz, {:.2}s)",
                status,
                report.display_path,
                report.channels,
                report.bit_depth,
                report.sample_rate,
                report.duration
            );
        } else {
            println!("{} {}", status, report.display_path);
        }

        for issue in &report.issues {
            println!("     - {}", issue.message);
        }
    }

    println!();
    println!("Passed: {}, Failed: {}", reports.len() - failed, failed);
    failed == 0
}

fn write_report(reports: &[AssetReport], output: &OutputArgs) -> Result<()> {
    let Some(path) = &output.report else {
        return Ok(());
    };

    std::fs::write(path, generate_asset_report(reports))
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    tracing::info!("Report written to {}", path.display());
    Ok(())
}
