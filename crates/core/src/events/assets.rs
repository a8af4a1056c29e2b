//! Asset QA for event recordings
//!
//! Stricter than manifest validation: besides format checks it flags
//! excessive leading/trailing silence, overlong clips and hot peaks.
//! Format problems are errors; level and silence problems are warnings.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Longest acceptable event clip (seconds)
pub const MAX_EVENT_DURATION_S: f64 = 5.0;
/// Shortest acceptable event clip (seconds)
pub const MIN_EVENT_DURATION_S: f64 = 0.01;
pub const MAX_LEADING_SILENCE_MS: f64 = 10.0;
pub const MAX_TRAILING_SILENCE_MS: f64 = 20.0;
/// Peak ceiling in dBFS
pub const MAX_PEAK_DBFS: f64 = -1.0;
/// |sample| at or below this counts as silence (16-bit scale)
const SILENCE_THRESHOLD: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetIssue {
    pub severity: Severity,
    pub message: String,
}

impl AssetIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Result of checking one file
#[derive(Debug, Clone, PartialEq)]
pub struct AssetReport {
    pub path: PathBuf,
    /// Path shown in reports (relative to the scanned directory)
    pub display_path: String,
    pub issues: Vec<AssetIssue>,

    // Zero when the header could not be read
    pub channels: u16,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub duration: f64,
    pub peak_dbfs: Option<f64>,
}

impl AssetReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            display_path: path.display().to_string(),
            issues: Vec::new(),
            channels: 0,
            sample_rate: 0,
            bit_depth: 0,
            duration: 0.0,
            peak_dbfs: None,
        }
    }

    /// No error-level issues
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }
}

/// Check a single WAV file
pub fn validate_asset(path: impl AsRef<Path>, expected_sample_rate: u32) -> AssetReport {
    let path = path.as_ref();
    let mut report = AssetReport::new(path);

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if extension != "wav" && extension != "wave" {
        report.issues.push(AssetIssue::error(format!(
            "Invalid format: .{} (must be .wav)",
            extension
        )));
        return report;
    }

    if !path.exists() {
        report.issues.push(AssetIssue::error("file not found"));
        return report;
    }

    let mut reader = match hound::WavReader::open(path) {
        Ok(reader) => reader,
        Err(e) => {
            report.issues.push(AssetIssue::error(format!("Failed to read: {}", e)));
            return report;
        }
    };

    let spec = reader.spec();
    report.channels = spec.channels;
    report.sample_rate = spec.sample_rate;
    report.bit_depth = spec.bits_per_sample;
    if spec.sample_rate > 0 {
        report.duration = reader.duration() as f64 / spec.sample_rate as f64;
    }

    if spec.channels != 1 {
        report.issues.push(AssetIssue::error(format!(
            "must be mono, got {} channels",
            spec.channels
        )));
    }
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        report.issues.push(AssetIssue::error(format!(
            "must be 16-bit PCM, got {}-bit",
            spec.bits_per_sample
        )));
    }
    if spec.sample_rate != expected_sample_rate {
        report.issues.push(AssetIssue::error(format!(
            "sample rate {} != expected {}",
            spec.sample_rate, expected_sample_rate
        )));
    }
    if report.duration > MAX_EVENT_DURATION_S {
        report.issues.push(AssetIssue::warning(format!(
            "duration {:.1}s exceeds {}s max",
            report.duration, MAX_EVENT_DURATION_S
        )));
    }
    if report.duration < MIN_EVENT_DURATION_S {
        report
            .issues
            .push(AssetIssue::error("duration too short (< 10ms)"));
    }

    if spec.channels == 1 && spec.bits_per_sample == 16 && spec.sample_format == hound::SampleFormat::Int {
        match reader.samples::<i16>().collect::<Result<Vec<i16>, _>>() {
            Ok(samples) => check_levels(&samples, spec.sample_rate, &mut report),
            Err(e) => report
                .issues
                .push(AssetIssue::error(format!("Failed to read samples: {}", e))),
        }
    }

    report
}

fn check_levels(samples: &[i16], sample_rate: u32, report: &mut AssetReport) {
    if samples.is_empty() || sample_rate == 0 {
        return;
    }

    let is_silent = |s: &&i16| (**s as i32).abs() <= SILENCE_THRESHOLD;
    let leading = samples.iter().take_while(is_silent).count();
    let trailing = samples.iter().rev().take_while(is_silent).count();
    let to_ms = |n: usize| n as f64 / sample_rate as f64 * 1000.0;

    if leading == samples.len() {
        report.issues.push(AssetIssue::warning("clip is entirely silent"));
        return;
    }

    let leading_ms = to_ms(leading);
    if leading_ms > MAX_LEADING_SILENCE_MS {
        report.issues.push(AssetIssue::warning(format!(
            "leading silence {:.1}ms > {}ms",
            leading_ms, MAX_LEADING_SILENCE_MS
        )));
    }

    let trailing_ms = to_ms(trailing);
    if trailing_ms > MAX_TRAILING_SILENCE_MS {
        report.issues.push(AssetIssue::warning(format!(
            "trailing silence {:.1}ms > {}ms",
            trailing_ms, MAX_TRAILING_SILENCE_MS
        )));
    }

    let peak = samples.iter().map(|&s| (s as i32).abs()).max().unwrap_or(0);
    let peak_dbfs = 20.0 * (peak as f64 / 32767.0).log10();
    report.peak_dbfs = Some(peak_dbfs);
    if peak >= 32767 {
        report
            .issues
            .push(AssetIssue::warning("audio is clipping (peak at 0 dBFS)"));
    } else if peak_dbfs > MAX_PEAK_DBFS {
        report.issues.push(AssetIssue::warning(format!(
            "peak {:.2} dBFS exceeds {} dBFS",
            peak_dbfs, MAX_PEAK_DBFS
        )));
    }
}

/// Check every `.wav` under a directory, in sorted path order
pub fn validate_assets_directory(
    directory: impl AsRef<Path>,
    expected_sample_rate: u32,
) -> crate::Result<Vec<AssetReport>> {
    let directory = directory.as_ref();
    let pattern = directory.join("**").join("*.wav");
    let pattern = pattern.to_string_lossy();

    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| crate::Error::ConfigError(format!("invalid asset path pattern: {}", e)))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("skipping unreadable asset entry: {}", e);
                None
            }
        })
        .collect();
    files.sort();

    Ok(files
        .into_iter()
        .map(|file| {
            let mut report = validate_asset(&file, expected_sample_rate);
            if let Ok(relative) = file.strip_prefix(directory) {
                report.display_path = relative.display().to_string();
            }
            report
        })
        .collect())
}

/// Markdown summary of a validation run
pub fn generate_asset_report(reports: &[AssetReport]) -> String {
    let mut out = String::from("# Asset Validation Report\n\n");

    let valid = reports.iter().filter(|r| r.is_valid()).count();
    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out, "- Total files: {}", reports.len());
    let _ = writeln!(out, "- Valid: {}", valid);
    let _ = writeln!(out, "- Invalid: {}", reports.len() - valid);
    let _ = writeln!(out);

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for issue in reports.iter().flat_map(|r| r.issues.iter()) {
        *counts.entry(issue.message.as_str()).or_default() += 1;
    }
    if !counts.is_empty() {
        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        let _ = writeln!(out, "## Issues\n");
        for (message, count) in counts {
            let _ = writeln!(out, "- {}: {} files", message, count);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## File Details\n");
    for report in reports {
        let status = if report.is_valid() { "✅" } else { "❌" };
        let _ = writeln!(out, "### {} {}", status, report.display_path);

        if report.channels > 0 {
            let _ = writeln!(out, "- Channels: {}", report.channels);
            let _ = writeln!(out, "- Sample rate: {} Hz", report.sample_rate);
            let _ = writeln!(out, "- Bit depth: {}", report.bit_depth);
            let _ = writeln!(out, "- Duration: {:.2}s", report.duration);
        }
        if let Some(peak) = report.peak_dbfs {
            let _ = writeln!(out, "- Peak: {:.2} dBFS", peak);
        }
        if !report.issues.is_empty() {
            let _ = writeln!(out, "- Issues:");
            for issue in &report.issues {
                let tag = match issue.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                };
                let _ = writeln!(out, "  - [{}] {}", tag, issue.message);
            }
        }
        let _ = writeln!(out);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn clean_clip(len: usize) -> Vec<i16> {
        (0..len).map(|i| if i % 2 == 0 { 12000 } else { -12000 }).collect()
    }

    #[test]
    fn test_clean_asset_passes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("laugh.wav");
        write_wav(&path, 1, 24000, &clean_clip(4800));

        let report = validate_asset(&path, 24000);
        assert!(report.is_valid(), "{:?}", report.issues);
        assert!(!report.has_warnings(), "{:?}", report.issues);
        assert!((report.duration - 0.2).abs() < 1e-9);
        assert!(report.peak_dbfs.unwrap() < MAX_PEAK_DBFS);
    }

    #[test]
    fn test_wrong_extension() {
        let report = validate_asset("laugh.mp3", 24000);
        assert!(!report.is_valid());
        assert!(report.issues[0].message.contains("must be .wav"));
    }

    #[test]
    fn test_stereo_and_rate_are_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sigh.wav");
        write_wav(&path, 2, 22050, &clean_clip(8820));

        let report = validate_asset(&path, 24000);
        assert!(!report.is_valid());
        let messages: Vec<_> = report.issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("must be mono")));
        assert!(messages.iter().any(|m| m.contains("sample rate 22050")));
    }

    #[test]
    fn test_silence_and_clipping_are_warnings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gasp.wav");
        let mut samples = vec![0i16; 480];
        samples.extend(std::iter::repeat(i16::MAX).take(2400));
        samples.extend(vec![0i16; 960]);
        write_wav(&path, 1, 24000, &samples);

        let report = validate_asset(&path, 24000);
        assert!(report.is_valid());
        let messages: Vec<_> = report.issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.starts_with("leading silence 20.0ms")));
        assert!(messages.iter().any(|m| m.starts_with("trailing silence 40.0ms")));
        assert!(messages.iter().any(|m| m.contains("clipping")));
    }

    #[test]
    fn test_too_short_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tick.wav");
        write_wav(&path, 1, 24000, &clean_clip(100));

        let report = validate_asset(&path, 24000);
        assert!(!report.is_valid());
        assert!(report.issues.iter().any(|i| i.message.contains("too short")));
    }

    #[test]
    fn test_directory_scan_and_report() {
        let dir = TempDir::new().unwrap();
        write_wav(&dir.path().join("laugh/soft.wav"), 1, 24000, &clean_clip(4800));
        write_wav(&dir.path().join("laugh/hard.wav"), 2, 24000, &clean_clip(4800));
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let reports = validate_assets_directory(dir.path(), 24000).unwrap();
        let names: Vec<_> = reports.iter().map(|r| r.display_path.replace('\\', "/")).collect();
        assert_eq!(names, vec!["laugh/hard.wav", "laugh/soft.wav"]);

        let markdown = generate_asset_report(&reports);
        assert!(markdown.starts_with("# Asset Validation Report"));
        assert!(markdown.contains("- Total files: 2"));
        assert!(markdown.contains("- Invalid: 1"));
        assert!(markdown.contains("must be mono, got 2 channels: 1 files"));
    }
}
