//! CSV file discovery and loading.
//!
//! Utility exports are concatenated into one logical CSV before parsing;
//! gateway exports are read one day at a time.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use regex::Regex;
use tou_core::error::{Result, TouError};
use tou_core::models::{GatewaySample, IntervalRecord};
use tou_core::time_utils::{
    compact_date, date_range, parse_gateway_timestamp, parse_utility_timestamp,
};
use tracing::{debug, warn};

/// Gateway samples are 5-minute average power in kW; this converts to kWh.
pub const SAMPLES_PER_HOUR: f64 = 12.0;

/// Field count of a gateway row: timestamp, home, solar, powerwall, grid.
pub const GATEWAY_FIELDS: usize = 5;

const COL_SERVICE_AGREEMENT: &str = "ServiceAgreement";
const COL_INTERVAL_START: &str = "IntervalStart";
const COL_QUANTITY: &str = "Quantity";

// ── File discovery ────────────────────────────────────────────────────────────

/// Translate a shell glob (`*`, `?`) into an anchored regex.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| TouError::Config(format!("invalid pattern {pattern:?}: {e}")))
}

/// Files directly inside `dir` whose name matches `pattern`, sorted by name.
pub fn find_data_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = glob_to_regex(pattern)?;

    if !dir.exists() {
        warn!("Data path does not exist: {}", dir.display());
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| matcher.is_match(name))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Ok(files)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| TouError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

// ── Utility exports ───────────────────────────────────────────────────────────

/// Concatenate every matching file's lines in file-name order, dropping the
/// header line of every file after the first.
pub fn load_concatenated_lines(dir: &Path, pattern: &str) -> Result<Vec<String>> {
    let files = find_data_files(dir, pattern)?;
    let mut all_lines: Vec<String> = Vec::new();

    for (ndx, path) in files.iter().enumerate() {
        let content = read_file(path)?;
        let skip = usize::from(ndx > 0);
        let before = all_lines.len();
        all_lines.extend(content.lines().skip(skip).map(str::to_string));
        debug!(
            "Read {} lines from {}",
            all_lines.len() - before,
            path.display()
        );
    }

    debug!("Loaded {} lines from {} files", all_lines.len(), files.len());
    Ok(all_lines)
}

/// Parse concatenated utility lines (header first) into records.
///
/// Rows too short to hold the required columns are skipped; an unparseable
/// timestamp or quantity aborts with an error.
pub fn parse_utility_records(lines: &[String]) -> Result<Vec<IntervalRecord>> {
    if lines.iter().all(|l| l.trim().is_empty()) {
        return Ok(Vec::new());
    }

    let joined = lines.join("\n");
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(joined.as_bytes());

    let headers = rdr.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| TouError::MissingColumn(name.to_string()))
    };
    let agreement_idx = column(COL_SERVICE_AGREEMENT)?;
    let start_idx = column(COL_INTERVAL_START)?;
    let quantity_idx = column(COL_QUANTITY)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.records() {
        let row = result?;
        let (Some(agreement), Some(start), Some(quantity)) = (
            row.get(agreement_idx),
            row.get(start_idx),
            row.get(quantity_idx),
        ) else {
            skipped += 1;
            continue;
        };

        records.push(IntervalRecord {
            timestamp: parse_utility_timestamp(start)?,
            service_agreement: agreement.to_string(),
            quantity_kwh: parse_quantity(quantity)?,
        });
    }

    debug!("Parsed {} utility records, skipped {}", records.len(), skipped);
    Ok(records)
}

/// Discover, concatenate and parse utility exports in one step.
pub fn load_utility_records(dir: &Path, pattern: &str) -> Result<Vec<IntervalRecord>> {
    let lines = load_concatenated_lines(dir, pattern)?;
    parse_utility_records(&lines)
}

fn parse_quantity(value: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|source| TouError::QuantityParse {
        value: value.to_string(),
        source,
    })
}

// ── Gateway exports ───────────────────────────────────────────────────────────

/// Samples read from a range of gateway files, with loading statistics.
#[derive(Debug, Clone, Default)]
pub struct GatewayLoad {
    pub samples: Vec<GatewaySample>,
    /// Days for which a file existed.
    pub days_loaded: usize,
    /// Days in the range without a file.
    pub days_missing: usize,
    /// Rows dropped for a wrong field count or a foreign date.
    pub rows_discarded: usize,
}

/// `<dir>/YYYYMMDD.csv`.
pub fn gateway_file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.csv", compact_date(date)))
}

/// Parse one day's gateway file. Returns the samples and the number of
/// rows discarded.
pub fn read_gateway_day(path: &Path, date: NaiveDate) -> Result<(Vec<GatewaySample>, usize)> {
    let content = read_file(path)?;
    let date_key = date.format("%Y-%m-%d").to_string();

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut samples = Vec::new();
    let mut discarded = 0usize;

    for result in rdr.records() {
        let row = result?;
        if row.len() != GATEWAY_FIELDS || !row[0].contains(&date_key) {
            discarded += 1;
            continue;
        }
        samples.push(gateway_sample(&row)?);
    }

    Ok((samples, discarded))
}

fn gateway_sample(row: &StringRecord) -> Result<GatewaySample> {
    let kwh = |idx: usize| -> Result<f64> { Ok(parse_quantity(&row[idx])? / SAMPLES_PER_HOUR) };
    Ok(GatewaySample {
        timestamp: parse_gateway_timestamp(&row[0])?,
        home: kwh(1)?,
        solar: kwh(2)?,
        powerwall: kwh(3)?,
        grid: kwh(4)?,
    })
}

/// Read every day in `[start, end]`; days without a file are skipped.
pub fn load_gateway_samples(dir: &Path, start: NaiveDate, end: NaiveDate) -> Result<GatewayLoad> {
    let mut load = GatewayLoad::default();

    for date in date_range(start, end) {
        let path = gateway_file_path(dir, date);
        if !path.is_file() {
            debug!("No gateway file for {}", date);
            load.days_missing += 1;
            continue;
        }

        let (samples, discarded) = read_gateway_day(&path, date)?;
        debug!(
            "File {}: {} samples, {} rows discarded",
            path.display(),
            samples.len(),
            discarded
        );
        load.samples.extend(samples);
        load.rows_discarded += discarded;
        load.days_loaded += 1;
    }

    Ok(load)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
