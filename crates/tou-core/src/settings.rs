use clap::{CommandFactory, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::error::{Result, TouError};
use crate::models::RateClass;
use crate::time_utils::parse_compact_date;

/// Default directory holding the utility `UsageData_*` exports.
pub const DEFAULT_UTILITY_DIR: &str = "mike_johnson_gmpdata";

/// Default directory holding the gateway `YYYYMMDD.csv` exports.
pub const DEFAULT_GATEWAY_DIR: &str = "tesla_gateway_data";

/// Glob selecting utility export files.
pub const DEFAULT_UTILITY_PATTERN: &str = "UsageData_2*";

/// Directory name under the home directory for persisted state.
pub const APP_DIR_NAME: &str = ".tou-analyzer";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Time-of-use electricity cost analysis
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tou",
    about = "Time-of-use electricity cost analysis for utility and home gateway data",
    version
)]
pub struct Settings {
    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long, global = true)]
    pub clear: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Price utility interval exports under every predefined rate plan.
    CompareRates(CompareRatesArgs),

    /// Analyse home gateway exports for a date range.
    Gateway(GatewayArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct CompareRatesArgs {
    /// Directory with utility exports
    #[arg(long, default_value = DEFAULT_UTILITY_DIR)]
    pub data_dir: PathBuf,

    /// File name glob selecting the exports
    #[arg(long, default_value = DEFAULT_UTILITY_PATTERN)]
    pub pattern: String,

    /// Only evaluate this plan (1, 11 or 14)
    #[arg(long)]
    pub plan: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct GatewayArgs {
    /// First day, YYYYMMDD
    pub start: String,

    /// Last day (inclusive), YYYYMMDD
    pub end: String,

    /// Whether the battery is part of the system (true/false)
    pub battery: String,

    /// Directory with gateway exports
    #[arg(long, default_value = DEFAULT_GATEWAY_DIR)]
    pub data_dir: PathBuf,

    /// EV charger draw in kW
    #[arg(long, default_value = "7.3")]
    pub charger_kw: f64,

    /// Rate class EV charging is assumed to happen in
    #[arg(long, default_value = "offpeak", value_parser = ["peak", "offpeak"])]
    pub ev_rate_class: String,
}

impl GatewayArgs {
    pub fn start_date(&self) -> Result<NaiveDate> {
        parse_compact_date(&self.start)
    }

    pub fn end_date(&self) -> Result<NaiveDate> {
        parse_compact_date(&self.end)
    }

    pub fn include_battery(&self) -> Result<bool> {
        parse_bool_literal(&self.battery)
    }

    pub fn ev_rate_class(&self) -> RateClass {
        if self.ev_rate_class == "peak" {
            RateClass::Peak
        } else {
            RateClass::OffPeak
        }
    }
}

/// Interpret a boolean literal the way it is typed on a command line.
pub fn parse_bool_literal(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(TouError::InvalidBool(value.to_string())),
    }
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.tou-analyzer/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utility_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl LastUsedParams {
    /// Uses `~/.tou-analyzer/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(APP_DIR_NAME).join("last_used.json")
    }

    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params, creating parent directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Record the directories used by this run, keeping the other command's
    /// remembered directory.
    fn merge_from(&mut self, settings: &Settings) {
        match &settings.command {
            Command::CompareRates(args) => self.utility_dir = Some(args.data_dir.clone()),
            Command::Gateway(args) => self.gateway_dir = Some(args.data_dir.clone()),
        }
        if !settings.debug {
            self.log_level = Some(settings.log_level.clone());
        }
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, fill unset values from the last run and persist
    /// the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with explicit arguments and
    /// config path.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::apply_debug(settings);
        }

        let mut last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "log_level") {
            if let Some(level) = last.log_level.clone() {
                settings.log_level = level;
            }
        }

        match &mut settings.command {
            Command::CompareRates(args) => {
                let explicit = matches
                    .subcommand_matches("compare-rates")
                    .is_some_and(|m| is_arg_explicitly_set(m, "data_dir"));
                if !explicit {
                    if let Some(dir) = last.utility_dir.clone() {
                        args.data_dir = dir;
                    }
                }
            }
            Command::Gateway(args) => {
                let explicit = matches
                    .subcommand_matches("gateway")
                    .is_some_and(|m| is_arg_explicitly_set(m, "data_dir"));
                if !explicit {
                    if let Some(dir) = last.gateway_dir.clone() {
                        args.data_dir = dir;
                    }
                }
            }
        }

        last.merge_from(&settings);
        let _ = last.save_to(config_path);

        Self::apply_debug(settings)
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
