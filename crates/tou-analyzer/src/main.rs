mod bootstrap;
mod report;

use anyhow::{Context, Result};
use tou_core::settings::{Command, CompareRatesArgs, GatewayArgs, Settings};
use tou_data::analysis::{analyze_gateway, compare_rates, GatewayOptions};
use tou_data::flow::EvChargingAssumption;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("tou v{} starting", env!("CARGO_PKG_VERSION"));

    match &settings.command {
        Command::CompareRates(args) => run_compare_rates(args),
        Command::Gateway(args) => run_gateway(args),
    }
}

fn run_compare_rates(args: &CompareRatesArgs) -> Result<()> {
    let result = compare_rates(&args.data_dir, &args.pattern, args.plan.as_deref())
        .with_context(|| format!("rate comparison over {} failed", args.data_dir.display()))?;

    if result.metadata.records_loaded == 0 {
        tracing::warn!(
            "No records matched {} in {}",
            args.pattern,
            args.data_dir.display()
        );
    }

    print!("{}", report::render_rate_comparison(&result));
    Ok(())
}

fn run_gateway(args: &GatewayArgs) -> Result<()> {
    let start = args.start_date()?;
    let end = args.end_date()?;
    let include_battery = args.include_battery()?;

    let mut options = GatewayOptions::new(start, end, include_battery);
    options.ev = EvChargingAssumption {
        charger_kw: args.charger_kw,
        priced_as: args.ev_rate_class(),
        ..EvChargingAssumption::default()
    };

    let result = analyze_gateway(&args.data_dir, &options)
        .with_context(|| format!("gateway analysis over {} failed", args.data_dir.display()))?;

    if result.metadata.days_loaded == 0 {
        tracing::warn!(
            "No gateway files between {} and {} in {}",
            start,
            end,
            args.data_dir.display()
        );
    }

    print!("{}", report::render_gateway(&result));
    Ok(())
}
