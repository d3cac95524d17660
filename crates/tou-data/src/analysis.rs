//! Top-level analysis pipelines.
//!
//! [`compare_rates`] prices a year of utility interval data under every rate
//! plan. [`analyze_gateway`] turns a range of home-gateway exports into
//! directional flows, an EV charging estimate and a cost/savings summary.

use std::path::Path;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use tou_core::classifier::TouSchedule;
use tou_core::models::PlanCost;
use tou_core::plans::{GatewayTariff, RatePlanId, RatePlans};
use tou_core::Result;

use crate::aggregator::CostAggregator;
use crate::flow::{EvChargingAssumption, EvChargingEstimate, FlowAccumulator};
use crate::reader::{load_gateway_samples, load_utility_records};

// ── Rate comparison ───────────────────────────────────────────────────────────

/// Metadata produced alongside a rate comparison.
#[derive(Debug, Clone, Serialize)]
pub struct RateComparisonMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// Records parsed, net-generation rows included.
    pub records_loaded: usize,
    /// Net-generation rows excluded from pricing.
    pub net_generation_records: usize,
    /// Wall-clock seconds spent reading and parsing the files.
    pub load_time_seconds: f64,
}

/// The complete output of [`compare_rates`].
#[derive(Debug, Clone, Serialize)]
pub struct RateComparison {
    /// One entry per evaluated plan, in plan order.
    pub costs: Vec<PlanCost>,
    /// The plan with the lowest total, if any plan was evaluated.
    pub cheapest: Option<RatePlanId>,
    pub metadata: RateComparisonMetadata,
}

/// Load utility files matching `pattern` in `dir` and price them.
///
/// With `plan` set only that plan is evaluated. An unknown plan id is
/// rejected before any file is read.
pub fn compare_rates(dir: &Path, pattern: &str, plan: Option<&str>) -> Result<RateComparison> {
    let plans = match plan {
        Some(name) => vec![RatePlans::get_plan_by_name(name)?],
        None => RatePlans::all_plans(),
    };

    info!("Comparing {} rate plan(s) using {}/{}", plans.len(), dir.display(), pattern);

    let load_start = Instant::now();
    let records = load_utility_records(dir, pattern)?;
    let load_time = load_start.elapsed().as_secs_f64();

    let net_generation_records = records.iter().filter(|r| r.is_net_generation()).count();
    debug!(
        "Loaded {} records ({} net generation) in {:.3}s",
        records.len(),
        net_generation_records,
        load_time
    );

    let schedule = TouSchedule::default();
    let costs: Vec<PlanCost> = plans
        .iter()
        .map(|p| CostAggregator::aggregate(&records, p, &schedule))
        .collect();

    for cost in &costs {
        info!("Rate {}: ${:.2} for {:.1} kWh", cost.plan, cost.total_cost, cost.total_kwh);
    }

    let cheapest = CostAggregator::cheapest(&costs).map(|c| c.plan);

    Ok(RateComparison {
        costs,
        cheapest,
        metadata: RateComparisonMetadata {
            generated_at: Utc::now().to_rfc3339(),
            records_loaded: records.len(),
            net_generation_records,
            load_time_seconds: load_time,
        },
    })
}

// ── Gateway analysis ──────────────────────────────────────────────────────────

/// Inputs to [`analyze_gateway`] beyond the data directory.
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// When false, battery flows are folded into the grid as if no battery
    /// were installed.
    pub include_battery: bool,
    pub ev: EvChargingAssumption,
    pub tariff: GatewayTariff,
}

impl GatewayOptions {
    pub fn new(start: NaiveDate, end: NaiveDate, include_battery: bool) -> Self {
        Self {
            start,
            end,
            include_battery,
            ev: EvChargingAssumption::default(),
            tariff: GatewayTariff::default(),
        }
    }
}

/// Costs and savings derived from accumulated flows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GatewaySummary {
    /// Net grid energy during peak after folding.
    pub net_peak_kwh: f64,
    /// Net grid energy during off-peak after folding.
    pub net_off_peak_kwh: f64,
    /// Whether a net peak export was moved into off-peak.
    pub net_peak_folded: bool,
    /// Total home consumption.
    pub home_kwh: f64,
    /// Cost of grid energy, EV included.
    pub grid_cost: f64,
    pub grid_cost_excluding_ev: f64,
    /// What the home would have paid with no solar, EV excluded.
    pub no_solar_cost: f64,
    pub solar_savings: f64,
    pub incentives: f64,
    pub solar_savings_with_incentives: f64,
    /// Peak share of home consumption, EV excluded.
    pub peak_ratio: f64,
    /// Home consumption, EV excluded, priced with the baseline peak ratio.
    pub baseline_cost: f64,
}

impl GatewaySummary {
    pub fn compute(
        flows: &FlowAccumulator,
        ev: &EvChargingEstimate,
        tariff: &GatewayTariff,
    ) -> Self {
        let mut net_peak = flows.grid.peak.net();
        let mut net_off_peak = flows.grid.off_peak.net();

        // A net peak export is credited at the off-peak price.
        let net_peak_folded = net_peak < 0.0;
        if net_peak_folded {
            debug!(
                "Folding net peak export of {:.2} kWh into off-peak",
                net_peak
            );
            net_off_peak += net_peak;
            net_peak = 0.0;
        }

        let home_kwh = flows.home.total_in();
        let mut grid_cost = net_peak * tariff.peak_price + net_off_peak * tariff.off_peak_price;

        let excess = home_kwh - (net_peak + net_off_peak);
        if excess < 0.0 {
            grid_cost += excess * tariff.net_metering_credit;
        }

        let grid_cost_excluding_ev = grid_cost - ev.cost;

        let home_peak = flows.home.peak.inflow;
        let home_off_peak = flows.home.off_peak.inflow - ev.kwh;
        let no_solar_cost = home_off_peak * tariff.off_peak_price + home_peak * tariff.peak_price;

        let solar_savings = no_solar_cost - grid_cost_excluding_ev;
        let incentives = flows.solar.total_in() * tariff.incentive_per_kwh();

        let adjusted_home = home_peak + home_off_peak;
        let peak_ratio = if adjusted_home == 0.0 {
            0.0
        } else {
            home_peak / adjusted_home
        };
        let ratio = tariff.baseline_peak_ratio;
        let baseline_cost = ratio * adjusted_home * tariff.peak_price
            + (1.0 - ratio) * adjusted_home * tariff.off_peak_price;

        Self {
            net_peak_kwh: net_peak,
            net_off_peak_kwh: net_off_peak,
            net_peak_folded,
            home_kwh,
            grid_cost,
            grid_cost_excluding_ev,
            no_solar_cost,
            solar_savings,
            incentives,
            solar_savings_with_incentives: solar_savings + incentives,
            peak_ratio,
            baseline_cost,
        }
    }
}

/// Metadata produced alongside a gateway analysis.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayMetadata {
    pub generated_at: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub include_battery: bool,
    pub days_loaded: usize,
    pub days_missing: usize,
    pub rows_discarded: usize,
    pub samples: usize,
    pub load_time_seconds: f64,
}

/// The complete output of [`analyze_gateway`].
#[derive(Debug, Clone, Serialize)]
pub struct GatewayAnalysis {
    pub flows: FlowAccumulator,
    pub ev: EvChargingEstimate,
    pub summary: GatewaySummary,
    pub metadata: GatewayMetadata,
}

/// Run the gateway pipeline over every day in `[options.start, options.end]`.
///
/// 1. Load daily files from `dir`, skipping missing days.
/// 2. Accumulate flows, with or without the battery.
/// 3. Estimate EV charging from raw home load.
/// 4. Derive costs and savings.
pub fn analyze_gateway(dir: &Path, options: &GatewayOptions) -> Result<GatewayAnalysis> {
    info!(
        "Analyzing gateway data {} to {} (battery: {})",
        options.start, options.end, options.include_battery
    );

    let load_start = Instant::now();
    let load = load_gateway_samples(dir, options.start, options.end)?;
    let load_time = load_start.elapsed().as_secs_f64();

    debug!(
        "Loaded {} samples from {} day(s), {} missing, {} rows discarded",
        load.samples.len(),
        load.days_loaded,
        load.days_missing,
        load.rows_discarded
    );

    let flows = FlowAccumulator::from_samples(
        &load.samples,
        &TouSchedule::default(),
        options.include_battery,
        options.tariff.battery_efficiency,
    );
    let ev = EvChargingEstimate::estimate(&load.samples, &options.ev, &options.tariff);
    let summary = GatewaySummary::compute(&flows, &ev, &options.tariff);

    Ok(GatewayAnalysis {
        flows,
        ev,
        summary,
        metadata: GatewayMetadata {
            generated_at: Utc::now().to_rfc3339(),
            start: options.start,
            end: options.end,
            include_battery: options.include_battery,
            days_loaded: load.days_loaded,
            days_missing: load.days_missing,
            rows_discarded: load.rows_discarded,
            samples: load.samples.len(),
            load_time_seconds: load_time,
        },
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{DirectionalFlow, NodeFlows};
    use std::io::Write;
    use tempfile::TempDir;
    use tou_core::TouError;

    const HEADER: &str = "ServiceAgreement,IntervalStart,IntervalEnd,Quantity,UnitOfMeasure";

    fn write_lines(dir: &Path, name: &str, lines: &[&str]) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
    }

    fn flow(inflow: f64, outflow: f64) -> DirectionalFlow {
        DirectionalFlow { inflow, outflow }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── compare_rates ─────────────────────────────────────────────────────────

    #[test]
    fn test_compare_rates_all_plans() {
        let dir = TempDir::new().unwrap();
        write_lines(
            dir.path(),
            "UsageData_2018-06.csv",
            &[
                HEADER,
                "1-RES,2018-06-04-14:00,2018-06-04-14:15,10,KWH",
                "1-NGEN,2018-06-04-14:00,2018-06-04-14:15,4,KWH",
            ],
        );

        let result = compare_rates(dir.path(), "UsageData_2*", None).unwrap();

        assert_eq!(result.costs.len(), 3);
        assert_eq!(result.costs[0].plan, RatePlanId::Rate1);
        assert_eq!(format!("{:.2}", result.costs[0].total_cost), "176.84");
        assert_eq!(result.metadata.records_loaded, 2);
        assert_eq!(result.metadata.net_generation_records, 1);
        assert!(result.cheapest.is_some());
    }

    #[test]
    fn test_compare_rates_single_plan() {
        let dir = TempDir::new().unwrap();
        write_lines(
            dir.path(),
            "UsageData_2018-06.csv",
            &[HEADER, "1-RES,2018-06-04-02:00,2018-06-04-02:15,1,KWH"],
        );

        let result = compare_rates(dir.path(), "UsageData_2*", Some("11")).unwrap();
        assert_eq!(result.costs.len(), 1);
        assert_eq!(result.cheapest, Some(RatePlanId::Rate11));
    }

    #[test]
    fn test_compare_rates_unknown_plan() {
        let dir = TempDir::new().unwrap();
        let err = compare_rates(dir.path(), "UsageData_2*", Some("7")).unwrap_err();
        assert!(matches!(err, TouError::UnknownRatePlan(_)));
    }

    #[test]
    fn test_compare_rates_no_files_costs_service_charge_only() {
        let dir = TempDir::new().unwrap();
        let result = compare_rates(dir.path(), "UsageData_2*", None).unwrap();
        assert_eq!(result.metadata.records_loaded, 0);
        assert!((result.costs[0].total_cost - 175.2).abs() < 1e-9);
    }

    // ── GatewaySummary::compute ───────────────────────────────────────────────

    fn typical_flows() -> FlowAccumulator {
        FlowAccumulator {
            home: NodeFlows {
                peak: flow(12.0, 0.0),
                off_peak: flow(30.0, 0.0),
            },
            solar: NodeFlows {
                peak: flow(5.0, 0.0),
                off_peak: flow(2.0, 0.0),
            },
            powerwall: NodeFlows::default(),
            grid: NodeFlows {
                peak: flow(10.0, -4.0),
                off_peak: flow(20.0, -1.0),
            },
            samples: 0,
        }
    }

    #[test]
    fn test_summary_typical() {
        let tariff = GatewayTariff::default();
        let ev = EvChargingEstimate {
            charging_samples: 10,
            kwh: 6.0,
            cost: 6.0 * tariff.off_peak_price,
        };
        let s = GatewaySummary::compute(&typical_flows(), &ev, &tariff);

        assert!(!s.net_peak_folded);
        assert!((s.net_peak_kwh - 6.0).abs() < 1e-12);
        assert!((s.net_off_peak_kwh - 19.0).abs() < 1e-12);
        assert!((s.grid_cost - 3.68241).abs() < 1e-9);
        assert!((s.grid_cost_excluding_ev - (3.68241 - 0.66798)).abs() < 1e-9);
        assert!((s.no_solar_cost - 5.8062).abs() < 1e-9);
        assert!((s.solar_savings - (s.no_solar_cost - s.grid_cost_excluding_ev)).abs() < 1e-12);
        assert!((s.incentives - 0.28).abs() < 1e-9);
        assert!((s.solar_savings_with_incentives - (s.solar_savings + 0.28)).abs() < 1e-9);
        assert!((s.peak_ratio - 1.0 / 3.0).abs() < 1e-12);

        let r = 40.0 / 168.0;
        let expected = r * 36.0 * 0.26119 + (1.0 - r) * 36.0 * 0.11133;
        assert!((s.baseline_cost - expected).abs() < 1e-9);
    }

    #[test]
    fn test_summary_folds_net_peak_export() {
        let mut flows = FlowAccumulator::default();
        flows.home.peak = flow(0.5, 0.0);
        flows.home.off_peak = flow(1.5, 0.0);
        flows.grid.peak = flow(1.0, -5.0);
        flows.grid.off_peak = flow(3.0, 0.0);

        let s = GatewaySummary::compute(
            &flows,
            &EvChargingEstimate::default(),
            &GatewayTariff::default(),
        );

        assert!(s.net_peak_folded);
        assert_eq!(s.net_peak_kwh, 0.0);
        assert!((s.net_off_peak_kwh + 1.0).abs() < 1e-12);
        // Home used more than the grid delivered, so no net-metering term.
        assert!((s.grid_cost + 0.11133).abs() < 1e-9);
    }

    #[test]
    fn test_summary_negative_excess_uses_net_rate() {
        let mut flows = FlowAccumulator::default();
        flows.home.off_peak = flow(4.0, 0.0);
        flows.grid.off_peak = flow(10.0, 0.0);

        let s = GatewaySummary::compute(
            &flows,
            &EvChargingEstimate::default(),
            &GatewayTariff::default(),
        );
        // 10 * 0.11133 - 6 * 0.15417
        assert!((s.grid_cost - 0.18828).abs() < 1e-9);
    }

    #[test]
    fn test_summary_empty_flows() {
        let s = GatewaySummary::compute(
            &FlowAccumulator::default(),
            &EvChargingEstimate::default(),
            &GatewayTariff::default(),
        );
        assert_eq!(s.peak_ratio, 0.0);
        assert_eq!(s.grid_cost, 0.0);
        assert_eq!(s.baseline_cost, 0.0);
    }

    // ── analyze_gateway ───────────────────────────────────────────────────────

    #[test]
    fn test_analyze_gateway_pipeline() {
        let dir = TempDir::new().unwrap();
        // Monday 2018-08-06; raw values are kW averages over five minutes.
        write_lines(
            dir.path(),
            "20180806.csv",
            &[
                "2018-08-06T14:00:00-04:00,6,-6,0,0",
                "2018-08-06T02:00:00-04:00,87.6,0,0,87.6",
                "2018-08-06T03:00:00-04:00,1,2,3",
                "2018-08-05T23:55:00-04:00,1,0,0,1",
            ],
        );

        let options = GatewayOptions::new(day(2018, 8, 5), day(2018, 8, 7), true);
        let result = analyze_gateway(dir.path(), &options).unwrap();

        assert_eq!(result.metadata.days_loaded, 1);
        assert_eq!(result.metadata.days_missing, 2);
        assert_eq!(result.metadata.rows_discarded, 2);
        assert_eq!(result.metadata.samples, 2);

        assert!((result.flows.home.peak.inflow - 0.5).abs() < 1e-12);
        assert!((result.flows.solar.peak.outflow + 0.5).abs() < 1e-12);
        assert!((result.flows.home.off_peak.inflow - 7.3).abs() < 1e-12);

        // The 87.6 kW sample is 7.3 kWh, well over the charger threshold.
        assert_eq!(result.ev.charging_samples, 1);
        assert!((result.ev.kwh - 7.3 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_analyze_gateway_without_battery() {
        let dir = TempDir::new().unwrap();
        write_lines(
            dir.path(),
            "20180806.csv",
            &["2018-08-06T15:00:00,6,0,-10.2,16.2"],
        );

        let options = GatewayOptions::new(day(2018, 8, 6), day(2018, 8, 6), false);
        let result = analyze_gateway(dir.path(), &options).unwrap();

        assert_eq!(result.flows.powerwall, NodeFlows::default());
        // 16.2/12 + (-10.2/12) / 0.85
        assert!((result.flows.grid.peak.inflow - 0.35).abs() < 1e-9);
        assert!(!result.metadata.include_battery);
    }

    #[test]
    fn test_analyze_gateway_reversed_range() {
        let dir = TempDir::new().unwrap();
        let options = GatewayOptions::new(day(2018, 8, 7), day(2018, 8, 6), true);
        let result = analyze_gateway(dir.path(), &options).unwrap();
        assert_eq!(result.metadata.samples, 0);
        assert_eq!(result.flows, FlowAccumulator::default());
    }
}
