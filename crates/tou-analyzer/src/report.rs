//! Plain-text reports written to stdout.

use std::fmt::Write;

use tou_core::formatting::{format_currency, format_kwh, percentage};
use tou_core::models::{Node, PlanCost, RateClass};
use tou_data::analysis::{GatewayAnalysis, RateComparison};

// ── Rate comparison ───────────────────────────────────────────────────────────

/// One line per plan.
pub fn rate_line(cost: &PlanCost) -> String {
    let peak = cost.usage.get(RateClass::Peak);
    let off_peak = cost.usage.get(RateClass::OffPeak);
    let crit_peak = cost.usage.get(RateClass::CritPeak);
    format!(
        "Rate: {}  Cost of power from grid: ${:.2}  Total kWh: {:.1}  \
         Peak kWh: {:.1}  OffPeak kWh: {:.1}  CritPeak kWh: {:.1}  \
         Peak count: {}  OffPeak count: {}  CritPeak count: {}",
        cost.plan,
        cost.total_cost,
        cost.total_kwh,
        peak.kwh,
        off_peak.kwh,
        crit_peak.kwh,
        peak.count,
        off_peak.count,
        crit_peak.count,
    )
}

pub fn render_rate_comparison(result: &RateComparison) -> String {
    let mut out = String::new();
    for cost in &result.costs {
        let _ = writeln!(out, "{}", rate_line(cost));
    }

    if result.costs.len() > 1 {
        if let Some(best) = result
            .cheapest
            .and_then(|id| result.costs.iter().find(|c| c.plan == id))
        {
            let _ = writeln!(
                out,
                "\nCheapest: Rate {} at {} for {}",
                best.plan,
                format_currency(best.total_cost),
                format_kwh(best.total_kwh)
            );
        }
    }
    out
}

// ── Gateway ───────────────────────────────────────────────────────────────────

const TABLE_NODES: [Node; 4] = [Node::Home, Node::Grid, Node::Solar, Node::Powerwall];

pub fn render_gateway(result: &GatewayAnalysis) -> String {
    let flows = &result.flows;
    let ev = &result.ev;
    let s = &result.summary;
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(out, "EV kWh: {:.2}  EV cost: ${:.2}", ev.kwh, ev.cost);
    let _ = writeln!(out);

    let _ = writeln!(out, "{:^44}", "Power usage excluding EV");
    let _ = writeln!(out, "{:>23}{:>16}", "Offpeak", "Peak");
    let _ = writeln!(out, "{:9}{:>6}{:>10}{:>8}{:>10}", "Source", "In", "Out", "In", "Out");
    let _ = writeln!(out, "{}", "=".repeat(45));
    for node in TABLE_NODES {
        let n = flows.node(node);
        // EV charging draws through the home and the grid.
        let ev_adj = if matches!(node, Node::Home | Node::Grid) {
            ev.kwh
        } else {
            0.0
        };
        let _ = writeln!(
            out,
            "{:8}{:9.2}{:9.2}{:9.2}{:9.2}",
            node.as_str(),
            n.off_peak.inflow - ev_adj,
            n.off_peak.outflow,
            n.peak.inflow,
            n.peak.outflow,
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{:35} ${:8.2}", "Grid cost (excluding EV):", s.grid_cost_excluding_ev);
    let _ = writeln!(out, "{:35} ${:8.2}", "No-solar grid cost (excluding EV):", s.no_solar_cost);
    let _ = writeln!(out);
    let _ = writeln!(out, "{:35} ${:8.2}", "Solar savings (without incentives):", s.solar_savings);
    let _ = writeln!(
        out,
        "{:35} ${:8.2}",
        "Solar savings (with incentives):", s.solar_savings_with_incentives
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:35} {:>8}%",
        "Peak share of home usage:",
        percentage(s.peak_ratio, 1.0, 1)
    );
    let _ = writeln!(out, "{:35} ${:8.2}", "Baseline cost (excluding EV):", s.baseline_cost);
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use tou_core::models::UsageByClass;
    use tou_core::plans::{GatewayTariff, RatePlanId};
    use tou_data::analysis::{GatewayMetadata, GatewaySummary, RateComparisonMetadata};
    use tou_data::flow::{DirectionalFlow, EvChargingEstimate, FlowAccumulator};

    fn plan_cost(plan: RatePlanId, total_cost: f64, peak_kwh: f64) -> PlanCost {
        let mut usage = UsageByClass::default();
        usage.get_mut(RateClass::Peak).add(peak_kwh);
        PlanCost {
            plan,
            total_cost,
            total_kwh: peak_kwh,
            usage,
        }
    }

    #[test]
    fn test_rate_line_format() {
        let line = rate_line(&plan_cost(RatePlanId::Rate1, 176.8446, 10.0));
        assert!(line.starts_with("Rate: 01  Cost of power from grid: $176.84  Total kWh: 10.0  Peak kWh: 10.0"));
        assert!(line.ends_with("Peak count: 1  OffPeak count: 0  CritPeak count: 0"));
    }

    #[test]
    fn test_render_rate_comparison_names_cheapest() {
        let result = RateComparison {
            costs: vec![
                plan_cost(RatePlanId::Rate1, 1200.0, 10.0),
                plan_cost(RatePlanId::Rate14, 1100.5, 10.0),
            ],
            cheapest: Some(RatePlanId::Rate14),
            metadata: RateComparisonMetadata {
                generated_at: Utc::now().to_rfc3339(),
                records_loaded: 1,
                net_generation_records: 0,
                load_time_seconds: 0.0,
            },
        };
        let text = render_rate_comparison(&result);
        assert_eq!(text.lines().filter(|l| l.starts_with("Rate: ")).count(), 2);
        assert!(text.contains("Cheapest: Rate 14 at $1,100.50 for 10.0 kWh"));
    }

    #[test]
    fn test_render_gateway_subtracts_ev_from_home_and_grid() {
        let mut flows = FlowAccumulator::default();
        flows.home.off_peak = DirectionalFlow {
            inflow: 10.0,
            outflow: 0.0,
        };
        flows.grid.off_peak = DirectionalFlow {
            inflow: 8.0,
            outflow: -1.0,
        };
        flows.solar.off_peak = DirectionalFlow {
            inflow: 3.0,
            outflow: 0.0,
        };
        let ev = EvChargingEstimate {
            charging_samples: 12,
            kwh: 7.3,
            cost: 0.81,
        };
        let tariff = GatewayTariff::default();
        let day = NaiveDate::from_ymd_opt(2018, 8, 6).unwrap();
        let result = GatewayAnalysis {
            flows,
            ev,
            summary: GatewaySummary::compute(&flows, &ev, &tariff),
            metadata: GatewayMetadata {
                generated_at: Utc::now().to_rfc3339(),
                start: day,
                end: day,
                include_battery: true,
                days_loaded: 1,
                days_missing: 0,
                rows_discarded: 0,
                samples: 0,
                load_time_seconds: 0.0,
            },
        };

        let text = render_gateway(&result);
        assert!(text.contains("EV kWh: 7.30  EV cost: $0.81"));
        assert!(text.contains("home         2.70     0.00     0.00     0.00"));
        assert!(text.contains("grid         0.70    -1.00     0.00     0.00"));
        assert!(text.contains("solar        3.00     0.00     0.00     0.00"));
        assert!(text.contains("pwall        0.00     0.00     0.00     0.00"));
        assert!(text.contains("Solar savings (with incentives):"));
    }
}
