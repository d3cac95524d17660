//! Rate-plan cost aggregation over utility interval records.

use tou_core::classifier::TouSchedule;
use tou_core::models::{IntervalRecord, PlanCost, UsageByClass};
use tou_core::plans::{RatePlan, RatePlans};

// ── CostAggregator ────────────────────────────────────────────────────────────

/// Stateless helper that prices a record set under a rate plan.
pub struct CostAggregator;

impl CostAggregator {
    /// Price `records` under `plan`.
    ///
    /// Starts from the annualised service charge, skips net-generation rows
    /// and adds each remaining record to exactly one rate class.
    pub fn aggregate(records: &[IntervalRecord], plan: &RatePlan, schedule: &TouSchedule) -> PlanCost {
        let mut total_cost = plan.annual_service_charge();
        let mut total_kwh = 0.0;
        let mut usage = UsageByClass::default();

        for record in records {
            if record.is_net_generation() {
                continue;
            }

            let class = schedule.classify_for_plan(&record.timestamp, plan);
            let kwh = record.quantity_kwh;

            total_cost += kwh * plan.unit_price(class);
            total_kwh += kwh;
            usage.get_mut(class).add(kwh);
        }

        PlanCost {
            plan: plan.id,
            total_cost,
            total_kwh,
            usage,
        }
    }

    /// Price `records` under every predefined plan, in plan order.
    pub fn compare_all(records: &[IntervalRecord], schedule: &TouSchedule) -> Vec<PlanCost> {
        RatePlans::all_plans()
            .iter()
            .map(|plan| Self::aggregate(records, plan, schedule))
            .collect()
    }

    /// The cheapest of `costs`, if any.
    pub fn cheapest(costs: &[PlanCost]) -> Option<&PlanCost> {
        costs
            .iter()
            .min_by(|a, b| a.total_cost.total_cmp(&b.total_cost))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
