use crate::error::{Result, TouError};
use crate::models::RateClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Days in the billing year used to annualise the daily service charge.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Predefined utility tariffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RatePlanId {
    /// Rate 1: flat residential.
    Rate1,
    /// Rate 11: residential time-of-use.
    Rate11,
    /// Rate 14: time-of-use with critical-peak events.
    Rate14,
}

impl FromStr for RatePlanId {
    type Err = TouError;

    /// Accepts the plan number with or without a leading zero or `rate`
    /// prefix (`"1"`, `"01"`, `"rate14"`).
    fn from_str(value: &str) -> Result<Self> {
        let lower = value.trim().to_lowercase();
        let digits = lower.strip_prefix("rate").unwrap_or(&lower).trim();
        match digits.parse::<u8>() {
            Ok(1) => Ok(RatePlanId::Rate1),
            Ok(11) => Ok(RatePlanId::Rate11),
            Ok(14) => Ok(RatePlanId::Rate14),
            _ => Err(TouError::UnknownRatePlan(value.to_string())),
        }
    }
}

impl RatePlanId {
    pub const ALL: [RatePlanId; 3] = [RatePlanId::Rate1, RatePlanId::Rate11, RatePlanId::Rate14];

    /// The utility's numeric tariff tag.
    pub fn number(&self) -> u8 {
        match self {
            RatePlanId::Rate1 => 1,
            RatePlanId::Rate11 => 11,
            RatePlanId::Rate14 => 14,
        }
    }
}

impl fmt::Display for RatePlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.number())
    }
}

/// Immutable pricing record for a single utility tariff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePlan {
    pub id: RatePlanId,
    /// Human-readable plan name for display purposes.
    pub display_name: String,
    /// Fixed charge per day.
    pub daily_service_charge: f64,
    /// Price per kWh during the peak window.
    pub peak_price: f64,
    /// Price per kWh outside the peak window.
    pub off_peak_price: f64,
    /// Price per kWh during critical-peak events, for plans that have them.
    pub crit_peak_price: Option<f64>,
}

impl RatePlan {
    /// `true` when the plan bills critical-peak events separately.
    pub fn has_critical_peak(&self) -> bool {
        self.crit_peak_price.is_some()
    }

    /// Unit price for `class`.
    ///
    /// Plans without critical-peak pricing never classify into
    /// [`RateClass::CritPeak`]; should it be asked anyway, the peak price is
    /// returned.
    pub fn unit_price(&self, class: RateClass) -> f64 {
        match class {
            RateClass::Peak => self.peak_price,
            RateClass::OffPeak => self.off_peak_price,
            RateClass::CritPeak => self.crit_peak_price.unwrap_or(self.peak_price),
        }
    }

    /// Service charge over a full year.
    pub fn annual_service_charge(&self) -> f64 {
        DAYS_PER_YEAR * self.daily_service_charge
    }
}

// ── Plan data ─────────────────────────────────────────────────────────────────

fn plan_table() -> BTreeMap<RatePlanId, RatePlan> {
    let mut map = BTreeMap::new();
    map.insert(
        RatePlanId::Rate1,
        RatePlan {
            id: RatePlanId::Rate1,
            display_name: "Rate 1 (flat)".to_string(),
            daily_service_charge: 0.480,
            peak_price: 0.16446,
            off_peak_price: 0.16446,
            crit_peak_price: None,
        },
    );
    map.insert(
        RatePlanId::Rate11,
        RatePlan {
            id: RatePlanId::Rate11,
            display_name: "Rate 11 (time-of-use)".to_string(),
            daily_service_charge: 0.635,
            peak_price: 0.26114,
            off_peak_price: 0.11131,
            crit_peak_price: None,
        },
    );
    map.insert(
        RatePlanId::Rate14,
        RatePlan {
            id: RatePlanId::Rate14,
            display_name: "Rate 14 (critical peak)".to_string(),
            daily_service_charge: 0.635,
            peak_price: 0.25428,
            off_peak_price: 0.10839,
            crit_peak_price: Some(0.67216),
        },
    );
    map
}

/// Registry of the predefined tariffs.
pub struct RatePlans;

impl RatePlans {
    /// All plans in ascending id order.
    pub fn all_plans() -> Vec<RatePlan> {
        plan_table().into_values().collect()
    }

    /// The pricing record for `id`.
    pub fn get_plan(id: RatePlanId) -> RatePlan {
        match plan_table().remove(&id) {
            Some(plan) => plan,
            None => unreachable!("plan_table covers every RatePlanId"),
        }
    }

    /// Look a plan up by its textual identifier.
    pub fn get_plan_by_name(name: &str) -> Result<RatePlan> {
        let id = name.parse::<RatePlanId>()?;
        Ok(Self::get_plan(id))
    }
}

// ── Home gateway tariff ───────────────────────────────────────────────────────

/// Fixed prices and physical constants used by the gateway analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GatewayTariff {
    pub peak_price: f64,
    pub off_peak_price: f64,
    /// Credit per kWh of net export.
    pub net_metering_credit: f64,
    /// Per-kWh solar production incentive.
    pub solar_incentive: f64,
    /// Per-kWh renewable energy certificate value.
    pub renewable_certificate: f64,
    /// Battery round-trip efficiency.
    pub battery_efficiency: f64,
    /// Share of the week's hours that are peak: weekdays, 8 of 24 hours.
    pub baseline_peak_ratio: f64,
}

impl Default for GatewayTariff {
    fn default() -> Self {
        Self {
            peak_price: 0.26119,
            off_peak_price: 0.11133,
            net_metering_credit: 0.15417,
            solar_incentive: 0.01,
            renewable_certificate: 0.03,
            battery_efficiency: 0.85,
            baseline_peak_ratio: (8.0 * 5.0) / (7.0 * 24.0),
        }
    }
}

impl GatewayTariff {
    /// Unit price for a gateway rate class. Critical peak does not exist on
    /// this tariff and is priced as peak.
    pub fn unit_price(&self, class: RateClass) -> f64 {
        match class {
            RateClass::OffPeak => self.off_peak_price,
            RateClass::Peak | RateClass::CritPeak => self.peak_price,
        }
    }

    /// Combined solar incentives per kWh produced.
    pub fn incentive_per_kwh(&self) -> f64 {
        self.solar_incentive + self.renewable_certificate
    }
}
