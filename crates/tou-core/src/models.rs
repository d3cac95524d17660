use serde::{Deserialize, Serialize};
use std::fmt;

use crate::plans::RatePlanId;
use crate::time_utils::IntervalTimestamp;

/// Service-agreement marker for net-generation rows in utility exports.
pub const NET_GENERATION_TAG: &str = "NGEN";

/// Time-of-use pricing window an interval falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateClass {
    Peak,
    #[serde(rename = "offpeak")]
    OffPeak,
    #[serde(rename = "critpeak")]
    CritPeak,
}

impl RateClass {
    /// All classes in report order.
    pub const ALL: [RateClass; 3] = [RateClass::Peak, RateClass::OffPeak, RateClass::CritPeak];

    pub fn as_str(&self) -> &'static str {
        match self {
            RateClass::Peak => "peak",
            RateClass::OffPeak => "offpeak",
            RateClass::CritPeak => "critpeak",
        }
    }
}

impl fmt::Display for RateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a utility interval export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalRecord {
    /// Start of the interval.
    pub timestamp: IntervalTimestamp,
    /// Raw `ServiceAgreement` column.
    pub service_agreement: String,
    /// Energy delivered during the interval.
    pub quantity_kwh: f64,
}

impl IntervalRecord {
    /// `true` for net-generation rows, which never count towards billing.
    pub fn is_net_generation(&self) -> bool {
        self.service_agreement.contains(NET_GENERATION_TAG)
    }
}

/// A metered point on the home energy gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Home,
    Solar,
    Powerwall,
    Grid,
}

impl Node {
    pub const ALL: [Node; 4] = [Node::Home, Node::Solar, Node::Powerwall, Node::Grid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Node::Home => "home",
            Node::Solar => "solar",
            Node::Powerwall => "pwall",
            Node::Grid => "grid",
        }
    }
}

/// Sign of an energy flow: `In` for `>= 0`, `Out` for `< 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn of(kwh: f64) -> Self {
        if kwh < 0.0 {
            Direction::Out
        } else {
            Direction::In
        }
    }
}

/// One five-minute sample from the home energy gateway, in kWh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GatewaySample {
    pub timestamp: IntervalTimestamp,
    pub home: f64,
    pub solar: f64,
    pub powerwall: f64,
    pub grid: f64,
}

impl GatewaySample {
    pub fn node(&self, node: Node) -> f64 {
        match node {
            Node::Home => self.home,
            Node::Solar => self.solar,
            Node::Powerwall => self.powerwall,
            Node::Grid => self.grid,
        }
    }

    /// Fold the battery flow into the grid, modelling a home without storage.
    ///
    /// Energy the battery absorbed (negative) would have been exported at the
    /// grid, scaled by round-trip efficiency; energy it supplied would have
    /// been imported as is.
    pub fn without_battery(mut self, round_trip_efficiency: f64) -> Self {
        if self.powerwall < 0.0 {
            self.grid += self.powerwall / round_trip_efficiency;
        } else {
            self.grid += self.powerwall;
        }
        self.powerwall = 0.0;
        self
    }
}

/// Running energy total and contributing-record count for one rate class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassUsage {
    pub kwh: f64,
    pub count: u32,
}

impl ClassUsage {
    pub fn add(&mut self, kwh: f64) {
        self.kwh += kwh;
        self.count += 1;
    }
}

/// Usage accumulated per [`RateClass`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageByClass {
    pub peak: ClassUsage,
    pub off_peak: ClassUsage,
    pub crit_peak: ClassUsage,
}

impl UsageByClass {
    pub fn get(&self, class: RateClass) -> &ClassUsage {
        match class {
            RateClass::Peak => &self.peak,
            RateClass::OffPeak => &self.off_peak,
            RateClass::CritPeak => &self.crit_peak,
        }
    }

    pub fn get_mut(&mut self, class: RateClass) -> &mut ClassUsage {
        match class {
            RateClass::Peak => &mut self.peak,
            RateClass::OffPeak => &mut self.off_peak,
            RateClass::CritPeak => &mut self.crit_peak,
        }
    }

    /// Sum of kWh over every class.
    pub fn total_kwh(&self) -> f64 {
        self.peak.kwh + self.off_peak.kwh + self.crit_peak.kwh
    }

    pub fn total_count(&self) -> u32 {
        self.peak.count + self.off_peak.count + self.crit_peak.count
    }
}

/// Result of evaluating a record set under one rate plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanCost {
    pub plan: RatePlanId,
    /// Annualised service charge plus energy charges.
    pub total_cost: f64,
    pub total_kwh: f64,
    pub usage: UsageByClass,
}
