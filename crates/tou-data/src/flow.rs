//! Directional energy flows for the home gateway.

use serde::Serialize;
use tou_core::classifier::TouSchedule;
use tou_core::models::{Direction, GatewaySample, Node, RateClass};
use tou_core::plans::GatewayTariff;

use crate::reader::SAMPLES_PER_HOUR;

// ── FlowAccumulator ───────────────────────────────────────────────────────────

/// `in` / `out` energy for one node in one rate class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DirectionalFlow {
    /// Sum of non-negative samples.
    pub inflow: f64,
    /// Sum of negative samples, so always `<= 0`.
    pub outflow: f64,
}

impl DirectionalFlow {
    fn add(&mut self, kwh: f64) {
        match Direction::of(kwh) {
            Direction::In => self.inflow += kwh,
            Direction::Out => self.outflow += kwh,
        }
    }

    pub fn get(&self, direction: Direction) -> f64 {
        match direction {
            Direction::In => self.inflow,
            Direction::Out => self.outflow,
        }
    }

    /// `inflow + outflow`.
    pub fn net(&self) -> f64 {
        self.inflow + self.outflow
    }
}

/// Peak / off-peak flows for one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NodeFlows {
    pub peak: DirectionalFlow,
    pub off_peak: DirectionalFlow,
}

impl NodeFlows {
    /// Gateway flows only ever use peak and off-peak; critical peak maps to
    /// peak.
    pub fn get(&self, class: RateClass) -> &DirectionalFlow {
        match class {
            RateClass::OffPeak => &self.off_peak,
            RateClass::Peak | RateClass::CritPeak => &self.peak,
        }
    }

    fn get_mut(&mut self, class: RateClass) -> &mut DirectionalFlow {
        match class {
            RateClass::OffPeak => &mut self.off_peak,
            RateClass::Peak | RateClass::CritPeak => &mut self.peak,
        }
    }

    /// Inflow across both classes.
    pub fn total_in(&self) -> f64 {
        self.peak.inflow + self.off_peak.inflow
    }
}

/// Per node, per rate class, per direction energy totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FlowAccumulator {
    pub home: NodeFlows,
    pub solar: NodeFlows,
    pub powerwall: NodeFlows,
    pub grid: NodeFlows,
    /// Number of samples added.
    pub samples: usize,
}

impl FlowAccumulator {
    pub fn node(&self, node: Node) -> &NodeFlows {
        match node {
            Node::Home => &self.home,
            Node::Solar => &self.solar,
            Node::Powerwall => &self.powerwall,
            Node::Grid => &self.grid,
        }
    }

    fn node_mut(&mut self, node: Node) -> &mut NodeFlows {
        match node {
            Node::Home => &mut self.home,
            Node::Solar => &mut self.solar,
            Node::Powerwall => &mut self.powerwall,
            Node::Grid => &mut self.grid,
        }
    }

    /// Bucket every node of one sample.
    pub fn add_sample(&mut self, sample: &GatewaySample, class: RateClass) {
        for node in Node::ALL {
            self.node_mut(node).get_mut(class).add(sample.node(node));
        }
        self.samples += 1;
    }

    /// Accumulate `samples`. With `include_battery` unset, each sample's
    /// battery flow is first folded into the grid.
    pub fn from_samples(
        samples: &[GatewaySample],
        schedule: &TouSchedule,
        include_battery: bool,
        battery_efficiency: f64,
    ) -> Self {
        let mut acc = Self::default();
        for sample in samples {
            let sample = if include_battery {
                *sample
            } else {
                sample.without_battery(battery_efficiency)
            };
            let class = schedule.classify_gateway(&sample.timestamp);
            acc.add_sample(&sample, class);
        }
        acc
    }
}

// ── EV charging ───────────────────────────────────────────────────────────────

/// How EV charging is recognised in home load and how it is priced.
///
/// Pricing every charging interval at a single class is a heuristic; the
/// class is not measured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvChargingAssumption {
    /// Charger draw in kW.
    pub charger_kw: f64,
    /// Fraction of the charger draw above which home load counts as charging.
    pub detection_threshold: f64,
    /// Rate class all charging energy is priced at.
    pub priced_as: RateClass,
}

impl Default for EvChargingAssumption {
    fn default() -> Self {
        Self {
            charger_kw: 7.3,
            detection_threshold: 0.95,
            priced_as: RateClass::OffPeak,
        }
    }
}

impl EvChargingAssumption {
    /// Per-sample home kWh above which a sample counts as charging.
    pub fn sample_threshold_kwh(&self) -> f64 {
        self.charger_kw / SAMPLES_PER_HOUR * self.detection_threshold
    }
}

/// Estimated EV charging energy and its cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EvChargingEstimate {
    pub charging_samples: usize,
    pub kwh: f64,
    pub cost: f64,
}

impl EvChargingEstimate {
    /// Count home samples drawing more than the threshold and credit each
    /// with a full interval at the charger's rate.
    pub fn estimate(
        samples: &[GatewaySample],
        assumption: &EvChargingAssumption,
        tariff: &GatewayTariff,
    ) -> Self {
        let threshold = assumption.sample_threshold_kwh();
        let charging_samples = samples.iter().filter(|s| s.home > threshold).count();
        let kwh = charging_samples as f64 / SAMPLES_PER_HOUR * assumption.charger_kw;
        Self {
            charging_samples,
            kwh,
            cost: kwh * tariff.unit_price(assumption.priced_as),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
