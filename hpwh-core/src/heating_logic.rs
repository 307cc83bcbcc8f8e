//! Predicates over tank state deciding turn-on and shut-off for a heat
//! source.
//!
//! Grounded on `original_source/src/HPWHHeatingLogics.cc`'s node-weight
//! convention: a node weight's `logical_node` is `0` for the bottom-most
//! physical tank node, `13` (`LOGIC_NODE_SIZE + 1`) for the top-most
//! physical node, and `1..=12` for the twelve-slot logical-node grid the
//! tank is otherwise resampled onto.

use twine_core::Fraction;
use uom::si::f64::{TemperatureInterval, ThermodynamicTemperature};
use uom::si::temperature_interval::degree_celsius as delta_celsius;
use uom::si::thermodynamic_temperature::degree_celsius;

use crate::error::HpwhError;
use crate::tank::Tank;
use crate::units::CONDENSITY_SIZE;

/// The top-most physical-node sentinel in the node-weight convention.
pub const TOP_PHYSICAL_NODE: usize = CONDENSITY_SIZE + 1;

/// Which way a heating-logic predicate is being evaluated: turn-on
/// predicates subtract the hysteresis from the decision point, shut-off
/// predicates add it, so a single crossing does not chatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HysteresisDirection {
    TurnOn,
    ShutOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    GreaterOrEqual,
    LessOrEqual,
}

impl Comparator {
    #[must_use]
    fn compare(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparator::GreaterOrEqual => lhs >= rhs,
            Comparator::LessOrEqual => lhs <= rhs,
        }
    }
}

/// Either an absolute decision point or one expressed as a delta below the
/// tank's setpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecisionPoint {
    Absolute(ThermodynamicTemperature),
    BelowSetpoint(TemperatureInterval),
}

impl DecisionPoint {
    fn resolve_c(self, setpoint: ThermodynamicTemperature) -> f64 {
        match self {
            DecisionPoint::Absolute(t) => t.get::<degree_celsius>(),
            DecisionPoint::BelowSetpoint(delta) => {
                setpoint.get::<degree_celsius>() - delta.get::<delta_celsius>()
            }
        }
    }
}

/// A single (logical-node, weight) pair contributing to a weighted average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeWeight {
    /// `0` for the bottom-most physical node, `13` for the top-most
    /// physical node, `1..=12` for a slot in the logical-node grid.
    pub logical_node: usize,
    pub weight: f64,
}

impl NodeWeight {
    pub fn new(logical_node: usize, weight: f64) -> Result<Self, HpwhError> {
        if logical_node > TOP_PHYSICAL_NODE {
            return Err(HpwhError::ConfigurationInvalid(format!(
                "node weight index {logical_node} out of range [0, {TOP_PHYSICAL_NODE}]"
            )));
        }
        if weight < 0.0 {
            return Err(HpwhError::ConfigurationInvalid(
                "node weights must be non-negative".to_string(),
            ));
        }
        Ok(Self { logical_node, weight })
    }
}

/// Named shorthands for common node-weight groupings, desugared once at
/// construction time into an equivalent list of [`NodeWeight`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedShorthand {
    BottomThird,
    TopThird,
    TopSixth,
    Standby,
    LargeDraw,
    BottomNodeMaxTemp,
    TopNodeMaxTemp,
}

impl NamedShorthand {
    #[must_use]
    pub fn node_weights(self) -> Vec<NodeWeight> {
        let slots = |range: std::ops::RangeInclusive<usize>| {
            range.map(|n| NodeWeight { logical_node: n, weight: 1.0 }).collect()
        };
        match self {
            NamedShorthand::BottomThird => slots(1..=4),
            NamedShorthand::TopThird => slots(9..=12),
            NamedShorthand::TopSixth => slots(11..=12),
            NamedShorthand::Standby | NamedShorthand::TopNodeMaxTemp => {
                vec![NodeWeight { logical_node: TOP_PHYSICAL_NODE, weight: 1.0 }]
            }
            NamedShorthand::LargeDraw | NamedShorthand::BottomNodeMaxTemp => {
                vec![NodeWeight { logical_node: 0, weight: 1.0 }]
            }
        }
    }
}

/// A predicate comparing a weighted average of tank node temperatures
/// against a decision point.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedNodeCompare {
    pub node_weights: Vec<NodeWeight>,
    pub decision_point: DecisionPoint,
    pub comparator: Comparator,
    pub hysteresis: TemperatureInterval,
}

impl WeightedNodeCompare {
    /// Builds a predicate from a named shorthand, supplying the decision
    /// point, comparator, and hysteresis the shorthand itself does not fix.
    #[must_use]
    pub fn from_shorthand(
        shorthand: NamedShorthand,
        decision_point: DecisionPoint,
        comparator: Comparator,
        hysteresis: TemperatureInterval,
    ) -> Self {
        Self {
            node_weights: shorthand.node_weights(),
            decision_point,
            comparator,
            hysteresis,
        }
    }

    fn weighted_average_c(&self, tank: &Tank) -> Result<f64, HpwhError> {
        if self.node_weights.is_empty() {
            return Err(HpwhError::ConfigurationInvalid(
                "a weighted node comparison needs at least one node weight".to_string(),
            ));
        }

        let resampled = tank.resample_to_logical_nodes();
        let temps = tank.temperatures();
        let top = temps.len() - 1;

        let mut sum = 0.0;
        let mut total_weight = 0.0;
        for nw in &self.node_weights {
            let temp_c = if nw.logical_node == 0 {
                temps[0].get::<degree_celsius>()
            } else if nw.logical_node == TOP_PHYSICAL_NODE {
                temps[top].get::<degree_celsius>()
            } else {
                resampled[nw.logical_node - 1]
            };
            sum += temp_c * nw.weight;
            total_weight += nw.weight;
        }

        if total_weight.abs() < f64::EPSILON {
            return Err(HpwhError::ConfigurationInvalid(
                "node weights must not sum to zero".to_string(),
            ));
        }

        Ok(sum / total_weight)
    }

    fn is_satisfied(&self, tank: &Tank, direction: HysteresisDirection) -> Result<bool, HpwhError> {
        let avg_c = self.weighted_average_c(tank)?;
        let hysteresis_c = self.hysteresis.get::<delta_celsius>();
        let signed_hysteresis_c = match direction {
            HysteresisDirection::TurnOn => -hysteresis_c,
            HysteresisDirection::ShutOff => hysteresis_c,
        };
        let decision_c = self.decision_point.resolve_c(tank.setpoint()) + signed_hysteresis_c;

        if !avg_c.is_finite() || !decision_c.is_finite() {
            return Err(HpwhError::NumericFailure(
                "non-finite value in heating-logic evaluation".to_string(),
            ));
        }

        Ok(self.comparator.compare(avg_c, decision_c))
    }
}

/// Where the mains/inlet reference temperature for a state-of-charge
/// predicate comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MainsReference {
    Constant(ThermodynamicTemperature),
    InletTemperature,
}

/// A predicate comparing the tank's state of charge against a decision
/// point plus a hysteresis fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoCCompare {
    pub decision_point: Fraction,
    pub hysteresis: Fraction,
    pub min_useful_temp: ThermodynamicTemperature,
    pub mains: MainsReference,
}

impl SoCCompare {
    fn is_satisfied(
        &self,
        tank: &Tank,
        inlet_temp: ThermodynamicTemperature,
        direction: HysteresisDirection,
    ) -> Result<bool, HpwhError> {
        let mains = match self.mains {
            MainsReference::Constant(t) => t,
            MainsReference::InletTemperature => inlet_temp,
        };
        let soc = tank.state_of_charge(mains, self.min_useful_temp)?.get();

        let signed_hysteresis = match direction {
            HysteresisDirection::TurnOn => -self.hysteresis.get(),
            HysteresisDirection::ShutOff => self.hysteresis.get(),
        };
        let threshold = self.decision_point.get() + signed_hysteresis;

        // State of charge falling to or below the threshold calls for heat;
        // rising to or above it calls to stop.
        Ok(match direction {
            HysteresisDirection::TurnOn => soc <= threshold,
            HysteresisDirection::ShutOff => soc >= threshold,
        })
    }
}

/// A heating-logic predicate: either a weighted-node temperature
/// comparison or a state-of-charge comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum HeatingLogic {
    WeightedNodeCompare(WeightedNodeCompare),
    SoCCompare(SoCCompare),
}

impl HeatingLogic {
    pub fn is_satisfied(
        &self,
        tank: &Tank,
        inlet_temp: ThermodynamicTemperature,
        direction: HysteresisDirection,
    ) -> Result<bool, HpwhError> {
        match self {
            HeatingLogic::WeightedNodeCompare(logic) => logic.is_satisfied(tank, direction),
            HeatingLogic::SoCCompare(logic) => logic.is_satisfied(tank, inlet_temp, direction),
        }
    }
}
