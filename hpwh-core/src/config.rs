//! Plain, serde-derived configuration structs mirroring the key/value
//! shape spec.md §6 describes for file-based configuration.
//!
//! These types carry no behavior of their own: a host application
//! deserializes them with whatever format it prefers (JSON, YAML, the
//! whitespace-token format `hpwh-config` reads) and then converts them
//! into the runtime [`crate::Tank`]/[`crate::HeatSource`] types via
//! [`TankConfig::build`]/[`HeatSourceConfig::build`].

use uom::si::f64::{Power, ThermodynamicTemperature, Volume};
use uom::si::power::kilowatt;
use uom::si::thermodynamic_temperature::degree_celsius;
use uom::si::volume::liter;

use crate::condensity::Condensity;
use crate::error::HpwhError;
use crate::heat_source::delivery::ExternalFlow;
use crate::heat_source::{HeatSource, HeatSourceIndex, HeatSourceKind};
use crate::heating_logic::{
    Comparator, DecisionPoint, HeatingLogic, MainsReference, NamedShorthand, SoCCompare,
    WeightedNodeCompare,
};
use crate::performance_map::{Defrost, ListAnchor, PerformanceMap};
use crate::tank::Tank;
use crate::units::UaKjPerHourC;

#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TankConfig {
    pub num_nodes: usize,
    pub volume_l: f64,
    pub ua_kj_per_hour_c: f64,
    pub setpoint_c: f64,
    pub mix_on_draw: bool,
}

impl TankConfig {
    pub fn build(&self) -> Result<Tank, HpwhError> {
        Tank::new(
            self.num_nodes,
            Volume::new::<liter>(self.volume_l),
            UaKjPerHourC::new(self.ua_kj_per_hour_c),
            ThermodynamicTemperature::new::<degree_celsius>(self.setpoint_c),
            self.mix_on_draw,
        )
    }
}

/// A single (logical_node, weight) entry in a condensity/node-weight
/// configuration list.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeWeightConfig {
    pub logical_node: usize,
    pub weight: f64,
}

/// The decision-point half of a logic entry: either an absolute
/// temperature or a delta below the tank's setpoint.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecisionPointConfig {
    AbsoluteC(f64),
    BelowSetpointC(f64),
}

impl DecisionPointConfig {
    fn build(self) -> DecisionPoint {
        match self {
            DecisionPointConfig::AbsoluteC(c) => {
                DecisionPoint::Absolute(ThermodynamicTemperature::new::<degree_celsius>(c))
            }
            DecisionPointConfig::BelowSetpointC(delta_c) => DecisionPoint::BelowSetpoint(
                uom::si::f64::TemperatureInterval::new::<uom::si::temperature_interval::degree_celsius>(delta_c),
            ),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparatorConfig {
    GreaterOrEqual,
    LessOrEqual,
}

impl ComparatorConfig {
    fn build(self) -> Comparator {
        match self {
            ComparatorConfig::GreaterOrEqual => Comparator::GreaterOrEqual,
            ComparatorConfig::LessOrEqual => Comparator::LessOrEqual,
        }
    }
}

/// A turn-on or shut-off logic entry, selected either by the name of a
/// standard shorthand (`"bottomThird"`, `"topThird"`, `"topSixth"`,
/// `"standby"`, `"largeDraw"`, `"bottomNodeMaxTemp"`, `"topNodeMaxTemp"`,
/// `"stateOfCharge"`) or by an explicit node-weight list.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum HeatingLogicConfig {
    Shorthand {
        selector: String,
        decision_point: DecisionPointConfig,
        comparator: ComparatorConfig,
        hysteresis_c: f64,
    },
    NodeWeights {
        weights: Vec<NodeWeightConfig>,
        decision_point: DecisionPointConfig,
        comparator: ComparatorConfig,
        hysteresis_c: f64,
    },
    StateOfCharge {
        decision_point: f64,
        hysteresis: f64,
        min_useful_temp_c: f64,
        mains_c: Option<f64>,
    },
}

impl HeatingLogicConfig {
    fn build(&self) -> Result<HeatingLogic, HpwhError> {
        match self {
            HeatingLogicConfig::Shorthand {
                selector,
                decision_point,
                comparator,
                hysteresis_c,
            } => {
                let shorthand = parse_shorthand(selector)?;
                Ok(HeatingLogic::WeightedNodeCompare(WeightedNodeCompare::from_shorthand(
                    shorthand,
                    decision_point.build(),
                    comparator.build(),
                    uom::si::f64::TemperatureInterval::new::<uom::si::temperature_interval::degree_celsius>(
                        *hysteresis_c,
                    ),
                )))
            }
            HeatingLogicConfig::NodeWeights {
                weights,
                decision_point,
                comparator,
                hysteresis_c,
            } => {
                let node_weights = weights
                    .iter()
                    .map(|w| crate::heating_logic::NodeWeight::new(w.logical_node, w.weight))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(HeatingLogic::WeightedNodeCompare(WeightedNodeCompare {
                    node_weights,
                    decision_point: decision_point.build(),
                    comparator: comparator.build(),
                    hysteresis: uom::si::f64::TemperatureInterval::new::<
                        uom::si::temperature_interval::degree_celsius,
                    >(*hysteresis_c),
                }))
            }
            HeatingLogicConfig::StateOfCharge {
                decision_point,
                hysteresis,
                min_useful_temp_c,
                mains_c,
            } => Ok(HeatingLogic::SoCCompare(SoCCompare {
                decision_point: twine_core::Fraction::new(*decision_point)
                    .map_err(|e| HpwhError::ConfigurationInvalid(format!("invalid decision point: {e}")))?,
                hysteresis: twine_core::Fraction::new(*hysteresis)
                    .map_err(|e| HpwhError::ConfigurationInvalid(format!("invalid hysteresis: {e}")))?,
                min_useful_temp: ThermodynamicTemperature::new::<degree_celsius>(*min_useful_temp_c),
                mains: match mains_c {
                    Some(c) => MainsReference::Constant(ThermodynamicTemperature::new::<degree_celsius>(*c)),
                    None => MainsReference::InletTemperature,
                },
            })),
        }
    }
}

fn parse_shorthand(selector: &str) -> Result<NamedShorthand, HpwhError> {
    match selector {
        "bottomThird" => Ok(NamedShorthand::BottomThird),
        "topThird" => Ok(NamedShorthand::TopThird),
        "topSixth" => Ok(NamedShorthand::TopSixth),
        "standby" => Ok(NamedShorthand::Standby),
        "largeDraw" => Ok(NamedShorthand::LargeDraw),
        "bottomNodeMaxTemp" => Ok(NamedShorthand::BottomNodeMaxTemp),
        "topNodeMaxTemp" => Ok(NamedShorthand::TopNodeMaxTemp),
        other => Err(HpwhError::ConfigurationInvalid(format!("unknown logic selector {other:?}"))),
    }
}

/// A single performance-map anchor (list form), °C and watts.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListAnchorConfig {
    pub air_temp_c: f64,
    pub input_power_coeffs: [f64; 3],
    pub cop_coeffs: [f64; 3],
}

#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct DefrostConfig {
    pub low_c: f64,
    pub high_c: f64,
    pub min_derate_factor: f64,
    pub aux_power_w: f64,
    pub aux_threshold_c: f64,
}

impl DefrostConfig {
    fn build(&self) -> Defrost {
        Defrost {
            low_c: self.low_c,
            high_c: self.high_c,
            min_derate_factor: self.min_derate_factor,
            aux_power: Power::new::<uom::si::power::watt>(self.aux_power_w),
            aux_threshold_c: self.aux_threshold_c,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMapConfig {
    pub anchors: Vec<ListAnchorConfig>,
    pub extrapolate_nearest: bool,
}

impl PerformanceMapConfig {
    fn build(&self) -> Result<PerformanceMap, HpwhError> {
        let anchors = self
            .anchors
            .iter()
            .map(|a| ListAnchor {
                air_temp_c: a.air_temp_c,
                input_power_coeffs: a.input_power_coeffs,
                cop_coeffs: a.cop_coeffs,
            })
            .collect();
        PerformanceMap::list(anchors, self.extrapolate_nearest)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum HeatSourceKindConfig {
    Resistive {
        power_kw: f64,
        start_node: usize,
    },
    WrappedCompressor {
        performance_map: PerformanceMapConfig,
        condensity: [f64; 12],
        defrost: Option<DefrostConfig>,
    },
    ExternalLoop {
        performance_map: PerformanceMapConfig,
        defrost: Option<DefrostConfig>,
        /// `None` selects single-pass flow sizing; `Some(rate)` a fixed
        /// multi-pass volumetric flow, liters per minute.
        multi_pass_flow_l_per_min: Option<f64>,
    },
}

/// A single heat source's full configuration, including its structural
/// references by index into the configured source list.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct HeatSourceConfig {
    pub kind: HeatSourceKindConfig,
    pub turn_on_logics: Vec<HeatingLogicConfig>,
    pub shut_off_logics: Vec<HeatingLogicConfig>,
    pub min_ambient_c: f64,
    pub max_ambient_c: f64,
    pub max_setpoint_c: f64,
    pub is_vip: bool,
    pub backup: Option<usize>,
    pub companions: Vec<usize>,
    pub followed_by: Option<usize>,
}

impl HeatSourceConfig {
    fn build(&self) -> Result<HeatSource, HpwhError> {
        let kind = match &self.kind {
            HeatSourceKindConfig::Resistive { power_kw, start_node } => HeatSourceKind::Resistive {
                power: Power::new::<kilowatt>(*power_kw),
                start_node: *start_node,
            },
            HeatSourceKindConfig::WrappedCompressor {
                performance_map,
                condensity,
                defrost,
            } => HeatSourceKind::WrappedCompressor {
                performance_map: performance_map.build()?,
                condensity: Condensity::new(*condensity)?,
                defrost: defrost.as_ref().map(DefrostConfig::build),
            },
            HeatSourceKindConfig::ExternalLoop {
                performance_map,
                defrost,
                multi_pass_flow_l_per_min,
            } => HeatSourceKind::ExternalLoop {
                performance_map: performance_map.build()?,
                defrost: defrost.as_ref().map(DefrostConfig::build),
                flow: match multi_pass_flow_l_per_min {
                    Some(rate) => ExternalFlow::MultiPass(uom::si::f64::VolumeRate::new::<
                        uom::si::volume_rate::liter_per_minute,
                    >(*rate)),
                    None => ExternalFlow::SinglePass,
                },
            },
        };

        Ok(HeatSource {
            kind,
            turn_on_logics: self
                .turn_on_logics
                .iter()
                .map(HeatingLogicConfig::build)
                .collect::<Result<_, _>>()?,
            shut_off_logics: self
                .shut_off_logics
                .iter()
                .map(HeatingLogicConfig::build)
                .collect::<Result<_, _>>()?,
            min_ambient_c: self.min_ambient_c,
            max_ambient_c: self.max_ambient_c,
            max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(self.max_setpoint_c),
            is_vip: self.is_vip,
            is_on: false,
            backup: self.backup.map(HeatSourceIndex),
            companions: self.companions.iter().copied().map(HeatSourceIndex).collect(),
            followed_by: self.followed_by.map(HeatSourceIndex),
        })
    }
}

/// The full configuration for one simulation: tank, heat sources, and the
/// temperature-depression flag, matching the shape `hpwh-config` reads
/// from a whitespace-token file.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub tank: TankConfig,
    pub heat_sources: Vec<HeatSourceConfig>,
    pub do_temp_depression: bool,
}

impl SimulationConfig {
    /// Builds the runtime `(Tank, Vec<HeatSource>)` pair this config
    /// describes. Does not construct a [`crate::Simulation`] directly so
    /// callers may choose a [`crate::LogSink`].
    pub fn build(&self) -> Result<(Tank, Vec<HeatSource>), HpwhError> {
        let tank = self.tank.build()?;
        let heat_sources = self
            .heat_sources
            .iter()
            .map(HeatSourceConfig::build)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((tank, heat_sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_config() -> SimulationConfig {
        SimulationConfig {
            tank: TankConfig {
                num_nodes: 12,
                volume_l: 189.0,
                ua_kj_per_hour_c: 3.6,
                setpoint_c: 52.78,
                mix_on_draw: false,
            },
            heat_sources: vec![HeatSourceConfig {
                kind: HeatSourceKindConfig::Resistive {
                    power_kw: 4.5,
                    start_node: 0,
                },
                turn_on_logics: vec![HeatingLogicConfig::Shorthand {
                    selector: "standby".to_string(),
                    decision_point: DecisionPointConfig::BelowSetpointC(8.0),
                    comparator: ComparatorConfig::LessOrEqual,
                    hysteresis_c: 1.0,
                }],
                shut_off_logics: vec![HeatingLogicConfig::Shorthand {
                    selector: "standby".to_string(),
                    decision_point: DecisionPointConfig::AbsoluteC(52.78),
                    comparator: ComparatorConfig::GreaterOrEqual,
                    hysteresis_c: 1.0,
                }],
                min_ambient_c: -50.0,
                max_ambient_c: 100.0,
                max_setpoint_c: 60.0,
                is_vip: true,
                backup: None,
                companions: vec![],
                followed_by: None,
            }],
            do_temp_depression: false,
        }
    }

    #[test]
    fn builds_tank_and_single_resistive_source() {
        let (tank, sources) = simple_config().build().unwrap();
        assert_eq!(tank.num_nodes(), 12);
        assert_eq!(sources.len(), 1);
        assert!(matches!(sources[0].kind, HeatSourceKind::Resistive { .. }));
    }

    #[test]
    fn unknown_logic_selector_is_rejected() {
        let mut config = simple_config();
        config.heat_sources[0].turn_on_logics = vec![HeatingLogicConfig::Shorthand {
            selector: "nonsense".to_string(),
            decision_point: DecisionPointConfig::AbsoluteC(50.0),
            comparator: ComparatorConfig::GreaterOrEqual,
            hysteresis_c: 1.0,
        }];
        assert!(matches!(config.build(), Err(HpwhError::ConfigurationInvalid(_))));
    }
}
