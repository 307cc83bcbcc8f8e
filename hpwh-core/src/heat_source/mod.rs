//! A single heat source: its condensity/position, its turn-on and shut-off
//! logic, and how it actually delivers heat to the tank.

pub mod delivery;

use uom::si::f64::{Energy, Power, ThermodynamicTemperature, Time};
use uom::si::power::watt;
use uom::si::thermodynamic_temperature::degree_celsius;
use uom::si::time::minute;

use crate::condensity::Condensity;
use crate::error::HpwhError;
use crate::heating_logic::{HeatingLogic, HysteresisDirection};
use crate::performance_map::{Defrost, PerformanceMap};
use crate::tank::Tank;
use delivery::{condensity_plug_delivery, external_loop_delivery, resistive_plug_delivery, ExternalFlow};

/// A structural reference to another heat source in the same simulation's
/// heat-source list. Stored as a plain index, never a pointer or `Rc`,
/// since the list itself owns every heat source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeatSourceIndex(pub usize);

/// How a heat source delivers heat to the tank.
pub enum HeatSourceKind {
    /// A resistive element depositing heat in a rising plug starting at a
    /// fixed node. Grounded on the original's electric-resistance elements
    /// (e.g. `topElement`/`bottomElement`).
    Resistive { power: Power, start_node: usize },
    /// A compressor whose condenser wraps the tank, depositing heat
    /// according to its condensity distribution.
    WrappedCompressor {
        performance_map: PerformanceMap,
        condensity: Condensity,
        defrost: Option<Defrost>,
    },
    /// A compressor plumbed through an external loop: water is drawn from
    /// the tank, heated, and returned at the top.
    ExternalLoop {
        performance_map: PerformanceMap,
        defrost: Option<Defrost>,
        flow: ExternalFlow,
    },
}

/// The result of running a heat source for some or all of a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveryResult {
    pub input_energy: Energy,
    pub output_energy: Energy,
    pub runtime_minutes: f64,
}

/// A heat source: its priority relationships, operating envelope, turn-on
/// and shut-off predicates, and delivery mechanism.
pub struct HeatSource {
    pub kind: HeatSourceKind,
    pub turn_on_logics: Vec<HeatingLogic>,
    pub shut_off_logics: Vec<HeatingLogic>,
    /// Ambient-air operating envelope; outside this range the source
    /// cannot engage regardless of its turn-on logics.
    pub min_ambient_c: f64,
    pub max_ambient_c: f64,
    /// The highest tank setpoint this source can maintain.
    pub max_setpoint: ThermodynamicTemperature,
    /// VIP sources are considered for engagement before any other source.
    pub is_vip: bool,
    pub is_on: bool,
    /// Another source that takes over when this one cannot meet demand
    /// alone (e.g. a resistive backup for a compressor).
    pub backup: Option<HeatSourceIndex>,
    /// Sources that must run alongside this one whenever this one runs.
    pub companions: Vec<HeatSourceIndex>,
    /// A source that engages immediately after this one shuts off, a
    /// fixed number of minutes, without re-checking its own turn-on logic.
    pub followed_by: Option<HeatSourceIndex>,
}

impl HeatSource {
    /// Whether ambient air temperature is within this source's operating
    /// envelope (the compressor lock-out range).
    #[must_use]
    pub fn is_within_ambient_range(&self, air_temp: ThermodynamicTemperature) -> bool {
        let c = air_temp.get::<degree_celsius>();
        c >= self.min_ambient_c && c <= self.max_ambient_c
    }

    /// True if any turn-on predicate is satisfied (disjunction, matching
    /// the original's "any condition calls for heat" semantics).
    pub fn wants_to_engage(
        &self,
        tank: &Tank,
        inlet_temp: ThermodynamicTemperature,
    ) -> Result<bool, HpwhError> {
        for logic in &self.turn_on_logics {
            if logic.is_satisfied(tank, inlet_temp, HysteresisDirection::TurnOn)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True if any shut-off predicate is satisfied.
    pub fn wants_to_shut_off(
        &self,
        tank: &Tank,
        inlet_temp: ThermodynamicTemperature,
    ) -> Result<bool, HpwhError> {
        for logic in &self.shut_off_logics {
            if logic.is_satisfied(tank, inlet_temp, HysteresisDirection::ShutOff)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Runs this source against `tank` for up to `available_minutes`,
    /// depositing heat according to its delivery mechanism.
    pub fn run(
        &self,
        tank: &mut Tank,
        air_temp: ThermodynamicTemperature,
        available_minutes: f64,
    ) -> Result<DeliveryResult, HpwhError> {
        match &self.kind {
            HeatSourceKind::Resistive { power, start_node } => {
                let (energy, runtime) =
                    resistive_plug_delivery(tank, *start_node, *power, available_minutes)?;
                Ok(DeliveryResult {
                    input_energy: energy,
                    output_energy: energy,
                    runtime_minutes: runtime,
                })
            }
            HeatSourceKind::WrappedCompressor {
                performance_map,
                condensity,
                defrost,
            } => {
                let condenser_temp = tank.condensity_weighted_average(condensity);
                let (input_power, cop) =
                    performance_map.evaluate(air_temp, condenser_temp, tank.setpoint())?;
                let capacity = input_power * cop;

                let (derated_capacity, aux_power) = match defrost {
                    Some(d) => d.apply(air_temp.get::<degree_celsius>(), capacity),
                    None => (capacity, Power::new::<watt>(0.0)),
                };

                let thermal_power = derated_capacity + aux_power;
                let (output_energy, runtime_minutes) =
                    condensity_plug_delivery(tank, condensity, thermal_power, available_minutes)?;

                let runtime = Time::new::<minute>(runtime_minutes);
                let input_energy = input_power * runtime + aux_power * runtime;

                Ok(DeliveryResult {
                    input_energy,
                    output_energy,
                    runtime_minutes,
                })
            }
            HeatSourceKind::ExternalLoop {
                performance_map,
                defrost,
                flow,
            } => {
                let setpoint = tank.setpoint();
                let shut_off_logics = &self.shut_off_logics;
                let evaluate = |intake: ThermodynamicTemperature| -> Result<(Power, f64), HpwhError> {
                    let (input_power, cop) =
                        performance_map.evaluate_with_inlet(air_temp, intake, setpoint, Some(intake))?;
                    let capacity = input_power * cop;
                    let (derated_capacity, aux_power) = match defrost {
                        Some(d) => d.apply(air_temp.get::<degree_celsius>(), capacity),
                        None => (capacity, Power::new::<watt>(0.0)),
                    };
                    let effective_cop = if input_power.get::<watt>() > 0.0 {
                        (derated_capacity + aux_power).get::<watt>() / input_power.get::<watt>()
                    } else {
                        0.0
                    };
                    Ok((input_power + aux_power, effective_cop))
                };

                let should_stop = |tank: &Tank| -> Result<bool, HpwhError> {
                    for logic in shut_off_logics {
                        if logic.is_satisfied(tank, tank.temperature(0)?, HysteresisDirection::ShutOff)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                };

                let (input_energy, output_energy, runtime_minutes) =
                    external_loop_delivery(tank, evaluate, *flow, available_minutes, should_stop)?;

                Ok(DeliveryResult {
                    input_energy,
                    output_energy,
                    runtime_minutes,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UaKjPerHourC;
    use uom::si::energy::kilojoule;
    use uom::si::power::kilowatt;
    use uom::si::volume::liter;

    fn flat_tank(temp_c: f64) -> Tank {
        Tank::new(
            12,
            uom::si::f64::Volume::new::<liter>(189.0),
            UaKjPerHourC::new(0.0),
            ThermodynamicTemperature::new::<degree_celsius>(temp_c),
            false,
        )
        .unwrap()
    }

    fn resistive_source() -> HeatSource {
        HeatSource {
            kind: HeatSourceKind::Resistive {
                power: Power::new::<kilowatt>(4.5),
                start_node: 0,
            },
            turn_on_logics: vec![],
            shut_off_logics: vec![],
            min_ambient_c: -50.0,
            max_ambient_c: 100.0,
            max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(60.0),
            is_vip: false,
            is_on: false,
            backup: None,
            companions: vec![],
            followed_by: None,
        }
    }

    #[test]
    fn resistive_source_reports_equal_input_and_output_energy() {
        let mut tank = flat_tank(20.0);
        let source = resistive_source();

        let result = source.run(&mut tank, ThermodynamicTemperature::new::<degree_celsius>(20.0), 5.0)
            .unwrap();

        assert_eq!(result.input_energy, result.output_energy);
        assert!(result.output_energy.get::<kilojoule>() > 0.0);
    }

    #[test]
    fn ambient_range_excludes_outside_envelope() {
        let mut source = resistive_source();
        source.min_ambient_c = 0.0;
        source.max_ambient_c = 40.0;

        assert!(!source.is_within_ambient_range(ThermodynamicTemperature::new::<degree_celsius>(-5.0)));
        assert!(source.is_within_ambient_range(ThermodynamicTemperature::new::<degree_celsius>(20.0)));
    }
}
