//! Shared scenario builders for the integration tests in this directory.
//! Each test file is its own crate under the `tests` harness, so this module
//! is included with `mod support;` rather than exported from `hpwh-core`.

use hpwh_core::condensity::Condensity;
use hpwh_core::error::NullLogSink;
use hpwh_core::heat_source::delivery::ExternalFlow;
use hpwh_core::heat_source::{HeatSource, HeatSourceIndex, HeatSourceKind};
use hpwh_core::heating_logic::{Comparator, DecisionPoint, HeatingLogic, NamedShorthand, WeightedNodeCompare};
use hpwh_core::performance_map::{Defrost, ListAnchor, PerformanceMap};
use hpwh_core::tank::Tank;
use hpwh_core::units::UaKjPerHourC;
use hpwh_core::Simulation;
use uom::si::f64::{Power, TemperatureInterval, ThermodynamicTemperature, Volume, VolumeRate};
use uom::si::power::kilowatt;
use uom::si::temperature_interval::degree_celsius as delta_celsius;
use uom::si::thermodynamic_temperature::degree_celsius;
use uom::si::volume::liter;
use uom::si::volume_rate::liter_per_minute;

#[allow(dead_code)]
pub fn flat_tank(n: usize, volume_l: f64, temp_c: f64, ua_kj_per_hour_c: f64) -> Tank {
    Tank::new(
        n,
        Volume::new::<liter>(volume_l),
        UaKjPerHourC::new(ua_kj_per_hour_c),
        ThermodynamicTemperature::new::<degree_celsius>(temp_c),
        false,
    )
    .unwrap()
}

fn standby_logic(delta_c: f64, hysteresis_c: f64, comparator: Comparator) -> HeatingLogic {
    HeatingLogic::WeightedNodeCompare(WeightedNodeCompare::from_shorthand(
        NamedShorthand::Standby,
        DecisionPoint::BelowSetpoint(TemperatureInterval::new::<delta_celsius>(delta_c)),
        comparator,
        TemperatureInterval::new::<delta_celsius>(hysteresis_c),
    ))
}

fn bottom_third_logic(delta_c: f64, hysteresis_c: f64, comparator: Comparator) -> HeatingLogic {
    HeatingLogic::WeightedNodeCompare(WeightedNodeCompare::from_shorthand(
        NamedShorthand::BottomThird,
        DecisionPoint::BelowSetpoint(TemperatureInterval::new::<delta_celsius>(delta_c)),
        comparator,
        TemperatureInterval::new::<delta_celsius>(hysteresis_c),
    ))
}

#[allow(dead_code)]
pub fn resistive_source(start_node: usize, power_kw: f64, is_vip: bool) -> HeatSource {
    HeatSource {
        kind: HeatSourceKind::Resistive {
            power: Power::new::<kilowatt>(power_kw),
            start_node,
        },
        turn_on_logics: vec![bottom_third_logic(8.0, 1.0, Comparator::LessOrEqual)],
        shut_off_logics: vec![standby_logic(0.0, 1.0, Comparator::GreaterOrEqual)],
        min_ambient_c: -50.0,
        max_ambient_c: 100.0,
        max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(60.0),
        is_vip,
        is_on: false,
        backup: None,
        companions: vec![],
        followed_by: None,
    }
}

/// A two-element resistance-only tank: an upper VIP element that falls
/// through to the lower element when it shuts off.
#[allow(dead_code)]
pub fn two_element_resistance_simulation(volume_l: f64, tank_temp_c: f64) -> Simulation {
    let tank = flat_tank(12, volume_l, tank_temp_c, 6.0);
    let mut upper = resistive_source(8, 4.5, true);
    let lower = resistive_source(0, 4.5, false);
    upper.followed_by = Some(HeatSourceIndex(1));
    Simulation::new(tank, vec![upper, lower], false, Box::new(NullLogSink)).unwrap()
}

fn compressor_performance_map() -> PerformanceMap {
    PerformanceMap::list(
        vec![
            ListAnchor {
                air_temp_c: 10.0,
                input_power_coeffs: [180.0, 6.6, 0.0],
                cop_coeffs: [4.5, -0.022, 0.0],
            },
            ListAnchor {
                air_temp_c: 21.1,
                input_power_coeffs: [230.0, 7.2, 0.0],
                cop_coeffs: [5.3, -0.022, 0.0],
            },
        ],
        true,
    )
    .unwrap()
}

fn split_system_defrost() -> Defrost {
    Defrost {
        low_c: -12.2,
        high_c: 4.4,
        min_derate_factor: 0.5,
        aux_power: Power::new::<kilowatt>(0.8),
        aux_threshold_c: 2.0,
    }
}

/// A wrapped-condenser compressor with a resistive backup, matching the
/// cold-climate integrated HPWH shape `HPWHpresets.cc` calls
/// `MODELS_AOSmithPHPT60`.
#[allow(dead_code)]
pub fn compressor_with_backup_simulation(tank_temp_c: f64) -> Simulation {
    let tank = flat_tank(12, 189.0, tank_temp_c, 5.5);

    let mut condensity_slots = [0.0; 12];
    for (i, slot) in condensity_slots.iter_mut().enumerate().take(8) {
        *slot = if i < 6 { 0.15 } else { 0.05 };
    }
    let condensity = Condensity::new(condensity_slots).unwrap();

    let backup = resistive_source(0, 4.5, false);

    let compressor = HeatSource {
        kind: HeatSourceKind::WrappedCompressor {
            performance_map: compressor_performance_map(),
            condensity,
            defrost: Some(split_system_defrost()),
        },
        turn_on_logics: vec![bottom_third_logic(19.0, 1.0, Comparator::LessOrEqual)],
        shut_off_logics: vec![bottom_third_logic(0.0, 1.0, Comparator::GreaterOrEqual)],
        min_ambient_c: -12.2,
        max_ambient_c: 48.9,
        max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(56.7),
        is_vip: false,
        is_on: false,
        backup: Some(HeatSourceIndex(1)),
        companions: vec![],
        followed_by: None,
    };

    Simulation::new(tank, vec![compressor, backup], true, Box::new(NullLogSink)).unwrap()
}

/// A single-pass external-loop compressor, matching `MODELS_externalTest`.
#[allow(dead_code)]
pub fn external_loop_simulation(tank_temp_c: f64) -> Simulation {
    let tank = flat_tank(24, 300.0, tank_temp_c, 8.0);

    let source = HeatSource {
        kind: HeatSourceKind::ExternalLoop {
            performance_map: compressor_performance_map(),
            defrost: Some(split_system_defrost()),
            flow: ExternalFlow::MultiPass(VolumeRate::new::<liter_per_minute>(12.0)),
        },
        turn_on_logics: vec![bottom_third_logic(19.0, 1.0, Comparator::LessOrEqual)],
        shut_off_logics: vec![standby_logic(0.0, 1.0, Comparator::GreaterOrEqual)],
        min_ambient_c: -12.2,
        max_ambient_c: 48.9,
        max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(56.7),
        is_vip: false,
        is_on: false,
        backup: None,
        companions: vec![],
        followed_by: None,
    };

    Simulation::new(tank, vec![source], true, Box::new(NullLogSink)).unwrap()
}
