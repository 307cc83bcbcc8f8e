//! A minimal catalog of named [`hpwh_core`] presets with real,
//! representative performance-map coefficients, kept as a crate separate
//! from `hpwh-core` so the engine itself never embeds commercial-model
//! numeric data (see that crate's scope note).
//!
//! Coefficients are adapted from `HPWHpresets.cc`'s preset table, converted
//! from the original's Fahrenheit/Btu inputs to the Celsius/metric units
//! `hpwh-core` uses throughout.

use hpwh_core::condensity::Condensity;
use hpwh_core::error::{HpwhError, NullLogSink};
use hpwh_core::heat_source::delivery::ExternalFlow;
use hpwh_core::heat_source::{HeatSource, HeatSourceIndex, HeatSourceKind};
use hpwh_core::heating_logic::{
    Comparator, DecisionPoint, HeatingLogic, NamedShorthand, WeightedNodeCompare,
};
use hpwh_core::performance_map::{Defrost, ListAnchor, PerformanceMap};
use hpwh_core::tank::Tank;
use hpwh_core::units::UaKjPerHourC;
use hpwh_core::{Preset, PresetCatalog, Simulation};
use uom::si::f64::{Power, TemperatureInterval, ThermodynamicTemperature, Volume, VolumeRate};
use uom::si::power::kilowatt;
use uom::si::temperature_interval::degree_celsius as delta_celsius;
use uom::si::thermodynamic_temperature::degree_celsius;
use uom::si::volume::gallon;
use uom::si::volume_rate::liter_per_minute;

/// A storage-only tank with no heat source of its own, fed by an external
/// heater (`MODELS_StorageTank`).
pub const STORAGE_TANK: u32 = 1;

/// Two electric-resistance elements, the upper VIP and followed by the
/// lower on shutoff (`MODELS_basicIntegrated`).
pub const BASIC_INTEGRATED: u32 = 2;

/// A wrapped-condenser heat pump with a resistive backup element, rated
/// down to a cold-climate ambient floor with defrost derating
/// (`MODELS_AOSmithPHPT60`-style split-system integrated HPWH).
pub const AO_SMITH_PHPT: u32 = 3;

/// A single-pass external-loop heat pump (`MODELS_externalTest`).
pub const EXTERNAL_TEST: u32 = 4;

/// The standard setpoint most residential presets target, 125 °F.
fn default_setpoint() -> ThermodynamicTemperature {
    ThermodynamicTemperature::new::<degree_celsius>(51.7)
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

fn storage_tank_preset() -> Preset {
    let tank = Tank::new(
        12,
        Volume::new::<gallon>(80.0),
        UaKjPerHourC::new(7.0),
        default_setpoint(),
        false,
    )
    .expect("valid storage tank configuration");

    Preset {
        tank,
        heat_sources: vec![],
        do_temp_depression: false,
    }
}

fn basic_integrated_preset() -> Preset {
    let tank = Tank::new(
        12,
        Volume::new::<gallon>(50.0),
        UaKjPerHourC::new(6.5),
        default_setpoint(),
        false,
    )
    .expect("valid basicIntegrated tank configuration");

    let lower = HeatSource {
        kind: HeatSourceKind::Resistive {
            power: Power::new::<kilowatt>(4.5),
            start_node: 0,
        },
        turn_on_logics: vec![bottom_third_logic(24.0, 1.0, Comparator::LessOrEqual)],
        shut_off_logics: vec![bottom_third_logic(0.0, 1.0, Comparator::GreaterOrEqual)],
        min_ambient_c: -50.0,
        max_ambient_c: 100.0,
        max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(60.0),
        is_vip: false,
        is_on: false,
        backup: None,
        companions: vec![],
        followed_by: None,
    };

    let upper = HeatSource {
        kind: HeatSourceKind::Resistive {
            power: Power::new::<kilowatt>(4.5),
            start_node: 9,
        },
        turn_on_logics: vec![standby_logic(19.0, 1.0, Comparator::LessOrEqual)],
        shut_off_logics: vec![standby_logic(0.0, 1.0, Comparator::GreaterOrEqual)],
        min_ambient_c: -50.0,
        max_ambient_c: 100.0,
        max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(60.0),
        is_vip: true,
        is_on: false,
        backup: None,
        companions: vec![],
        // On shutoff, control passes to the lower element without
        // re-checking its own turn-on logic this step.
        followed_by: Some(HeatSourceIndex(1)),
    };

    Preset {
        tank,
        // Index 0: upper (VIP); index 1: lower.
        heat_sources: vec![upper, lower],
        do_temp_depression: false,
    }
}

/// GE2014-style compressor coefficients, adapted from the two-anchor
/// (50 °F / 70 °F) list form `HPWHinit_genericHPWH` builds, converted to
/// Celsius/watts.
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
    .expect("two anchors satisfies the list-form minimum")
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

fn ao_smith_phpt_preset() -> Preset {
    let tank = Tank::new(
        12,
        Volume::new::<gallon>(65.0),
        UaKjPerHourC::new(5.5),
        default_setpoint(),
        false,
    )
    .expect("valid AOSmithPHPT tank configuration");

    // Deposits heat mostly in the lower half of the tank, where a
    // wrapped condenser jacket typically sits.
    let mut condensity_slots = [0.0; 12];
    for (i, slot) in condensity_slots.iter_mut().enumerate().take(8) {
        *slot = if i < 6 { 0.15 } else { 0.05 };
    }
    let condensity = Condensity::new(condensity_slots).expect("condensity sums to one");

    let backup = HeatSource {
        kind: HeatSourceKind::Resistive {
            power: Power::new::<kilowatt>(4.5),
            start_node: 0,
        },
        turn_on_logics: vec![bottom_third_logic(40.0, 2.0, Comparator::LessOrEqual)],
        shut_off_logics: vec![bottom_third_logic(5.0, 2.0, Comparator::GreaterOrEqual)],
        min_ambient_c: -50.0,
        max_ambient_c: 100.0,
        max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(60.0),
        is_vip: false,
        is_on: false,
        backup: None,
        companions: vec![],
        followed_by: None,
    };

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
        // The resistive element takes over when ambient falls outside the
        // compressor's operating envelope.
        backup: Some(HeatSourceIndex(1)),
        companions: vec![],
        followed_by: None,
    };

    Preset {
        tank,
        // Index 0: compressor; index 1: resistive backup.
        heat_sources: vec![compressor, backup],
        do_temp_depression: true,
    }
}

fn external_test_preset() -> Preset {
    let tank = Tank::new(
        24,
        Volume::new::<gallon>(80.0),
        UaKjPerHourC::new(8.0),
        default_setpoint(),
        false,
    )
    .expect("valid externalTest tank configuration");

    let compressor = HeatSource {
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

    Preset {
        tank,
        heat_sources: vec![compressor],
        do_temp_depression: true,
    }
}

/// The standard preset catalog shipped with this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCatalog;

impl PresetCatalog for StandardCatalog {
    fn preset(&self, id: u32) -> Option<Preset> {
        match id {
            STORAGE_TANK => Some(storage_tank_preset()),
            BASIC_INTEGRATED => Some(basic_integrated_preset()),
            AO_SMITH_PHPT => Some(ao_smith_phpt_preset()),
            EXTERNAL_TEST => Some(external_test_preset()),
            _ => None,
        }
    }
}

/// Builds a silent-logging [`Simulation`] from a standard-catalog preset.
pub fn init_preset(id: u32) -> Result<Simulation, HpwhError> {
    Simulation::init_preset(&StandardCatalog, id, Box::new(NullLogSink))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_preset_id_builds_a_simulation() {
        for id in [STORAGE_TANK, BASIC_INTEGRATED, AO_SMITH_PHPT, EXTERNAL_TEST] {
            let sim = init_preset(id).unwrap_or_else(|e| panic!("preset {id} failed to build: {e}"));
            assert!(sim.num_nodes() > 0);
        }
    }

    #[test]
    fn unknown_preset_id_is_none() {
        assert!(StandardCatalog.preset(999).is_none());
    }

    #[test]
    fn basic_integrated_upper_element_is_vip_and_followed_by_lower() {
        let preset = basic_integrated_preset();
        assert!(preset.heat_sources[0].is_vip);
        assert_eq!(preset.heat_sources[0].followed_by, Some(HeatSourceIndex(1)));
    }

    #[test]
    fn ao_smith_compressor_has_a_resistive_backup() {
        let preset = ao_smith_phpt_preset();
        assert_eq!(preset.heat_sources[0].backup, Some(HeatSourceIndex(1)));
        assert!(matches!(preset.heat_sources[1].kind, HeatSourceKind::Resistive { .. }));
    }

    #[test]
    fn storage_tank_has_no_heat_sources() {
        let preset = storage_tank_preset();
        assert!(preset.heat_sources.is_empty());
    }
}
