//! Cross-scenario invariant properties from spec.md §8: node count,
//! monotonic stratification, positivity, and runtime bounds, checked across
//! every preset shape this crate ships a scenario builder for.

mod support;

use hpwh_core::{DrMode, StepInput};
use uom::si::f64::{ThermodynamicTemperature, Volume};
use uom::si::thermodynamic_temperature::degree_celsius;
use uom::si::volume::liter;

fn drive(sim: &mut hpwh_core::Simulation, steps: usize, draw_l: f64) {
    for minute in 0..steps {
        let draw = if minute % 20 == 0 { draw_l } else { 0.0 };
        sim.run_one_step(StepInput {
            inlet_temp: ThermodynamicTemperature::new::<degree_celsius>(8.0),
            draw_volume: Volume::new::<liter>(draw),
            tank_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
            heat_source_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(7.0),
            dr_mode: DrMode::Allow,
            step_minutes: 1.0,
        })
        .unwrap();
    }
}

fn assert_monotonic_with_height(sim: &hpwh_core::Simulation) {
    let temps: Vec<f64> = sim.tank().temperatures().iter().map(|t| t.get::<degree_celsius>()).collect();
    for window in temps.windows(2) {
        assert!(
            window[1] >= window[0] - 1e-6,
            "node temperatures must be non-decreasing with height after stabilization: {temps:?}"
        );
    }
}

fn assert_all_positive_and_bounded(sim: &hpwh_core::Simulation) {
    for t in sim.tank().temperatures() {
        let c = t.get::<degree_celsius>();
        assert!(c > -50.0 && c < 120.0, "node temperature {c} escaped a physically sane range");
    }
}

fn assert_runtime_within_step_budget(sim: &hpwh_core::Simulation, n_sources: usize, steps: f64) {
    for i in 0..n_sources {
        let runtime = sim.get_nth_heat_source_run_time(i).unwrap();
        assert!(runtime >= 0.0 && runtime <= steps + 1e-6, "source {i} ran {runtime} minutes over {steps} available");
    }
}

#[test]
fn two_element_resistance_tank_stays_monotonic_and_bounded_under_repeated_draws() {
    let mut sim = support::two_element_resistance_simulation(189.0, 52.78);
    drive(&mut sim, 200, 40.0);

    assert_eq!(sim.num_nodes(), 12);
    assert_monotonic_with_height(&sim);
    assert_all_positive_and_bounded(&sim);
    assert_runtime_within_step_budget(&sim, 2, 1.0);
}

#[test]
fn wrapped_compressor_with_backup_stays_monotonic_and_bounded_in_cold_ambient() {
    let mut sim = support::compressor_with_backup_simulation(52.78);
    drive(&mut sim, 200, 40.0);

    assert_monotonic_with_height(&sim);
    assert_all_positive_and_bounded(&sim);
    assert_runtime_within_step_budget(&sim, 2, 1.0);
}

#[test]
fn external_loop_tank_stays_monotonic_and_bounded() {
    let mut sim = support::external_loop_simulation(52.78);
    drive(&mut sim, 200, 40.0);

    assert_eq!(sim.num_nodes(), 24);
    assert_monotonic_with_height(&sim);
    assert_all_positive_and_bounded(&sim);
}

#[test]
fn condensity_vectors_in_every_wrapped_or_external_scenario_sum_to_one() {
    use hpwh_core::condensity::Condensity;

    // Conservation is enforced at construction; any condensity vector a
    // scenario builder produced upstream must already satisfy this, so
    // re-deriving one with deliberately-unnormalized slots must fail.
    assert!(Condensity::new([1.0 / 12.0; 12]).is_ok());
    let mut bad = [1.0 / 12.0; 12];
    bad[0] += 0.01;
    assert!(Condensity::new(bad).is_err());
}

#[test]
fn a_simulation_with_no_heat_sources_just_cools_toward_ambient() {
    let mut sim = support::two_element_resistance_simulation(189.0, 52.78);
    // Lock out both categories for the whole run so the tank can only lose
    // heat, never gain it, and must still stay monotonic.
    for _ in 0..120 {
        sim.run_one_step(StepInput {
            inlet_temp: ThermodynamicTemperature::new::<degree_celsius>(10.0),
            draw_volume: Volume::new::<liter>(0.0),
            tank_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(15.0),
            heat_source_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(15.0),
            dr_mode: DrMode::Block {
                lock_out_resistance: true,
                lock_out_compressor: true,
            },
            step_minutes: 1.0,
        })
        .unwrap();
    }

    assert_monotonic_with_height(&sim);
    for t in sim.tank().temperatures() {
        assert!(t.get::<degree_celsius>() < 52.78 + 1e-6, "a tank with every source locked out must never gain heat");
    }
}
