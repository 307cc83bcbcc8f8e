//! Demonstrates driving a [`hpwh_core::Simulation`] built from the
//! `hpwh-presets` catalog through a short draw schedule, logging each
//! step's outcome through `tracing`.

use hpwh_core::error::{TracingLogSink, Verbosity};
use hpwh_core::{DrMode, Simulation, StepInput};
use hpwh_presets::StandardCatalog;
use uom::si::f64::{ThermodynamicTemperature, Volume};
use uom::si::thermodynamic_temperature::degree_celsius;
use uom::si::volume::liter;

fn main() {
    tracing_subscriber::fmt::init();

    let mut sim = Simulation::init_preset(&StandardCatalog, hpwh_presets::BASIC_INTEGRATED, Box::new(TracingLogSink))
        .expect("the basicIntegrated preset is always valid");

    tracing::info!(
        nodes = sim.num_nodes(),
        sources = sim.num_heat_sources(),
        "built simulation"
    );

    // Simulate an hour of standby followed by a 40-liter morning draw,
    // one minute at a time.
    for minute in 0..90 {
        let draw_volume = if (60..65).contains(&minute) {
            Volume::new::<liter>(8.0)
        } else {
            Volume::new::<liter>(0.0)
        };

        let output = sim
            .run_one_step(StepInput {
                inlet_temp: ThermodynamicTemperature::new::<degree_celsius>(12.0),
                draw_volume,
                tank_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
                heat_source_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
                dr_mode: DrMode::Allow,
                step_minutes: 1.0,
            })
            .expect("step inputs stay within domain in this demo");

        if minute % 15 == 0 || draw_volume.get::<liter>() > 0.0 {
            tracing::info!(
                minute,
                outlet_c = output.outlet_temp.get::<degree_celsius>(),
                top_tcouple_c = sim.get_nth_sim_tcouple(6, hpwh_core::units::TempUnit::Celsius).unwrap(),
                "step complete"
            );
        }
    }

    tracing::info!(
        verbosity = ?Verbosity::Typical,
        run_time_upper_min = sim.get_nth_heat_source_run_time(0).unwrap(),
        run_time_lower_min = sim.get_nth_heat_source_run_time(1).unwrap(),
        "simulation finished"
    );
}
