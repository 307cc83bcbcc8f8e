//! Tank-to-ambient heat loss over a step.

use uom::si::f64::{Energy, ThermodynamicTemperature, Volume};
use uom::si::energy::kilojoule;
use uom::si::thermodynamic_temperature::degree_celsius;

use crate::units::{water_mass_kg, UaKjPerHourC, CP_WATER_KJ_PER_KG_C};

/// Removes `UA * (T_avg - T_ambient) * (step_minutes / 60)` kJ from the tank,
/// apportioned across nodes in proportion to each node's temperature excess
/// over ambient (or uniformly, when `uniform` is set). Returns the energy
/// removed (positive when the tank is losing heat to a cooler ambient).
pub fn apply_loss(
    temps: &mut [ThermodynamicTemperature],
    node_volume: Volume,
    ua: UaKjPerHourC,
    ambient_temp: ThermodynamicTemperature,
    step_minutes: f64,
    uniform: bool,
) -> Energy {
    let n = temps.len();
    if n == 0 {
        return Energy::new::<kilojoule>(0.0);
    }

    let ambient_c = ambient_temp.get::<degree_celsius>();
    let avg_c = temps.iter().map(|t| t.get::<degree_celsius>()).sum::<f64>() / n as f64;
    let delta_q_kj = ua.value() * (avg_c - ambient_c) * (step_minutes / 60.0);

    let diffs: Vec<f64> = temps
        .iter()
        .map(|t| t.get::<degree_celsius>() - ambient_c)
        .collect();
    let total_diff: f64 = diffs.iter().sum();

    let node_mass_kg = water_mass_kg(node_volume);
    let thermal_mass_kj_per_c = node_mass_kg * CP_WATER_KJ_PER_KG_C;

    for (i, temp) in temps.iter_mut().enumerate() {
        let weight = if uniform || total_diff.abs() < 1e-9 {
            1.0 / n as f64
        } else {
            diffs[i] / total_diff
        };
        let node_q_kj = delta_q_kj * weight;
        let new_c = temp.get::<degree_celsius>() - node_q_kj / thermal_mass_kj_per_c;
        *temp = ThermodynamicTemperature::new::<degree_celsius>(new_c);
    }

    Energy::new::<kilojoule>(delta_q_kj)
}
