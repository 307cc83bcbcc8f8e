//! Heat-delivery algorithms for the three heat-source configurations.

use uom::si::f64::{Energy, Power, ThermodynamicTemperature, Volume, VolumeRate};
use uom::si::energy::kilojoule;
use uom::si::power::kilowatt;
use uom::si::thermodynamic_temperature::degree_celsius;

use crate::condensity::Condensity;
use crate::error::HpwhError;
use crate::tank::Tank;
use crate::units::{water_mass_kg, CP_WATER_KJ_PER_KG_C, DENSITY_WATER_KG_PER_L};

/// Delivers `thermal_power` worth of heat starting at `start_node`,
/// propagating upward in the classic "plug rises to setpoint then spills
/// upward" pattern: the heated group begins as the single `start_node`
/// and absorbs the node above whenever continued heating would otherwise
/// equalize with it, continuing until the group reaches the tank's
/// setpoint or `available_minutes` is exhausted.
///
/// Returns the thermal energy actually delivered and the runtime used
/// (less than `available_minutes` only if the group reached setpoint
/// first). Grounded on the original `HPWH::HeatSource::addHeatAboveNode`.
pub fn resistive_plug_delivery(
    tank: &mut Tank,
    start_node: usize,
    thermal_power: Power,
    available_minutes: f64,
) -> Result<(Energy, f64), HpwhError> {
    let n = tank.num_nodes();
    if start_node >= n {
        return Err(HpwhError::ConfigurationInvalid(format!(
            "heat delivery start node {start_node} out of range [0, {n})"
        )));
    }

    let node_thermal_mass_kj_per_c = water_mass_kg(tank.node_volume()) * CP_WATER_KJ_PER_KG_C;
    let power_kj_per_min = thermal_power.get::<kilowatt>() * 60.0;
    if power_kj_per_min <= 0.0 || available_minutes <= 0.0 {
        return Ok((Energy::new::<kilojoule>(0.0), 0.0));
    }

    let setpoint_c = tank.setpoint().get::<degree_celsius>();

    let mut group_end = start_node;
    let mut group_mass_kj_per_c = node_thermal_mass_kj_per_c;
    let mut group_temp_c = tank.temperature(start_node)?.get::<degree_celsius>();
    let mut remaining_minutes = available_minutes;
    let mut delivered_kj = 0.0;

    while group_temp_c < setpoint_c - 1e-9 && remaining_minutes > 1e-9 {
        let energy_to_setpoint_kj = group_mass_kj_per_c * (setpoint_c - group_temp_c);

        let next_node = group_end + 1;
        let energy_to_merge_kj = if next_node < n {
            let next_temp_c = tank.temperature(next_node)?.get::<degree_celsius>();
            (group_mass_kj_per_c * (next_temp_c - group_temp_c)).max(0.0)
        } else {
            f64::INFINITY
        };

        let segment_kj = energy_to_setpoint_kj.min(energy_to_merge_kj);
        let max_deliverable_kj = power_kj_per_min * remaining_minutes;

        if max_deliverable_kj < segment_kj || next_node >= n {
            let kj = max_deliverable_kj.min(energy_to_setpoint_kj);
            group_temp_c += kj / group_mass_kj_per_c;
            delivered_kj += kj;
            remaining_minutes -= kj / power_kj_per_min;
            break;
        }

        delivered_kj += segment_kj;
        group_temp_c += segment_kj / group_mass_kj_per_c;
        remaining_minutes -= segment_kj / power_kj_per_min;
        group_end = next_node;
        group_mass_kj_per_c += node_thermal_mass_kj_per_c;
    }

    if !group_temp_c.is_finite() {
        return Err(HpwhError::NumericFailure(
            "heat delivery produced a non-finite temperature".to_string(),
        ));
    }

    let new_temp = ThermodynamicTemperature::new::<degree_celsius>(group_temp_c);
    for node in start_node..=group_end {
        tank.set_temperature(node, new_temp)?;
    }

    let runtime_minutes = available_minutes - remaining_minutes;
    Ok((Energy::new::<kilojoule>(delivered_kj), runtime_minutes))
}

/// Delivers `thermal_power` across the tank distributed by `condensity`:
/// each weighted slot runs the same plug-rise algorithm as
/// [`resistive_plug_delivery`], sharing `thermal_power` in proportion to
/// its condensity weight, starting at the node the slot resamples onto.
/// The source keeps running, across all its slots, for as long as any
/// slot has not yet reached setpoint, so the returned runtime is the
/// longest of any slot's — capped at `available_minutes`, and shorter
/// only once every slot has spilled up to setpoint.
///
/// Grounded on the original `HPWH::HeatSource::addHeat`'s condensity-
/// weighted deposit loop, generalized here to cap at setpoint per slot the
/// same way a submerged resistive element does, per spec.md §4.4's wrapped-
/// compressor delivery rule.
pub fn condensity_plug_delivery(
    tank: &mut Tank,
    condensity: &Condensity,
    thermal_power: Power,
    available_minutes: f64,
) -> Result<(Energy, f64), HpwhError> {
    let weights = condensity.resample(tank.num_nodes());
    let total_weight: f64 = weights.iter().sum();
    if total_weight.abs() < 1e-12 || thermal_power.get::<kilowatt>() <= 0.0 || available_minutes <= 0.0 {
        return Ok((Energy::new::<kilojoule>(0.0), 0.0));
    }

    let mut delivered = Energy::new::<kilojoule>(0.0);
    let mut runtime_minutes = 0.0_f64;

    for (node, weight) in weights.iter().enumerate() {
        if *weight <= 0.0 {
            continue;
        }
        let slot_power = thermal_power * (weight / total_weight);
        let (energy, runtime) = resistive_plug_delivery(tank, node, slot_power, available_minutes)?;
        delivered += energy;
        runtime_minutes = runtime_minutes.max(runtime);
    }

    tank.stabilize();
    Ok((delivered, runtime_minutes))
}

/// How an external-loop source's flow rate is determined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExternalFlow {
    /// Enough flow so the return temperature hits the tank's setpoint.
    SinglePass,
    /// A fixed, configured flow rate.
    MultiPass(VolumeRate),
}

/// Sub-steps an external-loop source: each sub-step evaluates the
/// performance map against the current intake temperature, computes
/// thermal output over the sub-step, and shifts the tank column so the
/// heated water is returned at the top while an equal volume is drawn
/// from the bottom as the next sub-step's intake. Terminates when
/// `available_minutes` is exhausted or `should_stop` reports true.
#[allow(clippy::too_many_arguments)]
pub fn external_loop_delivery<F>(
    tank: &mut Tank,
    evaluate: F,
    flow: ExternalFlow,
    available_minutes: f64,
    mut should_stop: impl FnMut(&Tank) -> Result<bool, HpwhError>,
) -> Result<(Energy, Energy, f64), HpwhError>
where
    F: Fn(ThermodynamicTemperature) -> Result<(Power, f64), HpwhError>,
{
    const SUB_STEP_MINUTES: f64 = 1.0;

    let mut remaining_minutes = available_minutes;
    let mut input_kj = 0.0;
    let mut output_kj = 0.0;
    let mut runtime_minutes = 0.0;

    while remaining_minutes > 1e-9 {
        if should_stop(tank)? {
            break;
        }

        let dt = SUB_STEP_MINUTES.min(remaining_minutes);
        let intake_temp = tank.temperature(0)?;
        let (input_power, cop) = evaluate(intake_temp)?;
        let capacity = input_power * cop;

        let dt_hours = dt / 60.0;
        let output_kj_this_step = capacity.get::<kilowatt>() * dt_hours * 3600.0;
        let input_kj_this_step = input_power.get::<kilowatt>() * dt_hours * 3600.0;

        let (volume, return_temp) = match flow {
            ExternalFlow::MultiPass(rate) => {
                let volume = rate * uom::si::f64::Time::new::<uom::si::time::minute>(dt);
                let return_delta_c = output_kj_this_step / (water_mass_kg(volume) * CP_WATER_KJ_PER_KG_C);
                let return_temp = ThermodynamicTemperature::new::<degree_celsius>(
                    intake_temp.get::<degree_celsius>() + return_delta_c,
                );
                (volume, return_temp)
            }
            ExternalFlow::SinglePass => {
                // Single-pass: flow is sized so the return temperature
                // lands exactly on setpoint. Falls back to a single node's
                // worth of volume when there is no capacity or no rise left
                // to size against (intake already at or above setpoint).
                let setpoint_c = tank.setpoint().get::<degree_celsius>();
                let rise_c = setpoint_c - intake_temp.get::<degree_celsius>();
                if rise_c > 1e-6 && output_kj_this_step > 0.0 {
                    let mass_kg = output_kj_this_step / (rise_c * CP_WATER_KJ_PER_KG_C);
                    let volume = Volume::new::<uom::si::volume::liter>(mass_kg / DENSITY_WATER_KG_PER_L);
                    (volume, ThermodynamicTemperature::new::<degree_celsius>(setpoint_c))
                } else {
                    let volume = tank.node_volume();
                    let return_delta_c = output_kj_this_step / (water_mass_kg(volume) * CP_WATER_KJ_PER_KG_C);
                    let return_temp = ThermodynamicTemperature::new::<degree_celsius>(
                        intake_temp.get::<degree_celsius>() + return_delta_c,
                    );
                    (volume, return_temp)
                }
            }
        };

        tank.circulate_bottom_to_top(return_temp, volume);
        tank.stabilize();

        input_kj += input_kj_this_step;
        output_kj += output_kj_this_step;
        runtime_minutes += dt;
        remaining_minutes -= dt;
    }

    Ok((
        Energy::new::<kilojoule>(input_kj),
        Energy::new::<kilojoule>(output_kj),
        runtime_minutes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use uom::si::volume::liter;

    fn tank(n: usize, volume_l: f64, setpoint_c: f64) -> Tank {
        Tank::new(
            n,
            Volume::new::<liter>(volume_l),
            crate::units::UaKjPerHourC::new(0.0),
            ThermodynamicTemperature::new::<degree_celsius>(setpoint_c),
            false,
        )
        .unwrap()
    }

    #[test]
    fn plug_delivery_heats_single_node_without_reaching_setpoint() {
        let mut tank = tank(12, 189.0, 52.78);
        tank.set_temperature(0, ThermodynamicTemperature::new::<degree_celsius>(20.0))
            .unwrap();

        let (energy, runtime) =
            resistive_plug_delivery(&mut tank, 0, Power::new::<kilowatt>(4.5), 1.0).unwrap();

        assert!(energy.get::<kilojoule>() > 0.0);
        assert_relative_eq!(runtime, 1.0, epsilon = 1e-9);
        assert!(tank.temperature(0).unwrap().get::<degree_celsius>() > 20.0);
        assert!(tank.temperature(0).unwrap().get::<degree_celsius>() < 52.78);
    }

    #[test]
    fn condensity_plug_delivery_concentrates_heat_at_single_slot() {
        let mut tank = tank(12, 189.0, 52.78);
        tank.set_temperature(0, ThermodynamicTemperature::new::<degree_celsius>(20.0))
            .unwrap();
        let condensity = Condensity::single_slot(0).unwrap();

        let (energy, runtime) =
            condensity_plug_delivery(&mut tank, &condensity, Power::new::<kilowatt>(4.5), 1.0).unwrap();

        assert!(energy.get::<kilojoule>() > 0.0);
        assert_relative_eq!(runtime, 1.0, epsilon = 1e-9);
        assert!(tank.temperature(0).unwrap().get::<degree_celsius>() > 20.0);
        assert_relative_eq!(
            tank.temperature(11).unwrap().get::<degree_celsius>(),
            52.78,
            epsilon = 1e-6
        );
    }

    #[test]
    fn condensity_plug_delivery_stops_early_when_setpoint_reached() {
        let mut tank = tank(12, 15.0, 30.0);
        tank.set_temperature(0, ThermodynamicTemperature::new::<degree_celsius>(29.9))
            .unwrap();
        let condensity = Condensity::single_slot(0).unwrap();

        let (_, runtime) =
            condensity_plug_delivery(&mut tank, &condensity, Power::new::<kilowatt>(50.0), 10.0).unwrap();

        assert!(runtime < 10.0);
    }

    #[test]
    fn single_pass_return_temperature_lands_on_setpoint() {
        let mut tank = tank(24, 380.0, 52.78);
        for node in 0..tank.num_nodes() {
            tank.set_temperature(node, ThermodynamicTemperature::new::<degree_celsius>(15.0))
                .unwrap();
        }

        external_loop_delivery(
            &mut tank,
            |_intake| Ok((Power::new::<kilowatt>(4.0), 3.5)),
            ExternalFlow::SinglePass,
            1.0,
            |_| Ok(false),
        )
        .unwrap();

        assert_relative_eq!(
            tank.temperature(tank.num_nodes() - 1).unwrap().get::<degree_celsius>(),
            52.78,
            epsilon = 1e-6
        );
    }

    #[test]
    fn plug_delivery_stops_early_when_setpoint_reached() {
        let mut tank = tank(12, 15.0, 30.0);
        tank.set_temperature(0, ThermodynamicTemperature::new::<degree_celsius>(29.9))
            .unwrap();

        let (_, runtime) =
            resistive_plug_delivery(&mut tank, 0, Power::new::<kilowatt>(50.0), 10.0).unwrap();

        assert!(runtime < 10.0);
        assert_relative_eq!(
            tank.temperature(0).unwrap().get::<degree_celsius>(),
            30.0,
            epsilon = 1e-6
        );
    }
}
