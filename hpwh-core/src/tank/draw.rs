//! Draw displacement: water enters the bottom node at inlet temperature and
//! an equal volume exits at the top, node by node, in fractional-node
//! increments so the drawn volume need not be a whole multiple of the node
//! volume. Grounded on the original `HPWH::updateTankTemps` displacement
//! algorithm.

use uom::si::f64::{ThermodynamicTemperature, Volume};
use uom::si::thermodynamic_temperature::degree_celsius;
use uom::si::volume::liter;

/// Displaces `draw_volume` of water through the tank column, returning the
/// volume-weighted mean temperature of the water that exited the top
/// (`0 °C` when `draw_volume` is zero, per the tank's draw convention —
/// callers should not report a zero-draw outlet temperature as meaningful).
pub(crate) fn apply_draw(
    temps: &mut [ThermodynamicTemperature],
    node_volume: Volume,
    inlet_temp: ThermodynamicTemperature,
    draw_volume: Volume,
) -> ThermodynamicTemperature {
    let n = temps.len();
    let node_vol_l = node_volume.get::<liter>();
    let mut remaining_l = draw_volume.get::<liter>();

    if remaining_l <= 0.0 || node_vol_l <= 0.0 || n == 0 {
        return ThermodynamicTemperature::new::<degree_celsius>(0.0);
    }

    let mut temps_c: Vec<f64> = temps.iter().map(|t| t.get::<degree_celsius>()).collect();
    let inlet_c = inlet_temp.get::<degree_celsius>();

    let mut exited_volume_weighted_temp = 0.0;
    let mut total_exited_l = 0.0;

    while remaining_l > 1e-12 {
        let take_l = remaining_l.min(node_vol_l);
        let frac = take_l / node_vol_l;

        let top = n - 1;
        exited_volume_weighted_temp += take_l * temps_c[top];
        total_exited_l += take_l;

        for i in (1..n).rev() {
            temps_c[i] = temps_c[i] * (1.0 - frac) + temps_c[i - 1] * frac;
        }
        temps_c[0] = temps_c[0] * (1.0 - frac) + inlet_c * frac;

        remaining_l -= take_l;
    }

    for (temp, c) in temps.iter_mut().zip(temps_c) {
        *temp = ThermodynamicTemperature::new::<degree_celsius>(c);
    }

    if total_exited_l > 0.0 {
        ThermodynamicTemperature::new::<degree_celsius>(exited_volume_weighted_temp / total_exited_l)
    } else {
        ThermodynamicTemperature::new::<degree_celsius>(0.0)
    }
}
