//! The stratified-node tank: a fixed ordered sequence of equal-volume
//! nodes, numbered bottom (0) to top (N-1).

mod buoyancy;
mod conduction;
mod draw;
mod loss;

use twine_core::Fraction;
use uom::si::f64::{Energy, ThermodynamicTemperature, Volume};
use uom::si::energy::kilojoule;
use uom::si::thermodynamic_temperature::degree_celsius;
use uom::si::volume::liter;

use crate::condensity::Condensity;
use crate::error::HpwhError;
use crate::units::{water_mass_kg, UaKjPerHourC, CONDENSITY_SIZE, CP_WATER_KJ_PER_KG_C};

/// A stratified hot-water storage tank.
#[derive(Debug, Clone)]
pub struct Tank {
    temps: Vec<ThermodynamicTemperature>,
    volume: Volume,
    ua: UaKjPerHourC,
    setpoint: ThermodynamicTemperature,
    mix_on_draw: bool,
    size_fixed: bool,
}

impl Tank {
    /// Builds a tank of `n` nodes, all initialized to `setpoint`.
    ///
    /// `n` must be a positive multiple of twelve (the logical-node grid
    /// every condensity vector and heating-logic weight is expressed over).
    pub fn new(
        n: usize,
        volume: Volume,
        ua: UaKjPerHourC,
        setpoint: ThermodynamicTemperature,
        mix_on_draw: bool,
    ) -> Result<Self, HpwhError> {
        if n == 0 || n % CONDENSITY_SIZE != 0 {
            return Err(HpwhError::ConfigurationInvalid(format!(
                "tank node count must be a positive multiple of {CONDENSITY_SIZE}, got {n}"
            )));
        }
        if volume.get::<liter>() <= 0.0 {
            return Err(HpwhError::ConfigurationInvalid(
                "tank volume must be positive".to_string(),
            ));
        }

        Ok(Self {
            temps: vec![setpoint; n],
            volume,
            ua,
            setpoint,
            mix_on_draw,
            size_fixed: false,
        })
    }

    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.temps.len()
    }

    #[must_use]
    pub fn volume(&self) -> Volume {
        self.volume
    }

    #[must_use]
    pub fn node_volume(&self) -> Volume {
        self.volume / self.temps.len() as f64
    }

    #[must_use]
    pub fn ua(&self) -> UaKjPerHourC {
        self.ua
    }

    #[must_use]
    pub fn setpoint(&self) -> ThermodynamicTemperature {
        self.setpoint
    }

    pub fn set_setpoint(&mut self, setpoint: ThermodynamicTemperature) {
        self.setpoint = setpoint;
    }

    #[must_use]
    pub fn size_fixed(&self) -> bool {
        self.size_fixed
    }

    pub fn fix_size(&mut self) {
        self.size_fixed = true;
    }

    /// Resizes the tank to a new volume, keeping node count and
    /// temperatures, provided the size has not been fixed.
    pub fn set_volume(&mut self, volume: Volume) -> Result<(), HpwhError> {
        if self.size_fixed {
            return Err(HpwhError::PolicyRejection(
                "tank size is fixed and cannot be changed".to_string(),
            ));
        }
        if volume.get::<liter>() <= 0.0 {
            return Err(HpwhError::ConfigurationInvalid(
                "tank volume must be positive".to_string(),
            ));
        }
        self.volume = volume;
        Ok(())
    }

    #[must_use]
    pub fn temperatures(&self) -> &[ThermodynamicTemperature] {
        &self.temps
    }

    pub fn temperature(&self, node: usize) -> Result<ThermodynamicTemperature, HpwhError> {
        self.temps.get(node).copied().ok_or_else(|| {
            HpwhError::InputOutOfDomain(format!(
                "node {node} out of range [0, {})",
                self.temps.len()
            ))
        })
    }

    pub fn reset_to_setpoint(&mut self) {
        let setpoint = self.setpoint;
        self.temps.fill(setpoint);
    }

    /// Total thermal energy stored in the tank, relative to 0 °C.
    #[must_use]
    pub fn energy(&self) -> Energy {
        let node_mass_kg = water_mass_kg(self.node_volume());
        let total_kj: f64 = self
            .temps
            .iter()
            .map(|t| node_mass_kg * CP_WATER_KJ_PER_KG_C * t.get::<degree_celsius>())
            .sum();
        Energy::new::<kilojoule>(total_kj)
    }

    /// The six equal-height virtual thermocouples, bottom to top.
    #[must_use]
    pub fn virtual_thermocouples(&self) -> [ThermodynamicTemperature; 6] {
        let n = self.temps.len();
        std::array::from_fn(|k| {
            let start = k * n / 6;
            let end = ((k + 1) * n / 6).max(start + 1);
            let slice = &self.temps[start..end];
            let avg_c =
                slice.iter().map(|t| t.get::<degree_celsius>()).sum::<f64>() / slice.len() as f64;
            ThermodynamicTemperature::new::<degree_celsius>(avg_c)
        })
    }

    /// Resamples tank temperatures onto the fixed twelve-slot logical-node
    /// grid heating-logic node weights are expressed over: the inverse
    /// direction of [`Condensity::resample`].
    #[must_use]
    pub fn resample_to_logical_nodes(&self) -> [f64; CONDENSITY_SIZE] {
        let n = self.temps.len();
        std::array::from_fn(|k| {
            let start = k * n / CONDENSITY_SIZE;
            let end = ((k + 1) * n / CONDENSITY_SIZE).max(start + 1);
            let slice = &self.temps[start..end];
            slice.iter().map(|t| t.get::<degree_celsius>()).sum::<f64>() / slice.len() as f64
        })
    }

    /// The condensity-weighted average tank temperature, used as the
    /// condenser temperature for a wrapped heat source.
    #[must_use]
    pub fn condensity_weighted_average(&self, condensity: &Condensity) -> ThermodynamicTemperature {
        let weights = condensity.resample(self.temps.len());
        let total_weight: f64 = weights.iter().sum();
        if total_weight.abs() < 1e-12 {
            return self.setpoint;
        }
        let avg_c: f64 = self
            .temps
            .iter()
            .zip(weights.iter())
            .map(|(t, w)| t.get::<degree_celsius>() * w)
            .sum::<f64>()
            / total_weight;
        ThermodynamicTemperature::new::<degree_celsius>(avg_c)
    }

    /// Fraction of the tank's thermal capacity stored above `min_useful`,
    /// referenced against `mains` and the tank's setpoint.
    pub fn state_of_charge(
        &self,
        mains: ThermodynamicTemperature,
        min_useful: ThermodynamicTemperature,
    ) -> Result<Fraction, HpwhError> {
        let mains_c = mains.get::<degree_celsius>();
        let min_useful_c = min_useful.get::<degree_celsius>();
        let setpoint_c = self.setpoint.get::<degree_celsius>();
        let denom = setpoint_c - mains_c;

        let avg = if denom.abs() < 1e-9 {
            0.0
        } else {
            self.temps
                .iter()
                .map(|t| {
                    let c = t.get::<degree_celsius>();
                    if c < min_useful_c {
                        0.0
                    } else {
                        ((c - mains_c) / denom).clamp(0.0, 1.0)
                    }
                })
                .sum::<f64>()
                / self.temps.len() as f64
        };

        Fraction::new(avg)
            .map_err(|e| HpwhError::NumericFailure(format!("invalid state of charge: {e}")))
    }

    /// Displaces `draw_volume` through the tank column, returning the
    /// volume-weighted outlet temperature. When `mix_on_draw` is set and
    /// the draw is non-zero, the bottom `floor(N/3)` nodes are then
    /// averaged to a single temperature (the original's "bottom third"
    /// rule, generalized to tanks with more than twelve nodes).
    pub fn apply_draw(
        &mut self,
        inlet_temp: ThermodynamicTemperature,
        draw_volume: Volume,
    ) -> ThermodynamicTemperature {
        let outlet = draw::apply_draw(&mut self.temps, self.node_volume(), inlet_temp, draw_volume);

        if self.mix_on_draw && draw_volume.get::<liter>() > 0.0 {
            let bottom_count = self.temps.len() / 3;
            if bottom_count > 0 {
                let avg_c = self.temps[..bottom_count]
                    .iter()
                    .map(|t| t.get::<degree_celsius>())
                    .sum::<f64>()
                    / bottom_count as f64;
                let t = ThermodynamicTemperature::new::<degree_celsius>(avg_c);
                self.temps[..bottom_count].fill(t);
            }
        }

        outlet
    }

    /// Applies tank-to-ambient loss over `step_minutes`, returning the
    /// energy removed.
    pub fn apply_losses(
        &mut self,
        ambient_temp: ThermodynamicTemperature,
        step_minutes: f64,
        uniform: bool,
    ) -> Energy {
        loss::apply_loss(
            &mut self.temps,
            self.node_volume(),
            self.ua,
            ambient_temp,
            step_minutes,
            uniform,
        )
    }

    /// Applies inter-node conduction over `step_minutes`.
    pub fn apply_conduction(&mut self, step_minutes: f64) {
        conduction::apply_conduction(&mut self.temps, step_minutes);
    }

    /// Enforces a monotonically non-decreasing-with-height profile.
    pub fn stabilize(&mut self) {
        buoyancy::stabilize(&mut self.temps);
    }

    /// Overwrites a single node's temperature directly. Used by heat-delivery
    /// algorithms that reposition water rather than add energy in place;
    /// callers are expected to call [`Tank::stabilize`] afterward.
    pub fn set_temperature(&mut self, node: usize, temp: ThermodynamicTemperature) -> Result<(), HpwhError> {
        let slot = self
            .temps
            .get_mut(node)
            .ok_or_else(|| HpwhError::InputOutOfDomain(format!("node {node} out of range")))?;
        *slot = temp;
        Ok(())
    }

    /// Circulates `volume` of water through an external loop: draws it from
    /// the bottom node (the compressor's intake) and returns it heated at
    /// the top. Returns the intake temperature the compressor saw (the
    /// bottom node's temperature before the shift).
    ///
    /// Implemented by running the ordinary top-draw/bottom-fill column
    /// shift ([`draw::apply_draw`]) on a reversed copy of the column, since
    /// a bottom-draw/top-fill shift is that algorithm's mirror image.
    pub(crate) fn circulate_bottom_to_top(
        &mut self,
        heated_return_temp: ThermodynamicTemperature,
        volume: Volume,
    ) -> ThermodynamicTemperature {
        let mut reversed: Vec<_> = self.temps.iter().rev().copied().collect();
        let intake_temp = draw::apply_draw(&mut reversed, self.node_volume(), heated_return_temp, volume);
        self.temps = reversed.into_iter().rev().collect();
        intake_temp
    }

    /// Deposits `energy` into the given node, raising its temperature
    /// directly (used by heat-delivery algorithms; does not enforce
    /// stratification — callers are expected to call [`Tank::stabilize`]
    /// afterward).
    pub fn deposit_energy(&mut self, node: usize, energy: Energy) -> Result<(), HpwhError> {
        let node_mass_kg = water_mass_kg(self.node_volume());
        let thermal_mass_kj_per_c = node_mass_kg * CP_WATER_KJ_PER_KG_C;
        let delta_c = energy.get::<kilojoule>() / thermal_mass_kj_per_c;

        let temp = self
            .temps
            .get_mut(node)
            .ok_or_else(|| HpwhError::InputOutOfDomain(format!("node {node} out of range")))?;
        let new_c = temp.get::<degree_celsius>() + delta_c;
        if !new_c.is_finite() {
            return Err(HpwhError::NumericFailure(format!(
                "deposit at node {node} produced a non-finite temperature"
            )));
        }
        *temp = ThermodynamicTemperature::new::<degree_celsius>(new_c);
        Ok(())
    }
}
