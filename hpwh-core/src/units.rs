//! Physical constants and unit conversions.
//!
//! The engine uses `uom`'s type-safe quantities for temperature, volume,
//! power, energy, and time directly in its public API, replacing the
//! original implementation's hand-rolled `F_TO_C`/`C_TO_F` free functions.
//! `UaKjPerHourC` fills the one gap: `uom` has no built-in unit for
//! kJ/(h·°C), the unit the original configuration format and literature use
//! for tank UA, so it is modeled here as a thin newtype with an explicit
//! conversion to `uom`'s `ThermalConductance`.

use uom::si::f64::{
    Energy, ThermalConductance, ThermodynamicTemperature, Volume,
};
use uom::si::energy::{btu, kilowatt_hour};
use uom::si::thermal_conductance::watt_per_kelvin;
use uom::si::thermodynamic_temperature::{degree_celsius, degree_fahrenheit};
use uom::si::volume::{gallon, liter};

/// Density of water, kg per liter, matching the original's `DENSITYWATER_kgperL`.
pub const DENSITY_WATER_KG_PER_L: f64 = 0.998;

/// Specific heat of water, kJ/(kg·°C), matching the original's `CPWATER_kJperkgC`.
pub const CP_WATER_KJ_PER_KG_C: f64 = 4.181;

/// Fixed length of every [`Condensity`](crate::condensity::Condensity) vector
/// and of the logical node grid heating-logic weights are expressed over,
/// matching the original's `CONDENSITY_SIZE`.
pub const CONDENSITY_SIZE: usize = 12;

/// Ambient temperature domain accepted by step inputs, in degrees Celsius.
pub const AMBIENT_DOMAIN_C: std::ops::RangeInclusive<f64> = -50.0..=100.0;

/// Tank UA expressed in kJ/(h·°C), the unit the configuration format and
/// the original implementation use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UaKjPerHourC(f64);

impl UaKjPerHourC {
    #[must_use]
    pub fn new(kj_per_hour_c: f64) -> Self {
        Self(kj_per_hour_c)
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Converts to `uom`'s `ThermalConductance` (W/K).
    ///
    /// 1 kJ/(h·°C) = 1000 J / 3600 s / K.
    #[must_use]
    pub fn to_thermal_conductance(self) -> ThermalConductance {
        ThermalConductance::new::<watt_per_kelvin>(self.0 * 1000.0 / 3600.0)
    }
}

/// Mass of water occupying the given volume, using [`DENSITY_WATER_KG_PER_L`].
#[must_use]
pub fn water_mass_kg(volume: Volume) -> f64 {
    volume.get::<liter>() * DENSITY_WATER_KG_PER_L
}

/// A temperature/volume unit requested by a caller at the external interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempUnit {
    Celsius,
    Fahrenheit,
}

#[must_use]
pub fn temp_from_unit(value: f64, unit: TempUnit) -> ThermodynamicTemperature {
    match unit {
        TempUnit::Celsius => ThermodynamicTemperature::new::<degree_celsius>(value),
        TempUnit::Fahrenheit => ThermodynamicTemperature::new::<degree_fahrenheit>(value),
    }
}

#[must_use]
pub fn temp_to_unit(temp: ThermodynamicTemperature, unit: TempUnit) -> f64 {
    match unit {
        TempUnit::Celsius => temp.get::<degree_celsius>(),
        TempUnit::Fahrenheit => temp.get::<degree_fahrenheit>(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyUnit {
    KWh,
    Btu,
}

#[must_use]
pub fn energy_to_unit(energy: Energy, unit: EnergyUnit) -> f64 {
    match unit {
        EnergyUnit::KWh => energy.get::<kilowatt_hour>(),
        EnergyUnit::Btu => energy.get::<btu>(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeUnit {
    Liter,
    Gallon,
}

#[must_use]
pub fn volume_from_unit(value: f64, unit: VolumeUnit) -> Volume {
    match unit {
        VolumeUnit::Liter => Volume::new::<liter>(value),
        VolumeUnit::Gallon => Volume::new::<gallon>(value),
    }
}

#[must_use]
pub fn volume_to_unit(volume: Volume, unit: VolumeUnit) -> f64 {
    match unit {
        VolumeUnit::Liter => volume.get::<liter>(),
        VolumeUnit::Gallon => volume.get::<gallon>(),
    }
}
