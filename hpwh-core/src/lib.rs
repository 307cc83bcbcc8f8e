//! A coupled stratified-tank and prioritized-heat-source water heater
//! simulation engine.
//!
//! The engine advances a [`tank::Tank`] forward one minute-scale time step
//! at a time, running a prioritized set of [`heat_source::HeatSource`]s
//! against it under an optional demand-response signal. [`Simulation`] is
//! the single entry point: it owns the tank and heat-source set, applies
//! each step's physics in the order described in the crate's design
//! document, and exposes the per-step and per-source accessors external
//! callers need.
//!
//! The preset catalog that supplies numeric coefficients for specific
//! commercial models, file-based configuration parsing, and CLI test
//! harnesses are peripheral concerns kept in sibling crates
//! (`hpwh-presets`, `hpwh-config`, `hpwh-examples`); this crate consumes a
//! fully populated configuration and knows nothing about where it came
//! from.

pub mod condensity;
pub mod config;
pub mod dr;
pub mod error;
pub mod heat_source;
pub mod heating_logic;
pub mod performance_map;
mod simulation;
pub mod tank;
pub mod units;

pub use condensity::Condensity;
pub use dr::DrMode;
pub use error::{HpwhError, LogSink, NullLogSink, TracingLogSink, Verbosity};
pub use heat_source::{HeatSource, HeatSourceIndex, HeatSourceKind};
pub use heating_logic::HeatingLogic;
pub use performance_map::PerformanceMap;
pub use simulation::{Preset, PresetCatalog, Simulation, StepInput, StepOutput};
pub use tank::Tank;
pub use units::{EnergyUnit, TempUnit, VolumeUnit};
