//! The simulation: owns the tank and the heat-source set, and orchestrates
//! the physics of a single time step (spec §4.5).

use uom::si::f64::{Energy, Power, TemperatureInterval, ThermodynamicTemperature, Volume};
use uom::si::energy::kilojoule;
use uom::si::power::kilowatt;
use uom::si::temperature_interval::degree_celsius as delta_celsius;
use uom::si::thermodynamic_temperature::degree_celsius;
use uom::si::volume::liter;

use crate::condensity::Condensity;
use crate::dr::DrMode;
use crate::error::{HpwhError, LogSink, NullLogSink, Verbosity};
use crate::heat_source::{HeatSource, HeatSourceIndex, HeatSourceKind};
use crate::heating_logic::{Comparator, DecisionPoint, HeatingLogic, NamedShorthand, WeightedNodeCompare};
use crate::performance_map::{ListAnchor, PerformanceMap};
use crate::tank::Tank;
use crate::units::{
    AMBIENT_DOMAIN_C, CP_WATER_KJ_PER_KG_C, EnergyUnit, TempUnit, UaKjPerHourC, VolumeUnit,
    energy_to_unit, temp_to_unit, volume_to_unit, water_mass_kg,
};

/// The setpoint `initGeneric`/`initResistance` build a tank at, matching the
/// 125 °F default the original presets target (spec.md §9 Open Question).
const DEFAULT_GENERIC_SETPOINT_C: f64 = 51.7;

/// Per-step input, matching spec.md §3 `StepInput`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInput {
    pub inlet_temp: ThermodynamicTemperature,
    pub draw_volume: Volume,
    pub tank_ambient_temp: ThermodynamicTemperature,
    pub heat_source_ambient_temp: ThermodynamicTemperature,
    pub dr_mode: DrMode,
    pub step_minutes: f64,
}

/// Per-step output summary. Individual heat-source reports are read through
/// [`Simulation`]'s accessor methods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutput {
    pub outlet_temp: ThermodynamicTemperature,
    pub energy_removed_from_environment: Energy,
    pub standby_losses: Energy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SourceAccumulator {
    input_energy: Energy,
    output_energy: Energy,
    runtime_minutes: f64,
    is_running: bool,
}

impl SourceAccumulator {
    fn zero() -> Self {
        Self {
            input_energy: Energy::new::<kilojoule>(0.0),
            output_energy: Energy::new::<kilojoule>(0.0),
            runtime_minutes: 0.0,
            is_running: false,
        }
    }
}

/// A fully populated tank and heat-source set, ready to build a
/// [`Simulation`] from. Supplied by a peripheral collaborator (a preset
/// catalog, a file-based config reader, or hand-assembled by a caller) —
/// the core only consumes it.
pub struct Preset {
    pub tank: Tank,
    pub heat_sources: Vec<HeatSource>,
    pub do_temp_depression: bool,
}

/// A source of named presets, implemented outside the core (spec.md §1:
/// "the preset catalog... is an external collaborator"). `hpwh-presets`
/// provides the concrete catalog; the core only depends on this trait.
pub trait PresetCatalog {
    /// Builds the preset identified by `id`, or `None` if unknown.
    fn preset(&self, id: u32) -> Option<Preset>;
}

/// A coupled tank-and-heat-source simulation: the single entry point
/// external callers drive one `run_one_step`/`run_n_steps` call at a time.
pub struct Simulation {
    tank: Tank,
    heat_sources: Vec<HeatSource>,
    accumulators: Vec<SourceAccumulator>,
    log_sink: Box<dyn LogSink>,
    sim_has_failed: bool,
    do_temp_depression: bool,
    location_temp_c: Option<f64>,
    compressor_was_running: bool,
    step_outlet_temp: ThermodynamicTemperature,
    step_energy_removed: Energy,
    step_standby_losses: Energy,
}

/// Virtual room temperature sag per minute of compressor runtime, and
/// recovery per minute otherwise, for the optional temperature-depression
/// feature (spec.md §9 Open Question: valid only at 1-minute step
/// resolution — enforced by skipping the feature, with a logged notice,
/// at any other step size rather than guessing at its behavior there).
const DEPRESSION_PER_MINUTE_C: f64 = 0.5;
const RECOVERY_PER_MINUTE_C: f64 = 0.25;

impl Simulation {
    /// Builds a simulation from an already-assembled tank and heat-source
    /// set. Structural references (`backup`, `companions`, `followed_by`)
    /// are validated against the set's length, and the tank's setpoint
    /// against every source's `max_setpoint`.
    pub fn new(
        tank: Tank,
        heat_sources: Vec<HeatSource>,
        do_temp_depression: bool,
        log_sink: Box<dyn LogSink>,
    ) -> Result<Self, HpwhError> {
        Self::validate_references(&heat_sources)?;
        let max_allowed = Self::max_allowed_setpoint(&heat_sources);
        if let Some(max_allowed) = max_allowed {
            if tank.setpoint().get::<degree_celsius>() > max_allowed.get::<degree_celsius>() + 1e-9 {
                return Err(HpwhError::ConfigurationInvalid(
                    "tank setpoint exceeds a heat source's max_setpoint".to_string(),
                ));
            }
        }

        let n = heat_sources.len();
        Ok(Self {
            tank,
            heat_sources,
            accumulators: vec![SourceAccumulator::zero(); n],
            log_sink,
            sim_has_failed: false,
            do_temp_depression,
            location_temp_c: None,
            compressor_was_running: false,
            step_outlet_temp: ThermodynamicTemperature::new::<degree_celsius>(0.0),
            step_energy_removed: Energy::new::<kilojoule>(0.0),
            step_standby_losses: Energy::new::<kilojoule>(0.0),
        })
    }

    /// Builds a simulation from a silent, discarding log sink.
    pub fn new_silent(tank: Tank, heat_sources: Vec<HeatSource>, do_temp_depression: bool) -> Result<Self, HpwhError> {
        Self::new(tank, heat_sources, do_temp_depression, Box::new(NullLogSink))
    }

    fn validate_references(heat_sources: &[HeatSource]) -> Result<(), HpwhError> {
        let n = heat_sources.len();
        for (i, hs) in heat_sources.iter().enumerate() {
            let refs = hs
                .backup
                .into_iter()
                .chain(hs.followed_by)
                .chain(hs.companions.iter().copied());
            for r in refs {
                if r.0 >= n {
                    return Err(HpwhError::ConfigurationInvalid(format!(
                        "heat source {i} references out-of-range index {}",
                        r.0
                    )));
                }
            }
        }
        Ok(())
    }

    fn max_allowed_setpoint(heat_sources: &[HeatSource]) -> Option<ThermodynamicTemperature> {
        heat_sources
            .iter()
            .map(|hs| hs.max_setpoint)
            .min_by(|a, b| a.get::<degree_celsius>().total_cmp(&b.get::<degree_celsius>()))
    }

    /// Builds a simulation from a named preset (spec.md §6 `initPreset`).
    pub fn init_preset(
        catalog: &dyn PresetCatalog,
        id: u32,
        log_sink: Box<dyn LogSink>,
    ) -> Result<Self, HpwhError> {
        let preset = catalog
            .preset(id)
            .ok_or_else(|| HpwhError::ConfigurationInvalid(format!("unknown preset id {id}")))?;
        Self::new(preset.tank, preset.heat_sources, preset.do_temp_depression, log_sink)
    }

    /// Converts a rated energy factor into a tank `UA`, for callers that
    /// only know the EF rating rather than a measured standby-loss
    /// coefficient. There is no original-source formula for this (neither
    /// `initGeneric` nor `initResistance` exist in `original_source/`); the
    /// conversion here is a documented simplification recorded in
    /// DESIGN.md, not a literal DOE/EnergyStar standard-rated-UA
    /// derivation (which also folds in recovery efficiency and a fixed
    /// 24-hour draw schedule this engine does not simulate): the tank's
    /// standby heat loss over 24 hours is taken as the fraction `1/EF - 1`
    /// of its thermal capacity.
    fn ua_from_energy_factor(volume: Volume, energy_factor: f64) -> Result<UaKjPerHourC, HpwhError> {
        if !(energy_factor > 0.0 && energy_factor <= 1.0) {
            return Err(HpwhError::ConfigurationInvalid(format!(
                "energy factor {energy_factor} must be in (0, 1]"
            )));
        }
        let thermal_mass_kj_per_c = water_mass_kg(volume) * CP_WATER_KJ_PER_KG_C;
        let ua = (1.0 / energy_factor - 1.0) * thermal_mass_kj_per_c / 24.0;
        Ok(UaKjPerHourC::new(ua))
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

    /// Two-anchor (10 °C / 21.1 °C) list-form compressor coefficients,
    /// the same GE2014-style shape `hpwh-presets` ships for its wrapped
    /// compressor presets, used here as `initGeneric`'s representative
    /// interpolated-COP map absent a model-specific one.
    fn generic_compressor_performance_map() -> PerformanceMap {
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

    /// Builds a 3-source integrated HPWH — a wrapped compressor with
    /// interpolated COP, a VIP top resistive element for fast recovery
    /// (followed by the bottom element on shutoff), and a bottom resistive
    /// element that also backs up the compressor outside its ambient
    /// range — from a volume and energy-factor rating (spec.md §6
    /// `initGeneric`). `resistance_use` sets how far below setpoint the
    /// resistive elements are allowed to help, matching the original's
    /// `resistanceUse` ΔT knob.
    pub fn init_generic(
        volume: Volume,
        energy_factor: f64,
        resistance_use: TemperatureInterval,
        log_sink: Box<dyn LogSink>,
    ) -> Result<Self, HpwhError> {
        let ua = Self::ua_from_energy_factor(volume, energy_factor)?;
        let n = 12;
        let setpoint = ThermodynamicTemperature::new::<degree_celsius>(DEFAULT_GENERIC_SETPOINT_C);
        let tank = Tank::new(n, volume, ua, setpoint, false)?;

        let resistance_use_c = resistance_use.get::<delta_celsius>();

        // Concentrates condensity in the lower two-thirds of the tank,
        // where a wrapped condenser jacket typically sits.
        let mut condensity_slots = [0.0; 12];
        for (i, slot) in condensity_slots.iter_mut().enumerate().take(8) {
            *slot = if i < 6 { 0.15 } else { 0.05 };
        }
        let condensity = Condensity::new(condensity_slots)?;

        let compressor = HeatSource {
            kind: HeatSourceKind::WrappedCompressor {
                performance_map: Self::generic_compressor_performance_map(),
                condensity,
                defrost: None,
            },
            turn_on_logics: vec![Self::bottom_third_logic(19.0, 1.0, Comparator::LessOrEqual)],
            shut_off_logics: vec![Self::bottom_third_logic(0.0, 1.0, Comparator::GreaterOrEqual)],
            min_ambient_c: -12.2,
            max_ambient_c: 48.9,
            max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(56.7),
            is_vip: false,
            is_on: false,
            backup: Some(HeatSourceIndex(2)),
            companions: vec![],
            followed_by: None,
        };

        let upper = HeatSource {
            kind: HeatSourceKind::Resistive {
                power: Power::new::<kilowatt>(4.5),
                start_node: n - 3,
            },
            turn_on_logics: vec![Self::standby_logic(resistance_use_c, 1.0, Comparator::LessOrEqual)],
            shut_off_logics: vec![Self::standby_logic(0.0, 1.0, Comparator::GreaterOrEqual)],
            min_ambient_c: -50.0,
            max_ambient_c: 100.0,
            max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(60.0),
            is_vip: true,
            is_on: false,
            backup: None,
            companions: vec![],
            followed_by: Some(HeatSourceIndex(2)),
        };

        let lower = HeatSource {
            kind: HeatSourceKind::Resistive {
                power: Power::new::<kilowatt>(4.5),
                start_node: 0,
            },
            turn_on_logics: vec![Self::bottom_third_logic(resistance_use_c, 1.0, Comparator::LessOrEqual)],
            shut_off_logics: vec![Self::bottom_third_logic(0.0, 1.0, Comparator::GreaterOrEqual)],
            min_ambient_c: -50.0,
            max_ambient_c: 100.0,
            max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(60.0),
            is_vip: false,
            is_on: false,
            backup: None,
            companions: vec![],
            followed_by: None,
        };

        // Index 0: compressor; index 1: upper VIP; index 2: lower backup.
        Self::new(tank, vec![compressor, upper, lower], true, log_sink)
    }

    /// Builds a 1- or 2-element resistance tank from a volume and
    /// energy-factor rating (spec.md §6 `initResistance`): `lower_power`
    /// absent builds a single-element tank, present builds the usual
    /// VIP-top/followed-by-bottom pair `hpwh-presets` uses for
    /// `basicIntegrated`.
    pub fn init_resistance(
        volume: Volume,
        energy_factor: f64,
        upper_power: Power,
        lower_power: Option<Power>,
        log_sink: Box<dyn LogSink>,
    ) -> Result<Self, HpwhError> {
        let ua = Self::ua_from_energy_factor(volume, energy_factor)?;
        let n = 12;
        let setpoint = ThermodynamicTemperature::new::<degree_celsius>(DEFAULT_GENERIC_SETPOINT_C);
        let tank = Tank::new(n, volume, ua, setpoint, false)?;

        let mut upper = HeatSource {
            kind: HeatSourceKind::Resistive {
                power: upper_power,
                start_node: n - 3,
            },
            turn_on_logics: vec![Self::standby_logic(19.0, 1.0, Comparator::LessOrEqual)],
            shut_off_logics: vec![Self::standby_logic(0.0, 1.0, Comparator::GreaterOrEqual)],
            min_ambient_c: -50.0,
            max_ambient_c: 100.0,
            max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(60.0),
            is_vip: true,
            is_on: false,
            backup: None,
            companions: vec![],
            followed_by: None,
        };

        let heat_sources = match lower_power {
            Some(lower_power) => {
                let lower = HeatSource {
                    kind: HeatSourceKind::Resistive {
                        power: lower_power,
                        start_node: 0,
                    },
                    turn_on_logics: vec![Self::bottom_third_logic(24.0, 1.0, Comparator::LessOrEqual)],
                    shut_off_logics: vec![Self::bottom_third_logic(0.0, 1.0, Comparator::GreaterOrEqual)],
                    min_ambient_c: -50.0,
                    max_ambient_c: 100.0,
                    max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(60.0),
                    is_vip: false,
                    is_on: false,
                    backup: None,
                    companions: vec![],
                    followed_by: None,
                };
                upper.followed_by = Some(HeatSourceIndex(1));
                vec![upper, lower]
            }
            None => vec![upper],
        };

        Self::new(tank, heat_sources, false, log_sink)
    }

    /// Sets the tank's setpoint, rejecting a value above any heat source's
    /// `max_setpoint` (spec.md §6 `setSetpoint`).
    pub fn set_setpoint(&mut self, setpoint: ThermodynamicTemperature) -> Result<(), HpwhError> {
        if let Some(max_allowed) = Self::max_allowed_setpoint(&self.heat_sources) {
            if setpoint.get::<degree_celsius>() > max_allowed.get::<degree_celsius>() + 1e-9 {
                return Err(HpwhError::PolicyRejection(
                    "setpoint exceeds a heat source's max_setpoint".to_string(),
                ));
            }
        }
        self.tank.set_setpoint(setpoint);
        Ok(())
    }

    #[must_use]
    pub fn setpoint(&self) -> ThermodynamicTemperature {
        self.tank.setpoint()
    }

    /// Resizes the tank (spec.md §6 `setTankSize`); rejects if the tank's
    /// size has been fixed.
    pub fn set_tank_size(&mut self, volume: Volume) -> Result<(), HpwhError> {
        self.tank.set_volume(volume)
    }

    pub fn reset_tank_to_setpoint(&mut self) {
        self.tank.reset_to_setpoint();
    }

    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.tank.num_nodes()
    }

    #[must_use]
    pub fn num_heat_sources(&self) -> usize {
        self.heat_sources.len()
    }

    #[must_use]
    pub fn tank(&self) -> &Tank {
        &self.tank
    }

    #[must_use]
    pub fn sim_has_failed(&self) -> bool {
        self.sim_has_failed
    }

    /// Advances the simulation by one time step (spec.md §4.5). Refuses to
    /// run if a prior step produced a [`HpwhError::NumericFailure`].
    pub fn run_one_step(&mut self, input: StepInput) -> Result<StepOutput, HpwhError> {
        if self.sim_has_failed {
            return Err(HpwhError::AlreadyFailed);
        }
        self.validate_step_input(&input)?;

        let result = self.run_one_step_inner(input);
        if let Err(HpwhError::NumericFailure(ref msg)) = result {
            self.sim_has_failed = true;
            self.log_sink.log(Verbosity::Reluctant, &format!("numeric failure: {msg}"));
        }
        result
    }

    fn validate_step_input(&self, input: &StepInput) -> Result<(), HpwhError> {
        if input.draw_volume.get::<liter>() < 0.0 {
            return Err(HpwhError::InputOutOfDomain("draw volume must not be negative".to_string()));
        }
        if input.step_minutes <= 0.0 {
            return Err(HpwhError::InputOutOfDomain("step duration must be positive".to_string()));
        }
        for (label, t) in [
            ("tank ambient", input.tank_ambient_temp),
            ("heat source ambient", input.heat_source_ambient_temp),
        ] {
            let c = t.get::<degree_celsius>();
            if !AMBIENT_DOMAIN_C.contains(&c) {
                return Err(HpwhError::InputOutOfDomain(format!(
                    "{label} temperature {c} °C outside [{}, {}]",
                    AMBIENT_DOMAIN_C.start(),
                    AMBIENT_DOMAIN_C.end()
                )));
            }
        }
        Ok(())
    }

    fn run_one_step_inner(&mut self, input: StepInput) -> Result<StepOutput, HpwhError> {
        let n = self.heat_sources.len();
        for acc in &mut self.accumulators {
            *acc = SourceAccumulator::zero();
        }

        // DR is evaluated exactly once, at the start of the step (spec.md
        // §9 Open Question: preserved explicitly as the source's rule,
        // since the API only accepts one DrMode value per step anyway).
        for i in 0..n {
            if self.category_locked_out(i, input.dr_mode) {
                self.heat_sources[i].is_on = false;
            }
        }

        let hs_ambient = self.effective_heat_source_ambient(input.heat_source_ambient_temp, input.step_minutes);

        self.run_sources(hs_ambient, input.inlet_temp, input.step_minutes, input.dr_mode)?;

        self.compressor_was_running = (0..n).any(|i| {
            matches!(
                self.heat_sources[i].kind,
                HeatSourceKind::WrappedCompressor { .. } | HeatSourceKind::ExternalLoop { .. }
            ) && self.accumulators[i].is_running
        });

        let outlet_temp = self.tank.apply_draw(input.inlet_temp, input.draw_volume);
        let standby_losses = self.tank.apply_losses(input.tank_ambient_temp, input.step_minutes, false);
        self.tank.apply_conduction(input.step_minutes);
        self.tank.stabilize();

        let energy_removed = (0..n)
            .filter(|&i| {
                matches!(
                    self.heat_sources[i].kind,
                    HeatSourceKind::WrappedCompressor { .. } | HeatSourceKind::ExternalLoop { .. }
                )
            })
            .map(|i| self.accumulators[i].output_energy - self.accumulators[i].input_energy)
            .fold(Energy::new::<kilojoule>(0.0), |a, b| a + b);

        self.step_outlet_temp = outlet_temp;
        self.step_energy_removed = energy_removed;
        self.step_standby_losses = standby_losses;

        Ok(StepOutput {
            outlet_temp,
            energy_removed_from_environment: energy_removed,
            standby_losses,
        })
    }

    /// Updates and returns the virtual room temperature used for
    /// compressor evaluation when temperature depression is enabled,
    /// falling back to the real ambient at any step size other than one
    /// minute.
    fn effective_heat_source_ambient(
        &mut self,
        heat_source_ambient: ThermodynamicTemperature,
        step_minutes: f64,
    ) -> ThermodynamicTemperature {
        if !self.do_temp_depression {
            return heat_source_ambient;
        }
        if (step_minutes - 1.0).abs() > 1e-9 {
            self.log_sink.log(
                Verbosity::Typical,
                "temperature depression is only valid for 1-minute steps; using raw ambient this step",
            );
            return heat_source_ambient;
        }

        let ambient_c = heat_source_ambient.get::<degree_celsius>();
        let prev_c = self.location_temp_c.unwrap_or(ambient_c);
        let next_c = if self.compressor_was_running {
            (prev_c - DEPRESSION_PER_MINUTE_C * step_minutes).max(ambient_c - 20.0)
        } else {
            (prev_c + RECOVERY_PER_MINUTE_C * step_minutes).min(ambient_c)
        };
        self.location_temp_c = Some(next_c);
        ThermodynamicTemperature::new::<degree_celsius>(next_c)
    }

    fn category_locked_out(&self, i: usize, dr_mode: DrMode) -> bool {
        match self.heat_sources[i].kind {
            HeatSourceKind::Resistive { .. } => !dr_mode.allows_resistance(),
            HeatSourceKind::WrappedCompressor { .. } | HeatSourceKind::ExternalLoop { .. } => {
                !dr_mode.allows_compressor()
            }
        }
    }

    fn within_ambient_range(&self, i: usize, hs_ambient: ThermodynamicTemperature) -> bool {
        self.heat_sources[i].is_within_ambient_range(hs_ambient)
    }

    fn exceeds_max_setpoint(&self, i: usize) -> bool {
        self.tank.setpoint().get::<degree_celsius>()
            > self.heat_sources[i].max_setpoint.get::<degree_celsius>() + 1e-9
    }

    /// Selects and runs heat sources for the step, following the priority
    /// rules of spec.md §4.5: VIP sources may preempt and run concurrently
    /// with anything else; otherwise the already-on non-VIP chain is
    /// walked first (honoring `followed_by`), then the off, non-VIP
    /// sources are scanned in priority order for one to engage (honoring
    /// `backup` when a source's own ambient range excludes it); finally, a
    /// DR `Engage` forces the first eligible source on if nothing engaged.
    fn run_sources(
        &mut self,
        hs_ambient: ThermodynamicTemperature,
        inlet_temp: ThermodynamicTemperature,
        step_minutes: f64,
        dr_mode: DrMode,
    ) -> Result<(), HpwhError> {
        if matches!(dr_mode, DrMode::Block { lock_out_resistance: true, lock_out_compressor: true }) {
            // Both categories locked out: nothing may run this step.
            return Ok(());
        }

        let n = self.heat_sources.len();
        let mut any_engaged = false;

        // Phase A: VIP sources may preempt, independent of everything else.
        for i in 0..n {
            if !self.heat_sources[i].is_vip {
                continue;
            }
            if self.category_locked_out(i, dr_mode) || !self.within_ambient_range(i, hs_ambient) || self.exceeds_max_setpoint(i) {
                continue;
            }
            if self.heat_sources[i].wants_to_engage(&self.tank, inlet_temp)? {
                self.engage_and_run(i, hs_ambient, step_minutes)?;
                any_engaged = true;
            }
        }

        // Phase B: walk the already-on, non-VIP chain.
        let already_on = (0..n).find(|&i| !self.heat_sources[i].is_vip && self.heat_sources[i].is_on);
        if let Some(mut i) = already_on {
            loop {
                let must_stop = self.category_locked_out(i, dr_mode)
                    || !self.within_ambient_range(i, hs_ambient)
                    || self.heat_sources[i].wants_to_shut_off(&self.tank, inlet_temp)?;
                if must_stop {
                    self.heat_sources[i].is_on = false;
                    match self.heat_sources[i].followed_by {
                        Some(next) if next.0 != i => {
                            i = next.0;
                            self.heat_sources[i].is_on = true;
                        }
                        _ => break,
                    }
                } else {
                    self.engage_and_run(i, hs_ambient, step_minutes)?;
                    any_engaged = true;
                    break;
                }
            }
        }

        // Phase C: scan off, non-VIP sources in priority order.
        if !any_engaged {
            for i in 0..n {
                if self.heat_sources[i].is_vip || self.heat_sources[i].is_on {
                    continue;
                }
                if self.category_locked_out(i, dr_mode) {
                    continue;
                }
                if !self.within_ambient_range(i, hs_ambient) {
                    if let Some(backup) = self.heat_sources[i].backup {
                        let b = backup.0;
                        if !self.heat_sources[b].is_on
                            && !self.category_locked_out(b, dr_mode)
                            && self.within_ambient_range(b, hs_ambient)
                            && !self.exceeds_max_setpoint(b)
                            && self.heat_sources[i].wants_to_engage(&self.tank, inlet_temp)?
                        {
                            self.engage_and_run(b, hs_ambient, step_minutes)?;
                            any_engaged = true;
                            break;
                        }
                    }
                    continue;
                }
                if self.exceeds_max_setpoint(i) {
                    continue;
                }
                if self.heat_sources[i].wants_to_engage(&self.tank, inlet_temp)? {
                    self.engage_and_run(i, hs_ambient, step_minutes)?;
                    any_engaged = true;
                    break;
                }
            }
        }

        // DR ENGAGE: force the highest-priority eligible source on if
        // nothing else engaged this step.
        if dr_mode.forces_engagement() && !any_engaged {
            if let Some(i) = (0..n).find(|&i| {
                !self.heat_sources[i].is_on
                    && !self.category_locked_out(i, dr_mode)
                    && self.within_ambient_range(i, hs_ambient)
                    && !self.exceeds_max_setpoint(i)
            }) {
                self.engage_and_run(i, hs_ambient, step_minutes)?;
            }
        }

        Ok(())
    }

    fn engage_and_run(
        &mut self,
        i: usize,
        hs_ambient: ThermodynamicTemperature,
        available_minutes: f64,
    ) -> Result<(), HpwhError> {
        self.heat_sources[i].is_on = true;
        let result = self.heat_sources[i].run(&mut self.tank, hs_ambient, available_minutes)?;
        self.accumulators[i] = SourceAccumulator {
            input_energy: result.input_energy,
            output_energy: result.output_energy,
            runtime_minutes: result.runtime_minutes,
            is_running: result.runtime_minutes > 1e-9,
        };

        for companion in self.heat_sources[i].companions.clone() {
            let c = companion.0;
            if self.heat_sources[c].is_on {
                continue;
            }
            self.heat_sources[c].is_on = true;
            let companion_result = self.heat_sources[c].run(&mut self.tank, hs_ambient, available_minutes)?;
            self.accumulators[c] = SourceAccumulator {
                input_energy: companion_result.input_energy,
                output_energy: companion_result.output_energy,
                runtime_minutes: companion_result.runtime_minutes,
                is_running: companion_result.runtime_minutes > 1e-9,
            };
        }
        Ok(())
    }

    /// Advances the simulation by `N` equal-length steps, aggregating
    /// outputs as spec.md §6 `runNSteps` describes: energies and runtimes
    /// sum; the outlet temperature is the draw-volume-weighted mean across
    /// all steps.
    #[allow(clippy::too_many_arguments)]
    pub fn run_n_steps(
        &mut self,
        inlet_temps: &[ThermodynamicTemperature],
        draw_volumes: &[Volume],
        tank_ambient_temps: &[ThermodynamicTemperature],
        heat_source_ambient_temps: &[ThermodynamicTemperature],
        dr_modes: &[DrMode],
        step_minutes: f64,
    ) -> Result<StepOutput, HpwhError> {
        let n = inlet_temps.len();
        if draw_volumes.len() != n
            || tank_ambient_temps.len() != n
            || heat_source_ambient_temps.len() != n
            || dr_modes.len() != n
        {
            return Err(HpwhError::InputOutOfDomain(
                "runNSteps input arrays must all have equal length".to_string(),
            ));
        }
        if n == 0 {
            return Err(HpwhError::InputOutOfDomain(
                "runNSteps requires at least one step".to_string(),
            ));
        }

        let source_count = self.heat_sources.len();
        let mut total_input = vec![Energy::new::<kilojoule>(0.0); source_count];
        let mut total_output = vec![Energy::new::<kilojoule>(0.0); source_count];
        let mut total_runtime = vec![0.0; source_count];
        let mut total_energy_removed = Energy::new::<kilojoule>(0.0);
        let mut total_standby = Energy::new::<kilojoule>(0.0);
        let mut outlet_weighted_sum_c = 0.0;
        let mut total_draw_l = 0.0;

        for step in 0..n {
            let input = StepInput {
                inlet_temp: inlet_temps[step],
                draw_volume: draw_volumes[step],
                tank_ambient_temp: tank_ambient_temps[step],
                heat_source_ambient_temp: heat_source_ambient_temps[step],
                dr_mode: dr_modes[step],
                step_minutes,
            };
            let output = self.run_one_step(input)?;

            for s in 0..source_count {
                total_input[s] += self.accumulators[s].input_energy;
                total_output[s] += self.accumulators[s].output_energy;
                total_runtime[s] += self.accumulators[s].runtime_minutes;
            }
            total_energy_removed += output.energy_removed_from_environment;
            total_standby += output.standby_losses;

            let draw_l = draw_volumes[step].get::<liter>();
            outlet_weighted_sum_c += draw_l * output.outlet_temp.get::<degree_celsius>();
            total_draw_l += draw_l;
        }

        for s in 0..source_count {
            self.accumulators[s].input_energy = total_input[s];
            self.accumulators[s].output_energy = total_output[s];
            self.accumulators[s].runtime_minutes = total_runtime[s];
        }
        self.step_energy_removed = total_energy_removed;
        self.step_standby_losses = total_standby;
        self.step_outlet_temp = if total_draw_l > 0.0 {
            ThermodynamicTemperature::new::<degree_celsius>(outlet_weighted_sum_c / total_draw_l)
        } else {
            ThermodynamicTemperature::new::<degree_celsius>(0.0)
        };

        Ok(StepOutput {
            outlet_temp: self.step_outlet_temp,
            energy_removed_from_environment: self.step_energy_removed,
            standby_losses: self.step_standby_losses,
        })
    }

    fn heat_source(&self, i: usize) -> Result<&HeatSource, HpwhError> {
        self.heat_sources.get(i).ok_or_else(|| {
            HpwhError::InputOutOfDomain(format!("heat source {i} out of range [0, {})", self.heat_sources.len()))
        })
    }

    fn accumulator(&self, i: usize) -> Result<&SourceAccumulator, HpwhError> {
        self.heat_source(i)?;
        Ok(&self.accumulators[i])
    }

    pub fn tank_node_temp(&self, node: usize) -> Result<ThermodynamicTemperature, HpwhError> {
        self.tank.temperature(node)
    }

    pub fn get_tank_node_temp(&self, node: usize, unit: TempUnit) -> Result<f64, HpwhError> {
        Ok(temp_to_unit(self.tank_node_temp(node)?, unit))
    }

    /// Reads one of the six virtual thermocouples, numbered 1 (bottom) to
    /// 6 (top), matching spec.md §6's `getNthSimTcouple`.
    pub fn get_nth_sim_tcouple(&self, n: usize, unit: TempUnit) -> Result<f64, HpwhError> {
        if n == 0 || n > 6 {
            return Err(HpwhError::InputOutOfDomain(format!(
                "simulated thermocouple index {n} out of range [1, 6]"
            )));
        }
        let tcouples = self.tank.virtual_thermocouples();
        Ok(temp_to_unit(tcouples[n - 1], unit))
    }

    #[must_use]
    pub fn outlet_temp(&self) -> ThermodynamicTemperature {
        self.step_outlet_temp
    }

    #[must_use]
    pub fn get_outlet_temp(&self, unit: TempUnit) -> f64 {
        temp_to_unit(self.step_outlet_temp, unit)
    }

    #[must_use]
    pub fn energy_removed_from_environment(&self) -> Energy {
        self.step_energy_removed
    }

    #[must_use]
    pub fn get_energy_removed_from_environment(&self, unit: EnergyUnit) -> f64 {
        energy_to_unit(self.step_energy_removed, unit)
    }

    #[must_use]
    pub fn standby_losses(&self) -> Energy {
        self.step_standby_losses
    }

    #[must_use]
    pub fn get_standby_losses(&self, unit: EnergyUnit) -> f64 {
        energy_to_unit(self.step_standby_losses, unit)
    }

    pub fn get_nth_heat_source_energy_input(&self, n: usize, unit: EnergyUnit) -> Result<f64, HpwhError> {
        Ok(energy_to_unit(self.accumulator(n)?.input_energy, unit))
    }

    pub fn get_nth_heat_source_energy_output(&self, n: usize, unit: EnergyUnit) -> Result<f64, HpwhError> {
        Ok(energy_to_unit(self.accumulator(n)?.output_energy, unit))
    }

    pub fn get_nth_heat_source_run_time(&self, n: usize) -> Result<f64, HpwhError> {
        Ok(self.accumulator(n)?.runtime_minutes)
    }

    pub fn is_nth_heat_source_running(&self, n: usize) -> Result<bool, HpwhError> {
        Ok(self.accumulator(n)?.is_running)
    }

    #[must_use]
    pub fn tank_volume(&self, unit: VolumeUnit) -> f64 {
        volume_to_unit(self.tank.volume(), unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condensity::Condensity;
    use crate::dr::DrMode;
    use crate::heat_source::HeatSourceKind;
    use crate::heating_logic::{
        Comparator, DecisionPoint, HeatingLogic, NamedShorthand, WeightedNodeCompare,
    };
    use crate::units::UaKjPerHourC;
    use approx::assert_relative_eq;
    use uom::si::f64::TemperatureInterval;
    use uom::si::power::kilowatt;
    use uom::si::temperature_interval::degree_celsius as delta_celsius;

    fn setpoint() -> ThermodynamicTemperature {
        ThermodynamicTemperature::new::<degree_celsius>(52.78)
    }

    fn flat_tank(n: usize, volume_l: f64, temp_c: f64) -> Tank {
        Tank::new(
            n,
            Volume::new::<liter>(volume_l),
            UaKjPerHourC::new(0.0),
            ThermodynamicTemperature::new::<degree_celsius>(temp_c),
            false,
        )
        .unwrap()
    }

    fn resistive_source(start_node: usize, power_kw: f64, is_vip: bool) -> HeatSource {
        HeatSource {
            kind: HeatSourceKind::Resistive {
                power: uom::si::f64::Power::new::<kilowatt>(power_kw),
                start_node,
            },
            turn_on_logics: vec![HeatingLogic::WeightedNodeCompare(WeightedNodeCompare::from_shorthand(
                NamedShorthand::Standby,
                DecisionPoint::BelowSetpoint(TemperatureInterval::new::<delta_celsius>(8.0)),
                Comparator::LessOrEqual,
                TemperatureInterval::new::<delta_celsius>(1.0),
            ))],
            shut_off_logics: vec![HeatingLogic::WeightedNodeCompare(WeightedNodeCompare::from_shorthand(
                NamedShorthand::Standby,
                DecisionPoint::Absolute(setpoint()),
                Comparator::GreaterOrEqual,
                TemperatureInterval::new::<delta_celsius>(1.0),
            ))],
            min_ambient_c: -50.0,
            max_ambient_c: 100.0,
            max_setpoint: ThermodynamicTemperature::new::<degree_celsius>(60.0),
            is_vip,
            is_on: false,
            backup: None,
            companions: vec![],
            followed_by: None,
        }
    }

    fn two_element_resistance_tank(volume_l: f64) -> Simulation {
        let tank = flat_tank(12, volume_l, 20.0);
        let mut upper = resistive_source(8, 4.5, true);
        let lower = resistive_source(0, 4.5, false);
        upper.followed_by = Some(crate::heat_source::HeatSourceIndex(1));
        Simulation::new(tank, vec![upper, lower], false, Box::new(NullLogSink)).unwrap()
    }

    #[test]
    fn pure_standby_no_losses_leaves_tank_unchanged() {
        let tank = flat_tank(12, 189.0, 52.78);
        let source = resistive_source(8, 4.5, true);
        let mut sim = Simulation::new(tank, vec![source], false, Box::new(NullLogSink)).unwrap();

        let before: Vec<f64> = sim.tank().temperatures().iter().map(|t| t.get::<degree_celsius>()).collect();

        for _ in 0..60 {
            sim.run_one_step(StepInput {
                inlet_temp: ThermodynamicTemperature::new::<degree_celsius>(10.0),
                draw_volume: Volume::new::<liter>(0.0),
                tank_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
                heat_source_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
                dr_mode: DrMode::Allow,
                step_minutes: 1.0,
            })
            .unwrap();
        }

        let after: Vec<f64> = sim.tank().temperatures().iter().map(|t| t.get::<degree_celsius>()).collect();
        for (b, a) in before.iter().zip(after.iter()) {
            assert_relative_eq!(b, a, epsilon = 1e-9);
        }
        assert_eq!(sim.get_nth_heat_source_run_time(0).unwrap(), 0.0);
    }

    #[test]
    fn cold_fill_draw_reports_outlet_near_initial_setpoint() {
        let tank = flat_tank(12, 190.0, 52.78);
        let source = resistive_source(8, 4.5, true);
        let mut sim = Simulation::new(tank, vec![source], false, Box::new(NullLogSink)).unwrap();

        let output = sim
            .run_one_step(StepInput {
                inlet_temp: ThermodynamicTemperature::new::<degree_celsius>(5.0),
                draw_volume: Volume::new::<liter>(190.0),
                tank_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
                heat_source_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
                dr_mode: DrMode::Allow,
                step_minutes: 1.0,
            })
            .unwrap();

        assert_relative_eq!(output.outlet_temp.get::<degree_celsius>(), 52.78, epsilon = 1e-6);
        assert_relative_eq!(sim.tank().temperature(0).unwrap().get::<degree_celsius>(), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn resistive_recovery_upper_element_runs_first_as_vip() {
        let mut sim = two_element_resistance_tank(189.0);

        let mut any_upper_ran = false;
        for _ in 0..60 {
            sim.run_one_step(StepInput {
                inlet_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
                draw_volume: Volume::new::<liter>(0.0),
                tank_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
                heat_source_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
                dr_mode: DrMode::Allow,
                step_minutes: 1.0,
            })
            .unwrap();
            if sim.is_nth_heat_source_running(0).unwrap() {
                any_upper_ran = true;
            }
        }
        assert!(any_upper_ran, "the VIP upper element should engage first during recovery");
    }

    #[test]
    fn dr_block_both_categories_keeps_everything_off() {
        let mut sim = two_element_resistance_tank(189.0);

        let output = sim
            .run_one_step(StepInput {
                inlet_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
                draw_volume: Volume::new::<liter>(0.0),
                tank_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
                heat_source_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
                dr_mode: DrMode::Block {
                    lock_out_resistance: true,
                    lock_out_compressor: true,
                },
                step_minutes: 1.0,
            })
            .unwrap();

        assert!(!sim.is_nth_heat_source_running(0).unwrap());
        assert!(!sim.is_nth_heat_source_running(1).unwrap());
        assert_eq!(output.energy_removed_from_environment.get::<kilojoule>(), 0.0);
    }

    #[test]
    fn dr_engage_forces_top_priority_source_on() {
        // A tank already at setpoint: ordinary turn-on logic would not
        // fire, so only the forced DR::Engage should bring the source on.
        let tank = flat_tank(12, 189.0, 52.78);
        let source = resistive_source(8, 4.5, true);
        let mut sim = Simulation::new(tank, vec![source], false, Box::new(NullLogSink)).unwrap();

        sim.run_one_step(StepInput {
            inlet_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
            draw_volume: Volume::new::<liter>(0.0),
            tank_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
            heat_source_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
            dr_mode: DrMode::Engage,
            step_minutes: 1.0,
        })
        .unwrap();

        assert!(sim.is_nth_heat_source_running(0).unwrap());
        assert!(sim.get_nth_heat_source_energy_input(0, EnergyUnit::KWh).unwrap() > 0.0);
    }

    #[test]
    fn condensity_must_stay_normalized_for_a_wrapped_source() {
        assert!(Condensity::new([0.5; 12]).is_err());
    }

    #[test]
    fn set_setpoint_rejects_above_max_setpoint() {
        let tank = flat_tank(12, 189.0, 50.0);
        let mut source = resistive_source(0, 4.5, false);
        source.max_setpoint = ThermodynamicTemperature::new::<degree_celsius>(55.0);
        let mut sim = Simulation::new(tank, vec![source], false, Box::new(NullLogSink)).unwrap();

        let result = sim.set_setpoint(ThermodynamicTemperature::new::<degree_celsius>(60.0));
        assert!(matches!(result, Err(HpwhError::PolicyRejection(_))));
    }

    #[test]
    fn init_resistance_with_only_upper_power_builds_a_single_source_tank() {
        let sim = Simulation::init_resistance(
            Volume::new::<liter>(189.0),
            0.95,
            uom::si::f64::Power::new::<kilowatt>(4.5),
            None,
            Box::new(NullLogSink),
        )
        .unwrap();

        assert_eq!(sim.num_heat_sources(), 1);
    }

    #[test]
    fn init_resistance_with_both_powers_wires_upper_as_vip_followed_by_lower() {
        let sim = Simulation::init_resistance(
            Volume::new::<liter>(189.0),
            0.95,
            uom::si::f64::Power::new::<kilowatt>(4.5),
            Some(uom::si::f64::Power::new::<kilowatt>(4.5)),
            Box::new(NullLogSink),
        )
        .unwrap();

        assert_eq!(sim.num_heat_sources(), 2);
    }

    #[test]
    fn init_resistance_rejects_energy_factor_out_of_range() {
        let result = Simulation::init_resistance(
            Volume::new::<liter>(189.0),
            1.5,
            uom::si::f64::Power::new::<kilowatt>(4.5),
            None,
            Box::new(NullLogSink),
        );
        assert!(matches!(result, Err(HpwhError::ConfigurationInvalid(_))));
    }

    #[test]
    fn init_generic_builds_a_three_source_compressor_tank() {
        let mut sim = Simulation::init_generic(
            Volume::new::<liter>(245.0),
            2.0,
            TemperatureInterval::new::<delta_celsius>(19.0),
            Box::new(NullLogSink),
        )
        .unwrap();

        assert_eq!(sim.num_heat_sources(), 3);

        sim.run_one_step(StepInput {
            inlet_temp: ThermodynamicTemperature::new::<degree_celsius>(10.0),
            draw_volume: Volume::new::<liter>(0.0),
            tank_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
            heat_source_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
            dr_mode: DrMode::Allow,
            step_minutes: 1.0,
        })
        .unwrap();
    }

    #[test]
    fn already_failed_refuses_further_steps() {
        let tank = flat_tank(12, 189.0, 52.78);
        let source = resistive_source(8, 4.5, true);
        let mut sim = Simulation::new(tank, vec![source], false, Box::new(NullLogSink)).unwrap();

        let bad_input = StepInput {
            inlet_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
            draw_volume: Volume::new::<liter>(-1.0),
            tank_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
            heat_source_ambient_temp: ThermodynamicTemperature::new::<degree_celsius>(20.0),
            dr_mode: DrMode::Allow,
            step_minutes: 1.0,
        };
        // A rejected InputOutOfDomain step does not set the sticky failure flag.
        assert!(sim.run_one_step(bad_input).is_err());
        assert!(!sim.sim_has_failed());
    }
}
