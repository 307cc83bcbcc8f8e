//! Interpolates input power and COP from ambient-air and condenser-water
//! temperatures.

use ndarray::{Array1, Array2};
use twine_components::interpolation::{Extrapolate, InterpND, Interp2D, StrategyND, Strategy2D};
use twine_core::Component;
use uom::si::f64::{Power, ThermodynamicTemperature};
use uom::si::power::watt;
use uom::si::thermodynamic_temperature::degree_celsius;

use crate::error::HpwhError;

/// A single anchor of a list-form performance map: at a given air
/// temperature, input power and COP are quadratics in condenser
/// temperature, matching the original `HPWH::HeatSource::getCapacity`
/// coefficient layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListAnchor {
    pub air_temp_c: f64,
    /// `[P0, P1, P2]` such that `power(Tc) = P0 + P1*Tc + P2*Tc^2`, in watts.
    pub input_power_coeffs: [f64; 3],
    /// `[C0, C1, C2]` such that `cop(Tc) = C0 + C1*Tc + C2*Tc^2`.
    pub cop_coeffs: [f64; 3],
}

fn quadratic(coeffs: [f64; 3], x: f64) -> f64 {
    coeffs[0] + coeffs[1] * x + coeffs[2] * x * x
}

/// The axes a grid-form performance map is indexed over.
#[derive(Debug, Clone)]
pub enum GridAxes {
    /// `(T_air, T_setpoint)`.
    Two { air: Array1<f64>, setpoint: Array1<f64> },
    /// `(T_air, T_setpoint, T_in)`, used by external-loop maps.
    Three {
        air: Array1<f64>,
        setpoint: Array1<f64>,
        inlet: Array1<f64>,
    },
}

/// A regular grid-form performance map: standard multilinear interpolation
/// over `(T_air, T_setpoint[, T_in])`, with a configurable per-axis
/// extrapolation policy.
pub struct GridMap {
    power: GridInterp,
    cop: GridInterp,
}

enum GridInterp {
    Two(Interp2D),
    Three(InterpND),
}

impl GridMap {
    /// Builds a grid-form map. `power_values` and `cop_values` must have the
    /// same shape as implied by `axes` (row-major, outer axis first).
    pub fn new(
        axes: GridAxes,
        power_values_w: Array2<f64>,
        cop_values: Array2<f64>,
        extrapolate: Extrapolate<f64>,
    ) -> Result<Self, HpwhError> {
        let power = match &axes {
            GridAxes::Two { air, setpoint } => GridInterp::Two(
                Interp2D::new(
                    air.clone(),
                    setpoint.clone(),
                    power_values_w.clone(),
                    &Strategy2D::Linear,
                    extrapolate,
                )
                .map_err(|e| HpwhError::ConfigurationInvalid(e.to_string()))?,
            ),
            GridAxes::Three { air, setpoint, inlet } => GridInterp::Three(
                InterpND::new(
                    vec![air.clone(), setpoint.clone(), inlet.clone()],
                    power_values_w.clone().into_dyn(),
                    &StrategyND::Linear,
                    extrapolate,
                )
                .map_err(|e| HpwhError::ConfigurationInvalid(e.to_string()))?,
            ),
        };
        let cop = match &axes {
            GridAxes::Two { air, setpoint } => GridInterp::Two(
                Interp2D::new(
                    air.clone(),
                    setpoint.clone(),
                    cop_values.clone(),
                    &Strategy2D::Linear,
                    extrapolate,
                )
                .map_err(|e| HpwhError::ConfigurationInvalid(e.to_string()))?,
            ),
            GridAxes::Three { air, setpoint, inlet } => GridInterp::Three(
                InterpND::new(
                    vec![air.clone(), setpoint.clone(), inlet.clone()],
                    cop_values.clone().into_dyn(),
                    &StrategyND::Linear,
                    extrapolate,
                )
                .map_err(|e| HpwhError::ConfigurationInvalid(e.to_string()))?,
            ),
        };

        Ok(Self { power, cop })
    }

    fn evaluate(
        &self,
        air_c: f64,
        setpoint_c: f64,
        inlet_c: Option<f64>,
    ) -> Result<(f64, f64), HpwhError> {
        let power = Self::call_one(&self.power, air_c, setpoint_c, inlet_c)?;
        let cop = Self::call_one(&self.cop, air_c, setpoint_c, inlet_c)?;
        Ok((power, cop))
    }

    fn call_one(
        interp: &GridInterp,
        air_c: f64,
        setpoint_c: f64,
        inlet_c: Option<f64>,
    ) -> Result<f64, HpwhError> {
        match interp {
            GridInterp::Two(i) => i
                .call([air_c, setpoint_c])
                .map_err(|e| HpwhError::NumericFailure(e.to_string())),
            GridInterp::Three(i) => {
                let inlet_c = inlet_c.ok_or_else(|| {
                    HpwhError::ConfigurationInvalid(
                        "three-axis performance map requires an inlet temperature".to_string(),
                    )
                })?;
                i.call(vec![air_c, setpoint_c, inlet_c])
                    .map_err(|e| HpwhError::NumericFailure(e.to_string()))
            }
        }
    }
}

/// Input power and COP as functions of ambient-air temperature,
/// condenser-water temperature, and setpoint.
pub enum PerformanceMap {
    /// Discrete air-temperature anchors, each a bivariate quadratic in
    /// condenser temperature; anchors are linearly interpolated (or
    /// nearest-extrapolated) in air temperature.
    List {
        anchors: Vec<ListAnchor>,
        extrapolate_nearest: bool,
    },
    /// A regular grid, linearly interpolated across all axes.
    Grid(GridMap),
}

impl PerformanceMap {
    /// Builds a list-form map. Anchors are sorted by air temperature.
    pub fn list(mut anchors: Vec<ListAnchor>, extrapolate_nearest: bool) -> Result<Self, HpwhError> {
        if anchors.len() < 2 {
            return Err(HpwhError::ConfigurationInvalid(
                "a list-form performance map needs at least two anchors".to_string(),
            ));
        }
        anchors.sort_by(|a, b| a.air_temp_c.total_cmp(&b.air_temp_c));
        Ok(Self::List {
            anchors,
            extrapolate_nearest,
        })
    }

    /// Evaluates input power and COP at the given operating point. Capacity
    /// (thermal output) is `power * cop`.
    pub fn evaluate(
        &self,
        t_air: ThermodynamicTemperature,
        t_condenser: ThermodynamicTemperature,
        t_setpoint: ThermodynamicTemperature,
    ) -> Result<(Power, f64), HpwhError> {
        self.evaluate_with_inlet(t_air, t_condenser, t_setpoint, None)
    }

    /// Evaluates at an operating point that also depends on an inlet-water
    /// temperature (the three-axis external-loop case).
    pub fn evaluate_with_inlet(
        &self,
        t_air: ThermodynamicTemperature,
        t_condenser: ThermodynamicTemperature,
        t_setpoint: ThermodynamicTemperature,
        t_inlet: Option<ThermodynamicTemperature>,
    ) -> Result<(Power, f64), HpwhError> {
        let air_c = t_air.get::<degree_celsius>();
        let cond_c = t_condenser.get::<degree_celsius>();

        let (power_w, cop) = match self {
            PerformanceMap::List {
                anchors,
                extrapolate_nearest,
            } => Self::evaluate_list(anchors, *extrapolate_nearest, air_c, cond_c)?,
            PerformanceMap::Grid(grid) => {
                let setpoint_c = t_setpoint.get::<degree_celsius>();
                let inlet_c = t_inlet.map(|t| t.get::<degree_celsius>());
                grid.evaluate(air_c, setpoint_c, inlet_c)?
            }
        };

        if !power_w.is_finite() || !cop.is_finite() {
            return Err(HpwhError::NumericFailure(
                "performance map produced a non-finite value".to_string(),
            ));
        }

        Ok((Power::new::<watt>(power_w), cop))
    }

    fn evaluate_list(
        anchors: &[ListAnchor],
        extrapolate_nearest: bool,
        air_c: f64,
        cond_c: f64,
    ) -> Result<(f64, f64), HpwhError> {
        let first = anchors.first().expect("list has at least two anchors");
        let last = anchors.last().expect("list has at least two anchors");

        if air_c <= first.air_temp_c {
            if !extrapolate_nearest && air_c < first.air_temp_c {
                return Err(HpwhError::InputOutOfDomain(format!(
                    "air temperature {air_c} below performance map domain"
                )));
            }
            return Ok((
                quadratic(first.input_power_coeffs, cond_c),
                quadratic(first.cop_coeffs, cond_c),
            ));
        }
        if air_c >= last.air_temp_c {
            if !extrapolate_nearest && air_c > last.air_temp_c {
                return Err(HpwhError::InputOutOfDomain(format!(
                    "air temperature {air_c} above performance map domain"
                )));
            }
            return Ok((
                quadratic(last.input_power_coeffs, cond_c),
                quadratic(last.cop_coeffs, cond_c),
            ));
        }

        let upper_idx = anchors
            .iter()
            .position(|a| a.air_temp_c >= air_c)
            .expect("air_c is within the anchor domain");
        let lower_idx = upper_idx - 1;
        let lower = &anchors[lower_idx];
        let upper = &anchors[upper_idx];

        let span = upper.air_temp_c - lower.air_temp_c;
        let frac = if span.abs() < f64::EPSILON {
            0.0
        } else {
            (air_c - lower.air_temp_c) / span
        };

        let power_lower = quadratic(lower.input_power_coeffs, cond_c);
        let power_upper = quadratic(upper.input_power_coeffs, cond_c);
        let cop_lower = quadratic(lower.cop_coeffs, cond_c);
        let cop_upper = quadratic(upper.cop_coeffs, cond_c);

        Ok((
            power_lower + frac * (power_upper - power_lower),
            cop_lower + frac * (cop_upper - cop_lower),
        ))
    }
}

/// Piecewise-linear capacity derating plus an auxiliary fixed-power
/// resistive draw in cold, frost-forming conditions, grounded on
/// `HPWHpresets.cc`'s defrost-map handling: capacity derates linearly
/// across `(low_c, high_c)`, reaching `min_derate_factor` at `low_c` and
/// full capacity at and above `high_c`; an auxiliary resistive draw kicks
/// in below `aux_threshold_c` to represent frost-formation losses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Defrost {
    pub low_c: f64,
    pub high_c: f64,
    pub min_derate_factor: f64,
    pub aux_power: Power,
    pub aux_threshold_c: f64,
}

impl Defrost {
    /// Returns the derated capacity and any auxiliary resistive draw.
    #[must_use]
    pub fn apply(&self, air_c: f64, capacity: Power) -> (Power, Power) {
        let factor = if air_c >= self.high_c {
            1.0
        } else if air_c <= self.low_c {
            self.min_derate_factor
        } else {
            let span = self.high_c - self.low_c;
            let frac = (air_c - self.low_c) / span;
            self.min_derate_factor + frac * (1.0 - self.min_derate_factor)
        };

        let aux = if air_c < self.aux_threshold_c {
            self.aux_power
        } else {
            Power::new::<watt>(0.0)
        };

        (capacity * factor, aux)
    }
}
