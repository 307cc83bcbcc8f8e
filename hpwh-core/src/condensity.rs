//! The condensity vector: where a heat source deposits heat along tank height.

use twine_core::Fraction;

use crate::error::HpwhError;
use crate::units::CONDENSITY_SIZE;

/// The fractional distribution of deposited thermal power along the twelve
/// logical slots of tank height, bottom to top.
///
/// Slots are resampled by proportional index onto the tank's actual `N`
/// physical nodes: slot `k` maps onto node range
/// `[k*N/12, (k+1)*N/12)`, matching the original implementation's logical-
/// node projection (`CONDENSITY_SIZE` = 12, used both here and by the
/// heating-logic node weights).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condensity([Fraction; CONDENSITY_SIZE]);

impl Condensity {
    /// Builds a condensity vector, requiring the twelve entries to sum to
    /// one within `1e-9`.
    pub fn new(slots: [f64; CONDENSITY_SIZE]) -> Result<Self, HpwhError> {
        let sum: f64 = slots.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(HpwhError::ConfigurationInvalid(format!(
                "condensity must sum to 1, got {sum}"
            )));
        }

        let mut fractions = [Fraction::new(0.0).expect("0.0 is a valid Fraction"); CONDENSITY_SIZE];
        for (dst, &value) in fractions.iter_mut().zip(slots.iter()) {
            *dst = Fraction::new(value).map_err(|e| {
                HpwhError::ConfigurationInvalid(format!("invalid condensity entry: {e}"))
            })?;
        }

        Ok(Self(fractions))
    }

    /// A condensity with all weight in a single logical slot.
    pub fn single_slot(slot: usize) -> Result<Self, HpwhError> {
        if slot >= CONDENSITY_SIZE {
            return Err(HpwhError::ConfigurationInvalid(format!(
                "condensity slot {slot} out of range [0, {CONDENSITY_SIZE})"
            )));
        }
        let mut slots = [0.0; CONDENSITY_SIZE];
        slots[slot] = 1.0;
        Self::new(slots)
    }

    /// The raw fractional weights, in bottom-to-top slot order.
    #[must_use]
    pub fn slots(&self) -> [f64; CONDENSITY_SIZE] {
        self.0.map(Fraction::get)
    }

    /// Resamples the fixed twelve-slot condensity onto `n` physical tank
    /// nodes by proportional index: node `i` receives the weight of
    /// whichever logical slot `i` falls into at the corresponding height.
    ///
    /// The returned vector has length `n` and sums to the same total as
    /// `self` (within floating-point error).
    #[must_use]
    pub fn resample(&self, n: usize) -> Vec<f64> {
        let mut out = vec![0.0; n];
        if n == 0 {
            return out;
        }
        for (node, weight) in out.iter_mut().enumerate() {
            let slot = (node * CONDENSITY_SIZE) / n;
            let slot = slot.min(CONDENSITY_SIZE - 1);
            *weight = self.0[slot].get() * (CONDENSITY_SIZE as f64) / (n as f64);
        }
        out
    }
}
