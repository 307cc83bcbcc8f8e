//! Demand-response signaling: a simple mode that can lock out resistance
//! elements, lock out compressors, or force engagement, evaluated once at
//! the start of every step.

/// A demand-response instruction for the upcoming step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrMode {
    /// No demand-response override; sources engage per their own logic.
    #[default]
    Allow,
    /// Locks out the named categories of source for the step.
    Block {
        lock_out_resistance: bool,
        lock_out_compressor: bool,
    },
    /// Forces engagement of whichever source would otherwise run, ignoring
    /// its turn-on logic (used for pre-heating ahead of an anticipated
    /// block period).
    Engage,
}

impl DrMode {
    /// Whether a resistive source may engage this step.
    #[must_use]
    pub fn allows_resistance(self) -> bool {
        !matches!(
            self,
            DrMode::Block {
                lock_out_resistance: true,
                ..
            }
        )
    }

    /// Whether a compressor-based source may engage this step.
    #[must_use]
    pub fn allows_compressor(self) -> bool {
        !matches!(
            self,
            DrMode::Block {
                lock_out_compressor: true,
                ..
            }
        )
    }

    /// Whether this step should force engagement ahead of normal logic.
    #[must_use]
    pub fn forces_engagement(self) -> bool {
        matches!(self, DrMode::Engage)
    }
}
