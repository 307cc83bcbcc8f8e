//! Error kinds and the diagnostic logging sink.

use thiserror::Error;

/// Errors the engine can report.
///
/// Per-step errors of kind [`InputOutOfDomain`](HpwhError::InputOutOfDomain)
/// and [`PolicyRejection`](HpwhError::PolicyRejection) leave tank state
/// untouched. A [`NumericFailure`](HpwhError::NumericFailure) additionally
/// sets the simulation's sticky failure flag; every subsequent step then
/// returns [`AlreadyFailed`](HpwhError::AlreadyFailed) without touching
/// state, until the simulation is re-initialized.
///
/// Historical note: the original C++ implementation signaled these
/// conditions by returning a large negative sentinel (`HPWH_ABORT`) from
/// accessors and init/step operations. This crate uses `Result` and
/// `Option` throughout instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HpwhError {
    /// Bad preset id, non-normalized condensity, negative volume/UA,
    /// unknown logic selector, setpoint above a source's max, or an
    /// inconsistent structural reference. Reported synchronously from init.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// Negative draw volume, zero/negative step duration, or an ambient
    /// temperature outside `[-50, 100] °C`.
    #[error("input out of domain: {0}")]
    InputOutOfDomain(String),

    /// NaN or infinite value produced while evaluating a performance map or
    /// updating tank state. Sets the sticky failure flag.
    #[error("numeric failure: {0}")]
    NumericFailure(String),

    /// Rejected by policy: `set_tank_size` while the tank size is fixed, or
    /// a setpoint above a heat source's `maxSetpoint`.
    #[error("rejected by policy: {0}")]
    PolicyRejection(String),

    /// A prior step produced a [`NumericFailure`](Self::NumericFailure); the
    /// simulation must be re-initialized before stepping further.
    #[error("simulation has already failed and must be re-initialized")]
    AlreadyFailed,
}

/// Verbosity levels for the optional diagnostic logging sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent,
    Reluctant,
    Typical,
    Emetic,
}

/// A sink for diagnostic messages emitted during init and stepping.
///
/// Implementations must be non-blocking from the engine's perspective.
/// Passed in at construction; the engine never reaches for global state.
pub trait LogSink {
    fn log(&self, verbosity: Verbosity, message: &str);
}

/// A [`LogSink`] that discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogSink;

impl LogSink for NullLogSink {
    fn log(&self, _verbosity: Verbosity, _message: &str) {}
}

/// A [`LogSink`] that forwards to the `tracing` crate, mapping [`Verbosity`]
/// to `tracing` levels (`Emetic` -> `TRACE`, `Typical` -> `DEBUG`,
/// `Reluctant` -> `WARN`; `Silent` messages are never logged).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, verbosity: Verbosity, message: &str) {
        match verbosity {
            Verbosity::Silent => {}
            Verbosity::Reluctant => tracing::warn!("{message}"),
            Verbosity::Typical => tracing::debug!("{message}"),
            Verbosity::Emetic => tracing::trace!("{message}"),
        }
    }
}
