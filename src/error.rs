//! Custom error types for the driver.
//!
//! This module defines the primary error type, `K224Error`, for the whole crate.
//! Using the `thiserror` crate, it gives every failing operation one consistent
//! error to propagate with `?`.
//!
//! ## Error Hierarchy
//!
//! - **`RangeViolation`**: a setter received a value outside the instrument's physical
//!   limits. Nothing was written and the committed state is unchanged.
//! - **`TypeMismatch`**: a dynamically typed value (from configuration or a scripting
//!   front end) has the wrong kind for the parameter, or a range token does not name a
//!   known range.
//! - **`Decode`**: the status line returned by the instrument could not be parsed.
//! - **`Transport`**: the underlying bus failed. Passed through untouched; a write that
//!   fails this way leaves the committed state unchanged, although the instrument may or
//!   may not have received the command.
//! - **`Config`**: the layered configuration could not be loaded.

use std::fmt;
use std::num::ParseFloatError;

use thiserror::Error;

use crate::adapters::TransportError;

/// Convenience alias for results using the driver error type.
pub type K224Result<T> = std::result::Result<T, K224Error>;

/// Source parameters the driver commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Compliance voltage limit.
    Voltage,
    /// Source current.
    Current,
    /// Dwell time.
    Time,
    /// Full-scale range.
    Range,
    /// Output on/standby.
    Operate,
}

impl Parameter {
    /// Lowercase name used in messages and configuration keys.
    pub fn name(&self) -> &'static str {
        match self {
            Parameter::Voltage => "voltage",
            Parameter::Current => "current",
            Parameter::Time => "time",
            Parameter::Range => "range",
            Parameter::Operate => "operate",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive physical limits of a numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Lowest accepted value.
    pub min: f64,
    /// Highest accepted value.
    pub max: f64,
}

impl Bounds {
    /// Create inclusive bounds.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `true` when `value` lies within `[min, max]`. NaN is never contained.
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// A status-line field whose numeric part is not a float.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot parse field '{field}' of status line '{raw}': {source}")]
pub struct DecodeError {
    /// The comma-separated field that failed.
    pub field: String,
    /// The whole line as read from the instrument.
    pub raw: String,
    /// Underlying float parse failure.
    #[source]
    pub source: ParseFloatError,
}

/// Errors raised by the Keithley 224 driver.
#[derive(Error, Debug)]
pub enum K224Error {
    #[error("{parameter} value {value} outside limits {bounds}")]
    RangeViolation {
        /// Parameter that rejected the value.
        parameter: Parameter,
        /// Rejected value.
        value: f64,
        /// Accepted domain.
        bounds: Bounds,
    },

    #[error("{parameter} expects {expected}, got {found}")]
    TypeMismatch {
        /// Parameter that rejected the value.
        parameter: Parameter,
        /// Kind the parameter accepts.
        expected: &'static str,
        /// Description of what was supplied.
        found: String,
    },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),
}
