//! Instrument drivers.

pub mod keithley_224;

pub use keithley_224::{
    Keithley224, ParameterValue, SourceState, CURRENT_LIMITS, MEASUREMENT_TIMEOUT_MS, TIME_LIMITS,
    VOLTAGE_LIMITS,
};
