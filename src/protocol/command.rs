//! Command encoding for the Keithley 224 device-dependent command set
//!
//! Every command is a single letter, an argument and the `X` execute
//! terminator, e.g. `V1.5E1X` or `R7X`. Numeric arguments use a compact
//! scientific notation: six-digit mantissa with trailing zeros and a trailing
//! decimal point removed, exponent without padding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{K224Error, Parameter};

/// Full-scale source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Range {
    /// Autorange.
    #[default]
    #[serde(rename = "auto", alias = "AUTO")]
    Auto,
    /// 20 µA full scale.
    #[serde(rename = "20uA", alias = "MAN_20uA")]
    Manual20uA,
    /// 200 µA full scale.
    #[serde(rename = "200uA", alias = "MAN_200uA")]
    Manual200uA,
    /// 2 mA full scale.
    #[serde(rename = "2mA", alias = "MAN_2mA")]
    Manual2mA,
    /// 20 mA full scale.
    #[serde(rename = "20mA", alias = "MAN_20mA")]
    Manual20mA,
    /// 1.01 A full scale.
    #[serde(rename = "1.01A", alias = "MAN_1.01A", alias = "MAN_1m01A")]
    Manual1_01A,
}

impl Range {
    /// All ranges in front-panel order. The position is the value accepted by
    /// `TryFrom<u8>`.
    pub const ALL: [Range; 6] = [
        Range::Auto,
        Range::Manual20uA,
        Range::Manual200uA,
        Range::Manual2mA,
        Range::Manual20mA,
        Range::Manual1_01A,
    ];

    /// Command token, without the execute terminator. R1..R4 are unused by the 224.
    pub fn token(&self) -> &'static str {
        match self {
            Range::Auto => "R0",
            Range::Manual20uA => "R5",
            Range::Manual200uA => "R6",
            Range::Manual2mA => "R7",
            Range::Manual20mA => "R8",
            Range::Manual1_01A => "R9",
        }
    }

    /// Full-scale current in amps, `None` for autorange.
    pub fn full_scale_amps(&self) -> Option<f64> {
        match self {
            Range::Auto => None,
            Range::Manual20uA => Some(20e-6),
            Range::Manual200uA => Some(200e-6),
            Range::Manual2mA => Some(2e-3),
            Range::Manual20mA => Some(20e-3),
            Range::Manual1_01A => Some(1.01),
        }
    }

    /// Configuration spelling, e.g. `"2mA"`.
    pub fn name(&self) -> &'static str {
        match self {
            Range::Auto => "auto",
            Range::Manual20uA => "20uA",
            Range::Manual200uA => "200uA",
            Range::Manual2mA => "2mA",
            Range::Manual20mA => "20mA",
            Range::Manual1_01A => "1.01A",
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn range_mismatch(found: String) -> K224Error {
    K224Error::TypeMismatch {
        parameter: Parameter::Range,
        expected: "one of auto, 20uA, 200uA, 2mA, 20mA, 1.01A",
        found,
    }
}

impl FromStr for Range {
    type Err = K224Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let name = trimmed.strip_prefix("MAN_").unwrap_or(trimmed);
        match name {
            "auto" | "AUTO" => Ok(Range::Auto),
            "20uA" => Ok(Range::Manual20uA),
            "200uA" => Ok(Range::Manual200uA),
            "2mA" => Ok(Range::Manual2mA),
            "20mA" => Ok(Range::Manual20mA),
            "1.01A" | "1m01A" => Ok(Range::Manual1_01A),
            _ => Err(range_mismatch(format!("'{}'", s))),
        }
    }
}

impl TryFrom<u8> for Range {
    type Error = K224Error;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Range::ALL
            .get(usize::from(index))
            .copied()
            .ok_or_else(|| range_mismatch(format!("index {}", index)))
    }
}

/// Compact scientific notation understood by the 224.
///
/// Formats like C's `%E` (six mantissa digits), then strips trailing `0`s and
/// a trailing `.` from the mantissa only. The exponent is emitted without sign
/// padding or leading zeros: `1e-6` becomes `"1E-6"`, `15.0` becomes `"1.5E1"`.
pub fn format_scientific(value: f64) -> String {
    let formatted = format!("{:.6E}", value);
    match formatted.split_once('E') {
        Some((mantissa, exponent)) => {
            let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
            format!("{}E{}", mantissa, exponent)
        }
        None => formatted,
    }
}

/// `V<sci>X`
pub fn encode_voltage(volts: f64) -> String {
    format!("V{}X", format_scientific(volts))
}

/// `I<sci>X`
pub fn encode_current(amps: f64) -> String {
    format!("I{}X", format_scientific(amps))
}

/// `W<sci>X`
pub fn encode_time(seconds: f64) -> String {
    format!("W{}X", format_scientific(seconds))
}

/// `R<n>X`
pub fn encode_range(range: Range) -> String {
    format!("{}X", range.token())
}

/// `F1X` to operate, `F0X` for standby.
pub fn encode_operate(on: bool) -> String {
    if on { "F1X" } else { "F0X" }.to_string()
}
