//! Status line decoding
//!
//! The 224 answers a read with one comma-separated line such as
//! `NDCI+1.234E-3,V+1.500E1,W+1.000E-1`. Fields are classified by substring,
//! each rule independently of the others, so order does not matter and unknown
//! fields are skipped:
//!
//! - contains `DCI`: current, parsed from byte offset 4. A leading `O` flags
//!   over-compliance.
//! - contains `V`: voltage, parsed from byte offset 1.
//! - contains `W`: dwell time, parsed from byte offset 1.
//!
//! The `V`/`W` checks match the letter anywhere in the field. A field that
//! happens to contain either letter is treated as that reading and fails to
//! decode if its tail is not a number. This mirrors the instrument's documented
//! grammar as far as it is known and must not be tightened without checking
//! against real hardware.

use std::num::ParseFloatError;

use serde::Serialize;

use crate::error::DecodeError;

const CURRENT_TAG: &str = "DCI";
const VOLTAGE_TAG: char = 'V';
const TIME_TAG: char = 'W';
const OVER_COMPLIANCE_MARKER: char = 'O';

const CURRENT_OFFSET: usize = 4;
const PREFIXED_OFFSET: usize = 1;

/// One decoded measurement.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Reading {
    /// Source current in amps.
    pub current: f64,
    /// Compliance voltage in volts.
    pub voltage: f64,
    /// Dwell time in seconds.
    pub elapsed_time: f64,
    /// The instrument could not hold the programmed current within the voltage limit.
    pub over_compliance: bool,
    /// The line exactly as read.
    pub raw: String,
}

fn parse_from(field: &str, offset: usize) -> Result<f64, ParseFloatError> {
    // Short fields and non-ASCII boundaries yield "", which fails to parse.
    field.get(offset..).unwrap_or("").trim().parse::<f64>()
}

/// Decode a status line into a [`Reading`].
///
/// Fields that are absent leave their value at zero. The first field whose
/// numeric tail does not parse aborts decoding; no partial reading is returned.
pub fn decode_reading(raw: &str) -> Result<Reading, DecodeError> {
    let mut reading = Reading {
        raw: raw.to_string(),
        ..Reading::default()
    };

    let fail = |field: &str, source: ParseFloatError| DecodeError {
        field: field.to_string(),
        raw: raw.to_string(),
        source,
    };

    for field in raw.split(',') {
        if field.contains(CURRENT_TAG) {
            if field.starts_with(OVER_COMPLIANCE_MARKER) {
                reading.over_compliance = true;
            }
            reading.current = parse_from(field, CURRENT_OFFSET).map_err(|e| fail(field, e))?;
        }
        if field.contains(VOLTAGE_TAG) {
            reading.voltage = parse_from(field, PREFIXED_OFFSET).map_err(|e| fail(field, e))?;
        }
        if field.contains(TIME_TAG) {
            reading.elapsed_time =
                parse_from(field, PREFIXED_OFFSET).map_err(|e| fail(field, e))?;
        }
    }

    Ok(reading)
}
