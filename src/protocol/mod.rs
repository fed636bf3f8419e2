//! Keithley 224 wire protocol: pure command encoding and status decoding.

pub mod command;
pub mod response;

pub use command::{
    encode_current, encode_operate, encode_range, encode_time, encode_voltage, format_scientific,
    Range,
};
pub use response::{decode_reading, Reading};
