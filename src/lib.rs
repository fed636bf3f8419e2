//! Driver library for the Keithley 224 programmable current source.
//!
//! The crate turns typed, bounded source parameters into the 224's
//! device-dependent command strings and decodes its status line into
//! [`Reading`]s. It does not open a bus: the caller supplies a [`Transport`]
//! (VISA, GPIB bridge, or the bundled [`MockAdapter`]).
//!
//! ```
//! use keithley224::{Keithley224, MockAdapter, Range};
//!
//! # fn main() -> keithley224::K224Result<()> {
//! let bus = MockAdapter::with_responses(["NDCI+1.000E-3,V+1.500E1,W+1.000E-1"]);
//! let mut source = Keithley224::new(bus.clone());
//! source.set_range(Range::Manual2mA)?;
//! source.set_voltage(15.0)?;
//! source.set_current(0.001)?;
//! source.set_operate(true)?;
//!
//! let reading = source.get_measurement()?;
//! assert!(!reading.over_compliance);
//!
//! source.close()?;
//! assert_eq!(bus.written().last().map(String::as_str), Some("F0X"));
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod instrument;
pub mod protocol;

pub use adapters::{MockAdapter, Transport, TransportError};
pub use config::Settings;
pub use error::{Bounds, DecodeError, K224Error, K224Result, Parameter};
pub use instrument::{Keithley224, ParameterValue, SourceState};
pub use protocol::{Range, Reading};
