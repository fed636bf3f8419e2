//! Keithley 224 Programmable Current Source driver
//!
//! [`Keithley224`] owns the transport for the whole session and remembers the
//! last value committed for each source parameter. Every setter follows the
//! same sequence:
//!
//! 1. validate against the instrument's physical limits
//! 2. encode the device-dependent command
//! 3. write it to the transport
//! 4. commit the new value
//!
//! A value that fails step 1 or a write that fails step 3 leaves the committed
//! state untouched. After a transport error the instrument may or may not have
//! executed the command; this layer cannot tell.
//!
//! Construction never talks to the instrument. The defaults below describe a
//! freshly powered 224 in standby; call [`Keithley224::sync`] or
//! [`Keithley224::apply_settings`] to push values explicitly.
//!
//! Releasing the driver, through [`Keithley224::close`] or by dropping it,
//! always sends `F0X` before the transport is closed so the output is left in
//! standby.
//!
//! ## Configuration
//!
//! ```toml
//! [instrument]
//! resource = "GPIB0::0::INSTR"
//! apply_on_connect = true
//!
//! [source]
//! voltage = 15.0
//! current = 1e-3
//! time = 0.1
//! range = "2mA"
//! operate = false
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapters::{Transport, TransportError};
use crate::config::Settings;
use crate::error::{Bounds, K224Error, K224Result, Parameter};
use crate::protocol::{
    decode_reading, encode_current, encode_operate, encode_range, encode_time, encode_voltage,
    Range, Reading,
};

/// Compliance voltage limits in volts.
pub const VOLTAGE_LIMITS: Bounds = Bounds::new(1.0, 105.0);
/// Source current limits in amps.
pub const CURRENT_LIMITS: Bounds = Bounds::new(-0.101, 0.101);
/// Dwell time limits in seconds.
pub const TIME_LIMITS: Bounds = Bounds::new(0.05, 0.9999);

/// Read timeout used for every measurement.
pub const MEASUREMENT_TIMEOUT_MS: u32 = 1000;

/// The five source parameters, as last committed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceState {
    /// Full-scale range
    pub range: Range,
    /// Compliance voltage in volts
    pub voltage: f64,
    /// Source current in amps
    pub current: f64,
    /// Dwell time in seconds
    pub time: f64,
    /// Output enabled
    pub operate: bool,
}

impl Default for SourceState {
    fn default() -> Self {
        Self {
            range: Range::Auto,
            voltage: 3.0,
            current: 1e-6,
            time: 0.05,
            operate: false,
        }
    }
}

/// A parameter value of dynamic kind, as produced by configuration or
/// scripting front ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue {
    /// Voltage, current or time.
    Number(f64),
    /// Operate state.
    Flag(bool),
    /// Range selection.
    Range(Range),
}

impl ParameterValue {
    fn describe(&self) -> String {
        match self {
            ParameterValue::Number(value) => format!("number {}", value),
            ParameterValue::Flag(on) => format!("flag {}", on),
            ParameterValue::Range(range) => format!("range {}", range),
        }
    }
}

fn expected_kind(parameter: Parameter) -> &'static str {
    match parameter {
        Parameter::Voltage | Parameter::Current | Parameter::Time => "a number",
        Parameter::Range => "a range",
        Parameter::Operate => "a flag",
    }
}

fn check_limits(parameter: Parameter, value: f64, bounds: Bounds) -> K224Result<()> {
    if bounds.contains(value) {
        Ok(())
    } else {
        debug!(%parameter, value, "rejected out-of-limits value");
        Err(K224Error::RangeViolation {
            parameter,
            value,
            bounds,
        })
    }
}

/// Keithley 224 session bound to one transport.
pub struct Keithley224<T: Transport> {
    /// `None` once the safety shutdown has run.
    transport: Option<T>,
    state: SourceState,
}

impl<T: Transport> Keithley224<T> {
    /// Bind to `transport` with default state. Nothing is written.
    pub fn new(transport: T) -> Self {
        info!("Keithley 224 session opened");
        Self {
            transport: Some(transport),
            state: SourceState::default(),
        }
    }

    /// Bind to `transport`, pushing `settings.source` when
    /// `settings.instrument.apply_on_connect` is set.
    ///
    /// If pushing fails the session is released, including the safety
    /// shutdown, and the error is returned.
    pub fn from_settings(transport: T, settings: &Settings) -> K224Result<Self> {
        let mut device = Self::new(transport);
        if settings.instrument.apply_on_connect {
            device.apply_settings(&settings.source)?;
        }
        Ok(device)
    }

    fn transport(&mut self) -> Result<&mut T, TransportError> {
        self.transport.as_mut().ok_or(TransportError::Closed)
    }

    fn send(&mut self, command: &str) -> K224Result<()> {
        self.transport()?.write(command)?;
        debug!(command, "Keithley 224 command sent");
        Ok(())
    }

    /// Set the compliance voltage, 1 V to 105 V.
    pub fn set_voltage(&mut self, volts: f64) -> K224Result<()> {
        check_limits(Parameter::Voltage, volts, VOLTAGE_LIMITS)?;
        self.send(&encode_voltage(volts))?;
        self.state.voltage = volts;
        Ok(())
    }

    /// Set the source current, -101 mA to +101 mA.
    pub fn set_current(&mut self, amps: f64) -> K224Result<()> {
        check_limits(Parameter::Current, amps, CURRENT_LIMITS)?;
        self.send(&encode_current(amps))?;
        self.state.current = amps;
        Ok(())
    }

    /// Set the dwell time, 50 ms to 999.9 ms.
    pub fn set_time(&mut self, seconds: f64) -> K224Result<()> {
        check_limits(Parameter::Time, seconds, TIME_LIMITS)?;
        self.send(&encode_time(seconds))?;
        self.state.time = seconds;
        Ok(())
    }

    pub fn set_range(&mut self, range: Range) -> K224Result<()> {
        self.send(&encode_range(range))?;
        self.state.range = range;
        Ok(())
    }

    /// Switch the output between operate (`true`) and standby.
    pub fn set_operate(&mut self, on: bool) -> K224Result<()> {
        self.send(&encode_operate(on))?;
        self.state.operate = on;
        Ok(())
    }

    /// Set any parameter from a dynamically typed value.
    ///
    /// A value of the wrong kind fails with [`K224Error::TypeMismatch`] and
    /// writes nothing.
    pub fn set_parameter(&mut self, parameter: Parameter, value: ParameterValue) -> K224Result<()> {
        match (parameter, value) {
            (Parameter::Voltage, ParameterValue::Number(volts)) => self.set_voltage(volts),
            (Parameter::Current, ParameterValue::Number(amps)) => self.set_current(amps),
            (Parameter::Time, ParameterValue::Number(seconds)) => self.set_time(seconds),
            (Parameter::Range, ParameterValue::Range(range)) => self.set_range(range),
            (Parameter::Operate, ParameterValue::Flag(on)) => self.set_operate(on),
            (parameter, value) => Err(K224Error::TypeMismatch {
                parameter,
                expected: expected_kind(parameter),
                found: value.describe(),
            }),
        }
    }

    /// Push every parameter of `source`: range, voltage, current, time and
    /// finally operate, so the output is configured before it is enabled.
    ///
    /// Stops at the first failure. Parameters written before it stay committed.
    pub fn apply_settings(&mut self, source: &SourceState) -> K224Result<()> {
        self.set_range(source.range)?;
        self.set_voltage(source.voltage)?;
        self.set_current(source.current)?;
        self.set_time(source.time)?;
        self.set_operate(source.operate)
    }

    /// Push the current state to the instrument.
    pub fn sync(&mut self) -> K224Result<()> {
        let state = self.state;
        self.apply_settings(&state)
    }

    /// Read and decode one status line.
    pub fn get_measurement(&mut self) -> K224Result<Reading> {
        let raw = self.transport()?.read(MEASUREMENT_TIMEOUT_MS)?;
        debug!(raw = %raw.trim_end(), "Keithley 224 status read");
        Ok(decode_reading(&raw)?)
    }

    pub fn range(&self) -> Range {
        self.state.range
    }

    pub fn voltage(&self) -> f64 {
        self.state.voltage
    }

    pub fn current(&self) -> f64 {
        self.state.current
    }

    pub fn time(&self) -> f64 {
        self.state.time
    }

    pub fn operate(&self) -> bool {
        self.state.operate
    }

    /// Copy of all committed parameters.
    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Put the output in standby and close the transport.
    ///
    /// Unlike dropping, this reports a failed shutdown to the caller. The
    /// transport is closed even when the standby command fails.
    pub fn close(mut self) -> K224Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> K224Result<()> {
        let Some(mut transport) = self.transport.take() else {
            return Ok(());
        };

        let standby = transport.write(&encode_operate(false));
        if standby.is_ok() {
            self.state.operate = false;
            debug!("Keithley 224 output set to standby");
        }
        let closed = transport.close();
        info!("Keithley 224 session closed");

        standby?;
        closed?;
        Ok(())
    }
}

impl<T: Transport> Drop for Keithley224<T> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Keithley 224 safety shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;
    use tracing_test::traced_test;

    fn device() -> (Keithley224<MockAdapter>, MockAdapter) {
        let adapter = MockAdapter::new();
        (Keithley224::new(adapter.clone()), adapter)
    }

    #[test]
    fn test_construction_writes_nothing() {
        let (device, adapter) = device();
        assert_eq!(device.state(), SourceState::default());
        assert_eq!(device.voltage(), 3.0);
        assert_eq!(device.current(), 1e-6);
        assert_eq!(device.time(), 0.05);
        assert_eq!(device.range(), Range::Auto);
        assert!(!device.operate());
        assert!(adapter.call_log().is_empty());
    }

    #[test]
    fn test_voltage_accepted_across_domain() {
        let (mut device, adapter) = device();
        for volts in [1.0, 1.5, 15.0, 50.25, 104.9, 105.0] {
            device.set_voltage(volts).unwrap();
            assert_eq!(device.voltage(), volts);
        }
        assert_eq!(adapter.written().first().map(String::as_str), Some("V1E0X"));
        assert_eq!(adapter.written().last().map(String::as_str), Some("V1.05E2X"));
    }

    #[test]
    fn test_voltage_rejected_outside_domain() {
        let (mut device, adapter) = device();
        device.set_voltage(15.0).unwrap();
        for volts in [0.0, 0.999, 105.0001, -5.0, f64::NAN, f64::INFINITY] {
            match device.set_voltage(volts) {
                Err(K224Error::RangeViolation {
                    parameter, bounds, ..
                }) => {
                    assert_eq!(parameter, Parameter::Voltage);
                    assert_eq!(bounds, VOLTAGE_LIMITS);
                }
                other => panic!("expected a range violation, got {:?}", other),
            }
            assert_eq!(device.voltage(), 15.0);
        }
        assert_eq!(adapter.written(), vec!["V1.5E1X"]);
    }

    #[test]
    fn test_current_domain() {
        let (mut device, adapter) = device();
        for amps in [-0.101, -0.001, 0.0, 1e-6, 0.015, 0.101] {
            device.set_current(amps).unwrap();
            assert_eq!(device.current(), amps);
        }
        for amps in [-0.1011, 0.102, 1.0] {
            assert!(device.set_current(amps).is_err());
            assert_eq!(device.current(), 0.101);
        }
        assert_eq!(adapter.written().len(), 6);
        assert_eq!(adapter.written()[0], "I-1.01E-1X");
    }

    #[test]
    fn test_time_domain() {
        let (mut device, adapter) = device();
        for seconds in [0.05, 0.1, 0.5, 0.9999] {
            device.set_time(seconds).unwrap();
            assert_eq!(device.time(), seconds);
        }
        for seconds in [0.0, 0.049, 1.0] {
            assert!(matches!(
                device.set_time(seconds),
                Err(K224Error::RangeViolation {
                    parameter: Parameter::Time,
                    ..
                })
            ));
            assert_eq!(device.time(), 0.9999);
        }
        assert_eq!(adapter.written()[1], "W1E-1X");
    }

    #[test]
    fn test_range_and_operate_commands() {
        let (mut device, adapter) = device();
        device.set_range(Range::Manual2mA).unwrap();
        device.set_operate(true).unwrap();
        assert_eq!(device.range(), Range::Manual2mA);
        assert!(device.operate());
        assert_eq!(adapter.written(), vec!["R7X", "F1X"]);
    }

    #[test]
    fn test_failed_write_keeps_state() {
        let (mut device, adapter) = device();
        adapter.inject_next_failure();
        assert!(matches!(
            device.set_voltage(20.0),
            Err(K224Error::Transport(_))
        ));
        assert_eq!(device.voltage(), 3.0);

        adapter.inject_next_failure();
        assert!(device.set_operate(true).is_err());
        assert!(!device.operate());
        assert!(adapter.written().is_empty());
    }

    #[test]
    fn test_set_parameter_dispatches_and_checks_kind() {
        let (mut device, adapter) = device();
        device
            .set_parameter(Parameter::Voltage, ParameterValue::Number(15.0))
            .unwrap();
        device
            .set_parameter(Parameter::Range, ParameterValue::Range(Range::Manual20mA))
            .unwrap();

        let err = device
            .set_parameter(Parameter::Operate, ParameterValue::Number(1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            K224Error::TypeMismatch {
                parameter: Parameter::Operate,
                expected: "a flag",
                ..
            }
        ));
        assert!(device
            .set_parameter(Parameter::Current, ParameterValue::Flag(true))
            .is_err());
        assert!(!device.operate());
        assert_eq!(adapter.written(), vec!["V1.5E1X", "R8X"]);
    }

    #[test]
    fn test_sync_pushes_defaults_in_order() {
        let (mut device, adapter) = device();
        device.sync().unwrap();
        assert_eq!(
            adapter.written(),
            vec!["R0X", "V3E0X", "I1E-6X", "W5E-2X", "F0X"]
        );
    }

    #[test]
    fn test_apply_settings_stops_at_first_violation() {
        let (mut device, adapter) = device();
        let source = SourceState {
            range: Range::Manual20uA,
            voltage: 10.0,
            current: 0.5,
            time: 0.1,
            operate: true,
        };
        assert!(device.apply_settings(&source).is_err());
        assert_eq!(device.range(), Range::Manual20uA);
        assert_eq!(device.voltage(), 10.0);
        assert_eq!(device.current(), 1e-6);
        assert!(!device.operate());
        assert_eq!(adapter.written(), vec!["R5X", "V1E1X"]);
    }

    #[test]
    fn test_get_measurement_uses_fixed_timeout() {
        let (mut device, adapter) = device();
        adapter.push_response("NDCI+1.234E-3,V+1.500E1,W+1.000E-1");
        let reading = device.get_measurement().unwrap();
        assert_eq!(reading.current, 0.001234);
        assert_eq!(reading.voltage, 15.0);
        assert_eq!(adapter.call_log(), vec!["read: 1000ms"]);
    }

    #[test]
    fn test_get_measurement_propagates_errors() {
        let (mut device, adapter) = device();
        assert!(matches!(
            device.get_measurement(),
            Err(K224Error::Transport(TransportError::Timeout { timeout_ms: 1000 }))
        ));
        adapter.push_response("NDCI+bad");
        assert!(matches!(device.get_measurement(), Err(K224Error::Decode(_))));
    }

    #[test]
    fn test_drop_forces_standby_then_closes() {
        let (mut device, adapter) = device();
        device.set_operate(true).unwrap();
        drop(device);
        assert_eq!(adapter.call_log(), vec!["write: F1X", "write: F0X", "close"]);
        assert!(adapter.is_closed());
    }

    #[test]
    fn test_close_reports_shutdown_failure_and_still_closes() {
        let (device, adapter) = device();
        adapter.inject_next_failure();
        assert!(matches!(device.close(), Err(K224Error::Transport(_))));
        assert!(adapter.is_closed());
        assert_eq!(adapter.call_log(), vec!["write: F0X", "close"]);
    }

    #[test]
    #[traced_test]
    fn test_drop_logs_failed_shutdown() {
        let (device, adapter) = device();
        adapter.inject_next_failure();
        drop(device);
        assert!(adapter.is_closed());
        assert!(logs_contain("safety shutdown failed"));
    }

    #[test]
    fn test_from_settings_applies_when_requested() {
        let mut settings = Settings::default();
        let adapter = MockAdapter::new();
        let device = Keithley224::from_settings(adapter.clone(), &settings).unwrap();
        assert!(adapter.written().is_empty());
        drop(device);

        let adapter = MockAdapter::new();
        settings.instrument.apply_on_connect = true;
        settings.source.voltage = 15.0;
        let device = Keithley224::from_settings(adapter.clone(), &settings).unwrap();
        assert_eq!(device.voltage(), 15.0);
        assert_eq!(adapter.written()[1], "V1.5E1X");
    }

    #[test]
    fn test_from_settings_failure_still_shuts_down() {
        let mut settings = Settings::default();
        settings.instrument.apply_on_connect = true;
        settings.source.time = 2.0;
        let adapter = MockAdapter::new();
        assert!(Keithley224::from_settings(adapter.clone(), &settings).is_err());
        assert_eq!(adapter.written().last().map(String::as_str), Some("F0X"));
        assert!(adapter.is_closed());
    }
}
