//! Mock transport for testing
//!
//! This adapter stands in for a real instrument bus. It provides:
//! - A queue of scripted response lines returned by `read`
//! - Controllable failure injection
//! - Call logging for test verification
//!
//! Clones share state, so a test can keep one handle while the driver owns the
//! other and inspect what was written after the driver is gone.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Transport, TransportError};

#[derive(Default)]
struct MockState {
    responses: VecDeque<String>,
    written: Vec<String>,
    call_log: Vec<String>,
    fail_next: bool,
    closed: bool,
}

/// Scripted in-memory transport
///
/// # Example
///
/// ```
/// use keithley224::adapters::{MockAdapter, Transport};
///
/// let mut adapter = MockAdapter::new();
/// adapter.push_response("DCI+1.000E-3,V+1.500E1,W+1.000E-1");
/// adapter.write("F1X").unwrap();
/// assert_eq!(adapter.written(), vec!["F1X".to_string()]);
/// ```
#[derive(Clone, Default)]
pub struct MockAdapter {
    state: Arc<Mutex<MockState>>,
}

impl MockAdapter {
    /// Create a mock with no queued responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that answers the given lines in order
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let adapter = Self::new();
        adapter
            .state
            .lock()
            .responses
            .extend(responses.into_iter().map(Into::into));
        adapter
    }

    /// Queue a line for the next `read`
    pub fn push_response(&self, line: impl Into<String>) {
        self.state.lock().responses.push_back(line.into());
    }

    /// Make the next operation fail with an injected error
    pub fn inject_next_failure(&self) {
        self.state.lock().fail_next = true;
    }

    /// Commands successfully written, oldest first
    pub fn written(&self) -> Vec<String> {
        self.state.lock().written.clone()
    }

    /// Every call made, including failed ones
    pub fn call_log(&self) -> Vec<String> {
        self.state.lock().call_log.clone()
    }

    /// Forget written commands and logged calls
    pub fn clear_log(&self) {
        let mut state = self.state.lock();
        state.written.clear();
        state.call_log.clear();
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl MockState {
    fn check_failure(&mut self) -> Result<(), TransportError> {
        if std::mem::take(&mut self.fail_next) {
            return Err(TransportError::Other("Injected failure".to_string()));
        }
        if self.closed {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

impl Transport for MockAdapter {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.call_log.push(format!("write: {}", command));
        state.check_failure()?;
        state.written.push(command.to_string());
        Ok(())
    }

    fn read(&mut self, timeout_ms: u32) -> Result<String, TransportError> {
        let mut state = self.state.lock();
        state.call_log.push(format!("read: {}ms", timeout_ms));
        state.check_failure()?;
        state
            .responses
            .pop_front()
            .ok_or(TransportError::Timeout { timeout_ms })
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.call_log.push("close".to_string());
        state.check_failure()?;
        state.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_queued_responses_in_order() {
        let mut adapter = MockAdapter::with_responses(["first", "second"]);
        assert_eq!(adapter.read(1000).unwrap(), "first");
        assert_eq!(adapter.read(1000).unwrap(), "second");
        assert!(matches!(
            adapter.read(250),
            Err(TransportError::Timeout { timeout_ms: 250 })
        ));
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let mut adapter = MockAdapter::new();
        adapter.inject_next_failure();
        assert!(adapter.write("F1X").is_err());
        assert!(adapter.write("F0X").is_ok());
        assert_eq!(adapter.written(), vec!["F0X"]);
        assert_eq!(adapter.call_log(), vec!["write: F1X", "write: F0X"]);
    }

    #[test]
    fn test_clones_share_state() {
        let observer = MockAdapter::new();
        let mut owned = observer.clone();
        owned.write("R0X").unwrap();
        owned.close().unwrap();
        assert_eq!(observer.written(), vec!["R0X"]);
        assert!(observer.is_closed());
    }

    #[test]
    fn test_operations_after_close_fail() {
        let mut adapter = MockAdapter::new();
        adapter.close().unwrap();
        assert!(matches!(adapter.write("F0X"), Err(TransportError::Closed)));
    }

    #[test]
    fn test_clear_log() {
        let mut adapter = MockAdapter::new();
        adapter.write("V1.5E1X").unwrap();
        adapter.clear_log();
        assert!(adapter.written().is_empty());
        assert!(adapter.call_log().is_empty());
    }
}
