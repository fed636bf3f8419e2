//! Instrument transport abstraction
//!
//! The driver never opens a bus itself. It is handed something that implements
//! [`Transport`]: a VISA session, a GPIB-over-serial bridge, or the
//! [`MockAdapter`] used throughout the tests. The capability is deliberately
//! narrow: write one command, read one line with a timeout, close.

pub mod mock_adapter;

pub use mock_adapter::MockAdapter;

use thiserror::Error;

/// Failure reported by a transport. Opaque to the driver, which only passes it on.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("read timed out after {timeout_ms} ms")]
    Timeout {
        /// Timeout that elapsed.
        timeout_ms: u32,
    },

    #[error("transport is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Blocking byte-stream connection to a single instrument.
///
/// Implementations are used from one thread at a time; the driver holds the
/// only handle and serializes every call.
pub trait Transport {
    /// Send one command string. The implementation adds any bus terminator.
    fn write(&mut self, command: &str) -> Result<(), TransportError>;

    /// Read one response line, waiting at most `timeout_ms`.
    fn read(&mut self, timeout_ms: u32) -> Result<String, TransportError>;

    /// Release the connection. Called exactly once by the driver.
    fn close(&mut self) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        (**self).write(command)
    }

    fn read(&mut self, timeout_ms: u32) -> Result<String, TransportError> {
        (**self).read(timeout_ms)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }
}
