//! Layered driver configuration using Figment
//!
//! Configuration is loaded from, in increasing priority:
//! 1. built-in defaults
//! 2. a TOML file (`keithley224.toml` unless another path is given)
//! 3. environment variables prefixed with `K224_`, nested keys separated by `__`
//!
//! ```toml
//! [instrument]
//! resource = "GPIB0::0::INSTR"
//! apply_on_connect = false
//!
//! [source]
//! voltage = 3.0
//! current = 1e-6
//! time = 0.05
//! range = "auto"   # auto | 20uA | 200uA | 2mA | 20mA | 1.01A
//! operate = false
//! ```
//!
//! ```text
//! K224_SOURCE__VOLTAGE=12.5
//! K224_INSTRUMENT__APPLY_ON_CONNECT=true
//! ```
//!
//! Loaded values are not validated here. They reach the instrument only through
//! the validating setters, see [`Keithley224::apply_settings`].
//!
//! [`Keithley224::apply_settings`]: crate::instrument::Keithley224::apply_settings

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::K224Result;
use crate::instrument::SourceState;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "keithley224.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "K224_";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Connection settings
    pub instrument: InstrumentConfig,
    /// Source parameters
    pub source: SourceState,
}

/// Connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Bus resource string, passed to whatever opens the transport
    pub resource: String,
    /// Push `[source]` to the instrument right after construction
    pub apply_on_connect: bool,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            resource: "GPIB0::0::INSTR".to_string(),
            apply_on_connect: false,
        }
    }
}

impl Settings {
    /// Provider stack for the given file.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load from [`DEFAULT_CONFIG_FILE`] and the environment.
    pub fn load() -> K224Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from `path` and the environment. A missing file yields defaults.
    pub fn load_from(path: impl AsRef<Path>) -> K224Result<Self> {
        Ok(Self::figment(path).extract()?)
    }
}
