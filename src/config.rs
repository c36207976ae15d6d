//! Configuration for the management system.
//!
//! The registry carries a single config-time switch: whether the
//! facility is enabled at all. The flag is resolved when the registry
//! is constructed and cannot be flipped afterwards; a disabled registry
//! makes every operation fail safe rather than erroring the caller.

use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::error::{CoreResult, Error};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Whether the management system may be used at all. When `false`,
    /// adds and removes report `false`, lookups report empty, and a
    /// diagnostic is logged.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl RegistryConfig {
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        from_file(path)
    }

    pub fn from_json(json: &str) -> CoreResult<Self> {
        from_str(json)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> CoreResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::Internal(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::Internal(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> CoreResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::Internal(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_true() -> bool {
    true
}
