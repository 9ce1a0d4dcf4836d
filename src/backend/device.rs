//! Target devices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CostModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Gpu,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Gpu => "gpu",
        }
    }

    /// Whether this build can target the device at all
    ///
    /// GPU support is a compile-time property (`rocm` feature).
    pub fn compiled_in(&self) -> bool {
        match self {
            Device::Cpu => true,
            Device::Gpu => cfg!(feature = "rocm"),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = CostModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "gpu" | "cuda" | "rocm" => Ok(Device::Gpu),
            other => Err(CostModelError::DeviceUnavailable(format!(
                "unknown device '{}'",
                other
            ))),
        }
    }
}
