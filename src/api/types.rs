// API type definitions

use serde::{Deserialize, Serialize};

use crate::config::{CrashMode, FaultState};

/// Current fault injection state
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaultStatus {
    pub enabled: bool,
    pub crash_mode: CrashMode,
}

impl From<&FaultState> for FaultStatus {
    fn from(faults: &FaultState) -> Self {
        Self {
            enabled: faults.is_enabled(),
            crash_mode: faults.crash_mode(),
        }
    }
}

/// Body accepted by `PUT /v1/faults`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaultUpdate {
    pub enabled: bool,
}
