// Application state module
// Runtime state built once from configuration and shared by all connections

use std::sync::atomic::{AtomicBool, Ordering};

use super::types::{Config, CrashMode};

/// Application state
pub struct AppState {
    pub config: Config,
    pub faults: FaultState,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            faults: FaultState::new(config.faults.enabled, config.faults.crash_mode),
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}

/// Fault toggle injected into the handlers.
///
/// Seeded from configuration at startup; only the management API flips it afterwards.
#[derive(Debug)]
pub struct FaultState {
    enabled: AtomicBool,
    crash_mode: CrashMode,
}

impl FaultState {
    pub const fn new(enabled: bool, crash_mode: CrashMode) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            crash_mode,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Set the toggle, returning the previous value
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::SeqCst)
    }

    pub const fn crash_mode(&self) -> CrashMode {
        self.crash_mode
    }
}
