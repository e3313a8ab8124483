// Configuration module entry point
// Loads layered configuration and owns the runtime state built from it

mod state;
mod types;

use std::net::SocketAddr;

pub use state::{AppState, FaultState};
pub use types::{Config, CrashMode, LogLevel};

/// Legacy toggle variable honoured on top of the layered configuration
pub const LEGACY_TOGGLE_VAR: &str = "BUG";

impl Config {
    /// Load configuration from specified file path (extension optional)
    /// Missing files are fine; defaults and environment still apply
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let legacy = std::env::var(LEGACY_TOGGLE_VAR).ok();
        Self::layered(
            config::File::with_name(config_path).required(false),
            server_env(),
            legacy.as_deref(),
        )
    }

    /// Build configuration from an explicit file source, environment source and legacy toggle
    fn layered<S>(
        file: S,
        env: config::Environment,
        legacy_toggle: Option<&str>,
    ) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.api_host", "127.0.0.1")?
            .set_default("server.api_port", 8000)?
            .set_default("server.api_enabled", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.connection_timeout", 30)?
            .set_default("performance.shutdown_grace", 10)?
            .set_default("faults.enabled", false)?
            .set_default("faults.crash_mode", "panic")?
            .add_source(file)
            .add_source(env);

        if let Some(raw) = legacy_toggle.filter(|v| !v.trim().is_empty()) {
            let enabled = parse_toggle(raw).ok_or_else(|| {
                config::ConfigError::Message(format!(
                    "{LEGACY_TOGGLE_VAR}={raw:?} is not a boolean (expected 1/0, true/false, yes/no, on/off)"
                ))
            })?;
            builder = builder.set_override("faults.enabled", enabled)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        if cfg.server.workers == Some(0) {
            return Err(config::ConfigError::Message(
                "server.workers must be at least 1".to_string(),
            ));
        }
        Ok(cfg)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    pub fn get_api_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.api_host, self.server.api_port)
            .parse()
            .map_err(|e| format!("Invalid API address: {e}"))
    }
}

/// `SERVER_*` variables, `__` separates nested keys (`SERVER_FAULTS__ENABLED=1`)
fn server_env() -> config::Environment {
    config::Environment::with_prefix("SERVER")
        .prefix_separator("_")
        .separator("__")
}

/// Parse a boolean-like toggle value
pub fn parse_toggle(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Defaults only, with the fault settings given and access logging off
#[cfg(test)]
pub fn test_config(faults_enabled: bool, crash_mode: CrashMode) -> Config {
    let mut cfg = Config::layered(
        config::File::from_str("", config::FileFormat::Toml),
        server_env().source(Some(config::Map::new())),
        None,
    )
    .expect("defaults must deserialize");
    cfg.faults.enabled = faults_enabled;
    cfg.faults.crash_mode = crash_mode;
    cfg.logging.access_log = false;
    cfg
}
