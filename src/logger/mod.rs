//! Logger module
//!
//! Provides logging utilities for the service including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error, warning and fault-injection logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::{Config, CrashMode, LogLevel};
use chrono::Local;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.level,
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Levels above the configured one are dropped; `info` before `init()`
fn enabled(level: LogLevel) -> bool {
    level <= writer::get().map_or(LogLevel::Info, writer::LogWriter::level)
}

fn stamp(level: LogLevel, message: &str) -> String {
    format!(
        "{} [{}] {message}",
        Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"),
        level.to_string().to_uppercase()
    )
}

fn write_info(level: LogLevel, message: &str) {
    if !enabled(level) {
        return;
    }
    let line = stamp(level, message);
    match writer::get() {
        Some(w) => w.write_access(&line),
        None => println!("{line}"),
    }
}

fn write_error(level: LogLevel, message: &str) {
    if !enabled(level) {
        return;
    }
    let line = stamp(level, message);
    match writer::get() {
        Some(w) => w.write_error(&line),
        None => eprintln!("{line}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, api_addr: Option<&SocketAddr>, config: &Config) {
    write_info(LogLevel::Info, &format!("faulty-app listening on http://{addr}"));
    match api_addr {
        Some(api) => write_info(LogLevel::Info, &format!("Management API on http://{api}/v1/faults")),
        None => write_info(LogLevel::Info, "Management API disabled"),
    }
    write_info(LogLevel::Info, &format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(LogLevel::Info, &format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(LogLevel::Info, &format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(LogLevel::Info, &format!("Error log: {path}"));
    }
    if config.faults.enabled {
        log_warning(&format!(
            "Fault injection ENABLED at startup (crash mode: {})",
            config.faults.crash_mode
        ));
    }
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(LogLevel::Debug, &format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(LogLevel::Error, &format!("Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(LogLevel::Error, message);
}

pub fn log_api_error(message: &str) {
    write_error(LogLevel::Error, &format!("[API] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(LogLevel::Warn, message);
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match writer::get() {
        Some(w) => w.write_access(&line),
        None => println!("{line}"),
    }
}

pub fn log_api_request(method: &str, path: &str, status: u16) {
    write_info(LogLevel::Info, &format!("[API] {method} {path} - {status}"));
}

pub fn log_fault_toggled(previous: bool, current: bool) {
    log_warning(&format!("[API] Fault injection toggled: {previous} -> {current}"));
}

/// Written before the fault fires so the cause survives an abort
pub fn log_fault_injected(path: &str, mode: CrashMode) {
    write_error(
        LogLevel::Error,
        &format!("[FAULT] Injecting fault on {path} (crash mode: {mode})"),
    );
}

pub fn log_shutdown(reason: &str) {
    write_info(LogLevel::Info, &format!("[Shutdown] {reason}"));
}
