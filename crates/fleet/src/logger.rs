//! Unified logging setup for the fleet binary.
//!
//! Adapted from `smartscope-core::logger`'s layered
//! `tracing-subscriber`/`tracing-appender` setup (console layer + daily
//! rolling file layer, optional JSON). Drops the C FFI / QML log-forwarding
//! entry points — this workspace has no embedding language boundary.

use std::fs;
use std::sync::Once;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{format::FmtSpan, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

static LOGGER_INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub log_dir: String,
    pub console_output: bool,
    pub file_output: bool,
    pub json_format: bool,
    pub rotation: LogRotation,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_dir: "logs".to_string(),
            console_output: true,
            file_output: true,
            json_format: false,
            rotation: LogRotation::Daily,
        }
    }
}

fn file_appender(config: &LoggerConfig) -> tracing_appender::rolling::RollingFileAppender {
    match config.rotation {
        LogRotation::Daily => rolling::daily(&config.log_dir, "camera-fleet.log"),
        LogRotation::Hourly => rolling::hourly(&config.log_dir, "camera-fleet.log"),
        LogRotation::Never => rolling::never(&config.log_dir, "camera-fleet.log"),
    }
}

/// Initializes the global `tracing` subscriber exactly once. Safe to call
/// from multiple places (tests, `main`); only the first call takes effect.
pub fn init_logging(config: LoggerConfig) -> crate::Result<()> {
    let mut result = Ok(());
    LOGGER_INIT.call_once(|| {
        result = setup_logging(&config);
    });
    result
}

fn setup_logging(config: &LoggerConfig) -> crate::Result<()> {
    if config.file_output {
        fs::create_dir_all(&config.log_dir)?;
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("camera_fleet={}", config.level.as_str())));

    let registry = Registry::default().with(env_filter);

    let console_layer = config.console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(LocalTime::rfc_3339())
    });

    if config.file_output {
        let (file_writer, guard) = non_blocking(file_appender(config));
        // Leaked deliberately: the writer guard must outlive the process,
        // matching `tracing_appender`'s documented non-blocking pattern.
        std::mem::forget(guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .with_timer(LocalTime::rfc_3339());

        if config.json_format {
            registry
                .with(console_layer)
                .with(file_layer.json())
                .try_init()
                .ok();
        } else {
            registry.with(console_layer).with(file_layer).try_init().ok();
        }
    } else {
        registry.with(console_layer).try_init().ok();
    }

    info!(
        level = config.level.as_str(),
        console = config.console_output,
        file = config.file_output,
        "logging initialized"
    );
    Ok(())
}
