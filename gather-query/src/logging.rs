//! Logging setup for eager loading.
//!
//! The engine reports through `tracing` under the `gather_query` target:
//! preparation summaries at `debug`, every batched fetch at `trace`, dropped
//! unknown relations at `warn`. Applications that already install a
//! subscriber get these events for free; [`init`] installs one when the
//! `tracing-subscriber` feature is enabled.
//!
//! # Environment Variables
//!
//! - `GATHER_LOG=trace|debug|info|warn|error` - Level for engine events
//! - `GATHER_LOG_FORMAT=pretty|compact|json` - Output format (default: compact)
//!
//! `RUST_LOG`, when set, replaces the filter built from `GATHER_LOG`.
//!
//! ```rust,no_run
//! use gather_query::logging;
//!
//! // GATHER_LOG=trace prints one line per batched fetch
//! logging::init();
//! ```

use std::env;
use std::str::FromStr;
use std::sync::{Once, OnceLock};

use tracing::Level;

static INIT: Once = Once::new();
static VERBOSE: OnceLock<bool> = OnceLock::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line human readable output.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// Newline-delimited JSON.
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// Level and format for engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    /// Most verbose level emitted for `gather_query`.
    pub level: Level,
    /// Output format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Read `GATHER_LOG` and `GATHER_LOG_FORMAT`.
    ///
    /// Returns `None` when `GATHER_LOG` is unset or not a level.
    pub fn from_env() -> Option<Self> {
        let level = env::var("GATHER_LOG").ok()?;
        let format = env::var("GATHER_LOG_FORMAT").ok();
        Self::parse(&level, format.as_deref())
    }

    fn parse(level: &str, format: Option<&str>) -> Option<Self> {
        let level = Level::from_str(level.trim()).ok()?;
        let format = format
            .and_then(|f| LogFormat::from_str(f).ok())
            .unwrap_or_default();
        Some(Self { level, format })
    }

    fn directive(&self) -> String {
        format!("gather_query={}", self.level.as_str().to_ascii_lowercase())
    }
}

/// Whether the per-fetch debug and trace macros should emit.
///
/// True when `GATHER_LOG` asks for `debug` or `trace`. Read once.
pub fn verbose() -> bool {
    *VERBOSE.get_or_init(|| {
        LogSettings::from_env().is_some_and(|settings| settings.level >= Level::DEBUG)
    })
}

/// Install a subscriber configured from the environment.
///
/// Does nothing when `GATHER_LOG` is unset. Only the first call has effect.
pub fn init() {
    if let Some(settings) = LogSettings::from_env() {
        init_with(settings);
    }
}

/// Install a subscriber with explicit settings.
///
/// Without the `tracing-subscriber` feature this only marks logging as
/// initialized; install your own subscriber to see events.
pub fn init_with(settings: LogSettings) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(settings.directive()))
                .unwrap_or_else(|_| EnvFilter::new("gather_query=warn"));
            let registry = tracing_subscriber::registry().with(filter);

            match settings.format {
                LogFormat::Json => registry.with(fmt::layer().json()).init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
            }

            tracing::info!(level = %settings.level, format = ?settings.format, "Eager loading logging initialized");
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        let _ = settings;
    });
}

/// Debug event emitted only when [`verbose`] is on.
#[macro_export]
macro_rules! gather_debug {
    ($($arg:tt)*) => {
        if $crate::logging::verbose() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Trace event emitted only when [`verbose`] is on.
#[macro_export]
macro_rules! gather_trace {
    ($($arg:tt)*) => {
        if $crate::logging::verbose() {
            tracing::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings() {
        let settings = LogSettings::parse("Trace", Some("json")).unwrap();
        assert_eq!(settings.level, Level::TRACE);
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.directive(), "gather_query=trace");
    }

    #[test]
    fn test_unknown_format_falls_back_to_compact() {
        let settings = LogSettings::parse("debug", Some("xml")).unwrap();
        assert_eq!(settings.format, LogFormat::Compact);
        assert_eq!(LogSettings::parse("warn", None).unwrap().format, LogFormat::Compact);
    }

    #[test]
    fn test_invalid_level_disables_logging() {
        assert!(LogSettings::parse("loud", Some("pretty")).is_none());
    }
}
