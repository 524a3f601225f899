//! Structured logging setup.
//!
//! `RUST_LOG` wins when set; otherwise the level from [`LoggingSettings`]
//! applies. Denials caused by unavailable security data are logged at WARN
//! by the evaluator, so production deployments usually run at INFO with
//! JSON output:
//!
//! ```json
//! {"timestamp":"...","level":"WARN","target":"rsgate_domain::evaluator","fields":{"message":"security data unavailable, denying","check":"permission","user":"alice"}}
//! ```

use std::str::FromStr;

use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Output format of log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Resolved logging options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset.
    pub level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: Level::INFO,
        }
    }
}

impl LoggingConfig {
    /// An unparseable level falls back to INFO. `SecurityConfig::validate`
    /// rejects those before a service is built.
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            format: if settings.json {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            level: Level::from_str(&settings.level).unwrap_or(Level::INFO),
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
    }
}

/// Installs the global subscriber.
///
/// Returns `false` if one was already installed, in which case the existing
/// subscriber is left in place.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.filter());
    let installed = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty().with_target(true)).try_init(),
    };
    installed.is_ok()
}

/// A JSON subscriber writing every event to `writer`.
pub fn json_subscriber<W>(writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry().with(EnvFilter::new("trace")).with(
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(true)
            .with_target(true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn lines(&self) -> Vec<serde_json::Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .filter(|line| !line.is_empty())
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    fn settings(level: &str, json: bool) -> LoggingSettings {
        LoggingSettings {
            level: level.to_string(),
            json,
        }
    }

    #[test]
    fn test_from_settings() {
        assert_eq!(
            LoggingConfig::from_settings(&settings("warn", true)),
            LoggingConfig {
                format: LogFormat::Json,
                level: Level::WARN,
            }
        );
        assert_eq!(
            LoggingConfig::from_settings(&settings("debug", false)).format,
            LogFormat::Pretty
        );
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let config = LoggingConfig::from_settings(&settings("chatty", false));
        assert_eq!(config.level, Level::INFO);
    }

    #[test]
    fn test_denial_warning_is_one_json_object() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = json_subscriber(move || writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(check = "permission", user = "alice", "security data unavailable, denying");
        });

        let lines = captured.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["level"], "WARN");
        assert_eq!(lines[0]["fields"]["user"], "alice");
        assert_eq!(lines[0]["fields"]["check"], "permission");
    }
}
