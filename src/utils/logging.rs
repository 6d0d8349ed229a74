//! Tracing setup shared by the CLI and server binaries.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Controls how much the binaries log and how the output is formatted
#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    /// Minimum level that gets emitted
    pub level: Level,
    /// Include the module path in each line
    pub show_target: bool,
    /// Include thread ids, useful when requests interleave
    pub show_thread_ids: bool,
    /// ANSI colors in the output
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            show_target: false,
            show_thread_ids: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Debug-level output with targets and thread ids
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            show_target: true,
            show_thread_ids: true,
            ansi: true,
        }
    }

    /// Warnings and errors only
    pub fn quiet() -> Self {
        Self {
            level: Level::WARN,
            ..Self::default()
        }
    }

    /// Info-level output without colors, for log files and systemd journals
    pub fn production() -> Self {
        Self {
            ansi: false,
            ..Self::default()
        }
    }

    /// Install a global subscriber built from this configuration.
    ///
    /// Returns `false` when a subscriber is already installed, which happens
    /// when tests or embedding code initialized tracing first.
    pub fn install(&self) -> bool {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(self.level)
            .with_ansi(self.ansi)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .compact()
            .finish();

        tracing::subscriber::set_global_default(subscriber).is_ok()
    }
}
