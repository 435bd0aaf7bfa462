//! Log output setup.
//!
//! Components only emit `tracing` events; the subscriber is installed once by
//! the binary. Per-connection context travels in the `conn` span.

use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Every relay step.
    Verbose,
    /// Startup and failures.
    #[default]
    Normal,
    /// Failures only.
    Quiet,
}

impl Verbosity {
    pub fn level(self) -> Level {
        match self {
            Verbosity::Verbose => Level::TRACE,
            Verbosity::Normal => Level::INFO,
            Verbosity::Quiet => Level::ERROR,
        }
    }
}

pub fn init(verbosity: Verbosity) {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(verbosity.level())
        .init();
}
