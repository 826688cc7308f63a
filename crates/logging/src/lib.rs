#![warn(missing_docs)]

//! Shared logging helpers and CLI argument definitions for the vspaces
//! workspace.

use std::env;

use clap::Args;
use tracing_subscriber::EnvFilter;

/// Logging controls for CLI apps.
#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Set global log level to trace (our crates only)
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Set global log level to debug (our crates only)
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Set a single global log level for our crates (error|warn|info|debug|trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Set an explicit tracing filter directive (overrides other flags)
    /// e.g. "vspaces_engine=trace,mac_winctl=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

/// List of crate targets that constitute "our" logs.
pub fn our_crates() -> &'static [&'static str] {
    &["vspaces", "vspaces_engine", "mac_winctl", "logging"]
}

/// Build a filter directive string applying `level` to our crates.
fn our_crates_directive(level: &str) -> String {
    our_crates()
        .iter()
        .map(|c| format!("{c}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

impl LogArgs {
    /// Resolve the filter directives implied by the flags, falling back to
    /// `RUST_LOG` and then to warn-level output for our crates.
    pub fn directives(&self) -> String {
        if let Some(f) = &self.log_filter {
            return f.clone();
        }
        if self.trace {
            return our_crates_directive("trace");
        }
        if self.debug {
            return our_crates_directive("debug");
        }
        if let Some(level) = &self.log_level {
            return our_crates_directive(level);
        }
        env::var("RUST_LOG").unwrap_or_else(|_| our_crates_directive("warn"))
    }

    /// Install the global tracing subscriber for a CLI process.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_new(self.directives()).unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> LogArgs {
        LogArgs {
            trace: false,
            debug: false,
            log_level: None,
            log_filter: None,
        }
    }

    #[test]
    fn explicit_filter_wins() {
        let mut a = args();
        a.log_filter = Some("vspaces_engine=trace".into());
        a.debug = true;
        assert_eq!(a.directives(), "vspaces_engine=trace");
    }

    #[test]
    fn debug_flag_covers_our_crates() {
        let mut a = args();
        a.debug = true;
        let d = a.directives();
        for c in our_crates() {
            assert!(d.contains(&format!("{c}=debug")), "missing {c} in {d}");
        }
    }
}
