//! Mapping from repeated `-v` flags to a tracing level.

use tracing::level_filters::LevelFilter;

/// How much diagnostic output to emit.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Verbosity {
    /// Warnings and errors only.
    #[default]
    Quiet,
    /// Run summaries (`-v`).
    Info,
    /// Pipeline setup and cancellation details (`-vv`).
    Debug,
    /// Per-block events (`-vvv` and beyond).
    Trace,
}

impl Verbosity {
    /// Converts a `-v` occurrence count.
    #[must_use]
    pub const fn from_count(count: u8) -> Self {
        match count {
            0 => Self::Quiet,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Most verbose level that passes the filter.
    #[must_use]
    pub const fn level_filter(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    /// Filter directive equivalent to this verbosity.
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_saturate_at_trace() {
        assert_eq!(Verbosity::from_count(0), Verbosity::Quiet);
        assert_eq!(Verbosity::from_count(1), Verbosity::Info);
        assert_eq!(Verbosity::from_count(2), Verbosity::Debug);
        assert_eq!(Verbosity::from_count(3), Verbosity::Trace);
        assert_eq!(Verbosity::from_count(u8::MAX), Verbosity::Trace);
    }

    #[test]
    fn levels_increase_with_verbosity() {
        assert!(Verbosity::Quiet.level_filter() < Verbosity::Info.level_filter());
        assert!(Verbosity::Debug.level_filter() < Verbosity::Trace.level_filter());
        assert_eq!(Verbosity::default().directive(), "warn");
    }
}
