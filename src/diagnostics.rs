use std::fmt::Display;

/// Severity of a diagnostic message.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    /// A failure; processing of the current item was abandoned.
    Error,
    /// Something suspicious which did not stop processing.
    Warning,
    /// A noteworthy successful step.
    Success,
    /// General progress information.
    Info,
    /// Detailed information for debugging.
    Debug,
}

impl Level {
    /// All levels, from most to least severe.
    pub const ALL: [Level; 5] = [
        Level::Error,
        Level::Warning,
        Level::Success,
        Level::Info,
        Level::Debug,
    ];

    fn index(self) -> usize {
        match self {
            Level::Error => 0,
            Level::Warning => 1,
            Level::Success => 2,
            Level::Info => 3,
            Level::Debug => 4,
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Success => write!(f, "success"),
            Level::Info => write!(f, "info"),
            Level::Debug => write!(f, "debug"),
        }
    }
}

/// Collects the messages emitted while processing a run.
///
/// Every message is forwarded to [`tracing`] and counted per [`Level`], so a caller can tell at
/// the end how many errors and warnings occurred without any global state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    counts: [usize; 5],
}

impl Diagnostics {
    /// A fresh context with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and emit a message with the given level.
    pub fn message<S: AsRef<str>>(&mut self, level: Level, message: S) {
        let message = message.as_ref();
        self.counts[level.index()] += 1;
        match level {
            Level::Error => tracing::error!("{message}"),
            Level::Warning => tracing::warn!("{message}"),
            Level::Success => tracing::info!(success = true, "{message}"),
            Level::Info => tracing::info!("{message}"),
            Level::Debug => tracing::debug!("{message}"),
        }
    }

    /// Record an error.
    pub fn error<S: AsRef<str>>(&mut self, message: S) {
        self.message(Level::Error, message)
    }

    /// Record a warning.
    pub fn warn<S: AsRef<str>>(&mut self, message: S) {
        self.message(Level::Warning, message)
    }

    /// Record a success.
    pub fn success<S: AsRef<str>>(&mut self, message: S) {
        self.message(Level::Success, message)
    }

    /// Record an informational message.
    pub fn info<S: AsRef<str>>(&mut self, message: S) {
        self.message(Level::Info, message)
    }

    /// Record a debug message.
    pub fn debug<S: AsRef<str>>(&mut self, message: S) {
        self.message(Level::Debug, message)
    }

    /// The number of messages recorded with `level`.
    pub fn count(&self, level: Level) -> usize {
        self.counts[level.index()]
    }

    /// Whether any error was recorded.
    pub fn has_errors(&self) -> bool {
        self.count(Level::Error) > 0
    }

    /// A snapshot of the counters.
    pub fn summary(&self) -> PrintingSummary {
        PrintingSummary {
            errors: self.count(Level::Error),
            warnings: self.count(Level::Warning),
            successes: self.count(Level::Success),
            infos: self.count(Level::Info),
            debugs: self.count(Level::Debug),
        }
    }
}

/// Message counts per level at the end of a run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PrintingSummary {
    /// Number of errors.
    pub errors: usize,
    /// Number of warnings.
    pub warnings: usize,
    /// Number of successes.
    pub successes: usize,
    /// Number of informational messages.
    pub infos: usize,
    /// Number of debug messages.
    pub debugs: usize,
}

impl Display for PrintingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "printing summary:")?;
        writeln!(f, "    number of errors printed    = {}", self.errors)?;
        writeln!(f, "    number of warnings printed  = {}", self.warnings)?;
        writeln!(f, "    number of successes printed = {}", self.successes)?;
        writeln!(f, "    number of infos printed     = {}", self.infos)?;
        write!(f, "    number of debugs printed    = {}", self.debugs)
    }
}
