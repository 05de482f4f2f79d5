//! Non-fatal problems found while parsing.
//!
//! Parsing never fails because of the Markdown itself, but some inputs are worth a warning: a link reference
//! definition whose label is already taken, a heading that skips levels, or a hard line break the host can't keep.
//! These get sent to a [`Reporter`] as [`Diagnostic`]s.
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        })
    }
}

impl From<Severity> for log::Level {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// The source identifier the document was parsed with.
    pub source: String,
    /// 1-origin line, if known.
    pub line: Option<usize>,
}

impl Display for Diagnostic {
    /// `source:line: (SEVERITY) message`, or `source: (SEVERITY) message` if there's no line.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}: ({}) {}", self.source, self.severity, self.message),
            None => write!(f, "{}: ({}) {}", self.source, self.severity, self.message),
        }
    }
}

/// A sink for [`Diagnostic`]s.
pub trait Reporter {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Collects diagnostics, for inspecting them after the parse.
impl Reporter for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Forwards diagnostics to the [`log`] facade, at the level matching their severity.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, diagnostic: Diagnostic) {
        log::log!(log::Level::from(diagnostic.severity), "{diagnostic}");
    }
}
