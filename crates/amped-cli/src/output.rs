//! Colored terminal output on stderr.
//!
//! Converted markup and dimension results go to stdout; everything a person
//! reads goes through [`Output`] so pipes stay clean.

use std::path::Path;

use console::{Style, Term};

/// Status reporter for CLI commands.
pub(crate) struct Output {
    term: Term,
    dim: Style,
    green: Style,
    yellow: Style,
    red: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            dim: Style::new().dim(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
        }
    }

    /// Print a secondary detail (dimmed).
    pub(crate) fn note(&self, msg: &str) {
        self.line(&self.dim, msg);
    }

    /// Report a file written by a command (green).
    pub(crate) fn written(&self, what: &str, path: &Path) {
        self.line(&self.green, &format!("{what} written to {}", path.display()));
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        self.line(&self.yellow, msg);
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.red, msg);
    }

    fn line(&self, style: &Style, msg: &str) {
        let _ = self.term.write_line(&style.apply_to(msg).to_string());
    }
}
