//! Terminal output for the command line.

use std::io::{self, Write};

/// Writes user-facing messages to stdout unless quiet.
///
/// Errors go through `main`, so there is no error channel here.
#[derive(Debug, Clone)]
pub struct OutputManager {
    quiet: bool,
}

impl OutputManager {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn progress(&self, message: &str) {
        self.print(message);
    }

    pub fn success(&self, message: &str) {
        self.print(&format!("✓ {message}"));
    }

    pub fn indent(&self, message: &str) {
        self.print(&format!("  {message}"));
    }

    fn print(&self, message: &str) {
        if self.quiet {
            return;
        }
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{message}").and_then(|_| stdout.flush()) {
            log::warn!("Failed to write to stdout: {e}");
        }
    }
}
