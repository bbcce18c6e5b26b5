//! Terminal progress output.

use markit_sync_client::{LoadingIndicator, LoadingState, ProgressReporter};
use std::io::Write;

/// Reporter that mirrors a [`LoadingIndicator`] onto stderr.
///
/// Session exclusivity comes from the indicator: a nested `begin` prints
/// nothing and leaves the running line alone.
#[derive(Debug, Default)]
pub struct TerminalProgress {
    indicator: LoadingIndicator,
}

impl TerminalProgress {
    /// Create an idle reporter.
    pub fn new() -> Self {
        Self::default()
    }
}

/// One status line for `state`.
pub fn render(state: &LoadingState) -> String {
    if state.determinate {
        format!("[{:>3}%] {}", state.progress, state.message)
    } else {
        format!("[ .. ] {}", state.message)
    }
}

fn print_line(line: &str) {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{line}");
}

impl ProgressReporter for TerminalProgress {
    fn begin(&self, message: &str) -> bool {
        let acquired = self.indicator.begin(message);
        if acquired {
            print_line(&render(&self.indicator.snapshot()));
        }
        acquired
    }

    fn update(&self, message: &str, fraction: Option<f32>) {
        self.indicator.update(message, fraction);
        let state = self.indicator.snapshot();
        if state.is_loading {
            print_line(&render(&state));
        }
    }

    fn end(&self) {
        self.indicator.end();
    }
}
