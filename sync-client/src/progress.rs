//! Progress reporting.
//!
//! Long-running operations report through a [`ProgressReporter`] injected
//! into the client. A reporter holds at most one session at a time:
//!
//! - [`ProgressReporter::begin`] while a session is active is a no-op and
//!   returns `false` (not queued, not stacked).
//! - Only the caller that acquired the session ends it. [`ProgressScope`]
//!   enforces this: it ends the session on drop if and only if it
//!   acquired it, so every exit path (early return, `?`, panic unwind)
//!   releases the reporter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Sink for human-readable progress.
pub trait ProgressReporter: Send + Sync {
    /// Start a session with a status line.
    ///
    /// Returns `true` if this call acquired the session, `false` if one
    /// was already active (in which case nothing changes).
    fn begin(&self, message: &str) -> bool;

    /// Update the active session. Ignored when no session is active.
    ///
    /// `fraction` is completion in `0.0..=1.0` for determinate progress.
    fn update(&self, message: &str, fraction: Option<f32>);

    /// End the active session.
    fn end(&self);
}

/// Scoped ownership of a progress session.
///
/// # Example
///
/// ```ignore
/// let _scope = ProgressScope::begin(reporter, "Fetching repository info...");
/// // ... the session ends when `_scope` drops, on every exit path
/// ```
#[must_use = "the session ends as soon as the scope is dropped"]
pub struct ProgressScope<'a> {
    reporter: &'a dyn ProgressReporter,
    owner: bool,
}

impl<'a> ProgressScope<'a> {
    /// Try to start a session on `reporter`.
    pub fn begin(reporter: &'a dyn ProgressReporter, message: &str) -> Self {
        let owner = reporter.begin(message);
        Self { reporter, owner }
    }

    /// Whether this scope acquired the session.
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Report determinate progress for step `index` (zero-based) of `total`.
    pub fn step(&self, index: usize, total: usize, message: &str) {
        let fraction = if total == 0 {
            None
        } else {
            Some((index + 1) as f32 / total as f32)
        };
        self.reporter.update(message, fraction);
    }
}

impl Drop for ProgressScope<'_> {
    fn drop(&mut self) {
        if self.owner {
            self.reporter.end();
        }
    }
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn begin(&self, _message: &str) -> bool {
        true
    }

    fn update(&self, _message: &str, _fraction: Option<f32>) {}

    fn end(&self) {}
}

/// Snapshot of a [`LoadingIndicator`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadingState {
    /// Whether a session is active.
    pub is_loading: bool,
    /// Current status line.
    pub message: String,
    /// Completion percentage, `0..=100`.
    pub progress: u8,
    /// Whether progress is determinate.
    pub determinate: bool,
}

/// In-memory exclusive loading indicator, for UIs that poll state.
#[derive(Debug, Default)]
pub struct LoadingIndicator {
    state: Mutex<LoadingState>,
}

impl LoadingIndicator {
    /// Create an idle indicator.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LoadingState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current state.
    pub fn snapshot(&self) -> LoadingState {
        self.lock().clone()
    }
}

impl ProgressReporter for LoadingIndicator {
    fn begin(&self, message: &str) -> bool {
        let mut state = self.lock();
        if state.is_loading {
            return false;
        }
        *state = LoadingState {
            is_loading: true,
            message: message.to_string(),
            progress: 0,
            determinate: false,
        };
        true
    }

    fn update(&self, message: &str, fraction: Option<f32>) {
        let mut state = self.lock();
        if !state.is_loading {
            return;
        }
        state.message = message.to_string();
        if let Some(fraction) = fraction {
            state.determinate = true;
            state.progress = (fraction.clamp(0.0, 1.0) * 100.0).round() as u8;
        }
    }

    fn end(&self) {
        *self.lock() = LoadingState::default();
    }
}

/// A progress event, as delivered by [`ChannelProgress`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A session started.
    Begin {
        /// Status line.
        message: String,
    },
    /// The active session progressed.
    Update {
        /// Status line.
        message: String,
        /// Completion in `0.0..=1.0`, if determinate.
        fraction: Option<f32>,
    },
    /// The active session ended.
    End,
}

/// Reporter that pushes events onto a channel consumed elsewhere (e.g. a UI task).
///
/// Events are dropped silently once the receiver is gone.
#[derive(Debug)]
pub struct ChannelProgress {
    active: AtomicBool,
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    /// Create a reporter and the receiving end of its event stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                active: AtomicBool::new(false),
                tx,
            },
            rx,
        )
    }
}

impl ProgressReporter for ChannelProgress {
    fn begin(&self, message: &str) -> bool {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let _ = self.tx.send(ProgressEvent::Begin {
            message: message.to_string(),
        });
        true
    }

    fn update(&self, message: &str, fraction: Option<f32>) {
        if self.active.load(Ordering::Acquire) {
            let _ = self.tx.send(ProgressEvent::Update {
                message: message.to_string(),
                fraction,
            });
        }
    }

    fn end(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            let _ = self.tx.send(ProgressEvent::End);
        }
    }
}
