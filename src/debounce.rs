//! Debouncing of rapid input changes.
//!
//! A calling layer re-runs a keyword search after the user stops typing.
//! Each change replaces the pending input and restarts the quiet window, so
//! only the last change within the window fires.
//!
//! Time is passed in by the caller; nothing here sleeps or spawns.
//!
//! # Usage
//!
//! ```rust
//! use keytrend::Debouncer;
//! use std::time::{Duration, Instant};
//!
//! let start = Instant::now();
//! let mut debouncer = Debouncer::new(Duration::from_millis(300));
//!
//! debouncer.schedule("qu", start);
//! debouncer.schedule("quant", start + Duration::from_millis(100));
//! assert_eq!(debouncer.poll(start + Duration::from_millis(300)), None);
//! assert_eq!(debouncer.poll(start + Duration::from_millis(400)), Some("quant"));
//! ```

use std::time::{Duration, Instant};

/// Default quiet window before a pending input fires.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(300);

/// Holds the latest input until it has been quiet for a while.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_WINDOW)
    }
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    pub fn quiet_window(&self) -> Duration {
        self.quiet
    }

    /// Replace any pending input with `input`, changed at `now`.
    pub fn schedule(&mut self, input: T, now: Instant) {
        self.pending = Some((input, now));
    }

    /// Take the pending input if it has been quiet for the whole window.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, changed)) if now.saturating_duration_since(*changed) >= self.quiet => {
                self.pending.take().map(|(input, _)| input)
            }
            _ => None,
        }
    }

    /// Drop the pending input, returning it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(input, _)| input)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending input will fire, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, changed)| *changed + self.quiet)
    }
}
