//! Progress reporting sink for the transfer loop.
//!
//! The core has no terminal dependency; the CLI supplies a sink that
//! renders a progress bar, and anything else (tests, a library caller) can
//! supply [`NullProgress`].

/// Receives fragment-completion events from the transfer loop.
pub trait ProgressSink: Send + Sync {
    /// Called once after each fragment is written to disk.
    fn on_fragment_complete(&self, bytes_done: u64, total_bytes: u64);

    /// Called once the transfer loop returns, successfully or not.
    fn on_finished(&self, message: &str);
}

/// A sink that discards every event. Used by tests and non-interactive
/// callers.
#[derive(Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_fragment_complete(&self, _bytes_done: u64, _total_bytes: u64) {}
    fn on_finished(&self, _message: &str) {}
}
