//! Cancellation and progress reporting for scans.
//!
//! A scan reports two kinds of updates: human-readable status text and a
//! completion percentage keyed to archives processed. Callers receive them
//! through a [`ProgressSink`]; the engine's worker uses [`ChannelProgress`] to
//! forward them to another thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal shared between a caller and a scan.
///
/// Clones share the same flag. The scanner polls it between archives and
/// between archive entries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new, un-cancelled token
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Receiver for scan status and progress updates.
pub trait ProgressSink: Send + Sync {
    /// Called with a human-readable status line
    fn on_status(&self, message: &str);

    /// Called with the completion percentage in `[0, 100]`
    fn on_progress(&self, percent: f64);
}

/// A sink that discards everything
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_status(&self, _message: &str) {}

    fn on_progress(&self, _percent: f64) {}
}

/// A simple progress reporter that logs to tracing
pub struct LoggingProgress;

impl ProgressSink for LoggingProgress {
    fn on_status(&self, message: &str) {
        tracing::info!(status = %message, "Scan status");
    }

    fn on_progress(&self, percent: f64) {
        tracing::debug!(percent, "Scan progress");
    }
}

/// Updates delivered over a channel
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// A status line
    Status(String),
    /// Completion percentage in `[0, 100]`
    Progress(f64),
}

/// A channel-based progress sink
pub struct ChannelProgress {
    sender: crossbeam_channel::Sender<ScanEvent>,
}

impl ChannelProgress {
    /// Create a new channel-based sink and the receiving end
    pub fn new() -> (Self, crossbeam_channel::Receiver<ScanEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (ChannelProgress { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgress {
    fn on_status(&self, message: &str) {
        let _ = self.sender.send(ScanEvent::Status(message.to_string()));
    }

    fn on_progress(&self, percent: f64) {
        let _ = self.sender.send(ScanEvent::Progress(percent));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_channel_progress() {
        let (sink, receiver) = ChannelProgress::new();
        sink.on_status("Searching in: a.zip");
        sink.on_progress(50.0);

        assert_eq!(
            receiver.try_recv().unwrap(),
            ScanEvent::Status("Searching in: a.zip".to_string())
        );
        assert_eq!(receiver.try_recv().unwrap(), ScanEvent::Progress(50.0));
    }

    #[test]
    fn test_channel_progress_ignores_closed_receiver() {
        let (sink, receiver) = ChannelProgress::new();
        drop(receiver);
        sink.on_status("nobody listening");
    }
}
