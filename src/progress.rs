//! Progress reporting and cooperative cancellation.
//!
//! Both are optional: the pipeline runs silently with a default
//! [`Monitor`]. Progress arrives as a monotone fraction in [0, 1] per
//! [`ProgressStage`]; cancellation is checked at every outer tracer
//! loop, every nesting-resolver step, and before each analysis stage of
//! every path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::TraceError;

/// The two reporting levels of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    /// Contour extraction from the bitmap.
    PathListGeneration,
    /// Per-path analysis (polygon, vertex adjustment, curves).
    Tracing,
}

/// Receiver for pipeline progress.
///
/// Implementations must tolerate concurrent calls: the tracing stage
/// reports from rayon worker threads.
pub trait ProgressSink: Sync {
    /// `fraction` is in [0, 1]. The underlying counters only grow, but
    /// the tracing stage delivers from worker threads, so two adjacent
    /// reports can arrive out of order; sinks that need a strictly
    /// monotone display should keep a running maximum.
    fn report(&self, stage: ProgressStage, fraction: f64);
}

/// Cooperative cancellation token.
///
/// Cloning shares the underlying flag; any clone can cancel.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The pipeline fails fast with
    /// [`TraceError::Cancelled`] at its next checkpoint.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Bundles the optional progress sink and cancellation token handed to
/// [`trace_with`](crate::trace_with).
#[derive(Clone, Copy, Default)]
pub struct Monitor<'a> {
    sink: Option<&'a dyn ProgressSink>,
    cancel: Option<&'a CancelToken>,
}

impl<'a> Monitor<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: &'a dyn ProgressSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_cancel(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn report(&self, stage: ProgressStage, fraction: f64) {
        if let Some(sink) = self.sink {
            sink.report(stage, fraction.clamp(0.0, 1.0));
        }
    }

    pub(crate) fn check(&self) -> Result<(), TraceError> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(TraceError::Cancelled),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_monitor_never_cancels() {
        let monitor = Monitor::new();
        assert!(monitor.check().is_ok());
        monitor.report(ProgressStage::Tracing, 0.5); // no sink, no panic
    }

    #[test]
    fn cancelled_token_is_observed() {
        let token = CancelToken::new();
        let monitor = Monitor::new().with_cancel(&token);
        assert!(monitor.check().is_ok());
        token.clone().cancel();
        assert!(matches!(monitor.check(), Err(TraceError::Cancelled)));
    }
}
