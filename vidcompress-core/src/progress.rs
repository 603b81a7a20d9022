//! Progress reporting.
//!
//! A job pushes [`ProgressEvent`]s to a single [`ProgressSink`]. Every job
//! talks to its sink through a [`ProgressReporter`], which guarantees the
//! delivery contract: processed durations never decrease, and exactly one
//! terminal event (completion or failure) ends the stream.

use crate::error::Error;
use parking_lot::Mutex;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tracing::trace;

/// Processed and total duration of a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressionProgress {
    /// Media time already handed to the pipeline, in microseconds.
    pub processed_duration_us: i64,
    /// Duration of the source, in microseconds.
    pub total_duration_us: i64,
}

impl CompressionProgress {
    /// Create a progress value.
    pub fn new(processed_duration_us: i64, total_duration_us: i64) -> Self {
        Self {
            processed_duration_us,
            total_duration_us,
        }
    }

    /// Whole-percent completion, rounded down. Zero when the total is zero.
    pub fn percentage(&self) -> i64 {
        if self.total_duration_us == 0 {
            return 0;
        }
        let scaled = i128::from(self.processed_duration_us) * 100;
        scaled.div_euclid(i128::from(self.total_duration_us)) as i64
    }

    /// Check if processing reached the total.
    pub fn is_complete(&self) -> bool {
        self.processed_duration_us >= self.total_duration_us
    }
}

/// How a successful job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The output holds the requested video and audio.
    Completed,
    /// The output is valid but its video track has no frames.
    EmptyResult,
}

/// Event delivered to a [`ProgressSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Intermediate progress update.
    Progress(CompressionProgress),
    /// Terminal success.
    Completed(Outcome),
    /// Terminal failure with its reason.
    Failed(String),
}

impl ProgressEvent {
    /// Check if this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Progress(_))
    }
}

/// External observer of a compression job.
pub trait ProgressSink: Send {
    /// Receive one event.
    fn on_event(&self, event: ProgressEvent);
}

impl ProgressSink for Sender<ProgressEvent> {
    fn on_event(&self, event: ProgressEvent) {
        if self.send(event).is_err() {
            trace!("Progress receiver dropped");
        }
    }
}

impl<S: ProgressSink + Sync + ?Sized> ProgressSink for Arc<S> {
    fn on_event(&self, event: ProgressEvent) {
        (**self).on_event(event);
    }
}

/// Sink that forwards events to a closure.
pub struct CallbackSink<F> {
    callback: F,
}

impl<F> CallbackSink<F>
where
    F: Fn(ProgressEvent) + Send,
{
    /// Wrap a closure.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressSink for CallbackSink<F>
where
    F: Fn(ProgressEvent) + Send,
{
    fn on_event(&self, event: ProgressEvent) {
        (self.callback)(event);
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_event(&self, _event: ProgressEvent) {}
}

/// Sink that keeps every event for later inspection.
#[derive(Debug, Default, Clone)]
pub struct ProgressRecorder {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl ProgressRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    /// Only the progress updates, in delivery order.
    pub fn progress(&self) -> Vec<CompressionProgress> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Progress(progress) => Some(*progress),
                _ => None,
            })
            .collect()
    }

    /// The terminal event, if one arrived.
    pub fn terminal(&self) -> Option<ProgressEvent> {
        self.events.lock().iter().find(|e| e.is_terminal()).cloned()
    }

    /// Number of terminal events received.
    pub fn terminal_count(&self) -> usize {
        self.events.lock().iter().filter(|e| e.is_terminal()).count()
    }
}

impl ProgressSink for ProgressRecorder {
    fn on_event(&self, event: ProgressEvent) {
        self.events.lock().push(event);
    }
}

/// Enforces the ordering contract on top of a sink.
pub struct ProgressReporter {
    sink: Box<dyn ProgressSink>,
    total_duration_us: i64,
    last_processed_us: i64,
    terminated: bool,
}

impl ProgressReporter {
    /// Create a reporter for a source of the given duration.
    pub fn new(sink: Box<dyn ProgressSink>, total_duration_us: i64) -> Self {
        Self {
            sink,
            total_duration_us: total_duration_us.max(0),
            last_processed_us: 0,
            terminated: false,
        }
    }

    /// Total duration this reporter measures against.
    pub fn total_duration_us(&self) -> i64 {
        self.total_duration_us
    }

    /// Last processed duration delivered.
    pub fn last_processed_us(&self) -> i64 {
        self.last_processed_us
    }

    /// Whether a terminal event was already delivered.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Deliver a progress update.
    ///
    /// The value is clamped to `[last delivered, total]`, so out-of-order
    /// sample timestamps never make progress go backwards. Ignored after a
    /// terminal event.
    pub fn report(&mut self, processed_duration_us: i64) {
        if self.terminated {
            return;
        }
        let mut processed = processed_duration_us.max(self.last_processed_us);
        if self.total_duration_us > 0 {
            processed = processed.min(self.total_duration_us);
        }
        self.last_processed_us = processed;
        self.sink.on_event(ProgressEvent::Progress(CompressionProgress::new(
            processed,
            self.total_duration_us,
        )));
    }

    /// Deliver `{total, total}` followed by the completion event.
    pub fn complete(&mut self, outcome: Outcome) {
        if self.terminated {
            return;
        }
        self.last_processed_us = self.total_duration_us;
        self.sink.on_event(ProgressEvent::Progress(CompressionProgress::new(
            self.total_duration_us,
            self.total_duration_us,
        )));
        self.sink.on_event(ProgressEvent::Completed(outcome));
        self.terminated = true;
    }

    /// Deliver the failure event.
    pub fn fail(&mut self, error: &Error) {
        if self.terminated {
            return;
        }
        self.sink.on_event(ProgressEvent::Failed(error.to_string()));
        self.terminated = true;
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("total_duration_us", &self.total_duration_us)
            .field("last_processed_us", &self.last_processed_us)
            .field("terminated", &self.terminated)
            .finish()
    }
}
