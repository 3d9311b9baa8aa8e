//! Progress reporting
//!
//! The engine reports through a [`ProgressSink`]. Closures are sinks, so a
//! caller on the same thread can react directly; [`ChannelProgress`] forwards
//! events to another thread.

use std::path::PathBuf;
use std::sync::mpsc::Sender;

use crate::pipeline::RunSummary;

/// Something that happened during a run
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The run started on `files` files
    Started { files: usize },
    /// Every file was indexed
    Indexed { distinct: usize, duplicates: usize },
    /// One file was saved; `completed` never decreases within a run
    FileWritten {
        /// Display name of the input (its base name)
        name: String,
        /// Where the annotated file was saved
        path: PathBuf,
        completed: usize,
        total: usize,
    },
    /// Every file was saved
    Finished(RunSummary),
    /// The run stopped on an error
    Failed { path: PathBuf, message: String },
}

impl ProgressEvent {
    /// Overall percentage of files written, for [`ProgressEvent::FileWritten`]
    pub fn percent(&self) -> Option<f64> {
        match self {
            ProgressEvent::FileWritten {
                completed, total, ..
            } if *total > 0 => Some(*completed as f64 * 100.0 / *total as f64),
            ProgressEvent::FileWritten { .. } => Some(100.0),
            _ => None,
        }
    }
}

/// Receiver of progress events.
///
/// Sinks are shared by the workers of a run, hence `Sync`.
pub trait ProgressSink: Sync {
    fn notify(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Sync,
{
    fn notify(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn notify(&self, _event: ProgressEvent) {}
}

/// Sends events over a channel, for callers running the engine on another thread
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: Sender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelProgress {
    fn notify(&self, event: ProgressEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("progress receiver is gone, dropping event");
        }
    }
}
