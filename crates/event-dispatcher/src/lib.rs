//! Fire-and-forget submission of screenshot/clip events to an external
//! notification sink.
//!
//! Contract (spec.md §4.9): non-blocking from the core's perspective, no
//! ordering guarantee across submissions, the core never observes delivery
//! outcome. Grounded on the teacher's `video-recorder` crate pulling in
//! `crossbeam_channel` for inter-thread queues (already in the teacher's
//! workspace, so reused here rather than adding a new channel crate) and on
//! `original_source/celery_task/tasks.py` + `original_source/bot/app.py`,
//! which confirm delivery fans out one message per subscriber id.

use repository::{Event, SubscriberId};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::warn;

/// The concrete email/chat backend is out of scope for this workspace
/// (spec.md §1); the dispatcher only ever talks to this trait.
pub trait NotificationSink: Send + Sync + 'static {
    fn deliver(&self, subscriber: &SubscriberId, event: &Event) -> Result<(), String>;
}

/// A sink used by tests and by callers with no subscribers configured.
pub struct NullSink;

impl NotificationSink for NullSink {
    fn deliver(&self, _subscriber: &SubscriberId, _event: &Event) -> Result<(), String> {
        Ok(())
    }
}

/// Submits events onto an unbounded channel drained by a background
/// thread. `EventDispatchFailed` (spec.md §7) never leaves this crate: a
/// failed `deliver` call is logged and dropped, the core is never told.
pub struct EventDispatcher {
    sender: Option<crossbeam_channel::Sender<(SubscriberId, Event)>>,
    worker: Option<JoinHandle<()>>,
}

impl EventDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<(SubscriberId, Event)>();

        let worker = std::thread::spawn(move || {
            while let Ok((subscriber, event)) = receiver.recv() {
                if let Err(e) = sink.deliver(&subscriber, &event) {
                    warn!(subscriber = ?subscriber, error = %e, "event dispatch failed");
                }
            }
        });

        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Submits one copy of `event` per subscriber. Never blocks the caller
    /// and never surfaces a delivery error; submitting after `shutdown` is
    /// a silent no-op.
    pub fn submit(&self, event: Event, subscribers: &[SubscriberId]) {
        let Some(sender) = &self.sender else {
            warn!("event dispatcher already shut down, dropping event");
            return;
        };
        for subscriber in subscribers {
            if sender.send((subscriber.clone(), event.clone())).is_err() {
                warn!("event dispatcher channel closed, dropping event");
                return;
            }
        }
    }

    /// Stops accepting new events and waits for the drain thread to finish
    /// processing what's already queued. Idempotent.
    pub fn shutdown(&mut self) {
        self.sender = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
