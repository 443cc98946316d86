//! Bounded, newest-wins frame channel.
//!
//! Generalizes two teacher idioms: `usb_camera::stream::CameraStreamReader`'s
//! single-slot "always keep newest" drop pattern, and
//! `video_recorder::service::RecordingService::submit_frame`'s explicit
//! `pop_front`-before-`push_back` bounded `VecDeque`. Sized to
//! `max_queue_size` (default 10, spec.md §6) rather than capacity 1, and
//! built on `tokio::sync::Mutex` + `tokio::sync::Notify` rather than
//! `crossbeam_channel`/a `std::sync::Mutex`, because independent async
//! consumers (a `GetFrame` caller, `Snapshot`'s fallback, a `Recorder` task)
//! drain the same per-camera queue concurrently rather than owning a single
//! `Receiver`.

use capture::Frame;
use log::debug;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

pub const DEFAULT_MAX_QUEUE_SIZE: usize = 10;

pub struct FrameQueue {
    max_size: usize,
    buffer: Mutex<VecDeque<Frame>>,
    notify: Notify,
}

impl FrameQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            buffer: Mutex::new(VecDeque::with_capacity(max_size.max(1))),
            notify: Notify::new(),
        }
    }

    /// Pushes a frame, dropping the oldest queued frame first if full.
    /// Never blocks: the reader must never stall on a slow consumer
    /// (spec.md §4.2).
    pub async fn put(&self, frame: Frame) {
        let mut buffer = self.buffer.lock().await;
        if buffer.len() >= self.max_size {
            buffer.pop_front();
            debug!("frame queue full at {}, dropped oldest frame", self.max_size);
        }
        buffer.push_back(frame);
        drop(buffer);
        self.notify.notify_waiters();
    }

    /// Waits up to `timeout` for a frame to become available, returning the
    /// oldest queued frame (capture order is preserved; drops from `put`
    /// only ever skip frames, never reorder them).
    pub async fn get(&self, timeout: Duration) -> Option<Frame> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register interest before checking the buffer: if `put` runs
            // between the check and the wait, `notified()` still observes
            // it, since the permit it records is enqueued right here.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut buffer = self.buffer.lock().await;
                if let Some(frame) = buffer.pop_front() {
                    return Some(frame);
                }
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }
            if tokio::time::timeout(remaining, notified).await.is_err() {
                return None;
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.buffer.lock().await.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn frame(w: u32, h: u32) -> Frame {
        Frame::new(w, h, vec![0u8; (w * h * 3) as usize])
    }

    #[tokio::test]
    async fn put_drops_oldest_when_full() {
        let q = FrameQueue::new(2);
        q.put(frame(1, 1)).await;
        q.put(frame(2, 2)).await;
        q.put(frame(3, 3)).await; // drops the 1x1 frame
        assert_eq!(q.len().await, 2);
        let first = q.get(Duration::from_millis(50)).await.unwrap();
        assert_eq!(first.width, 2);
        let second = q.get(Duration::from_millis(50)).await.unwrap();
        assert_eq!(second.width, 3);
    }

    #[tokio::test]
    async fn get_times_out_on_empty_queue() {
        let q = FrameQueue::new(4);
        let result = q.get(Duration::from_millis(20)).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn queue_never_exceeds_max_size() {
        let q = FrameQueue::new(3);
        for _ in 0..20 {
            q.put(frame(4, 4)).await;
        }
        assert!(q.len().await <= 3);
    }
}
