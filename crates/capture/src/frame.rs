use std::sync::Arc;
use std::time::Instant;

/// An immutable decoded image: BGR24, row-major, matching the layout
/// `opencv::core::Mat` exposes and what the original writes via
/// `cv2.imwrite`/`cv2.VideoWriter` (see SPEC_FULL.md §3).
///
/// `data` is `Arc<[u8]>` rather than `Vec<u8>` because one captured frame
/// fans out to the FrameQueue, the motion detector and a recorder
/// concurrently; cloning a `Frame` never copies pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 3);
        Self {
            width,
            height,
            data: Arc::from(data),
            captured_at: Instant::now(),
        }
    }

    /// Bytes per row, assuming tightly packed BGR24.
    pub fn stride(&self) -> usize {
        self.width as usize * 3
    }
}
