//! Short-clip and continuous-loop video writer. Cooperates with a camera's
//! `FrameQueue` instead of owning its own capture; at most one recorder
//! runs per camera at a time.

pub mod error;
pub mod paths;
pub mod recorder;

pub use error::{RecorderError, Result};
pub use paths::clip_path;
pub use recorder::{
    record_short_clip, start_continuous_recording, RecorderHandle, CONTINUOUS_CLIP_DURATION,
    SHORT_CLIP_DURATION,
};
