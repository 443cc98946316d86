use chrono::Local;
use std::path::{Path, PathBuf};

/// `media/recordings/<id>/camera_<id>_<YYYY-MM-DD>/<id>_<YYYYMMDD_HHMMSS>.mp4`
/// (spec.md §6), grounded on
/// `original_source/surveillance/camera_manager.py::generate_video_path`.
pub fn clip_path(root: &Path, camera_id: &str) -> PathBuf {
    let now = Local::now();
    let day_dir = root
        .join(camera_id)
        .join(format!("camera_{}_{}", camera_id, now.format("%Y-%m-%d")));
    let filename = format!("{}_{}.mp4", camera_id, now.format("%Y%m%d_%H%M%S"));
    day_dir.join(filename)
}
