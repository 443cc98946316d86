//! Filesystem paths for screenshot/snapshot artifacts (spec.md §6).
//! Clip paths live in `recorder::paths` since only `recorder` writes them.

use chrono::Local;
use std::path::{Path, PathBuf};

/// `media/screenshots/camera_<id>/<YYYY-MM-DD>/motion_<YYYY_MM_DD_HH_MM_SS_micros>.jpg`
pub fn screenshot_path(root: &Path, camera_id: &str) -> PathBuf {
    let now = Local::now();
    let dir = root
        .join(format!("camera_{}", camera_id))
        .join(now.format("%Y-%m-%d").to_string());
    let filename = format!("motion_{}.jpg", now.format("%Y_%m_%d_%H_%M_%S_%6f"));
    dir.join(filename)
}

/// `screenshots/current/camera <id>/<YYYY-MM-DD>/camera_<id>_<YYYYMMDD_HHMMSS>.jpg`
pub fn snapshot_path(root: &Path, camera_id: &str) -> PathBuf {
    let now = Local::now();
    let dir = root
        .join(format!("camera {}", camera_id))
        .join(now.format("%Y-%m-%d").to_string());
    let filename = format!("camera_{}_{}.jpg", camera_id, now.format("%Y%m%d_%H%M%S"));
    dir.join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screenshot_path_nests_by_camera_then_date() {
        let root = Path::new("media/screenshots");
        let path = screenshot_path(root, "cam1");
        assert!(path.starts_with("media/screenshots/camera_cam1"));
        assert_eq!(path.extension().unwrap(), "jpg");
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("motion_"));
    }

    #[test]
    fn snapshot_path_nests_under_a_space_separated_camera_dir() {
        let root = Path::new("screenshots/current");
        let path = snapshot_path(root, "cam2");
        assert!(path.starts_with("screenshots/current/camera cam2"));
        assert_eq!(path.extension().unwrap(), "jpg");
        assert!(path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("camera_cam2_"));
    }
}
