//! The decision half of the detector: a (mostly) pure function of
//! (frame, state, config) that updates tracker state and reports effect
//! signals, with no drawing and no filesystem I/O. Split out from the
//! monolithic `get_frame_with_motion_detection` closure in
//! `original_source/surveillance/camera_manager.py` per SPEC_FULL.md §4.4,
//! so the decision logic is unit-testable without a display or a disk.

use crate::error::Result;
use crate::state::{DetectorConfig, MotionState, Tracker};
use capture::Frame;
use opencv::core::{Mat, Point as CvPoint, Rect, Size, Vector, CV_8UC3};
use opencv::imgproc;
use opencv::prelude::*;
use opencv::video::BackgroundSubtractorTrait;
use repository::ZoneBounds;
use std::time::Instant;
use tracing::debug;

/// One surviving contour's geometry, carried through to `annotate`.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Everything `annotate` and the fleet need after one `decide` call.
#[derive(Debug, Clone)]
pub struct DetectionEffects {
    pub bounding_boxes: Vec<BoundingBox>,
    /// A new object just entered the zone, `save_screenshot` is set, and
    /// the debounce interval has elapsed since the last screenshot for
    /// this camera (spec.md §4.4).
    pub should_save_screenshot: bool,
    /// A new object just entered the zone and `send_chat_video` is set;
    /// the caller still must check "not already recording" before acting
    /// on this (spec.md's should-record decision is a pure function of
    /// three inputs, only two of which live here).
    pub new_object_entered_zone: bool,
    pub object_count: u32,
}

fn frame_to_mat(frame: &Frame) -> opencv::Result<Mat> {
    unsafe {
        Mat::new_rows_cols_with_data_unsafe(
            frame.height as i32,
            frame.width as i32,
            CV_8UC3,
            frame.data.as_ptr() as *mut std::ffi::c_void,
            frame.stride(),
        )
    }
}

fn centroid_in_zone(x: i32, y: i32, w: i32, h: i32, zone: Option<&ZoneBounds>) -> bool {
    let cx = x + w / 2;
    let cy = y + h / 2;
    match zone {
        Some(bounds) => bounds.contains(cx, cy),
        None => true, // absent zone: trigger on any motion in the whole frame
    }
}

/// Runs background subtraction, morphology, contour extraction, the zone
/// test and the centroid tracker update for one frame. Mutates `state` in
/// place and returns the effect signals the caller acts on.
pub fn decide(
    frame: &Frame,
    state: &mut MotionState,
    zone: Option<&ZoneBounds>,
    save_screenshot_enabled: bool,
    send_chat_video_enabled: bool,
    config: &DetectorConfig,
) -> Result<DetectionEffects> {
    let mat = frame_to_mat(frame)?;

    let mut fg_mask = Mat::default();
    state.subtractor.apply(&mat, &mut fg_mask, -1.0)?;

    let kernel =
        imgproc::get_structuring_element(imgproc::MORPH_RECT, Size::new(5, 5), CvPoint::new(-1, -1))?;
    let mut opened = Mat::default();
    imgproc::morphology_ex(
        &fg_mask,
        &mut opened,
        imgproc::MORPH_OPEN,
        &kernel,
        CvPoint::new(-1, -1),
        1,
        opencv::core::BORDER_CONSTANT,
        imgproc::morphology_default_border_value()?,
    )?;
    let mut dilated = Mat::default();
    imgproc::dilate(
        &opened,
        &mut dilated,
        &kernel,
        CvPoint::new(-1, -1),
        2,
        opencv::core::BORDER_CONSTANT,
        imgproc::morphology_default_border_value()?,
    )?;

    let mut contours: Vector<Vector<CvPoint>> = Vector::new();
    imgproc::find_contours(
        &dilated,
        &mut contours,
        imgproc::RETR_EXTERNAL,
        imgproc::CHAIN_APPROX_SIMPLE,
        CvPoint::new(0, 0),
    )?;

    let now = Instant::now();
    let mut bounding_boxes = Vec::new();
    let mut new_object_entered_zone = false;

    for contour in contours.iter() {
        let area = imgproc::contour_area(&contour, false)?;
        if area < config.min_contour_area {
            continue;
        }

        let rect: Rect = imgproc::bounding_rect(&contour)?;
        let cx = rect.x + rect.width / 2;
        let cy = rect.y + rect.height / 2;
        let in_zone = centroid_in_zone(rect.x, rect.y, rect.width, rect.height, zone);

        let matched = state.trackers.values_mut().find(|t| {
            let dx = (t.position.0 - cx) as f64;
            let dy = (t.position.1 - cy) as f64;
            (dx * dx + dy * dy).sqrt() < config.max_tracker_distance
                && now.duration_since(t.last_seen) < config.tracker_staleness
        });

        match matched {
            Some(tracker) => {
                tracker.position = (cx, cy);
                tracker.last_seen = now;
            }
            None if in_zone => {
                let object_id = state.next_object_id;
                state.next_object_id += 1;
                state.trackers.insert(
                    object_id,
                    Tracker {
                        object_id,
                        position: (cx, cy),
                        last_seen: now,
                    },
                );
                state.session_count += 1;
                new_object_entered_zone = true;
                debug!(object_id, cx, cy, session_count = state.session_count, "object entered zone");
            }
            None => {}
        }

        bounding_boxes.push(BoundingBox {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });
    }

    state.evict_stale_trackers(config.tracker_staleness, now);

    let debounce_elapsed = state
        .last_screenshot
        .map(|t| now.duration_since(t) >= config.screenshot_debounce)
        .unwrap_or(true);
    let should_save_screenshot =
        save_screenshot_enabled && new_object_entered_zone && debounce_elapsed;
    if should_save_screenshot {
        state.last_screenshot = Some(now);
        debug!("debounce elapsed, saving screenshot");
    }

    Ok(DetectionEffects {
        bounding_boxes,
        should_save_screenshot,
        new_object_entered_zone: new_object_entered_zone && send_chat_video_enabled,
        object_count: state.session_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use repository::Point;

    fn blank_frame(w: u32, h: u32) -> Frame {
        Frame::new(w, h, vec![0u8; (w * h * 3) as usize])
    }

    fn square_frame(w: u32, h: u32, x: i32, y: i32, side: i32) -> Frame {
        let mut data = vec![0u8; (w * h * 3) as usize];
        for row in y..(y + side) {
            for col in x..(x + side) {
                if row < 0 || col < 0 || row as u32 >= h || col as u32 >= w {
                    continue;
                }
                let idx = (row as usize * w as usize + col as usize) * 3;
                data[idx] = 255;
                data[idx + 1] = 255;
                data[idx + 2] = 255;
            }
        }
        Frame::new(w, h, data)
    }

    #[test]
    fn counter_increments_once_for_a_steady_object_in_zone() {
        let mut state = MotionState::new().unwrap();
        let config = DetectorConfig::default();
        let zone = ZoneBounds::from_zone(&[
            Point::new(100, 100),
            Point::new(200, 100),
            Point::new(100, 200),
            Point::new(200, 200),
        ]);

        // Warm up the background model on empty frames.
        for _ in 0..5 {
            decide(&blank_frame(320, 240), &mut state, Some(&zone), false, false, &config).unwrap();
        }

        let mut last_effects = None;
        for _ in 0..10 {
            let frame = square_frame(320, 240, 140, 140, 20);
            last_effects =
                Some(decide(&frame, &mut state, Some(&zone), false, false, &config).unwrap());
        }

        assert_eq!(state.session_count, 1);
        assert!(last_effects.unwrap().object_count >= 1);
    }

    #[test]
    fn reset_session_zeroes_the_counter_but_keeps_trackers() {
        let mut state = MotionState::new().unwrap();
        state.session_count = 4;
        state.reset_session();
        assert_eq!(state.session_count, 0);
    }
}
