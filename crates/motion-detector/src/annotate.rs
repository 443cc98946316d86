//! The drawing half of the detector: paints bounding boxes, the zone
//! rectangle, the object counter and the "REC" indicator onto a copy of the
//! input frame. Kept separate from `decide` per SPEC_FULL.md §4.4 and
//! DESIGN NOTES, so the "REC" overlay lives solely here rather than in
//! `recorder` — avoiding a race between the detector and the recorder over
//! the same frame buffer (the Open Question this spec resolves).

use crate::decide::DetectionEffects;
use crate::error::Result;
use capture::Frame;
use opencv::core::{Mat, Point as CvPoint, Scalar, Vector, CV_8UC3};
use opencv::imgcodecs;
use opencv::imgproc;
use opencv::prelude::*;
use repository::Zone;

const GREEN: (f64, f64, f64) = (0.0, 255.0, 0.0);
const RED: (f64, f64, f64) = (0.0, 0.0, 255.0);

fn scalar((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

/// Builds an owned, writable `Mat` backed by its own copy of the frame's
/// pixels, so drawing into it never aliases `frame.data`.
fn frame_to_mat_mut(frame: &Frame) -> opencv::Result<Mat> {
    let mut copy = frame.data.to_vec();
    let borrowed = unsafe {
        Mat::new_rows_cols_with_data_unsafe(
            frame.height as i32,
            frame.width as i32,
            CV_8UC3,
            copy.as_mut_ptr() as *mut std::ffi::c_void,
            frame.stride(),
        )?
    };
    borrowed.try_clone()
}

/// Paints the frame and returns it as a new, annotated `Frame`. The input
/// frame is never mutated.
pub fn annotate(
    frame: &Frame,
    effects: &DetectionEffects,
    zone: Option<&Zone>,
    recording: bool,
) -> Result<Frame> {
    let mut mat = frame_to_mat_mut(frame)?;

    for b in &effects.bounding_boxes {
        imgproc::rectangle(
            &mut mat,
            opencv::core::Rect::new(b.x, b.y, b.width, b.height),
            scalar(GREEN),
            2,
            imgproc::LINE_8,
            0,
        )?;
    }

    if let Some(zone) = zone {
        let min_x = zone.iter().map(|p| p.x).min().unwrap();
        let min_y = zone.iter().map(|p| p.y).min().unwrap();
        let max_x = zone.iter().map(|p| p.x).max().unwrap();
        let max_y = zone.iter().map(|p| p.y).max().unwrap();

        imgproc::rectangle(
            &mut mat,
            opencv::core::Rect::new(min_x, min_y, max_x - min_x, max_y - min_y),
            scalar(RED),
            2,
            imgproc::LINE_8,
            0,
        )?;
        imgproc::put_text(
            &mut mat,
            "Zone",
            CvPoint::new(min_x, (min_y - 10).max(0)),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.8,
            scalar(RED),
            2,
            imgproc::LINE_8,
            false,
        )?;
    }

    if recording {
        imgproc::put_text(
            &mut mat,
            "REC",
            CvPoint::new(10, 30),
            imgproc::FONT_HERSHEY_SIMPLEX,
            1.0,
            scalar(RED),
            3,
            imgproc::LINE_8,
            false,
        )?;
    }

    imgproc::put_text(
        &mut mat,
        &format!("Detected objects: {}", effects.object_count),
        CvPoint::new(10, frame.height as i32 - 10),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.7,
        scalar(RED),
        2,
        imgproc::LINE_8,
        false,
    )?;

    let data = mat.data_bytes()?.to_vec();
    Ok(Frame::new(frame.width, frame.height, data))
}

/// JPEG-encodes a frame for a screenshot or snapshot artifact.
pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>> {
    let mat = frame_to_mat_mut(frame)?;
    let mut buf: Vector<u8> = Vector::new();
    let params: Vector<i32> = Vector::new();
    imgcodecs::imencode(".jpg", &mat, &mut buf, &params)?;
    Ok(buf.to_vec())
}
