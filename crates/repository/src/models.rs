use serde::{Deserialize, Serialize};

/// A pixel coordinate in frame space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The four configured points of an alarm rectangle. Always exactly four;
/// a camera with no zone configured simply has `CameraConfig::zone == None`.
pub type Zone = [Point; 4];

/// Axis-aligned bounding box of a zone's four points, used for membership
/// tests. `min`/`max` are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl ZoneBounds {
    pub fn from_zone(zone: &Zone) -> Self {
        let xs = zone.iter().map(|p| p.x);
        let ys = zone.iter().map(|p| p.y);
        Self {
            min_x: xs.clone().min().unwrap(),
            max_x: xs.max().unwrap(),
            min_y: ys.clone().min().unwrap(),
            max_y: ys.max().unwrap(),
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Identity and stream settings for one physical camera.
///
/// `zone` absent means the detector still runs but draws no overlay and
/// triggers on any detected motion anywhere in the frame (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub id: String,
    pub url: String,
    pub enabled: bool,
    pub motion_enabled: bool,
    pub save_screenshot: bool,
    pub send_email: bool,
    pub send_chat: bool,
    pub send_chat_video: bool,
    pub zone: Option<Zone>,
}

impl CameraConfig {
    /// The axis-aligned bounds the detector tests centroids against.
    /// `None` means "whole frame" per spec.md §4.4.
    pub fn zone_bounds(&self) -> Option<ZoneBounds> {
        self.zone.as_ref().map(ZoneBounds::from_zone)
    }
}

/// Opaque identifier for a notification subscriber (email address, chat id,
/// ...). The repository never interprets it; only lists it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(pub String);

/// One artifact the core emits for delivery by the external notification
/// system. `ScreenshotEvent`/`ClipEvent` in spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Screenshot {
        camera_id: String,
        path: String,
        captured_at: chrono::DateTime<chrono::Utc>,
    },
    Clip {
        camera_id: String,
        path: String,
        captured_at: chrono::DateTime<chrono::Utc>,
        duration_seconds: u32,
    },
}
