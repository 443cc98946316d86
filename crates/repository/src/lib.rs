//! Typed read/write interface over camera configs, alarm zones and
//! notification subscribers.
//!
//! Grounded on `original_source/schemas/repository.py`'s `Repo` class for
//! the query shapes, generalized from its ad-hoc SQLAlchemy methods into a
//! single `Repository` trait so `fleet` can depend on the interface rather
//! than a concrete store. `SqliteRepository` is the one adapter this crate
//! ships.

pub mod error;
pub mod models;
pub mod sqlite;

pub use error::{RepositoryError, Result};
pub use models::{CameraConfig, Event, Point, SubscriberId, Zone, ZoneBounds};
pub use sqlite::SqliteRepository;

use async_trait::async_trait;

/// Read/write interface the fleet depends on. Consumed-only per spec.md §6;
/// the admin HTTP surface and durable store that implement this trait in
/// production are out of this workspace's scope.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Cameras with `enabled = true`, per spec.md §6.
    async fn list_cameras(&self) -> Result<Vec<CameraConfig>>;

    /// A single camera's config, or `None` if the row doesn't exist
    /// (distinct from it existing but disabled).
    async fn get_camera(&self, id: &str) -> Result<Option<CameraConfig>>;

    /// The zone points for a camera: zero or four points.
    async fn get_zone(&self, id: &str) -> Result<Option<Zone>>;

    /// Persists the alarm rectangle as four points.
    async fn update_zone(&self, id: &str, zone: Zone) -> Result<()>;

    /// Opaque subscriber identifiers used by the event dispatcher to fan
    /// notifications out one-per-subscriber (spec.md §4.7, confirmed by
    /// `celery_task/tasks.py`'s per-chat-id delivery loop).
    async fn list_notification_subscribers(&self) -> Result<Vec<SubscriberId>>;
}
