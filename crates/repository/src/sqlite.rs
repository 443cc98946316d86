//! SQLite-backed `Repository` adapter.
//!
//! The Python original persists cameras, users and zones in SQLite through
//! SQLAlchemy (`original_source/schemas/repository.py`,
//! `original_source/schemas/database.py`). Neither `rustSmartScope` nor any
//! other pack teacher touches persistence, so this adapter is built on
//! `sqlx`'s sqlite driver, the only SQL crate attested anywhere in the
//! retrieval pack (see DESIGN.md).

use crate::error::{RepositoryError, Result};
use crate::models::{CameraConfig, Point, SubscriberId, Zone};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use crate::Repository;

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Self::migrate(&pool).await?;
        info!("repository connected");
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        debug!("running repository migrations");
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cameras (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                motion_enabled INTEGER NOT NULL DEFAULT 1,
                save_screenshot INTEGER NOT NULL DEFAULT 0,
                send_email INTEGER NOT NULL DEFAULT 0,
                send_chat INTEGER NOT NULL DEFAULT 0,
                send_chat_video INTEGER NOT NULL DEFAULT 0,
                zone_x1 INTEGER, zone_y1 INTEGER,
                zone_x2 INTEGER, zone_y2 INTEGER,
                zone_x3 INTEGER, zone_y3 INTEGER,
                zone_x4 INTEGER, zone_y4 INTEGER
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notification_subscribers (
                subscriber_id TEXT PRIMARY KEY
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    fn row_to_config(row: &sqlx::sqlite::SqliteRow) -> Result<CameraConfig> {
        let zone = match (
            row.try_get::<Option<i64>, _>("zone_x1")?,
            row.try_get::<Option<i64>, _>("zone_y1")?,
            row.try_get::<Option<i64>, _>("zone_x2")?,
            row.try_get::<Option<i64>, _>("zone_y2")?,
            row.try_get::<Option<i64>, _>("zone_x3")?,
            row.try_get::<Option<i64>, _>("zone_y3")?,
            row.try_get::<Option<i64>, _>("zone_x4")?,
            row.try_get::<Option<i64>, _>("zone_y4")?,
        ) {
            (Some(x1), Some(y1), Some(x2), Some(y2), Some(x3), Some(y3), Some(x4), Some(y4)) => {
                Some([
                    Point::new(x1 as i32, y1 as i32),
                    Point::new(x2 as i32, y2 as i32),
                    Point::new(x3 as i32, y3 as i32),
                    Point::new(x4 as i32, y4 as i32),
                ])
            }
            _ => None,
        };

        Ok(CameraConfig {
            id: row.try_get("id")?,
            url: row.try_get("url")?,
            enabled: row.try_get::<i64, _>("enabled")? != 0,
            motion_enabled: row.try_get::<i64, _>("motion_enabled")? != 0,
            save_screenshot: row.try_get::<i64, _>("save_screenshot")? != 0,
            send_email: row.try_get::<i64, _>("send_email")? != 0,
            send_chat: row.try_get::<i64, _>("send_chat")? != 0,
            send_chat_video: row.try_get::<i64, _>("send_chat_video")? != 0,
            zone,
        })
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn list_cameras(&self) -> Result<Vec<CameraConfig>> {
        let rows = sqlx::query("SELECT * FROM cameras WHERE enabled = 1")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_config).collect()
    }

    async fn get_camera(&self, id: &str) -> Result<Option<CameraConfig>> {
        let row = sqlx::query("SELECT * FROM cameras WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_config).transpose()
    }

    async fn get_zone(&self, id: &str) -> Result<Option<Zone>> {
        Ok(self.get_camera(id).await?.and_then(|c| c.zone))
    }

    async fn update_zone(&self, id: &str, zone: Zone) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE cameras SET
                zone_x1 = ?, zone_y1 = ?,
                zone_x2 = ?, zone_y2 = ?,
                zone_x3 = ?, zone_y3 = ?,
                zone_x4 = ?, zone_y4 = ?
            WHERE id = ?
            "#,
        )
        .bind(zone[0].x)
        .bind(zone[0].y)
        .bind(zone[1].x)
        .bind(zone[1].y)
        .bind(zone[2].x)
        .bind(zone[2].y)
        .bind(zone[3].x)
        .bind(zone[3].y)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(camera_id = %id, "update_zone on unknown camera");
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_notification_subscribers(&self) -> Result<Vec<SubscriberId>> {
        let rows = sqlx::query("SELECT subscriber_id FROM notification_subscribers")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| SubscriberId(r.get("subscriber_id")))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_repo() -> SqliteRepository {
        SqliteRepository::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn empty_repository_lists_no_cameras() {
        let repo = test_repo().await;
        assert!(repo.list_cameras().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_zone_round_trips_four_points() {
        let repo = test_repo().await;
        sqlx::query(
            "INSERT INTO cameras (id, url, enabled) VALUES ('cam1', 'rtsp://x', 1)",
        )
        .execute(&repo.pool)
        .await
        .unwrap();

        let zone = [
            Point::new(230, 440),
            Point::new(485, 440),
            Point::new(230, 575),
            Point::new(485, 575),
        ];
        repo.update_zone("cam1", zone).await.unwrap();

        let stored = repo.get_zone("cam1").await.unwrap().unwrap();
        assert_eq!(stored, zone);
    }

    #[tokio::test]
    async fn update_zone_on_missing_camera_is_not_found() {
        let repo = test_repo().await;
        let zone = [Point::new(0, 0); 4];
        let err = repo.update_zone("missing", zone).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
