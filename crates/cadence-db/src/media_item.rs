use async_trait::async_trait;
use cadence_core::models::{MediaItem, MediaStatus, MezzanineStatus, TranscodingOutputs};
use cadence_core::AppError;
use sqlx::{PgPool, Postgres};

use crate::store::MediaItemStore;

#[derive(Clone)]
pub struct MediaItemRepository {
    pool: PgPool,
}

impl MediaItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaItemStore for MediaItemRepository {
    #[tracing::instrument(skip(self), fields(db.table = "media_items", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: &str) -> Result<Option<MediaItem>, AppError> {
        let item = sqlx::query_as::<Postgres, MediaItem>(
            "SELECT * FROM media_items WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_items", db.operation = "select", job_id = %job_id))]
    async fn find_by_job_id(&self, job_id: &str) -> Result<Option<MediaItem>, AppError> {
        let item = sqlx::query_as::<Postgres, MediaItem>(
            r#"
            SELECT * FROM media_items
            WHERE runpod_job_id = $1 AND deleted_at IS NULL
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_items", db.operation = "update", db.record_id = %id))]
    async fn begin_transcoding(
        &self,
        id: &str,
        expected: MediaStatus,
        job_id: &str,
        mezzanine_status: Option<MezzanineStatus>,
    ) -> Result<Option<MediaItem>, AppError> {
        let item = sqlx::query_as::<Postgres, MediaItem>(
            r#"
            UPDATE media_items
            SET status = 'transcoding',
                runpod_job_id = $3,
                transcoding_attempts = transcoding_attempts + 1,
                transcoding_error = NULL,
                mezzanine_key = NULL,
                mezzanine_status = $4,
                updated_at = NOW()
            WHERE id = $1 AND status = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(job_id)
        .bind(mezzanine_status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    #[tracing::instrument(skip(self, outputs), fields(db.table = "media_items", db.operation = "update", db.record_id = %id, job_id = %job_id))]
    async fn complete_transcoding(
        &self,
        id: &str,
        job_id: &str,
        outputs: &TranscodingOutputs,
    ) -> Result<Option<MediaItem>, AppError> {
        let item = sqlx::query_as::<Postgres, MediaItem>(
            r#"
            UPDATE media_items
            SET status = 'ready',
                hls_master_playlist_key = $3,
                hls_preview_key = $4,
                thumbnail_key = $5,
                waveform_key = $6,
                waveform_image_key = $7,
                duration_seconds = $8,
                width = $9,
                height = $10,
                ready_variants = $11,
                mezzanine_key = $12,
                mezzanine_status = $13,
                transcoding_error = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND status = 'transcoding'
              AND runpod_job_id = $2
              AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(job_id)
        .bind(&outputs.hls_master_playlist_key)
        .bind(&outputs.hls_preview_key)
        .bind(&outputs.thumbnail_key)
        .bind(&outputs.waveform_key)
        .bind(&outputs.waveform_image_key)
        .bind(outputs.duration_seconds)
        .bind(outputs.width)
        .bind(outputs.height)
        .bind(&outputs.ready_variants)
        .bind(&outputs.mezzanine_key)
        .bind(outputs.mezzanine_status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    #[tracing::instrument(skip(self, error), fields(db.table = "media_items", db.operation = "update", db.record_id = %id, job_id = %job_id))]
    async fn fail_transcoding(
        &self,
        id: &str,
        job_id: &str,
        error: &str,
    ) -> Result<Option<MediaItem>, AppError> {
        let item = sqlx::query_as::<Postgres, MediaItem>(
            r#"
            UPDATE media_items
            SET status = 'failed',
                transcoding_error = $3,
                mezzanine_status = CASE
                    WHEN mezzanine_status = 'pending' THEN 'failed'::mezzanine_status
                    ELSE mezzanine_status
                END,
                updated_at = NOW()
            WHERE id = $1
              AND status = 'transcoding'
              AND runpod_job_id = $2
              AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(job_id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }
}
