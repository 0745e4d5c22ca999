//! In-memory [`MediaItemStore`] for tests without a database.
//!
//! Each conditional update checks and writes under one lock, matching the
//! single-statement semantics of the Postgres repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cadence_core::models::{MediaItem, MediaStatus, MezzanineStatus, TranscodingOutputs};
use cadence_core::AppError;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::store::MediaItemStore;

#[derive(Clone, Default)]
pub struct InMemoryMediaItemStore {
    items: Arc<Mutex<HashMap<String, MediaItem>>>,
}

impl InMemoryMediaItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, item: MediaItem) {
        self.items.lock().await.insert(item.id.clone(), item);
    }

    /// Raw row access, including soft-deleted items.
    pub async fn snapshot(&self, id: &str) -> Option<MediaItem> {
        self.items.lock().await.get(id).cloned()
    }

    async fn update_if<F>(&self, id: &str, guard: F, apply: impl FnOnce(&mut MediaItem)) -> Option<MediaItem>
    where
        F: FnOnce(&MediaItem) -> bool,
    {
        let mut items = self.items.lock().await;
        let item = items.get_mut(id)?;
        if item.is_deleted() || !guard(item) {
            return None;
        }
        apply(item);
        item.updated_at = Utc::now();
        Some(item.clone())
    }
}

#[async_trait]
impl MediaItemStore for InMemoryMediaItemStore {
    async fn get(&self, id: &str) -> Result<Option<MediaItem>, AppError> {
        Ok(self
            .items
            .lock()
            .await
            .get(id)
            .filter(|item| !item.is_deleted())
            .cloned())
    }

    async fn find_by_job_id(&self, job_id: &str) -> Result<Option<MediaItem>, AppError> {
        Ok(self
            .items
            .lock()
            .await
            .values()
            .find(|item| !item.is_deleted() && item.runpod_job_id.as_deref() == Some(job_id))
            .cloned())
    }

    async fn begin_transcoding(
        &self,
        id: &str,
        expected: MediaStatus,
        job_id: &str,
        mezzanine_status: Option<MezzanineStatus>,
    ) -> Result<Option<MediaItem>, AppError> {
        Ok(self
            .update_if(
                id,
                |item| item.status == expected,
                |item| {
                    item.status = MediaStatus::Transcoding;
                    item.runpod_job_id = Some(job_id.to_string());
                    item.transcoding_attempts += 1;
                    item.transcoding_error = None;
                    item.mezzanine_key = None;
                    item.mezzanine_status = mezzanine_status;
                },
            )
            .await)
    }

    async fn complete_transcoding(
        &self,
        id: &str,
        job_id: &str,
        outputs: &TranscodingOutputs,
    ) -> Result<Option<MediaItem>, AppError> {
        Ok(self
            .update_if(
                id,
                |item| {
                    item.status == MediaStatus::Transcoding
                        && item.runpod_job_id.as_deref() == Some(job_id)
                },
                |item| {
                    item.status = MediaStatus::Ready;
                    item.hls_master_playlist_key = outputs.hls_master_playlist_key.clone();
                    item.hls_preview_key = outputs.hls_preview_key.clone();
                    item.thumbnail_key = outputs.thumbnail_key.clone();
                    item.waveform_key = outputs.waveform_key.clone();
                    item.waveform_image_key = outputs.waveform_image_key.clone();
                    item.duration_seconds = outputs.duration_seconds;
                    item.width = outputs.width;
                    item.height = outputs.height;
                    item.ready_variants = outputs.ready_variants.clone();
                    item.mezzanine_key = outputs.mezzanine_key.clone();
                    item.mezzanine_status = outputs.mezzanine_status;
                    item.transcoding_error = None;
                },
            )
            .await)
    }

    async fn fail_transcoding(
        &self,
        id: &str,
        job_id: &str,
        error: &str,
    ) -> Result<Option<MediaItem>, AppError> {
        Ok(self
            .update_if(
                id,
                |item| {
                    item.status == MediaStatus::Transcoding
                        && item.runpod_job_id.as_deref() == Some(job_id)
                },
                |item| {
                    item.status = MediaStatus::Failed;
                    item.transcoding_error = Some(error.to_string());
                    if item.mezzanine_status == Some(MezzanineStatus::Pending) {
                        item.mezzanine_status = Some(MezzanineStatus::Failed);
                    }
                },
            )
            .await)
    }
}
