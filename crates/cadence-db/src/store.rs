use async_trait::async_trait;
use cadence_core::models::{MediaItem, MediaStatus, MezzanineStatus, TranscodingOutputs};
use cadence_core::AppError;

/// Read/update access to media items for the transcoding core.
///
/// Soft-deleted rows are invisible through this trait. Mutating methods are
/// compare-and-swap: they return `Ok(None)` when the row was not in the
/// expected state, and the caller decides what that means.
#[async_trait]
pub trait MediaItemStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<MediaItem>, AppError>;

    async fn find_by_job_id(&self, job_id: &str) -> Result<Option<MediaItem>, AppError>;

    /// `expected -> transcoding`: records the new job, increments attempts,
    /// clears the previous error and resets the mezzanine sub-status.
    async fn begin_transcoding(
        &self,
        id: &str,
        expected: MediaStatus,
        job_id: &str,
        mezzanine_status: Option<MezzanineStatus>,
    ) -> Result<Option<MediaItem>, AppError>;

    /// `transcoding -> ready` for the given job only.
    async fn complete_transcoding(
        &self,
        id: &str,
        job_id: &str,
        outputs: &TranscodingOutputs,
    ) -> Result<Option<MediaItem>, AppError>;

    /// `transcoding -> failed` for the given job only. A pending mezzanine
    /// is marked failed with it.
    async fn fail_transcoding(
        &self,
        id: &str,
        job_id: &str,
        error: &str,
    ) -> Result<Option<MediaItem>, AppError>;
}
