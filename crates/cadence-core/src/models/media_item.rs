use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaType::Video => write!(f, "video"),
            MediaType::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(MediaType::Video),
            "audio" => Ok(MediaType::Audio),
            _ => Err(anyhow::anyhow!("Invalid media type: {}", s)),
        }
    }
}

/// Lifecycle of a media item.
///
/// `uploading -> uploaded` belongs to the upload subsystem. This core only
/// performs `uploaded -> transcoding`, `transcoding -> ready | failed` and
/// `failed -> transcoding`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    Uploading,
    Uploaded,
    Transcoding,
    Ready,
    Failed,
}

impl Display for MediaStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaStatus::Uploading => write!(f, "uploading"),
            MediaStatus::Uploaded => write!(f, "uploaded"),
            MediaStatus::Transcoding => write!(f, "transcoding"),
            MediaStatus::Ready => write!(f, "ready"),
            MediaStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for MediaStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploading" => Ok(MediaStatus::Uploading),
            "uploaded" => Ok(MediaStatus::Uploaded),
            "transcoding" => Ok(MediaStatus::Transcoding),
            "ready" => Ok(MediaStatus::Ready),
            "failed" => Ok(MediaStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid media status: {}", s)),
        }
    }
}

/// Sub-status of the archival mezzanine encode, tracked independently of
/// the main pipeline. Always `None` for audio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "mezzanine_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MezzanineStatus {
    Pending,
    Ready,
    Failed,
}

impl Display for MezzanineStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MezzanineStatus::Pending => write!(f, "pending"),
            MezzanineStatus::Ready => write!(f, "ready"),
            MezzanineStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MediaItem {
    pub id: String,
    pub creator_id: String,
    pub media_type: MediaType,
    pub status: MediaStatus,
    pub r2_key: Option<String>,
    pub runpod_job_id: Option<String>,
    pub transcoding_attempts: i32,
    pub transcoding_error: Option<String>,
    pub transcoding_priority: i32,
    pub hls_master_playlist_key: Option<String>,
    pub hls_preview_key: Option<String>,
    pub thumbnail_key: Option<String>,
    pub waveform_key: Option<String>,
    pub waveform_image_key: Option<String>,
    pub duration_seconds: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub ready_variants: Vec<String>,
    pub mezzanine_key: Option<String>,
    pub mezzanine_status: Option<MezzanineStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MediaItem {
    /// A freshly uploaded item with no transcoding history.
    pub fn new_uploaded(
        id: impl Into<String>,
        creator_id: impl Into<String>,
        media_type: MediaType,
        r2_key: Option<String>,
    ) -> Self {
        let now = Utc::now();
        MediaItem {
            id: id.into(),
            creator_id: creator_id.into(),
            media_type,
            status: MediaStatus::Uploaded,
            r2_key,
            runpod_job_id: None,
            transcoding_attempts: 0,
            transcoding_error: None,
            transcoding_priority: 0,
            hls_master_playlist_key: None,
            hls_preview_key: None,
            thumbnail_key: None,
            waveform_key: None,
            waveform_image_key: None,
            duration_seconds: None,
            width: None,
            height: None,
            ready_variants: Vec::new(),
            mezzanine_key: None,
            mezzanine_status: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_owned_by(&self, creator_id: &str) -> bool {
        self.creator_id == creator_id
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// True once attempts reach the configured review threshold.
    pub fn needs_operator_review(&self, threshold: i32) -> bool {
        self.transcoding_attempts >= threshold
    }
}
