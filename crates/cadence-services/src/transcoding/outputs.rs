//! Output key planning for job submission and validation of what the worker
//! reports back.

use cadence_core::models::{
    JobOutputKeys, MediaItem, MediaType, MezzanineStatus, TranscodingOutputs, WebhookOutput,
};
use cadence_core::AppError;
use cadence_storage::keys::{self, KeyKind};

const MAX_VARIANT_LEN: usize = 32;

fn key(kind: KeyKind, item: &MediaItem) -> Result<String, AppError> {
    keys::derive(kind, &item.creator_id, &item.id, None)
        .map_err(|e| AppError::Validation(format!("Cannot derive storage key: {}", e)))
}

/// Destination keys for a media item's transcoding outputs.
pub fn job_output_keys(item: &MediaItem) -> Result<JobOutputKeys, AppError> {
    let hls_master_key = key(KeyKind::HlsMaster, item)?;
    let hls_prefix = hls_master_key
        .strip_suffix("master.m3u8")
        .unwrap_or(&hls_master_key)
        .to_string();

    let keys = match item.media_type {
        MediaType::Video => JobOutputKeys {
            hls_prefix,
            hls_master_key,
            hls_preview_key: Some(key(KeyKind::HlsPreview, item)?),
            thumbnail_key: Some(key(KeyKind::Thumbnail, item)?),
            waveform_key: None,
            waveform_image_key: None,
            mezzanine_key: Some(key(KeyKind::Mezzanine, item)?),
        },
        MediaType::Audio => JobOutputKeys {
            hls_prefix,
            hls_master_key,
            hls_preview_key: None,
            thumbnail_key: None,
            waveform_key: Some(key(KeyKind::Waveform, item)?),
            waveform_image_key: Some(key(KeyKind::WaveformImage, item)?),
            mezzanine_key: None,
        },
    };
    Ok(keys)
}

/// Check that a reported key is well formed and sits in this media item's
/// namespace under the folder its field implies.
fn check_reported_key(
    field: &str,
    reported: &str,
    kind: KeyKind,
    item: &MediaItem,
) -> Result<(), String> {
    let parsed = keys::parse(reported).ok_or_else(|| format!("{} is malformed", field))?;
    if parsed.creator_id != item.creator_id || parsed.media_id != item.id {
        return Err(format!("{} belongs to another media item", field));
    }
    if parsed.folder != kind.folder() {
        return Err(format!("{} is outside the {} folder", field, kind.folder()));
    }
    Ok(())
}

/// A pixel dimension: a whole number in `0..=i32::MAX`.
fn dimension(field: &str, value: Option<f64>) -> Result<Option<i32>, String> {
    match value {
        None => Ok(None),
        Some(v) if !v.is_finite() || v < 0.0 || v > i32::MAX as f64 || v.fract() != 0.0 => {
            Err(format!("{} is out of range", field))
        }
        Some(v) => Ok(Some(v as i32)),
    }
}

/// Validate a completed job's report and turn it into the metadata to store.
/// The error string is for logs only.
pub fn accept_outputs(item: &MediaItem, output: &WebhookOutput) -> Result<TranscodingOutputs, String> {
    if let Some(reported_media) = output.media_id.as_deref() {
        if reported_media != item.id {
            return Err("mediaId does not match the media item".to_string());
        }
    }

    let hls_master = output
        .hls_master_key
        .as_deref()
        .ok_or_else(|| "hlsMasterKey is missing".to_string())?;

    let reported = [
        ("hlsMasterKey", Some(hls_master), KeyKind::HlsMaster),
        ("hlsPreviewKey", output.hls_preview_key.as_deref(), KeyKind::HlsPreview),
        ("thumbnailKey", output.thumbnail_key.as_deref(), KeyKind::Thumbnail),
        ("waveformKey", output.waveform_key.as_deref(), KeyKind::Waveform),
        ("waveformImageKey", output.waveform_image_key.as_deref(), KeyKind::WaveformImage),
        ("mezzanineKey", output.mezzanine_key.as_deref(), KeyKind::Mezzanine),
    ];
    for (field, value, kind) in reported {
        if let Some(value) = value {
            check_reported_key(field, value, kind, item)?;
        }
    }

    let duration_seconds = match output.duration_seconds {
        Some(d) if !d.is_finite() || d < 0.0 || d > i32::MAX as f64 => {
            return Err("durationSeconds is out of range".to_string())
        }
        Some(d) => Some(d.round() as i32),
        None => None,
    };

    for variant in &output.ready_variants {
        let valid = !variant.is_empty()
            && variant.len() <= MAX_VARIANT_LEN
            && variant
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(format!("readyVariants contains an invalid entry: {:?}", variant));
        }
    }

    let (mezzanine_key, mezzanine_status) = match item.media_type {
        MediaType::Video => match &output.mezzanine_key {
            Some(k) => (Some(k.clone()), Some(MezzanineStatus::Ready)),
            None => (None, Some(MezzanineStatus::Failed)),
        },
        MediaType::Audio => (None, None),
    };

    Ok(TranscodingOutputs {
        hls_master_playlist_key: Some(hls_master.to_string()),
        hls_preview_key: output.hls_preview_key.clone(),
        thumbnail_key: output.thumbnail_key.clone(),
        waveform_key: output.waveform_key.clone(),
        waveform_image_key: output.waveform_image_key.clone(),
        duration_seconds,
        width: dimension("width", output.width)?,
        height: dimension("height", output.height)?,
        ready_variants: output.ready_variants.clone(),
        mezzanine_key,
        mezzanine_status,
    })
}
