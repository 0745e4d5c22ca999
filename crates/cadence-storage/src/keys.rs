//! Deterministic storage key derivation, validation and parsing.
//!
//! All functions here are pure. `validate` is structural only: it does not
//! check that a key belongs to a particular creator, callers compare the
//! components returned by `parse` for that.

use std::borrow::Cow;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use percent_encoding::percent_decode_str;

/// Minimum number of `/`-separated segments in a well-formed key.
pub const MIN_KEY_SEGMENTS: usize = 4;

/// Percent-decoding passes applied when looking for hidden traversal
/// sequences (`%252e%252e` decodes twice).
const MAX_DECODE_PASSES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Original,
    HlsMaster,
    HlsPreview,
    Thumbnail,
    Waveform,
    WaveformImage,
    ContentThumbnail,
    OrgLogo,
    Avatar,
    Mezzanine,
    /// Listing prefix for a media item's mezzanine objects. Not a key.
    MezzaninePrefix,
}

impl KeyKind {
    pub const ALL: [KeyKind; 11] = [
        KeyKind::Original,
        KeyKind::HlsMaster,
        KeyKind::HlsPreview,
        KeyKind::Thumbnail,
        KeyKind::Waveform,
        KeyKind::WaveformImage,
        KeyKind::ContentThumbnail,
        KeyKind::OrgLogo,
        KeyKind::Avatar,
        KeyKind::Mezzanine,
        KeyKind::MezzaninePrefix,
    ];

    /// Second path segment for keys of this kind.
    pub fn folder(&self) -> &'static str {
        match self {
            KeyKind::Original => "originals",
            KeyKind::HlsMaster | KeyKind::HlsPreview => "hls",
            KeyKind::Thumbnail => "thumbnails",
            KeyKind::Waveform | KeyKind::WaveformImage => "waveforms",
            KeyKind::ContentThumbnail => "content-thumbnails",
            KeyKind::OrgLogo => "branding",
            KeyKind::Avatar => "avatars",
            KeyKind::Mezzanine | KeyKind::MezzaninePrefix => "mezzanine",
        }
    }

    fn default_variant(&self) -> Option<&'static str> {
        match self {
            KeyKind::Thumbnail => Some("auto-generated"),
            KeyKind::ContentThumbnail | KeyKind::Avatar => Some("md"),
            KeyKind::OrgLogo => Some("logo"),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Original => "original",
            KeyKind::HlsMaster => "hls-master",
            KeyKind::HlsPreview => "hls-preview",
            KeyKind::Thumbnail => "thumbnail",
            KeyKind::Waveform => "waveform",
            KeyKind::WaveformImage => "waveform-image",
            KeyKind::ContentThumbnail => "content-thumbnail",
            KeyKind::OrgLogo => "org-logo",
            KeyKind::Avatar => "avatar",
            KeyKind::Mezzanine => "mezzanine",
            KeyKind::MezzaninePrefix => "mezzanine-prefix",
        }
    }
}

impl Display for KeyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyKind {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| KeyError::UnknownKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("{0} must not be empty")]
    EmptyComponent(&'static str),

    #[error("{field} contains a forbidden sequence: {value:?}")]
    InvalidComponent { field: &'static str, value: String },

    #[error("{0} keys require a variant")]
    MissingVariant(KeyKind),

    #[error("unknown key kind: {0}")]
    UnknownKind(String),
}

/// Structural decomposition of a storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    pub creator_id: String,
    pub folder: String,
    pub media_id: String,
    /// Everything after the media id; may itself contain `/`.
    pub filename: String,
}

/// Build the storage key of `kind` for a creator and media item.
///
/// `variant` is the uploaded filename for originals and a size/name token for
/// image kinds; it is ignored by kinds with a fixed filename.
pub fn derive(
    kind: KeyKind,
    creator_id: &str,
    media_id: &str,
    variant: Option<&str>,
) -> Result<String, KeyError> {
    check_component("creator_id", creator_id)?;
    check_component("media_id", media_id)?;

    let c = creator_id;
    let m = media_id;
    let key = match kind {
        KeyKind::Original => {
            let filename = variant.ok_or(KeyError::MissingVariant(kind))?;
            check_component("variant", filename)?;
            format!("{c}/originals/{m}/{filename}")
        }
        KeyKind::HlsMaster => format!("{c}/hls/{m}/master.m3u8"),
        KeyKind::HlsPreview => format!("{c}/hls/{m}/preview/preview.m3u8"),
        KeyKind::Waveform => format!("{c}/waveforms/{m}/waveform.json"),
        KeyKind::WaveformImage => format!("{c}/waveforms/{m}/waveform.png"),
        KeyKind::Mezzanine => format!("{c}/mezzanine/{m}/mezzanine.mp4"),
        KeyKind::MezzaninePrefix => format!("{c}/mezzanine/{m}/"),
        KeyKind::Thumbnail | KeyKind::ContentThumbnail | KeyKind::OrgLogo | KeyKind::Avatar => {
            let v = resolve_variant(kind, variant)?;
            let ext = match kind {
                KeyKind::Thumbnail => "jpg",
                KeyKind::OrgLogo => "png",
                _ => "webp",
            };
            format!("{c}/{}/{m}/{v}.{ext}", kind.folder())
        }
    };
    Ok(key)
}

fn resolve_variant(kind: KeyKind, variant: Option<&str>) -> Result<&str, KeyError> {
    match variant {
        Some(v) => {
            check_component("variant", v)?;
            Ok(v)
        }
        None => kind.default_variant().ok_or(KeyError::MissingVariant(kind)),
    }
}

fn check_component(field: &'static str, value: &str) -> Result<(), KeyError> {
    if value.trim().is_empty() {
        return Err(KeyError::EmptyComponent(field));
    }
    let forbidden = decoded_forms(value).iter().any(|form| {
        form.contains('/')
            || form.contains('\\')
            || form.contains('\0')
            || form.contains("..")
            || form.as_ref() == "."
    });
    if forbidden {
        return Err(KeyError::InvalidComponent {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// The raw input followed by each successive percent-decoding of it.
fn decoded_forms(raw: &str) -> Vec<Cow<'_, str>> {
    let mut forms: Vec<Cow<'_, str>> = vec![Cow::Borrowed(raw)];
    for _ in 0..MAX_DECODE_PASSES {
        let Some(last) = forms.last() else { break };
        let decoded = percent_decode_str(last).decode_utf8_lossy().into_owned();
        if decoded == last.as_ref() {
            break;
        }
        forms.push(Cow::Owned(decoded));
    }
    forms
}

/// Check an externally supplied key for traversal and structural problems.
pub fn validate(key: &str) -> bool {
    if key.is_empty() {
        return false;
    }
    decoded_forms(key).iter().all(|form| is_well_formed(form))
}

fn is_well_formed(key: &str) -> bool {
    if key.starts_with('/') || key.contains('\\') || key.contains('\0') || key.contains("..") {
        return false;
    }
    let mut count = 0;
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." {
            return false;
        }
        count += 1;
    }
    count >= MIN_KEY_SEGMENTS
}

/// Split a key into its components. Returns `None` for anything
/// [`validate`] rejects.
pub fn parse(key: &str) -> Option<ParsedKey> {
    if !validate(key) {
        return None;
    }
    let mut parts = key.splitn(4, '/');
    let creator_id = parts.next()?;
    let folder = parts.next()?;
    let media_id = parts.next()?;
    let filename = parts.next()?;
    Some(ParsedKey {
        creator_id: creator_id.to_string(),
        folder: folder.to_string(),
        media_id: media_id.to_string(),
        filename: filename.to_string(),
    })
}
