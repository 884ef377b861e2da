//! Metadata collaborators: the duration probe and the tag reader.
//!
//! Both are traits so ingestion and the startup probe can be driven by fakes
//! in tests; [`LoftyReader`] is the production implementation.

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use lofty::picture::PictureType;
use lofty::prelude::*;

use crate::error::LibraryError;

use super::model::ResourceRef;

/// Result of a metadata-only trial load.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProbeInfo {
    /// Seconds; `None` when the container does not report one.
    pub duration: Option<f64>,
}

/// Tags read from a file. Missing fields fall back to catalog defaults.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagInfo {
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Embedded picture as a `data:` URI.
    pub cover_art: Option<String>,
}

pub trait MetadataReader: Sync {
    /// Open `path` far enough to learn whether it is playable audio.
    fn probe(&self, path: &Path) -> Result<ProbeInfo, LibraryError>;

    /// Read artist/album/cover art.
    fn read_tags(&self, path: &Path) -> Result<TagInfo, LibraryError>;
}

/// Checks whether a stored resource reference is still usable.
pub trait ResourceProbe {
    fn is_valid(&self, resource: &ResourceRef) -> bool;
}

impl<T: MetadataReader + ?Sized> ResourceProbe for T {
    fn is_valid(&self, resource: &ResourceRef) -> bool {
        !resource.is_empty() && self.probe(&resource.to_path()).is_ok()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyReader;

impl LoftyReader {
    fn open(path: &Path) -> Result<lofty::file::TaggedFile, LibraryError> {
        let meta = std::fs::metadata(path).map_err(|source| LibraryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if !meta.is_file() {
            return Err(LibraryError::NotAudio(path.to_path_buf()));
        }
        lofty::read_from_path(path).map_err(|source| LibraryError::Metadata {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl MetadataReader for LoftyReader {
    fn probe(&self, path: &Path) -> Result<ProbeInfo, LibraryError> {
        let tagged = Self::open(path)?;
        let secs = tagged.properties().duration().as_secs_f64();
        Ok(ProbeInfo {
            duration: (secs > 0.0).then_some(secs),
        })
    }

    fn read_tags(&self, path: &Path) -> Result<TagInfo, LibraryError> {
        let tagged = Self::open(path)?;
        let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
            return Ok(TagInfo::default());
        };

        let non_empty = |v: Option<std::borrow::Cow<'_, str>>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };

        let pictures = tag.pictures();
        let cover_art = pictures
            .iter()
            .find(|p| matches!(p.pic_type(), PictureType::CoverFront))
            .or_else(|| pictures.first())
            .map(|p| {
                let mime = p
                    .mime_type()
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "image/jpeg".to_string());
                data_uri(&mime, p.data())
            });

        Ok(TagInfo {
            artist: non_empty(tag.artist()),
            album: non_empty(tag.album()),
            cover_art,
        })
    }
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
