//! Track catalog and ingestion.
//!
//! This module owns the ordered track list and everything needed to fill
//! it: expanding picked paths, probing files and reading their tags.

mod catalog;
mod display;
mod ingest;
mod metadata;
mod model;
mod scan;

pub use catalog::{CatalogStats, SortKey, TrackCatalog, TrackView};
pub use display::{format_duration, format_time, truncate_name};
pub use ingest::{IngestReport, ingest};
pub use metadata::{LoftyReader, MetadataReader, ProbeInfo, ResourceProbe, TagInfo};
pub use model::{
    ResourceRef, Track, TrackId, TrackIds, TrackOrigin, UNKNOWN_ALBUM, UNKNOWN_ARTIST,
    name_from_path,
};
pub use scan::{audio_media_type, collect_audio_files};
