//! Batch ingestion: resolve metadata for many files concurrently while
//! keeping the resulting tracks in input order.
//!
//! Every file gets a slot (and its [`TrackId`]) before any worker starts.
//! Workers report `(slot, result)` in whatever order they finish; the batch
//! is only finalised once the number of reports equals the batch size.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use tracing::{debug, warn};

use crate::error::LibraryError;

use super::metadata::MetadataReader;
use super::model::{Track, TrackId, TrackIds, UNKNOWN_ALBUM, UNKNOWN_ARTIST};

const MAX_WORKERS: usize = 8;

#[derive(Debug, Default)]
pub struct IngestReport {
    /// Successfully resolved tracks, in input order.
    pub tracks: Vec<Track>,
    /// Files that could not be opened as audio.
    pub failed: Vec<LibraryError>,
}

pub fn ingest<R: MetadataReader>(files: &[PathBuf], reader: &R, ids: &mut TrackIds) -> IngestReport {
    let batch = files.len();
    if batch == 0 {
        return IngestReport::default();
    }

    let reserved: Vec<(TrackId, &Path)> = files
        .iter()
        .map(|p| (ids.allocate(), p.as_path()))
        .collect();
    let mut slots: Vec<Option<Result<Track, LibraryError>>> = (0..batch).map(|_| None).collect();

    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_WORKERS)
        .min(batch);
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, Result<Track, LibraryError>)>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            let reserved = &reserved;
            scope.spawn(move || {
                loop {
                    let slot = next.fetch_add(1, Ordering::Relaxed);
                    let Some(&(id, path)) = reserved.get(slot) else {
                        break;
                    };
                    if tx.send((slot, resolve(id, path, reader))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut completed = 0;
        while completed < batch {
            match rx.recv() {
                Ok((slot, result)) => {
                    slots[slot] = Some(result);
                    completed += 1;
                }
                Err(_) => break,
            }
        }
    });

    let mut report = IngestReport::default();
    for result in slots.into_iter().flatten() {
        match result {
            Ok(track) => report.tracks.push(track),
            Err(e) => {
                warn!(error = %e, "dropping file that could not be probed");
                report.failed.push(e);
            }
        }
    }
    debug!(
        added = report.tracks.len(),
        failed = report.failed.len(),
        "ingestion batch finished"
    );
    report
}

fn resolve<R: MetadataReader>(id: TrackId, path: &Path, reader: &R) -> Result<Track, LibraryError> {
    let probe = reader.probe(path)?;

    let mut track = Track::from_path(id, path);
    track.duration = probe.duration;

    match reader.read_tags(path) {
        Ok(tags) => {
            track.artist = tags.artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
            track.album = tags.album.unwrap_or_else(|| UNKNOWN_ALBUM.to_string());
            track.cover_art = tags.cover_art;
        }
        Err(e) => debug!(error = %e, "tag read failed, keeping defaults"),
    }

    Ok(track)
}
