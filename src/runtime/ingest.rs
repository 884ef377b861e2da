use std::env;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::app::App;
use crate::audio::MediaOutput;
use crate::config::LibrarySettings;
use crate::library::{LoftyReader, MetadataReader, collect_audio_files, ingest};

/// Expand `inputs` into audio files, read their metadata and append them to
/// the catalog as one batch. The outcome is reported as a notice.
pub fn add_paths<O: MediaOutput, R: MetadataReader>(
    app: &mut App<O>,
    inputs: &[PathBuf],
    library: &LibrarySettings,
    reader: &R,
) {
    if inputs.is_empty() {
        return;
    }
    let files = collect_audio_files(inputs, library);
    if files.is_empty() {
        info!(?inputs, "no audio files found");
        app.set_notice("No audio files found");
        return;
    }

    let report = ingest(&files, reader, &mut app.ids);
    for e in &report.failed {
        warn!(error = %e, "skipped file");
    }
    let skipped = report.failed.len();
    let added = app.add_tracks(report.tracks);
    if skipped > 0 {
        app.set_notice(format!("Added {added} tracks, skipped {skipped}"));
    } else {
        app.set_notice(format!("Added {added} tracks"));
    }
}

/// Add whatever the user typed into the path prompt.
pub fn add_typed_path<O: MediaOutput>(app: &mut App<O>, typed: &str, library: &LibrarySettings) {
    let typed = typed.trim();
    if typed.is_empty() {
        return;
    }
    add_paths(app, &[expand_home(typed)], library, &LoftyReader);
}

/// Expand a leading `~` to `$HOME`.
pub fn expand_home(input: &str) -> PathBuf {
    let rest = match input.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(input),
    };
    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => PathBuf::from(input),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::audio::fake::FakeOutput;
    use crate::audio::{PlaybackEngine, PlayerSettings};
    use crate::error::LibraryError;
    use crate::library::{ProbeInfo, TagInfo};

    struct StubReader;

    impl MetadataReader for StubReader {
        fn probe(&self, path: &Path) -> Result<ProbeInfo, LibraryError> {
            if path.file_name().is_some_and(|n| n.to_string_lossy().starts_with("bad")) {
                return Err(LibraryError::NotAudio(path.to_path_buf()));
            }
            Ok(ProbeInfo {
                duration: Some(30.0),
            })
        }

        fn read_tags(&self, _path: &Path) -> Result<TagInfo, LibraryError> {
            Ok(TagInfo::default())
        }
    }

    fn app() -> App<FakeOutput> {
        App::new(PlaybackEngine::new(
            FakeOutput::default(),
            PlayerSettings::default(),
        ))
    }

    #[test]
    fn directory_batch_is_added_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.mp3", "b.flac", "bad.ogg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let mut a = app();
        add_paths(
            &mut a,
            &[dir.path().to_path_buf()],
            &LibrarySettings::default(),
            &StubReader,
        );

        assert_eq!(a.catalog.len(), 2);
        assert_eq!(a.engine.current_index(), Some(0));
        assert_eq!(
            a.notice_at(std::time::Instant::now()),
            Some("Added 2 tracks, skipped 1")
        );
    }

    #[test]
    fn empty_directory_shows_notice() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = app();
        add_paths(
            &mut a,
            &[dir.path().to_path_buf()],
            &LibrarySettings::default(),
            &StubReader,
        );
        assert!(a.catalog.is_empty());
        assert_eq!(
            a.notice_at(std::time::Instant::now()),
            Some("No audio files found")
        );
    }

    #[test]
    fn tilde_expands_only_as_a_prefix() {
        assert_eq!(expand_home("/abs/x"), PathBuf::from("/abs/x"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
        if let Some(home) = env::var_os("HOME") {
            assert_eq!(expand_home("~/Music"), PathBuf::from(home).join("Music"));
        }
    }
}
