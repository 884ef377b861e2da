use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::App;
use crate::audio::{MediaOutput, PlaybackEngine, PlayerSettings, RodioOutput};
use crate::config;
use crate::library::{LoftyReader, ResourceProbe};
use crate::store::{JsonFileStore, MemoryStore, PersistenceStore};

use super::ingest::add_paths;

/// Send logs to the configured file. The terminal belongs to the TUI, so
/// when the file cannot be opened logging stays off.
pub fn init_logging(settings: &config::Settings) {
    let Some(path) = settings.log_path() else {
        return;
    };
    if let Some(dir) = path.parent() {
        if fs::create_dir_all(dir).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init();
}

pub fn open_store(settings: &config::Settings) -> PersistenceStore {
    if !settings.persistence.enabled {
        info!("persistence disabled");
        return PersistenceStore::new(Box::new(MemoryStore::new()));
    }
    match settings.state_path() {
        Some(path) => {
            info!(path = %path.display(), "using state file");
            PersistenceStore::new(Box::new(JsonFileStore::open(path)))
        }
        None => {
            warn!("no state directory available, playlist will not be saved");
            PersistenceStore::new(Box::new(MemoryStore::new()))
        }
    }
}

/// Bring the previous run back: settings always, tracks and the resume
/// point when the first stored track is still readable. Nothing is played,
/// and nothing is loaded unless the stored index still names a track.
pub fn restore_session<O: MediaOutput>(
    app: &mut App<O>,
    store: &mut PersistenceStore,
    defaults: PlayerSettings,
    probe: &dyn ResourceProbe,
) {
    let outcome = store.load(defaults, probe, &mut app.ids);
    app.engine.restore_settings(outcome.settings);
    if let Some(notice) = outcome.notice {
        app.set_notice(notice);
    }
    if outcome.tracks.is_empty() {
        return;
    }

    app.catalog.append(outcome.tracks);
    app.select_first();
    let resumed = outcome
        .resume
        .is_some_and(|(index, time)| app.engine.resume(&app.catalog, index, time));
    info!(tracks = app.catalog.len(), resumed, "session restored");
}

pub fn build_app(
    settings: &config::Settings,
    paths: &[PathBuf],
    restore: bool,
    store: &mut PersistenceStore,
) -> App<RodioOutput> {
    let defaults = PlayerSettings::from(&settings.player);
    let engine = PlaybackEngine::new(RodioOutput::open(), defaults);
    let mut app = App::new(engine);

    if restore {
        restore_session(&mut app, store, defaults, &LoftyReader);
    }
    add_paths(&mut app, paths, &settings.library, &LoftyReader);
    app
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::audio::fake::FakeOutput;
    use crate::audio::PlaybackStatus;
    use crate::library::{ResourceRef, Track, TrackCatalog, TrackIds};
    use crate::store::STALE_TRACKS_NOTICE;

    struct Probe(bool);

    impl ResourceProbe for Probe {
        fn is_valid(&self, _resource: &ResourceRef) -> bool {
            self.0
        }
    }

    fn saved_store(resume: Option<(usize, f64)>) -> PersistenceStore {
        let mut ids = TrackIds::new();
        let mut catalog = TrackCatalog::new();
        catalog.append(
            ["/m/a.mp3", "/m/b.mp3"]
                .iter()
                .map(|p| {
                    let mut t = Track::from_path(ids.allocate(), Path::new(p));
                    t.duration = Some(100.0);
                    t
                })
                .collect(),
        );
        let mut store = PersistenceStore::new(Box::new(MemoryStore::new()));
        let settings = PlayerSettings {
            volume: 0.25,
            ..PlayerSettings::default()
        };
        store.save(&catalog, &settings);
        match resume {
            Some((i, t)) => store.save_position(Some(i), t),
            None => store.save_position(None, 0.0),
        }
        store
    }

    fn app() -> App<FakeOutput> {
        App::new(PlaybackEngine::new(
            FakeOutput::default(),
            PlayerSettings::default(),
        ))
    }

    #[test]
    fn restore_resumes_stored_track_without_playing() {
        let mut store = saved_store(Some((1, 42.0)));
        let mut a = app();
        restore_session(&mut a, &mut store, PlayerSettings::default(), &Probe(true));

        assert_eq!(a.catalog.len(), 2);
        assert_eq!(a.engine.current_index(), Some(1));
        assert_eq!(a.engine.position(), 42.0);
        assert_eq!(a.engine.status(), PlaybackStatus::Loaded);
        assert_eq!(a.engine.settings().volume, 0.25);
        assert_eq!(a.selected, Some(0));
    }

    #[test]
    fn resume_index_past_the_end_leaves_engine_unloaded() {
        let mut store = saved_store(Some((5, 10.0)));
        let mut a = app();
        restore_session(&mut a, &mut store, PlayerSettings::default(), &Probe(true));

        assert_eq!(a.catalog.len(), 2);
        assert_eq!(a.engine.status(), PlaybackStatus::Idle);
        assert_eq!(a.engine.current_index(), None);
        assert_eq!(a.selected, Some(0));
    }

    #[test]
    fn missing_resume_index_leaves_engine_unloaded() {
        // save_position(None, ..) stores -1
        let mut store = saved_store(None);
        let mut a = app();
        restore_session(&mut a, &mut store, PlayerSettings::default(), &Probe(true));

        assert_eq!(a.catalog.len(), 2);
        assert_eq!(a.engine.status(), PlaybackStatus::Idle);
        assert_eq!(a.engine.current_index(), None);
    }

    #[test]
    fn stale_tracks_leave_an_empty_catalog_and_a_notice() {
        let mut store = saved_store(Some((0, 5.0)));
        let mut a = app();
        restore_session(&mut a, &mut store, PlayerSettings::default(), &Probe(false));

        assert!(a.catalog.is_empty());
        assert_eq!(a.engine.status(), PlaybackStatus::Idle);
        assert_eq!(a.engine.settings().volume, 0.25);
        assert_eq!(
            a.notice_at(std::time::Instant::now()),
            Some(STALE_TRACKS_NOTICE)
        );
    }

    #[test]
    fn disabled_persistence_uses_memory_store() {
        let mut settings = config::Settings::default();
        settings.persistence.enabled = false;
        let mut store = open_store(&settings);
        let mut ids = TrackIds::new();
        let out = store.load(PlayerSettings::default(), &Probe(true), &mut ids);
        assert!(out.tracks.is_empty());
    }
}
