use std::path::Path;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::*;
use crate::audio::fake::FakeOutput;
use crate::audio::{PlaybackEngine, PlayerSettings};
use crate::library::Track;
use crate::store::{MemoryStore, RESUME_INDEX_KEY, RESUME_TIME_KEY, SETTINGS_KEY, TRACKS_KEY};

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ch(c: char) -> KeyEvent {
    key(KeyCode::Char(c))
}

fn setup(n: usize) -> (App<FakeOutput>, config::Settings, EventLoopState) {
    let mut app = App::new(PlaybackEngine::new(
        FakeOutput::default(),
        PlayerSettings::default(),
    ));
    let batch: Vec<Track> = (0..n)
        .map(|i| {
            let mut t = Track::from_path(app.ids.allocate(), Path::new(&format!("/m/{i}.mp3")));
            t.duration = Some(200.0);
            t
        })
        .collect();
    app.add_tracks(batch);
    app.drain_events();
    let settings = config::Settings::default();
    let state = EventLoopState::new(&app, &settings);
    (app, settings, state)
}

fn press(
    app: &mut App<FakeOutput>,
    settings: &config::Settings,
    state: &mut EventLoopState,
    keys: &[KeyEvent],
) -> bool {
    keys.iter()
        .any(|k| handle_key_event(*k, settings, app, state))
}

#[test]
fn q_quits_from_normal_mode() {
    let (mut app, settings, mut state) = setup(1);
    assert!(press(&mut app, &settings, &mut state, &[ch('q')]));
}

#[test]
fn q_is_text_while_searching() {
    let (mut app, settings, mut state) = setup(1);
    assert!(!press(&mut app, &settings, &mut state, &[ch('/'), ch('q')]));
    assert_eq!(app.query, "q");
    assert_eq!(app.mode, InputMode::Search);

    press(&mut app, &settings, &mut state, &[key(KeyCode::Esc)]);
    assert!(app.query.is_empty());
    assert_eq!(app.mode, InputMode::Normal);
}

#[test]
fn gg_and_g_jump_to_ends() {
    let (mut app, settings, mut state) = setup(4);
    press(&mut app, &settings, &mut state, &[ch('G')]);
    assert_eq!(app.selected, Some(3));

    // a single g followed by another key does not jump
    press(&mut app, &settings, &mut state, &[ch('g'), ch('k')]);
    assert_eq!(app.selected, Some(2));
    assert!(!state.pending_gg);

    press(&mut app, &settings, &mut state, &[ch('g'), ch('g')]);
    assert_eq!(app.selected, Some(0));
}

#[test]
fn transport_keys_drive_the_engine() {
    let (mut app, settings, mut state) = setup(3);
    press(&mut app, &settings, &mut state, &[ch(' ')]);
    assert_eq!(app.engine.status(), PlaybackStatus::Playing);

    press(&mut app, &settings, &mut state, &[ch('l')]);
    assert_eq!(app.engine.current_index(), Some(1));

    press(&mut app, &settings, &mut state, &[ch('L'), ch('L')]);
    assert_eq!(app.engine.position(), 20.0);
    press(&mut app, &settings, &mut state, &[ch('H')]);
    assert_eq!(app.engine.position(), 10.0);

    press(&mut app, &settings, &mut state, &[ch('-'), ch(']'), ch('s'), ch('r')]);
    let s = app.engine.settings();
    assert!((s.volume - 0.9).abs() < 1e-6);
    assert_eq!(s.playback_rate, 1.25);
    assert!(s.shuffle);
    assert!(s.repeat);

    press(&mut app, &settings, &mut state, &[ch('p')]);
    assert_eq!(app.engine.status(), PlaybackStatus::Paused);
}

#[test]
fn enter_plays_selected_track() {
    let (mut app, settings, mut state) = setup(3);
    press(&mut app, &settings, &mut state, &[ch('j'), ch('j'), key(KeyCode::Enter)]);
    assert_eq!(app.engine.current_index(), Some(2));
    assert_eq!(app.engine.status(), PlaybackStatus::Playing);
}

#[test]
fn clear_needs_y() {
    let (mut app, settings, mut state) = setup(2);
    press(&mut app, &settings, &mut state, &[ch('C'), ch('n')]);
    assert_eq!(app.catalog.len(), 2);

    press(&mut app, &settings, &mut state, &[ch('C'), ch('y')]);
    assert!(app.catalog.is_empty());
    assert_eq!(app.mode, InputMode::Normal);
}

#[test]
fn add_path_prompt_collects_text_and_cancels() {
    let (mut app, settings, mut state) = setup(1);
    press(
        &mut app,
        &settings,
        &mut state,
        &[ch('a'), ch('~'), ch('/'), ch('x'), key(KeyCode::Backspace)],
    );
    assert_eq!(app.mode, InputMode::AddPath("~/".to_string()));

    // q is part of a path, not a quit
    assert!(!press(&mut app, &settings, &mut state, &[ch('q')]));
    press(&mut app, &settings, &mut state, &[key(KeyCode::Esc)]);
    assert_eq!(app.mode, InputMode::Normal);
    assert_eq!(app.catalog.len(), 1);
}

#[test]
fn equalizer_mode_edits_bands_and_presets() {
    let (mut app, settings, mut state) = setup(1);
    press(&mut app, &settings, &mut state, &[ch(' '), ch('e')]);
    assert_eq!(app.mode, InputMode::Equalizer);

    press(&mut app, &settings, &mut state, &[ch('l'), ch('k'), ch('k')]);
    assert_eq!(app.eq_band, 1);
    let gain = app.engine.equalizer().map(|e| e.current_gains()[1]);
    assert_eq!(gain, Some(1.0));

    press(&mut app, &settings, &mut state, &[ch('3')]);
    let preset = app.engine.equalizer().map(|e| e.active_preset().label());
    assert_eq!(preset, Some("rock"));

    press(&mut app, &settings, &mut state, &[key(KeyCode::Esc)]);
    assert_eq!(app.mode, InputMode::Normal);
}

#[test]
fn media_controls_map_onto_transport() {
    let (mut app, _settings, _state) = setup(2);
    assert!(!handle_control_cmd(ControlCmd::Play, &mut app));
    assert_eq!(app.engine.status(), PlaybackStatus::Playing);

    handle_control_cmd(ControlCmd::SetPosition(30_000_000), &mut app);
    assert_eq!(app.engine.position(), 30.0);
    handle_control_cmd(ControlCmd::Seek(-5_000_000), &mut app);
    assert_eq!(app.engine.position(), 25.0);

    handle_control_cmd(ControlCmd::Stop, &mut app);
    assert_eq!(app.engine.status(), PlaybackStatus::Paused);
    assert_eq!(app.engine.position(), 0.0);

    handle_control_cmd(ControlCmd::Next, &mut app);
    assert_eq!(app.engine.current_index(), Some(1));
    assert!(handle_control_cmd(ControlCmd::Quit, &mut app));
}

#[test]
fn play_from_idle_starts_first_track() {
    let (mut app, _settings, _state) = setup(2);
    app.engine.stop();
    handle_control_cmd(ControlCmd::Play, &mut app);
    assert_eq!(app.engine.current_index(), Some(0));
    assert_eq!(app.engine.status(), PlaybackStatus::Playing);
}

#[test]
fn seek_and_load_events_write_the_resume_point() {
    let (mut app, _settings, _state) = setup(2);
    let mut store = PersistenceStore::new(Box::new(MemoryStore::new()));
    let mpris = crate::mpris::detached_handle();

    app.transport(TransportCmd::PlayIndex(1));
    app.transport(TransportCmd::SeekTo(12.5));
    let events = app.drain_events();
    apply_engine_events(&events, &app, &mut store, &mpris);

    assert_eq!(store.raw(RESUME_INDEX_KEY).as_deref(), Some("1"));
    assert_eq!(store.raw(RESUME_TIME_KEY).as_deref(), Some("12.5"));
}

#[test]
fn confirmed_clear_removes_the_stored_playlist() {
    let (mut app, settings, mut state) = setup(2);
    let mut store = PersistenceStore::new(Box::new(MemoryStore::new()));
    let mpris = crate::mpris::detached_handle();

    app.transport(TransportCmd::PlayIndex(1));
    app.transport(TransportCmd::SeekTo(12.5));
    let events = app.drain_events();
    apply_engine_events(&events, &app, &mut store, &mpris);
    // nothing saved yet for this catalog
    state.saved_revision = u64::MAX;
    write_through(&app, &mut store, &mut state);
    assert!(store.raw(TRACKS_KEY).is_some());
    assert_eq!(store.raw(RESUME_INDEX_KEY).as_deref(), Some("1"));

    press(&mut app, &settings, &mut state, &[ch('C'), ch('y')]);
    let events = app.drain_events();
    apply_engine_events(&events, &app, &mut store, &mpris);
    write_through(&app, &mut store, &mut state);

    assert!(store.raw(TRACKS_KEY).is_none());
    assert!(store.raw(RESUME_INDEX_KEY).is_none());
    assert!(store.raw(RESUME_TIME_KEY).is_none());
    assert!(store.raw(SETTINGS_KEY).is_some());
}
