use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::debug;

use crate::app::{App, InputMode};
use crate::audio::{EngineEvent, MediaOutput, PlaybackStatus, Preset, TransportCmd};
use crate::config;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::runtime::ingest::add_typed_path;
use crate::runtime::mpris_sync::update_mpris;
use crate::store::PersistenceStore;
use crate::ui;

const POLL_INTERVAL: Duration = Duration::from_millis(16);
const RATE_STEP: f32 = 0.25;

/// State tracked by the runtime event loop across iterations.
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    /// Last-known playing index as emitted to MPRIS.
    pub last_mpris_index: Option<usize>,
    /// Last-known playback state as emitted to MPRIS.
    pub last_mpris_playback: PlaybackStatus,
    /// Catalog revision last written to the store.
    saved_revision: u64,
    next_second: Instant,
    next_autosave: Instant,
}

impl EventLoopState {
    /// Construct a new `EventLoopState` seeded from `app`.
    pub fn new<O: MediaOutput>(app: &App<O>, settings: &config::Settings) -> Self {
        let now = Instant::now();
        Self {
            pending_gg: false,
            last_mpris_index: app.engine.current_index(),
            last_mpris_playback: app.engine.status(),
            saved_revision: app.catalog.revision(),
            next_second: now + Duration::from_secs(1),
            next_autosave: now + Duration::from_secs(settings.persistence.autosave_secs),
        }
    }
}

/// Main terminal event loop: handles input, UI drawing, timers, persistence
/// and MPRIS. Returns `Ok(())` when shutdown is requested.
pub fn run<O: MediaOutput>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App<O>,
    store: &mut PersistenceStore,
    mpris: &MprisHandle,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let events = app.tick();
        apply_engine_events(&events, app, store, mpris);

        write_through(app, store, state);

        run_timers(settings, app, store, mpris, state);

        // Keep MPRIS in sync even when playback changes come from media keys or auto-advance.
        let index = app.engine.current_index();
        let playback = app.engine.status();
        if index != state.last_mpris_index || playback != state.last_mpris_playback {
            update_mpris(mpris, app);
            state.last_mpris_index = index;
            state.last_mpris_playback = playback;
        }

        app.expire_notice(Instant::now());
        terminal.draw(|f| ui::draw(f, app, settings))?;

        while let Ok(cmd) = control_rx.try_recv() {
            if handle_control_cmd(cmd, app) {
                return Ok(());
            }
        }

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, state) {
                    return Ok(());
                }
            }
        }
    }
}

fn apply_engine_events<O: MediaOutput>(
    events: &[EngineEvent],
    app: &App<O>,
    store: &mut PersistenceStore,
    mpris: &MprisHandle,
) {
    for event in events {
        match event {
            EngineEvent::TrackLoaded { .. } | EngineEvent::Seeked { .. } => {
                store.save_position(app.engine.current_index(), app.engine.position());
                update_mpris(mpris, app);
            }
            EngineEvent::Unloaded => {
                if app.catalog.is_empty() {
                    store.clear();
                } else {
                    store.save_position(None, 0.0);
                }
                update_mpris(mpris, app);
            }
            EngineEvent::SettingsChanged => {
                store.save(&app.catalog, &app.engine.settings());
            }
            _ => {}
        }
    }
}

/// Every catalog mutation lands in the store.
fn write_through<O: MediaOutput>(
    app: &App<O>,
    store: &mut PersistenceStore,
    state: &mut EventLoopState,
) {
    if app.catalog.revision() != state.saved_revision {
        store.save(&app.catalog, &app.engine.settings());
        state.saved_revision = app.catalog.revision();
    }
}

fn run_timers<O: MediaOutput>(
    settings: &config::Settings,
    app: &mut App<O>,
    store: &mut PersistenceStore,
    mpris: &MprisHandle,
    state: &mut EventLoopState,
) {
    let now = Instant::now();

    // Catch up whole seconds so a slow frame does not lose listening time.
    while now >= state.next_second {
        state.next_second += Duration::from_secs(1);
        app.session.tick_second();
        mpris.set_position(app.engine.position());
    }

    if now >= state.next_autosave {
        state.next_autosave = now + Duration::from_secs(settings.persistence.autosave_secs);
        if !app.catalog.is_empty() {
            store.save_position(app.engine.current_index(), app.engine.position());
        }
    }
}

fn micros_to_secs(micros: i64) -> f64 {
    micros as f64 / 1_000_000.0
}

/// Apply one command from the desktop's media controls. Returns `true` on quit.
fn handle_control_cmd<O: MediaOutput>(cmd: ControlCmd, app: &mut App<O>) -> bool {
    debug!(?cmd, "media control");
    match cmd {
        ControlCmd::Quit => return true,
        ControlCmd::Play => match app.engine.status() {
            PlaybackStatus::Idle => app.transport(TransportCmd::TogglePlayPause),
            _ => app.transport(TransportCmd::Play),
        },
        ControlCmd::Pause => app.transport(TransportCmd::Pause),
        ControlCmd::PlayPause => app.transport(TransportCmd::TogglePlayPause),
        ControlCmd::Stop => {
            app.transport(TransportCmd::Pause);
            app.transport(TransportCmd::SeekTo(0.0));
        }
        ControlCmd::Next => app.transport(TransportCmd::Next),
        ControlCmd::Prev => app.transport(TransportCmd::Previous),
        ControlCmd::Seek(offset) => app.transport(TransportCmd::SeekBy(micros_to_secs(offset))),
        ControlCmd::SetPosition(position) => {
            app.transport(TransportCmd::SeekTo(micros_to_secs(position)))
        }
    }
    false
}

/// Dispatch a key press according to the current input mode. Returns `true`
/// when the user asked to quit.
fn handle_key_event<O: MediaOutput>(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App<O>,
    state: &mut EventLoopState,
) -> bool {
    match app.mode.clone() {
        InputMode::Search => {
            state.pending_gg = false;
            handle_search_key(key, app);
            false
        }
        InputMode::AddPath(mut typed) => {
            state.pending_gg = false;
            match key.code {
                KeyCode::Esc => app.mode = InputMode::Normal,
                KeyCode::Enter => {
                    app.mode = InputMode::Normal;
                    add_typed_path(app, &typed, &settings.library);
                }
                KeyCode::Backspace => {
                    typed.pop();
                    app.mode = InputMode::AddPath(typed);
                }
                KeyCode::Char(c) if !c.is_control() => {
                    typed.push(c);
                    app.mode = InputMode::AddPath(typed);
                }
                _ => {}
            }
            false
        }
        InputMode::ConfirmClear => {
            state.pending_gg = false;
            let confirmed = matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'));
            app.confirm_clear(confirmed);
            false
        }
        InputMode::Equalizer => {
            state.pending_gg = false;
            handle_equalizer_key(key, settings, app)
        }
        InputMode::Normal => handle_normal_key(key, settings, app, state),
    }
}

fn handle_search_key<O: MediaOutput>(key: KeyEvent, app: &mut App<O>) {
    match key.code {
        KeyCode::Esc => app.clear_search(),
        KeyCode::Enter => app.commit_search(),
        KeyCode::Backspace => app.pop_query_char(),
        KeyCode::Down => app.select_next(),
        KeyCode::Up => app.select_prev(),
        KeyCode::Char('j') if key.modifiers.contains(KeyModifiers::CONTROL) => app.select_next(),
        KeyCode::Char('k') if key.modifiers.contains(KeyModifiers::CONTROL) => app.select_prev(),
        KeyCode::Char(c) if !c.is_control() => app.push_query_char(c),
        _ => {}
    }
}

fn handle_equalizer_key<O: MediaOutput>(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App<O>,
) -> bool {
    let step = settings.controls.eq_step_db;
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Esc | KeyCode::Char('e') => app.mode = InputMode::Normal,
        KeyCode::Left | KeyCode::Char('h') => app.eq_band_left(),
        KeyCode::Right | KeyCode::Char('l') => app.eq_band_right(),
        KeyCode::Up | KeyCode::Char('k') => app.adjust_eq(step),
        KeyCode::Down | KeyCode::Char('j') => app.adjust_eq(-step),
        KeyCode::Char(' ') | KeyCode::Char('p') => app.transport(TransportCmd::TogglePlayPause),
        KeyCode::Char(c @ '1'..='5') => {
            let slot = c as usize - '1' as usize;
            if let Some(&preset) = Preset::ALL.get(slot) {
                app.apply_preset(preset);
            }
        }
        _ => {}
    }
    false
}

fn handle_normal_key<O: MediaOutput>(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App<O>,
    state: &mut EventLoopState,
) -> bool {
    let seek = settings.controls.seek_seconds as f64;
    let volume_step = settings.controls.volume_step;

    if key.code != KeyCode::Char('g') {
        state.pending_gg = false;
    }
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                app.select_first();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Enter => app.play_selected(),
        KeyCode::Char(' ') | KeyCode::Char('p') => app.transport(TransportCmd::TogglePlayPause),
        KeyCode::Char('l') | KeyCode::Right => app.transport(TransportCmd::Next),
        KeyCode::Char('h') | KeyCode::Left => app.transport(TransportCmd::Previous),
        KeyCode::Char('L') => app.transport(TransportCmd::SeekBy(seek)),
        KeyCode::Char('H') => app.transport(TransportCmd::SeekBy(-seek)),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.transport(TransportCmd::StepVolume(volume_step))
        }
        KeyCode::Char('-') => app.transport(TransportCmd::StepVolume(-volume_step)),
        KeyCode::Char('m') => app.transport(TransportCmd::ToggleMute),
        KeyCode::Char(']') => app.transport(TransportCmd::StepRate(RATE_STEP)),
        KeyCode::Char('[') => app.transport(TransportCmd::StepRate(-RATE_STEP)),
        KeyCode::Char('s') => app.transport(TransportCmd::ToggleShuffle),
        KeyCode::Char('r') => app.transport(TransportCmd::ToggleRepeat),
        KeyCode::Char('/') => app.enter_search(),
        KeyCode::Char('o') => app.cycle_sort(),
        KeyCode::Char('a') => app.mode = InputMode::AddPath(String::new()),
        KeyCode::Char('C') => app.request_clear(),
        KeyCode::Char('e') => app.mode = InputMode::Equalizer,
        KeyCode::Esc => {
            if !app.query.is_empty() {
                app.clear_search();
            }
        }
        _ => {}
    }
    false
}

#[cfg(test)]
mod tests;
