use std::path::PathBuf;
use std::sync::mpsc;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::mpris::ControlCmd;

mod event_loop;
mod ingest;
mod mpris_sync;
mod settings;
mod startup;

/// What the command line asked for.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Files and directories to add on startup.
    pub paths: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    /// Restore the playlist saved by the previous run.
    pub restore: bool,
    pub print_config: bool,
}

pub fn run(options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let (settings, config_warning) = settings::load_settings(options.config.as_deref());
    if options.print_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    startup::init_logging(&settings);
    if let Some(warning) = config_warning {
        warn!("{warning}");
    }
    info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let mut store = startup::open_store(&settings);
    let mut app = startup::build_app(&settings, &options.paths, options.restore, &mut store);

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx);
    mpris_sync::update_mpris(&mpris, &app);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let mut state = event_loop::EventLoopState::new(&app, &settings);
        event_loop::run(
            &mut terminal,
            &settings,
            &mut app,
            &mut store,
            &mpris,
            &control_rx,
            &mut state,
        )
    })();

    // Final snapshot, whatever ended the loop.
    store.save(&app.catalog, &app.engine.settings());
    store.save_position(app.engine.current_index(), app.engine.position());
    info!(
        tracks_played = app.session.tracks_played(),
        listening = %app.session.listening_label(),
        "shutting down"
    );

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}
