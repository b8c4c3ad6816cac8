use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use writeflow::{
    app::App,
    app_dirs::AppDirs,
    clock::SystemTimeSource,
    config::{AppConfig, ConfigStore, FileConfigStore},
    logging,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    session::WritingSession,
    storage::Persistence,
    ui,
};

const TICK_RATE_MS: u64 = 100;

/// distraction-free writing with daily goals, a session timer and focus modes
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A distraction-free terminal writing pad. Pick a word or timer goal, start a session and keep writing: settings stay locked until the goal is reached."
)]
pub struct Cli {
    /// directory holding the writeflow database
    #[clap(long)]
    data_dir: Option<PathBuf>,

    /// keep everything in memory, nothing survives a restart
    #[clap(long)]
    memory: bool,

    /// write logs here instead of the state directory
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// log filter, e.g. "debug" or "writeflow=trace" (RUST_LOG wins)
    #[clap(long)]
    log_level: Option<String>,

    /// read the config from this file
    #[clap(long)]
    config: Option<PathBuf>,

    /// overwrite the config file with defaults before starting
    #[clap(long)]
    reset_config: bool,

    /// forget saved goals and focus modes; the draft is kept
    #[clap(long)]
    forget_settings: bool,
}

impl Cli {
    /// Load the config file, then layer command line overrides on top
    fn resolve_config(&self) -> io::Result<AppConfig> {
        let store = match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        let mut cfg = if self.reset_config {
            let cfg = AppConfig::default();
            store.save(&cfg)?;
            cfg
        } else {
            store.load()
        };
        if let Some(dir) = &self.data_dir {
            cfg.data_dir = Some(dir.clone());
        }
        if self.memory {
            cfg.memory_only = true;
        }
        if let Some(level) = &self.log_level {
            cfg.log_level = level.clone();
        }
        Ok(cfg)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config = cli.resolve_config()?;
    let log_file = cli
        .log_file
        .clone()
        .or_else(AppDirs::log_path)
        .unwrap_or_else(|| PathBuf::from("writeflow.log"));
    logging::init(&config.log_level, &log_file)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let persistence = if config.memory_only {
        Persistence::memory_only()
    } else {
        Persistence::open_sqlite(&config.db_path())
    };
    if cli.forget_settings {
        tracing::info!("clearing saved settings");
        persistence.clear_settings();
    }
    let session = WritingSession::load(persistence, Arc::new(SystemTimeSource), &config);
    let mut app = App::new(session);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);
    app.shutdown();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "event loop failed");
    }
    tracing::info!("exiting");
    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let dt = Duration::from_millis(TICK_RATE_MS).as_secs_f64();

    terminal.draw(|f| ui::draw(app, f))?;
    while !app.should_quit {
        match runner.step() {
            AppEvent::Tick => app.on_tick(dt),
            AppEvent::Key(key) => app.on_key(key),
            AppEvent::Paste(text) => app.on_paste(text),
            AppEvent::Resize => {}
        }
        terminal.draw(|f| ui::draw(app, f))?;
    }
    Ok(())
}
