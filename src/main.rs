use std::{
    io::{self, stdin},
    path::PathBuf,
};

use anyhow::Context;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use tasktally::{
    app::{App, KeyOutcome},
    app_dirs::AppDirs,
    clock::SystemClock,
    config::{Config, ConfigStore, FileConfigStore},
    csv_export::CsvQuoting,
    format::is_valid_time_format,
    log_store::JsonFileLogStore,
    logging::enable_logging,
    runtime::{CrosstermEventSource, Runner, TrackerEvent},
    tracker::{Tracker, TrackerSettings},
    ui::screen::current_screen,
};

/// start and stop named tasks, keep a running log, export it as csv
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal time tracker: start and stop named tasks, keep a persistent log of completed work with a running total, and export it as a csv summary."
)]
pub struct Cli {
    /// json file holding the task log
    #[clap(short = 'd', long)]
    data_file: Option<PathBuf>,

    /// directory the csv summary is written to
    #[clap(short = 'o', long)]
    export_dir: Option<PathBuf>,

    /// how csv fields are quoted on export
    #[clap(long, value_enum)]
    csv_quoting: Option<CsvQuoting>,

    /// strftime format for start and end times
    #[clap(short = 't', long, value_parser = parse_time_format)]
    time_format: Option<String>,

    /// level for the file log (trace, debug, info, warn, error)
    #[clap(long)]
    log_level: Option<String>,

    /// write the effective settings to the config file
    #[clap(long)]
    save_config: bool,
}

fn parse_time_format(s: &str) -> Result<String, String> {
    if is_valid_time_format(s) {
        Ok(s.to_string())
    } else {
        Err(format!("'{s}' is not a valid strftime format"))
    }
}

impl Cli {
    /// Command line values take precedence over the config file.
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(p) = &self.data_file {
            cfg.data_file = Some(p.clone());
        }
        if let Some(p) = &self.export_dir {
            cfg.export_dir = Some(p.clone());
        }
        if let Some(q) = self.csv_quoting {
            cfg.csv_quoting = q;
        }
        if let Some(f) = &self.time_format {
            cfg.time_format = f.clone();
        }
        cfg
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Err(e) = enable_logging(&AppDirs::log_dir(), cli.log_level.as_deref()) {
        eprintln!("file logging disabled: {e:#}");
    }

    let config_store = FileConfigStore::new();
    let config = cli.apply(config_store.load());
    if cli.save_config {
        config_store
            .save(&config)
            .with_context(|| format!("failed to save {}", config_store.path().display()))?;
    }

    let store = match &config.data_file {
        Some(path) => JsonFileLogStore::with_path(path),
        None => JsonFileLogStore::new(),
    };
    tracing::info!(log = %store.path().display(), "starting");
    let tracker = Tracker::open(store, SystemClock, TrackerSettings::from(&config))
        .context("failed to load the task log")?;
    let export_dir = config
        .export_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let mut app = App::new(tracker, export_dir, config.csv_quoting);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);
    app.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    let runner = Runner::new(CrosstermEventSource::new());
    terminal.draw(|f| ui(app, f))?;

    while let Some(event) = runner.step(app.tracker.tick_mut()) {
        match event {
            TrackerEvent::Tick => app.on_tick(),
            TrackerEvent::Resize => {}
            TrackerEvent::Key(key) => {
                if app.on_key(key) == KeyOutcome::Quit {
                    break;
                }
            }
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    current_screen(&app.state).render(app, f);
}
