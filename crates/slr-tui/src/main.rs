use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ratatui::Terminal;
use ratatui::crossterm::event;
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::CrosstermBackend;
use slr_core::config_file;
use slr_core::{Backend, BackendClient, Config, DEFAULT_PROJECT_ID, StoreWatcher};
use slr_core::sidebar::ProjectSelector;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

mod action;
mod app;
mod backend;
mod input;
mod theme;
mod tui_event;
mod view;

use app::{App, AssistantState};

/// Ticks between checks of the local store for writes from other processes.
const STORE_POLL_TICKS: usize = 10;

/// SLR Partner TUI - generate Scholar queries and curate collected papers.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Project to open (default: the stored current project)
    #[arg(long)]
    project: Option<String>,

    /// Backend base URL [env: SLR_BACKEND_URL]
    #[arg(long)]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Color theme: hacker (default) or modern
    #[arg(long)]
    theme: Option<String>,
}

fn log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slr-partner")
        .join("logs")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // The terminal belongs to the UI, so logs go to a daily file.
    let file_appender = tracing_appender::rolling::daily(log_dir(), "slr-tui.log");
    let (non_blocking, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    // Resolve config from CLI flags > env vars > config file > defaults
    let mut config = Config::default();
    config_file::load_config().apply(&mut config);
    config_file::apply_env(&mut config);
    if let Some(url) = args.base_url {
        config.base_url = url;
    }
    if let Some(t) = args.timeout {
        config.timeout_secs = Some(t);
    }
    if let Some(theme) = args.theme {
        config.theme = theme;
    }

    let store = Arc::new(config.open_store());
    let project = args
        .project
        .or_else(|| store.current_project().ok().flatten())
        .unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string());
    let api_key = config
        .api_key
        .clone()
        .or_else(|| store.api_key().ok().flatten());
    let backend: Arc<dyn Backend> = Arc::new(BackendClient::from_config(&config));
    tracing::info!(base_url = %config.base_url, %project, "starting");

    let mut app = App::new(&config.theme);
    app.projects = ProjectSelector::with_selected(project);
    app.assistant = AssistantState::new(&config.strategy, config.sites.clone(), api_key);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    app.backend_cmd_tx = Some(cmd_tx);
    tokio::spawn(backend::run(
        cmd_rx,
        event_tx,
        backend,
        store.clone(),
        cancel.clone(),
    ));

    // Also handle Ctrl+C at the OS level for clean shutdown
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_for_signal.cancel();
        }
    });

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    // Install panic hook that restores terminal before printing panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    // Drain any stray input events (e.g. Enter keypress from launching the command)
    while event::poll(Duration::from_millis(50)).unwrap_or(false) {
        let _ = event::read();
    }

    app.start();
    let mut watcher = StoreWatcher::new(&store);
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| app.view(f))?;
        app.flush_clipboard();

        tokio::select! {
            Some(backend_event) = event_rx.recv() => {
                app.handle_backend_event(backend_event);
                while let Ok(evt) = event_rx.try_recv() {
                    app.handle_backend_event(evt);
                }
            }
            _ = async {
                if event::poll(tick_rate).unwrap_or(false)
                    && let Ok(evt) = event::read()
                {
                    let action = input::map_event(&evt, &app.input_mode);
                    app.update(action);
                }
            } => {}
        }

        app.update(action::Action::Tick);
        if app.tick % STORE_POLL_TICKS == 0 && watcher.poll(&store) {
            app.handle_backend_event(tui_event::BackendEvent::PapersChanged);
        }

        if app.should_quit || cancel.is_cancelled() {
            cancel.cancel();
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    tracing::info!("exiting");

    Ok(())
}
