use std::fs;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};

use tally::app::{App, Focus, InputMode, StatusLevel};
use tally::config;
use tally::domain::{HistoryEntry, SelectionSnapshot};
use tally::infrastructure::runtime::{RuntimeBridge, RuntimeCommand, RuntimeEvent};
use tally::infrastructure::{BalanceApi, HttpBalanceClient};
use tally::logging;
use tally::store::{SnapshotStore, SnapshotWriter, HISTORY_SNAPSHOT, SELECTION_SNAPSHOT};
use tally::ui;

#[derive(Debug, Parser)]
#[command(
    name = "tally",
    version,
    about = "Tally: multi-chain wallet balances in the terminal"
)]
struct Args {
    /// Balance service base URL (e.g. http://localhost:3000/v1)
    #[arg(long)]
    api: Option<String>,

    /// Network key to select at start. Repeatable.
    #[arg(long = "chain")]
    chains: Vec<String>,

    /// Start in batch mode
    #[arg(long)]
    batch: bool,

    /// Address or .eth name to query right away; several start a batch query
    addresses: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = config::load();
    if let Some(api) = args.api.clone() {
        config.api.base_url = api;
    }

    if let Some(log_path) = config::log_path() {
        if let Err(err) = logging::init(&log_path) {
            eprintln!("logging disabled: {err:#}");
        }
    }
    info!(api = %config.api.base_url, "starting");

    let client = HttpBalanceClient::new(&config.api)?;
    let api: Arc<dyn BalanceApi> = Arc::new(client);
    let runtime = RuntimeBridge::new(api)?;

    let mut app = App::new(&config);
    restore_state(&mut app, &config);
    apply_args(&mut app, &args);
    app.request_catalog(None, Instant::now());

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app, runtime);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("{err:?}");
    }

    Ok(())
}

fn restore_state(app: &mut App, config: &config::Config) {
    let Some(db_path) = config::state_db_path() else {
        seed_default_chains(app, config);
        return;
    };
    if let Some(parent) = db_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let loaded = SnapshotStore::open(&db_path).and_then(|store| {
        let selection: Option<SelectionSnapshot> = store.load(SELECTION_SNAPSHOT)?;
        let history: Option<Vec<HistoryEntry>> = store.load(HISTORY_SNAPSHOT)?;
        Ok((store, selection, history))
    });
    match loaded {
        Ok((store, selection, history)) => {
            let first_run = selection.is_none();
            app.restore(selection, history.unwrap_or_default());
            match SnapshotWriter::spawn(store) {
                Ok(writer) => app.attach_writer(writer),
                Err(err) => {
                    warn!(error = %err, "persistence disabled");
                    app.set_status(format!("State will not be saved: {err}"), StatusLevel::Warn);
                }
            }
            if first_run {
                seed_default_chains(app, config);
            }
        }
        Err(err) => {
            warn!(error = %err, "state db unavailable");
            app.set_status(format!("State DB disabled: {err}"), StatusLevel::Warn);
            seed_default_chains(app, config);
        }
    }
}

fn seed_default_chains(app: &mut App, config: &config::Config) {
    for key in &config.default_chains {
        app.ensure_key(key);
    }
}

fn apply_args(app: &mut App, args: &Args) {
    for key in &args.chains {
        app.ensure_key(key);
    }
    if args.batch {
        app.toggle_mode();
    }
    let outcome = match args.addresses.as_slice() {
        [] => return,
        [single] if !args.batch => app.submit_address(single),
        many => app.submit_batch(&many.join("\n")).map(|_| ()),
    };
    if let Err(rejection) = outcome {
        app.set_status(rejection.to_string(), StatusLevel::Warn);
    }
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    runtime: RuntimeBridge,
) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        pump_background(&mut app, &runtime);
        terminal.draw(|f| ui::draw(f, &app))?;
        if app.should_quit {
            let _ = runtime.send(RuntimeCommand::Shutdown);
            return Ok(());
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                handle_key(&mut app, key);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }

        pump_background(&mut app, &runtime);
    }
}

fn pump_background(app: &mut App, runtime: &RuntimeBridge) {
    for event in runtime.poll_events() {
        let now = Instant::now();
        match event {
            RuntimeEvent::CatalogReady { keyword, networks } => {
                app.apply_catalog(keyword, networks, now)
            }
            RuntimeEvent::CatalogFailed { keyword, message } => {
                app.apply_catalog_failure(keyword, message)
            }
            RuntimeEvent::BalancesReady { ticket, results } => {
                app.apply_balances(ticket, results, now)
            }
            RuntimeEvent::BalancesFailed {
                ticket,
                message,
                transport,
            } => app.apply_fetch_failure(ticket, message, transport, now),
            RuntimeEvent::Error { message } => app.set_status(message, StatusLevel::Error),
        }
    }

    if let Some(keyword) = app.take_catalog_request() {
        if let Err(err) = runtime.send(RuntimeCommand::LoadCatalog { keyword }) {
            app.set_status(format!("{err}"), StatusLevel::Error);
        }
    }
    if let Some(request) = app.take_fetch_request(Instant::now()) {
        if let Err(err) = runtime.send(RuntimeCommand::FetchBalances(request)) {
            app.set_status(format!("{err}"), StatusLevel::Error);
        }
    }
    if let Some(text) = app.take_copy_request() {
        copy_to_clipboard(app, text);
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        _ => handle_input_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), mods) if mods.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true
        }
        (KeyCode::Char('q'), _) => app.should_quit = true,
        (KeyCode::Char(':'), _) => app.enter_input(InputMode::Command),
        (KeyCode::Char('/'), _) => app.enter_input(InputMode::Search),
        (KeyCode::Char('a'), _) => app.enter_input(InputMode::Address),
        (KeyCode::Char('b'), _) => app.enter_input(InputMode::Batch),
        (KeyCode::Char('m'), _) => app.toggle_mode(),
        (KeyCode::Char('r'), _) => {
            if app.trigger_fetch() {
                app.set_status("Refreshing…", StatusLevel::Info);
            }
        }
        (KeyCode::Char('c'), _) if app.focus == Focus::Catalog => app.clear_selection(),
        (KeyCode::Char('d'), _) if app.focus == Focus::History => app.forget_selected_history(),
        (KeyCode::Char('X'), _) if app.focus == Focus::History => app.clear_history(),
        (KeyCode::Char('y'), _) if app.focus == Focus::History => {
            let action = app.copy_history(app.selected_history);
            app.apply_action(action);
        }
        (KeyCode::Tab, _) => app.cycle_focus(),
        (KeyCode::Up, _) | (KeyCode::Char('k'), _) => app.move_up(),
        (KeyCode::Down, _) | (KeyCode::Char('j'), _) => app.move_down(),
        (KeyCode::Enter, _) => app.activate(),
        _ => {}
    }
}

fn handle_input_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.exit_input(),
        KeyCode::Enter => app.submit_input(Instant::now()),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(ch) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                return;
            }
            app.input.push(ch);
        }
        _ => {}
    }
}

fn copy_to_clipboard(app: &mut App, text: String) {
    use arboard::Clipboard;

    match Clipboard::new() {
        Ok(mut clipboard) => {
            if clipboard.set_text(&text).is_ok() {
                app.set_status(format!("Copied: {text}"), StatusLevel::Info);
            } else {
                app.set_status("Failed to copy", StatusLevel::Error);
            }
        }
        Err(_) => {
            app.set_status("Clipboard not available", StatusLevel::Error);
        }
    }
}
