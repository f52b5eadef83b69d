use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::Config;
use crate::core::{Action, Command, NotifyLevel};
use crate::domain::validate::{parse_address_input, parse_batch_input};
use crate::domain::{
    FetchRequest, FetchTicket, History, HistoryEntry, InputRejection, NetworkRef, QueryOrchestrator,
    QueryOutput, QueryResults, QueryTarget, ResultCache, Selection, SelectionSnapshot, Settlement,
    Toggle, MAX_SELECTED,
};
use crate::store::{SnapshotWriter, HISTORY_SNAPSHOT, SELECTION_SNAPSHOT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Single,
    Batch,
}

impl QueryMode {
    pub fn title(&self) -> &'static str {
        match self {
            QueryMode::Single => "Single",
            QueryMode::Batch => "Batch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Catalog,
    History,
    Results,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Catalog => Focus::History,
            Focus::History => Focus::Results,
            Focus::Results => Focus::Catalog,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Focus::Catalog => "Networks",
            Focus::History => "History",
            Focus::Results => "Results",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Command,
    Address,
    Batch,
    Search,
}

impl InputMode {
    pub fn prompt(&self) -> &'static str {
        match self {
            InputMode::Normal => "",
            InputMode::Command => ":",
            InputMode::Address => "address> ",
            InputMode::Batch => "batch> ",
            InputMode::Search => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    pub since: Instant,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    networks: Vec<NetworkRef>,
    loaded_at: Instant,
}

pub struct App {
    pub mode: QueryMode,
    pub selection: Selection,
    pub history: History,
    pub query: QueryOrchestrator,
    pub cache: ResultCache,
    /// What the results panel shows; belongs to `displayed_key`
    pub output: Option<QueryOutput>,
    displayed_key: Option<String>,
    pub address: Option<String>,
    pub batch: Vec<String>,
    pub catalog: Vec<NetworkRef>,
    pub catalog_keyword: Option<String>,
    pub catalog_loading: bool,
    catalog_cache: BTreeMap<String, CatalogEntry>,
    catalog_ttl: Duration,
    pub local_currency: String,
    pub focus: Focus,
    pub input_mode: InputMode,
    pub input: String,
    pub selected_catalog: usize,
    pub selected_history: usize,
    pub status: Option<StatusMessage>,
    pub pending_catalog_request: Option<Option<String>>,
    pub pending_copy_request: Option<String>,
    writer: Option<SnapshotWriter>,
    pub spinner: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: &Config) -> Self {
        Self {
            mode: QueryMode::Single,
            selection: Selection::new(),
            history: History::new(),
            query: QueryOrchestrator::new(config.refresh_policy()),
            cache: ResultCache::new(),
            output: None,
            displayed_key: None,
            address: None,
            batch: Vec::new(),
            catalog: Vec::new(),
            catalog_keyword: None,
            catalog_loading: false,
            catalog_cache: BTreeMap::new(),
            catalog_ttl: config.catalog_ttl(),
            local_currency: config.local_currency.clone(),
            focus: Focus::Catalog,
            input_mode: InputMode::Normal,
            input: String::new(),
            selected_catalog: 0,
            selected_history: 0,
            status: None,
            pending_catalog_request: None,
            pending_copy_request: None,
            writer: None,
            spinner: 0,
            should_quit: false,
        }
    }

    // === Persistence ===

    pub fn attach_writer(&mut self, writer: SnapshotWriter) {
        self.writer = Some(writer);
    }

    /// Restore saved state. Does not arm a fetch.
    pub fn restore(&mut self, selection: Option<SelectionSnapshot>, history: Vec<HistoryEntry>) {
        if let Some(snapshot) = selection {
            self.selection = Selection::from_snapshot(snapshot);
        }
        self.history = History::from_entries(history);
        debug!(
            networks = self.selection.len(),
            history = self.history.len(),
            "state restored"
        );
    }

    fn persist_selection(&self) {
        if let Some(writer) = &self.writer {
            writer.save(SELECTION_SNAPSHOT, &self.selection.snapshot());
        }
    }

    fn persist_history(&self) {
        if let Some(writer) = &self.writer {
            writer.save(HISTORY_SNAPSHOT, self.history.entries());
        }
    }

    // === Status ===

    pub fn set_status(&mut self, text: impl Into<String>, level: StatusLevel) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level,
            since: Instant::now(),
        });
    }

    pub fn status_text(&self) -> Option<(&str, StatusLevel)> {
        self.status
            .as_ref()
            .map(|status| (status.text.as_str(), status.level))
    }

    pub fn on_tick(&mut self) {
        if let Some(status) = self.status.as_ref() {
            let ttl = match status.level {
                StatusLevel::Info => Duration::from_secs(3),
                StatusLevel::Warn | StatusLevel::Error => Duration::from_secs(8),
            };
            if status.since.elapsed() > ttl {
                self.status = None;
            }
        }
        if self.is_loading() || self.catalog_loading {
            self.spinner = self.spinner.wrapping_add(1);
        }
    }

    // === Selection ===

    pub fn toggle_network(&mut self, network: NetworkRef) -> Toggle {
        let outcome = self.selection.toggle(network);
        self.after_toggle(outcome);
        outcome
    }

    pub fn toggle_key(&mut self, key: &str) -> Toggle {
        if key.trim().is_empty() {
            return Toggle::Rejected;
        }
        let outcome = self.selection.toggle_key(key);
        self.after_toggle(outcome);
        outcome
    }

    /// Add a network by key unless already selected
    pub fn ensure_key(&mut self, key: &str) {
        if !self.selection.contains(key.trim()) {
            self.toggle_key(key);
        }
    }

    fn after_toggle(&mut self, outcome: Toggle) {
        match outcome {
            Toggle::Added => {
                self.query.arm(true);
                self.persist_selection();
            }
            Toggle::Removed { emptied } => {
                if emptied {
                    self.reset_fetch_state();
                }
                self.persist_selection();
            }
            Toggle::Rejected => {
                self.set_status(
                    format!("network limit reached ({MAX_SELECTED})"),
                    StatusLevel::Warn,
                );
            }
        }
    }

    pub fn toggle_selected_catalog(&mut self) {
        let Some(network) = self.catalog.get(self.selected_catalog).cloned() else {
            return;
        };
        self.toggle_network(network);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.reset_fetch_state();
        self.persist_selection();
        self.set_status("Selection cleared", StatusLevel::Info);
    }

    /// Empty selection: nothing to fetch and nothing to show
    fn reset_fetch_state(&mut self) {
        self.query.disarm();
        self.query.reset();
        self.cache.clear();
        self.output = None;
        self.displayed_key = None;
    }

    // === Catalog ===

    /// Show the catalog for `keyword`, asking the worker only when the cached
    /// copy is missing or expired.
    pub fn request_catalog(&mut self, keyword: Option<String>, now: Instant) {
        let keyword = keyword
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self.catalog_keyword = keyword.clone();
        self.selected_catalog = 0;

        let cache_key = keyword.clone().unwrap_or_default();
        if let Some(entry) = self.catalog_cache.get(&cache_key) {
            if now.saturating_duration_since(entry.loaded_at) < self.catalog_ttl {
                self.catalog = entry.networks.clone();
                // Anything still in flight is for a keyword no longer shown
                self.catalog_loading = false;
                self.pending_catalog_request = None;
                return;
            }
        }
        self.catalog_loading = true;
        self.pending_catalog_request = Some(keyword);
    }

    pub fn take_catalog_request(&mut self) -> Option<Option<String>> {
        self.pending_catalog_request.take()
    }

    pub fn apply_catalog(&mut self, keyword: Option<String>, networks: Vec<NetworkRef>, now: Instant) {
        self.catalog_cache.insert(
            keyword.clone().unwrap_or_default(),
            CatalogEntry {
                networks: networks.clone(),
                loaded_at: now,
            },
        );
        if self.selection.reconcile_with_catalog(&networks) {
            self.persist_selection();
        }
        if keyword == self.catalog_keyword {
            self.catalog = networks;
            self.catalog_loading = false;
            self.selected_catalog = self
                .selected_catalog
                .min(self.catalog.len().saturating_sub(1));
        }
    }

    pub fn apply_catalog_failure(&mut self, keyword: Option<String>, message: String) {
        if keyword == self.catalog_keyword {
            self.catalog_loading = false;
        }
        self.set_status(format!("Network list failed: {message}"), StatusLevel::Error);
    }

    // === Queries ===

    pub fn submit_address(&mut self, text: &str) -> Result<(), InputRejection> {
        let address = parse_address_input(text)?;
        if self.selection.is_empty() {
            return Err(InputRejection::NoNetworksSelected);
        }
        self.set_mode(QueryMode::Single);
        self.history.record(&address, &self.selection);
        self.persist_history();
        self.selected_history = 0;
        info!(address = %address, "address submitted");
        self.address = Some(address);
        self.query.arm(true);
        Ok(())
    }

    /// Returns the entries that were dropped as invalid
    pub fn submit_batch(&mut self, text: &str) -> Result<Vec<String>, InputRejection> {
        let input = parse_batch_input(text);
        let Some(target) = QueryTarget::batch(input.accepted) else {
            return Err(InputRejection::NoValidAddresses);
        };
        if self.selection.is_empty() {
            return Err(InputRejection::NoNetworksSelected);
        }
        self.set_mode(QueryMode::Batch);
        for address in target.addresses() {
            self.history.record(address, &self.selection);
        }
        self.persist_history();
        self.selected_history = 0;
        info!(
            accepted = target.addresses().len(),
            rejected = input.rejected.len(),
            "batch submitted"
        );
        self.batch = target.addresses().to_vec();
        self.query.arm(true);
        Ok(input.rejected)
    }

    /// Manual refresh of the current target
    pub fn trigger_fetch(&mut self) -> bool {
        if self.selection.is_empty() {
            self.set_status(InputRejection::NoNetworksSelected.to_string(), StatusLevel::Warn);
            return false;
        }
        if self.current_target().is_none() {
            self.set_status("Enter an address first", StatusLevel::Warn);
            return false;
        }
        self.query.arm(true)
    }

    pub fn toggle_mode(&mut self) {
        let next = match self.mode {
            QueryMode::Single => QueryMode::Batch,
            QueryMode::Batch => QueryMode::Single,
        };
        self.set_mode(next);
        self.set_status(format!("{} mode", next.title()), StatusLevel::Info);
    }

    fn set_mode(&mut self, mode: QueryMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.batch.clear();
        self.output = None;
        self.displayed_key = None;
    }

    pub fn current_target(&self) -> Option<QueryTarget> {
        match self.mode {
            QueryMode::Single => self.address.clone().map(QueryTarget::Address),
            QueryMode::Batch => QueryTarget::batch(self.batch.iter().cloned()),
        }
    }

    pub fn current_key(&self) -> Option<String> {
        if self.selection.is_empty() {
            return None;
        }
        self.current_target()
            .map(|target| target.key(&self.selection.keys()))
    }

    pub fn is_loading(&self) -> bool {
        self.query.is_loading()
    }

    /// Start a fetch if one is due. Also swaps the visible output to the
    /// cached one when the target changed.
    pub fn take_fetch_request(&mut self, now: Instant) -> Option<FetchRequest> {
        let key = self.current_key();
        if key != self.displayed_key {
            self.output = key
                .as_deref()
                .and_then(|k| self.cache.get(k))
                .map(|cached| cached.output.clone());
            self.displayed_key = key.clone();
        }

        let target = self.current_target();
        let keys = self.selection.keys();
        let last_success = key.as_deref().and_then(|k| self.cache.fetched_at(k));
        self.query.poll(now, target.as_ref(), &keys, last_success)
    }

    pub fn apply_balances(&mut self, ticket: FetchTicket, results: QueryResults, now: Instant) {
        let current = self.current_key();
        match self.query.settle(&ticket, now, current.as_deref(), None) {
            Settlement::Commit => {
                let output = QueryOutput::from_results(&results);
                self.cache
                    .insert(ticket.target_key.clone(), output.clone(), now);
                self.output = Some(output);
                self.displayed_key = Some(ticket.target_key);
            }
            Settlement::Discard => {
                debug!(ticket = ticket.id, "result not shown");
            }
        }
    }

    pub fn apply_fetch_failure(
        &mut self,
        ticket: FetchTicket,
        message: String,
        transport: bool,
        now: Instant,
    ) {
        let current_attempt = self.query.in_flight_ticket() == Some(&ticket);
        let current = self.current_key();
        self.query.settle(&ticket, now, current.as_deref(), Some(message.clone()));
        if !current_attempt {
            return;
        }
        let text = if transport {
            format!("Balance service unreachable: {message} (r to retry)")
        } else {
            format!("Fetch failed: {message} (r to retry)")
        };
        self.set_status(text, StatusLevel::Error);
    }

    // === History ===

    pub fn recall_history(&mut self, index: usize) -> bool {
        let Some(entry) = self.history.entry(index).cloned() else {
            return false;
        };
        self.set_mode(QueryMode::Single);
        if !entry.networks.is_empty() {
            self.selection.replace(&entry.networks);
            self.persist_selection();
        }
        self.history.record(&entry.address, &self.selection);
        self.persist_history();
        self.selected_history = 0;
        self.address = Some(entry.address.clone());
        if !self.query.arm(!self.selection.is_empty()) {
            self.set_status(InputRejection::NoNetworksSelected.to_string(), StatusLevel::Warn);
        }
        true
    }

    pub fn forget_history(&mut self, address: &str) {
        self.history.remove(address);
        self.persist_history();
        self.selected_history = self
            .selected_history
            .min(self.history.len().saturating_sub(1));
    }

    pub fn forget_selected_history(&mut self) {
        let Some(address) = self
            .history
            .entry(self.selected_history)
            .map(|e| e.address.clone())
        else {
            return;
        };
        self.forget_history(&address);
        self.set_status(format!("Removed {address}"), StatusLevel::Info);
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.persist_history();
        self.selected_history = 0;
        self.set_status("History cleared", StatusLevel::Info);
    }

    pub fn copy_history(&mut self, index: usize) -> Action {
        match self.history.entry(index) {
            Some(entry) => Action::Copy(entry.address.clone()),
            None => Action::Notify("Nothing to copy".to_string(), NotifyLevel::Warn),
        }
    }

    pub fn take_copy_request(&mut self) -> Option<String> {
        self.pending_copy_request.take()
    }

    // === Navigation ===

    pub fn cycle_focus(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn move_up(&mut self) {
        match self.focus {
            Focus::Catalog => self.selected_catalog = self.selected_catalog.saturating_sub(1),
            Focus::History => self.selected_history = self.selected_history.saturating_sub(1),
            Focus::Results => {}
        }
    }

    pub fn move_down(&mut self) {
        match self.focus {
            Focus::Catalog => {
                if self.selected_catalog + 1 < self.catalog.len() {
                    self.selected_catalog += 1;
                }
            }
            Focus::History => {
                if self.selected_history + 1 < self.history.len() {
                    self.selected_history += 1;
                }
            }
            Focus::Results => {}
        }
    }

    /// Enter on the focused panel
    pub fn activate(&mut self) {
        match self.focus {
            Focus::Catalog => self.toggle_selected_catalog(),
            Focus::History => {
                self.recall_history(self.selected_history);
            }
            Focus::Results => {}
        }
    }

    // === Input line ===

    pub fn enter_input(&mut self, mode: InputMode) {
        self.input_mode = mode;
        self.input.clear();
        if mode == InputMode::Search {
            if let Some(keyword) = &self.catalog_keyword {
                self.input = keyword.clone();
            }
        }
    }

    pub fn exit_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input.clear();
    }

    pub fn submit_input(&mut self, now: Instant) {
        let text = self.input.clone();
        let mode = self.input_mode;
        self.exit_input();
        match mode {
            InputMode::Normal => {}
            InputMode::Command => {
                let cmd = crate::core::parse_command(&text);
                let action = self.execute_command(&cmd, now);
                self.apply_action(action);
            }
            InputMode::Address => {
                let result = self.submit_address(&text);
                self.report_submission(result);
            }
            InputMode::Batch => {
                let result = self.submit_batch(&text);
                match result {
                    Ok(rejected) if !rejected.is_empty() => self.set_status(
                        format!("Skipped {} invalid: {}", rejected.len(), rejected.join(", ")),
                        StatusLevel::Warn,
                    ),
                    other => self.report_submission(other.map(|_| ())),
                }
            }
            InputMode::Search => {
                self.request_catalog(Some(text), now);
                self.focus = Focus::Catalog;
            }
        }
    }

    fn report_submission(&mut self, result: Result<(), InputRejection>) {
        match result {
            Ok(()) => self.set_status("Querying…", StatusLevel::Info),
            Err(rejection) => self.set_status(rejection.to_string(), StatusLevel::Warn),
        }
    }

    // === Commands ===

    /// Execute a parsed command
    pub fn execute_command(&mut self, cmd: &Command, now: Instant) -> Action {
        match cmd {
            Command::Query(text) => match self.submit_address(text) {
                Ok(()) => Action::Notify("Querying…".to_string(), NotifyLevel::Info),
                Err(rejection) => Action::Notify(rejection.to_string(), NotifyLevel::Warn),
            },
            Command::Batch(text) => match self.submit_batch(text) {
                Ok(rejected) if rejected.is_empty() => Action::Notify(
                    format!("Querying {} addresses…", self.batch.len()),
                    NotifyLevel::Info,
                ),
                Ok(rejected) => Action::Notify(
                    format!("Skipped {} invalid: {}", rejected.len(), rejected.join(", ")),
                    NotifyLevel::Warn,
                ),
                Err(rejection) => Action::Notify(rejection.to_string(), NotifyLevel::Warn),
            },
            Command::Refresh => {
                if self.trigger_fetch() {
                    Action::Notify("Refreshing…".to_string(), NotifyLevel::Info)
                } else {
                    Action::None
                }
            }
            Command::Mode => {
                self.toggle_mode();
                Action::None
            }
            Command::Chain(key) => match self.toggle_key(key) {
                Toggle::Added => Action::Notify(format!("Added {key}"), NotifyLevel::Info),
                Toggle::Removed { .. } => Action::Notify(format!("Removed {key}"), NotifyLevel::Info),
                Toggle::Rejected => Action::None,
            },
            Command::Clear => {
                self.clear_selection();
                Action::None
            }
            Command::Search(keyword) => {
                self.request_catalog(keyword.clone(), now);
                self.focus = Focus::Catalog;
                Action::None
            }
            Command::Forget(address) => {
                if self.history.get(address).is_some() {
                    self.forget_history(address);
                    Action::Notify(format!("Removed {address}"), NotifyLevel::Info)
                } else {
                    Action::Notify(format!("{address} is not in history"), NotifyLevel::Warn)
                }
            }
            Command::Recall(index) => {
                if self.recall_history(*index) {
                    Action::Notify("Querying…".to_string(), NotifyLevel::Info)
                } else {
                    Action::Notify(format!("No history entry {}", index + 1), NotifyLevel::Warn)
                }
            }
            Command::Copy(index) => self.copy_history(index.unwrap_or(self.selected_history)),
            Command::ClearHistory => {
                self.clear_history();
                Action::None
            }
            Command::Quit => Action::Quit,
            Command::Unknown(s) => Action::Notify(format!("Unknown command: {}", s), NotifyLevel::Warn),
        }
    }

    /// Apply an action returned by a command
    pub fn apply_action(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Copy(text) => self.pending_copy_request = Some(text),
            Action::Notify(msg, level) => {
                let level = match level {
                    NotifyLevel::Info => StatusLevel::Info,
                    NotifyLevel::Warn => StatusLevel::Warn,
                };
                self.set_status(msg, level);
            }
            Action::Quit => self.should_quit = true,
        }
    }
}
