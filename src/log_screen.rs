use crate::log_entry::{Label, LogEntry};
use crate::store::{decode, KeyValueStore, PendingWrites, LOGS_KEY, STATUS_KEY};
use crate::toggle::{LoadState, PersistedToggle};
use chrono::{DateTime, Local};
use log::{error, info, warn};
use std::fmt::Write;
use std::sync::Arc;

pub const TITLE: &str = "Timestamp Logger";

/// State behind the single logger screen: the entry list and the
/// Entry/Exit toggle, both mirrored into the store.
pub struct LogScreen {
    logs: Vec<LogEntry>,
    state: LoadState,
    status: PersistedToggle,
    writes: PendingWrites,
}

impl LogScreen {
    pub fn new(store: Arc<dyn KeyValueStore>, default_status: bool) -> Self {
        Self {
            logs: Vec::new(),
            state: LoadState::AwaitingInitialLoad,
            status: PersistedToggle::new(Arc::clone(&store), STATUS_KEY, default_status),
            writes: PendingWrites::new(store, LOGS_KEY),
        }
    }

    /// Loads the toggle and the stored list. Never fails: any storage or
    /// decode problem leaves the list empty.
    pub async fn init(&mut self) {
        self.status.init().await;

        match self.writes.store().get(LOGS_KEY).await {
            Ok(Some(raw)) if !raw.is_empty() => match decode::<Vec<LogEntry>>(&raw) {
                Ok(logs) => {
                    info!("Loaded {} log entries from storage", logs.len());
                    self.logs = logs;
                }
                Err(e) => error!("Failed to load logs from storage: {}", e),
            },
            Ok(_) => info!("No stored logs"),
            Err(e) => error!("Failed to load logs from storage: {}", e),
        }

        self.state = LoadState::Ready;
        self.persist();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_entry(&self) -> bool {
        self.status.value()
    }

    pub fn current_label(&self) -> Label {
        Label::for_mode(self.is_entry())
    }

    pub fn button_caption(&self) -> &'static str {
        match self.current_label() {
            Label::Entry => "Log Entry",
            Label::Exit => "Log Exit",
        }
    }

    /// Logs whatever the button currently shows.
    pub fn press_button(&mut self) -> Label {
        let label = self.current_label();
        self.add_timestamp(label);
        label
    }

    pub fn add_timestamp(&mut self, label: Label) {
        self.add_timestamp_at(label, Local::now());
    }

    pub fn add_timestamp_at(&mut self, label: Label, time: DateTime<Local>) {
        let entry = LogEntry::at(label, time);
        info!("Logged {} at {}", entry.label, entry.timestamp);
        self.logs.push(entry);
        self.persist();
        self.status.toggle();
    }

    /// Removes the row at `index`. Out-of-range indices leave the list as is.
    pub fn delete_timestamp(&mut self, index: usize) {
        if index >= self.logs.len() {
            warn!("No row {} to delete", index);
        }
        self.logs = self
            .logs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, entry)| entry.clone())
            .collect();
        self.persist();
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", TITLE);
        let _ = writeln!(out, "( {} )", self.button_caption());
        let _ = writeln!(out);

        if self.logs.is_empty() {
            let _ = writeln!(out, "No entries yet.");
        }

        for (index, entry) in self.logs.iter().enumerate() {
            let marker = match entry.label {
                Label::Entry => '+',
                Label::Exit => '-',
            };
            let _ = writeln!(
                out,
                "{:>3} {} {:<5} {}  [x]",
                index, marker, entry.label, entry.timestamp
            );
        }

        out
    }

    /// Waits for every write scheduled so far, list and toggle alike.
    pub async fn flush(&mut self) {
        self.writes.flush().await;
        self.status.flush().await;
    }

    fn persist(&mut self) {
        self.writes.schedule(&self.logs);
    }
}
