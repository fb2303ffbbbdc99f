use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Day first, 24-hour clock, zero padded.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Entry,
    Exit,
}

impl Label {
    /// Label produced by a tap in the given toggle mode.
    pub fn for_mode(is_entry: bool) -> Self {
        if is_entry {
            Label::Entry
        } else {
            Label::Exit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Entry => "Entry",
            Label::Exit => "Exit",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A single recorded Entry/Exit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub label: Label,
    /// Local time formatted with [`TIMESTAMP_FORMAT`]
    pub timestamp: String,
}

impl LogEntry {
    pub fn new(label: Label, timestamp: String) -> Self {
        Self { label, timestamp }
    }

    pub fn at(label: Label, time: DateTime<Local>) -> Self {
        Self::new(label, format_timestamp(time))
    }
}

pub fn format_timestamp(time: DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}
