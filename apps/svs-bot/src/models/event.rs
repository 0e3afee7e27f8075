//! The singleton event record.

use chrono::{DateTime, Utc};

/// The currently open signup event, or the placeholder when none is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub title: String,
    pub description: String,
    /// Unix seconds.
    pub starts_at: i64,
    /// Discord timestamp markup rendered in each reader's local time.
    pub formatted_time: String,
    pub message_ref: u64,
    pub channel_ref: u64,
}

impl EventRecord {
    pub fn placeholder() -> Self {
        Self {
            title: "placeholder".into(),
            description: String::new(),
            starts_at: 0,
            formatted_time: "placeholder".into(),
            message_ref: 0,
            channel_ref: 0,
        }
    }

    /// A zero message reference means no event is open.
    pub fn is_active(&self) -> bool {
        self.message_ref != 0
    }

    /// `"Title @ <t:...:F>"`, used in DMs and export captions.
    pub fn info(&self) -> String {
        format!("{} @ {}", self.title, self.formatted_time)
    }

    pub fn starts_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.starts_at, 0)
    }
}

impl Default for EventRecord {
    fn default() -> Self {
        Self::placeholder()
    }
}

pub fn discord_timestamp(unix: i64) -> String {
    format!("<t:{unix}:F>")
}
