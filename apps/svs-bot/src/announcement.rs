//! Structured content for event announcements and the messages sent around
//! them. Rendering to embeds happens in `utils::embeds`.

use crate::models::{EventRecord, Status};

/// Discord caps an embed field value at 1024 characters.
const FIELD_VALUE_LIMIT: usize = 1024;
const BLANK: &str = "\u{200b}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub title: String,
    pub description: String,
    pub fields: Vec<AnnouncementField>,
    pub footer: String,
}

/// Display names of everyone signed up, per status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attendance {
    pub yes: Vec<String>,
    pub maybe: Vec<String>,
    pub no: Vec<String>,
}

impl Attendance {
    pub fn push(&mut self, status: Status, name: String) {
        match status {
            Status::Yes => self.yes.push(name),
            Status::Maybe => self.maybe.push(name),
            Status::No => self.no.push(name),
        }
    }

    pub fn names(&self, status: Status) -> &[String] {
        match status {
            Status::Yes => &self.yes,
            Status::Maybe => &self.maybe,
            Status::No => &self.no,
        }
    }
}

/// Join names one per line, cutting off with a count once the field limit
/// is reached.
fn field_value(names: &[String]) -> String {
    if names.is_empty() {
        return BLANK.to_string();
    }

    let mut value = String::new();
    for (shown, name) in names.iter().enumerate() {
        let remaining = names.len() - shown;
        let suffix = format!("... and {remaining} more");
        if value.len() + name.len() + 1 + suffix.len() > FIELD_VALUE_LIMIT {
            value.push_str(&suffix);
            return value;
        }
        value.push_str(name);
        value.push('\n');
    }
    value.trim_end().to_string()
}

pub fn event_description(formatted_time: &str, description: &str) -> String {
    format!("@ {formatted_time}\n\n{description}")
}

/// The signup post for `record`.
pub fn event_announcement(record: &EventRecord, attendance: &Attendance, footer: &str) -> Announcement {
    let fields = Status::ALL
        .iter()
        .map(|status| {
            let names = attendance.names(*status);
            AnnouncementField {
                name: format!("{} ({})", status, names.len()),
                value: field_value(names),
                inline: true,
            }
        })
        .collect();

    Announcement {
        title: record.title.clone(),
        description: event_description(&record.formatted_time, &record.description),
        fields,
        footer: footer.to_string(),
    }
}

pub fn acknowledgement(status: Status, record: &EventRecord) -> String {
    format!("You are **{status}** for {}", record.info())
}

pub fn maybe_reminder(record: &EventRecord) -> String {
    format!(
        "This is a reminder that you are registered as **MAYBE** for {}\n\
         If you would like to change your status, react on the event post.",
        record.info()
    )
}

/// Sent to users who are not in the database yet.
pub fn registration_prompt(prefix: &str, event_attempt: bool) -> String {
    let lead = if event_attempt {
        "Your event registration was not recorded because you are not in the database.\n\
         After registering, you may sign up for the event again.\n"
    } else {
        "You do not have an entry in the database yet.\n"
    };
    format!(
        "{lead}Register with `/register` (or `{prefix}register`) giving your class, level, \
         units, march size and alliance."
    )
}

pub fn close_prompt(prefix: &str, delete: bool, timeout_secs: u64) -> String {
    if delete {
        format!(
            "`{prefix}delete`: type \"confirm\" within {timeout_secs} seconds to confirm you \
             want to delete the event."
        )
    } else {
        format!(
            "`{prefix}close`: type \"confirm\" within {timeout_secs} seconds to close signups \
             and receive a CSV of attendees. This cannot be undone, as it resets everyone's \
             status to \"NO\"."
        )
    }
}
