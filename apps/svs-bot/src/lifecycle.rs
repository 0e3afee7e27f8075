//! Event lifecycle: create, edit, close and delete the single active event.
//!
//! ```text
//! NoEvent --create--> Active --close/delete--> ClosingConfirm
//!                      ^  |edit                  |  confirmed -> NoEvent
//!                      |__|                      |  timeout/other reply -> Active
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, TimeZone, Utc};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::announcement::{self, Attendance};
use crate::error::Error;
use crate::models::event::discord_timestamp;
use crate::models::{EventRecord, UserId};
use crate::platform::Platform;
use crate::reminder::{self, ReminderScheduler};
use crate::roster::{self, ExportFilter};
use crate::store::Store;

/// Reply that confirms a close or delete, compared case-insensitively.
pub const CONFIRM_WORD: &str = "confirm";

/// Platform-neutral settings consumed by the lifecycle and signup code.
#[derive(Debug, Clone)]
pub struct EventSettings {
    pub main_channels: Vec<u64>,
    pub command_prefix: String,
    pub lottery_winners: usize,
    /// How long before the event MAYBEs are reminded.
    pub reminder_lead: TimeDelta,
    /// Events closer than this get no reminder.
    pub reminder_min_lead: TimeDelta,
    pub confirm_timeout: Duration,
    pub utc_offset: FixedOffset,
    pub csv_filename: String,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            main_channels: Vec::new(),
            command_prefix: "~".into(),
            lottery_winners: 40,
            reminder_lead: TimeDelta::hours(24),
            reminder_min_lead: TimeDelta::hours(48),
            confirm_timeout: Duration::from_secs(60),
            utc_offset: FixedOffset::west_opt(8 * 3600).unwrap_or_else(|| Utc.fix()),
            csv_filename: "svs_entries.csv".into(),
        }
    }
}

/// Who issued an admin command and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub channel_id: u64,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    Create,
    Edit,
    Close,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoEvent,
    Active,
    ClosingConfirm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventEdit {
    Time { date: String, hour: String },
    Title(String),
    Description(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Close signups and export the YES roster.
    Close,
    /// Discard the event without an export.
    Delete,
}

impl CloseKind {
    fn command(self) -> AdminCommand {
        match self {
            CloseKind::Close => AdminCommand::Close,
            CloseKind::Delete => AdminCommand::Delete,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            CloseKind::Close => "close",
            CloseKind::Delete => "delete",
        }
    }

    fn retired_note(self) -> &'static str {
        match self {
            CloseKind::Close => "Sign-ups for this event are closed.",
            CloseKind::Delete => "This event was deleted.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    TimedOut,
    Cancelled,
    Closed {
        record: EventRecord,
        csv: Option<String>,
    },
}

pub fn is_confirmation(reply: &str) -> bool {
    reply.eq_ignore_ascii_case(CONFIRM_WORD)
}

fn parse_component(raw: &str, what: &str) -> Result<u32, Error> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| Error::Validation(format!("{what} must be a number, got '{raw}'.")))
}

/// Parse `yy/mm/dd` and an hour (0-23) in the event time zone.
pub fn parse_event_time(date: &str, hour: &str, offset: FixedOffset) -> Result<DateTime<Utc>, Error> {
    let parts: Vec<&str> = date.split('/').collect();
    let [year, month, day] = parts.as_slice() else {
        return Err(Error::Validation(format!(
            "Date must be formatted yy/mm/dd, got '{date}'."
        )));
    };

    let mut year = parse_component(year, "Year")?;
    if year < 2000 {
        year += 2000;
    }
    let month = parse_component(month, "Month")?;
    let day = parse_component(day, "Day")?;
    let hour = parse_component(hour, "Hour")?;

    let year = i32::try_from(year)
        .map_err(|_| Error::Validation(format!("Year {year} is out of range.")))?;
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::Validation(format!("{year}-{month:02}-{day:02} is not a valid date.")))?;
    let time = NaiveTime::from_hms_opt(hour, 0, 0)
        .ok_or_else(|| Error::Validation(format!("Hour must be between 0 and 23, got {hour}.")))?;

    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| Error::Validation("Event time is ambiguous.".into()))
}

fn non_empty(value: &str, what: &str) -> Result<String, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::Validation(format!("Event {what} must not be empty.")))
    } else {
        Ok(trimmed.to_string())
    }
}

struct ControllerState {
    phase: Phase,
    record: EventRecord,
}

/// Owns the singleton event record and every transition of it.
pub struct EventController {
    store: Store,
    settings: Arc<EventSettings>,
    state: Mutex<ControllerState>,
    reminders: ReminderScheduler,
}

impl EventController {
    pub fn new(store: Store, settings: Arc<EventSettings>) -> Self {
        Self {
            store,
            settings,
            state: Mutex::new(ControllerState {
                phase: Phase::NoEvent,
                record: EventRecord::placeholder(),
            }),
            reminders: ReminderScheduler::new(),
        }
    }

    pub fn settings(&self) -> &EventSettings {
        &self.settings
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    /// The open event, if any.
    pub async fn current(&self) -> Option<EventRecord> {
        let state = self.state.lock().await;
        (state.phase != Phase::NoEvent).then(|| state.record.clone())
    }

    pub fn reminder_pending(&self) -> bool {
        self.reminders.is_pending()
    }

    /// Resume an event persisted before a restart.
    pub async fn restore(&self, platform: Arc<dyn Platform>) -> Result<Option<EventRecord>, Error> {
        let record = self.store.get_event().await?;
        if !record.is_active() {
            return Ok(None);
        }

        let mut state = self.state.lock().await;
        state.phase = Phase::Active;
        state.record = record.clone();
        self.arm_reminder(&record, platform);
        drop(state);

        info!(title = %record.title, message = record.message_ref, "Restored active event");
        Ok(Some(record))
    }

    fn authorize(&self, actor: &Actor, command: AdminCommand, state: &ControllerState) -> Result<(), Error> {
        if !actor.is_admin {
            return Err(Error::Unauthorized(
                "You need the event admin role to use this command.".into(),
            ));
        }

        if !self.settings.main_channels.contains(&actor.channel_id) {
            let message = if self.settings.main_channels.is_empty() {
                "No event channels are configured for this bot.".to_string()
            } else {
                let mentions: Vec<String> = self
                    .settings
                    .main_channels
                    .iter()
                    .map(|c| format!("<#{c}>"))
                    .collect();
                format!("Command restricted to channels:\n{}", mentions.join(", "))
            };
            return Err(Error::Unauthorized(message));
        }

        match (state.phase, command) {
            (Phase::ClosingConfirm, _) => Err(Error::Conflict(
                "A close or delete confirmation is already pending.".into(),
            )),
            (Phase::Active, AdminCommand::Create) => {
                if state.record.channel_ref == actor.channel_id {
                    Err(Error::Conflict(format!(
                        "An event is already active in this channel. Use {}delete to delete it.",
                        self.settings.command_prefix
                    )))
                } else {
                    Err(Error::Conflict(format!(
                        "An event is already active in <#{}>. Only one event may be active at a time.",
                        state.record.channel_ref
                    )))
                }
            }
            (Phase::Active, _) if state.record.channel_ref != actor.channel_id => Err(
                Error::Unauthorized(format!("Must use command in <#{}>.", state.record.channel_ref)),
            ),
            (Phase::NoEvent, AdminCommand::Create) | (Phase::Active, _) => Ok(()),
            (Phase::NoEvent, _) => Err(Error::Conflict("No active event.".into())),
        }
    }

    fn footer(&self) -> String {
        let p = &self.settings.command_prefix;
        format!("{p}edit, {p}close, {p}delete, {p}help")
    }

    /// Names of everyone who has reacted, grouped by status.
    pub async fn attendance(&self, platform: &dyn Platform) -> Result<Attendance, Error> {
        let mut attendance = Attendance::default();
        for profile in self.store.interacted_profiles().await? {
            if let Some(name) = platform.display_name(profile.id).await {
                attendance.push(profile.status, name);
            }
        }
        Ok(attendance)
    }

    async fn render(&self, record: &EventRecord, platform: &dyn Platform) -> Result<announcement::Announcement, Error> {
        let attendance = self.attendance(platform).await?;
        Ok(announcement::event_announcement(record, &attendance, &self.footer()))
    }

    /// Re-render the announcement with the current attendance.
    pub async fn refresh_announcement(&self, platform: &dyn Platform) -> Result<(), Error> {
        let Some(record) = self.current().await else {
            return Ok(());
        };
        let post = self.render(&record, platform).await?;
        platform
            .update_announcement(record.channel_ref, record.message_ref, &post)
            .await
    }

    fn arm_reminder(&self, record: &EventRecord, platform: Arc<dyn Platform>) {
        let Some(starts_at) = record.starts_at_utc() else {
            self.reminders.cancel();
            return;
        };
        let now = Utc::now();

        if starts_at - now <= self.settings.reminder_min_lead {
            self.reminders.cancel();
            return;
        }
        match reminder::reminder_delay(starts_at, now, self.settings.reminder_lead) {
            Some(delay) => self
                .reminders
                .arm(delay, reminder::reminder_job(self.store.clone(), platform)),
            None => {
                self.reminders.cancel();
            }
        }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        date: &str,
        hour: &str,
        title: &str,
        description: &str,
        platform: Arc<dyn Platform>,
    ) -> Result<EventRecord, Error> {
        let mut state = self.state.lock().await;
        self.authorize(actor, AdminCommand::Create, &state)?;

        let starts_at = parse_event_time(date, hour, self.settings.utc_offset)?;
        let mut record = EventRecord {
            title: non_empty(title, "title")?,
            description: non_empty(description, "description")?,
            starts_at: starts_at.timestamp(),
            formatted_time: discord_timestamp(starts_at.timestamp()),
            message_ref: 0,
            channel_ref: actor.channel_id,
        };

        let post = self.render(&record, platform.as_ref()).await?;
        record.message_ref = platform.post_announcement(actor.channel_id, &post).await?;

        if let Err(e) = self.store.replace_event(&record).await {
            error!(error = %e, "Failed to persist new event, retracting announcement");
            if let Err(e) = platform
                .retire_announcement(record.channel_ref, record.message_ref, "This event could not be saved.")
                .await
            {
                warn!(error = %e, "Failed to retract unsaved announcement");
            }
            return Err(e);
        }

        state.phase = Phase::Active;
        state.record = record.clone();
        // Armed while the state lock is held.
        self.arm_reminder(&record, platform);
        drop(state);

        info!(
            user = %actor.user_id,
            title = %record.title,
            starts_at = record.starts_at,
            "Event created"
        );
        Ok(record)
    }

    pub async fn edit(
        &self,
        actor: &Actor,
        edit: EventEdit,
        platform: Arc<dyn Platform>,
    ) -> Result<EventRecord, Error> {
        let mut state = self.state.lock().await;
        self.authorize(actor, AdminCommand::Edit, &state)?;

        let mut record = state.record.clone();
        let retime = matches!(edit, EventEdit::Time { .. });
        match edit {
            EventEdit::Time { date, hour } => {
                let starts_at = parse_event_time(&date, &hour, self.settings.utc_offset)?;
                record.starts_at = starts_at.timestamp();
                record.formatted_time = discord_timestamp(starts_at.timestamp());
            }
            EventEdit::Title(title) => record.title = non_empty(&title, "title")?,
            EventEdit::Description(description) => {
                record.description = non_empty(&description, "description")?
            }
        }

        self.store.replace_event(&record).await?;
        state.record = record.clone();
        if retime {
            self.arm_reminder(&record, platform.clone());
        }
        drop(state);

        let post = self.render(&record, platform.as_ref()).await?;
        platform
            .update_announcement(record.channel_ref, record.message_ref, &post)
            .await?;

        info!(user = %actor.user_id, title = %record.title, "Event edited");
        Ok(record)
    }

    async fn set_phase(&self, phase: Phase) {
        self.state.lock().await.phase = phase;
    }

    /// Ask `actor` to confirm, then close or delete the event.
    ///
    /// `reply` resolves to the actor's private reply, or `None` if the
    /// platform gave up waiting. The controller lock is not held while
    /// waiting, so signups keep flowing.
    pub async fn confirm_and_close<F>(
        &self,
        actor: &Actor,
        kind: CloseKind,
        platform: Arc<dyn Platform>,
        reply: F,
    ) -> Result<CloseOutcome, Error>
    where
        F: Future<Output = Option<String>>,
    {
        let record = {
            let mut state = self.state.lock().await;
            self.authorize(actor, kind.command(), &state)?;
            state.phase = Phase::ClosingConfirm;
            state.record.clone()
        };

        let timeout = self.settings.confirm_timeout;
        let prompt = announcement::close_prompt(
            &self.settings.command_prefix,
            kind == CloseKind::Delete,
            timeout.as_secs(),
        );
        if let Err(e) = platform.send_direct(actor.user_id, &prompt).await {
            self.set_phase(Phase::Active).await;
            return Err(e);
        }

        let answer = match tokio::time::timeout(timeout, reply).await {
            Ok(Some(answer)) => answer,
            Ok(None) | Err(_) => {
                self.set_phase(Phase::Active).await;
                info!(user = %actor.user_id, action = kind.verb(), "Confirmation timed out");
                let notice = format!(
                    "No response received in {} seconds, event {} cancelled.",
                    timeout.as_secs(),
                    kind.verb()
                );
                if let Err(e) = platform.send_direct(actor.user_id, &notice).await {
                    warn!(error = %e, "Failed to send timeout notice");
                }
                return Ok(CloseOutcome::TimedOut);
            }
        };

        if !is_confirmation(&answer) {
            self.set_phase(Phase::Active).await;
            info!(user = %actor.user_id, action = kind.verb(), "Confirmation declined");
            let notice = format!("Event {} cancelled.", kind.verb());
            if let Err(e) = platform.send_direct(actor.user_id, &notice).await {
                warn!(error = %e, "Failed to send cancel notice");
            }
            return Ok(CloseOutcome::Cancelled);
        }

        match self.finish_close(actor, kind, &record, platform.as_ref()).await {
            Ok(csv) => Ok(CloseOutcome::Closed { record, csv }),
            Err(e) => {
                self.set_phase(Phase::Active).await;
                Err(e)
            }
        }
    }

    async fn finish_close(
        &self,
        actor: &Actor,
        kind: CloseKind,
        record: &EventRecord,
        platform: &dyn Platform,
    ) -> Result<Option<String>, Error> {
        let csv = match kind {
            CloseKind::Close => {
                let rows = roster::load_rows(&self.store, platform, ExportFilter::Yes).await?;
                let csv = roster::build_roster_csv(
                    &rows,
                    self.settings.lottery_winners,
                    &mut rand::thread_rng(),
                );
                platform
                    .send_file(
                        actor.user_id,
                        &format!("CSV of everyone who responded YES to {}", record.info()),
                        &self.settings.csv_filename,
                        csv.clone().into_bytes(),
                    )
                    .await?;
                Some(csv)
            }
            CloseKind::Delete => {
                platform
                    .send_direct(actor.user_id, &format!("Deleted {}", record.info()))
                    .await?;
                None
            }
        };

        // The announcement stays live until the reset is committed.
        self.store.close_out_event().await?;
        self.reminders.cancel();

        if let Err(e) = platform
            .retire_announcement(record.channel_ref, record.message_ref, kind.retired_note())
            .await
        {
            warn!(error = %e, "Failed to retire event announcement");
        }

        let mut state = self.state.lock().await;
        state.phase = Phase::NoEvent;
        state.record = EventRecord::placeholder();

        info!(user = %actor.user_id, title = %record.title, action = kind.verb(), "Event finished");
        Ok(csv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Profession, Status, Unit};
    use crate::testing::{details, memory_store, FakePlatform};
    use pretty_assertions::assert_eq;

    const CHANNEL: u64 = 10;
    const OTHER_CHANNEL: u64 = 11;

    fn settings() -> Arc<EventSettings> {
        Arc::new(EventSettings {
            main_channels: vec![CHANNEL, OTHER_CHANNEL],
            ..EventSettings::default()
        })
    }

    fn admin() -> Actor {
        Actor {
            user_id: 1,
            channel_id: CHANNEL,
            is_admin: true,
        }
    }

    async fn setup() -> (EventController, Arc<FakePlatform>) {
        let controller = EventController::new(memory_store().await, settings());
        (controller, Arc::new(FakePlatform::default()))
    }

    async fn create_default(controller: &EventController, platform: &Arc<FakePlatform>) -> EventRecord {
        controller
            .create(&admin(), "23/01/15", "11", "SvS Event", "desc", platform.clone())
            .await
            .unwrap()
    }

    #[test]
    fn parses_two_digit_year_in_event_offset() {
        let offset = FixedOffset::west_opt(8 * 3600).unwrap();
        let t = parse_event_time("23/01/15", "11", offset).unwrap();
        assert_eq!(t.timestamp(), 1_673_809_200);
    }

    #[test]
    fn rejects_malformed_dates() {
        let offset = FixedOffset::east_opt(0).unwrap();
        for (date, hour) in [
            ("23/13/01", "11"),
            ("23/02/30", "11"),
            ("ab/01/01", "11"),
            ("23/01", "11"),
            ("23/01/15", "24"),
            ("23/01/15", "noon"),
        ] {
            assert!(
                matches!(parse_event_time(date, hour, offset), Err(Error::Validation(_))),
                "{date} {hour}"
            );
        }
    }

    #[test]
    fn confirmation_is_case_insensitive_and_exact() {
        assert!(is_confirmation("confirm"));
        assert!(is_confirmation("CoNfIrM"));
        assert!(!is_confirmation("confirmed"));
        assert!(!is_confirmation("yes"));
    }

    #[tokio::test]
    async fn create_activates_and_second_create_conflicts() {
        let (controller, platform) = setup().await;
        let record = create_default(&controller, &platform).await;

        assert_eq!(record.title, "SvS Event");
        assert_eq!(record.formatted_time, "<t:1673809200:F>");
        assert_eq!(record.channel_ref, CHANNEL);
        assert!(record.is_active());
        assert_eq!(controller.phase().await, Phase::Active);
        assert_eq!(controller.store().get_event().await.unwrap(), record);
        assert_eq!(platform.posts().len(), 1);
        assert_eq!(platform.posts()[0].1.description, "@ <t:1673809200:F>\n\ndesc");

        for channel in [CHANNEL, OTHER_CHANNEL] {
            let actor = Actor { channel_id: channel, ..admin() };
            let err = controller
                .create(&actor, "24/01/15", "11", "Other", "x", platform.clone())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Conflict(_)));
        }
        assert_eq!(controller.current().await, Some(record.clone()));
        assert_eq!(controller.store().get_event().await.unwrap(), record);
    }

    #[tokio::test]
    async fn rejects_non_admins_and_unlisted_channels() {
        let (controller, platform) = setup().await;

        let member = Actor { is_admin: false, ..admin() };
        let err = controller
            .create(&member, "23/01/15", "11", "t", "d", platform.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        let elsewhere = Actor { channel_id: 99, ..admin() };
        let err = controller
            .create(&elsewhere, "23/01/15", "11", "t", "d", platform.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        assert_eq!(controller.phase().await, Phase::NoEvent);
        assert!(platform.posts().is_empty());
    }

    #[tokio::test]
    async fn edit_requires_event_and_its_channel() {
        let (controller, platform) = setup().await;
        let err = controller
            .edit(&admin(), EventEdit::Title("x".into()), platform.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        create_default(&controller, &platform).await;
        let other = Actor { channel_id: OTHER_CHANNEL, ..admin() };
        let err = controller
            .edit(&other, EventEdit::Title("x".into()), platform.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn edit_changes_single_field_and_keeps_profiles() {
        let (controller, platform) = setup().await;
        let store = controller.store().clone();
        store
            .save_details(5, &details(Profession::Mastermind, 1, &[Unit::Army]))
            .await
            .unwrap();
        create_default(&controller, &platform).await;
        store.set_status(5, Status::Yes).await.unwrap();

        let record = controller
            .edit(&admin(), EventEdit::Title("Renamed".into()), platform.clone())
            .await
            .unwrap();
        assert_eq!(record.title, "Renamed");
        assert_eq!(record.description, "desc");

        let record = controller
            .edit(
                &admin(),
                EventEdit::Time { date: "23/01/16".into(), hour: "11".into() },
                platform.clone(),
            )
            .await
            .unwrap();
        assert_eq!(record.starts_at, 1_673_809_200 + 86_400);
        assert_eq!(record.title, "Renamed");

        let err = controller
            .edit(
                &admin(),
                EventEdit::Time { date: "23/01/16".into(), hour: "99".into() },
                platform.clone(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(controller.current().await.unwrap().starts_at, record.starts_at);

        let updates = platform.updates();
        let last = &updates.last().unwrap().1;
        assert_eq!(last.title, "Renamed");
        assert_eq!(last.fields[0].value, "user5");
        assert_eq!(store.get_profile(5).await.unwrap().unwrap().status, Status::Yes);
    }

    #[tokio::test]
    async fn far_event_arms_reminder_and_near_retime_cancels_it() {
        let (controller, platform) = setup().await;
        controller
            .create(&admin(), "99/12/31", "11", "Future", "d", platform.clone())
            .await
            .unwrap();
        assert!(controller.reminder_pending());

        controller
            .edit(
                &admin(),
                EventEdit::Time { date: "23/01/15".into(), hour: "11".into() },
                platform.clone(),
            )
            .await
            .unwrap();
        assert!(!controller.reminder_pending());
    }

    #[tokio::test]
    async fn timeout_leaves_everything_unchanged() {
        let quick = EventSettings {
            confirm_timeout: Duration::from_millis(50),
            ..(*settings()).clone()
        };
        let controller = EventController::new(memory_store().await, Arc::new(quick));
        let platform = Arc::new(FakePlatform::default());
        let store = controller.store().clone();
        store
            .save_details(5, &details(Profession::Mastermind, 1, &[Unit::Army]))
            .await
            .unwrap();
        let record = create_default(&controller, &platform).await;
        store.set_status(5, Status::Yes).await.unwrap();

        let outcome = controller
            .confirm_and_close(
                &admin(),
                CloseKind::Close,
                platform.clone(),
                std::future::pending::<Option<String>>(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, CloseOutcome::TimedOut);
        assert_eq!(controller.phase().await, Phase::Active);
        assert_eq!(controller.store().get_event().await.unwrap(), record);
        assert!(platform.retired().is_empty());
        assert!(platform.files().is_empty());
        let profile = store.get_profile(5).await.unwrap().unwrap();
        assert_eq!(profile.status, Status::Yes);
        assert!(profile.interacted_with_event);
    }

    #[tokio::test]
    async fn other_reply_cancels() {
        let (controller, platform) = setup().await;
        let store = controller.store().clone();
        store
            .save_details(6, &details(Profession::CombatEngineer, 2, &[Unit::Navy]))
            .await
            .unwrap();
        let record = create_default(&controller, &platform).await;
        store.set_status(6, Status::Maybe).await.unwrap();

        let outcome = controller
            .confirm_and_close(&admin(), CloseKind::Delete, platform.clone(), async {
                Some("nope".to_string())
            })
            .await
            .unwrap();

        assert_eq!(outcome, CloseOutcome::Cancelled);
        assert_eq!(controller.current().await, Some(record.clone()));
        assert_eq!(controller.store().get_event().await.unwrap(), record);
        assert!(platform.retired().is_empty());
        let profile = store.get_profile(6).await.unwrap().unwrap();
        assert_eq!(profile.status, Status::Maybe);
        assert!(profile.interacted_with_event);
    }

    #[tokio::test]
    async fn failed_reset_keeps_announcement_live() {
        let (controller, platform) = setup().await;
        create_default(&controller, &platform).await;
        sqlx::query("DROP TABLE event")
            .execute(controller.store().pool())
            .await
            .unwrap();

        let err = controller
            .confirm_and_close(&admin(), CloseKind::Delete, platform.clone(), async {
                Some("confirm".to_string())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Database(_)));
        assert!(platform.retired().is_empty());
        assert_eq!(controller.phase().await, Phase::Active);
    }

    #[tokio::test]
    async fn confirmed_close_exports_and_resets() {
        let (controller, platform) = setup().await;
        let store = controller.store().clone();
        for id in [5, 6, 7] {
            store
                .save_details(id, &details(Profession::CombatEngineer, 2, &[Unit::Navy]))
                .await
                .unwrap();
        }
        let record = create_default(&controller, &platform).await;
        store.set_status(5, Status::Yes).await.unwrap();
        store.set_status(6, Status::Maybe).await.unwrap();

        let outcome = controller
            .confirm_and_close(&admin(), CloseKind::Close, platform.clone(), async {
                Some("Confirm".to_string())
            })
            .await
            .unwrap();

        let CloseOutcome::Closed { record: closed, csv } = outcome else {
            panic!("expected close");
        };
        assert_eq!(closed, record);
        let csv = csv.unwrap();
        assert!(csv.contains("user5"));
        assert!(!csv.contains("user6"));

        let files = platform.files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1, "svs_entries.csv");
        assert_eq!(
            platform.retired(),
            vec![(record.message_ref, "Sign-ups for this event are closed.".to_string())]
        );

        assert_eq!(controller.phase().await, Phase::NoEvent);
        assert_eq!(store.get_event().await.unwrap(), EventRecord::placeholder());
        for profile in store.profiles_with_status(&Status::ALL).await.unwrap() {
            assert_eq!(profile.status, Status::No);
            assert!(!profile.interacted_with_event);
        }
    }

    #[tokio::test]
    async fn confirmed_delete_skips_export() {
        let (controller, platform) = setup().await;
        create_default(&controller, &platform).await;

        let outcome = controller
            .confirm_and_close(&admin(), CloseKind::Delete, platform.clone(), async {
                Some("confirm".to_string())
            })
            .await
            .unwrap();

        assert!(matches!(outcome, CloseOutcome::Closed { csv: None, .. }));
        assert!(platform.files().is_empty());
        assert_eq!(platform.retired()[0].1, "This event was deleted.");
        assert_eq!(controller.current().await, None);

        // A new event can be created afterwards.
        create_default(&controller, &platform).await;
    }

    #[tokio::test]
    async fn restore_resumes_persisted_event() {
        let store = memory_store().await;
        let record = EventRecord {
            title: "Persisted".into(),
            description: "d".into(),
            starts_at: 1_673_809_200,
            formatted_time: discord_timestamp(1_673_809_200),
            message_ref: 55,
            channel_ref: CHANNEL,
        };
        store.replace_event(&record).await.unwrap();

        let controller = EventController::new(store, settings());
        let platform: Arc<dyn Platform> = Arc::new(FakePlatform::default());
        assert_eq!(controller.restore(platform).await.unwrap(), Some(record.clone()));
        assert_eq!(controller.current().await, Some(record));
        assert_eq!(controller.phase().await, Phase::Active);
    }
}
