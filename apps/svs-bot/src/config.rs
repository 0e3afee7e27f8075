use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, TimeDelta};
use serenity::all::{ChannelId, GuildId, RoleId};

use crate::error::Error;
use crate::lifecycle::EventSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub guild_id: Option<GuildId>,
    pub main_channel_ids: Vec<ChannelId>,
    pub admin_role_id: Option<RoleId>,
    pub bug_report_channel_id: Option<ChannelId>,
    pub command_prefix: String,
    pub lotto_winners: usize,
    pub confirm_maybe_warning_hours: i64,
    pub confirm_maybe_min_lead_hours: i64,
    pub confirm_timeout_secs: u64,
    pub event_utc_offset_hours: i32,
    pub csv_filename: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `DISCORD_TOKEN`: Bot token from Discord Developer Portal
    ///
    /// Optional:
    /// - `DATABASE_URL`: SQLite connection string (default "sqlite:svsbot.db?mode=rwc")
    /// - `GUILD_ID`: Central guild used for display names and slash registration
    /// - `MAIN_CHANNEL_IDS`: Comma-separated channels where events may be managed
    /// - `ADMIN_ROLE_ID`: Role allowed to manage events and exports
    /// - `BUG_REPORT_CHANNEL_ID`: Channel receiving `/bug` reports
    /// - `COMMAND_PREFIX`, `NUMBER_OF_LOTTO_WINNERS`, `CONFIRM_MAYBE_WARNING_HOURS`,
    ///   `CONFIRM_MAYBE_MIN_LEAD_HOURS`, `CONFIRM_TIMEOUT_SECS`,
    ///   `EVENT_UTC_OFFSET_HOURS`, `CSV_FILENAME`
    pub fn from_env() -> Result<Self, Error> {
        let discord_token = std::env::var("DISCORD_TOKEN")
            .map_err(|_| Error::Config("DISCORD_TOKEN environment variable is required".into()))?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:svsbot.db?mode=rwc".into());

        let guild_id = parse_optional_id::<GuildId>("GUILD_ID")?;
        let main_channel_ids = parse_id_list::<ChannelId>("MAIN_CHANNEL_IDS")?;
        let admin_role_id = parse_optional_id::<RoleId>("ADMIN_ROLE_ID")?;
        let bug_report_channel_id = parse_optional_id::<ChannelId>("BUG_REPORT_CHANNEL_ID")?;

        let command_prefix = std::env::var("COMMAND_PREFIX")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| "~".into());

        let event_utc_offset_hours = parse_or("EVENT_UTC_OFFSET_HOURS", -8)?;
        if !(-23..=23).contains(&event_utc_offset_hours) {
            return Err(Error::Config(format!(
                "EVENT_UTC_OFFSET_HOURS must be between -23 and 23, got {event_utc_offset_hours}"
            )));
        }

        Ok(Self {
            discord_token,
            database_url,
            guild_id,
            main_channel_ids,
            admin_role_id,
            bug_report_channel_id,
            command_prefix,
            lotto_winners: parse_or("NUMBER_OF_LOTTO_WINNERS", 40)?,
            confirm_maybe_warning_hours: parse_or("CONFIRM_MAYBE_WARNING_HOURS", 24)?,
            confirm_maybe_min_lead_hours: parse_or("CONFIRM_MAYBE_MIN_LEAD_HOURS", 48)?,
            confirm_timeout_secs: parse_or("CONFIRM_TIMEOUT_SECS", 60)?,
            event_utc_offset_hours,
            csv_filename: std::env::var("CSV_FILENAME")
                .unwrap_or_else(|_| "svs_entries.csv".into()),
        })
    }

    /// The platform-neutral subset used by the event core.
    pub fn event_settings(&self) -> Result<EventSettings, Error> {
        let utc_offset = FixedOffset::east_opt(self.event_utc_offset_hours * 3600).ok_or_else(|| {
            Error::Config(format!(
                "Invalid event UTC offset: {} hours",
                self.event_utc_offset_hours
            ))
        })?;

        Ok(EventSettings {
            main_channels: self.main_channel_ids.iter().map(|c| c.get()).collect(),
            command_prefix: self.command_prefix.clone(),
            lottery_winners: self.lotto_winners,
            reminder_lead: TimeDelta::hours(self.confirm_maybe_warning_hours),
            reminder_min_lead: TimeDelta::hours(self.confirm_maybe_min_lead_hours),
            confirm_timeout: Duration::from_secs(self.confirm_timeout_secs),
            utc_offset,
            csv_filename: self.csv_filename.clone(),
        })
    }
}

fn parse_or<T: FromStr>(var: &str, default: T) -> Result<T, Error> {
    match std::env::var(var) {
        Ok(val) if !val.trim().is_empty() => val
            .trim()
            .parse::<T>()
            .map_err(|_| Error::Config(format!("Invalid value for {var}: '{val}'"))),
        _ => Ok(default),
    }
}

fn parse_id_list<T>(var: &str) -> Result<Vec<T>, Error>
where
    T: From<u64>,
{
    match std::env::var(var) {
        Ok(val) if !val.is_empty() => val
            .split(',')
            .map(|s| {
                s.trim()
                    .parse::<u64>()
                    .map(T::from)
                    .map_err(|_| Error::Config(format!("Invalid ID in {var}: '{s}'")))
            })
            .collect(),
        _ => Ok(Vec::new()),
    }
}

fn parse_optional_id<T>(var: &str) -> Result<Option<T>, Error>
where
    T: From<u64>,
{
    match std::env::var(var) {
        Ok(val) if !val.is_empty() => {
            let id = val
                .trim()
                .parse::<u64>()
                .map_err(|_| Error::Config(format!("Invalid ID for {var}: '{val}'")))?;
            Ok(Some(T::from(id)))
        }
        _ => Ok(None),
    }
}
