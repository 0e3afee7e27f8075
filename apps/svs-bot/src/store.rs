//! Row store for profiles and the event record.
//!
//! Every write replaces whole columns in a single statement (or a single
//! transaction for the close-out reset) and returns only after SQLite has
//! committed it.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{error, info};

use crate::error::Error;
use crate::models::profile::{join_list, split_list};
use crate::models::{EventRecord, ProfileDetails, ProfileEntry, Status, UserId};

#[derive(sqlx::FromRow)]
struct ProfileRow {
    discord_id: i64,
    class: String,
    level: i64,
    units: String,
    march_size: String,
    alliance: String,
    traps: String,
    skins: String,
    status: String,
    lottery: bool,
    interacted_with_event: bool,
}

impl TryFrom<ProfileRow> for ProfileEntry {
    type Error = Error;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let level = u8::try_from(row.level)
            .map_err(|_| Error::Integrity(format!("Stored level {} out of range", row.level)))?;

        Ok(ProfileEntry {
            id: row.discord_id as UserId,
            details: ProfileDetails {
                profession: row.class.parse()?,
                level,
                units: split_list(&row.units)
                    .iter()
                    .map(|u| u.parse())
                    .collect::<Result<_, _>>()?,
                march_size: row.march_size,
                alliance: row.alliance,
                traps: split_list(&row.traps)
                    .iter()
                    .map(|t| t.parse())
                    .collect::<Result<_, _>>()?,
                skins: split_list(&row.skins),
            },
            status: row.status.parse()?,
            lottery_opt_in: row.lottery,
            interacted_with_event: row.interacted_with_event,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    title: String,
    description: String,
    starts_at: i64,
    formatted_time: String,
    message_id: i64,
    channel_id: i64,
}

impl From<EventRow> for EventRecord {
    fn from(row: EventRow) -> Self {
        EventRecord {
            title: row.title,
            description: row.description,
            starts_at: row.starts_at,
            formatted_time: row.formatted_time,
            message_ref: row.message_id as u64,
            channel_ref: row.channel_id as u64,
        }
    }
}

fn into_entries(rows: Vec<ProfileRow>) -> Result<Vec<ProfileEntry>, Error> {
    rows.into_iter().map(ProfileEntry::try_from).collect()
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get_profile(&self, id: UserId) -> Result<Option<ProfileEntry>, Error> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM users WHERE discord_id = ?")
            .bind(id as i64)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ProfileEntry::try_from).transpose()
    }

    /// Insert a new profile row. Fails if the user is already registered.
    pub async fn add_profile(&self, entry: &ProfileEntry) -> Result<(), Error> {
        let d = &entry.details;
        sqlx::query(
            "INSERT INTO users (discord_id, class, level, units, march_size, alliance, traps, \
             skins, status, lottery, interacted_with_event) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id as i64)
        .bind(d.profession.code())
        .bind(i64::from(d.level))
        .bind(join_list(d.units.iter().map(|u| u.code())))
        .bind(&d.march_size)
        .bind(&d.alliance)
        .bind(join_list(d.traps.iter().map(|t| t.code())))
        .bind(join_list(&d.skins))
        .bind(entry.status.as_str())
        .bind(entry.lottery_opt_in)
        .bind(entry.interacted_with_event)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create the profile, or replace the profession half of an existing one.
    /// Returns `true` when a new row was created.
    pub async fn save_details(&self, id: UserId, details: &ProfileDetails) -> Result<bool, Error> {
        details.validate()?;

        let mut tx = self.pool.begin().await?;
        let existed = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE discord_id = ?)",
        )
        .bind(id as i64)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO users (discord_id, class, level, units, march_size, alliance, traps, skins) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(discord_id) DO UPDATE SET class = excluded.class, \
             level = excluded.level, units = excluded.units, march_size = excluded.march_size, \
             alliance = excluded.alliance, traps = excluded.traps, skins = excluded.skins",
        )
        .bind(id as i64)
        .bind(details.profession.code())
        .bind(i64::from(details.level))
        .bind(join_list(details.units.iter().map(|u| u.code())))
        .bind(&details.march_size)
        .bind(&details.alliance)
        .bind(join_list(details.traps.iter().map(|t| t.code())))
        .bind(join_list(&details.skins))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        if !existed {
            info!(user = %id, "Registered new profile");
        }
        Ok(!existed)
    }

    /// Flip the lottery flag. `None` if the user has no profile.
    pub async fn toggle_lottery(&self, id: UserId) -> Result<Option<bool>, Error> {
        let opted_in = sqlx::query_scalar::<_, bool>(
            "UPDATE users SET lottery = 1 - lottery WHERE discord_id = ? RETURNING lottery",
        )
        .bind(id as i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(opted_in)
    }

    /// Record an attendance change; this also marks the user as having
    /// interacted with the event.
    pub async fn set_status(&self, id: UserId, status: Status) -> Result<(), Error> {
        let affected = sqlx::query(
            "UPDATE users SET status = ?, interacted_with_event = 1 WHERE discord_id = ?",
        )
        .bind(status.as_str())
        .bind(id as i64)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(Error::NotFound(format!("No profile for user {id}")));
        }
        Ok(())
    }

    pub async fn profiles_with_status(&self, statuses: &[Status]) -> Result<Vec<ProfileEntry>, Error> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM users WHERE status IN (");
        let mut separated = query.separated(", ");
        for status in statuses {
            separated.push_bind(status.as_str());
        }
        separated.push_unseparated(") ORDER BY discord_id");

        let rows = query
            .build_query_as::<ProfileRow>()
            .fetch_all(&self.pool)
            .await?;
        into_entries(rows)
    }

    pub async fn interacted_profiles(&self) -> Result<Vec<ProfileEntry>, Error> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT * FROM users WHERE interacted_with_event = 1 ORDER BY discord_id",
        )
        .fetch_all(&self.pool)
        .await?;
        into_entries(rows)
    }

    /// Remove a profile and confirm it is gone.
    pub async fn purge_profile(&self, id: UserId) -> Result<(), Error> {
        if self.get_profile(id).await?.is_none() {
            return Err(Error::NotFound(format!("User {id} is not in the database.")));
        }

        sqlx::query("DELETE FROM users WHERE discord_id = ?")
            .bind(id as i64)
            .execute(&self.pool)
            .await?;

        if self.get_profile(id).await?.is_some() {
            error!(user = %id, "Profile still present after purge");
            return Err(Error::Integrity(format!(
                "Failed to purge user {id} from the database. Possible bug."
            )));
        }

        info!(user = %id, "Purged profile");
        Ok(())
    }

    pub async fn get_event(&self) -> Result<EventRecord, Error> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT title, description, starts_at, formatted_time, message_id, channel_id \
             FROM event WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(EventRecord::from).unwrap_or_default())
    }

    pub async fn replace_event(&self, record: &EventRecord) -> Result<(), Error> {
        replace_event_row(&self.pool, record).await
    }

    /// Reset the event to the placeholder and every profile's per-event
    /// fields, in one transaction.
    pub async fn close_out_event(&self) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        replace_event_row(&mut *tx, &EventRecord::placeholder()).await?;
        let reset = sqlx::query("UPDATE users SET status = ?, interacted_with_event = 0")
            .bind(Status::No.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        info!(profiles = reset, "Event closed out and attendance reset");
        Ok(())
    }
}

async fn replace_event_row<'e, E>(executor: E, record: &EventRecord) -> Result<(), Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT OR REPLACE INTO event \
         (id, title, description, starts_at, formatted_time, message_id, channel_id) \
         VALUES (1, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.title.clone())
    .bind(record.description.clone())
    .bind(record.starts_at)
    .bind(record.formatted_time.clone())
    .bind(record.message_ref as i64)
    .bind(record.channel_ref as i64)
    .execute(executor)
    .await?;

    Ok(())
}
