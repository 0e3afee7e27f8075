//! One-shot reminder for users still on MAYBE before the event starts.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::announcement;
use crate::error::Error;
use crate::models::{EventRecord, Status};
use crate::platform::Platform;
use crate::store::Store;

/// Time left until `event_time - lead`, or `None` if that moment has passed.
pub fn reminder_delay(
    event_time: DateTime<Utc>,
    now: DateTime<Utc>,
    lead: TimeDelta,
) -> Option<Duration> {
    let fire_at = event_time - lead;
    (fire_at - now).to_std().ok().filter(|d| !d.is_zero())
}

/// Holds at most one pending reminder task.
#[derive(Default)]
pub struct ReminderScheduler {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl ReminderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace any pending reminder with `job`, run after `delay`.
    pub fn arm<F>(&self, delay: Duration, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        }));
        info!(delay_secs = delay.as_secs(), "Confirm-maybe reminder armed");
    }

    /// Abort the pending reminder. Returns whether one was still waiting.
    pub fn cancel(&self) -> bool {
        match self.slot().take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                if waiting {
                    info!("Confirm-maybe reminder cancelled");
                }
                waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot().as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// DM every MAYBE user a reminder about `record`. Returns how many were sent.
pub async fn remind_maybes(
    store: &Store,
    platform: &dyn Platform,
    record: &EventRecord,
) -> Result<usize, Error> {
    let maybes = store.profiles_with_status(&[Status::Maybe]).await?;
    let content = announcement::maybe_reminder(record);

    let mut sent = 0;
    for profile in &maybes {
        match platform.send_direct(profile.id, &content).await {
            Ok(()) => sent += 1,
            Err(e) => error!(user = %profile.id, error = %e, "Failed to send maybe reminder"),
        }
    }

    info!(sent, total = maybes.len(), "Sent confirm-maybe reminders");
    Ok(sent)
}

/// The job armed by the lifecycle controller. Reads the record when it fires
/// so title edits made after arming are reflected.
pub(crate) async fn reminder_job(store: Store, platform: Arc<dyn Platform>) {
    let result = match store.get_event().await {
        Ok(record) if record.is_active() => remind_maybes(&store, platform.as_ref(), &record)
            .await
            .map(|_| ()),
        Ok(_) => Ok(()),
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        error!(error = %e, "Confirm-maybe reminder failed");
    }
}
