//! Attendance status state machine.
//!
//! Each announcement carries one selectable control per status. Selecting a
//! control moves the user to that status; withdrawing the control for the
//! current status moves them back to `NO`. The Discord adapter enforces a
//! single active selection by retracting the other two controls, and the
//! removal notifications those retractions cause are swallowed here through
//! [`EchoGuard`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::announcement;
use crate::error::Error;
use crate::lifecycle::EventController;
use crate::models::{Status, UserId};
use crate::platform::Platform;
use crate::store::Store;

/// How long a retraction echo is waited for before the token is dropped.
pub const ECHO_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupInput {
    Select(Status),
    /// The user withdrew their selection of this status.
    Removed(Status),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Register,
    Ignore,
    Set(Status),
}

/// The rules, independent of storage. `current` is `None` for users without
/// a profile.
pub fn transition(current: Option<Status>, input: SignupInput) -> Transition {
    match (current, input) {
        (None, SignupInput::Select(_)) => Transition::Register,
        (None, SignupInput::Removed(_)) => Transition::Ignore,
        (Some(current), SignupInput::Select(to)) if current == to => Transition::Ignore,
        (Some(_), SignupInput::Select(to)) => Transition::Set(to),
        (Some(current), SignupInput::Removed(withdrawn))
            if current == withdrawn && current != Status::No =>
        {
            Transition::Set(Status::No)
        }
        (Some(_), SignupInput::Removed(_)) => Transition::Ignore,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupOutcome {
    /// The user has no profile; they were sent registration instructions.
    RegistrationRequired,
    Unchanged,
    /// A removal caused by our own retraction.
    Suppressed,
    Updated { from: Status, to: Status },
    /// The interaction was not on the open event's announcement.
    NotForActiveEvent,
}

/// Controls the adapter must take back after `input` produced `outcome`.
/// A successful selection keeps only the chosen control; a selection from
/// an unregistered user is taken back entirely.
pub fn retractions(outcome: SignupOutcome, input: SignupInput) -> Vec<Status> {
    match (outcome, input) {
        (SignupOutcome::Updated { .. }, SignupInput::Select(chosen)) => Status::ALL
            .into_iter()
            .filter(|s| *s != chosen)
            .collect(),
        (SignupOutcome::RegistrationRequired, SignupInput::Select(chosen)) => vec![chosen],
        _ => Vec::new(),
    }
}

type EchoKey = (UserId, u64, Status);

/// Pending retraction echoes, keyed by user, message and status.
#[derive(Debug)]
pub struct EchoGuard {
    ttl: Duration,
    pending: SyncMutex<HashMap<EchoKey, Instant>>,
}

impl Default for EchoGuard {
    fn default() -> Self {
        Self::new(ECHO_TTL)
    }
}

impl EchoGuard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: SyncMutex::new(HashMap::new()),
        }
    }

    /// Register a token. Must be called before the retraction is issued.
    pub fn expect(&self, user: UserId, message: u64, status: Status) {
        let now = Instant::now();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|_, expires| *expires > now);
        pending.insert((user, message, status), now + self.ttl);
    }

    /// Drop any token for a control the user has just selected again. A
    /// retraction echo always arrives before the re-selection, so whatever
    /// is left belongs to a control that was never there.
    pub fn forget(&self, user: UserId, message: u64, status: Status) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.remove(&(user, message, status));
    }

    /// Take the token for this removal, if one is still live.
    pub fn consume(&self, user: UserId, message: u64, status: Status) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending
            .remove(&(user, message, status))
            .is_some_and(|expires| expires > Instant::now())
    }
}

/// Applies signup interactions one at a time against the active event.
pub struct SignupMachine {
    store: Store,
    events: Arc<EventController>,
    echoes: EchoGuard,
    serial: Mutex<()>,
}

impl SignupMachine {
    pub fn new(store: Store, events: Arc<EventController>) -> Self {
        Self {
            store,
            events,
            echoes: EchoGuard::default(),
            serial: Mutex::new(()),
        }
    }

    /// Mark the coming removal of `status` for `user` as ours.
    pub fn expect_echo(&self, user: UserId, message: u64, status: Status) {
        self.echoes.expect(user, message, status);
    }

    /// Withdraw a token whose retraction was never carried out.
    pub fn forget_echo(&self, user: UserId, message: u64, status: Status) {
        self.echoes.forget(user, message, status);
    }

    pub async fn handle(
        &self,
        platform: &dyn Platform,
        user: UserId,
        message: u64,
        input: SignupInput,
    ) -> Result<SignupOutcome, Error> {
        let _turn = self.serial.lock().await;

        let Some(record) = self.events.current().await else {
            return Ok(SignupOutcome::NotForActiveEvent);
        };
        if record.message_ref != message {
            return Ok(SignupOutcome::NotForActiveEvent);
        }

        match input {
            SignupInput::Select(status) => self.echoes.forget(user, message, status),
            SignupInput::Removed(status) => {
                if self.echoes.consume(user, message, status) {
                    debug!(user, %status, "Suppressed retraction echo");
                    return Ok(SignupOutcome::Suppressed);
                }
            }
        }

        let profile = self.store.get_profile(user).await?;
        let current = profile.as_ref().map(|p| p.status);

        match transition(current, input) {
            Transition::Ignore => Ok(SignupOutcome::Unchanged),
            Transition::Register => {
                info!(user, "Unregistered user tried to sign up");
                let prompt = announcement::registration_prompt(
                    &self.events.settings().command_prefix,
                    true,
                );
                if let Err(e) = platform.send_direct(user, &prompt).await {
                    warn!(user, error = %e, "Failed to send registration prompt");
                }
                Ok(SignupOutcome::RegistrationRequired)
            }
            Transition::Set(to) => {
                let from = current.unwrap_or_default();
                self.store.set_status(user, to).await?;
                info!(user, %from, %to, "Signup status changed");

                if let Err(e) = self.events.refresh_announcement(platform).await {
                    warn!(error = %e, "Failed to refresh event announcement");
                }
                let ack = announcement::acknowledgement(to, &record);
                if let Err(e) = platform.send_direct(user, &ack).await {
                    warn!(user, error = %e, "Failed to send signup acknowledgement");
                }
                Ok(SignupOutcome::Updated { from, to })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{Actor, EventSettings};
    use crate::models::{Profession, Unit};
    use crate::testing::{details, memory_store, FakePlatform};
    use pretty_assertions::assert_eq;

    const CHANNEL: u64 = 10;

    #[test]
    fn transition_rules() {
        use SignupInput::*;
        use Status::*;

        assert_eq!(transition(None, Select(Yes)), Transition::Register);
        assert_eq!(transition(None, Removed(Yes)), Transition::Ignore);
        assert_eq!(transition(Some(No), Select(Yes)), Transition::Set(Yes));
        assert_eq!(transition(Some(Yes), Select(Maybe)), Transition::Set(Maybe));
        assert_eq!(transition(Some(Maybe), Select(No)), Transition::Set(No));
        assert_eq!(transition(Some(Yes), Select(Yes)), Transition::Ignore);
        assert_eq!(transition(Some(Yes), Removed(Yes)), Transition::Set(No));
        assert_eq!(transition(Some(Maybe), Removed(Maybe)), Transition::Set(No));
        assert_eq!(transition(Some(Yes), Removed(Maybe)), Transition::Ignore);
        assert_eq!(transition(Some(No), Removed(No)), Transition::Ignore);
    }

    #[test]
    fn retraction_rules() {
        use SignupInput::*;
        use Status::*;

        let updated = SignupOutcome::Updated { from: No, to: Yes };
        assert_eq!(retractions(updated, Select(Yes)), vec![Maybe, No]);
        assert_eq!(retractions(updated, Select(Maybe)), vec![Yes, No]);
        assert_eq!(retractions(SignupOutcome::RegistrationRequired, Select(No)), vec![No]);
        assert_eq!(retractions(SignupOutcome::Unchanged, Select(Yes)), Vec::<Status>::new());
        assert_eq!(retractions(SignupOutcome::NotForActiveEvent, Select(Yes)), Vec::<Status>::new());
        assert_eq!(retractions(updated, Removed(Yes)), Vec::<Status>::new());
        assert_eq!(retractions(SignupOutcome::Suppressed, Removed(Maybe)), Vec::<Status>::new());
    }

    #[test]
    fn forgotten_tokens_cannot_be_consumed() {
        let guard = EchoGuard::default();
        guard.expect(1, 100, Status::Maybe);
        guard.expect(1, 100, Status::No);
        guard.forget(1, 100, Status::Maybe);

        assert!(!guard.consume(1, 100, Status::Maybe));
        assert!(guard.consume(1, 100, Status::No));
    }

    #[tokio::test(start_paused = true)]
    async fn echo_tokens_are_single_use_and_expire() {
        let guard = EchoGuard::default();

        guard.expect(1, 100, Status::Maybe);
        assert!(!guard.consume(1, 100, Status::No));
        assert!(!guard.consume(2, 100, Status::Maybe));
        assert!(guard.consume(1, 100, Status::Maybe));
        assert!(!guard.consume(1, 100, Status::Maybe));

        guard.expect(1, 100, Status::Yes);
        tokio::time::advance(ECHO_TTL + Duration::from_millis(1)).await;
        assert!(!guard.consume(1, 100, Status::Yes));
    }

    struct Harness {
        machine: SignupMachine,
        events: Arc<EventController>,
        store: Store,
        platform: Arc<FakePlatform>,
        message: u64,
    }

    async fn harness() -> Harness {
        let store = memory_store().await;
        let settings = Arc::new(EventSettings {
            main_channels: vec![CHANNEL],
            ..EventSettings::default()
        });
        let events = Arc::new(EventController::new(store.clone(), settings));
        let platform = Arc::new(FakePlatform::default());
        let actor = Actor {
            user_id: 1,
            channel_id: CHANNEL,
            is_admin: true,
        };
        let record = events
            .create(&actor, "23/01/15", "11", "SvS Event", "desc", platform.clone())
            .await
            .unwrap();
        store
            .save_details(7, &details(Profession::CombatEngineer, 3, &[Unit::Army]))
            .await
            .unwrap();

        Harness {
            machine: SignupMachine::new(store.clone(), events.clone()),
            events,
            store,
            platform,
            message: record.message_ref,
        }
    }

    #[tokio::test]
    async fn select_updates_status_and_acknowledges() {
        let h = harness().await;
        let outcome = h
            .machine
            .handle(h.platform.as_ref(), 7, h.message, SignupInput::Select(Status::Yes))
            .await
            .unwrap();

        assert_eq!(outcome, SignupOutcome::Updated { from: Status::No, to: Status::Yes });
        let profile = h.store.get_profile(7).await.unwrap().unwrap();
        assert_eq!(profile.status, Status::Yes);
        assert!(profile.interacted_with_event);

        let dms = h.platform.direct_messages();
        assert_eq!(dms.len(), 1);
        assert_eq!(dms[0].0, 7);
        assert!(dms[0].1.starts_with("You are **YES** for SvS Event"));

        let updates = h.platform.updates();
        assert_eq!(updates.last().unwrap().1.fields[0].name, "YES (1)");
    }

    #[tokio::test]
    async fn repeated_select_is_a_no_op() {
        let h = harness().await;
        let select = SignupInput::Select(Status::Maybe);
        h.machine.handle(h.platform.as_ref(), 7, h.message, select).await.unwrap();
        let outcome = h.machine.handle(h.platform.as_ref(), 7, h.message, select).await.unwrap();

        assert_eq!(outcome, SignupOutcome::Unchanged);
        assert_eq!(h.platform.direct_messages().len(), 1);
    }

    #[tokio::test]
    async fn retraction_echo_is_suppressed_but_genuine_removal_is_not() {
        let h = harness().await;
        let p = h.platform.as_ref();
        h.machine.handle(p, 7, h.message, SignupInput::Select(Status::Maybe)).await.unwrap();

        // Switching to YES retracts the MAYBE control.
        h.machine.handle(p, 7, h.message, SignupInput::Select(Status::Yes)).await.unwrap();
        h.machine.expect_echo(7, h.message, Status::Maybe);
        let outcome = h
            .machine
            .handle(p, 7, h.message, SignupInput::Removed(Status::Maybe))
            .await
            .unwrap();
        assert_eq!(outcome, SignupOutcome::Suppressed);
        assert_eq!(h.store.get_profile(7).await.unwrap().unwrap().status, Status::Yes);
        assert_eq!(h.platform.direct_messages().len(), 2);

        let outcome = h
            .machine
            .handle(p, 7, h.message, SignupInput::Removed(Status::Yes))
            .await
            .unwrap();
        assert_eq!(outcome, SignupOutcome::Updated { from: Status::Yes, to: Status::No });
        let profile = h.store.get_profile(7).await.unwrap().unwrap();
        assert_eq!(profile.status, Status::No);
        assert!(profile.interacted_with_event);
        assert_eq!(h.platform.direct_messages().len(), 3);
    }

    /// Feed a selection through the machine and register echo tokens for the
    /// retractions the adapter would issue, even for controls never present.
    async fn select(h: &Harness, status: Status) -> SignupOutcome {
        let input = SignupInput::Select(status);
        let outcome = h.machine.handle(h.platform.as_ref(), 7, h.message, input).await.unwrap();
        for retracted in retractions(outcome, input) {
            h.machine.expect_echo(7, h.message, retracted);
        }
        outcome
    }

    #[tokio::test]
    async fn removal_after_switching_back_is_not_mistaken_for_an_echo() {
        let h = harness().await;
        let p = h.platform.as_ref();

        // NO -> YES retracts MAYBE and NO, neither of which was ever shown.
        select(&h, Status::Yes).await;
        // YES -> MAYBE retracts YES (a real echo follows) and NO.
        select(&h, Status::Maybe).await;
        let outcome = h
            .machine
            .handle(p, 7, h.message, SignupInput::Removed(Status::Yes))
            .await
            .unwrap();
        assert_eq!(outcome, SignupOutcome::Suppressed);

        let outcome = h
            .machine
            .handle(p, 7, h.message, SignupInput::Removed(Status::Maybe))
            .await
            .unwrap();
        assert_eq!(outcome, SignupOutcome::Updated { from: Status::Maybe, to: Status::No });
        assert_eq!(h.store.get_profile(7).await.unwrap().unwrap().status, Status::No);
    }

    #[tokio::test]
    async fn unregistered_user_gets_registration_prompt() {
        let h = harness().await;
        let outcome = h
            .machine
            .handle(h.platform.as_ref(), 99, h.message, SignupInput::Select(Status::Yes))
            .await
            .unwrap();

        assert_eq!(outcome, SignupOutcome::RegistrationRequired);
        assert_eq!(h.store.get_profile(99).await.unwrap(), None);
        let dms = h.platform.direct_messages();
        assert!(dms[0].1.contains("not in the database"));
    }

    #[tokio::test]
    async fn other_messages_and_closed_events_are_ignored() {
        let h = harness().await;
        let outcome = h
            .machine
            .handle(h.platform.as_ref(), 7, h.message + 1, SignupInput::Select(Status::Yes))
            .await
            .unwrap();
        assert_eq!(outcome, SignupOutcome::NotForActiveEvent);

        h.events.store().close_out_event().await.unwrap();
        let fresh = SignupMachine::new(
            h.store.clone(),
            Arc::new(EventController::new(h.store.clone(), Arc::new(EventSettings::default()))),
        );
        let outcome = fresh
            .handle(h.platform.as_ref(), 7, h.message, SignupInput::Select(Status::Yes))
            .await
            .unwrap();
        assert_eq!(outcome, SignupOutcome::NotForActiveEvent);
        assert_eq!(h.store.get_profile(7).await.unwrap().unwrap().status, Status::No);
    }
}
