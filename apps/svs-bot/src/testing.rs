//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::announcement::Announcement;
use crate::db;
use crate::error::Error;
use crate::models::{Profession, ProfileDetails, Unit, UserId};
use crate::platform::Platform;
use crate::store::Store;

pub async fn memory_store() -> Store {
    Store::new(db::init_memory_pool().await.expect("in-memory database"))
}

pub fn details(profession: Profession, level: u8, units: &[Unit]) -> ProfileDetails {
    ProfileDetails {
        profession,
        level,
        units: units.to_vec(),
        march_size: "100k".into(),
        alliance: "ABC".into(),
        traps: Vec::new(),
        skins: Vec::new(),
    }
}

#[derive(Default)]
struct Recorded {
    posts: Vec<(u64, Announcement)>,
    updates: Vec<(u64, Announcement)>,
    retired: Vec<(u64, String)>,
    direct: Vec<(UserId, String)>,
    files: Vec<(UserId, String, Vec<u8>)>,
}

/// Records everything sent to it. Every user resolves to `user{id}` unless
/// given another name with [`FakePlatform::set_name`].
#[derive(Default)]
pub struct FakePlatform {
    next_message: AtomicU64,
    names: Mutex<HashMap<UserId, Option<String>>>,
    recorded: Mutex<Recorded>,
}

impl FakePlatform {
    pub fn set_name(&self, user: UserId, name: Option<&str>) {
        self.names
            .lock()
            .unwrap()
            .insert(user, name.map(str::to_string));
    }

    pub fn posts(&self) -> Vec<(u64, Announcement)> {
        self.recorded.lock().unwrap().posts.clone()
    }

    pub fn updates(&self) -> Vec<(u64, Announcement)> {
        self.recorded.lock().unwrap().updates.clone()
    }

    pub fn retired(&self) -> Vec<(u64, String)> {
        self.recorded.lock().unwrap().retired.clone()
    }

    pub fn direct_messages(&self) -> Vec<(UserId, String)> {
        self.recorded.lock().unwrap().direct.clone()
    }

    pub fn files(&self) -> Vec<(UserId, String, Vec<u8>)> {
        self.recorded.lock().unwrap().files.clone()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn post_announcement(
        &self,
        channel: u64,
        announcement: &Announcement,
    ) -> Result<u64, Error> {
        let id = 1000 + self.next_message.fetch_add(1, Ordering::SeqCst);
        self.recorded
            .lock()
            .unwrap()
            .posts
            .push((channel, announcement.clone()));
        Ok(id)
    }

    async fn update_announcement(
        &self,
        _channel: u64,
        message: u64,
        announcement: &Announcement,
    ) -> Result<(), Error> {
        self.recorded
            .lock()
            .unwrap()
            .updates
            .push((message, announcement.clone()));
        Ok(())
    }

    async fn retire_announcement(
        &self,
        _channel: u64,
        message: u64,
        note: &str,
    ) -> Result<(), Error> {
        self.recorded
            .lock()
            .unwrap()
            .retired
            .push((message, note.to_string()));
        Ok(())
    }

    async fn display_name(&self, user: UserId) -> Option<String> {
        match self.names.lock().unwrap().get(&user) {
            Some(name) => name.clone(),
            None => Some(format!("user{user}")),
        }
    }

    async fn send_direct(&self, user: UserId, content: &str) -> Result<(), Error> {
        self.recorded
            .lock()
            .unwrap()
            .direct
            .push((user, content.to_string()));
        Ok(())
    }

    async fn send_file(
        &self,
        user: UserId,
        _content: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<(), Error> {
        self.recorded
            .lock()
            .unwrap()
            .files
            .push((user, filename.to_string(), data));
        Ok(())
    }
}
