use async_trait::async_trait;

use crate::announcement::Announcement;
use crate::error::Error;
use crate::models::UserId;

/// Outbound side of the chat platform.
///
/// The core hands over structured content; the implementation owns all
/// platform markup, message references and delivery.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Post a new announcement and return its message reference.
    async fn post_announcement(&self, channel: u64, announcement: &Announcement)
        -> Result<u64, Error>;

    async fn update_announcement(
        &self,
        channel: u64,
        message: u64,
        announcement: &Announcement,
    ) -> Result<(), Error>;

    /// Strip the interactive parts of an announcement and mark it with `note`.
    async fn retire_announcement(&self, channel: u64, message: u64, note: &str)
        -> Result<(), Error>;

    /// Display name in the central guild; `None` when the user is not a member.
    async fn display_name(&self, user: UserId) -> Option<String>;

    async fn send_direct(&self, user: UserId, content: &str) -> Result<(), Error>;

    async fn send_file(
        &self,
        user: UserId,
        content: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<(), Error>;
}
