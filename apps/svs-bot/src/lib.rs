pub mod announcement;
pub mod commands;
pub mod config;
pub mod db;
pub mod discord;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod models;
pub mod platform;
pub mod reminder;
pub mod roster;
pub mod signup;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;

use std::sync::Arc;

/// Shared data accessible across all Poise commands and event handlers.
pub struct Data {
    pub store: store::Store,
    pub config: config::Config,
    pub events: Arc<lifecycle::EventController>,
    pub signups: Arc<signup::SignupMachine>,
    pub platform: Arc<discord::DiscordPlatform>,
}

impl Data {
    /// The platform as the event core sees it.
    pub fn platform(&self) -> Arc<dyn platform::Platform> {
        self.platform.clone()
    }
}

/// Poise context alias used throughout the bot.
pub type Context<'a> = poise::Context<'a, Data, error::Error>;
