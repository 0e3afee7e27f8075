pub mod embeds;
pub mod permissions;
