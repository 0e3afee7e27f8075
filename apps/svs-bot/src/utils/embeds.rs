use serenity::all::{CreateEmbed, CreateEmbedFooter};

use crate::announcement::Announcement;
use crate::models::ProfileEntry;

/// Colors used across all bot embeds.
pub struct Colors;

impl Colors {
    pub const EVENT: u32 = 0x3498DB;
    pub const SUCCESS: u32 = 0x00FF7F;
    pub const WARNING: u32 = 0xFFD700;
    pub const ERROR: u32 = 0xFF4444;
    pub const INFO: u32 = 0x95A5A6;
}

/// Create a success-themed embed (green).
pub fn success_embed() -> CreateEmbed {
    base_embed(Colors::SUCCESS)
}

/// Create a warning-themed embed (gold).
pub fn warning_embed() -> CreateEmbed {
    base_embed(Colors::WARNING)
}

/// Create an error-themed embed (red).
pub fn error_embed() -> CreateEmbed {
    base_embed(Colors::ERROR)
}

pub fn info_embed() -> CreateEmbed {
    base_embed(Colors::INFO)
}

/// Render an event announcement. The announcement's own footer replaces the
/// default one.
pub fn announcement_embed(announcement: &Announcement) -> CreateEmbed {
    let fields = announcement
        .fields
        .iter()
        .map(|f| (f.name.clone(), f.value.clone(), f.inline));

    base_embed(Colors::EVENT)
        .title(&announcement.title)
        .description(&announcement.description)
        .fields(fields)
        .footer(CreateEmbedFooter::new(&announcement.footer))
}

/// A user's stored profile, as shown by `/info show`.
pub fn profile_embed(name: &str, profile: &ProfileEntry, event: Option<&str>) -> CreateEmbed {
    let d = &profile.details;
    let level = d.profession.level_label(d.level).unwrap_or("?");
    let units: Vec<&str> = d.units.iter().map(|u| u.code()).collect();

    let mut embed = info_embed()
        .title(format!("Profile for {name}"))
        .field("Class", d.profession.display_name(), true)
        .field("Level", level, true)
        .field("Units", units.join(", "), true)
        .field("March Size", &d.march_size, true)
        .field("Alliance", &d.alliance, true);

    if d.profession.uses_traps() {
        let traps: Vec<&str> = d.traps.iter().map(|t| t.code()).collect();
        embed = embed.field("Traps", none_if_empty(&traps.join(", ")), true);
    }

    embed
        .field("Skins", none_if_empty(&d.skins.join(", ")), true)
        .field(
            "Lottery",
            if profile.lottery_opt_in { "Opted in" } else { "Opted out" },
            true,
        )
        .field(
            "Event",
            match event {
                Some(info) => format!("**{}** for {info}", profile.status),
                None => "No active event".to_string(),
            },
            false,
        )
}

fn none_if_empty(value: &str) -> &str {
    if value.is_empty() {
        "None"
    } else {
        value
    }
}

fn base_embed(color: u32) -> CreateEmbed {
    CreateEmbed::default()
        .color(color)
        .footer(CreateEmbedFooter::new("SvS Bot"))
        .timestamp(serenity::model::Timestamp::now())
}
