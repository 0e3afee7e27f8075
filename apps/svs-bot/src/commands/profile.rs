//! Per-user profile commands.

use std::str::FromStr;

use tracing::info;

use crate::announcement;
use crate::commands::reply;
use crate::error::Error;
use crate::models::profile::split_list;
use crate::models::{Profession, ProfileDetails, Trap, Unit};
use crate::utils::embeds;
use crate::Context;

fn parse_codes<T>(raw: &str) -> Result<Vec<T>, Error>
where
    T: FromStr<Err = Error>,
{
    split_list(raw).iter().map(|code| code.parse()).collect()
}

/// Level choices for each class, as shown in help text and errors.
fn level_help() -> String {
    Profession::ALL
        .iter()
        .map(|p| {
            let labels: Vec<String> = (1..=p.max_level())
                .filter_map(|l| p.level_label(l).map(|label| format!("{l} = {label}")))
                .collect();
            format!("{}: {}", p.code(), labels.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_details(
    profession: Profession,
    level: u8,
    units: &str,
    march_size: String,
    alliance: String,
    traps: Option<&str>,
    skins: Option<&str>,
) -> Result<ProfileDetails, Error> {
    let details = ProfileDetails {
        profession,
        level,
        units: parse_codes::<Unit>(units)?,
        march_size: march_size.trim().to_string(),
        alliance: alliance.trim().to_string(),
        traps: traps.map(parse_codes::<Trap>).transpose()?.unwrap_or_default(),
        skins: skins.map(split_list).unwrap_or_default(),
    };

    details.validate().map_err(|e| match e {
        Error::Validation(msg) if profession.level_label(level).is_none() => {
            Error::Validation(format!("{msg}\n{}", level_help()))
        }
        other => other,
    })?;
    Ok(details)
}

/// Register or update your profile.
#[poise::command(slash_command, prefix_command)]
pub async fn register(
    ctx: Context<'_>,
    #[description = "Your class"] class: Profession,
    #[description = "Level bracket number (see help)"] level: u8,
    #[description = "Unit codes, comma separated: A, N, F"] units: String,
    #[description = "March size"] march_size: String,
    #[description = "Alliance tag"] alliance: String,
    #[description = "Mastermind trap codes, comma separated: LM, BC, TR, SN"] traps: Option<String>,
    #[description = "Skins, comma separated"] skins: Option<String>,
) -> Result<(), Error> {
    let details = build_details(
        class,
        level,
        &units,
        march_size,
        alliance,
        traps.as_deref(),
        skins.as_deref(),
    )?;

    let user = ctx.author().id.get();
    let data = ctx.data();
    let created = data.store.save_details(user, &details).await?;
    info!(user = %user, created, class = details.profession.code(), "Profile saved");

    let profile = data
        .store
        .get_profile(user)
        .await?
        .ok_or_else(|| Error::Integrity("Profile was not saved. Possible bug.".into()))?;
    let event = data.events.current().await.map(|r| r.info());

    reply(
        ctx,
        embeds::profile_embed(&ctx.author().name, &profile, event.as_deref()).title(if created {
            "Registered"
        } else {
            "Profile updated"
        }),
    )
    .await
}

/// Profile information.
#[poise::command(slash_command, prefix_command, dm_only, subcommands("show"))]
pub async fn info(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show your stored profile and event status.
#[poise::command(slash_command, prefix_command, dm_only)]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let Some(profile) = data.store.get_profile(ctx.author().id.get()).await? else {
        return reply(
            ctx,
            embeds::warning_embed()
                .title("Not registered")
                .description(announcement::registration_prompt(&data.config.command_prefix, false)),
        )
        .await;
    };

    let event = data.events.current().await.map(|r| r.info());
    reply(
        ctx,
        embeds::profile_embed(&ctx.author().name, &profile, event.as_deref()),
    )
    .await
}

/// Toggle your lottery entry.
#[poise::command(slash_command, prefix_command, dm_only)]
pub async fn lottery(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let user = ctx.author().id.get();

    let embed = match data.store.toggle_lottery(user).await? {
        Some(opted_in) => {
            info!(user = %user, opted_in, "Lottery toggled");
            embeds::success_embed().title("Lottery").description(if opted_in {
                "You are now entered in the lottery."
            } else {
                "You are no longer entered in the lottery."
            })
        }
        None => embeds::warning_embed()
            .title("Not registered")
            .description(announcement::registration_prompt(&data.config.command_prefix, false)),
    };
    reply(ctx, embed).await
}
