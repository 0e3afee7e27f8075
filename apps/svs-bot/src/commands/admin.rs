//! Admin-only export and maintenance commands.

use tracing::info;

use crate::commands::{reply, require_admin};
use crate::error::Error;
use crate::models::UserId;
use crate::roster::{self, ExportFilter};
use crate::utils::embeds;
use crate::Context;

/// Discord snowflakes given to `purge` must be exactly this long.
const DISCORD_ID_LEN: usize = 18;

fn parse_discord_id(raw: &str) -> Result<UserId, Error> {
    let raw = raw.trim();
    if raw.len() != DISCORD_ID_LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Validation(format!(
            "Discord IDs are {DISCORD_ID_LEN} digits long, got '{raw}'."
        )));
    }
    raw.parse()
        .map_err(|_| Error::Validation(format!("'{raw}' is not a valid Discord ID.")))
}

/// Receive a roster CSV of everyone matching the filter.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn get_csv(
    ctx: Context<'_>,
    #[description = "Which users to include"] filter: ExportFilter,
) -> Result<(), Error> {
    require_admin(ctx).await?;
    info!(user = %ctx.author().id, command = "get_csv", ?filter, "Admin command");
    ctx.defer_ephemeral().await?;

    let data = ctx.data();
    let platform = data.platform();
    let rows = roster::load_rows(&data.store, platform.as_ref(), filter).await?;
    let csv = roster::build_roster_csv(
        &rows,
        data.config.lotto_winners,
        &mut rand::thread_rng(),
    );
    platform
        .send_file(
            ctx.author().id.get(),
            &format!("Roster export ({} users)", rows.len()),
            &data.config.csv_filename,
            csv.into_bytes(),
        )
        .await?;

    reply(
        ctx,
        embeds::success_embed()
            .title("Export sent")
            .description("Check your direct messages."),
    )
    .await
}

/// Receive a CSV of everyone who reacted to the current event.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn get_ymn(ctx: Context<'_>) -> Result<(), Error> {
    require_admin(ctx).await?;
    info!(user = %ctx.author().id, command = "get_ymn", "Admin command");
    ctx.defer_ephemeral().await?;

    let data = ctx.data();
    let platform = data.platform();
    let rows = roster::load_interaction_rows(&data.store, platform.as_ref()).await?;
    let csv = roster::build_interaction_csv(&rows);
    platform
        .send_file(
            ctx.author().id.get(),
            "Everyone who responded to the current event",
            "svs_ymn.csv",
            csv.into_bytes(),
        )
        .await?;

    reply(
        ctx,
        embeds::success_embed()
            .title("Export sent")
            .description("Check your direct messages."),
    )
    .await
}

/// Remove a user from the database.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn purge(
    ctx: Context<'_>,
    #[description = "18-digit Discord ID of the user to remove"] discord_id: String,
) -> Result<(), Error> {
    require_admin(ctx).await?;
    let target = parse_discord_id(&discord_id)?;
    info!(user = %ctx.author().id, command = "purge", target, "Admin command");

    ctx.data().store.purge_profile(target).await?;

    reply(
        ctx,
        embeds::success_embed()
            .title("User purged")
            .description(format!("Removed <@{target}> from the database.")),
    )
    .await
}
