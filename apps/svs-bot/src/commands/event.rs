//! Admin commands that drive the event lifecycle.

use serenity::all::MessageCollector;
use tracing::info;

use crate::commands::{actor, reply};
use crate::error::Error;
use crate::lifecycle::{CloseKind, CloseOutcome, EventEdit};
use crate::utils::embeds;
use crate::Context;

/// Create a signup event in this channel.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn create(
    ctx: Context<'_>,
    #[description = "Date as yy/mm/dd"] date: String,
    #[description = "Hour of the day, 0-23, in event time"] hour: String,
    #[description = "Event title"] title: String,
    #[description = "Event description"]
    #[rest]
    description: String,
) -> Result<(), Error> {
    info!(user = %ctx.author().id, command = "create", "Admin command");
    let actor = actor(ctx).await;
    let data = ctx.data();

    let record = data
        .events
        .create(&actor, &date, &hour, &title, &description, data.platform())
        .await?;

    reply(
        ctx,
        embeds::success_embed()
            .title("Event created")
            .description(record.info()),
    )
    .await
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum EditField {
    #[name = "time"]
    Time,
    #[name = "title"]
    Title,
    #[name = "description"]
    Description,
}

fn parse_edit(field: EditField, value: String) -> Result<EventEdit, Error> {
    Ok(match field {
        EditField::Time => {
            let mut parts = value.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(date), Some(hour), None) => EventEdit::Time {
                    date: date.to_string(),
                    hour: hour.to_string(),
                },
                _ => {
                    return Err(Error::Validation(
                        "Time must be given as `yy/mm/dd hour`.".into(),
                    ))
                }
            }
        }
        EditField::Title => EventEdit::Title(value),
        EditField::Description => EventEdit::Description(value),
    })
}

/// Edit the time, title or description of the active event.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn edit(
    ctx: Context<'_>,
    #[description = "What to change"] field: EditField,
    #[description = "New value; for time use `yy/mm/dd hour`"]
    #[rest]
    value: String,
) -> Result<(), Error> {
    info!(user = %ctx.author().id, command = "edit", ?field, "Admin command");
    let actor = actor(ctx).await;
    let edit = parse_edit(field, value)?;
    let data = ctx.data();

    let record = data.events.edit(&actor, edit, data.platform()).await?;

    reply(
        ctx,
        embeds::success_embed()
            .title("Event updated")
            .description(record.info()),
    )
    .await
}

/// Close signups and receive the roster CSV by DM.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn close(ctx: Context<'_>) -> Result<(), Error> {
    info!(user = %ctx.author().id, command = "close", "Admin command");
    finish_event(ctx, CloseKind::Close).await
}

/// Delete the active event without an export.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn delete(ctx: Context<'_>) -> Result<(), Error> {
    info!(user = %ctx.author().id, command = "delete", "Admin command");
    finish_event(ctx, CloseKind::Delete).await
}

async fn finish_event(ctx: Context<'_>, kind: CloseKind) -> Result<(), Error> {
    // The confirmation wait outlives the interaction response window.
    ctx.defer_ephemeral().await?;

    let actor = actor(ctx).await;
    let data = ctx.data();

    let dm = ctx.author().create_dm_channel(ctx).await?.id;
    let shard = ctx.serenity_context().shard.clone();
    let author = ctx.author().id;
    let answer = async move {
        MessageCollector::new(shard)
            .author_id(author)
            .channel_id(dm)
            .await
            .map(|m| m.content)
    };

    let outcome = data
        .events
        .confirm_and_close(&actor, kind, data.platform(), answer)
        .await?;

    let embed = match outcome {
        CloseOutcome::TimedOut => embeds::warning_embed()
            .title("Timed out")
            .description("No confirmation received. The event is unchanged."),
        CloseOutcome::Cancelled => embeds::warning_embed()
            .title("Cancelled")
            .description("The event is unchanged."),
        CloseOutcome::Closed { record, .. } => embeds::success_embed()
            .title(match kind {
                CloseKind::Close => "Event closed",
                CloseKind::Delete => "Event deleted",
            })
            .description(record.info()),
    };
    reply(ctx, embed).await
}
