pub mod admin;
pub mod event;
pub mod general;
pub mod profile;

use poise::CreateReply;
use serenity::all::CreateEmbed;

use crate::error::Error;
use crate::lifecycle::Actor;
use crate::utils::permissions;
use crate::{Context, Data};

/// Every command the bot registers.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        event::create(),
        event::edit(),
        event::close(),
        event::delete(),
        profile::register(),
        profile::info(),
        profile::lottery(),
        admin::get_csv(),
        admin::get_ymn(),
        admin::purge(),
        general::bug(),
        general::help(),
    ]
}

/// Whether the invoking member holds the event admin role.
pub(crate) async fn is_event_admin(ctx: Context<'_>) -> bool {
    match ctx.author_member().await {
        Some(member) => permissions::is_event_admin(&member, ctx.data().config.admin_role_id),
        None => false,
    }
}

pub(crate) async fn actor(ctx: Context<'_>) -> Actor {
    Actor {
        user_id: ctx.author().id.get(),
        channel_id: ctx.channel_id().get(),
        is_admin: is_event_admin(ctx).await,
    }
}

pub(crate) async fn require_admin(ctx: Context<'_>) -> Result<(), Error> {
    if is_event_admin(ctx).await {
        Ok(())
    } else {
        Err(Error::Unauthorized(
            "You need the event admin role to use this command.".into(),
        ))
    }
}

pub(crate) async fn reply(ctx: Context<'_>, embed: CreateEmbed) -> Result<(), Error> {
    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
