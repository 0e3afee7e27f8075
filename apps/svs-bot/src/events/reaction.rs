use serenity::all::{Context, FullEvent, Reaction};
use tracing::{debug, error};

use crate::discord::{emoji_for, status_for};
use crate::models::Status;
use crate::platform::Platform;
use crate::signup::{retractions, SignupInput};
use crate::Data;

/// Handle reactions on the event announcement.
pub async fn handle_event(ctx: &Context, event: &FullEvent, data: &Data) {
    match event {
        FullEvent::ReactionAdd { add_reaction } => {
            if add_reaction.member.as_ref().is_some_and(|m| m.user.bot) {
                return;
            }
            handle_reaction(ctx, add_reaction, data, SignupInput::Select).await;
        }
        FullEvent::ReactionRemove { removed_reaction } => {
            handle_reaction(ctx, removed_reaction, data, SignupInput::Removed).await;
        }
        _ => {}
    }
}

async fn handle_reaction(
    ctx: &Context,
    reaction: &Reaction,
    data: &Data,
    input: fn(Status) -> SignupInput,
) {
    let Some(user_id) = reaction.user_id else {
        return;
    };
    if user_id == ctx.cache.current_user().id {
        return;
    }
    let Some(status) = status_for(&reaction.emoji) else {
        debug!(emoji = %reaction.emoji, "Ignoring unrecognised reaction");
        return;
    };

    let user = user_id.get();
    let message = reaction.message_id.get();
    let input = input(status);

    // Quietly drop anyone outside the central guild.
    if data.platform.display_name(user).await.is_none() {
        debug!(user, "Ignoring reaction from non-member");
        return;
    }

    let outcome = match data
        .signups
        .handle(data.platform.as_ref(), user, message, input)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(user, error = %e, "Failed to apply signup");
            return;
        }
    };

    // Keep exactly one of the status reactions on the post.
    for status in retractions(outcome, input) {
        data.signups.expect_echo(user, message, status);
        if let Err(e) = reaction
            .channel_id
            .delete_reaction(&ctx.http, reaction.message_id, Some(user_id), emoji_for(status))
            .await
        {
            data.signups.forget_echo(user, message, status);
            debug!(user, %status, error = %e, "Failed to retract reaction");
        }
    }
}
