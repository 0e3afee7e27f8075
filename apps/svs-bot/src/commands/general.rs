use serenity::all::CreateMessage;
use tracing::{info, warn};

use crate::commands::reply;
use crate::utils::embeds;
use crate::Context;

type Error = crate::error::Error;

/// Discord caps embed descriptions at 4096 characters; reports leave room for
/// the header.
const MAX_BUG_REPORT_LEN: usize = 4000;

fn check_report(report: &str) -> Result<&str, Error> {
    let report = report.trim();
    if report.is_empty() {
        return Err(Error::Validation("Please describe the bug.".into()));
    }
    let len = report.chars().count();
    if len > MAX_BUG_REPORT_LEN {
        return Err(Error::Validation(format!(
            "Bug reports are limited to {MAX_BUG_REPORT_LEN} characters, yours has {len}."
        )));
    }
    Ok(report)
}

/// Report a bug to the bot maintainers.
#[poise::command(slash_command, prefix_command)]
pub async fn bug(
    ctx: Context<'_>,
    #[description = "What went wrong"]
    #[rest]
    report: String,
) -> Result<(), Error> {
    let report = check_report(&report)?;
    let Some(channel) = ctx.data().config.bug_report_channel_id else {
        warn!("Bug report received but BUG_REPORT_CHANNEL_ID is not set");
        return Err(Error::Config("Bug reports are not enabled on this bot.".into()));
    };

    let embed = embeds::warning_embed()
        .title(format!("Bug report from {}", ctx.author().name))
        .description(report)
        .field("User ID", ctx.author().id.to_string(), true);
    channel
        .send_message(ctx, CreateMessage::new().embed(embed))
        .await?;
    info!(user = %ctx.author().id, "Bug report forwarded");

    reply(
        ctx,
        embeds::success_embed()
            .title("Thanks!")
            .description("Your report was sent to the maintainers."),
    )
    .await
}

/// List all available commands.
#[poise::command(slash_command, prefix_command)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Command to get help for"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            extra_text_at_bottom: "React on an event post with \u{2705} YES, \u{2754} MAYBE or \u{274C} NO.",
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}
