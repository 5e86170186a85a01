//! Implements the `/presence` command group.
//!
//! Admin-only controls for the bot's own status and activity.

use poise::ChoiceParameter;
use tracing::instrument;

use super::confirm;
use crate::error::UserError;
use crate::presence::ActivityKind;
use crate::presence::PresenceService;
use crate::presence::StatusKind;
use crate::BotError;
use crate::Context;

/// Manage the bot's presence.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR",
    subcommands("status", "activity")
)]
pub async fn presence(_ctx: Context<'_>) -> Result<(), BotError> {
    // Never runs; the framework requires a subcommand.
    Ok(())
}

/// Set the bot's online status.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
async fn status(
    ctx: Context<'_>,
    #[description = "The status to set."] status: StatusKind,
) -> Result<(), BotError> {
    let service = service(&ctx)?;
    service.set_status(ctx.serenity_context(), status);

    confirm(&ctx, format!("Status set to `{}`.", status.name())).await
}

/// Set the bot's activity.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
async fn activity(
    ctx: Context<'_>,
    #[description = "The kind of activity."] kind: ActivityKind,
    #[description = "The text shown under the bot's name."] text: String,
) -> Result<(), BotError> {
    let service = service(&ctx)?;
    service.set_activity(ctx.serenity_context(), kind, &text);

    confirm(&ctx, format!("Activity set to `{} {text}`.", kind.name())).await
}

/// Get the presence service, or explain that the module is off.
fn service<'a>(ctx: &Context<'a>) -> Result<&'a PresenceService, BotError> {
    ctx.data()
        .presence
        .as_ref()
        .ok_or_else(|| UserError::PresenceDisabled.into())
}
