//! Implements the `/voice` command group.
//!
//! Self-service controls for the voice channel a member currently occupies:
//! user limit and name. Every subcommand requires the target channel to lie
//! in the managed category; renames are additionally subject to the
//! platform's two-renames-per-ten-minutes limit.

use std::sync::Arc;

use tracing::instrument;

use super::confirm;
use crate::error::UserError;
use crate::serenity;
use crate::voice::VoiceError;
use crate::voice::VoicePool;
use crate::BotError;
use crate::Context;

/// Manage the voice channel you are in.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("set_limit", "reset_limit", "rename")
)]
pub async fn voice(_ctx: Context<'_>) -> Result<(), BotError> {
    // Never runs; the framework requires a subcommand.
    Ok(())
}

/// Set the user limit of the voice channel you are in.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
async fn set_limit(
    ctx: Context<'_>,
    #[description = "The limit to be set (1-99)."]
    #[min = 1]
    #[max = 99]
    limit: u16,
) -> Result<(), BotError> {
    let pool = pool(&ctx)?;
    let channel = author_channel(&ctx)?;

    pool.set_limit(channel, limit).await.map_err(user_facing)?;

    confirm(&ctx, format!("User limit has been set to `{limit}`.")).await
}

/// Reset the user limit of the voice channel you are in.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
async fn reset_limit(ctx: Context<'_>) -> Result<(), BotError> {
    let pool = pool(&ctx)?;
    let channel = author_channel(&ctx)?;

    pool.set_limit(channel, 0).await.map_err(user_facing)?;

    confirm(&ctx, "User limit has been reset.").await
}

/// Rename the voice channel you are in (max 2 times per 10 minutes).
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
async fn rename(
    ctx: Context<'_>,
    #[description = "A new name for the voice channel."] name: String,
) -> Result<(), BotError> {
    let pool = pool(&ctx)?;
    let channel = author_channel(&ctx)?;

    pool.rename(channel, &name).await.map_err(user_facing)?;

    confirm(&ctx, format!("Voice channel has been renamed to `{name}`.")).await
}

/// Get the pool, or explain that the module is off.
fn pool<'a>(ctx: &Context<'a>) -> Result<&'a Arc<VoicePool>, BotError> {
    ctx.data()
        .voice
        .as_ref()
        .ok_or_else(|| UserError::VoiceManagerDisabled.into())
}

/// Find the voice channel the author currently occupies.
fn author_channel(ctx: &Context<'_>) -> Result<serenity::ChannelId, BotError> {
    // Try to find the author's voice state in the guild
    let voice_states = match ctx.guild() {
        Some(guild) => guild.voice_states.clone(),
        None => return Err(UserError::GuildOnly.into()),
    };

    voice_states
        .get(&ctx.author().id)
        .and_then(|state| state.channel_id)
        .ok_or_else(|| UserError::NotInVoice.into())
}

/// Maps pool errors onto user-visible denials where one exists. Anything
/// else stays internal and gets the generic failure treatment.
fn user_facing(error: VoiceError) -> BotError {
    match error {
        VoiceError::UnmanagedCategory => UserError::UnmanagedChannel.into(),
        VoiceError::RateLimitExceeded => UserError::RenameRateLimited.into(),
        other => other.into(),
    }
}
