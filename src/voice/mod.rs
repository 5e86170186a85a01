//! Voice channel pool management.
//!
//! The guild has a category dedicated to voice channels where only one
//! channel may sit empty at a time. When a member occupies the last empty
//! channel, a new one is created. When a member leaves a channel and makes
//! it empty, the channel is deleted unless it is the only empty one left.
//! All create/delete decisions are serialized through a single lock so
//! concurrent membership events cannot double-create or double-delete.

mod config;
mod gateway;
mod names;
mod pool;

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::serenity;

pub use config::ChannelOrderStrategy;
pub use config::VoiceConfig;
pub use config::VoiceLoggingConfig;
pub use gateway::ChannelGateway;
pub use gateway::ChannelSnapshot;
pub use gateway::DiscordGateway;
pub use gateway::GatewayError;
pub use pool::VoicePool;

/// Errors from the voice channel manager.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// The config doesn't describe a usable category.
    /// Fatal at startup; the module refuses to load.
    #[error("Invalid voice channel configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// The bot lacks Manage Channels in the managed category.
    /// Fatal at startup; the module refuses to load.
    #[error("The bot lacks the Manage Channels permission in the managed category.")]
    MissingPermissions,

    /// A command targeted a channel outside the managed category.
    #[error("The channel is not in the managed category.")]
    UnmanagedCategory,

    /// A rename was throttled by the platform.
    #[error("Rate limit exceeded.")]
    RateLimitExceeded,

    /// A remote channel operation failed or timed out.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Resolves the managed category, verifies the bot's permissions on it,
/// and constructs the pool around a live [`DiscordGateway`].
///
/// Runs once at startup; the returned pool owns the category for the
/// lifetime of the process. There is no re-binding.
pub async fn bind(
    http: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
    bot_id: serenity::UserId,
    guild_id: serenity::GuildId,
    config: VoiceConfig,
) -> Result<VoicePool, VoiceError> {
    config.validate()?;

    let channels = guild_id
        .channels(&http)
        .await
        .map_err(GatewayError::from)?;

    let category = channels
        .get(&config.managed_category_id)
        .filter(|channel| channel.kind == serenity::ChannelType::Category)
        .ok_or_else(|| VoiceError::InvalidConfiguration {
            reason: format!(
                "`managed_category_id` ({}) must reference a category",
                config.managed_category_id
            ),
        })?;

    // Permission check against live guild data, not the cache; the cache
    // may not hold the guild yet when setup runs.
    let guild = guild_id
        .to_partial_guild(&http)
        .await
        .map_err(GatewayError::from)?;
    let me = guild_id
        .member(&http, bot_id)
        .await
        .map_err(GatewayError::from)?;

    if !guild
        .user_permissions_in(category, &me)
        .manage_channels()
    {
        return Err(VoiceError::MissingPermissions);
    }

    tracing::info!(
        "Managing voice channels under category \"{}\" ({}).",
        category.name,
        category.id
    );

    let gateway = DiscordGateway::new(http, cache, guild_id, config.managed_category_id);

    Ok(VoicePool::new(
        config,
        Arc::new(gateway),
        Mutex::new(()),
        StdRng::from_entropy(),
    ))
}
