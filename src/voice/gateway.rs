//! Remote channel operations behind a narrow seam.
//!
//! The pool never talks to Discord directly; it goes through
//! [`ChannelGateway`] so the reconciliation logic can be exercised against
//! an in-memory implementation in tests. Every remote call is bounded by
//! an explicit timeout and treated as failed once it elapses. There are no
//! retries here; the next membership event or reconcile sweep corrects any
//! drift a failed call leaves behind.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::timeout;

use crate::serenity;

/// Remote calls are abandoned after this long.
const REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Renames get a shorter window. Discord allows two channel renames per
/// ten minutes and the client library's ratelimiter surfaces throttling
/// as a stalled request rather than an error.
const RENAME_TIMEOUT: Duration = Duration::from_millis(2500);

/// Errors from remote channel operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Remote call timed out.")]
    Timeout,
    #[error("Rate limit exceeded.")]
    RateLimited,
    #[error("Guild is not in the cache.")]
    CacheMiss,
    #[error(transparent)]
    Http(#[from] serenity::Error),
}

/// A point-in-time view of one voice channel in the managed category.
///
/// Member counts are split so the occupancy predicate (which may ignore
/// bots) stays with the pool instead of leaking into the gateway.
#[derive(Debug, Clone)]
pub struct ChannelSnapshot {
    pub id: serenity::ChannelId,
    pub name: String,
    /// Non-bot members currently connected.
    pub humans: u32,
    /// Bot members currently connected.
    pub bots: u32,
}

/// What the pool requires from its environment.
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// Snapshot of all voice channels in the managed category.
    async fn list_channels(&self) -> Result<Vec<ChannelSnapshot>, GatewayError>;

    /// Creates a voice channel with the given name in the managed category.
    async fn create_channel(&self, name: &str) -> Result<serenity::ChannelId, GatewayError>;

    /// Deletes a voice channel. A channel that is already gone counts as
    /// deleted.
    async fn delete_channel(&self, channel: serenity::ChannelId) -> Result<(), GatewayError>;

    /// Renames a voice channel. Throttling surfaces as
    /// [`GatewayError::RateLimited`].
    async fn rename_channel(
        &self,
        channel: serenity::ChannelId,
        name: &str,
    ) -> Result<(), GatewayError>;

    /// Sets the user limit (0 removes it).
    async fn set_user_limit(
        &self,
        channel: serenity::ChannelId,
        limit: u16,
    ) -> Result<(), GatewayError>;
}

/// The live gateway: serenity HTTP for mutations, the serenity cache for
/// occupancy snapshots.
pub struct DiscordGateway {
    http: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
    guild_id: serenity::GuildId,
    category_id: serenity::ChannelId,
}

impl DiscordGateway {
    pub fn new(
        http: Arc<serenity::Http>,
        cache: Arc<serenity::Cache>,
        guild_id: serenity::GuildId,
        category_id: serenity::ChannelId,
    ) -> Self {
        Self {
            http,
            cache,
            guild_id,
            category_id,
        }
    }
}

#[async_trait]
impl ChannelGateway for DiscordGateway {
    async fn list_channels(&self) -> Result<Vec<ChannelSnapshot>, GatewayError> {
        // The cache guard must not be held across an await; there are no
        // awaits in this block.
        let guild = self
            .cache
            .guild(self.guild_id)
            .ok_or(GatewayError::CacheMiss)?;

        let mut snapshots: Vec<ChannelSnapshot> = guild
            .channels
            .values()
            .filter(|channel| {
                channel.kind == serenity::ChannelType::Voice
                    && channel.parent_id == Some(self.category_id)
            })
            .map(|channel| ChannelSnapshot {
                id: channel.id,
                name: channel.name.clone(),
                humans: 0,
                bots: 0,
            })
            .collect();

        for state in guild.voice_states.values() {
            let Some(channel_id) = state.channel_id else {
                continue;
            };
            let Some(snapshot) = snapshots.iter_mut().find(|s| s.id == channel_id) else {
                continue;
            };
            let is_bot = state
                .member
                .as_ref()
                .map(|member| member.user.bot)
                .unwrap_or(false);
            if is_bot {
                snapshot.bots += 1;
            } else {
                snapshot.humans += 1;
            }
        }

        Ok(snapshots)
    }

    async fn create_channel(&self, name: &str) -> Result<serenity::ChannelId, GatewayError> {
        let builder = serenity::CreateChannel::new(name)
            .kind(serenity::ChannelType::Voice)
            .category(self.category_id);

        match timeout(REMOTE_TIMEOUT, self.guild_id.create_channel(&self.http, builder)).await {
            Ok(Ok(channel)) => Ok(channel.id),
            Ok(Err(error)) => Err(classify(error)),
            Err(_elapsed) => Err(GatewayError::Timeout),
        }
    }

    async fn delete_channel(&self, channel: serenity::ChannelId) -> Result<(), GatewayError> {
        match timeout(REMOTE_TIMEOUT, channel.delete(&self.http)).await {
            Ok(Ok(_deleted)) => Ok(()),
            // Not found means someone beat us to it; that's a success.
            Ok(Err(error)) if status_of(&error) == Some(404) => Ok(()),
            Ok(Err(error)) => Err(classify(error)),
            Err(_elapsed) => Err(GatewayError::Timeout),
        }
    }

    async fn rename_channel(
        &self,
        channel: serenity::ChannelId,
        name: &str,
    ) -> Result<(), GatewayError> {
        let builder = serenity::EditChannel::new().name(name);
        match timeout(RENAME_TIMEOUT, channel.edit(&self.http, builder)).await {
            Ok(Ok(_channel)) => Ok(()),
            Ok(Err(error)) => Err(classify(error)),
            // A stalled rename is the ratelimiter holding the request.
            Err(_elapsed) => Err(GatewayError::RateLimited),
        }
    }

    async fn set_user_limit(
        &self,
        channel: serenity::ChannelId,
        limit: u16,
    ) -> Result<(), GatewayError> {
        let builder = serenity::EditChannel::new().user_limit(u32::from(limit));
        match timeout(REMOTE_TIMEOUT, channel.edit(&self.http, builder)).await {
            Ok(Ok(_channel)) => Ok(()),
            Ok(Err(error)) => Err(classify(error)),
            Err(_elapsed) => Err(GatewayError::Timeout),
        }
    }
}

/// Maps an HTTP-level error onto the gateway taxonomy.
fn classify(error: serenity::Error) -> GatewayError {
    match status_of(&error) {
        Some(429) => GatewayError::RateLimited,
        _ => GatewayError::Http(error),
    }
}

/// Extracts the status code of an unsuccessful request, if that's what the
/// error is.
fn status_of(error: &serenity::Error) -> Option<u16> {
    match error {
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)) => {
            Some(response.status_code.as_u16())
        }
        _ => None,
    }
}
