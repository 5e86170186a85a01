//! A community-management bot for a campus Discord server.
//!
//! The bot keeps a managed category stocked with exactly one empty voice
//! channel, toggles self-assignable roles from message components, and
//! exposes a small admin surface for the bot's presence.

mod commands;
mod data;
mod error;
mod events;
mod log;
mod presence;
mod roles;
mod setup;
mod voice;

/// Re-export so the rest of the crate can `use crate::serenity`.
pub use poise::serenity_prelude as serenity;

pub use data::Data;
pub use error::BotError;
pub use setup::Config;

/// Convenient type alias, only this [poise::Context] type is used.
type Context<'a> = poise::Context<'a, Data, BotError>;

#[tokio::main]
async fn main() -> Result<(), BotError> {
    // Config must be read before tracing; the logging layers are configured by it.
    let config = Config::read()?;

    // Keep the guard alive or the file writer shuts down early.
    let _guard = log::install_tracing(&config);

    let mut client = setup::client(config).await?;
    client.start().await?;

    Ok(())
}
