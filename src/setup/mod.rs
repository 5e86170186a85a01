//! Defines and implements custom bot functionality.

mod config;
mod framework;

use crate::serenity;
use crate::BotError;

pub use config::Config;

/// Constructs a [serenity::Client] with the command framework installed.
pub(super) async fn client(config: Config) -> Result<serenity::Client, BotError> {
    // Get discord token from config file
    let token = config.token()?;

    // Intents we wish to use
    // See https://discord.com/developers/docs/topics/gateway#gateway-intents
    let intents = serenity::GatewayIntents::non_privileged();

    let client = serenity::ClientBuilder::new(token, intents)
        .framework(framework::framework(config))
        .await?;

    Ok(client)
}
