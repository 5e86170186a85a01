//! Bot commands.

mod presence;
mod voice;

use poise::CreateReply;

use crate::BotError;
use crate::Context;
use crate::Data;

/// Convenient type alias for [poise::Command].
pub type Command = poise::Command<Data, BotError>;

/// Lists all the implemented commands
pub fn list() -> Vec<Command> {
    vec![voice::voice(), presence::presence()]
}

/// Confirm a command with a short ephemeral reply.
async fn confirm(ctx: &Context<'_>, content: impl Into<String>) -> Result<(), BotError> {
    let reply = CreateReply::default().ephemeral(true).content(content);
    ctx.send(reply).await?;
    Ok(())
}
