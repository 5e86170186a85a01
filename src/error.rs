//! Error types for the bot.
//!
//! [`BotError`] is the error type carried by the command framework.
//! [`UserError`] covers everything a user can trigger themselves; its
//! [`Display`](std::fmt::Display) text is what gets sent back as the
//! ephemeral reply. Module-specific errors (e.g. [`VoiceError`]) convert
//! into [`BotError`] at the command layer.

use std::time::Duration;

use thiserror::Error;

use crate::serenity;
use crate::voice::VoiceError;

/// Top-level error type used throughout the bot.
#[derive(Debug, Error)]
pub enum BotError {
    /// Errors caused (and seen) by users.
    #[error(transparent)]
    UserError(#[from] UserError),

    /// Errors from reading or validating the config file.
    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    /// Errors from the voice channel manager.
    #[error(transparent)]
    VoiceError(#[from] VoiceError),

    /// Errors bubbling up from the discord client library.
    #[error(transparent)]
    Serenity(#[from] serenity::Error),

    /// A command check failed.
    #[error("Check failed: {}", reason.as_deref().unwrap_or("no reason given"))]
    CheckFailed { reason: Option<String> },

    /// A command handler panicked.
    #[error("Command panicked: {}", payload.as_deref().unwrap_or("<no payload>"))]
    Panic { payload: Option<String> },

    /// Discord's view of a command doesn't match ours (stale registration).
    #[error("Command structure mismatch: {description}")]
    CommandStructureMismatch { description: String },
}

/// Errors users can cause and recover from.
/// The display text doubles as the ephemeral reply content.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("This command only works in a server.")]
    GuildOnly,
    #[error("This command only works in direct messages.")]
    DmOnly,
    #[error("This command only works in age-restricted channels.")]
    NsfwOnly,
    #[error("Only the bot owner can use this command.")]
    NotOwner,
    #[error("You must be in a voice channel to use this command.")]
    NotInVoice,
    #[error("This channel is not managed by the bot.")]
    UnmanagedChannel,
    #[error("Failed to rename the channel. You can only rename a channel twice every 10 minutes.")]
    RenameRateLimited,
    #[error("Voice channel management is not enabled.")]
    VoiceManagerDisabled,
    #[error("Presence management is not enabled.")]
    PresenceDisabled,
    #[error("Missing subcommand. Try one of: {subcmds}")]
    MissingSubcommand { subcmds: String },
    #[error("Could not parse arguments: {}", input.as_deref().unwrap_or("<none>"))]
    BadArgs { input: Option<String> },
    #[error("Command is on cooldown. Try again in {} seconds.", remaining_cooldown.as_secs())]
    OnCooldown { remaining_cooldown: Duration },
    #[error("The bot is missing permissions: {missing_permissions}")]
    MissingBotPermissions {
        missing_permissions: serenity::Permissions,
    },
    #[error("You are missing permissions to use this command.")]
    MissingUserPermissions {
        missing_permissions: Option<serenity::Permissions>,
    },
}

/// Errors from reading the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },
    #[error("Missing config file. {action_msg}")]
    MissingConfig { action_msg: String },
    #[error(transparent)]
    IoError(std::io::Error),
}
