//! Setup for [poise::Framework]

use std::sync::Arc;

use crate::commands;
use crate::error::ConfigError;
use crate::events;
use crate::presence::PresenceService;
use crate::roles::RoleBoard;
use crate::serenity;
use crate::voice;
use crate::BotError;
use crate::Config;
use crate::Data;

/// Convenient type alias, only this [poise::Framework] type is used.
type Framework = poise::Framework<Data, BotError>;

/// Construct a [poise::Framework]
pub(super) fn framework(config: Config) -> Framework {
    poise::Framework::builder()
        .options(framework_options())
        .setup(|ctx, rdy, fw| framework_setup(ctx, rdy, fw, config))
        .build()
}

/// Configure options for the [Framework]
fn framework_options() -> poise::FrameworkOptions<Data, BotError> {
    poise::FrameworkOptions {
        // Add commands to the framework
        commands: commands::list(),
        // Handle framework errors
        on_error: |e| crate::log::handle_framework_error(e),
        // Route gateway events to the modules that subscribed to them
        event_handler: |ctx, event, fw, data| Box::pin(events::handle(ctx, event, fw, data)),
        // Log when commands start
        pre_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author();
                tracing::info!("Started '{cmd_name}' command from {user}.")
            })
        },
        // Log when finishing commands
        post_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author();
                tracing::info!("Finished '{cmd_name}' command from {user}.")
            })
        },
        ..Default::default()
    }
}

/// Construct future that runs on startup
fn framework_setup<'a>(
    ctx: &'a serenity::Context,
    rdy: &'a serenity::Ready,
    fw: &'a Framework,
    config: Config,
) -> poise::BoxFuture<'a, Result<Data, BotError>> {
    Box::pin(async move {
        // Register the commands
        let commands = &commands::list();
        let app_commands = poise::builtins::create_application_commands(commands);

        serenity::Command::set_global_commands(&ctx, app_commands.clone()).await?;
        if let Some(dev_guild) = config.dev_guild() {
            // This is faster than global registers, useful for development.
            tracing::info!("Registering commands on dev guild.");
            dev_guild.set_commands(ctx, app_commands).await?;
        }

        // Simple message that logs when the bot has initialized
        let bot_name = &rdy.user.name;
        tracing::info!("{bot_name} is ready!");

        let notify_list = config.notify_list(fw);

        // Bind the voice pool to its category. A broken voice config is
        // fatal here; refusing to start beats silently skipping the module.
        let voice = match config.voice().enabled {
            true => {
                let pool = voice::bind(
                    ctx.http.clone(),
                    ctx.cache.clone(),
                    rdy.user.id,
                    config.guild_id(),
                    config.voice().clone(),
                )
                .await?;
                Some(Arc::new(pool))
            }
            false => None,
        };

        let roles = match config.roles().enabled {
            true => {
                let board = RoleBoard::new(config.roles()).map_err(|e| {
                    ConfigError::InvalidConfig {
                        reason: format!("role board: {e}"),
                    }
                })?;
                Some(board)
            }
            false => None,
        };

        let presence = match config.presence().enabled {
            true => {
                let service = PresenceService::new(config.presence());
                service.apply(ctx);
                Some(service)
            }
            false => None,
        };

        Ok(Data {
            notify_list,
            voice,
            roles,
            presence,
        })
    })
}
