//! Gateway event dispatch.
//!
//! The framework hands every gateway event to [handle]; from here each
//! module receives the events it subscribed to as plain method calls.

use crate::serenity;
use crate::BotError;
use crate::Data;

pub async fn handle(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, BotError>,
    data: &Data,
) -> Result<(), BotError> {
    match event {
        // CacheReady fires once the guild cache is warm; Ready fires again
        // after reconnects. The pool re-derives its state from scratch, so
        // repeating the sweep is safe no matter how much drift accumulated
        // while disconnected.
        serenity::FullEvent::CacheReady { .. } | serenity::FullEvent::Ready { .. } => {
            if let Some(pool) = &data.voice {
                tracing::info!("Checking voice channels on ready.");
                pool.reconcile().await;
            }
        }
        serenity::FullEvent::VoiceStateUpdate { old, new } => {
            voice_state_update(data, old.as_ref(), new).await;
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(component),
        } => {
            if let Some(board) = &data.roles {
                board.handle_component(ctx, component).await;
            }
        }
        _ => {}
    }

    Ok(())
}

/// Splits one voice state update into its join and leave halves.
///
/// The halves run concurrently and in no particular order; each acquires
/// the pool's serialization lock before observing or changing anything, so
/// their decisions cannot interleave.
async fn voice_state_update(
    data: &Data,
    old: Option<&serenity::VoiceState>,
    new: &serenity::VoiceState,
) {
    let Some(pool) = &data.voice else { return };

    let before = old.and_then(|state| state.channel_id);
    let after = new.channel_id;

    // Mute/deafen toggles land here too; occupancy didn't change.
    if before == after {
        return;
    }

    let member = new
        .member
        .as_ref()
        .map(|m| m.display_name())
        .unwrap_or("<unknown member>");
    pool.log_member_movement(member, before, after);

    let join = async {
        if let Some(channel) = after {
            pool.handle_join(channel).await;
        }
    };
    let leave = async {
        if let Some(channel) = before {
            pool.handle_leave(channel).await;
        }
    };
    tokio::join!(join, leave);
}
