//! Self-assignable roles driven by message components.
//!
//! Buttons (or select options) carry custom ids that are bound to role ids
//! in the config file. Pressing one toggles the role on the pressing
//! member. The board remembers which message it last served from and
//! persists that binding as JSON, so the mapping survives restarts.

mod store;

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::serenity;

pub use store::DataFile;
pub use store::RoleBoardData;

/// Settings for the role board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesConfig {
    pub enabled: bool,
    /// Where the board's message binding is persisted.
    pub data_path: PathBuf,
    /// Component custom ids and the roles they toggle.
    pub bindings: Vec<RoleBinding>,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            data_path: PathBuf::from("data/role_assignment.json"),
            bindings: vec![],
        }
    }
}

/// One component-to-role binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleBinding {
    pub custom_id: String,
    pub role_id: serenity::RoleId,
}

/// Errors from the role board.
#[derive(Debug, Error)]
pub enum RoleError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Invalid role board data file: {0}")]
    InvalidData(#[from] serde_json::Error),
}

/// Toggles roles in response to component interactions.
pub struct RoleBoard {
    bindings: HashMap<String, serenity::RoleId>,
    store: DataFile,
}

impl RoleBoard {
    pub fn new(config: &RolesConfig) -> Result<Self, RoleError> {
        let store = DataFile::load(config.data_path.clone())?;
        let bindings = config
            .bindings
            .iter()
            .map(|binding| (binding.custom_id.clone(), binding.role_id))
            .collect();
        Ok(Self { bindings, store })
    }

    /// Handles one component interaction. Interactions whose custom id has
    /// no binding are not ours and are left alone. Failures are logged;
    /// nothing on this path propagates.
    pub async fn handle_component(
        &self,
        ctx: &serenity::Context,
        component: &serenity::ComponentInteraction,
    ) {
        let Some(&role) = self.bindings.get(component.data.custom_id.as_str()) else {
            return;
        };
        let Some(member) = component.member.as_ref() else {
            return;
        };

        let has_role = member.roles.contains(&role);
        let result = if has_role {
            ctx.http
                .remove_member_role(member.guild_id, member.user.id, role, Some("Role board"))
                .await
        } else {
            ctx.http
                .add_member_role(member.guild_id, member.user.id, role, Some("Role board"))
                .await
        };

        let content = match result {
            Ok(()) if has_role => {
                tracing::info!("Removed role {role} from {}.", member.user.name);
                format!("Removed <@&{role}>.")
            }
            Ok(()) => {
                tracing::info!("Added role {role} to {}.", member.user.name);
                format!("Added <@&{role}>.")
            }
            Err(error) => {
                tracing::error!("Failed to update roles for {}: {error}", member.user.id);
                "Failed to update your roles.".to_string()
            }
        };

        self.remember_message(component);

        let reply = serenity::CreateInteractionResponseMessage::new()
            .ephemeral(true)
            .content(content);
        let response = serenity::CreateInteractionResponse::Message(reply);
        if let Err(error) = component.create_response(&ctx.http, response).await {
            tracing::error!("Failed to respond to role interaction: {error}");
        }
    }

    /// Records which message the board lives on. Drift happens when an
    /// admin re-posts the board; the newest sighting wins.
    fn remember_message(&self, component: &serenity::ComponentInteraction) {
        let channel = component.channel_id;
        let message = component.message.id;
        if let Err(error) = self.store.remember(channel, message) {
            tracing::error!("Failed to save role board data: {error}");
        }
    }
}
