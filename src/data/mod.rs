//! This module contains everything relating to [Data].

use std::collections::HashSet;
use std::sync::Arc;

use crate::presence::PresenceService;
use crate::roles::RoleBoard;
use crate::serenity;
use crate::voice::VoicePool;

/// The data kept between shards, built once during framework setup.
pub struct Data {
    /// List of users to send bug notifications
    pub notify_list: HashSet<serenity::UserId>,
    /// The voice channel pool. `None` when the module is disabled.
    pub voice: Option<Arc<VoicePool>>,
    /// The role board. `None` when the module is disabled.
    pub roles: Option<RoleBoard>,
    /// Presence state, applied at startup and updated via `/presence`.
    pub presence: Option<PresenceService>,
}
