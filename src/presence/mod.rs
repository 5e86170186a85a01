//! Bot presence management.
//!
//! The initial presence comes from the config file; `/presence` updates it
//! at runtime. Status and activity are applied together because the
//! platform replaces the whole presence on every update.

use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;

use crate::serenity;

/// Presence settings applied at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    pub enabled: bool,
    pub status: StatusKind,
    pub activity_type: Option<ActivityKind>,
    pub activity_text: Option<String>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            status: StatusKind::Online,
            activity_type: None,
            activity_text: None,
        }
    }
}

/// The bot's online status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, poise::ChoiceParameter)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Online,
    Idle,
    #[name = "do not disturb"]
    Dnd,
    Invisible,
}

impl From<StatusKind> for serenity::OnlineStatus {
    fn from(kind: StatusKind) -> Self {
        match kind {
            StatusKind::Online => serenity::OnlineStatus::Online,
            StatusKind::Idle => serenity::OnlineStatus::Idle,
            StatusKind::Dnd => serenity::OnlineStatus::DoNotDisturb,
            StatusKind::Invisible => serenity::OnlineStatus::Invisible,
        }
    }
}

/// The kind of activity shown under the bot's name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, poise::ChoiceParameter)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Playing,
    Listening,
    Watching,
    Competing,
    Custom,
}

impl ActivityKind {
    fn into_activity(self, text: &str) -> serenity::ActivityData {
        match self {
            ActivityKind::Playing => serenity::ActivityData::playing(text),
            ActivityKind::Listening => serenity::ActivityData::listening(text),
            ActivityKind::Watching => serenity::ActivityData::watching(text),
            ActivityKind::Competing => serenity::ActivityData::competing(text),
            ActivityKind::Custom => serenity::ActivityData::custom(text),
        }
    }
}

/// Tracks the last applied presence so status and activity can be changed
/// independently of each other.
pub struct PresenceService {
    state: Mutex<PresenceState>,
}

struct PresenceState {
    status: serenity::OnlineStatus,
    activity: Option<serenity::ActivityData>,
}

impl PresenceService {
    pub fn new(config: &PresenceConfig) -> Self {
        let activity = match (config.activity_type, config.activity_text.as_deref()) {
            (Some(kind), Some(text)) => Some(kind.into_activity(text)),
            _ => None,
        };
        Self {
            state: Mutex::new(PresenceState {
                status: config.status.into(),
                activity,
            }),
        }
    }

    /// Pushes the tracked presence to the gateway.
    pub fn apply(&self, ctx: &serenity::Context) {
        let state = self.state.lock().expect("presence state poisoned");
        ctx.set_presence(state.activity.clone(), state.status);
    }

    pub fn set_status(&self, ctx: &serenity::Context, status: StatusKind) {
        {
            let mut state = self.state.lock().expect("presence state poisoned");
            state.status = status.into();
        }
        self.apply(ctx);
        tracing::info!("Status set to {status:?}.");
    }

    pub fn set_activity(&self, ctx: &serenity::Context, kind: ActivityKind, text: &str) {
        {
            let mut state = self.state.lock().expect("presence state poisoned");
            state.activity = Some(kind.into_activity(text));
        }
        self.apply(ctx);
        tracing::info!("Activity set to {kind:?} \"{text}\".");
    }
}
