//! Configuration for the voice channel manager.

use serde::Deserialize;
use serde::Serialize;

use super::VoiceError;
use crate::serenity;

/// Order in which candidate names are tried when creating a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOrderStrategy {
    /// Candidates are tried in a random permutation.
    Random,
    /// Candidates are tried in configured order.
    FirstAvailable,
}

/// Settings for the voice channel manager.
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Whether the module loads at all.
    pub enabled: bool,
    /// The category whose voice channels are managed.
    pub managed_category_id: serenity::ChannelId,
    /// Whether bot members count toward channel occupancy.
    pub ignore_bots: bool,
    /// See [ChannelOrderStrategy].
    pub channel_order_strategy: ChannelOrderStrategy,
    /// Whether overflow names must be numbered uniquely.
    pub ensure_unique_names: bool,
    /// Name used once all candidates are taken. Must contain `{number}`
    /// when `ensure_unique_names` is set.
    pub overflow_channel_name: String,
    /// Candidate channel names, in configured order.
    pub available_channel_names: Vec<String>,
    /// See [VoiceLoggingConfig].
    pub logging: VoiceLoggingConfig,
}

/// Per-event-class logging switches.
/// Enabled classes log at info (rate limits at error), disabled at debug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceLoggingConfig {
    /// Channel creations and deletions.
    pub channel_events: bool,
    /// Members joining, leaving, and moving between channels.
    pub member_events: bool,
    /// Rename rate limit hits.
    pub rate_limit: bool,
}

impl VoiceConfig {
    /// Structural validation that needs no guild data.
    pub fn validate(&self) -> Result<(), VoiceError> {
        if self.ensure_unique_names && !self.overflow_channel_name.contains("{number}") {
            return Err(VoiceError::InvalidConfiguration {
                reason: "`overflow_channel_name` must contain '{number}' \
                         when `ensure_unique_names` is enabled"
                    .to_string(),
            });
        }
        Ok(())
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            managed_category_id: serenity::ChannelId::new(1),
            ignore_bots: true,
            channel_order_strategy: ChannelOrderStrategy::FirstAvailable,
            ensure_unique_names: true,
            overflow_channel_name: "Voice {number}".to_string(),
            available_channel_names: vec![],
            logging: VoiceLoggingConfig {
                channel_events: true,
                member_events: true,
                rate_limit: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_template_must_contain_number_placeholder() {
        let config = VoiceConfig {
            ensure_unique_names: true,
            overflow_channel_name: "Overflow".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(VoiceError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn verbatim_overflow_name_is_fine_without_unique_names() {
        let config = VoiceConfig {
            ensure_unique_names: false,
            overflow_channel_name: "Overflow".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
