//! Configuration for running this bot.

use std::collections::HashSet;

use poise::Framework;
use serde::Deserialize;
use serde::Serialize;
use serenity::GuildId;
use serenity::UserId;

use crate::error::ConfigError;
use crate::presence::PresenceConfig;
use crate::roles::RolesConfig;
use crate::serenity;
use crate::voice::VoiceConfig;

/// The path to the config file
const CONFIG_PATH: &str = "config.toml";

/// Settings read from [CONFIG_PATH] that modify bot behavior.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Token needed to use a bot account.
    discord_token: String,

    /// See [BasicConfig]
    basic: BasicConfig,

    /// See [LoggingConfig]
    logging: LoggingConfig,

    /// Useful developer specific configs.
    dev_utils: DevConfig,

    /// See [PresenceConfig]
    presence: PresenceConfig,

    /// See [RolesConfig]
    role_assignment: RolesConfig,

    /// See [VoiceConfig]
    voice_channels: VoiceConfig,
}

impl Config {
    /// Tries to read [CONFIG_PATH] to extract a [Config].
    /// If a file doesn't exist, create the default config file and return error.
    /// If a file exists but is empty, re-write the default values and return error.
    /// If a file exists but is incomplete, show error and don't change files.
    /// If a file exists and is complete, read file to create a config.
    /// If file existence is indeterminate (e.g. missing permissions), return error.
    pub fn read() -> Result<Config, ConfigError> {
        let file = std::fs::read_to_string(CONFIG_PATH);

        match file {
            // Config file found
            Ok(content) => {
                // Write default values to file if it's empty.
                if content.trim().is_empty() {
                    write_file(Config::default())?;
                    Err(ConfigError::InvalidConfig {
                        reason: format!("Empty config file! Rewriting {CONFIG_PATH} ..."),
                    })
                } else {
                    // If deserialization fails, return error describing the mistake.
                    let to_toml = toml::Deserializer::new(&content);
                    let result: Result<Config, _> = serde_path_to_error::deserialize(to_toml);

                    result.map_err(|error| ConfigError::InvalidConfig {
                        reason: error.to_string(),
                    })
                }
            }
            // File not found or other filesystem error
            Err(file_error) => match file_error.kind() {
                // If file doesn't exist, create default config file.
                std::io::ErrorKind::NotFound => {
                    let action = format!("Creating {CONFIG_PATH}...");
                    write_file(Config::default())?;
                    Err(ConfigError::MissingConfig { action_msg: action })
                }
                _ => Err(ConfigError::IoError(file_error)),
            },
        }
    }

    /// Basic sanity check for if a token was given.
    pub fn token(&self) -> Result<&String, ConfigError> {
        let default_token = Config::default().discord_token;
        let given_token = &self.discord_token;

        let is_empty = given_token.is_empty();
        let contains_default = given_token.contains(&default_token);

        if !is_empty && !contains_default {
            Ok(&self.discord_token)
        } else {
            Err(ConfigError::InvalidConfig {
                reason: "Missing discord token".to_string(),
            })
        }
    }

    /// The guild this bot serves.
    pub fn guild_id(&self) -> GuildId {
        self.basic.guild_id
    }

    /// Construct a bug notification notify list based on the config.
    /// Wrapper for [NotifyConfig::notify_list]
    pub fn notify_list<U, E>(&self, fw: &Framework<U, E>) -> HashSet<UserId> {
        self.dev_utils.notifications.notify_list(fw)
    }

    /// Getter for log_dir.
    pub fn log_dir(&self) -> &str {
        &self.logging.log_dir
    }

    /// Is debug mode enabled for console logs
    pub fn console_debug(&self) -> bool {
        self.logging.console_debug
    }

    /// Is file logging enabled.
    pub fn logs_enabled(&self) -> bool {
        self.logging.logs_enabled
    }

    pub fn dev_guild(&self) -> Option<GuildId> {
        self.dev_utils.dev_guild
    }

    pub fn presence(&self) -> &PresenceConfig {
        &self.presence
    }

    pub fn roles(&self) -> &RolesConfig {
        &self.role_assignment
    }

    pub fn voice(&self) -> &VoiceConfig {
        &self.voice_channels
    }
}

/// Guild-level settings.
#[derive(Debug, Serialize, Deserialize)]
struct BasicConfig {
    /// The guild whose channels and roles are managed.
    guild_id: GuildId,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            guild_id: GuildId::new(1),
        }
    }
}

/// Configs for log output.
#[derive(Debug, Serialize, Deserialize)]
struct LoggingConfig {
    /// Print debug traces to console?
    console_debug: bool,
    /// Enable writing to log file?
    logs_enabled: bool,
    /// Directory to store log files
    log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_debug: false,
            logs_enabled: true,
            log_dir: "logs".to_string(),
        }
    }
}

/// Optional configs to enable developer-specific behavior.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DevConfig {
    /// Optional guild to automatically update commands quickly.
    #[serde(serialize_with = "serialize_opt", deserialize_with = "deserialize_opt")]
    dev_guild: Option<GuildId>,
    /// See [NotifyConfig]
    notifications: NotifyConfig,
}

/// Configs for notification behavior when encountering unexpected errors.
#[derive(Debug, Serialize, Deserialize)]
struct NotifyConfig {
    /// Enable this behavior or not. (bot sends a private message)
    enabled: bool,
    /// Whether to automatically add owners to the notify list.
    add_owners: bool,
    /// Additional users to add to the notify list.
    userids: Vec<UserId>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            add_owners: true,
            userids: vec![],
        }
    }
}

impl NotifyConfig {
    /// Construct a bug notification notify list based on the config.
    fn notify_list<U, E>(&self, fw: &Framework<U, E>) -> HashSet<UserId> {
        let mut notify_list = HashSet::new();

        // If disabled, don't add anyone to the list.
        if !self.enabled {
            return notify_list;
        }

        // Add bot owners if enabled
        if self.add_owners {
            let owners = &fw.options().owners;
            for userid in owners {
                notify_list.insert(*userid);
            }
        }

        // Add users in config
        for userid in &self.userids {
            notify_list.insert(*userid);
        }

        notify_list
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: "put_token_here".to_string(),
            basic: BasicConfig::default(),
            logging: LoggingConfig::default(),
            dev_utils: DevConfig::default(),
            presence: PresenceConfig::default(),
            role_assignment: RolesConfig::default(),
            voice_channels: VoiceConfig::default(),
        }
    }
}

/// Write the given config to [CONFIG_PATH].
fn write_file(config: Config) -> Result<(), ConfigError> {
    use std::fs::write;

    let content = toml::to_string_pretty(&config).expect("config serialization can't fail");
    write(CONFIG_PATH, content).map_err(ConfigError::IoError)
}

fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<GuildId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_str(OptVisitor)
}

fn serialize_opt<T, S>(val: &Option<T>, ser: S) -> Result<S::Ok, S::Error>
where
    T: serde::Serialize,
    S: serde::Serializer,
{
    match val {
        Some(v) => v.serialize(ser),
        None => ser.serialize_str(""),
    }
}

struct OptVisitor;

impl<'de> serde::de::Visitor<'de> for OptVisitor {
    type Value = Option<GuildId>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a valid guild id")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        match v {
            "" => Ok(None),
            _ => {
                let num: u64 = v.parse().map_err(|_| E::custom("not u64"))?;
                Ok(Some(GuildId::new(num)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::ChannelOrderStrategy;

    const SAMPLE: &str = r#"
        discord_token = "secret-token"

        [basic]
        guild_id = "100200300400500600"

        [logging]
        console_debug = false
        logs_enabled = true
        log_dir = "logs"

        [dev_utils]
        dev_guild = ""

        [dev_utils.notifications]
        enabled = false
        add_owners = true
        userids = []

        [presence]
        enabled = true
        status = "online"
        activity_type = "listening"
        activity_text = "lecture recordings"

        [role_assignment]
        enabled = true
        data_path = "data/role_assignment.json"

        [[role_assignment.bindings]]
        custom_id = "role-math"
        role_id = "200300400500600700"

        [voice_channels]
        enabled = true
        managed_category_id = "300400500600700800"
        ignore_bots = true
        channel_order_strategy = "first_available"
        ensure_unique_names = true
        overflow_channel_name = "Voice {number}"
        available_channel_names = ["Lobby", "Study Room"]

        [voice_channels.logging]
        channel_events = true
        member_events = true
        rate_limit = true
    "#;

    #[test]
    fn sample_config_parses() {
        let config: Config = toml::from_str(SAMPLE).expect("sample config must parse");

        assert_eq!(config.guild_id(), GuildId::new(100200300400500600));
        assert!(config.voice().enabled);
        assert_eq!(
            config.voice().channel_order_strategy,
            ChannelOrderStrategy::FirstAvailable
        );
        assert_eq!(config.roles().bindings.len(), 1);
        assert!(config.token().is_ok());
    }

    #[test]
    fn default_config_has_no_usable_token() {
        assert!(Config::default().token().is_err());
    }
}
