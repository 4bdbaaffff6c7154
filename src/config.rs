//! Server Configuration
//!
//! Server variables consumed by the simulation. Loaded from `SOLOFNG_*`
//! environment variables or a JSON document; read-only during a tick.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable did not parse.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name
        key: String,
        /// Raw value
        value: String,
    },
    /// A value parsed but is not usable.
    #[error("{key} out of range: {value}")]
    OutOfRange {
        /// Field name
        key: &'static str,
        /// Offending value
        value: i64,
    },
    /// Malformed JSON document.
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Longest accepted freeze, in seconds.
pub const MAX_FREEZE_DELAY: i32 = 3600;

/// Weapon loadout variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    /// Spawn with the laser
    #[default]
    SoloFng,
    /// Spawn with the grenade launcher
    BoloFng,
}

/// Server variables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Simulation ticks per second
    pub tick_speed: i32,
    /// Loadout variant
    pub game_type: GameType,
    /// Seconds a laser or grenade hit freezes for
    pub freeze_delay: i32,
    /// Damage below this is discarded after knockback
    pub hit_box_dmg: i32,
    /// Online players needed before sprees count
    pub spree_players: i32,
    /// Hammer knockback scale X, percent
    pub hammer_scale_x: i32,
    /// Hammer knockback scale Y, percent
    pub hammer_scale_y: i32,
    /// Hammer knockback scale X on frozen teammates, percent
    pub melt_hammer_scale_x: i32,
    /// Hammer knockback scale Y on frozen teammates, percent
    pub melt_hammer_scale_y: i32,
    /// Hide ammo from spectators
    pub strict_spectate_mode: bool,
    /// Team play is on
    pub teamplay: bool,
    /// Max seconds between dead-reckoning refreshes
    pub reckoning_stale_secs: i32,
    /// Delay between death and the earliest respawn
    pub respawn_delay_ms: i32,
    /// Delay after which a dead player respawns on its own
    pub auto_respawn_secs: i32,
    /// Oldest client version that understands non-world kill codes
    pub min_killmessage_client_version: i32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_speed: 50,
            game_type: GameType::SoloFng,
            freeze_delay: 10,
            hit_box_dmg: 0,
            spree_players: 4,
            hammer_scale_x: 100,
            hammer_scale_y: 100,
            melt_hammer_scale_x: 100,
            melt_hammer_scale_y: 100,
            strict_spectate_mode: false,
            teamplay: false,
            reckoning_stale_secs: 3,
            respawn_delay_ms: 500,
            auto_respawn_secs: 3,
            min_killmessage_client_version: 0x0704,
        }
    }
}

fn env_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

fn env_flag(key: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            _ => Err(ConfigError::InvalidValue { key: key.to_string(), value: raw }),
        },
        Err(_) => Ok(default),
    }
}

impl GameConfig {
    /// Load from `SOLOFNG_*` environment variables; unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();
        let game_type = match std::env::var("SOLOFNG_GAME_TYPE") {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "solofng" => GameType::SoloFng,
                "bolofng" => GameType::BoloFng,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "SOLOFNG_GAME_TYPE".to_string(),
                        value: raw,
                    })
                }
            },
            Err(_) => d.game_type,
        };

        let config = Self {
            tick_speed: env_var("SOLOFNG_TICK_SPEED", d.tick_speed)?,
            game_type,
            freeze_delay: env_var("SOLOFNG_FREEZE_DELAY", d.freeze_delay)?,
            hit_box_dmg: env_var("SOLOFNG_HIT_BOX_DMG", d.hit_box_dmg)?,
            spree_players: env_var("SOLOFNG_SPREE_PLAYERS", d.spree_players)?,
            hammer_scale_x: env_var("SOLOFNG_HAMMER_SCALE_X", d.hammer_scale_x)?,
            hammer_scale_y: env_var("SOLOFNG_HAMMER_SCALE_Y", d.hammer_scale_y)?,
            melt_hammer_scale_x: env_var("SOLOFNG_MELT_HAMMER_SCALE_X", d.melt_hammer_scale_x)?,
            melt_hammer_scale_y: env_var("SOLOFNG_MELT_HAMMER_SCALE_Y", d.melt_hammer_scale_y)?,
            strict_spectate_mode: env_flag("SOLOFNG_STRICT_SPECTATE", d.strict_spectate_mode)?,
            teamplay: env_flag("SOLOFNG_TEAMPLAY", d.teamplay)?,
            reckoning_stale_secs: env_var("SOLOFNG_RECKONING_STALE_SECS", d.reckoning_stale_secs)?,
            respawn_delay_ms: env_var("SOLOFNG_RESPAWN_DELAY_MS", d.respawn_delay_ms)?,
            auto_respawn_secs: env_var("SOLOFNG_AUTO_RESPAWN_SECS", d.auto_respawn_secs)?,
            min_killmessage_client_version: env_var(
                "SOLOFNG_MIN_KILLMESSAGE_VERSION",
                d.min_killmessage_client_version,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=1000).contains(&self.tick_speed) {
            return Err(ConfigError::OutOfRange { key: "tick_speed", value: self.tick_speed as i64 });
        }
        if !(0..=MAX_FREEZE_DELAY).contains(&self.freeze_delay) {
            return Err(ConfigError::OutOfRange { key: "freeze_delay", value: self.freeze_delay as i64 });
        }
        if self.reckoning_stale_secs < 1 {
            return Err(ConfigError::OutOfRange {
                key: "reckoning_stale_secs",
                value: self.reckoning_stale_secs as i64,
            });
        }
        if self.respawn_delay_ms < 0 {
            return Err(ConfigError::OutOfRange { key: "respawn_delay_ms", value: self.respawn_delay_ms as i64 });
        }
        Ok(())
    }

    /// Ticks of `secs` seconds.
    #[inline]
    pub fn secs_to_ticks(&self, secs: i32) -> i32 {
        secs.saturating_mul(self.tick_speed)
    }
}

// =============================================================================
// TESTS
// =============================================================================
