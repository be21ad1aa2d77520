//! Combat session configuration.
//!
//! Loaded from TOML. Every section has defaults, so an empty file (or no
//! file at all) gives the tuning the client ships with.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::TIMESTEP_MS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub engine: EngineConfig,
    pub combat: CombatTuning,
    pub mob: MobTuning,
    pub player: PlayerTuning,
}

impl CombatConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Loop and session settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulated milliseconds per tick.
    pub timestep_ms: u16,
    /// Ticks the headless driver runs before exiting.
    pub tick_limit: u64,
    pub log_level: String,
    /// Fixed RNG seed. `None` seeds from the thread RNG.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            timestep_ms: TIMESTEP_MS,
            tick_limit: 1250,
            log_level: "info".to_string(),
            rng_seed: None,
        }
    }
}

/// Damage resolution and effect scheduling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    /// Settle time before a remote attack is replayed locally.
    pub attack_replay_delay_ms: i64,
    pub damage_cap: f64,
    pub critical_multiplier: f64,
    /// Horizontal distance a bullet with no target flies.
    pub bullet_fallback_shift: i16,
    /// Height above the feet a bullet with no target flies at.
    pub bullet_fallback_rise: i16,
}

impl Default for CombatTuning {
    fn default() -> Self {
        CombatTuning {
            attack_replay_delay_ms: 400,
            damage_cap: 999_999.0,
            critical_multiplier: 1.5,
            bullet_fallback_shift: 400,
            bullet_fallback_rise: 26,
        }
    }
}

/// Mob AI and lifecycle.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MobTuning {
    /// AI counter value after which a stance may change.
    pub hit_window: u16,
    /// Counter value installed by a knockback.
    pub knockback_counter: u16,
    pub jump_chance: f32,
    /// Opacity change per tick while fading in or out.
    pub fade_step: f32,
    pub hp_display_ms: i64,
}

impl Default for MobTuning {
    fn default() -> Self {
        MobTuning {
            hit_window: 200,
            knockback_counter: 170,
            jump_chance: 0.25,
            fade_step: 0.025,
            hp_display_ms: 2000,
        }
    }
}

/// Player attack timing.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Base delay between consecutive hits of one attack.
    pub hit_interval_ms: u16,
    /// Base length of an attack pose at normal speed.
    pub attack_animation_ms: u16,
    pub invincible_ms: i64,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        PlayerTuning {
            hit_interval_ms: 120,
            attack_animation_ms: 600,
            invincible_ms: 2000,
        }
    }
}
