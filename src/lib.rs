//! Real-time combat core for a 2D side-scrolling MMORPG client.
//!
//! Turns skill/attack input into resolved, time-staggered damage
//! applications, drives mob reactions, and replays attacks received from
//! the server through the same effect pipeline.
//!
//! Architecture:
//!   - Fixed timestep (default 8ms), single-threaded, cooperative
//!   - `Stage::update` fans out to combat schedulers, mobs and the player
//!   - Scheduled effects address mobs by object id and re-validate on fire

pub mod character;
pub mod combat;
pub mod config;
pub mod protocol;
pub mod stage;
pub mod world;

/// Default simulation timestep in milliseconds.
pub const TIMESTEP_MS: u16 = 8;
