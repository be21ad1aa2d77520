//! Other players on the map, driven entirely by server packets.

use std::collections::BTreeMap;

use tracing::debug;

use crate::character::{Char, CharCore, CharState};
use crate::combat::effects::Cue;
use crate::config::PlayerTuning;
use crate::world::geometry::Point;
use crate::world::physics::Physics;

/// A remote player. Only what remote attacks need to replay is tracked.
#[derive(Debug, Clone)]
pub struct OtherChar {
    core: CharCore,
}

impl OtherChar {
    pub fn new(oid: i32, level: u16, position: Point, tuning: PlayerTuning) -> Self {
        OtherChar {
            core: CharCore::new(oid, level, position, tuning),
        }
    }

    /// Record the skill level a remote attack reported.
    pub fn update_skill(&mut self, skill_id: i32, level: u8) {
        self.core.set_skill_level(skill_id, i32::from(level));
    }

    pub fn update_speed(&mut self, speed: u8) {
        self.core.set_attack_speed(i8::try_from(speed).unwrap_or(i8::MAX));
    }

    /// Apply a position and stance reported by the server.
    pub fn set_position(&mut self, position: Point, state: CharState, facing_right: bool) {
        self.core.phobj.set_position(position);
        if !self.core.is_attacking() {
            self.core.set_state(state);
            self.core.set_flip(facing_right);
        }
    }

    pub fn update(&mut self, physics: &Physics, timestep: u16) {
        self.core.update(timestep);
        physics.move_object(&mut self.core.phobj);
    }
}

impl Char for OtherChar {
    fn core(&self) -> &CharCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CharCore {
        &mut self.core
    }
}

/// Every remote player on the map, by character id.
#[derive(Debug, Default)]
pub struct MapChars {
    chars: BTreeMap<i32, OtherChar>,
}

impl MapChars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace.
    pub fn spawn(&mut self, other: OtherChar) {
        debug!(cid = other.oid(), "char spawned");
        self.chars.insert(other.oid(), other);
    }

    pub fn remove(&mut self, cid: i32) -> Option<OtherChar> {
        self.chars.remove(&cid)
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }

    pub fn get_char(&self, cid: i32) -> Option<&OtherChar> {
        self.chars.get(&cid)
    }

    pub fn get_char_mut(&mut self, cid: i32) -> Option<&mut OtherChar> {
        self.chars.get_mut(&cid)
    }

    pub fn update(&mut self, physics: &Physics, timestep: u16) {
        for other in self.chars.values_mut() {
            other.update(physics, timestep);
        }
    }

    /// Drain cues of every character, tagged with its id.
    pub fn take_cues(&mut self) -> Vec<(i32, Cue)> {
        self.chars
            .iter_mut()
            .flat_map(|(&cid, other)| {
                other.core_mut().take_cues().into_iter().map(move |cue| (cid, cue))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}
