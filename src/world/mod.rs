//! The map the combat core acts on.

pub mod geometry;
pub mod mob;
pub mod mobs;
pub mod physics;

use rand::rngs::StdRng;

use crate::character::other_char::MapChars;
use crate::character::player::Player;

use self::mobs::MapMobs;
use self::physics::Physics;

/// Everything combat reads and mutates during a tick. Fields are public so
/// callers can borrow them independently.
pub struct World {
    pub player: Player,
    pub chars: MapChars,
    pub mobs: MapMobs,
    pub physics: Physics,
    pub rng: StdRng,
}
