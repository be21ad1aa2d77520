//! Characters: the local player and other players on the map.
//!
//! Both share `CharCore` (position, facing, attack pose, cues) and are
//! driven through the `Char` trait, so moves and effects do not care which
//! kind of character performs them.

pub mod job;
pub mod other_char;
pub mod player;
pub mod stats;
pub mod weapon;

use std::collections::HashMap;

use crate::combat::effects::{Cue, DamageNumber, DamageNumberKind};
use crate::config::PlayerTuning;
use crate::world::geometry::Point;
use crate::world::physics::PhysicsObject;

use self::weapon::WeaponType;

/// Character stances. Byte values are the protocol encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CharState {
    Walk = 2,
    #[default]
    Stand = 4,
    Fall = 6,
    Alert = 8,
    Prone = 10,
    Swim = 12,
    Ladder = 14,
    Rope = 16,
    Died = 18,
    Sit = 20,
}

impl CharState {
    pub fn is_climbing(self) -> bool {
        matches!(self, CharState::Ladder | CharState::Rope)
    }
}

/// The pose a character is attacking with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttackPose {
    /// Named skill action.
    Action(String),
    /// Raw stance byte replayed from the server.
    Stance(u8),
    /// Weapon swing. Degenerate when a ranged weapon is swung in melee.
    Regular { degenerate: bool },
}

/// State shared by every character.
#[derive(Debug, Clone)]
pub struct CharCore {
    pub oid: i32,
    pub level: u16,
    pub phobj: PhysicsObject,
    state: CharState,
    flip: bool,
    weapon_type: WeaponType,
    two_handed: bool,
    attack_speed: i8,
    skill_levels: HashMap<i32, i32>,
    pose: Option<AttackPose>,
    pose_remaining_ms: i64,
    afterimage: i32,
    cues: Vec<Cue>,
    damage_numbers: Vec<DamageNumber>,
    tuning: PlayerTuning,
}

impl CharCore {
    pub fn new(oid: i32, level: u16, position: Point, tuning: PlayerTuning) -> Self {
        CharCore {
            oid,
            level,
            phobj: PhysicsObject::new(position),
            state: CharState::Stand,
            flip: true,
            weapon_type: WeaponType::None,
            two_handed: false,
            attack_speed: 0,
            skill_levels: HashMap::new(),
            pose: None,
            pose_remaining_ms: 0,
            afterimage: 0,
            cues: Vec::new(),
            damage_numbers: Vec::new(),
            tuning,
        }
    }

    /// Advance the attack pose and floating numbers by one tick.
    pub fn update(&mut self, timestep: u16) {
        if self.pose.is_some() {
            self.pose_remaining_ms -= i64::from(timestep);
            if self.pose_remaining_ms <= 0 {
                self.pose = None;
            }
        }
        self.damage_numbers.retain_mut(|n| !n.update(timestep));
    }

    fn begin_pose(&mut self, pose: AttackPose) {
        let speed = real_attack_speed(self.attack_speed);
        self.pose_remaining_ms = (f32::from(self.tuning.attack_animation_ms) / speed) as i64;
        self.pose = Some(pose);
    }

    pub fn set_weapon(&mut self, weapon_type: WeaponType, two_handed: bool, attack_speed: i8) {
        self.weapon_type = weapon_type;
        self.two_handed = two_handed;
        self.attack_speed = attack_speed;
    }

    pub fn set_skill_level(&mut self, skill_id: i32, level: i32) {
        self.skill_levels.insert(skill_id, level);
    }

    pub fn set_attack_speed(&mut self, attack_speed: i8) {
        self.attack_speed = attack_speed;
    }

    pub fn state(&self) -> CharState {
        self.state
    }

    pub fn set_state(&mut self, state: CharState) {
        self.state = state;
    }

    pub fn set_flip(&mut self, flip: bool) {
        self.flip = flip;
    }

    pub fn is_attacking(&self) -> bool {
        self.pose.is_some()
    }

    pub fn pose(&self) -> Option<&AttackPose> {
        self.pose.as_ref()
    }

    pub fn afterimage(&self) -> i32 {
        self.afterimage
    }

    pub fn take_cues(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.cues)
    }

    pub fn damage_numbers(&self) -> &[DamageNumber] {
        &self.damage_numbers
    }
}

/// `1.7 - speed / 10`, kept positive for out-of-range speeds.
pub fn real_attack_speed(integer_speed: i8) -> f32 {
    (f32::from(17 - i16::from(integer_speed)) / 10.0).max(0.1)
}

/// Something that can perform moves.
pub trait Char {
    fn core(&self) -> &CharCore;
    fn core_mut(&mut self) -> &mut CharCore;

    fn oid(&self) -> i32 {
        self.core().oid
    }

    fn level(&self) -> u16 {
        self.core().level
    }

    fn position(&self) -> Point {
        self.core().phobj.position()
    }

    /// True when facing right.
    fn flip(&self) -> bool {
        self.core().flip
    }

    fn weapon_type(&self) -> WeaponType {
        self.core().weapon_type
    }

    fn is_two_handed(&self) -> bool {
        self.core().two_handed
    }

    fn skill_level(&self, skill_id: i32) -> i32 {
        self.core().skill_levels.get(&skill_id).copied().unwrap_or(0)
    }

    fn integer_attack_speed(&self) -> i8 {
        self.core().attack_speed
    }

    fn real_attack_speed(&self) -> f32 {
        real_attack_speed(self.integer_attack_speed())
    }

    /// Delay from the start of an attack until hit number `hit` lands.
    fn attack_delay(&self, hit: usize) -> u16 {
        let base = f32::from(self.core().tuning.hit_interval_ms) * hit as f32;
        (base / self.real_attack_speed()) as u16
    }

    fn attack_action(&mut self, action: &str) {
        self.core_mut().begin_pose(AttackPose::Action(action.to_string()));
    }

    fn attack_stance(&mut self, stance: u8) {
        self.core_mut().begin_pose(AttackPose::Stance(stance));
    }

    fn attack_regular(&mut self, degenerate: bool) {
        self.core_mut().begin_pose(AttackPose::Regular { degenerate });
    }

    fn set_afterimage(&mut self, skill_id: i32) {
        self.core_mut().afterimage = skill_id;
    }

    fn show_cue(&mut self, cue: Cue) {
        self.core_mut().cues.push(cue);
    }

    /// Float a damage number over the head. 0 shows as a miss.
    fn show_damage(&mut self, amount: i32) {
        let head = self.position() - Point::new(0, 60);
        let number = DamageNumber::new(DamageNumberKind::ToPlayer, amount, head.x, head.y);
        self.core_mut().damage_numbers.push(number);
    }
}
