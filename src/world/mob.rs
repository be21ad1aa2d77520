//! Mob state machine.
//!
//! Stances: MOVE, STAND, JUMP, HIT, DIE. Only the controlling client runs
//! the AI and physics for a mob; everyone else replays the movement the
//! server relays.
//!
//! Lifecycle:
//!   spawn (fade in) -> alive -> dying -> DIE animation -> dead -> removed
//!
//! A server kill with animation never cuts a knockback short: a mob in its
//! HIT window stays there until the window ends, then enters DIE once.

use std::collections::VecDeque;

use rand::{Rng, RngExt};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::combat::attack::{Attack, DamageLine, MobAttack};
use crate::combat::damage::{self, DefenderStats};
use crate::combat::effects::Cue;
use crate::config::{CombatTuning, MobTuning};
use crate::world::geometry::{Point, Rect};
use crate::world::physics::{Physics, PhysicsKind, PhysicsObject};

// ===========================================================================
// Data
// ===========================================================================

/// Mob stances. Byte values are the protocol encoding for a mob facing
/// right; facing left adds one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MobStance {
    Move = 2,
    Stand = 4,
    Jump = 6,
    Hit = 8,
    Die = 10,
}

impl MobStance {
    pub const fn value_of(self, flip: bool) -> u8 {
        if flip {
            self as u8
        } else {
            self as u8 + 1
        }
    }

    /// Split a stance byte into stance and facing (true = right).
    pub fn decode(byte: u8) -> (MobStance, bool) {
        let flip = byte % 2 == 0;
        let base = if flip { byte } else { byte - 1 };
        let stance = match base {
            0..=2 => MobStance::Move,
            4 => MobStance::Stand,
            6 => MobStance::Jump,
            8 => MobStance::Hit,
            10 => MobStance::Die,
            // Fly stance bytes drive the same movement as MOVE.
            12 => MobStance::Move,
            _ => MobStance::Stand,
        };
        (stance, flip)
    }
}

/// How a server kill is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillType {
    /// Vanish immediately.
    Deactivate,
    /// Play the DIE animation.
    Animated,
    /// Fade out while dying.
    Fade,
}

impl KillType {
    pub fn from_byte(byte: i8) -> Option<Self> {
        match byte {
            0 => Some(KillType::Deactivate),
            1 => Some(KillType::Animated),
            2 => Some(KillType::Fade),
            _ => None,
        }
    }
}

/// Length of one animation cycle per stance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StanceTimings {
    pub stand_ms: u32,
    pub move_ms: u32,
    pub jump_ms: u32,
    pub hit_ms: u32,
    pub die_ms: u32,
}

impl Default for StanceTimings {
    fn default() -> Self {
        StanceTimings {
            stand_ms: 600,
            move_ms: 600,
            jump_ms: 480,
            hit_ms: 360,
            die_ms: 720,
        }
    }
}

/// Static mob data, keyed by mob id in the catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MobStats {
    pub name: String,
    pub level: u16,
    pub watk: u16,
    pub matk: u16,
    pub wdef: u16,
    pub mdef: u16,
    pub accuracy: u16,
    pub avoid: u16,
    /// Minimum damage that knocks the mob back.
    pub knockback: u16,
    pub speed: i16,
    pub fly_speed: i16,
    pub touch_damage: bool,
    pub undead: bool,
    pub no_flip: bool,
    pub can_move: bool,
    pub can_jump: bool,
    pub can_fly: bool,
    /// Hit box relative to the feet.
    pub bounds: Rect,
    /// Head position relative to the feet, facing left.
    pub head: Point,
    pub timings: StanceTimings,
}

impl Default for MobStats {
    fn default() -> Self {
        MobStats {
            name: String::new(),
            level: 1,
            watk: 0,
            matk: 0,
            wdef: 0,
            mdef: 0,
            accuracy: 0,
            avoid: 0,
            knockback: 1,
            speed: 0,
            fly_speed: 0,
            touch_damage: true,
            undead: false,
            no_flip: false,
            can_move: true,
            can_jump: false,
            can_fly: false,
            bounds: Rect::new(-25, 25, -60, 0),
            head: Point::new(0, -60),
            timings: StanceTimings::default(),
        }
    }
}

/// Spawn data relayed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MobSpawn {
    pub oid: i32,
    pub mob_id: i32,
    /// 0 observed, 1 controlled, 2 controlled and aggressive.
    pub mode: i8,
    pub stance: u8,
    pub fh: u16,
    pub new_spawn: bool,
    pub team: i8,
    pub position: Point,
}

/// One movement fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Movement {
    pub command: u8,
    pub x: i16,
    pub y: i16,
    pub vx: i16,
    pub vy: i16,
    pub fh: u16,
    pub stance: u8,
    pub duration: i16,
}

/// Movement report for a controlled mob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobMovement {
    pub oid: i32,
    pub move_id: i16,
    pub start: Point,
    pub movement: Movement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlyDirection {
    #[default]
    Straight,
    Upwards,
    Downwards,
}

/// Name label color from the level gap to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameColor {
    #[default]
    Normal,
    /// More than 9 levels below the player.
    Weaker,
    /// More than 9 levels above the player.
    Stronger,
}

// ===========================================================================
// Mob
// ===========================================================================

#[derive(Debug, Clone)]
pub struct Mob {
    oid: i32,
    mob_id: i32,
    team: i8,
    stats: MobStats,
    speed: f64,
    fly_speed: f64,
    phobj: PhysicsObject,
    stance: MobStance,
    flip: bool,
    stance_elapsed_ms: u32,
    fly_direction: FlyDirection,
    control: bool,
    aggro: bool,
    active: bool,
    dying: bool,
    dead: bool,
    fading: bool,
    fade_in: bool,
    opacity: f32,
    /// Set by a landed knockback, cleared when its HIT window resolves or a
    /// new attack is calculated.
    await_death: bool,
    counter: u16,
    hp_percent: i8,
    hp_visible_ms: i64,
    name_color: NameColor,
    next_move_id: i16,
    replay: VecDeque<Movement>,
    replay_elapsed_ms: i64,
    cues: Vec<Cue>,
    outbox: Vec<MobMovement>,
    tuning: MobTuning,
    timestep: u16,
}

impl Mob {
    pub fn new(
        spawn: &MobSpawn,
        stats: MobStats,
        tuning: MobTuning,
        timestep: u16,
        rng: &mut impl Rng,
    ) -> Self {
        let mut phobj = PhysicsObject::new(spawn.position);
        phobj.fh_id = spawn.fh;
        phobj.turn_at_edges = true;
        if stats.can_fly {
            phobj.kind = PhysicsKind::Flying;
        }

        let (stance, flip) = MobStance::decode(spawn.stance);
        let mut mob = Mob {
            oid: spawn.oid,
            mob_id: spawn.mob_id,
            team: spawn.team,
            speed: (f64::from(stats.speed) + 100.0) * 0.001,
            fly_speed: (f64::from(stats.fly_speed) + 100.0) * 0.0005,
            stats,
            phobj,
            stance,
            flip,
            stance_elapsed_ms: 0,
            fly_direction: FlyDirection::Straight,
            control: false,
            aggro: false,
            active: true,
            dying: false,
            dead: false,
            fading: false,
            fade_in: spawn.new_spawn,
            opacity: if spawn.new_spawn { 0.0 } else { 1.0 },
            await_death: false,
            counter: 0,
            hp_percent: 0,
            hp_visible_ms: 0,
            name_color: NameColor::Normal,
            next_move_id: 0,
            replay: VecDeque::new(),
            replay_elapsed_ms: 0,
            cues: Vec::new(),
            outbox: Vec::new(),
            tuning,
            timestep,
        };
        mob.set_control(spawn.mode);
        if mob.control && mob.stance == MobStance::Stand {
            mob.next_move(rng);
        }
        mob
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    pub fn update(&mut self, physics: &Physics, rng: &mut impl Rng) {
        if !self.active {
            return;
        }

        let animation_end = self.advance_stance_clock();
        if animation_end && self.stance == MobStance::Die {
            self.dead = true;
        }

        if self.fading {
            self.opacity -= self.tuning.fade_step;
            if self.opacity <= 0.0 {
                self.opacity = 0.0;
                self.fading = false;
                self.dead = true;
            }
        } else if self.fade_in {
            self.opacity += self.tuning.fade_step;
            if self.opacity >= 1.0 {
                self.opacity = 1.0;
                self.fade_in = false;
            }
        }

        if self.dead {
            self.active = false;
            debug!(oid = self.oid, mob_id = self.mob_id, "mob left play");
            return;
        }

        self.hp_visible_ms = (self.hp_visible_ms - i64::from(self.timestep)).max(0);

        if self.dying {
            self.phobj.normalize();
            if self.stance != MobStance::Die {
                if self.await_death {
                    // Let the knockback window run out first.
                    self.counter = self.counter.saturating_add(1);
                    if self.counter > self.tuning.hit_window {
                        self.apply_death();
                    }
                } else if animation_end && !self.fading {
                    self.apply_death();
                }
            }
            return;
        }

        if !self.control {
            self.replay_movement();
            return;
        }

        if !self.phobj.turn_at_edges {
            self.flip = !self.flip;
            self.phobj.turn_at_edges = true;
            if self.stance == MobStance::Hit {
                self.set_stance(MobStance::Stand);
            }
        }

        self.apply_stance_forces();
        physics.move_object(&mut self.phobj);

        self.counter = self.counter.saturating_add(1);
        let next = match self.stance {
            MobStance::Hit => self.counter > self.tuning.hit_window,
            MobStance::Jump => self.phobj.on_ground,
            _ => animation_end && self.counter > self.tuning.hit_window,
        };
        if next {
            if self.stance == MobStance::Hit {
                self.await_death = false;
            }
            self.next_move(rng);
            self.update_movement();
            self.counter = 0;
        }
    }

    fn advance_stance_clock(&mut self) -> bool {
        let length = self.stance_length().max(1);
        self.stance_elapsed_ms += u32::from(self.timestep);
        if self.stance_elapsed_ms >= length {
            self.stance_elapsed_ms -= length;
            true
        } else {
            false
        }
    }

    fn stance_length(&self) -> u32 {
        let t = &self.stats.timings;
        match self.stance {
            MobStance::Move => t.move_ms,
            MobStance::Stand => t.stand_ms,
            MobStance::Jump => t.jump_ms,
            MobStance::Hit => t.hit_ms,
            MobStance::Die => t.die_ms,
        }
    }

    fn apply_stance_forces(&mut self) {
        match self.stance {
            MobStance::Move => {
                if self.stats.can_fly {
                    self.phobj.h_force = if self.flip { self.fly_speed } else { -self.fly_speed };
                    self.phobj.v_force = match self.fly_direction {
                        FlyDirection::Straight => 0.0,
                        FlyDirection::Upwards => -self.fly_speed,
                        FlyDirection::Downwards => self.fly_speed,
                    };
                } else {
                    self.phobj.h_force = if self.flip { self.speed } else { -self.speed };
                }
            }
            MobStance::Hit => {
                if self.stats.can_move {
                    let force = if self.phobj.on_ground { 0.2 } else { 0.1 };
                    self.phobj.h_force = if self.flip { -force } else { force };
                }
            }
            MobStance::Jump => self.phobj.v_force = -5.0,
            MobStance::Stand | MobStance::Die => {}
        }
    }

    fn next_move(&mut self, rng: &mut impl Rng) {
        if !self.stats.can_move {
            self.set_stance(MobStance::Stand);
            return;
        }

        match self.stance {
            MobStance::Hit | MobStance::Stand => {
                self.set_stance(MobStance::Move);
                self.flip = rng.random_range(0..2) == 1;
            }
            MobStance::Move | MobStance::Jump => {
                let jump = self.stats.can_jump
                    && self.phobj.on_ground
                    && rng.random::<f32>() < self.tuning.jump_chance;
                if jump {
                    self.set_stance(MobStance::Jump);
                } else {
                    match rng.random_range(0..3) {
                        0 => self.set_stance(MobStance::Stand),
                        1 => {
                            self.set_stance(MobStance::Move);
                            self.flip = false;
                        }
                        _ => {
                            self.set_stance(MobStance::Move);
                            self.flip = true;
                        }
                    }
                }
            }
            MobStance::Die => {}
        }

        if self.stance == MobStance::Move && self.stats.can_fly {
            self.fly_direction = match rng.random_range(0..3) {
                0 => FlyDirection::Straight,
                1 => FlyDirection::Upwards,
                _ => FlyDirection::Downwards,
            };
        }
        trace!(oid = self.oid, stance = ?self.stance, flip = self.flip, "mob next move");
    }

    fn replay_movement(&mut self) {
        self.phobj.normalize();
        if self.replay.is_empty() {
            return;
        }
        self.replay_elapsed_ms += i64::from(self.timestep);
        while let Some(next) = self.replay.front().copied() {
            if self.replay_elapsed_ms < i64::from(next.duration) {
                break;
            }
            self.replay_elapsed_ms -= i64::from(next.duration.max(0));
            self.replay.pop_front();
            self.phobj.set_position(Point::new(next.x, next.y));
            self.phobj.fh_id = next.fh;
            self.set_stance_byte(next.stance);
        }
    }

    fn set_stance(&mut self, stance: MobStance) {
        if self.stance != stance {
            self.stance = stance;
            self.stance_elapsed_ms = 0;
        }
    }

    fn set_stance_byte(&mut self, byte: u8) {
        let (stance, flip) = MobStance::decode(byte);
        self.flip = flip;
        self.set_stance(stance);
    }

    /// Queue a movement report with the current state.
    fn update_movement(&mut self) {
        self.next_move_id = self.next_move_id.wrapping_add(1);
        let position = self.position();
        self.outbox.push(MobMovement {
            oid: self.oid,
            move_id: self.next_move_id,
            start: self.phobj.last_position(),
            movement: Movement {
                command: 0,
                x: position.x,
                y: position.y,
                vx: self.phobj.hspeed.round() as i16,
                vy: self.phobj.vspeed.round() as i16,
                fh: self.phobj.fh_id,
                stance: self.stance.value_of(self.flip),
                duration: self.timestep as i16,
            },
        });
    }

    fn apply_death(&mut self) {
        self.set_stance(MobStance::Die);
        self.dying = true;
        self.cues.push(Cue::Sound(format!("Mob/{:07}/Die", self.mob_id)));
        debug!(oid = self.oid, mob_id = self.mob_id, "mob dies");
    }

    // -----------------------------------------------------------------------
    // Server events
    // -----------------------------------------------------------------------

    /// 0 observed, 1 controlled, 2 controlled and aggressive.
    pub fn set_control(&mut self, mode: i8) {
        self.control = mode > 0;
        self.aggro = mode == 2;
    }

    /// Bring a known mob back into play on respawn.
    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn kill(&mut self, kill_type: KillType) {
        match kill_type {
            KillType::Deactivate => self.active = false,
            KillType::Animated => self.begin_dying(),
            KillType::Fade => {
                self.begin_dying();
                self.fading = true;
            }
        }
        debug!(oid = self.oid, ?kill_type, await_death = self.await_death, "mob killed");
    }

    fn begin_dying(&mut self) {
        if self.dying {
            return;
        }
        self.dying = true;
        if !self.await_death {
            self.counter = 0;
        }
    }

    /// Movement relayed for a mob another client controls.
    pub fn send_movement(&mut self, start: Point, movements: Vec<Movement>) {
        if self.control {
            return;
        }
        self.phobj.set_position(start);
        self.replay = movements.into();
        self.replay_elapsed_ms = 0;
    }

    pub fn show_hp(&mut self, percent: i8, player_level: u16) {
        if self.hp_percent == 0 {
            let delta = i32::from(player_level) - i32::from(self.stats.level);
            self.name_color = if delta > 9 {
                NameColor::Weaker
            } else if delta < -9 {
                NameColor::Stronger
            } else {
                NameColor::Normal
            };
        }
        self.hp_percent = percent.clamp(0, 100);
        self.hp_visible_ms = self.tuning.hp_display_ms;
    }

    pub fn show_cue(&mut self, cue: Cue) {
        if self.active {
            self.cues.push(cue);
        }
    }

    // -----------------------------------------------------------------------
    // Combat
    // -----------------------------------------------------------------------

    pub fn defender_stats(&self) -> DefenderStats {
        DefenderStats {
            level: self.stats.level,
            wdef: self.stats.wdef,
            mdef: self.stats.mdef,
            avoid: self.stats.avoid,
        }
    }

    /// Resolve every hit of `attack` on this mob.
    pub fn calculate_damage(
        &mut self,
        attack: &Attack,
        rng: &mut impl Rng,
        tuning: &CombatTuning,
    ) -> Vec<DamageLine> {
        let lines = damage::calculate_damage(rng, attack, &self.defender_stats(), tuning);
        self.update_movement();
        self.await_death = false;
        lines
    }

    /// A scheduled hit lands.
    pub fn apply_damage(&mut self, damage: i32, to_left: bool) {
        self.cues.push(Cue::Sound(format!("Mob/{:07}/Damage", self.mob_id)));

        if self.dying && self.stance != MobStance::Die {
            if !self.await_death {
                self.apply_death();
            }
        } else if self.control
            && self.is_alive()
            && damage > 0
            && damage >= i32::from(self.stats.knockback)
        {
            self.flip = to_left;
            self.counter = self.tuning.knockback_counter;
            self.set_stance(MobStance::Hit);
            self.update_movement();
            self.await_death = true;
        }
    }

    /// Body-contact attack, or an invalid attack for harmless mobs.
    pub fn create_touch_attack(&self, rng: &mut impl Rng) -> MobAttack {
        if !self.stats.touch_damage {
            return MobAttack::default();
        }
        let max = i32::from(self.stats.watk);
        let min = (max as f32 * 0.8) as i32;
        let watk = if min >= max { min } else { rng.random_range(min..max) };
        MobAttack::touch(watk, self.position(), self.mob_id, self.oid)
    }

    pub fn is_in_range(&self, range: &Rect) -> bool {
        self.active && self.stats.bounds.shifted(self.position()).overlaps(range)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn oid(&self) -> i32 {
        self.oid
    }

    pub fn mob_id(&self) -> i32 {
        self.mob_id
    }

    pub fn team(&self) -> i8 {
        self.team
    }

    pub fn level(&self) -> u16 {
        self.stats.level
    }

    pub fn stats(&self) -> &MobStats {
        &self.stats
    }

    pub fn position(&self) -> Point {
        self.phobj.position()
    }

    pub fn head_position(&self) -> Point {
        let mut head = self.stats.head;
        if self.flip && !self.stats.no_flip {
            head.x = -head.x;
        }
        self.position() + head
    }

    pub fn stance(&self) -> MobStance {
        self.stance
    }

    pub fn flip(&self) -> bool {
        self.flip
    }

    pub fn is_controlled(&self) -> bool {
        self.control
    }

    pub fn is_aggressive(&self) -> bool {
        self.aggro
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Active and not on its way out.
    pub fn is_alive(&self) -> bool {
        self.active && !self.dying
    }

    pub fn is_dying(&self) -> bool {
        self.dying
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Scheduled hits may still land, including the killing blow.
    pub fn accepts_damage(&self) -> bool {
        self.active && !self.dead
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn hp_percent(&self) -> i8 {
        self.hp_percent
    }

    pub fn is_hp_visible(&self) -> bool {
        self.hp_visible_ms > 0
    }

    pub fn name_color(&self) -> NameColor {
        self.name_color
    }

    pub fn take_cues(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.cues)
    }

    pub fn take_movements(&mut self) -> Vec<MobMovement> {
        std::mem::take(&mut self.outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn make_test_stats() -> MobStats {
        MobStats {
            name: "Snail".into(),
            level: 40,
            watk: 100,
            wdef: 100,
            avoid: 50,
            knockback: 50,
            ..Default::default()
        }
    }

    fn make_test_mob(mode: i8) -> Mob {
        let spawn = MobSpawn {
            oid: 1000,
            mob_id: 100100,
            mode,
            stance: 5,
            fh: 1,
            new_spawn: false,
            team: -1,
            position: Point::new(0, 0),
        };
        let mut rng = StdRng::seed_from_u64(9);
        Mob::new(&spawn, make_test_stats(), MobTuning::default(), 8, &mut rng)
    }

    fn die_cues(mob: &mut Mob) -> usize {
        mob.take_cues()
            .iter()
            .filter(|c| matches!(c, Cue::Sound(s) if s.ends_with("/Die")))
            .count()
    }

    #[test]
    fn test_stance_bytes() {
        assert_eq!(MobStance::Hit.value_of(true), 8);
        assert_eq!(MobStance::Hit.value_of(false), 9);
        assert_eq!(MobStance::decode(9), (MobStance::Hit, false));
        assert_eq!(MobStance::decode(4), (MobStance::Stand, true));
        assert_eq!(MobStance::decode(0), (MobStance::Move, true));
        assert_eq!(MobStance::decode(13), (MobStance::Move, false));
    }

    #[test]
    fn test_controlled_spawn_starts_moving() {
        let mob = make_test_mob(1);
        assert_eq!(mob.stance(), MobStance::Move);
        let observed = make_test_mob(0);
        assert_eq!(observed.stance(), MobStance::Stand);
        assert!(!observed.flip());
    }

    #[test]
    fn test_knockback_threshold() {
        let mut mob = make_test_mob(1);
        mob.apply_damage(49, true);
        assert_ne!(mob.stance(), MobStance::Hit);

        mob.apply_damage(50, true);
        assert_eq!(mob.stance(), MobStance::Hit);
        assert!(mob.flip());
        assert!(mob.await_death);
    }

    #[test]
    fn test_miss_never_knocks_back() {
        let mut mob = make_test_mob(1);
        mob.stats.knockback = 0;
        mob.apply_damage(0, true);
        assert_ne!(mob.stance(), MobStance::Hit);
    }

    #[test]
    fn test_observed_mob_not_knocked_back() {
        let mut mob = make_test_mob(0);
        mob.apply_damage(500, true);
        assert_eq!(mob.stance(), MobStance::Stand);
    }

    #[test]
    fn test_hit_window_resolves() {
        let physics = Physics::flat(-1000, 1000, 0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut mob = make_test_mob(1);
        mob.apply_damage(500, false);
        mob.take_movements();

        // counter starts at 170, resolves once it passes 200
        for _ in 0..30 {
            mob.update(&physics, &mut rng);
            assert_eq!(mob.stance(), MobStance::Hit);
        }
        mob.update(&physics, &mut rng);
        assert_eq!(mob.stance(), MobStance::Move);
        assert!(!mob.await_death);
        assert_eq!(mob.take_movements().len(), 1);
    }

    #[test]
    fn test_kill_during_knockback_waits_for_window() {
        let physics = Physics::flat(-1000, 1000, 0);
        let mut rng = StdRng::seed_from_u64(2);
        let mut mob = make_test_mob(1);
        mob.apply_damage(500, false);
        mob.kill(KillType::Animated);

        assert!(mob.is_dying());
        assert!(mob.accepts_damage());
        for _ in 0..30 {
            mob.update(&physics, &mut rng);
            assert_eq!(mob.stance(), MobStance::Hit);
        }
        // a late hit during the window does not cut it short
        mob.apply_damage(500, false);
        assert_eq!(mob.stance(), MobStance::Hit);

        mob.update(&physics, &mut rng);
        assert_eq!(mob.stance(), MobStance::Die);

        for _ in 0..200 {
            mob.update(&physics, &mut rng);
        }
        assert_eq!(die_cues(&mut mob), 1);
        assert!(mob.is_dead());
        assert!(!mob.is_active());
        assert!(!mob.accepts_damage());
    }

    #[test]
    fn test_kill_then_final_blow_dies_at_once() {
        let mut mob = make_test_mob(1);
        mob.kill(KillType::Animated);
        assert_ne!(mob.stance(), MobStance::Die);
        mob.apply_damage(10, true);
        assert_eq!(mob.stance(), MobStance::Die);
        mob.apply_damage(10, true);
        assert_eq!(die_cues(&mut mob), 1);
    }

    #[test]
    fn test_kill_without_final_blow_still_dies() {
        let physics = Physics::flat(-1000, 1000, 0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut mob = make_test_mob(1);
        mob.kill(KillType::Animated);
        let cycle = (mob.stance_length() / 8) as usize;

        for _ in 0..cycle - 1 {
            mob.update(&physics, &mut rng);
        }
        assert!(mob.is_dying());
        assert_ne!(mob.stance(), MobStance::Die);

        // DIE starts on the tick the current cycle wraps.
        mob.update(&physics, &mut rng);
        assert_eq!(mob.stance(), MobStance::Die);
        assert_eq!(die_cues(&mut mob), 1);
    }

    #[test]
    fn test_deactivate_stops_damage() {
        let mut mob = make_test_mob(1);
        mob.kill(KillType::Deactivate);
        assert!(!mob.is_active());
        assert!(!mob.accepts_damage());
    }

    #[test]
    fn test_fade_kill_goes_transparent() {
        let physics = Physics::flat(-1000, 1000, 0);
        let mut rng = StdRng::seed_from_u64(4);
        let mut mob = make_test_mob(1);
        mob.kill(KillType::Fade);
        for _ in 0..60 {
            mob.update(&physics, &mut rng);
        }
        assert_eq!(mob.opacity(), 0.0);
        assert!(!mob.is_active());
    }

    #[test]
    fn test_calculate_damage_reports_movement() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut mob = make_test_mob(1);
        mob.apply_damage(500, true);
        mob.take_movements();
        let attack = Attack {
            min_damage: 300.0,
            max_damage: 400.0,
            accuracy: 500,
            player_level: 50,
            hit_count: 3,
            ..Default::default()
        };
        let lines = mob.calculate_damage(&attack, &mut rng, &CombatTuning::default());
        assert_eq!(lines.len(), 3);
        assert!(!mob.await_death);
        let moves = mob.take_movements();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].movement.stance, MobStance::Hit.value_of(true));
    }

    #[test]
    fn test_touch_attack_range() {
        let mut rng = StdRng::seed_from_u64(6);
        let mob = make_test_mob(1);
        for _ in 0..50 {
            let attack = mob.create_touch_attack(&mut rng);
            assert!(attack.is_valid());
            assert!(attack.watk >= 80 && attack.watk < 100);
        }
    }

    #[test]
    fn test_show_hp_clamps_and_colors() {
        let mut mob = make_test_mob(1);
        mob.show_hp(120, 10);
        assert_eq!(mob.hp_percent(), 100);
        assert_eq!(mob.name_color(), NameColor::Stronger);
        assert!(mob.is_hp_visible());
    }

    #[test]
    fn test_observed_mob_replays_movement() {
        let physics = Physics::flat(-1000, 1000, 0);
        let mut rng = StdRng::seed_from_u64(7);
        let mut mob = make_test_mob(0);
        mob.send_movement(
            Point::new(10, 0),
            vec![Movement { x: 40, y: 0, fh: 1, stance: 3, duration: 16, ..Default::default() }],
        );
        assert_eq!(mob.position(), Point::new(10, 0));
        mob.update(&physics, &mut rng);
        assert_eq!(mob.position(), Point::new(10, 0));
        mob.update(&physics, &mut rng);
        assert_eq!(mob.position(), Point::new(40, 0));
        assert_eq!(mob.stance(), MobStance::Move);
        assert!(!mob.flip());
    }

    #[test]
    fn test_in_range_uses_bounds() {
        let mob = make_test_mob(1);
        assert!(mob.is_in_range(&Rect::new(20, 100, -50, 50)));
        assert!(!mob.is_in_range(&Rect::new(30, 100, -50, 50)));
    }
}
