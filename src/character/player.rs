//! The local player.
//!
//! Move validation order (first failure wins):
//!   1. Skill while prone -> Other
//!   2. Attack while on a ladder or rope -> Other
//!   3. Skill cooldown running -> Cooldown
//!   4. The move's own checks (weapon, HP, MP, ammo, job)
//!
//! Attack preparation picks the attack type from the weapon. Projectile
//! weapons without ammo, magic weapons without a skill, and any attack
//! from a prone stance become a "degenerate" CLOSE attack at a tenth of
//! the damage.

use std::collections::HashMap;

use rand::{Rng, RngExt};
use tracing::debug;

use crate::character::stats::{BaseStats, CharStats, StatBonus};
use crate::character::weapon::{Weapon, WeaponType};
use crate::character::{Char, CharCore, CharState};
use crate::combat::attack::{Attack, AttackType, MobAttack, MobAttackResult};
use crate::combat::special_move::{ForbidReason, SpecialMove, UseContext};
use crate::config::PlayerTuning;
use crate::world::geometry::{Point, Rect};
use crate::world::physics::Physics;

const DEGENERATE_DIVISOR: i32 = 10;
const KNOCKBACK_SPEED: f64 = 1.5;
const KNOCKBACK_LIFT: f64 = 3.5;

/// Remaining cooldown per skill, in milliseconds.
#[derive(Debug, Clone, Default)]
pub struct SkillCooldowns {
    pub cooldowns: HashMap<i32, i64>,
}

impl SkillCooldowns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self, skill_id: i32) -> bool {
        self.remaining(skill_id) <= 0
    }

    pub fn remaining(&self, skill_id: i32) -> i64 {
        self.cooldowns.get(&skill_id).copied().unwrap_or(0)
    }

    pub fn set_cooldown(&mut self, skill_id: i32, ms: i64) {
        self.cooldowns.insert(skill_id, ms);
    }

    /// Count every cooldown down by `elapsed_ms`, dropping finished ones.
    pub fn tick(&mut self, elapsed_ms: i64) {
        self.cooldowns.retain(|_, left| {
            *left -= elapsed_ms;
            *left > 0
        });
    }
}

/// Loaded projectiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ammo {
    pub bullet_id: i32,
    pub count: u16,
}

impl Ammo {
    pub fn is_loaded(&self) -> bool {
        self.bullet_id != 0 && self.count > 0
    }
}

pub struct Player {
    core: CharCore,
    stats: CharStats,
    weapon: Option<Weapon>,
    equip_bonus: StatBonus,
    ammo: Ammo,
    cooldowns: SkillCooldowns,
    invincible_ms: i64,
    tuning: PlayerTuning,
    timestep: u16,
}

impl Player {
    pub fn new(
        oid: i32,
        base: BaseStats,
        position: Point,
        tuning: PlayerTuning,
        timestep: u16,
    ) -> Self {
        Player {
            core: CharCore::new(oid, base.level, position, tuning),
            stats: CharStats::new(base),
            weapon: None,
            equip_bonus: StatBonus::default(),
            ammo: Ammo::default(),
            cooldowns: SkillCooldowns::new(),
            invincible_ms: 0,
            tuning,
            timestep,
        }
    }

    // -----------------------------------------------------------------------
    // Equipment and stats
    // -----------------------------------------------------------------------

    pub fn equip_weapon(&mut self, weapon: Weapon) {
        self.weapon = Some(weapon);
        self.recalculate();
    }

    pub fn unequip_weapon(&mut self) {
        self.weapon = None;
        self.recalculate();
    }

    /// Sum of every non-weapon equipment bonus.
    pub fn set_equip_bonus(&mut self, bonus: StatBonus) {
        self.equip_bonus = bonus;
        self.recalculate();
    }

    pub fn set_ammo(&mut self, bullet_id: i32, count: u16) {
        self.ammo = Ammo { bullet_id, count };
    }

    /// Rebuild derived stats after equipment or stat changes.
    pub fn recalculate(&mut self) {
        let weapon_type = self.weapon.map_or(WeaponType::None, |w| w.weapon_type());
        let weapon_bonus = StatBonus {
            watk: self.weapon.map_or(0, |w| w.watk),
            ..Default::default()
        };
        self.stats
            .recalculate(weapon_type, [&self.equip_bonus, &weapon_bonus]);

        let two_handed = self.weapon.is_some_and(|w| w.two_handed);
        let speed = self
            .weapon
            .map_or(0, |w| i8::try_from(w.speed).unwrap_or(i8::MAX))
            .saturating_add(self.stats.attack_speed());
        self.core.set_weapon(weapon_type, two_handed, speed);
    }

    pub fn change_skill(&mut self, skill_id: i32, level: i32) {
        self.core.set_skill_level(skill_id, level);
    }

    pub fn stats(&self) -> &CharStats {
        &self.stats
    }

    /// Call `recalculate` after changing anything derived stats depend on.
    pub fn stats_mut(&mut self) -> &mut CharStats {
        &mut self.stats
    }

    pub fn weapon(&self) -> Option<&Weapon> {
        self.weapon.as_ref()
    }

    pub fn ammo(&self) -> Ammo {
        self.ammo
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Free to start an attack at all.
    pub fn can_attack(&self) -> bool {
        let state = self.core.state();
        !self.core.is_attacking()
            && !state.is_climbing()
            && state != CharState::Sit
            && self.weapon.is_some()
    }

    pub fn use_context(&self, skill_id: i32) -> UseContext {
        UseContext {
            level: self.skill_level(skill_id),
            weapon: self.stats.weapon_type(),
            job: self.stats.job(),
            hp: self.stats.hp(),
            mp: self.stats.mp(),
            bullets: if self.ammo.bullet_id != 0 { self.ammo.count } else { 0 },
        }
    }

    pub fn can_use(&self, special_move: &dyn SpecialMove) -> Result<(), ForbidReason> {
        let state = self.core.state();
        if special_move.is_skill() && state == CharState::Prone {
            return Err(ForbidReason::Other);
        }
        if special_move.is_attack() && state.is_climbing() {
            return Err(ForbidReason::Other);
        }
        if self.has_cooldown(special_move.id()) {
            return Err(ForbidReason::Cooldown);
        }
        special_move.can_use(&self.use_context(special_move.id()))
    }

    pub fn has_cooldown(&self, skill_id: i32) -> bool {
        !self.cooldowns.is_ready(skill_id)
    }

    pub fn add_cooldown(&mut self, skill_id: i32, ms: i64) {
        self.cooldowns.set_cooldown(skill_id, ms);
    }

    pub fn cooldowns(&self) -> &SkillCooldowns {
        &self.cooldowns
    }

    // -----------------------------------------------------------------------
    // Combat
    // -----------------------------------------------------------------------

    /// Base attack from the player's stats and weapon, before the move's
    /// own stats are applied.
    pub fn prepare_attack(&self, skill: bool) -> Attack {
        let weapon_type = self.stats.weapon_type();
        let prone = self.core.state() == CharState::Prone;

        let (attack_type, degenerate) = if prone {
            (AttackType::Close, true)
        } else if weapon_type.uses_ammo() {
            if self.ammo.is_loaded() {
                (AttackType::Ranged, false)
            } else {
                (AttackType::Close, true)
            }
        } else if weapon_type.is_magic() {
            if skill {
                (AttackType::Magic, false)
            } else {
                (AttackType::Close, true)
            }
        } else {
            (AttackType::Close, false)
        };

        let (mut min_damage, mut max_damage) = (self.stats.min_damage(), self.stats.max_damage());
        if degenerate {
            min_damage /= DEGENERATE_DIVISOR;
            max_damage /= DEGENERATE_DIVISOR;
        }

        Attack {
            attack_type,
            min_damage: f64::from(min_damage),
            max_damage: f64::from(max_damage),
            critical: self.stats.critical(),
            ignore_def: self.stats.ignore_def(),
            accuracy: self.stats.accuracy(),
            player_level: i16::try_from(self.stats.level()).unwrap_or(i16::MAX),
            range: self.stats.range(),
            bullet: if attack_type == AttackType::Ranged { self.ammo.bullet_id } else { 0 },
            origin: self.position(),
            to_left: !self.flip(),
            speed: u8::try_from(self.integer_attack_speed()).unwrap_or(0),
            ..Default::default()
        }
    }

    /// Dash so the player arrives at `target_x` as the first hit lands.
    pub fn rush(&mut self, target_x: i16) {
        let delay = self.attack_delay(1);
        self.core
            .phobj
            .move_x_until(f64::from(target_x), delay, self.timestep);
    }

    /// Take a hit from a mob.
    pub fn damage(&mut self, attack: &MobAttack, rng: &mut impl Rng) -> MobAttackResult {
        let damage = self.stats.calculate_damage(attack.watk);
        self.show_damage(damage);

        let from_left = f64::from(attack.origin.x) > self.core.phobj.x;
        let state = self.core.state();
        let immovable = state.is_climbing() || state == CharState::Died;
        if damage > 0 && !immovable && rng.random::<f32>() > self.stats.stance() {
            self.core.phobj.hspeed = if from_left { -KNOCKBACK_SPEED } else { KNOCKBACK_SPEED };
            self.core.phobj.v_force -= KNOCKBACK_LIFT;
        }
        self.invincible_ms = self.tuning.invincible_ms;

        debug!(damage, mob_oid = attack.oid, "player took damage");
        MobAttackResult::new(attack, damage, if from_left { 0 } else { 1 })
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible_ms > 0
    }

    /// Body rectangle swept since the previous tick.
    pub fn touch_area(&self) -> Rect {
        let now = self.core.phobj.position();
        let last = self.core.phobj.last_position();
        Rect::new(
            now.x.min(last.x),
            now.x.max(last.x),
            now.y.min(last.y).saturating_sub(50),
            now.y.max(last.y),
        )
    }

    // -----------------------------------------------------------------------
    // Movement and tick
    // -----------------------------------------------------------------------

    pub fn state(&self) -> CharState {
        self.core.state()
    }

    /// Change stance, unless mid-attack.
    pub fn set_state(&mut self, state: CharState) {
        if !self.core.is_attacking() {
            self.core.set_state(state);
        }
    }

    /// Turn around, unless mid-attack.
    pub fn set_direction(&mut self, facing_right: bool) {
        if !self.core.is_attacking() {
            self.core.set_flip(facing_right);
        }
    }

    pub fn update(&mut self, physics: &Physics) {
        let step = i64::from(self.timestep);
        self.cooldowns.tick(step);
        self.invincible_ms = (self.invincible_ms - step).max(0);
        self.core.update(self.timestep);
        physics.move_object(&mut self.core.phobj);
    }
}

impl Char for Player {
    fn core(&self) -> &CharCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CharCore {
        &mut self.core
    }
}
