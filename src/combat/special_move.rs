//! Moves a character can perform: the regular attack and skills.
//!
//! Validation order for a skill (first failure wins):
//!   1. Level: unlearned or beyond the data -> Other
//!   2. Weapon: required weapon not equipped -> WeaponType
//!   3. HP cost -> HpCost
//!   4. MP cost -> MpCost
//!   5. Ammunition for projectile skills -> BulletCost
//!   6. Job branch does not own the skill -> Other
//!
//! Skill data is plain configuration loaded from TOML, see `SkillTable`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::character::job::Job;
use crate::character::stats::CharStats;
use crate::character::weapon::WeaponType;
use crate::character::Char;
use crate::combat::attack::{Attack, AttackType, AttackUser, DamageType, MAX_ATTACK_COUNT};
use crate::combat::effects::Cue;
use crate::combat::skill_action::{HitEffect, SkillAction, SkillSound};
use crate::config::ConfigError;
use crate::world::geometry::Rect;
use crate::world::mob::Mob;

// ===========================================================================
// Validation
// ===========================================================================

/// Why a move was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ForbidReason {
    #[error("wrong weapon type")]
    WeaponType,
    #[error("not enough HP")]
    HpCost,
    #[error("not enough MP")]
    MpCost,
    #[error("not enough ammunition")]
    BulletCost,
    #[error("skill is on cooldown")]
    Cooldown,
    #[error("move cannot be used now")]
    Other,
    /// The character is still busy with another attack.
    #[error("character is busy")]
    Busy,
}

impl ForbidReason {
    /// Chat message shown to the player, if the reason has one.
    pub fn message(self, weapon: WeaponType) -> Option<String> {
        let text = match self {
            ForbidReason::WeaponType => "You cannot use this skill with this weapon.".to_string(),
            ForbidReason::HpCost => "You do not have enough HP to use this skill.".to_string(),
            ForbidReason::MpCost => "You do not have enough MP to use this skill.".to_string(),
            ForbidReason::BulletCost => {
                format!("You will need more {} to use this skill.", weapon.ammo_name())
            }
            ForbidReason::Cooldown => "You cannot use this skill as it is on cooldown.".to_string(),
            ForbidReason::Other | ForbidReason::Busy => return None,
        };
        Some(text)
    }
}

/// The user's resources at the moment a move is attempted.
#[derive(Debug, Clone, Copy)]
pub struct UseContext {
    pub level: i32,
    pub weapon: WeaponType,
    pub job: Job,
    pub hp: u16,
    pub mp: u16,
    pub bullets: u16,
}

// ===========================================================================
// Move interface
// ===========================================================================

/// A move the combat orchestrator can execute or replay.
pub trait SpecialMove {
    /// 0 for the regular attack.
    fn id(&self) -> i32;
    fn is_attack(&self) -> bool;

    fn is_skill(&self) -> bool {
        self.id() != 0
    }

    fn can_use(&self, ctx: &UseContext) -> Result<(), ForbidReason>;
    fn apply_use_effects(&self, user: &mut dyn Char);
    fn apply_actions(&self, user: &mut dyn Char, attack_type: AttackType);
    fn apply_stats(&self, user: &dyn Char, stats: &CharStats, attack: &mut Attack);
    fn apply_hit_effects(&self, user: &AttackUser, target: &mut Mob);

    /// Projectile animation for a shot with `bullet_id` ammunition.
    fn bullet(&self, user: &dyn Char, bullet_id: i32) -> i32;

    fn cooltime_ms(&self, _level: i32) -> i64 {
        0
    }
}

// ===========================================================================
// Regular attack
// ===========================================================================

/// Plain weapon attack, move id 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegularAttack;

impl SpecialMove for RegularAttack {
    fn id(&self) -> i32 {
        0
    }

    fn is_attack(&self) -> bool {
        true
    }

    fn can_use(&self, ctx: &UseContext) -> Result<(), ForbidReason> {
        match ctx.weapon {
            WeaponType::None => Err(ForbidReason::WeaponType),
            _ => Ok(()),
        }
    }

    fn apply_use_effects(&self, user: &mut dyn Char) {
        let weapon = user.weapon_type();
        user.show_cue(Cue::Sound(format!("Weapon/{}/Attack", weapon.name())));
    }

    fn apply_actions(&self, user: &mut dyn Char, attack_type: AttackType) {
        SkillAction::Regular.apply(user, attack_type, 0);
    }

    fn apply_stats(&self, _user: &dyn Char, _stats: &CharStats, attack: &mut Attack) {
        attack.damage_type = DamageType::Weapon;
        attack.skill = 0;
        attack.hit_count = 1;
        attack.mob_count = 1;
        attack.bullet_count = 1;
    }

    fn apply_hit_effects(&self, _user: &AttackUser, _target: &mut Mob) {}

    fn bullet(&self, _user: &dyn Char, bullet_id: i32) -> i32 {
        bullet_id
    }
}

// ===========================================================================
// Skills
// ===========================================================================

/// Per-level numbers of a skill.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SkillStats {
    pub level: i32,
    /// Multiplier on the weapon damage window.
    pub damage: f64,
    /// Spell attack; > 0 makes the skill use the magic formula.
    pub matk: i32,
    /// > 0 makes the skill deal exactly this much per hit.
    pub fix_damage: i32,
    pub attack_count: u8,
    pub mob_count: u8,
    pub bullet_count: u8,
    pub bullet_cost: u16,
    pub hp_cost: u16,
    pub mp_cost: u16,
    pub critical: f32,
    pub ignore_def: f32,
    pub h_range: f32,
    pub range: Option<Rect>,
    pub cooltime_ms: i64,
}

impl Default for SkillStats {
    fn default() -> Self {
        SkillStats {
            level: 1,
            damage: 1.0,
            matk: 0,
            fix_damage: 0,
            attack_count: 1,
            mob_count: 1,
            bullet_count: 1,
            bullet_cost: 0,
            hp_cost: 0,
            mp_cost: 0,
            critical: 0.0,
            ignore_def: 0.0,
            h_range: 1.0,
            range: None,
            cooltime_ms: 0,
        }
    }
}

/// Static description of one skill.
#[derive(Debug, Clone, Deserialize)]
pub struct SkillData {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub attack: bool,
    #[serde(default)]
    pub passive: bool,
    /// Consumes ammunition when used with a ranged weapon.
    #[serde(default)]
    pub projectile: bool,
    #[serde(default)]
    pub required_weapon: Option<WeaponType>,
    #[serde(default)]
    pub action: SkillAction,
    pub sound: Option<SkillSound>,
    #[serde(default)]
    pub hit_effect: HitEffect,
    pub use_effect: Option<String>,
    /// Projectile animation replacing the ammunition's own.
    #[serde(default)]
    pub bullet: i32,
    #[serde(default)]
    pub levels: Vec<SkillStats>,
}

/// Skill data file: a list of `[[skill]]` tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkillTable {
    #[serde(default, rename = "skill")]
    pub skills: Vec<SkillData>,
}

impl SkillTable {
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

#[derive(Debug, Clone)]
pub struct Skill {
    data: SkillData,
    sound: SkillSound,
}

impl Skill {
    pub fn new(data: SkillData) -> Self {
        let sound = data
            .sound
            .clone()
            .unwrap_or_else(|| SkillSound::for_skill(data.id));
        Skill { data, sound }
    }

    /// Placeholder for an id with no data. Can never be used locally.
    pub fn undefined(id: i32) -> Self {
        Skill {
            data: SkillData {
                id,
                name: String::new(),
                attack: false,
                passive: false,
                projectile: false,
                required_weapon: None,
                action: SkillAction::None,
                sound: None,
                hit_effect: HitEffect::None,
                use_effect: None,
                bullet: 0,
                levels: Vec::new(),
            },
            sound: SkillSound::None,
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn stats(&self, level: i32) -> Option<&SkillStats> {
        self.data.levels.iter().find(|s| s.level == level)
    }
}

impl SpecialMove for Skill {
    fn id(&self) -> i32 {
        self.data.id
    }

    fn is_attack(&self) -> bool {
        self.data.attack && !self.data.passive
    }

    fn can_use(&self, ctx: &UseContext) -> Result<(), ForbidReason> {
        if self.data.passive {
            return Err(ForbidReason::Other);
        }
        let stats = self.stats(ctx.level).ok_or(ForbidReason::Other)?;

        if let Some(required) = self.data.required_weapon {
            if required != ctx.weapon {
                return Err(ForbidReason::WeaponType);
            }
        }
        if stats.hp_cost > 0 && ctx.hp <= stats.hp_cost {
            return Err(ForbidReason::HpCost);
        }
        if ctx.mp < stats.mp_cost {
            return Err(ForbidReason::MpCost);
        }
        if self.data.projectile && ctx.weapon.uses_ammo() {
            let cost = stats.bullet_cost.max(u16::from(stats.bullet_count));
            if ctx.bullets < cost {
                return Err(ForbidReason::BulletCost);
            }
        }
        if !ctx.job.can_use(self.data.id) {
            return Err(ForbidReason::Other);
        }
        Ok(())
    }

    fn apply_use_effects(&self, user: &mut dyn Char) {
        if let Some(cue) = self.sound.use_cue() {
            user.show_cue(cue);
        }
        if let Some(effect) = &self.data.use_effect {
            user.show_cue(Cue::Effect(effect.clone()));
        }
    }

    fn apply_actions(&self, user: &mut dyn Char, attack_type: AttackType) {
        self.data.action.apply(user, attack_type, self.data.id);
    }

    fn apply_stats(&self, user: &dyn Char, stats: &CharStats, attack: &mut Attack) {
        attack.skill = self.data.id;

        let Some(skill) = self.stats(user.skill_level(self.data.id)) else {
            return;
        };

        if skill.fix_damage > 0 {
            attack.damage_type = DamageType::Fixed;
            attack.fix_damage = skill.fix_damage;
        } else if skill.matk > 0 {
            attack.damage_type = DamageType::Magic;
            attack.matk += skill.matk;
            let (min, max) = stats.magic_damage_range(skill.matk);
            attack.min_damage = min;
            attack.max_damage = max;
        } else {
            attack.damage_type = DamageType::Weapon;
            attack.min_damage *= skill.damage;
            attack.max_damage *= skill.damage;
        }

        attack.critical += skill.critical;
        attack.ignore_def += skill.ignore_def;
        attack.hit_count = skill.attack_count.min(MAX_ATTACK_COUNT);
        attack.mob_count = skill.mob_count.min(MAX_ATTACK_COUNT);
        attack.bullet_count = skill.bullet_count;
        attack.h_range = skill.h_range;
        if let Some(range) = skill.range {
            attack.range = range;
        }
    }

    fn apply_hit_effects(&self, user: &AttackUser, target: &mut Mob) {
        if let Some(cue) = self.sound.hit_cue() {
            target.show_cue(cue);
        }
        if let Some(cue) = self.data.hit_effect.cue(user) {
            target.show_cue(cue);
        }
    }

    fn bullet(&self, _user: &dyn Char, bullet_id: i32) -> i32 {
        if self.data.bullet != 0 {
            self.data.bullet
        } else {
            bullet_id
        }
    }

    fn cooltime_ms(&self, level: i32) -> i64 {
        self.stats(level).map_or(0, |s| s.cooltime_ms)
    }
}

// ===========================================================================
// Move lookup
// ===========================================================================

/// Every move known to the client, by id.
#[derive(Debug, Clone, Default)]
pub struct MoveBook {
    regular: RegularAttack,
    skills: HashMap<i32, Skill>,
}

impl MoveBook {
    pub fn new(table: SkillTable) -> Self {
        let skills = table
            .skills
            .into_iter()
            .map(|data| (data.id, Skill::new(data)))
            .collect();
        MoveBook { regular: RegularAttack, skills }
    }

    /// Move `id`: the regular attack for 0, an undefined placeholder for
    /// ids with no data.
    pub fn get(&mut self, id: i32) -> &dyn SpecialMove {
        if id == 0 {
            return &self.regular;
        }
        &*self.skills.entry(id).or_insert_with(|| Skill::undefined(id))
    }

    pub fn skill(&self, id: i32) -> Option<&Skill> {
        self.skills.get(&id)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
