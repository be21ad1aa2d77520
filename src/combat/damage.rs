//! Combat calculation system.
//!
//! Resolves one attack against one mob: hit chance from accuracy against
//! avoid, a defense-reduced damage window, then one roll per hit.
//!
//! Formulas, with `ld = max(0, mob level - player level)`:
//!   WEAPON  min = base_min * (1 - 0.01*ld) - wdef*0.6
//!           max = base_max * (1 - 0.01*ld) - wdef*0.5
//!   MAGIC   min = base_min - (1 + 0.01*ld) * mdef*0.6
//!           max = base_max - (1 + 0.01*ld) * mdef*0.5
//!   FIXED   min = max = fix_damage, always hits, never critical
//!   hit     accuracy / ((1.84 + 0.07*ld) * avoid + 1), at least 0.01

use rand::{Rng, RngExt};

use crate::combat::attack::{Attack, DamageLine, DamageType};
use crate::config::CombatTuning;

const MIN_DEFENSE_FACTOR: f64 = 0.6;
const MAX_DEFENSE_FACTOR: f64 = 0.5;
const LEVEL_FACTOR: f64 = 0.01;
const AVOID_BASE: f32 = 1.84;
const AVOID_PER_LEVEL: f32 = 0.07;
const MIN_HIT_CHANCE: f32 = 0.01;

/// Defender stats needed for combat calculation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefenderStats {
    pub level: u16,
    pub wdef: u16,
    pub mdef: u16,
    pub avoid: u16,
}

/// Damage window and odds for one attack against one defender.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRoll {
    pub min_damage: f64,
    pub max_damage: f64,
    pub hit_chance: f32,
    pub critical: f32,
}

/// Levels the defender has over the attacker, never negative.
pub fn level_delta(defender_level: u16, attacker_level: i16) -> i32 {
    (i32::from(defender_level) - i32::from(attacker_level)).max(0)
}

/// Hit probability. Not capped at 1: values above 1 always hit.
pub fn hit_chance(level_delta: i32, accuracy: i32, avoid: u16) -> f32 {
    let evasion = (AVOID_BASE + AVOID_PER_LEVEL * level_delta as f32) * f32::from(avoid) + 1.0;
    (accuracy as f32 / evasion).max(MIN_HIT_CHANCE)
}

/// Build the damage window for `attack` against `defender`.
pub fn damage_roll(attack: &Attack, defender: &DefenderStats) -> DamageRoll {
    let ld = level_delta(defender.level, attack.player_level);
    let scale = LEVEL_FACTOR * f64::from(ld);

    let (min_damage, max_damage, hit_chance, critical) = match attack.damage_type {
        DamageType::Weapon => {
            let wdef = f64::from(defender.wdef);
            let min = attack.min_damage * (1.0 - scale) - wdef * MIN_DEFENSE_FACTOR;
            let max = attack.max_damage * (1.0 - scale) - wdef * MAX_DEFENSE_FACTOR;
            (
                min,
                max,
                hit_chance(ld, attack.accuracy, defender.avoid),
                attack.critical,
            )
        }
        DamageType::Magic => {
            let mdef = f64::from(defender.mdef);
            let min = attack.min_damage - (1.0 + scale) * mdef * MIN_DEFENSE_FACTOR;
            let max = attack.max_damage - (1.0 + scale) * mdef * MAX_DEFENSE_FACTOR;
            (
                min,
                max,
                hit_chance(ld, attack.accuracy, defender.avoid),
                attack.critical,
            )
        }
        DamageType::Fixed => {
            let fixed = f64::from(attack.fix_damage);
            (fixed, fixed, 1.0, 0.0)
        }
    };

    DamageRoll {
        min_damage: min_damage.max(1.0),
        max_damage: max_damage.max(1.0),
        hit_chance,
        critical,
    }
}

/// Roll one hit.
pub fn next_damage(rng: &mut impl Rng, roll: &DamageRoll, tuning: &CombatTuning) -> DamageLine {
    // Miss check
    if rng.random::<f32>() >= roll.hit_chance {
        return DamageLine::MISS;
    }

    let mut damage = if roll.min_damage >= roll.max_damage {
        roll.min_damage
    } else {
        rng.random_range(roll.min_damage..roll.max_damage)
    };

    let critical = rng.random::<f32>() < roll.critical;
    if critical {
        damage *= tuning.critical_multiplier;
    }

    DamageLine {
        amount: damage.clamp(1.0, tuning.damage_cap) as i32,
        critical,
    }
}

/// Resolve every hit of `attack` against `defender`.
pub fn calculate_damage(
    rng: &mut impl Rng,
    attack: &Attack,
    defender: &DefenderStats,
    tuning: &CombatTuning,
) -> Vec<DamageLine> {
    let roll = damage_roll(attack, defender);
    (0..attack.hit_count)
        .map(|_| next_damage(rng, &roll, tuning))
        .collect()
}
