//! Attack descriptions exchanged between the player, mobs and the server.

use crate::world::geometry::{Point, Rect};

/// How an attack reaches its targets. Also selects the outbound opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttackType {
    #[default]
    Close,
    Ranged,
    Magic,
}

/// Which damage formula applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DamageType {
    #[default]
    Weapon,
    Magic,
    Fixed,
}

/// Mob and hit counts share one byte on the wire, four bits each.
pub const MAX_ATTACK_COUNT: u8 = 15;

/// A fully-prepared outgoing attack.
#[derive(Debug, Clone, PartialEq)]
pub struct Attack {
    pub attack_type: AttackType,
    pub damage_type: DamageType,
    pub min_damage: f64,
    pub max_damage: f64,
    pub critical: f32,
    /// Carried to the server; the local defense formula does not read it.
    pub ignore_def: f32,
    pub matk: i32,
    pub accuracy: i32,
    pub fix_damage: i32,
    pub player_level: i16,
    pub hit_count: u8,
    pub mob_count: u8,
    pub bullet_count: u8,
    pub speed: u8,
    pub stance: u8,
    pub skill: i32,
    /// Projectile item id, 0 for non-projectile attacks.
    pub bullet: i32,
    pub origin: Point,
    /// Reach relative to the origin, mirrored by facing.
    pub range: Rect,
    /// Fraction of `range.left` that is the near edge.
    pub h_range: f32,
    pub to_left: bool,
}

impl Default for Attack {
    fn default() -> Self {
        Attack {
            attack_type: AttackType::Close,
            damage_type: DamageType::Weapon,
            min_damage: 1.0,
            max_damage: 1.0,
            critical: 0.0,
            ignore_def: 0.0,
            matk: 0,
            accuracy: 0,
            fix_damage: 0,
            player_level: 1,
            hit_count: 0,
            mob_count: 0,
            bullet_count: 0,
            speed: 0,
            stance: 0,
            skill: 0,
            bullet: 0,
            origin: Point::default(),
            range: Rect::default(),
            h_range: 1.0,
            to_left: false,
        }
    }
}

/// One hit on one target. An amount of 0 is a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageLine {
    pub amount: i32,
    pub critical: bool,
}

impl DamageLine {
    pub const MISS: DamageLine = DamageLine { amount: 0, critical: false };

    pub fn is_miss(&self) -> bool {
        self.amount <= 0
    }
}

/// All hits on one target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetLines {
    pub oid: i32,
    pub lines: Vec<DamageLine>,
}

/// Resolved attack, in target order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttackResult {
    pub attack_type: AttackType,
    pub attacker: i32,
    pub mob_count: u8,
    pub hit_count: u8,
    pub skill: i32,
    pub charge: i32,
    pub bullet: i32,
    pub level: u8,
    pub display: u8,
    pub stance: u8,
    pub speed: u8,
    pub to_left: bool,
    pub damage_lines: Vec<TargetLines>,
    pub first_oid: i32,
    pub last_oid: i32,
}

impl AttackResult {
    /// Skeleton result for `attack` with no targets resolved yet.
    pub fn from_attack(attack: &Attack) -> Self {
        AttackResult {
            attack_type: attack.attack_type,
            hit_count: attack.hit_count,
            skill: attack.skill,
            bullet: attack.bullet,
            stance: attack.stance,
            speed: attack.speed,
            to_left: attack.to_left,
            ..Default::default()
        }
    }

    pub fn lines_for(&self, oid: i32) -> Option<&[DamageLine]> {
        self.damage_lines
            .iter()
            .find(|t| t.oid == oid)
            .map(|t| t.lines.as_slice())
    }

    pub fn total_damage(&self) -> i64 {
        self.damage_lines
            .iter()
            .flat_map(|t| t.lines.iter())
            .map(|l| i64::from(l.amount))
            .sum()
    }
}

/// The attacker's side of a damage effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttackUser {
    pub skill_level: i32,
    pub level: u16,
    pub second_weapon: bool,
    pub flip: bool,
}

/// A mob's attack on the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MobAttack {
    pub attack_type: AttackType,
    pub watk: i32,
    pub matk: i32,
    pub mob_id: i32,
    pub oid: i32,
    pub origin: Point,
    valid: bool,
}

impl MobAttack {
    /// Body-contact attack.
    pub fn touch(watk: i32, origin: Point, mob_id: i32, oid: i32) -> Self {
        MobAttack {
            attack_type: AttackType::Close,
            watk,
            matk: 0,
            mob_id,
            oid,
            origin,
            valid: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Damage the player took, as reported to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MobAttackResult {
    pub damage: i32,
    pub mob_id: i32,
    pub oid: i32,
    /// 0 when hit from the left, 1 from the right.
    pub direction: u8,
}

impl MobAttackResult {
    pub fn new(attack: &MobAttack, damage: i32, direction: u8) -> Self {
        MobAttackResult {
            damage,
            mob_id: attack.mob_id,
            oid: attack.oid,
            direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_lookup_and_total() {
        let mut result = AttackResult::from_attack(&Attack {
            hit_count: 2,
            skill: 1001004,
            ..Default::default()
        });
        result.damage_lines.push(TargetLines {
            oid: 7,
            lines: vec![DamageLine { amount: 100, critical: false }, DamageLine::MISS],
        });
        assert_eq!(result.skill, 1001004);
        assert_eq!(result.lines_for(7).map(|l| l.len()), Some(2));
        assert!(result.lines_for(8).is_none());
        assert_eq!(result.total_damage(), 100);
        assert!(result.lines_for(7).unwrap()[1].is_miss());
    }

    #[test]
    fn test_default_mob_attack_is_invalid() {
        assert!(!MobAttack::default().is_valid());
        assert!(MobAttack::touch(10, Point::default(), 100100, 1).is_valid());
    }
}
