//! Messages the combat core hands to the network layer.

use bytes::Bytes;

use crate::combat::attack::{AttackResult, AttackType, MobAttackResult, MAX_ATTACK_COUNT};
use crate::protocol::opcodes::client;
use crate::protocol::packet::PacketBuilder;
use crate::world::mob::{MobMovement, Movement};

/// Mob touch attacks are reported with this attack index.
const TOUCH_ATTACK: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Attack(AttackResult),
    UseSkill { skill_id: i32, level: u8 },
    MoveMob(MobMovement),
    TakeDamage(MobAttackResult),
}

impl Outbound {
    pub fn opcode(&self) -> u16 {
        match self {
            Outbound::Attack(result) => match result.attack_type {
                AttackType::Close => client::C_CLOSE_ATTACK,
                AttackType::Ranged => client::C_RANGED_ATTACK,
                AttackType::Magic => client::C_MAGIC_ATTACK,
            },
            Outbound::UseSkill { .. } => client::C_USE_SKILL,
            Outbound::MoveMob(_) => client::C_MOVE_MONSTER,
            Outbound::TakeDamage(_) => client::C_TAKE_DAMAGE,
        }
    }

    pub fn encode(&self) -> Bytes {
        let pkt = PacketBuilder::new(self.opcode());
        match self {
            Outbound::Attack(result) => write_attack(pkt, result).build(),
            Outbound::UseSkill { skill_id, level } => {
                pkt.write_d(*skill_id).write_c(i32::from(*level)).build()
            }
            Outbound::MoveMob(mv) => {
                let pkt = pkt
                    .write_d(mv.oid)
                    .write_h(i32::from(mv.move_id))
                    .write_point(mv.start)
                    .write_c(1);
                write_movement(pkt, &mv.movement).build()
            }
            Outbound::TakeDamage(hit) => pkt
                .write_c(TOUCH_ATTACK)
                .write_d(hit.damage)
                .write_d(hit.mob_id)
                .write_d(hit.oid)
                .write_c(i32::from(hit.direction))
                .build(),
        }
    }
}

/// Attack body shared with the inbound attack packets.
///
/// The target count in the header is taken from the damage lines actually
/// written, so header and body always agree.
pub fn write_attack(pkt: PacketBuilder, result: &AttackResult) -> PacketBuilder {
    let mob_count = result.damage_lines.len().min(usize::from(MAX_ATTACK_COUNT));
    let hit_count = result.hit_count.min(MAX_ATTACK_COUNT);
    let counts = ((mob_count as i32) << 4) | i32::from(hit_count);
    let stance = i32::from(result.stance & 0x7F) | if result.to_left { 0x80 } else { 0 };
    let mut pkt = pkt
        .write_d(result.attacker)
        .write_c(counts)
        .write_d(result.skill)
        .write_c(i32::from(result.level))
        .write_c(i32::from(result.display))
        .write_c(stance)
        .write_c(i32::from(result.speed))
        .write_d(result.bullet)
        .write_d(result.charge);
    for target in result.damage_lines.iter().take(mob_count) {
        pkt = pkt.write_d(target.oid).write_c(target.lines.len() as i32);
        for line in &target.lines {
            pkt = pkt.write_d(line.amount).write_bool(line.critical);
        }
    }
    pkt
}

/// One absolute movement fragment, 14 bytes.
pub fn write_movement(pkt: PacketBuilder, m: &Movement) -> PacketBuilder {
    pkt.write_c(i32::from(m.command))
        .write_h(i32::from(m.x))
        .write_h(i32::from(m.y))
        .write_h(i32::from(m.vx))
        .write_h(i32::from(m.vy))
        .write_h(i32::from(m.fh))
        .write_c(i32::from(m.stance))
        .write_h(i32::from(m.duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::attack::{DamageLine, TargetLines};
    use crate::protocol::inbound::read_attack;
    use crate::protocol::packet::PacketReader;
    use crate::world::geometry::Point;

    #[test]
    fn test_attack_opcode_follows_type() {
        let mut result = AttackResult::default();
        assert_eq!(Outbound::Attack(result.clone()).opcode(), client::C_CLOSE_ATTACK);
        result.attack_type = AttackType::Ranged;
        assert_eq!(Outbound::Attack(result.clone()).opcode(), client::C_RANGED_ATTACK);
        result.attack_type = AttackType::Magic;
        assert_eq!(Outbound::Attack(result).opcode(), client::C_MAGIC_ATTACK);
    }

    #[test]
    fn test_attack_body_layout() {
        let result = AttackResult {
            attacker: 42,
            mob_count: 1,
            hit_count: 2,
            skill: 1001004,
            level: 20,
            stance: 5,
            speed: 6,
            to_left: true,
            damage_lines: vec![TargetLines {
                oid: 900,
                lines: vec![DamageLine { amount: 77, critical: true }, DamageLine::MISS],
            }],
            ..Default::default()
        };
        let mut r = PacketReader::new(Outbound::Attack(result).encode());
        assert_eq!(r.read_uh(), Ok(client::C_CLOSE_ATTACK));
        assert_eq!(r.read_d(), Ok(42));
        assert_eq!(r.read_c(), Ok(0x12));
        assert_eq!(r.read_d(), Ok(1001004));
        assert_eq!(r.read_c(), Ok(20));
        assert_eq!(r.read_c(), Ok(0));
        assert_eq!(r.read_c(), Ok(0x85));
        assert_eq!(r.read_c(), Ok(6));
        r.skip(8).unwrap();
        assert_eq!(r.read_d(), Ok(900));
        assert_eq!(r.read_c(), Ok(2));
        assert_eq!(r.read_d(), Ok(77));
        assert_eq!(r.read_bool(), Ok(true));
        assert_eq!(r.read_d(), Ok(0));
        assert_eq!(r.read_bool(), Ok(false));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_attack_counts_capped_to_header_nibbles() {
        let hit = TargetLines { oid: 0, lines: vec![DamageLine { amount: 5, critical: false }] };
        let result = AttackResult {
            attacker: 1,
            mob_count: 16,
            hit_count: 16,
            damage_lines: (0..16).map(|oid| TargetLines { oid, ..hit.clone() }).collect(),
            ..Default::default()
        };
        let mut r = PacketReader::new(Outbound::Attack(result).encode());
        assert_eq!(r.read_uh(), Ok(client::C_CLOSE_ATTACK));

        let decoded = read_attack(&mut r, AttackType::Close).unwrap();
        assert_eq!(decoded.mob_count, MAX_ATTACK_COUNT);
        assert_eq!(decoded.hit_count, MAX_ATTACK_COUNT);
        assert_eq!(decoded.damage_lines.len(), 15);
        assert_eq!(decoded.last_oid, 14);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_move_mob_and_take_damage() {
        let mv = MobMovement {
            oid: 7,
            move_id: 3,
            start: Point::new(10, -5),
            movement: Movement { x: 12, y: -5, stance: 3, duration: 480, ..Default::default() },
        };
        let bytes = Outbound::MoveMob(mv).encode();
        // opcode, oid, move id, start, count, movement
        assert_eq!(bytes.len(), 2 + 4 + 2 + 4 + 1 + 14);

        let hit = MobAttackResult { damage: 35, mob_id: 100100, oid: 7, direction: 1 };
        let mut r = PacketReader::new(Outbound::TakeDamage(hit).encode());
        assert_eq!(r.read_uh(), Ok(client::C_TAKE_DAMAGE));
        assert_eq!(r.read_byte(), Ok(-1));
        assert_eq!(r.read_d(), Ok(35));
        assert_eq!(r.read_d(), Ok(100100));
        assert_eq!(r.read_d(), Ok(7));
        assert_eq!(r.read_c(), Ok(1));
    }
}
