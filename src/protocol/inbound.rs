//! Server packets the combat core reacts to.

use tracing::trace;

use crate::combat::attack::{AttackResult, AttackType, DamageLine, TargetLines};
use crate::protocol::opcodes::server;
use crate::protocol::packet::{PacketError, PacketReader};
use crate::world::geometry::Point;
use crate::world::mob::{KillType, MobSpawn, Movement};

/// Foreign effect id for a skill use.
const EFFECT_SKILL_USE: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Another player's resolved attack.
    Attack(AttackResult),
    /// Another player used a skill. Non-skill effects carry `skill_id` 0.
    ForeignEffect { cid: i32, effect: u8, skill_id: i32, level: u8 },
    AddCooldown { skill_id: i32, seconds: i16 },
    SpawnMob(MobSpawn),
    /// Control granted (`spawn` present) or revoked (`spawn` absent).
    MobControl { oid: i32, spawn: Option<MobSpawn> },
    KillMob { oid: i32, kill_type: KillType },
    MobMoved { oid: i32, start: Point, movements: Vec<Movement> },
    MobHp { oid: i32, percent: i8 },
}

pub fn parse_inbound(data: &[u8]) -> Result<InboundEvent, PacketError> {
    let mut r = PacketReader::new(data.to_vec());
    let opcode = r.read_uh()?;
    trace!(opcode, len = data.len(), "inbound packet");

    let event = match opcode {
        server::S_ATTACKED_CLOSE => InboundEvent::Attack(read_attack(&mut r, AttackType::Close)?),
        server::S_ATTACKED_RANGED => InboundEvent::Attack(read_attack(&mut r, AttackType::Ranged)?),
        server::S_ATTACKED_MAGIC => InboundEvent::Attack(read_attack(&mut r, AttackType::Magic)?),
        server::S_SHOW_FOREIGN_EFFECT => {
            let cid = r.read_d()?;
            let effect = r.read_c()?;
            let (skill_id, level) = if effect == EFFECT_SKILL_USE {
                (r.read_d()?, r.read_c()?)
            } else {
                (0, 0)
            };
            InboundEvent::ForeignEffect { cid, effect, skill_id, level }
        }
        server::S_ADD_COOLDOWN => InboundEvent::AddCooldown {
            skill_id: r.read_d()?,
            seconds: r.read_h()?,
        },
        server::S_SPAWN_MOB => {
            let oid = r.read_d()?;
            let mode = r.read_byte()?;
            InboundEvent::SpawnMob(read_spawn(&mut r, oid, mode)?)
        }
        server::S_SPAWN_MOB_C => {
            let mode = r.read_byte()?;
            let oid = r.read_d()?;
            let spawn = if mode == 0 {
                None
            } else {
                Some(read_spawn(&mut r, oid, mode)?)
            };
            InboundEvent::MobControl { oid, spawn }
        }
        server::S_KILL_MOB => {
            let oid = r.read_d()?;
            let raw = r.read_byte()?;
            let kill_type = KillType::from_byte(raw).ok_or(PacketError::InvalidValue {
                field: "kill type",
                value: i64::from(raw),
            })?;
            InboundEvent::KillMob { oid, kill_type }
        }
        server::S_MOB_MOVED => {
            let oid = r.read_d()?;
            let start = r.read_point()?;
            let count = r.read_c()?;
            let movements = (0..count)
                .map(|_| read_movement(&mut r))
                .collect::<Result<Vec<_>, _>>()?;
            InboundEvent::MobMoved { oid, start, movements }
        }
        server::S_SHOW_MOB_HP => InboundEvent::MobHp {
            oid: r.read_d()?,
            percent: r.read_byte()?,
        },
        other => return Err(PacketError::UnknownOpcode(other)),
    };
    Ok(event)
}

/// Attack body, the layout `outbound::write_attack` produces.
pub fn read_attack(r: &mut PacketReader, attack_type: AttackType) -> Result<AttackResult, PacketError> {
    let attacker = r.read_d()?;
    let counts = r.read_c()?;
    let mut result = AttackResult {
        attack_type,
        attacker,
        mob_count: counts >> 4,
        hit_count: counts & 0x0F,
        skill: r.read_d()?,
        level: r.read_c()?,
        display: r.read_c()?,
        ..Default::default()
    };
    let stance = r.read_c()?;
    result.stance = stance & 0x7F;
    result.to_left = stance & 0x80 != 0;
    result.speed = r.read_c()?;
    result.bullet = r.read_d()?;
    result.charge = r.read_d()?;

    for _ in 0..result.mob_count {
        let oid = r.read_d()?;
        let count = r.read_c()?;
        let lines = (0..count)
            .map(|_| {
                Ok(DamageLine {
                    amount: r.read_d()?,
                    critical: r.read_bool()?,
                })
            })
            .collect::<Result<Vec<_>, PacketError>>()?;
        result.damage_lines.push(TargetLines { oid, lines });
    }
    if let (Some(first), Some(last)) = (result.damage_lines.first(), result.damage_lines.last()) {
        result.first_oid = first.oid;
        result.last_oid = last.oid;
    }
    Ok(result)
}

fn read_spawn(r: &mut PacketReader, oid: i32, mode: i8) -> Result<MobSpawn, PacketError> {
    Ok(MobSpawn {
        oid,
        mode,
        mob_id: r.read_d()?,
        position: r.read_point()?,
        stance: r.read_c()?,
        fh: r.read_uh()?,
        new_spawn: r.read_bool()?,
        team: r.read_byte()?,
    })
}

fn read_movement(r: &mut PacketReader) -> Result<Movement, PacketError> {
    Ok(Movement {
        command: r.read_c()?,
        x: r.read_h()?,
        y: r.read_h()?,
        vx: r.read_h()?,
        vy: r.read_h()?,
        fh: r.read_uh()?,
        stance: r.read_c()?,
        duration: r.read_h()?,
    })
}
