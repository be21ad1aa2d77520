//! End-to-end combat through a `Stage`: local attacks, server replies and
//! remote attack replays.

use std::collections::HashMap;

use maple_combat::character::other_char::OtherChar;
use maple_combat::character::player::Player;
use maple_combat::character::stats::BaseStats;
use maple_combat::character::weapon::Weapon;
use maple_combat::combat::attack::{AttackResult, AttackType, DamageLine, TargetLines};
use maple_combat::combat::special_move::SkillTable;
use maple_combat::config::{CombatConfig, EngineConfig};
use maple_combat::protocol::opcodes::{client, server};
use maple_combat::protocol::outbound::write_attack;
use maple_combat::protocol::{Outbound, PacketBuilder};
use maple_combat::stage::Stage;
use maple_combat::world::geometry::Point;
use maple_combat::world::mob::{MobStance, MobStats, NameColor};
use maple_combat::world::physics::Physics;

const SNAIL: i32 = 100100;
const TIMESTEP: u64 = 8;

const SKILLS: &str = r#"
    [[skill]]
    id = 1001005
    name = "Slash Blast"
    attack = true
    action = { kind = "single", action = "swingT1" }
    [[skill.levels]]
    level = 1
    attack_count = 3
    mob_count = 6
"#;

fn make_test_stage() -> Stage {
    let config = CombatConfig {
        engine: EngineConfig { rng_seed: Some(7), ..Default::default() },
        ..Default::default()
    };
    let mut player = Player::new(
        1,
        BaseStats {
            level: 30,
            job: 112,
            strength: 120,
            dex: 40,
            int: 4,
            luk: 4,
            hp: 900,
            max_hp: 900,
            mp: 100,
            max_mp: 100,
        },
        Point::new(0, 0),
        config.player,
        config.engine.timestep_ms,
    );
    player.equip_weapon(Weapon::new(1302000, 5, 20));
    player.change_skill(1001005, 1);
    player.set_direction(false);

    let mut catalog = HashMap::new();
    catalog.insert(
        SNAIL,
        MobStats { level: 5, knockback: 1, can_move: false, touch_damage: false, ..Default::default() },
    );
    let skills = SkillTable::from_toml_str(SKILLS).unwrap();
    Stage::new(config, player, Physics::flat(-1000, 1000, 0), catalog, skills)
}

fn make_test_spawn(oid: i32, x: i16) -> bytes::Bytes {
    PacketBuilder::new(server::S_SPAWN_MOB_C)
        .write_c(1)
        .write_d(oid)
        .write_d(SNAIL)
        .write_point(Point::new(x, 0))
        .write_c(i32::from(MobStance::Stand.value_of(true)))
        .write_h(1)
        .write_bool(false)
        .write_c(-1)
        .build()
}

fn run(stage: &mut Stage, ticks: usize) {
    for _ in 0..ticks {
        stage.update();
    }
}

#[test]
fn test_effects_on_removed_mob_are_dropped() {
    let mut stage = make_test_stage();
    stage.handle_packet(&make_test_spawn(10, -40)).unwrap();

    assert_eq!(stage.use_move(1001005), Ok(()));
    let out = stage.take_outbound();
    assert!(matches!(out.first(), Some(Outbound::Attack(r)) if r.first_oid == 10));
    assert_eq!(stage.combat().pending_damage_effects(), 3);

    // Server removes the mob before any hit lands.
    let kill = PacketBuilder::new(server::S_KILL_MOB).write_d(10).write_c(0).build();
    stage.handle_packet(&kill).unwrap();

    run(&mut stage, 60);
    assert_eq!(stage.combat().pending_damage_effects(), 0);
    assert!(stage.combat().damage_numbers().is_empty());
    assert!(stage.world().mobs.is_empty());
}

#[test]
fn test_remote_attack_packet_replays_after_settle_delay() {
    let mut stage = make_test_stage();
    stage.handle_packet(&make_test_spawn(10, -300)).unwrap();
    let tuning = stage.config().player;
    stage
        .world_mut()
        .chars
        .spawn(OtherChar::new(5, 40, Point::new(-250, 0), tuning));

    let remote = AttackResult {
        attack_type: AttackType::Close,
        attacker: 5,
        mob_count: 1,
        hit_count: 1,
        speed: 6,
        damage_lines: vec![TargetLines {
            oid: 10,
            lines: vec![DamageLine { amount: 42, critical: false }],
        }],
        first_oid: 10,
        last_oid: 10,
        ..Default::default()
    };
    let pkt = write_attack(PacketBuilder::new(server::S_ATTACKED_CLOSE), &remote).build();
    stage.handle_packet(&pkt).unwrap();
    assert_eq!(stage.combat().pending_attacks(), 1);

    let settle = (400 / TIMESTEP) as usize;
    run(&mut stage, settle - 1);
    assert!(stage.combat().damage_numbers().is_empty());

    run(&mut stage, 1);
    assert_eq!(stage.combat().pending_attacks(), 0);
    let amounts: Vec<i32> = stage.combat().damage_numbers().iter().map(|n| n.amount()).collect();
    assert_eq!(amounts, vec![42]);
    assert_eq!(stage.world().mobs.get(10).map(|m| m.stance()), Some(MobStance::Hit));
}

#[test]
fn test_remote_ranged_attack_without_targets_still_flies() {
    let mut stage = make_test_stage();
    let tuning = stage.config().player;
    stage
        .world_mut()
        .chars
        .spawn(OtherChar::new(5, 40, Point::new(0, 0), tuning));

    let remote = AttackResult {
        attack_type: AttackType::Ranged,
        attacker: 5,
        hit_count: 2,
        speed: 6,
        bullet: 2060000,
        ..Default::default()
    };
    let pkt = write_attack(PacketBuilder::new(server::S_ATTACKED_RANGED), &remote).build();
    stage.handle_packet(&pkt).unwrap();

    run(&mut stage, (400 / TIMESTEP) as usize);
    assert_eq!(stage.combat().pending_attacks(), 0);
    assert!(stage.combat().pending_bullet_effects() > 0 || !stage.combat().bullets().is_empty());

    run(&mut stage, 300);
    assert_eq!(stage.combat().pending_bullet_effects(), 0);
    assert!(stage.combat().bullets().is_empty());
    assert!(stage.combat().damage_numbers().is_empty());
}

#[test]
fn test_regular_attack_encodes_with_client_opcode() {
    let mut stage = make_test_stage();
    assert_eq!(stage.use_move(0), Ok(()));
    let out = stage.take_outbound();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].opcode(), client::C_CLOSE_ATTACK);

    let data = out[0].encode();
    assert_eq!(u16::from_le_bytes([data[0], data[1]]), client::C_CLOSE_ATTACK);
    assert_eq!(i32::from_le_bytes([data[2], data[3], data[4], data[5]]), 1);
}

#[test]
fn test_hp_packet_shows_bar() {
    let mut stage = make_test_stage();
    stage.handle_packet(&make_test_spawn(10, -300)).unwrap();
    let hp = PacketBuilder::new(server::S_SHOW_MOB_HP).write_d(10).write_c(55).build();
    stage.handle_packet(&hp).unwrap();

    let mob = stage.world().mobs.get(10).unwrap();
    assert!(mob.is_hp_visible());
    assert_eq!(mob.hp_percent(), 55);
    // Level 30 against a level 5 snail.
    assert_eq!(mob.name_color(), NameColor::Weaker);
}
