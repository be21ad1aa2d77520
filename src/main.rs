//! Headless combat driver.
//!
//! Runs one `Stage` against a loopback server on a fixed-timestep tokio
//! interval. Usage: `maple-combat [config.toml] [scenario.toml]`; missing
//! arguments fall back to the files under `demos/`.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use serde::Deserialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use maple_combat::character::player::Player;
use maple_combat::character::stats::BaseStats;
use maple_combat::character::weapon::Weapon;
use maple_combat::combat::special_move::SkillTable;
use maple_combat::config::CombatConfig;
use maple_combat::protocol::opcodes::server;
use maple_combat::protocol::{Outbound, PacketBuilder};
use maple_combat::stage::Stage;
use maple_combat::world::geometry::Point;
use maple_combat::world::mob::MobStance;
use maple_combat::world::mobs::MobCatalog;
use maple_combat::world::physics::{Foothold, Physics};

const DEFAULT_CONFIG: &str = include_str!("../demos/combat.toml");
const DEFAULT_SCENARIO: &str = include_str!("../demos/scenario.toml");
const SKILLS: &str = include_str!("../demos/skills.toml");
const MOBS: &str = include_str!("../demos/mobs.toml");

const PLAYER_OID: i32 = 1;
const KILL_ANIMATED: i32 = 1;

#[derive(Debug, Deserialize)]
struct Scenario {
    player: BaseStats,
    weapon: Weapon,
    #[serde(default)]
    ammo: Option<AmmoLoad>,
    #[serde(default)]
    skills: Vec<SkillLevel>,
    footholds: Vec<Foothold>,
    #[serde(default)]
    mobs: Vec<MobPlacement>,
    /// Move ids tried in turn, one every `attack_every` ticks.
    rotation: Vec<i32>,
    #[serde(default = "default_attack_every")]
    attack_every: u64,
}

fn default_attack_every() -> u64 {
    75
}

#[derive(Debug, Deserialize)]
struct AmmoLoad {
    bullet_id: i32,
    count: u16,
}

#[derive(Debug, Deserialize)]
struct SkillLevel {
    id: i32,
    level: i32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct MobPlacement {
    oid: i32,
    mob_id: i32,
    x: i16,
    #[serde(default)]
    y: i16,
    hp: i64,
}

/// Stands in for the game server: owns mob HP and answers attacks with
/// HP bars and kills.
#[derive(Debug, Default)]
struct LoopbackServer {
    hp: HashMap<i32, (i64, i64)>,
    packets: u64,
    bytes: usize,
    damage: i64,
    kills: u32,
}

impl LoopbackServer {
    fn spawn_packets(&mut self, mobs: &[MobPlacement]) -> Vec<Bytes> {
        mobs.iter()
            .map(|m| {
                self.hp.insert(m.oid, (m.hp, m.hp));
                PacketBuilder::new(server::S_SPAWN_MOB_C)
                    .write_c(1)
                    .write_d(m.oid)
                    .write_d(m.mob_id)
                    .write_point(Point::new(m.x, m.y))
                    .write_c(i32::from(MobStance::Stand.value_of(true)))
                    .write_h(1)
                    .write_bool(true)
                    .write_c(-1)
                    .build()
            })
            .collect()
    }

    fn receive(&mut self, out: &Outbound) -> Vec<Bytes> {
        let data = out.encode();
        self.packets += 1;
        self.bytes += data.len();
        debug!(opcode = out.opcode(), len = data.len(), "sent");

        let Outbound::Attack(result) = out else {
            return Vec::new();
        };
        let mut replies = Vec::new();
        for target in &result.damage_lines {
            let Some((hp, max_hp)) = self.hp.get_mut(&target.oid) else {
                continue;
            };
            let dealt: i64 = target.lines.iter().map(|l| i64::from(l.amount)).sum();
            self.damage += dealt;
            *hp -= dealt;
            if *hp <= 0 {
                self.hp.remove(&target.oid);
                self.kills += 1;
                replies.push(
                    PacketBuilder::new(server::S_KILL_MOB)
                        .write_d(target.oid)
                        .write_c(KILL_ANIMATED)
                        .build(),
                );
            } else {
                let percent = (*hp * 100 / (*max_hp).max(1)) as i32;
                replies.push(
                    PacketBuilder::new(server::S_SHOW_MOB_HP)
                        .write_d(target.oid)
                        .write_c(percent)
                        .build(),
                );
            }
        }
        replies
    }
}

fn build_player(scenario: &Scenario, config: &CombatConfig) -> Player {
    let mut player = Player::new(
        PLAYER_OID,
        scenario.player,
        Point::new(0, 0),
        config.player,
        config.engine.timestep_ms,
    );
    player.equip_weapon(scenario.weapon);
    if let Some(ammo) = &scenario.ammo {
        player.set_ammo(ammo.bullet_id, ammo.count);
    }
    for skill in &scenario.skills {
        player.change_skill(skill.id, skill.level);
    }
    // Mobs start to the left.
    player.set_direction(false);
    player
}

fn load_text(arg: Option<String>, fallback: &str) -> Result<String> {
    match arg {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {path}")),
        None => Ok(fallback.to_string()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config = CombatConfig::from_toml_str(&load_text(args.next(), DEFAULT_CONFIG)?)?;
    let scenario: Scenario = toml::from_str(&load_text(args.next(), DEFAULT_SCENARIO)?)
        .context("parsing scenario")?;

    let level = tracing::Level::from_str(&config.engine.log_level)
        .with_context(|| format!("invalid log level {:?}", config.engine.log_level))?;
    tracing_subscriber::fmt().with_max_level(level).init();

    if scenario.rotation.is_empty() {
        bail!("scenario has an empty move rotation");
    }
    if config.engine.timestep_ms == 0 {
        bail!("engine.timestep_ms must be positive");
    }

    let skills = SkillTable::from_toml_str(SKILLS)?;
    let catalog = MobCatalog::from_toml_str(MOBS)?.into_map();
    let player = build_player(&scenario, &config);
    let physics = Physics::new(scenario.footholds.clone());
    let tick_limit = config.engine.tick_limit;
    let timestep = config.engine.timestep_ms;

    let mut stage = Stage::new(config, player, physics, catalog, skills);
    let mut server = LoopbackServer::default();
    for packet in server.spawn_packets(&scenario.mobs) {
        stage.handle_packet(&packet)?;
    }
    info!(mobs = stage.world().mobs.len(), tick_limit, "session started");

    let mut interval = tokio::time::interval(Duration::from_millis(u64::from(timestep)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let every = scenario.attack_every.max(1);
    let mut refused = 0u32;

    for tick in 0..tick_limit {
        interval.tick().await;

        if tick % every == 0 {
            let slot = (tick / every) as usize % scenario.rotation.len();
            let move_id = scenario.rotation[slot];
            if let Err(reason) = stage.use_move(move_id) {
                refused += 1;
                debug!(move_id, %reason, "move refused");
            }
        }

        stage.update();

        for message in stage.take_messages() {
            info!(reason = %message.reason, "{}", message.text);
        }
        for out in stage.take_outbound() {
            for reply in server.receive(&out) {
                stage.handle_packet(&reply)?;
            }
        }
        stage.take_cues();

        if stage.world().mobs.is_empty() && server.hp.is_empty() {
            info!(tick, "all mobs cleared");
            break;
        }
    }

    info!(
        ticks = stage.tick_count(),
        elapsed_ms = stage.elapsed_ms(),
        kills = server.kills,
        damage = server.damage,
        refused,
        packets = server.packets,
        bytes = server.bytes,
        mobs_left = stage.world().mobs.len(),
        "session finished"
    );
    Ok(())
}
