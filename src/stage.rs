//! One combat session on one map.
//!
//! Tick order (`update`):
//!   1. Combat schedulers (replays, bullets, damage effects)
//!   2. Mobs (AI, physics, movement reports for controlled mobs)
//!   3. Other characters, then the player
//!   4. Touch damage from mobs overlapping the player
//!
//! Everything runs on the caller's thread. Network input arrives through
//! `handle`/`handle_packet` between ticks; output is drained with
//! `take_outbound`.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use tracing::{debug, info, trace, warn};

use crate::character::other_char::MapChars;
use crate::character::player::Player;
use crate::character::Char;
use crate::combat::effects::Cue;
use crate::combat::special_move::{ForbidReason, MoveBook, SkillTable};
use crate::combat::{Combat, ForbidMessage};
use crate::config::CombatConfig;
use crate::protocol::{parse_inbound, InboundEvent, Outbound, PacketError};
use crate::world::mob::MobStats;
use crate::world::mobs::MapMobs;
use crate::world::physics::Physics;
use crate::world::World;

pub struct Stage {
    config: CombatConfig,
    world: World,
    combat: Combat,
    outbound: Vec<Outbound>,
    tick_count: u64,
}

impl Stage {
    pub fn new(
        config: CombatConfig,
        player: Player,
        physics: Physics,
        mob_catalog: HashMap<i32, MobStats>,
        skills: SkillTable,
    ) -> Self {
        let seed = config
            .engine
            .rng_seed
            .unwrap_or_else(|| rand::rng().random::<u64>());
        let timestep = config.engine.timestep_ms;
        info!(seed, timestep, skills = skills.skills.len(), mobs = mob_catalog.len(), "stage created");

        let world = World {
            player,
            chars: MapChars::new(),
            mobs: MapMobs::new(mob_catalog, config.mob, timestep),
            physics,
            rng: StdRng::seed_from_u64(seed),
        };
        let combat = Combat::new(MoveBook::new(skills), config.combat.clone(), timestep);

        Stage {
            config,
            world,
            combat,
            outbound: Vec::new(),
            tick_count: 0,
        }
    }

    /// Advance the session by one timestep.
    pub fn update(&mut self) {
        self.tick_count += 1;
        let timestep = self.config.engine.timestep_ms;

        self.combat.update(&mut self.world);

        let movements = self.world.mobs.update(&self.world.physics, &mut self.world.rng);
        self.outbound
            .extend(movements.into_iter().map(Outbound::MoveMob));

        self.world.chars.update(&self.world.physics, timestep);
        self.world.player.update(&self.world.physics);

        self.check_touch_damage();

        self.outbound.extend(self.combat.take_outbound());
        trace!(tick = self.tick_count, mobs = self.world.mobs.len(), "tick");
    }

    fn check_touch_damage(&mut self) {
        let world = &mut self.world;
        if world.player.is_invincible() {
            return;
        }
        let area = world.player.touch_area();
        let Some(oid) = world.mobs.find_colliding(&area) else {
            return;
        };
        let attack = world.mobs.create_attack(oid, &mut world.rng);
        if !attack.is_valid() {
            return;
        }
        let result = world.player.damage(&attack, &mut world.rng);
        debug!(oid, damage = result.damage, "touch damage");
        self.outbound.push(Outbound::TakeDamage(result));
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Player pressed the key bound to `move_id`.
    pub fn use_move(&mut self, move_id: i32) -> Result<(), ForbidReason> {
        let used = self.combat.use_move(&mut self.world, move_id);
        self.outbound.extend(self.combat.take_outbound());
        used
    }

    /// The server applied buff `skill_id` to the player.
    pub fn show_player_buff(&mut self, skill_id: i32) {
        self.combat.show_player_buff(&mut self.world, skill_id);
    }

    /// Decode and apply one raw server packet.
    pub fn handle_packet(&mut self, data: &[u8]) -> Result<(), PacketError> {
        match parse_inbound(data) {
            Ok(event) => {
                self.handle(event);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, len = data.len(), "malformed inbound packet");
                Err(e)
            }
        }
    }

    pub fn handle(&mut self, event: InboundEvent) {
        let world = &mut self.world;
        match event {
            InboundEvent::Attack(result) => self.combat.push_attack(result),
            InboundEvent::ForeignEffect { cid, skill_id, level, .. } => {
                if skill_id != 0 {
                    self.combat.show_buff(world, cid, skill_id, level);
                }
            }
            InboundEvent::AddCooldown { skill_id, seconds } => {
                world.player.add_cooldown(skill_id, i64::from(seconds) * 1000);
            }
            InboundEvent::SpawnMob(spawn) => {
                world.mobs.spawn(spawn, &mut world.rng);
            }
            InboundEvent::MobControl { oid, spawn: None } => world.mobs.set_control(oid, false),
            InboundEvent::MobControl { spawn: Some(spawn), .. } => {
                world.mobs.spawn(spawn, &mut world.rng);
            }
            InboundEvent::KillMob { oid, kill_type } => world.mobs.remove(oid, kill_type),
            InboundEvent::MobMoved { oid, start, movements } => {
                world.mobs.send_movement(oid, start, movements);
            }
            InboundEvent::MobHp { oid, percent } => {
                let level = world.player.stats().level();
                world.mobs.send_mob_hp(oid, percent, level);
            }
        }
    }

    /// Leave the current map: mobs, other characters and pending effects
    /// go, the player stays.
    pub fn change_map(&mut self, physics: Physics) {
        info!(
            mobs = self.world.mobs.len(),
            pending = self.combat.pending_attacks() + self.combat.pending_damage_effects(),
            "map changed"
        );
        self.world.mobs.clear();
        self.world.chars.clear();
        self.world.physics = physics;
        self.combat.clear();
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbound)
    }

    pub fn take_messages(&mut self) -> Vec<ForbidMessage> {
        self.combat.take_messages()
    }

    /// Sound and effect cues from every character and mob, tagged with the
    /// object id that produced them.
    pub fn take_cues(&mut self) -> Vec<(i32, Cue)> {
        let player = &mut self.world.player;
        let oid = player.oid();
        let mut cues: Vec<(i32, Cue)> = player
            .core_mut()
            .take_cues()
            .into_iter()
            .map(|cue| (oid, cue))
            .collect();
        cues.extend(self.world.chars.take_cues());
        cues.extend(self.world.mobs.take_cues());
        cues
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn combat(&self) -> &Combat {
        &self.combat
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.tick_count * u64::from(self.config.engine.timestep_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::stats::BaseStats;
    use crate::character::weapon::Weapon;
    use crate::config::EngineConfig;
    use crate::protocol::opcodes::server;
    use crate::protocol::PacketBuilder;
    use crate::world::geometry::Point;
    use crate::world::mob::{MobSpawn, MobStance};

    const SNAIL: i32 = 100100;

    fn make_test_stage() -> Stage {
        let config = CombatConfig {
            engine: EngineConfig { rng_seed: Some(11), ..Default::default() },
            ..Default::default()
        };
        let mut player = Player::new(
            1,
            BaseStats { level: 20, job: 100, strength: 60, dex: 20, ..Default::default() },
            Point::new(0, 0),
            config.player,
            config.engine.timestep_ms,
        );
        player.equip_weapon(Weapon::new(1302000, 6, 17));
        let mut catalog = HashMap::new();
        catalog.insert(
            SNAIL,
            MobStats { level: 3, watk: 12, can_move: false, ..Default::default() },
        );
        Stage::new(config, player, Physics::flat(-1000, 1000, 0), catalog, SkillTable::default())
    }

    fn snail_at(oid: i32, x: i16, mode: i8) -> MobSpawn {
        MobSpawn {
            oid,
            mob_id: SNAIL,
            mode,
            stance: MobStance::Stand.value_of(true),
            fh: 1,
            new_spawn: false,
            team: -1,
            position: Point::new(x, 0),
        }
    }

    #[test]
    fn test_touch_damage_then_invincible() {
        let mut stage = make_test_stage();
        stage.handle(InboundEvent::SpawnMob(snail_at(10, 0, 0)));
        stage.update();

        let hits: Vec<_> = stage
            .take_outbound()
            .into_iter()
            .filter(|o| matches!(o, Outbound::TakeDamage(_)))
            .collect();
        assert_eq!(hits.len(), 1);
        assert!(stage.world().player.is_invincible());

        for _ in 0..10 {
            stage.update();
        }
        assert!(stage
            .take_outbound()
            .iter()
            .all(|o| !matches!(o, Outbound::TakeDamage(_))));
    }

    #[test]
    fn test_kill_packet_removes_mob() {
        let mut stage = make_test_stage();
        stage.handle(InboundEvent::SpawnMob(snail_at(10, 300, 0)));
        assert_eq!(stage.world().mobs.len(), 1);

        let pkt = PacketBuilder::new(server::S_KILL_MOB).write_d(10).write_c(0).build();
        assert_eq!(stage.handle_packet(&pkt), Ok(()));
        stage.update();
        assert!(stage.world().mobs.is_empty());
    }

    #[test]
    fn test_malformed_packet_is_reported() {
        let mut stage = make_test_stage();
        let pkt = PacketBuilder::new(server::S_SHOW_MOB_HP).write_d(10).build();
        assert!(matches!(stage.handle_packet(&pkt), Err(PacketError::Truncated { .. })));
    }

    #[test]
    fn test_server_cooldown_blocks_skill() {
        let mut stage = make_test_stage();
        stage.handle(InboundEvent::AddCooldown { skill_id: 1001004, seconds: 2 });
        assert!(stage.world().player.has_cooldown(1001004));
        for _ in 0..250 {
            stage.update();
        }
        assert!(!stage.world().player.has_cooldown(1001004));
    }

    #[test]
    fn test_change_map_drops_pending_effects() {
        let mut stage = make_test_stage();
        stage.handle(InboundEvent::SpawnMob(snail_at(10, -30, 1)));
        stage.world_mut().player.set_direction(false);
        assert_eq!(stage.use_move(0), Ok(()));
        assert!(stage.combat().pending_damage_effects() > 0);

        stage.change_map(Physics::flat(-500, 500, 0));
        assert!(stage.world().mobs.is_empty());
        assert_eq!(stage.combat().pending_damage_effects(), 0);

        for _ in 0..100 {
            stage.update();
        }
        assert!(stage.combat().damage_numbers().is_empty());
    }

    #[test]
    fn test_attack_goes_out_with_use_move() {
        let mut stage = make_test_stage();
        assert_eq!(stage.use_move(0), Ok(()));
        let out = stage.take_outbound();
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], Outbound::Attack(r) if r.attacker == 1));
    }
}
