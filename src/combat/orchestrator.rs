//! Ties moves, mobs and the delayed effect schedulers together.
//!
//! Local attack flow:
//!   1. `use_move` validates the move against the player
//!   2. `apply_move` builds the attack and resolves it against the mobs
//!   3. `extract_effects` schedules one effect per hit, staggered by the
//!      attacker's hit delay
//!   4. `update` fires due effects; each re-checks its target by object id
//!
//! Remote attacks arrive already resolved, wait `attack_replay_delay_ms`
//! and then enter the same `extract_effects` path.

use tracing::{debug, trace};

use crate::character::Char;
use crate::combat::attack::{AttackResult, AttackType, AttackUser, DamageLine};
use crate::combat::effects::{Bullet, BulletEffect, DamageEffect, DamageNumber, DamageNumberKind};
use crate::combat::scheduler::Scheduler;
use crate::combat::special_move::{ForbidReason, MoveBook};
use crate::config::CombatTuning;
use crate::protocol::outbound::Outbound;
use crate::world::geometry::Point;
use crate::world::mobs::MapMobs;
use crate::world::World;

/// Rush skills that dash the user to the last target after the attack.
const RUSH_SKILLS: [i32; 3] = [1121006, 1221007, 1321003];

/// A refused move, for the chat window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbidMessage {
    pub reason: ForbidReason,
    pub text: String,
}

pub struct Combat {
    attack_results: Scheduler<AttackResult>,
    bullet_effects: Scheduler<BulletEffect>,
    damage_effects: Scheduler<DamageEffect>,
    bullets: Vec<BulletEffect>,
    damage_numbers: Vec<DamageNumber>,
    moves: MoveBook,
    messages: Vec<ForbidMessage>,
    outbound: Vec<Outbound>,
    tuning: CombatTuning,
    timestep: u16,
}

impl Combat {
    pub fn new(moves: MoveBook, tuning: CombatTuning, timestep: u16) -> Self {
        Combat {
            attack_results: Scheduler::new(timestep),
            bullet_effects: Scheduler::new(timestep),
            damage_effects: Scheduler::new(timestep),
            bullets: Vec::new(),
            damage_numbers: Vec::new(),
            moves,
            messages: Vec::new(),
            outbound: Vec::new(),
            tuning,
            timestep,
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Fire due replays and effects, then animate bullets and numbers.
    pub fn update(&mut self, world: &mut World) {
        for result in self.attack_results.update() {
            self.apply_attack(world, &result);
        }
        for effect in self.bullet_effects.update() {
            self.apply_bullet_effect(world, effect);
        }
        for effect in self.damage_effects.update() {
            self.apply_damage_effect(world, &effect);
        }

        let mobs = &world.mobs;
        let mut arrived = Vec::new();
        self.bullets.retain_mut(|flying| {
            match mobs.mob_head_position(flying.effect.target_oid) {
                Some(head) => {
                    flying.target = head;
                    if flying.bullet.update(head) {
                        arrived.push(flying.effect.clone());
                        return false;
                    }
                    true
                }
                // Target gone: finish the flight, then vanish.
                None => !flying.bullet.update(flying.target),
            }
        });
        for effect in arrived {
            self.apply_damage_effect(world, &effect);
        }

        let timestep = self.timestep;
        self.damage_numbers.retain_mut(|number| !number.update(timestep));
    }

    // -----------------------------------------------------------------------
    // Local moves
    // -----------------------------------------------------------------------

    /// Validate and execute move `move_id` for the player.
    pub fn use_move(&mut self, world: &mut World, move_id: i32) -> Result<(), ForbidReason> {
        if !world.player.can_attack() {
            return Err(ForbidReason::Busy);
        }

        let checked = world.player.can_use(self.moves.get(move_id));
        if let Err(reason) = checked {
            debug!(move_id, %reason, "move refused");
            if let Some(text) = reason.message(world.player.stats().weapon_type()) {
                self.messages.push(ForbidMessage { reason, text });
            }
            return Err(reason);
        }

        self.apply_move(world, move_id);
        Ok(())
    }

    fn apply_move(&mut self, world: &mut World, move_id: i32) {
        let level = world.player.skill_level(move_id);
        let special_move = self.moves.get(move_id);
        let cooltime = special_move.cooltime_ms(level);

        if !special_move.is_attack() {
            special_move.apply_use_effects(&mut world.player);
            special_move.apply_actions(&mut world.player, AttackType::Magic);
            if cooltime > 0 {
                world.player.add_cooldown(move_id, cooltime);
            }
            debug!(move_id, level, "skill used");
            self.outbound.push(Outbound::UseSkill {
                skill_id: move_id,
                level: u8::try_from(level).unwrap_or(u8::MAX),
            });
            return;
        }

        let mut attack = world.player.prepare_attack(special_move.is_skill());
        special_move.apply_use_effects(&mut world.player);
        special_move.apply_actions(&mut world.player, attack.attack_type);
        world.player.set_afterimage(move_id);
        special_move.apply_stats(&world.player, world.player.stats(), &mut attack);

        let mut result = world.mobs.send_attack(&attack, &mut world.rng, &self.tuning);
        result.attacker = world.player.oid();
        result.level = u8::try_from(level).unwrap_or(u8::MAX);

        self.extract_effects(&world.player, &world.mobs, move_id, &result);

        if cooltime > 0 {
            world.player.add_cooldown(move_id, cooltime);
        }
        if RUSH_SKILLS.contains(&move_id) && result.mob_count > 0 {
            if let Some(target) = world.mobs.mob_position(result.last_oid) {
                world.player.rush(target.x);
            }
        }

        debug!(
            move_id,
            attack_type = ?result.attack_type,
            targets = result.mob_count,
            total = result.total_damage(),
            "attack resolved"
        );
        self.outbound.push(Outbound::Attack(result));
    }

    // -----------------------------------------------------------------------
    // Remote moves
    // -----------------------------------------------------------------------

    /// Queue another player's attack for replay.
    pub fn push_attack(&mut self, result: AttackResult) {
        self.attack_results
            .push(self.tuning.attack_replay_delay_ms, result);
    }

    /// Replay another player's attack through the local effect pipeline.
    pub fn apply_attack(&mut self, world: &mut World, result: &AttackResult) {
        let Some(user) = world.chars.get_char_mut(result.attacker) else {
            debug!(cid = result.attacker, "attack from unknown char dropped");
            return;
        };
        user.update_skill(result.skill, result.level);
        user.update_speed(result.speed);

        let special_move = self.moves.get(result.skill);
        special_move.apply_use_effects(&mut *user);
        if result.stance != 0 {
            user.attack_stance(result.stance);
        } else {
            special_move.apply_actions(&mut *user, result.attack_type);
        }
        user.set_afterimage(result.skill);

        self.extract_effects(&*user, &world.mobs, result.skill, result);
    }

    /// Another player used a buff.
    pub fn show_buff(&mut self, world: &mut World, cid: i32, skill_id: i32, level: u8) {
        let Some(user) = world.chars.get_char_mut(cid) else {
            return;
        };
        user.update_skill(skill_id, level);
        let special_move = self.moves.get(skill_id);
        special_move.apply_use_effects(&mut *user);
        special_move.apply_actions(&mut *user, AttackType::Magic);
    }

    /// Play the use effects of a buff the server applied to the player.
    pub fn show_player_buff(&mut self, world: &mut World, skill_id: i32) {
        self.moves.get(skill_id).apply_use_effects(&mut world.player);
    }

    // -----------------------------------------------------------------------
    // Effects
    // -----------------------------------------------------------------------

    /// Schedule one delayed effect per hit of `result`.
    pub fn extract_effects(
        &mut self,
        user: &dyn Char,
        mobs: &MapMobs,
        move_id: i32,
        result: &AttackResult,
    ) {
        let attack_user = AttackUser {
            skill_level: user.skill_level(move_id),
            level: user.level(),
            second_weapon: user.is_two_handed(),
            flip: !result.to_left,
        };
        let bullet = (result.bullet != 0).then(|| {
            let visual = self.moves.get(move_id).bullet(user, result.bullet);
            Bullet::new(visual, user.position(), result.to_left)
        });

        for target in &result.damage_lines {
            let Some(head) = mobs.mob_head_position(target.oid) else {
                continue;
            };
            let numbers = Self::place_numbers(head, &target.lines);
            for (i, (number, line)) in numbers.into_iter().zip(&target.lines).enumerate() {
                let effect = DamageEffect {
                    user: attack_user,
                    number,
                    damage: line.amount,
                    to_left: result.to_left,
                    target_oid: target.oid,
                    move_id,
                };
                let delay = i64::from(user.attack_delay(i));
                match &bullet {
                    Some(bullet) => self.bullet_effects.emplace(delay, (effect, bullet.clone(), head)),
                    None => self.damage_effects.push(delay, effect),
                }
            }
        }

        // Nothing to hit: still shoot, toward a point in front of the user.
        if let Some(bullet) = bullet.filter(|_| result.damage_lines.is_empty()) {
            let shift = if result.to_left {
                -self.tuning.bullet_fallback_shift
            } else {
                self.tuning.bullet_fallback_shift
            };
            let target = user.position() + Point::new(shift, -self.tuning.bullet_fallback_rise);
            for i in 0..usize::from(result.hit_count) {
                let effect = DamageEffect {
                    user: attack_user,
                    number: DamageNumber::new(DamageNumberKind::Normal, 0, target.x, target.y),
                    damage: 0,
                    to_left: false,
                    target_oid: DamageEffect::NO_TARGET,
                    move_id: 0,
                };
                self.bullet_effects
                    .emplace(i64::from(user.attack_delay(i)), (effect, bullet.clone(), target));
            }
        }
    }

    /// Damage numbers stacked upward from `head`.
    pub fn place_numbers(head: Point, lines: &[DamageLine]) -> Vec<DamageNumber> {
        let mut y = head.y;
        lines
            .iter()
            .map(|line| {
                let kind = if line.critical {
                    DamageNumberKind::Critical
                } else {
                    DamageNumberKind::Normal
                };
                let number = DamageNumber::new(kind, line.amount, head.x, y);
                y = y.saturating_sub(DamageNumber::row_height(line.critical));
                number
            })
            .collect()
    }

    fn apply_bullet_effect(&mut self, world: &mut World, mut effect: BulletEffect) {
        if effect.bullet.set_target(effect.target) {
            self.apply_damage_effect(world, &effect.effect);
        } else {
            self.bullets.push(effect);
        }
    }

    /// Land one hit. A target that is gone or dead makes this a no-op.
    fn apply_damage_effect(&mut self, world: &mut World, effect: &DamageEffect) {
        let Some(head) = world.mobs.mob_head_position(effect.target_oid) else {
            if effect.is_targeted() {
                debug!(oid = effect.target_oid, "stale damage effect dropped");
            }
            return;
        };

        let special_move = self.moves.get(effect.move_id);
        let landed = world.mobs.apply_damage(
            effect.target_oid,
            effect.damage,
            effect.to_left,
            &effect.user,
            special_move,
        );
        if landed {
            let mut number = effect.number.clone();
            number.set_x(head.x);
            self.damage_numbers.push(number);
            trace!(oid = effect.target_oid, damage = effect.damage, "damage applied");
        }
    }

    /// Drop everything in flight, for a map change.
    pub fn clear(&mut self) {
        self.attack_results.clear();
        self.bullet_effects.clear();
        self.damage_effects.clear();
        self.bullets.clear();
        self.damage_numbers.clear();
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn moves(&self) -> &MoveBook {
        &self.moves
    }

    pub fn damage_numbers(&self) -> &[DamageNumber] {
        &self.damage_numbers
    }

    pub fn bullets(&self) -> &[BulletEffect] {
        &self.bullets
    }

    pub fn pending_attacks(&self) -> usize {
        self.attack_results.len()
    }

    pub fn pending_bullet_effects(&self) -> usize {
        self.bullet_effects.len()
    }

    pub fn pending_damage_effects(&self) -> usize {
        self.damage_effects.len()
    }

    pub fn take_messages(&mut self) -> Vec<ForbidMessage> {
        std::mem::take(&mut self.messages)
    }

    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbound)
    }
}
