//! Mobs on the current map.
//!
//! Mobs are keyed by object id in a `BTreeMap`, so iteration order (and
//! with it target selection and RNG consumption) is deterministic.
//! Every access by id tolerates the mob being gone.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rand::Rng;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::combat::attack::{
    Attack, AttackResult, AttackUser, MobAttack, TargetLines, MAX_ATTACK_COUNT,
};
use crate::combat::effects::Cue;
use crate::combat::special_move::SpecialMove;
use crate::config::{CombatTuning, ConfigError, MobTuning};
use crate::world::geometry::{Point, Rect};
use crate::world::mob::{KillType, Mob, MobMovement, MobSpawn, MobStats, Movement};
use crate::world::physics::Physics;

/// Mob templates file: a list of `[[mob]]` tables with a `stats` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MobCatalog {
    #[serde(default, rename = "mob")]
    entries: Vec<MobEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct MobEntry {
    id: i32,
    #[serde(default)]
    stats: MobStats,
}

impl MobCatalog {
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

    pub fn into_map(self) -> HashMap<i32, MobStats> {
        self.entries.into_iter().map(|e| (e.id, e.stats)).collect()
    }
}

pub struct MapMobs {
    mobs: BTreeMap<i32, Mob>,
    /// Mob templates (shared, immutable after load).
    catalog: HashMap<i32, MobStats>,
    cues: Vec<(i32, Cue)>,
    tuning: MobTuning,
    timestep: u16,
}

impl MapMobs {
    pub fn new(catalog: HashMap<i32, MobStats>, tuning: MobTuning, timestep: u16) -> Self {
        MapMobs {
            mobs: BTreeMap::new(),
            catalog,
            cues: Vec::new(),
            tuning,
            timestep,
        }
    }

    /// Spawn a mob, or re-activate it if the id is already known.
    ///
    /// Returns false if the mob id has no template.
    pub fn spawn(&mut self, spawn: MobSpawn, rng: &mut impl Rng) -> bool {
        if let Some(mob) = self.mobs.get_mut(&spawn.oid) {
            if spawn.mode > 0 {
                mob.set_control(spawn.mode);
            }
            mob.activate();
            return true;
        }

        let Some(stats) = self.catalog.get(&spawn.mob_id).cloned() else {
            warn!(oid = spawn.oid, mob_id = spawn.mob_id, "spawn for unknown mob");
            return false;
        };
        debug!(oid = spawn.oid, mob_id = spawn.mob_id, mode = spawn.mode, "mob spawned");
        self.mobs
            .insert(spawn.oid, Mob::new(&spawn, stats, self.tuning, self.timestep, rng));
        true
    }

    pub fn remove(&mut self, oid: i32, kill_type: KillType) {
        if let Some(mob) = self.mobs.get_mut(&oid) {
            mob.kill(kill_type);
        }
    }

    pub fn clear(&mut self) {
        self.mobs.clear();
    }

    pub fn set_control(&mut self, oid: i32, control: bool) {
        if let Some(mob) = self.mobs.get_mut(&oid) {
            mob.set_control(i8::from(control));
        }
    }

    pub fn send_mob_hp(&mut self, oid: i32, percent: i8, player_level: u16) {
        if let Some(mob) = self.mobs.get_mut(&oid) {
            mob.show_hp(percent, player_level);
        }
    }

    pub fn send_movement(&mut self, oid: i32, start: Point, movements: Vec<Movement>) {
        if let Some(mob) = self.mobs.get_mut(&oid) {
            mob.send_movement(start, movements);
        }
    }

    /// Execute one tick for every mob.
    ///
    /// Returns the movement reports queued since the last tick, so the
    /// caller can generate movement packets. Mobs that left play are
    /// dropped afterwards.
    pub fn update(&mut self, physics: &Physics, rng: &mut impl Rng) -> Vec<MobMovement> {
        let mut movements = Vec::new();
        for (oid, mob) in self.mobs.iter_mut() {
            mob.update(physics, rng);
            movements.extend(mob.take_movements());
            self.cues.extend(mob.take_cues().into_iter().map(|c| (*oid, c)));
        }

        let before = self.mobs.len();
        self.mobs.retain(|_, mob| mob.is_active());
        if self.mobs.len() != before {
            trace!(removed = before - self.mobs.len(), "mobs removed");
        }
        movements
    }

    // -----------------------------------------------------------------------
    // Combat
    // -----------------------------------------------------------------------

    /// Select targets for `attack` and resolve their damage.
    pub fn send_attack(
        &mut self,
        attack: &Attack,
        rng: &mut impl Rng,
        tuning: &CombatTuning,
    ) -> AttackResult {
        let range = Self::attack_area(attack);
        let count = attack.mob_count.min(MAX_ATTACK_COUNT);
        let targets = self.find_closest(&range, attack.origin, count);

        let mut result = AttackResult::from_attack(attack);
        for oid in targets {
            if let Some(mob) = self.mobs.get_mut(&oid) {
                let lines = mob.calculate_damage(attack, rng, tuning);
                result.damage_lines.push(TargetLines { oid, lines });
            }
        }

        result.mob_count = result.damage_lines.len() as u8;
        if let (Some(first), Some(last)) = (result.damage_lines.first(), result.damage_lines.last())
        {
            result.first_oid = first.oid;
            result.last_oid = last.oid;
        }
        result
    }

    /// The attack's reach in map coordinates, mirrored by facing.
    pub fn attack_area(attack: &Attack) -> Rect {
        let range = attack.range;
        let o = attack.origin;
        let h_range = (f32::from(range.left) * attack.h_range) as i16;
        let top = o.y.saturating_add(range.top);
        let bottom = o.y.saturating_add(range.bottom);
        if attack.to_left {
            Rect::new(o.x.saturating_add(h_range), o.x.saturating_add(range.right), top, bottom)
        } else {
            Rect::new(o.x.saturating_sub(range.right), o.x.saturating_sub(h_range), top, bottom)
        }
    }

    /// Up to `count` live mobs in `range`, nearest to `origin` first.
    pub fn find_closest(&self, range: &Rect, origin: Point, count: u8) -> Vec<i32> {
        let mut candidates: Vec<(f64, i32)> = self
            .mobs
            .values()
            .filter(|mob| mob.is_alive() && mob.is_in_range(range))
            .map(|mob| (mob.position().distance(origin), mob.oid()))
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
        candidates
            .into_iter()
            .take(usize::from(count))
            .map(|(_, oid)| oid)
            .collect()
    }

    /// Land one scheduled hit. Returns false if the target is gone.
    pub fn apply_damage(
        &mut self,
        oid: i32,
        damage: i32,
        to_left: bool,
        user: &AttackUser,
        special_move: &dyn SpecialMove,
    ) -> bool {
        let Some(mob) = self.mobs.get_mut(&oid).filter(|m| m.accepts_damage()) else {
            return false;
        };
        special_move.apply_hit_effects(user, mob);
        mob.apply_damage(damage, to_left);
        true
    }

    /// First live mob whose body overlaps `rect`.
    pub fn find_colliding(&self, rect: &Rect) -> Option<i32> {
        self.mobs
            .values()
            .find(|mob| mob.is_alive() && mob.is_in_range(rect))
            .map(|mob| mob.oid())
    }

    pub fn create_attack(&self, oid: i32, rng: &mut impl Rng) -> MobAttack {
        self.mobs
            .get(&oid)
            .map(|mob| mob.create_touch_attack(rng))
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn contains(&self, oid: i32) -> bool {
        self.mobs.contains_key(&oid)
    }

    pub fn get(&self, oid: i32) -> Option<&Mob> {
        self.mobs.get(&oid)
    }

    pub fn get_mut(&mut self, oid: i32) -> Option<&mut Mob> {
        self.mobs.get_mut(&oid)
    }

    pub fn mob_position(&self, oid: i32) -> Option<Point> {
        self.mobs.get(&oid).map(|mob| mob.position())
    }

    /// Head of a mob that can still be hit.
    pub fn mob_head_position(&self, oid: i32) -> Option<Point> {
        self.mobs
            .get(&oid)
            .filter(|mob| mob.accepts_damage())
            .map(|mob| mob.head_position())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mob> {
        self.mobs.values()
    }

    pub fn len(&self) -> usize {
        self.mobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mobs.is_empty()
    }

    /// Cues from every mob, tagged with the mob's id.
    pub fn take_cues(&mut self) -> Vec<(i32, Cue)> {
        let mut cues = std::mem::take(&mut self.cues);
        for (oid, mob) in self.mobs.iter_mut() {
            cues.extend(mob.take_cues().into_iter().map(|c| (*oid, c)));
        }
        cues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::special_move::RegularAttack;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SNAIL: i32 = 100100;

    fn make_test_catalog() -> HashMap<i32, MobStats> {
        let mut catalog = HashMap::new();
        catalog.insert(
            SNAIL,
            MobStats { level: 40, watk: 100, wdef: 100, avoid: 50, knockback: 50, ..Default::default() },
        );
        catalog
    }

    fn make_spawn(oid: i32, x: i16) -> MobSpawn {
        MobSpawn {
            oid,
            mob_id: SNAIL,
            mode: 1,
            stance: 5,
            fh: 1,
            new_spawn: false,
            team: -1,
            position: Point::new(x, 0),
        }
    }

    fn make_test_mobs(positions: &[(i32, i16)]) -> MapMobs {
        let mut rng = StdRng::seed_from_u64(11);
        let mut mobs = MapMobs::new(make_test_catalog(), MobTuning::default(), 8);
        for &(oid, x) in positions {
            assert!(mobs.spawn(make_spawn(oid, x), &mut rng));
        }
        mobs
    }

    fn make_test_attack(mob_count: u8) -> Attack {
        Attack {
            min_damage: 300.0,
            max_damage: 400.0,
            accuracy: 500,
            player_level: 50,
            hit_count: 2,
            mob_count,
            origin: Point::new(0, 0),
            range: Rect::new(-400, -5, -50, 50),
            ..Default::default()
        }
    }

    #[test]
    fn test_catalog_from_toml() {
        let catalog = MobCatalog::from_toml_str(
            r#"
            [[mob]]
            id = 100100
            [mob.stats]
            name = "Snail"
            level = 1
            watk = 12
            "#,
        )
        .unwrap()
        .into_map();
        assert_eq!(catalog[&100100].watk, 12);
        assert_eq!(catalog[&100100].name, "Snail");
        assert!(catalog[&100100].can_move);
    }

    #[test]
    fn test_spawn_unknown_template() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut mobs = MapMobs::new(HashMap::new(), MobTuning::default(), 8);
        assert!(!mobs.spawn(make_spawn(1, 0), &mut rng));
        assert!(mobs.is_empty());
    }

    #[test]
    fn test_attack_area_mirrors_by_facing() {
        let right = MapMobs::attack_area(&make_test_attack(1));
        assert_eq!(right, Rect::new(5, 400, -50, 50));
        let left = MapMobs::attack_area(&Attack { to_left: true, ..make_test_attack(1) });
        assert_eq!(left, Rect::new(-400, -5, -50, 50));
        let short = MapMobs::attack_area(&Attack { h_range: 0.5, ..make_test_attack(1) });
        assert_eq!(short, Rect::new(5, 200, -50, 50));
    }

    #[test]
    fn test_send_attack_picks_closest() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut mobs = make_test_mobs(&[(1, 300), (2, 100), (3, 200), (4, -100)]);
        let result = mobs.send_attack(&make_test_attack(2), &mut rng, &CombatTuning::default());

        let oids: Vec<i32> = result.damage_lines.iter().map(|t| t.oid).collect();
        assert_eq!(oids, vec![2, 3]);
        assert_eq!(result.mob_count, 2);
        assert_eq!(result.first_oid, 2);
        assert_eq!(result.last_oid, 3);
        assert!(result.damage_lines.iter().all(|t| t.lines.len() == 2));
    }

    #[test]
    fn test_send_attack_skips_dying() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut mobs = make_test_mobs(&[(1, 100), (2, 200)]);
        mobs.remove(1, KillType::Animated);
        let result = mobs.send_attack(&make_test_attack(5), &mut rng, &CombatTuning::default());
        assert_eq!(result.mob_count, 1);
        assert_eq!(result.first_oid, 2);
    }

    #[test]
    fn test_send_attack_no_targets() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut mobs = make_test_mobs(&[(1, -100)]);
        let result = mobs.send_attack(&make_test_attack(3), &mut rng, &CombatTuning::default());
        assert!(result.damage_lines.is_empty());
        assert_eq!(result.mob_count, 0);
        assert_eq!(result.hit_count, 2);
    }

    #[test]
    fn test_apply_damage_to_removed_mob() {
        let physics = Physics::flat(-1000, 1000, 0);
        let mut rng = StdRng::seed_from_u64(5);
        let mut mobs = make_test_mobs(&[(1, 100)]);
        let user = AttackUser::default();

        mobs.remove(1, KillType::Deactivate);
        assert!(!mobs.apply_damage(1, 100, false, &user, &RegularAttack));
        mobs.update(&physics, &mut rng);
        assert!(!mobs.contains(1));
        assert!(!mobs.apply_damage(1, 100, false, &user, &RegularAttack));
        assert!(mobs.mob_head_position(1).is_none());
    }

    #[test]
    fn test_update_reports_movement() {
        let physics = Physics::flat(-1000, 1000, 0);
        let mut rng = StdRng::seed_from_u64(6);
        let mut mobs = make_test_mobs(&[(1, 100)]);
        mobs.apply_damage(1, 100, true, &AttackUser::default(), &RegularAttack);
        let movements = mobs.update(&physics, &mut rng);
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].oid, 1);
        assert!(mobs
            .take_cues()
            .iter()
            .any(|(oid, cue)| *oid == 1 && matches!(cue, Cue::Sound(s) if s.ends_with("/Damage"))));
    }

    #[test]
    fn test_respawn_reactivates() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut mobs = make_test_mobs(&[(1, 100)]);
        mobs.set_control(1, false);
        assert!(!mobs.get(1).unwrap().is_controlled());
        assert!(mobs.spawn(make_spawn(1, 100), &mut rng));
        assert!(mobs.get(1).unwrap().is_controlled());
        assert_eq!(mobs.len(), 1);
    }

    #[test]
    fn test_find_colliding() {
        let mobs = make_test_mobs(&[(1, 100)]);
        assert_eq!(mobs.find_colliding(&Rect::new(90, 110, -40, 0)), Some(1));
        assert_eq!(mobs.find_colliding(&Rect::new(300, 310, -40, 0)), None);
    }
}
