//! Character stats and derived combat values.
//!
//! Recalculation order: reset totals from the base stats, add every
//! equipment bonus, then derive accuracy and the damage window.

use serde::Deserialize;

use crate::character::job::{Job, Stat};
use crate::character::weapon::WeaponType;
use crate::world::geometry::Rect;

/// Stats owned by the character itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BaseStats {
    pub level: u16,
    pub job: u16,
    #[serde(rename = "str")]
    pub strength: u16,
    pub dex: u16,
    pub int: u16,
    pub luk: u16,
    pub hp: u16,
    pub max_hp: u16,
    pub mp: u16,
    pub max_mp: u16,
}

impl Default for BaseStats {
    fn default() -> Self {
        BaseStats {
            level: 1,
            job: 0,
            strength: 4,
            dex: 4,
            int: 4,
            luk: 4,
            hp: 50,
            max_hp: 50,
            mp: 5,
            max_mp: 5,
        }
    }
}

/// Additive bonus from one piece of equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct StatBonus {
    #[serde(rename = "str")]
    pub strength: i32,
    pub dex: i32,
    pub int: i32,
    pub luk: i32,
    pub watk: i32,
    pub matk: i32,
    pub wdef: i32,
    pub accuracy: i32,
}

impl StatBonus {
    fn add(&mut self, other: &StatBonus) {
        self.strength += other.strength;
        self.dex += other.dex;
        self.int += other.int;
        self.luk += other.luk;
        self.watk += other.watk;
        self.matk += other.matk;
        self.wdef += other.wdef;
        self.accuracy += other.accuracy;
    }
}

#[derive(Debug, Clone)]
pub struct CharStats {
    base: BaseStats,
    job: Job,
    weapon_type: WeaponType,
    totals: StatBonus,
    mastery: f32,
    critical: f32,
    ignore_def: f32,
    damage_percent: f32,
    reduce_damage: f32,
    stance: f32,
    attack_speed: i8,
    projectile_range: i16,
    min_damage: i32,
    max_damage: i32,
}

impl CharStats {
    const DEFAULT_CRITICAL: f32 = 0.05;
    const BASE_MASTERY: f32 = 0.5;
    const PROJECTILE_RANGE: i16 = 400;

    pub fn new(base: BaseStats) -> Self {
        let mut stats = CharStats {
            base,
            job: Job::new(base.job),
            weapon_type: WeaponType::None,
            totals: StatBonus::default(),
            mastery: Self::BASE_MASTERY,
            critical: Self::DEFAULT_CRITICAL,
            ignore_def: 0.0,
            damage_percent: 0.0,
            reduce_damage: 0.0,
            stance: 0.0,
            attack_speed: 0,
            projectile_range: Self::PROJECTILE_RANGE,
            min_damage: 0,
            max_damage: 0,
        };
        stats.recalculate(WeaponType::None, std::iter::empty());
        stats
    }

    /// Rebuild totals and the damage window from base stats and `bonuses`.
    pub fn recalculate<'a>(
        &mut self,
        weapon_type: WeaponType,
        bonuses: impl IntoIterator<Item = &'a StatBonus>,
    ) {
        self.weapon_type = weapon_type;
        self.totals = StatBonus {
            strength: i32::from(self.base.strength),
            dex: i32::from(self.base.dex),
            int: i32::from(self.base.int),
            luk: i32::from(self.base.luk),
            ..Default::default()
        };
        for bonus in bonuses {
            self.totals.add(bonus);
        }

        let dex = self.totals.dex as f32;
        let luk = self.totals.luk as f32;
        self.totals.accuracy += (dex * 0.8 + luk * 0.5) as i32;

        let multiplier = self.damage_percent + self.totals.watk as f32 / 100.0;
        let primary =
            self.total(self.job.primary(weapon_type)) as f32 * weapon_type.damage_multiplier();
        let secondary = self.total(self.job.secondary(weapon_type)) as f32;
        self.max_damage = ((primary + secondary) * multiplier) as i32;
        self.min_damage = ((primary * 0.9 * self.mastery + secondary) * multiplier) as i32;
    }

    pub fn total(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Str => self.totals.strength,
            Stat::Dex => self.totals.dex,
            Stat::Int => self.totals.int,
            Stat::Luk => self.totals.luk,
        }
    }

    /// Damage taken from a mob attack of `mob_watk`.
    pub fn calculate_damage(&self, mob_watk: i32) -> i32 {
        let wdef = self.totals.wdef.max(1);
        let reduced = mob_watk / 2 + mob_watk / wdef;
        reduced - (reduced as f32 * self.reduce_damage) as i32
    }

    /// Magic damage window for a spell of `spell_matk`.
    pub fn magic_damage_range(&self, spell_matk: i32) -> (f64, f64) {
        let matk = f64::from(self.totals.matk + self.totals.int);
        let int = f64::from(self.totals.int);
        let spell = f64::from(spell_matk) / 100.0;
        let mastery = f64::from(self.mastery);
        let max = ((matk * matk / 1000.0 + matk) / 30.0 + int / 200.0) * spell;
        let min = ((matk * matk / 1000.0 + matk * mastery * 0.9) / 30.0 + int / 200.0) * spell;
        (min, max)
    }

    /// Reach of a regular attack, facing right.
    pub fn range(&self) -> Rect {
        Rect::new(-self.projectile_range, -5, -50, 50)
    }

    /// 0.5 plus the mastery granted by passives.
    pub fn set_mastery(&mut self, mastery: f32) {
        self.mastery = Self::BASE_MASTERY + mastery;
    }

    pub fn set_critical(&mut self, critical: f32) {
        self.critical = critical;
    }

    pub fn set_attack_speed(&mut self, delta: i8) {
        self.attack_speed = delta;
    }

    pub fn set_stance(&mut self, stance: f32) {
        self.stance = stance;
    }

    pub fn set_reduce_damage(&mut self, reduce: f32) {
        self.reduce_damage = reduce;
    }

    pub fn set_hp(&mut self, hp: u16) {
        self.base.hp = hp.min(self.base.max_hp);
    }

    pub fn set_mp(&mut self, mp: u16) {
        self.base.mp = mp.min(self.base.max_mp);
    }

    pub fn level(&self) -> u16 {
        self.base.level
    }

    pub fn job(&self) -> Job {
        self.job
    }

    pub fn hp(&self) -> u16 {
        self.base.hp
    }

    pub fn mp(&self) -> u16 {
        self.base.mp
    }

    pub fn weapon_type(&self) -> WeaponType {
        self.weapon_type
    }

    pub fn accuracy(&self) -> i32 {
        self.totals.accuracy
    }

    pub fn min_damage(&self) -> i32 {
        self.min_damage
    }

    pub fn max_damage(&self) -> i32 {
        self.max_damage
    }

    pub fn critical(&self) -> f32 {
        self.critical
    }

    pub fn ignore_def(&self) -> f32 {
        self.ignore_def
    }

    pub fn stance(&self) -> f32 {
        self.stance
    }

    pub fn attack_speed(&self) -> i8 {
        self.attack_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_warrior() -> CharStats {
        CharStats::new(BaseStats {
            level: 30,
            job: 110,
            strength: 100,
            dex: 30,
            int: 4,
            luk: 4,
            hp: 1000,
            max_hp: 1000,
            mp: 200,
            max_mp: 200,
        })
    }

    #[test]
    fn test_damage_window_with_sword() {
        let mut stats = make_test_warrior();
        stats.recalculate(WeaponType::Sword1h, [&StatBonus { watk: 50, ..Default::default() }]);
        // primary 100*4.0, secondary 30, multiplier 0.5
        assert_eq!(stats.max_damage(), 215);
        // (400*0.9*0.5 + 30) * 0.5
        assert_eq!(stats.min_damage(), 105);
        assert_eq!(stats.accuracy(), 26);
    }

    #[test]
    fn test_recalculate_does_not_accumulate() {
        let mut stats = make_test_warrior();
        let bonus = StatBonus { watk: 50, accuracy: 10, ..Default::default() };
        stats.recalculate(WeaponType::Sword1h, [&bonus]);
        stats.recalculate(WeaponType::Sword1h, [&bonus]);
        assert_eq!(stats.accuracy(), 36);
    }

    #[test]
    fn test_damage_taken() {
        let mut stats = make_test_warrior();
        // No defence counts as one point.
        assert_eq!(stats.calculate_damage(100), 150);
        stats.recalculate(WeaponType::Sword1h, [&StatBonus { wdef: 10, ..Default::default() }]);
        assert_eq!(stats.calculate_damage(100), 60);
        stats.set_reduce_damage(0.5);
        assert_eq!(stats.calculate_damage(100), 30);
    }

    #[test]
    fn test_default_range() {
        assert_eq!(make_test_warrior().range(), Rect::new(-400, -5, -50, 50));
    }
}
