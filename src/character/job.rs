//! Job ids and advancement levels.
//!
//! Ids encode the branch: 100 is a first job, 110 second, 111 third and
//! 112 fourth. Skill ids carry their job in `skill_id / 10000`.

use crate::character::weapon::WeaponType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobLevel {
    Beginner,
    First,
    Second,
    Third,
    Fourth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    Str,
    Dex,
    Int,
    Luk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Job {
    id: u16,
}

impl Job {
    pub fn new(id: u16) -> Self {
        Job { id }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn level(&self) -> JobLevel {
        Self::level_of(self.id)
    }

    fn level_of(id: u16) -> JobLevel {
        if id == 0 {
            JobLevel::Beginner
        } else if id % 100 == 0 {
            JobLevel::First
        } else if id % 10 == 0 {
            JobLevel::Second
        } else if id % 10 == 1 {
            JobLevel::Third
        } else {
            JobLevel::Fourth
        }
    }

    /// The job this job advanced through at `level`.
    pub fn subjob(&self, level: JobLevel) -> u16 {
        if level > self.level() {
            return 0;
        }
        match level {
            JobLevel::Beginner => 0,
            JobLevel::First => self.id / 100 * 100,
            JobLevel::Second => self.id / 10 * 10,
            JobLevel::Third => {
                if self.level() == JobLevel::Fourth {
                    self.id - 1
                } else {
                    self.id
                }
            }
            JobLevel::Fourth => self.id,
        }
    }

    /// Whether `sub` is this job or one it advanced through.
    pub fn is_sub_job(&self, sub: u16) -> bool {
        let level = Self::level_of(sub);
        level <= self.level() && self.subjob(level) == sub
    }

    /// Skills belong to the job in `skill_id / 10000`.
    pub fn can_use(&self, skill_id: i32) -> bool {
        u16::try_from(skill_id / 10000).is_ok_and(|sub| self.is_sub_job(sub))
    }

    /// Main damage stat for `weapon`.
    pub fn primary(&self, weapon: WeaponType) -> Stat {
        match weapon {
            WeaponType::Wand | WeaponType::Staff => Stat::Int,
            WeaponType::Bow | WeaponType::Crossbow | WeaponType::Gun => Stat::Dex,
            WeaponType::Claw => Stat::Luk,
            WeaponType::Dagger if self.id / 100 == 4 => Stat::Luk,
            _ => Stat::Str,
        }
    }

    pub fn secondary(&self, weapon: WeaponType) -> Stat {
        match self.primary(weapon) {
            Stat::Int => Stat::Luk,
            Stat::Dex => Stat::Str,
            Stat::Luk => Stat::Dex,
            Stat::Str => Stat::Dex,
        }
    }
}
