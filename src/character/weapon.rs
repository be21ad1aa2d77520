//! Weapon classification.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponType {
    #[default]
    None,
    Sword1h,
    Axe1h,
    Mace1h,
    Dagger,
    Wand,
    Staff,
    Sword2h,
    Axe2h,
    Mace2h,
    Spear,
    Polearm,
    Bow,
    Crossbow,
    Claw,
    Knuckle,
    Gun,
}

impl WeaponType {
    /// Weapon type from the item category (`item_id / 10000`).
    pub fn by_value(value: i32) -> Self {
        match value {
            130 => WeaponType::Sword1h,
            131 => WeaponType::Axe1h,
            132 => WeaponType::Mace1h,
            133 => WeaponType::Dagger,
            137 => WeaponType::Wand,
            138 => WeaponType::Staff,
            140 => WeaponType::Sword2h,
            141 => WeaponType::Axe2h,
            142 => WeaponType::Mace2h,
            143 => WeaponType::Spear,
            144 => WeaponType::Polearm,
            145 => WeaponType::Bow,
            146 => WeaponType::Crossbow,
            147 => WeaponType::Claw,
            148 => WeaponType::Knuckle,
            149 => WeaponType::Gun,
            _ => WeaponType::None,
        }
    }

    pub fn of_item(item_id: i32) -> Self {
        if item_id <= 0 {
            WeaponType::None
        } else {
            Self::by_value(item_id / 10000)
        }
    }

    /// Bow, crossbow, claw and gun fire projectiles.
    pub fn uses_ammo(self) -> bool {
        matches!(
            self,
            WeaponType::Bow | WeaponType::Crossbow | WeaponType::Claw | WeaponType::Gun
        )
    }

    /// Wand and staff can only attack in melee unless casting.
    pub fn is_magic(self) -> bool {
        matches!(self, WeaponType::Wand | WeaponType::Staff)
    }

    pub fn damage_multiplier(self) -> f32 {
        match self {
            WeaponType::Sword1h => 4.0,
            WeaponType::Axe1h | WeaponType::Mace1h | WeaponType::Wand | WeaponType::Staff => 4.4,
            WeaponType::Dagger | WeaponType::Crossbow | WeaponType::Claw | WeaponType::Gun => 3.6,
            WeaponType::Sword2h => 4.6,
            WeaponType::Axe2h | WeaponType::Mace2h | WeaponType::Knuckle => 4.8,
            WeaponType::Spear | WeaponType::Polearm => 5.0,
            WeaponType::Bow => 3.4,
            WeaponType::None => 0.0,
        }
    }

    /// Plural ammunition name used in messages.
    pub fn ammo_name(self) -> &'static str {
        match self {
            WeaponType::Bow => "arrows",
            WeaponType::Crossbow => "bolts",
            WeaponType::Claw => "stars",
            WeaponType::Gun => "bullets",
            _ => "ammunition",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WeaponType::None => "none",
            WeaponType::Sword1h => "one-handed sword",
            WeaponType::Axe1h => "one-handed axe",
            WeaponType::Mace1h => "one-handed mace",
            WeaponType::Dagger => "dagger",
            WeaponType::Wand => "wand",
            WeaponType::Staff => "staff",
            WeaponType::Sword2h => "two-handed sword",
            WeaponType::Axe2h => "two-handed axe",
            WeaponType::Mace2h => "two-handed mace",
            WeaponType::Spear => "spear",
            WeaponType::Polearm => "polearm",
            WeaponType::Bow => "bow",
            WeaponType::Crossbow => "crossbow",
            WeaponType::Claw => "claw",
            WeaponType::Knuckle => "knuckle",
            WeaponType::Gun => "gun",
        }
    }
}

/// An equipped weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Weapon {
    pub item_id: i32,
    /// Attack speed class, lower is faster.
    #[serde(default = "default_weapon_speed")]
    pub speed: u8,
    #[serde(default)]
    pub watk: i32,
    #[serde(default)]
    pub two_handed: bool,
}

fn default_weapon_speed() -> u8 {
    6
}

impl Weapon {
    pub fn new(item_id: i32, speed: u8, watk: i32) -> Self {
        Weapon {
            item_id,
            speed,
            watk,
            two_handed: matches!(
                WeaponType::of_item(item_id),
                WeaponType::Sword2h
                    | WeaponType::Axe2h
                    | WeaponType::Mace2h
                    | WeaponType::Spear
                    | WeaponType::Polearm
                    | WeaponType::Bow
                    | WeaponType::Crossbow
            ),
        }
    }

    pub fn weapon_type(&self) -> WeaponType {
        WeaponType::of_item(self.item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weapon_type_from_item() {
        assert_eq!(WeaponType::of_item(1302000), WeaponType::Sword1h);
        assert_eq!(WeaponType::of_item(1452002), WeaponType::Bow);
        assert_eq!(WeaponType::of_item(1492000), WeaponType::Gun);
        assert_eq!(WeaponType::of_item(1342000), WeaponType::None);
        assert_eq!(WeaponType::of_item(0), WeaponType::None);
    }

    #[test]
    fn test_ammo_weapons() {
        assert!(WeaponType::Claw.uses_ammo());
        assert!(!WeaponType::Spear.uses_ammo());
        assert_eq!(WeaponType::Crossbow.ammo_name(), "bolts");
    }

    #[test]
    fn test_two_handed_detection() {
        assert!(Weapon::new(1402000, 6, 40).two_handed);
        assert!(!Weapon::new(1302000, 4, 17).two_handed);
    }
}
