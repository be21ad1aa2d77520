//! How a move animates its user and what it sounds like.

use serde::Deserialize;

use crate::character::Char;
use crate::combat::attack::{AttackType, AttackUser};
use crate::combat::effects::Cue;

/// Animation a move puts its user into.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkillAction {
    /// No pose change, e.g. passives.
    #[default]
    None,
    /// Weapon swing for the equipped weapon.
    Regular,
    Single { action: String },
    /// Different actions for one- and two-handed weapons.
    TwoHanded { one_handed: String, two_handed: String },
    /// Action picked by the user's level in the skill.
    ByLevel { levels: Vec<LevelAction> },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LevelAction {
    pub level: i32,
    pub action: String,
}

impl SkillAction {
    pub fn apply(&self, user: &mut dyn Char, attack_type: AttackType, skill_id: i32) {
        match self {
            SkillAction::None => {}
            SkillAction::Regular => {
                // Ranged weapons only shoot with ranged attacks.
                let degenerate = user.weapon_type().uses_ammo() && attack_type != AttackType::Ranged;
                user.attack_regular(degenerate);
            }
            SkillAction::Single { action } => user.attack_action(action),
            SkillAction::TwoHanded { one_handed, two_handed } => {
                let action = if user.is_two_handed() { two_handed } else { one_handed };
                user.attack_action(action);
            }
            SkillAction::ByLevel { levels } => {
                let level = user.skill_level(skill_id);
                if let Some(entry) = levels.iter().find(|e| e.level == level) {
                    user.attack_action(&entry.action);
                }
            }
        }
    }
}

/// Sounds played on use and on each hit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkillSound {
    #[default]
    None,
    Single { use_sound: String, hit_sound: String },
}

impl SkillSound {
    /// Standard sound paths for `skill_id`.
    pub fn for_skill(skill_id: i32) -> Self {
        SkillSound::Single {
            use_sound: format!("Skill/{skill_id:07}/Use"),
            hit_sound: format!("Skill/{skill_id:07}/Hit"),
        }
    }

    pub fn use_cue(&self) -> Option<Cue> {
        match self {
            SkillSound::None => None,
            SkillSound::Single { use_sound, .. } => Some(Cue::Sound(use_sound.clone())),
        }
    }

    pub fn hit_cue(&self) -> Option<Cue> {
        match self {
            SkillSound::None => None,
            SkillSound::Single { hit_sound, .. } => Some(Cue::Sound(hit_sound.clone())),
        }
    }
}

/// Animation played on the target of each hit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HitEffect {
    #[default]
    None,
    Single { effect: String },
    /// Variant picked by whether the attacker held a two-handed weapon.
    TwoHanded { one_handed: String, two_handed: String },
}

impl HitEffect {
    pub fn cue(&self, user: &AttackUser) -> Option<Cue> {
        match self {
            HitEffect::None => None,
            HitEffect::Single { effect } => Some(Cue::Effect(effect.clone())),
            HitEffect::TwoHanded { one_handed, two_handed } => {
                let effect = if user.second_weapon { two_handed } else { one_handed };
                Some(Cue::Effect(effect.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::weapon::WeaponType;
    use crate::character::{AttackPose, CharCore};
    use crate::config::PlayerTuning;
    use crate::world::geometry::Point;

    struct Dummy(CharCore);

    impl Char for Dummy {
        fn core(&self) -> &CharCore {
            &self.0
        }

        fn core_mut(&mut self) -> &mut CharCore {
            &mut self.0
        }
    }

    fn make_test_user(weapon: WeaponType, two_handed: bool) -> Dummy {
        let mut core = CharCore::new(1, 30, Point::default(), PlayerTuning::default());
        core.set_weapon(weapon, two_handed, 6);
        Dummy(core)
    }

    #[test]
    fn test_regular_with_bow_in_melee_is_degenerate() {
        let mut user = make_test_user(WeaponType::Bow, true);
        SkillAction::Regular.apply(&mut user, AttackType::Close, 0);
        assert_eq!(user.core().pose(), Some(&AttackPose::Regular { degenerate: true }));

        let mut user = make_test_user(WeaponType::Bow, true);
        SkillAction::Regular.apply(&mut user, AttackType::Ranged, 0);
        assert_eq!(user.core().pose(), Some(&AttackPose::Regular { degenerate: false }));
    }

    #[test]
    fn test_two_handed_picks_action() {
        let action = SkillAction::TwoHanded {
            one_handed: "swingO1".into(),
            two_handed: "swingT1".into(),
        };
        let mut user = make_test_user(WeaponType::Sword2h, true);
        action.apply(&mut user, AttackType::Close, 1001004);
        assert_eq!(user.core().pose(), Some(&AttackPose::Action("swingT1".into())));
    }

    #[test]
    fn test_by_level_uses_skill_level() {
        let action = SkillAction::ByLevel {
            levels: vec![
                LevelAction { level: 1, action: "alert2".into() },
                LevelAction { level: 2, action: "alert3".into() },
            ],
        };
        let mut user = make_test_user(WeaponType::Sword1h, false);
        user.core_mut().set_skill_level(1121006, 2);
        action.apply(&mut user, AttackType::Close, 1121006);
        assert_eq!(user.core().pose(), Some(&AttackPose::Action("alert3".into())));
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            action: SkillAction,
            sound: SkillSound,
        }
        let w: Wrapper = toml::from_str(
            r#"
            action = { kind = "single", action = "shoot1" }
            sound = { kind = "single", use_sound = "a", hit_sound = "b" }
            "#,
        )
        .unwrap();
        assert_eq!(w.action, SkillAction::Single { action: "shoot1".into() });
        assert_eq!(w.sound.hit_cue(), Some(Cue::Sound("b".into())));
    }

    #[test]
    fn test_hit_effect_follows_second_weapon() {
        let effect = HitEffect::TwoHanded { one_handed: "hit/0".into(), two_handed: "hit/1".into() };
        let user = AttackUser { second_weapon: true, ..Default::default() };
        assert_eq!(effect.cue(&user), Some(Cue::Effect("hit/1".into())));
        assert_eq!(HitEffect::None.cue(&user), None);
    }
}
