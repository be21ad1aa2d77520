//! Deferred combat effects and their visual state.
//!
//! A `DamageEffect` is one hit on one mob, waiting in a scheduler until its
//! per-hit delay elapses. A `BulletEffect` additionally carries a projectile
//! that has to reach the mob before the hit applies.

use crate::combat::attack::AttackUser;
use crate::world::geometry::Point;

/// Sound or one-shot animation requested by game logic, drained by the
/// renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cue {
    Sound(String),
    Effect(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DamageNumberKind {
    #[default]
    Normal,
    Critical,
    ToPlayer,
}

/// Floating damage text.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageNumber {
    kind: DamageNumberKind,
    amount: i32,
    x: f64,
    y: f64,
    opacity: f32,
}

impl DamageNumber {
    const RISE_SPEED: f64 = -0.25;
    const FADE_MS: f32 = 500.0;
    const START_OPACITY: f32 = 1.5;

    pub fn new(kind: DamageNumberKind, amount: i32, x: i16, y: i16) -> Self {
        DamageNumber {
            kind,
            amount,
            x: f64::from(x),
            y: f64::from(y),
            opacity: Self::START_OPACITY,
        }
    }

    /// Vertical spacing between stacked numbers.
    pub fn row_height(critical: bool) -> i16 {
        if critical {
            36
        } else {
            30
        }
    }

    pub fn set_x(&mut self, x: i16) {
        self.x = f64::from(x);
    }

    /// Rise and fade. Returns true once fully transparent.
    pub fn update(&mut self, timestep: u16) -> bool {
        self.y += Self::RISE_SPEED;
        self.opacity -= f32::from(timestep) / Self::FADE_MS;
        self.opacity <= 0.0
    }

    pub fn kind(&self) -> DamageNumberKind {
        self.kind
    }

    pub fn amount(&self) -> i32 {
        self.amount
    }

    pub fn is_miss(&self) -> bool {
        self.amount <= 0
    }

    pub fn position(&self) -> Point {
        Point::new(self.x.round() as i16, self.y.round() as i16)
    }

    pub fn opacity(&self) -> f32 {
        self.opacity.clamp(0.0, 1.0)
    }

    pub fn text(&self) -> String {
        if self.is_miss() {
            "MISS".to_string()
        } else {
            self.amount.to_string()
        }
    }
}

/// Projectile in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    visual: i32,
    x: f64,
    y: f64,
    hspeed: f64,
    vspeed: f64,
    flip: bool,
}

impl Bullet {
    const ARRIVAL_DISTANCE: f64 = 10.0;
    const MIN_SPEED: f64 = 3.0;
    const MAX_SPEED: f64 = 6.0;
    const SPAWN_SHIFT: f64 = 30.0;
    const SPAWN_RISE: f64 = 26.0;

    /// Spawned in front of the shooter at hand height.
    pub fn new(visual: i32, origin: Point, to_left: bool) -> Self {
        let shift = if to_left { -Self::SPAWN_SHIFT } else { Self::SPAWN_SHIFT };
        Bullet {
            visual,
            x: f64::from(origin.x) + shift,
            y: f64::from(origin.y) - Self::SPAWN_RISE,
            hspeed: 0.0,
            vspeed: 0.0,
            flip: !to_left,
        }
    }

    /// Aim at `target`. Returns true if already there.
    pub fn set_target(&mut self, target: Point) -> bool {
        let xdelta = f64::from(target.x) - self.x;
        let ydelta = f64::from(target.y) - self.y;
        if xdelta.abs() < Self::ARRIVAL_DISTANCE {
            return true;
        }

        self.flip = xdelta > 0.0;
        let speed = (xdelta.abs() / 32.0).clamp(Self::MIN_SPEED, Self::MAX_SPEED);
        self.hspeed = speed * xdelta.signum();
        self.vspeed = ydelta * self.hspeed / xdelta;
        false
    }

    /// Fly one tick toward `target`. Returns true on arrival.
    pub fn update(&mut self, target: Point) -> bool {
        if self.set_target(target) {
            return true;
        }
        self.x += self.hspeed;
        self.y += self.vspeed;

        let xdelta = f64::from(target.x) - self.x;
        xdelta.abs() < Self::ARRIVAL_DISTANCE || xdelta.signum() != self.hspeed.signum()
    }

    pub fn visual(&self) -> i32 {
        self.visual
    }

    pub fn position(&self) -> Point {
        Point::new(self.x.round() as i16, self.y.round() as i16)
    }

    pub fn flip(&self) -> bool {
        self.flip
    }
}

/// One pending hit.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageEffect {
    pub user: AttackUser,
    pub number: DamageNumber,
    pub damage: i32,
    pub to_left: bool,
    pub target_oid: i32,
    pub move_id: i32,
}

impl DamageEffect {
    /// Target id that no mob ever has, for effects that only show a bullet.
    pub const NO_TARGET: i32 = 0;

    pub fn is_targeted(&self) -> bool {
        self.target_oid != Self::NO_TARGET
    }
}

/// A pending hit delivered by projectile.
#[derive(Debug, Clone, PartialEq)]
pub struct BulletEffect {
    pub effect: DamageEffect,
    pub bullet: Bullet,
    pub target: Point,
}

impl From<(DamageEffect, Bullet, Point)> for BulletEffect {
    fn from((effect, bullet, target): (DamageEffect, Bullet, Point)) -> Self {
        BulletEffect { effect, bullet, target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_number_fades_out() {
        let mut number = DamageNumber::new(DamageNumberKind::Normal, 120, 0, 0);
        let mut ticks = 0;
        while !number.update(8) {
            ticks += 1;
        }
        // 1.5 opacity at 8/500 per tick
        assert_eq!(ticks, 93);
        assert!(number.position().y < 0);
    }

    #[test]
    fn test_miss_text() {
        assert_eq!(DamageNumber::new(DamageNumberKind::Normal, 0, 0, 0).text(), "MISS");
        assert_eq!(DamageNumber::new(DamageNumberKind::Critical, 45, 0, 0).text(), "45");
    }

    #[test]
    fn test_bullet_reaches_target() {
        let mut bullet = Bullet::new(2070000, Point::new(0, 0), false);
        assert_eq!(bullet.position(), Point::new(30, -26));
        let target = Point::new(300, -40);
        let mut ticks = 0;
        while !bullet.update(target) {
            ticks += 1;
            assert!(ticks < 200);
        }
        assert!(bullet.flip());
    }

    #[test]
    fn test_bullet_on_top_of_target_arrives_at_once() {
        let mut bullet = Bullet::new(0, Point::new(0, 0), true);
        assert!(bullet.set_target(Point::new(-25, -26)));
    }
}
