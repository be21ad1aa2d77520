//! Movement integration for mobs and characters.
//!
//! Platforms are horizontal footholds. Objects on the ground slide with
//! friction, objects in the air fall with gravity until they land on the
//! nearest foothold below. Flying objects ignore footholds entirely.

use serde::Deserialize;

use crate::world::geometry::Point;

pub const GRAVITY: f64 = 0.14;
pub const FRICTION: f64 = 0.3;
pub const GROUND_SLIP: f64 = 3.0;
pub const FLY_FRICTION: f64 = 0.05;
pub const MAX_FALL_SPEED: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhysicsKind {
    #[default]
    Normal,
    Flying,
    Fixated,
}

/// Position, speed and accumulated forces of one moving object.
#[derive(Debug, Clone, Default)]
pub struct PhysicsObject {
    pub kind: PhysicsKind,
    pub x: f64,
    pub y: f64,
    pub last_x: f64,
    pub last_y: f64,
    pub hspeed: f64,
    pub vspeed: f64,
    /// Forces are consumed by the next `Physics::move_object`.
    pub h_force: f64,
    pub v_force: f64,
    pub fh_id: u16,
    pub on_ground: bool,
    /// Cleared by physics when the object was stopped at a platform edge.
    pub turn_at_edges: bool,
}

impl PhysicsObject {
    pub fn new(position: Point) -> Self {
        let (x, y) = (f64::from(position.x), f64::from(position.y));
        PhysicsObject {
            x,
            y,
            last_x: x,
            last_y: y,
            ..Default::default()
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x.round() as i16, self.y.round() as i16)
    }

    pub fn last_position(&self) -> Point {
        Point::new(self.last_x.round() as i16, self.last_y.round() as i16)
    }

    pub fn set_position(&mut self, p: Point) {
        self.x = f64::from(p.x);
        self.y = f64::from(p.y);
        self.normalize();
    }

    /// Forget the previous position, e.g. after a teleport.
    pub fn normalize(&mut self) {
        self.last_x = self.x;
        self.last_y = self.y;
    }

    /// Set a horizontal speed that covers `target_x` in `delay_ms`.
    pub fn move_x_until(&mut self, target_x: f64, delay_ms: u16, timestep: u16) {
        if delay_ms == 0 {
            return;
        }
        let delta = target_x - self.x;
        self.hspeed = f64::from(timestep) * delta / f64::from(delay_ms);
    }
}

/// Horizontal platform.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Foothold {
    pub id: u16,
    pub x1: i16,
    pub x2: i16,
    pub y: i16,
}

impl Foothold {
    fn spans(&self, x: f64) -> bool {
        x >= f64::from(self.x1) && x <= f64::from(self.x2)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Physics {
    footholds: Vec<Foothold>,
}

impl Physics {
    pub fn new(footholds: Vec<Foothold>) -> Self {
        Physics { footholds }
    }

    /// A single platform spanning `x1..=x2` at height `y`.
    pub fn flat(x1: i16, x2: i16, y: i16) -> Self {
        Physics::new(vec![Foothold { id: 1, x1, x2, y }])
    }

    pub fn foothold(&self, id: u16) -> Option<&Foothold> {
        self.footholds.iter().find(|fh| fh.id == id)
    }

    /// Closest foothold at or below `(x, y)`.
    pub fn ground_below(&self, x: f64, y: f64) -> Option<&Foothold> {
        self.footholds
            .iter()
            .filter(|fh| fh.spans(x) && f64::from(fh.y) >= y - 1.0)
            .min_by_key(|fh| fh.y)
    }

    /// Integrate one tick for `ph`.
    pub fn move_object(&self, ph: &mut PhysicsObject) {
        match ph.kind {
            PhysicsKind::Fixated => {
                ph.h_force = 0.0;
                ph.v_force = 0.0;
                ph.normalize();
                return;
            }
            PhysicsKind::Flying => self.move_flying(ph),
            PhysicsKind::Normal => {
                self.update_ground(ph);
                self.move_normal(ph);
                self.limit_movement(ph);
            }
        }
        ph.last_x = ph.x;
        ph.last_y = ph.y;
        ph.x += ph.hspeed;
        ph.y += ph.vspeed;
    }

    fn update_ground(&self, ph: &mut PhysicsObject) {
        match self.ground_below(ph.x, ph.y) {
            Some(fh) => {
                ph.fh_id = fh.id;
                ph.on_ground = ph.vspeed >= 0.0 && (f64::from(fh.y) - ph.y).abs() < 1.0;
                if ph.on_ground {
                    ph.y = f64::from(fh.y);
                }
            }
            None => ph.on_ground = false,
        }
    }

    // Vertical force only acts from the ground.
    fn move_normal(&self, ph: &mut PhysicsObject) {
        if ph.on_ground {
            ph.vspeed += ph.v_force;
            ph.hspeed += ph.h_force;
            let inertia = ph.hspeed / GROUND_SLIP;
            ph.hspeed -= FRICTION * inertia;
            if ph.hspeed.abs() < 0.1 && ph.h_force == 0.0 {
                ph.hspeed = 0.0;
            }
            if ph.vspeed > 0.0 {
                ph.vspeed = 0.0;
            } else if ph.vspeed < 0.0 {
                ph.on_ground = false;
            }
        } else {
            ph.hspeed += ph.h_force * 0.5;
            ph.vspeed = (ph.vspeed + GRAVITY).min(MAX_FALL_SPEED);
        }
        ph.h_force = 0.0;
        ph.v_force = 0.0;
    }

    fn move_flying(&self, ph: &mut PhysicsObject) {
        ph.hspeed += ph.h_force;
        ph.vspeed += ph.v_force;
        ph.hspeed -= FLY_FRICTION * ph.hspeed;
        ph.vspeed -= FLY_FRICTION * ph.vspeed;
        ph.h_force = 0.0;
        ph.v_force = 0.0;
    }

    fn limit_movement(&self, ph: &mut PhysicsObject) {
        let next_x = ph.x + ph.hspeed;
        if ph.on_ground && ph.turn_at_edges {
            if let Some(fh) = self.foothold(ph.fh_id) {
                let (left, right) = (f64::from(fh.x1), f64::from(fh.x2));
                if next_x < left || next_x > right {
                    ph.x = next_x.clamp(left, right);
                    ph.hspeed = 0.0;
                    ph.turn_at_edges = false;
                }
            }
        }

        if !ph.on_ground && ph.vspeed > 0.0 {
            if let Some(fh) = self.ground_below(ph.x, ph.y) {
                let ground = f64::from(fh.y);
                if ph.y + ph.vspeed >= ground {
                    ph.y = ground;
                    ph.vspeed = 0.0;
                    ph.fh_id = fh.id;
                    ph.on_ground = true;
                }
            }
        }
    }
}
