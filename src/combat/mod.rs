//! Attack resolution and the delayed effects it produces.

pub mod attack;
pub mod damage;
pub mod effects;
pub mod orchestrator;
pub mod scheduler;
pub mod skill_action;
pub mod special_move;

pub use orchestrator::{Combat, ForbidMessage};
pub use scheduler::Scheduler;
