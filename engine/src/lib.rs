//! Game logic layer machinery.

/// Energy cost of a regular action.
pub const BASE_ACTION_COST: i32 = 100;

/// Elapsed energy per subtick, time-based effects run once per subtick.
pub const SUBTICK_ENERGY: i32 = 100;

/// Speed value that gets one action per baseline action of the player.
pub const NORMAL_SPEED: i32 = 100;

/// Energy drained from a creature when it dies so it can't act again.
pub const DEATH_ENERGY_DRAIN: i32 = 1000;

/// How many lines of messages are kept around.
pub const MESSAGE_LOG_CAPACITY: usize = 100;

/// How far away do pack monsters look for their packmates.
pub const PACK_RADIUS: i32 = 5;

/// How far does alerting one pack member spread to the rest of the pack.
pub const PACK_ALERT_RADIUS: i32 = 6;

/// How loud is the player's shout.
pub const SHOUT_LOUDNESS: i32 = 20;

/// Radius of a fog cloud.
pub const FOG_RADIUS: i32 = 5;

mod action;
pub use action::Action;

mod ai;
pub use ai::Noise;

mod board;
pub use board::{Board, Tile};

mod data;
pub use data::{MonsterFlags, MonsterSpec, BESTIARY};

pub mod ecs;
pub use ecs::Alertness;

mod entity;
pub use entity::Entity;

mod field;
pub use field::{Field, FieldKind};

mod mob;
pub use mob::Status;

mod msg;
pub use msg::MessageLog;

mod pathing;

pub mod prelude;

mod runtime;
pub use runtime::{Runtime, WorldSpec};

mod sight;

mod time;
pub use time::Instant;
