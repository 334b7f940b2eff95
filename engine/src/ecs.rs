//! Entity components.
//!
//! Components follow the convention that the default value is the default
//! state, `Entity::set` removes components that get set to default.

use std::collections::{BTreeMap, VecDeque};

use derive_more::{Deref, DerefMut};

use crate::{prelude::*, MonsterSpec};

/// What kind of thing the entity is, determines how it acts.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Role {
    #[default]
    Item,
    Player,
    Monster,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Name(pub String);

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Icon(pub char);

/// Position of an actor on the board. Items on the floor are kept in tile
/// piles instead and have no position.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Pos(pub Option<IVec2>);

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Health {
    pub hp: i32,
    pub max_hp: i32,
}

/// Action budget, acting spends it and passing time replenishes it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Energy(pub i32);

/// Base speed, `NORMAL_SPEED` is one action per baseline player action.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Speed(pub i32);

/// Status effects and their remaining durations in subticks.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deref, DerefMut)]
pub struct Buffs(pub BTreeMap<Status, i32>);

/// Poison points, drained as damage over time.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Poison(pub i32);

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    /// Deciban odds for landing an attack.
    pub hit: i32,
    /// Deciban odds for evading an attack.
    pub ev: i32,
    /// Maximum damage of a successful attack.
    pub dmg: i32,
    /// Bonus for sneaking past monsters.
    pub stealth: i32,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Species(pub Option<&'static MonsterSpec>);

/// Number of turns the entity has taken.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Turns(pub u64);

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Alertness {
    /// Wandering around, hasn't noticed the player.
    #[default]
    Idle,
    /// Sees the player and is going after them.
    Aware,
    /// Lost sight of the player and is trying to find them again.
    Tracking,
    /// Heard something and is going to check it out.
    TrackingSound,
}

/// Monster AI state.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Mind {
    pub state: Alertness,
    pub target: Option<IVec2>,
    /// Cached path towards target.
    pub path: VecDeque<IVec2>,
    /// Remaining turns to keep tracking the player.
    pub patience: i32,
    /// Turns to wander around before the next tracking attempt.
    pub pursue_check: i32,
    /// Remaining interest in the last heard noise.
    pub sound_focus: i32,
}

/// Entity component system. Stores all the data of game entities.
#[derive(Default, Deref, DerefMut)]
pub(crate) struct Ecs(pub(crate) hecs::World);
