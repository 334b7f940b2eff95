pub use crate::{msg, Action, Board, Entity, Instant, Runtime, Status};
pub use glam::{ivec2, IVec2};
pub use util::{HashMap, HashSet, Odds, RngExt, VecExt, DIR_4, DIR_8};
