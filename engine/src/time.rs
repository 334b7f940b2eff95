use serde::{Deserialize, Serialize};

/// An opaque representation of a time instant.
///
/// The unit of time is a subtick, `SUBTICK_ENERGY` worth of elapsed energy.
#[derive(
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    Serialize,
    Deserialize,
)]
pub struct Instant(pub(crate) i64);

impl Instant {
    /// Number of subticks since the start of the game.
    pub fn ticks(&self) -> i64 {
        self.0
    }
}

impl std::ops::AddAssign<i64> for Instant {
    fn add_assign(&mut self, rhs: i64) {
        self.0 += rhs;
    }
}
