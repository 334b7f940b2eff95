use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};

/// Construct a throwaway random number generator seeded by a noise value.
///
/// Good for short-term use in immutable contexts given a varying source of
/// noise like map position coordinates.
pub fn srng(seed: &(impl Hash + ?Sized)) -> XorShiftRng {
    let mut h = crate::FastHasher::default();
    seed.hash(&mut h);
    XorShiftRng::seed_from_u64(h.finish())
}

/// Deciban log-odds type.
///
/// Expresses a probability, but in a form that is easier to reason about and
/// calculate with in some conditions. Zero is even odds, every +10 makes
/// success ten times likelier than failure.
///
/// See <https://en.wikipedia.org/wiki/Hartley_(unit)>
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Serialize, Deserialize)]
pub struct Odds(pub i32);

impl Odds {
    pub fn prob(self) -> f32 {
        1.0 - 1.0 / (1.0 + 10.0f32.powf(self.0 as f32 / 10.0))
    }
}

impl Distribution<bool> for Odds {
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen_range(0.0..1.0) < self.prob()
    }
}

pub trait RngExt {
    fn one_chance_in(&mut self, n: usize) -> bool;

    /// Succeed `x` times out of `y`. Always succeeds if `x >= y`.
    fn x_in_y(&mut self, x: i32, y: i32) -> bool;
}

impl<T: Rng + ?Sized> RngExt for T {
    fn one_chance_in(&mut self, n: usize) -> bool {
        if n == 0 {
            return false;
        }
        self.gen_range(0..n) == 0
    }

    fn x_in_y(&mut self, x: i32, y: i32) -> bool {
        if x <= 0 {
            return false;
        }
        if x >= y {
            return true;
        }
        self.gen_range(0..y) < x
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn odds() {
        assert_eq!(Odds(0).prob(), 0.5);
        assert!((Odds(10).prob() - 10.0 / 11.0).abs() < 1e-4);
        assert!(Odds(-10).prob() < 0.1);

        let mut rng = srng(&7);
        let hits = (0..10_000).filter(|_| rng.sample(Odds(10))).count();
        assert!((8700..9500).contains(&hits), "{hits}");
    }

    #[test]
    fn chances() {
        let mut rng = srng(&123);
        assert!(!rng.one_chance_in(0));
        assert!(rng.one_chance_in(1));
        assert!(rng.x_in_y(5, 5));
        assert!(!rng.x_in_y(0, 5));

        let hits = (0..10_000).filter(|_| rng.x_in_y(1, 4)).count();
        assert!((2000..3000).contains(&hits), "{hits}");
    }

    #[test]
    fn srng_is_stable() {
        assert_eq!(
            srng(&(1, 2)).gen_range(0..1000),
            srng(&(1, 2)).gen_range(0..1000)
        );
    }
}
