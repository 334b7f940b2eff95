//! Line of sight and field of view on the board.

use fov::Line;

use crate::prelude::*;

/// Order a pair of points so that the lexicographically smaller one comes
/// first.
fn canonical(a: IVec2, b: IVec2) -> (IVec2, IVec2) {
    if (a.x, a.y) <= (b.x, b.y) {
        (a, b)
    } else {
        (b, a)
    }
}

fn gcd(a: i32, b: i32) -> i32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

impl Board {
    /// Symmetric line of sight test.
    ///
    /// Walls anywhere on the line block sight, including at the endpoints. A
    /// diagonal step between two walls is blocked, a diagonal step past a
    /// single wall corner is not.
    pub fn has_line_of_sight(&self, a: IVec2, b: IVec2) -> bool {
        if a == b {
            return true;
        }
        if !self.in_bounds(a) || !self.in_bounds(b) {
            return false;
        }

        let (a, b) = canonical(a, b);
        if let Some(&ret) = self.los.borrow()[self.idx(a)].get(&b) {
            return ret;
        }
        self.trace_los(a, b)
    }

    /// Walk the line from the canonical origin and memoize the result along
    /// with the results for every lattice point of the segment passed on the
    /// way.
    ///
    /// The line walk up to a lattice point `a + j * step` is exactly the line
    /// walk from `a` to that point, so the partial results are the same as
    /// computing those pairs from scratch.
    fn trace_los(&self, a: IVec2, b: IVec2) -> bool {
        let d = b - a;
        let n = gcd(d.x.abs(), d.y.abs());
        let step = d / n;

        let mut cache = self.los.borrow_mut();
        let memo = &mut cache[self.idx(a)];

        let mut prev = a;
        // Lattice points passed so far.
        let mut j = 0;
        for p in Line::new(a, b) {
            if !self.passable(p) || self.corner_blocked(prev, p) {
                for k in (j + 1)..=n {
                    memo.insert(a + step * k, false);
                }
                return false;
            }

            if p == a + step * (j + 1) {
                j += 1;
                memo.insert(p, true);
            }
            prev = p;
        }

        debug_assert_eq!(j, n);
        true
    }

    /// Diagonal step squeezes between two closed corners.
    pub(crate) fn corner_blocked(&self, prev: IVec2, p: IVec2) -> bool {
        let d = p - prev;
        d.x != 0
            && d.y != 0
            && !self.passable(prev + ivec2(d.x, 0))
            && !self.passable(prev + ivec2(0, d.y))
    }

    pub fn clear_los_cache(&self) {
        let mut cache = self.los.borrow_mut();
        if cache.iter().all(|c| c.is_empty()) {
            return;
        }
        for c in cache.iter_mut() {
            c.clear();
        }
    }

    /// Whether fields along the line from `a` to `b` are too thick to see
    /// through.
    ///
    /// The origin cell doesn't count. Sight is blocked once a run of
    /// consecutive field cells is as long as the lowest transparency seen so
    /// far.
    pub fn field_blocks_view(&self, a: IVec2, b: IVec2) -> bool {
        let mut run = 0;
        let mut min_transparency = i32::MAX;

        for p in Line::new(a, b).skip(1) {
            if let Some(f) = self.field_at(p) {
                run += 1;
                min_transparency = min_transparency.min(f.transparency);
                if run >= min_transparency {
                    return true;
                }
            } else {
                run = 0;
            }
        }
        false
    }

    /// Line of sight that also has no actors in the way.
    ///
    /// The endpoint may be occupied, as is the case when aiming at someone.
    pub fn has_clear_path(&self, a: IVec2, b: IVec2) -> bool {
        if !self.has_line_of_sight(a, b) {
            return false;
        }

        let open = |p: IVec2| self.passable(p) && self.occupant_at(p).is_none();

        let mut prev = a;
        for p in Line::new(a, b).skip(1) {
            let d = p - prev;
            if d.x != 0
                && d.y != 0
                && !open(prev + ivec2(d.x, 0))
                && !open(prev + ivec2(0, d.y))
            {
                return false;
            }
            if p == b {
                break;
            }
            if !open(p) {
                return false;
            }
            prev = p;
        }
        true
    }

    /// Cells visible from origin.
    pub fn fov(&self, origin: IVec2) -> HashSet<IVec2> {
        fov::field_of_view(self, origin).into_iter().collect()
    }
}

impl fov::Sight for Board {
    type Vector = IVec2;

    fn dimensions(&self) -> [i32; 2] {
        [self.width(), self.height()]
    }

    fn is_open(&self, p: IVec2) -> bool {
        self.passable(p)
    }

    fn is_visible(&self, origin: IVec2, p: IVec2) -> bool {
        self.has_line_of_sight(origin, p)
    }
}
