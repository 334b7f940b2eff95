use std::marker::PhantomData;

/// Bresenham line between two grid points, both endpoints included.
///
/// The line steps diagonally when both coordinates advance at once, so
/// consecutive points are always 8-adjacent.
///
/// ```
/// use fov::Line;
///
/// let line: Vec<[i32; 2]> = Line::new([0, 0], [4, 2]).collect();
/// assert_eq!(line, vec![[0, 0], [1, 1], [2, 1], [3, 2], [4, 2]]);
/// ```
#[derive(Clone, Debug)]
pub struct Line<V> {
    p: [i32; 2],
    end: [i32; 2],
    step: [i32; 2],
    // Absolute x delta and negated absolute y delta.
    d: [i32; 2],
    err: i32,
    done: bool,
    phantom: PhantomData<V>,
}

impl<V: Into<[i32; 2]>> Line<V> {
    pub fn new(a: V, b: V) -> Self {
        let (a, b): ([i32; 2], [i32; 2]) = (a.into(), b.into());
        let d = [(b[0] - a[0]).abs(), -(b[1] - a[1]).abs()];

        Line {
            p: a,
            end: b,
            step: [(b[0] - a[0]).signum(), (b[1] - a[1]).signum()],
            d,
            err: d[0] + d[1],
            done: false,
            phantom: PhantomData,
        }
    }
}

impl<V: From<[i32; 2]>> Iterator for Line<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let ret = self.p;
        if self.p == self.end {
            self.done = true;
        } else {
            let e2 = 2 * self.err;
            if e2 >= self.d[1] {
                self.err += self.d[1];
                self.p[0] += self.step[0];
            }
            if e2 <= self.d[0] {
                self.err += self.d[0];
                self.p[1] += self.step[1];
            }
        }

        Some(V::from(ret))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn line(a: [i32; 2], b: [i32; 2]) -> Vec<[i32; 2]> {
        Line::new(a, b).collect()
    }

    #[test]
    fn degenerate() {
        assert_eq!(line([3, 3], [3, 3]), vec![[3, 3]]);
    }

    #[test]
    fn axis_aligned() {
        assert_eq!(line([0, 0], [3, 0]), vec![[0, 0], [1, 0], [2, 0], [3, 0]]);
        assert_eq!(line([0, 2], [0, 0]), vec![[0, 2], [0, 1], [0, 0]]);
    }

    #[test]
    fn steps_are_adjacent() {
        for end in [[7, 3], [-5, 2], [2, -9], [-4, -4], [0, 6]] {
            let pts = line([0, 0], end);
            assert_eq!(pts.first(), Some(&[0, 0]));
            assert_eq!(pts.last(), Some(&end));
            for w in pts.windows(2) {
                let dx = (w[1][0] - w[0][0]).abs();
                let dy = (w[1][1] - w[0][1]).abs();
                assert!(dx <= 1 && dy <= 1 && dx + dy > 0);
            }
        }
    }

    #[test]
    fn lattice_prefix() {
        // A line that passes exactly through a lattice point walks the same
        // cells up to that point as the line ending there.
        let long = line([0, 0], [6, 3]);
        let short = line([0, 0], [2, 1]);
        assert_eq!(&long[..short.len()], &short[..]);
        let mid = line([0, 0], [4, 2]);
        assert_eq!(&long[..mid.len()], &mid[..]);
    }
}
