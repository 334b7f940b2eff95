use std::{collections::HashSet, hash::Hash};

use crate::Line;

/// Terrain interface for raycasting field of view.
pub trait Sight {
    type Vector: From<[i32; 2]> + Into<[i32; 2]> + Copy + Eq + Hash;

    /// Width and height of the area, valid cells are `[0, w) x [0, h)`.
    fn dimensions(&self) -> [i32; 2];

    /// Whether the cell lets sight and movement through.
    fn is_open(&self, p: Self::Vector) -> bool;

    /// Whether `p` is in line of sight from `origin`.
    fn is_visible(&self, origin: Self::Vector, p: Self::Vector) -> bool;
}

/// Compute the set of cells visible from origin.
///
/// Rays are cast from origin to every cell on the edge of the area. Each ray
/// adds cells until line of sight is lost, the closed cell that ends the ray
/// is included so that walls bounding the visible area show up.
///
/// A second pass then looks at every visible open cell and reveals the closed
/// orthogonal neighbors whose faces point towards the viewer. Strict
/// raycasting can miss wall cells seen at a grazing angle, this fills those
/// in.
pub fn field_of_view<S: Sight>(s: &S, origin: S::Vector) -> HashSet<S::Vector> {
    let [w, h] = s.dimensions();
    let mut ret = HashSet::new();
    ret.insert(origin);

    for [x, y] in edge_cells(w, h) {
        for p in Line::new(origin, S::Vector::from([x, y])) {
            if !s.is_visible(origin, p) {
                if !s.is_open(p) {
                    ret.insert(p);
                }
                break;
            }
            ret.insert(p);
        }
    }

    reveal_corners(s, origin, &mut ret);
    ret
}

fn edge_cells(w: i32, h: i32) -> impl Iterator<Item = [i32; 2]> {
    (0..w)
        .flat_map(move |x| [[x, 0], [x, h - 1]])
        .chain((1..h - 1).flat_map(move |y| [[0, y], [w - 1, y]]))
}

fn reveal_corners<S: Sight>(
    s: &S,
    origin: S::Vector,
    fov: &mut HashSet<S::Vector>,
) {
    let [w, h] = s.dimensions();
    let o: [i32; 2] = origin.into();

    // Cells whose status has been settled by this pass. Open cells are never
    // revealed here and revealed walls don't need a second look.
    let mut decided = HashSet::new();

    let cells: Vec<S::Vector> =
        fov.iter().copied().filter(|&p| s.is_open(p)).collect();

    for cell in cells {
        let c: [i32; 2] = cell.into();
        let delta = [c[0] - o[0], c[1] - o[1]];

        for d in [[-1, 0], [1, 0], [0, -1], [0, 1]] {
            let n = [c[0] + d[0], c[1] + d[1]];
            if n[0] < 0 || n[1] < 0 || n[0] >= w || n[1] >= h {
                continue;
            }
            let n = S::Vector::from(n);
            if decided.contains(&n) || fov.contains(&n) {
                continue;
            }

            if s.is_open(n) {
                decided.insert(n);
                continue;
            }

            // The neighbor must not lie between the cell and the viewer along
            // either axis.
            if d[0] * delta[0] >= 0 && d[1] * delta[1] >= 0 {
                decided.insert(n);
                fov.insert(n);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Plain map where sight follows the same Bresenham lines as the rays.
    struct Map {
        w: i32,
        h: i32,
        walls: HashSet<[i32; 2]>,
    }

    impl Map {
        fn new(s: &str) -> Self {
            let mut walls = HashSet::new();
            let (mut w, mut h) = (0, 0);
            for (y, line) in s.trim().lines().enumerate() {
                for (x, c) in line.trim().chars().enumerate() {
                    if c == '#' {
                        walls.insert([x as i32, y as i32]);
                    }
                    w = w.max(x as i32 + 1);
                }
                h = y as i32 + 1;
            }
            Map { w, h, walls }
        }
    }

    impl Sight for Map {
        type Vector = [i32; 2];

        fn dimensions(&self) -> [i32; 2] {
            [self.w, self.h]
        }

        fn is_open(&self, p: [i32; 2]) -> bool {
            !self.walls.contains(&p)
        }

        fn is_visible(&self, origin: [i32; 2], p: [i32; 2]) -> bool {
            Line::new(origin, p).all(|q| self.is_open(q))
        }
    }

    #[test]
    fn open_room() {
        let map = Map::new(
            "
            #######
            #.....#
            #.....#
            #.....#
            #.....#
            #.....#
            #######",
        );

        let fov = field_of_view(&map, [3, 3]);
        assert!(fov.contains(&[3, 3]));
        // Everything in a convex room is visible.
        for y in 0..7 {
            for x in 0..7 {
                if (x == 0 || x == 6) && (y == 0 || y == 6) {
                    // Corners may or may not show up.
                    continue;
                }
                assert!(fov.contains(&[x, y]), "{x},{y} not in fov");
            }
        }
    }

    #[test]
    fn walls_hide_what_is_behind_them() {
        let map = Map::new(
            "
            #########
            #...#...#
            #...#...#
            #...#...#
            #########",
        );

        let fov = field_of_view(&map, [1, 2]);
        assert!(fov.contains(&[4, 2]));
        assert!(!fov.contains(&[6, 2]));
        assert!(!fov.contains(&[8, 2]));
    }

    #[test]
    fn corridor_side_walls() {
        let map = Map::new(
            "
            ##########
            #........#
            ##########",
        );

        let fov = field_of_view(&map, [1, 1]);
        // The far end corners only touch the corridor diagonally.
        for x in 0..9 {
            assert!(fov.contains(&[x, 0]), "top wall {x} missing");
            assert!(fov.contains(&[x, 2]), "bottom wall {x} missing");
        }
    }
}
