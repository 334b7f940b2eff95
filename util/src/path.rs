use std::{collections::VecDeque, hash::Hash};

use glam::IVec2;
use ordered_float::OrderedFloat;
use rand::prelude::*;

use crate::{HashSet, VecExt, DIR_4};

/// Find a 4-connected path from `start` to `end` on a `bounds` sized grid.
///
/// `cost` gives the cost of entering a cell. The destination is always
/// treated as passable so paths can lead up to an occupied or closed target.
/// Neighbors are expanded in a random order drawn from `rng`, so equally good
/// paths get picked evenly.
///
/// The returned path does not include `start`. It is empty if there is no
/// path or if `start` and `end` are the same cell.
pub fn find_path<R: Rng + ?Sized>(
    bounds: IVec2,
    start: IVec2,
    end: IVec2,
    mut is_passable: impl FnMut(IVec2) -> bool,
    mut cost: impl FnMut(IVec2) -> f32,
    rng: &mut R,
) -> Vec<IVec2> {
    if start == end {
        return Vec::new();
    }

    let in_bounds =
        |p: IVec2| p.x >= 0 && p.y >= 0 && p.x < bounds.x && p.y < bounds.y;
    if !in_bounds(start) || !in_bounds(end) {
        return Vec::new();
    }

    let ret = pathfinding::directed::astar::astar(
        &start,
        |&p| {
            let mut ns: Vec<(IVec2, OrderedFloat<f32>)> = DIR_4
                .iter()
                .map(|&d| p + d)
                .filter(|&q| in_bounds(q) && (q == end || is_passable(q)))
                .map(|q| (q, OrderedFloat(cost(q).max(0.0))))
                .collect();
            ns.shuffle(&mut *rng);
            ns
        },
        |&p| OrderedFloat((end - p).taxi_len() as f32),
        |&p| p == end,
    );

    match ret {
        Some((mut path, _)) => {
            path.remove(0);
            path
        }
        None => Vec::new(),
    }
}

/// Generate a shortest paths map on a grid according to a neighbors function.
pub fn dijkstra_map<'a, T, I>(
    mut neighbors: impl FnMut(&T) -> I + 'a,
    starts: impl IntoIterator<Item = T>,
) -> impl Iterator<Item = (T, usize)> + 'a
where
    T: Clone + Eq + Hash + 'a,
    I: IntoIterator<Item = T>,
{
    let mut edge: VecDeque<(T, usize)> =
        starts.into_iter().map(|s| (s, 0)).collect();
    let mut seen = HashSet::default();

    std::iter::from_fn(move || {
        // Candidates are consumed first-in, first-out, so the first time a
        // node is popped its length is the shortest path length.
        while let Some((node, len)) = edge.pop_front() {
            if !seen.contains(&node) {
                seen.insert(node.clone());
                for n in neighbors(&node) {
                    edge.push_back((n, len + 1));
                }
                return Some((node, len));
            }
        }
        None
    })
}

/// Combinator for limiting flood fill to cells at most `n` steps away.
pub fn within_range<T>(n: usize) -> impl FnMut(&(T, usize)) -> bool {
    move |&(_, k)| k <= n
}

#[cfg(test)]
mod test {
    use quickcheck_macros::quickcheck;
    use rand::SeedableRng;

    use glam::ivec2;

    use super::*;
    use crate::GameRng;

    const SIZE: IVec2 = IVec2::new(16, 12);

    fn clamp(x: u8, y: u8) -> IVec2 {
        ivec2(x as i32 % SIZE.x, y as i32 % SIZE.y)
    }

    #[quickcheck]
    fn open_grid_paths_are_manhattan(a: (u8, u8), b: (u8, u8), seed: u64) {
        let (a, b) = (clamp(a.0, a.1), clamp(b.0, b.1));
        let mut rng = GameRng::seed_from_u64(seed);
        let path = find_path(SIZE, a, b, |_| true, |_| 1.0, &mut rng);

        assert_eq!(path.len() as i32, (b - a).taxi_len());
        if a != b {
            assert_eq!(path.last(), Some(&b));
            assert!((path[0] - a).is_adjacent());
            for w in path.windows(2) {
                assert!((w[1] - w[0]).is_adjacent());
            }
        }
    }

    #[test]
    fn enclosed_destination() {
        let walls: HashSet<IVec2> =
            [ivec2(4, 3), ivec2(6, 3), ivec2(5, 2), ivec2(5, 4)]
                .into_iter()
                .collect();
        let mut rng = GameRng::seed_from_u64(1);

        // Walled off cell can't be reached.
        let path = find_path(
            SIZE,
            ivec2(0, 0),
            ivec2(5, 3),
            |p| !walls.contains(&p),
            |_| 1.0,
            &mut rng,
        );
        assert!(path.is_empty());

        // A wall cell as the destination itself is fine.
        let path = find_path(
            SIZE,
            ivec2(0, 3),
            ivec2(4, 3),
            |p| !walls.contains(&p),
            |_| 1.0,
            &mut rng,
        );
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn costs_steer_the_path() {
        let mut rng = GameRng::seed_from_u64(2);
        // Make the straight row expensive, the path should detour.
        let path = find_path(
            SIZE,
            ivec2(0, 5),
            ivec2(6, 5),
            |_| true,
            |p| if p.y == 5 && p.x != 6 { 10.0 } else { 1.0 },
            &mut rng,
        );
        assert_eq!(path.last(), Some(&ivec2(6, 5)));
        assert!(path.iter().filter(|p| p.y == 5).count() <= 1);
    }

    #[test]
    fn start_is_end() {
        let mut rng = GameRng::seed_from_u64(3);
        let p = ivec2(3, 3);
        assert!(find_path(SIZE, p, p, |_| true, |_| 1.0, &mut rng).is_empty());
    }

    #[test]
    fn flood_fill_range() {
        let cells: Vec<(IVec2, usize)> = dijkstra_map(
            |&p: &IVec2| {
                DIR_4.into_iter().map(move |d| p + d).filter(|q| {
                    q.x >= 0 && q.y >= 0 && q.x < SIZE.x && q.y < SIZE.y
                })
            },
            [ivec2(5, 5)],
        )
        .take_while(within_range(2))
        .collect();

        // Diamond of radius 2.
        assert_eq!(cells.len(), 13);
        for (p, n) in cells {
            assert_eq!((p - ivec2(5, 5)).taxi_len() as usize, n);
        }
    }
}
