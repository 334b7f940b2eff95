//! Tile grid with occupancy and sight caches.

use std::{cell::RefCell, fmt};

use anyhow::bail;
use rand::{seq::SliceRandom, Rng};
use util::StrExt;

use crate::{field::Field, prelude::*};

#[derive(Clone, Default, Debug, Eq, PartialEq)]
pub struct Tile {
    pub wall: bool,
    /// The player has seen this tile at some point.
    pub revealed: bool,
    /// Nonzero for stairs, the level the stairs lead to.
    pub stair_level: i32,
    /// Items lying on the tile, oldest first.
    pub items: Vec<Entity>,
}

/// The dungeon level.
///
/// Owns the terrain. Actors live in the runtime ECS, the board only keeps
/// non-owning handles to them in the occupancy cache and item piles.
pub struct Board {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    occupancy: Vec<Option<Entity>>,
    pub(crate) fields: HashMap<IVec2, Field>,
    /// Line of sight results, indexed by the canonical origin cell and keyed
    /// by the other endpoint.
    pub(crate) los: RefCell<Vec<HashMap<IVec2, bool>>>,
}

impl Board {
    /// Create an open board with no walls.
    pub fn new(width: i32, height: i32) -> Self {
        assert!(
            width > 0 && height > 0,
            "Board::new: bad size {width}x{height}"
        );
        let n = (width * height) as usize;
        Board {
            width,
            height,
            tiles: vec![Default::default(); n],
            occupancy: vec![None; n],
            fields: Default::default(),
            los: RefCell::new(vec![Default::default(); n]),
        }
    }

    /// Parse a board from an ASCII map.
    ///
    /// `#` is wall, `.` is floor and `>` is stairs down. Cells missing from
    /// short lines are walls.
    pub fn from_ascii(map: &str) -> anyhow::Result<Self> {
        let cells: Vec<(IVec2, char)> = map.char_grid().collect();
        let Some(width) = cells.iter().map(|(p, _)| p.x + 1).max() else {
            bail!("Board::from_ascii: empty map");
        };
        let height = cells.iter().map(|(p, _)| p.y + 1).max().unwrap_or(0);

        let mut ret = Board::new(width, height);
        for t in ret.tiles.iter_mut() {
            t.wall = true;
        }

        for (p, c) in cells {
            let t = ret.tile_mut(p);
            match c {
                '#' => t.wall = true,
                '.' => t.wall = false,
                '>' => {
                    t.wall = false;
                    t.stair_level = 1;
                }
                c => bail!("Board::from_ascii: unknown map char {c:?} at {p}"),
            }
        }

        Ok(ret)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn dimensions(&self) -> IVec2 {
        ivec2(self.width, self.height)
    }

    pub fn in_bounds(&self, p: IVec2) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.width && p.y < self.height
    }

    pub(crate) fn idx(&self, p: IVec2) -> usize {
        assert!(self.in_bounds(p), "Board: position {p} out of bounds");
        (p.x + p.y * self.width) as usize
    }

    pub fn tile(&self, p: IVec2) -> &Tile {
        &self.tiles[self.idx(p)]
    }

    fn tile_mut(&mut self, p: IVec2) -> &mut Tile {
        let i = self.idx(p);
        &mut self.tiles[i]
    }

    pub fn points(&self) -> impl Iterator<Item = IVec2> {
        let (w, h) = (self.width, self.height);
        (0..h).flat_map(move |y| (0..w).map(move |x| ivec2(x, y)))
    }

    pub fn set_wall(&mut self, p: IVec2, wall: bool) {
        if self.tile(p).wall != wall {
            self.tile_mut(p).wall = wall;
            self.clear_los_cache();
        }
    }

    /// Out of bounds cells are impassable.
    pub fn passable(&self, p: IVec2) -> bool {
        self.in_bounds(p) && !self.tile(p).wall
    }

    pub fn reveal(&mut self, p: IVec2) {
        self.tile_mut(p).revealed = true;
    }

    pub fn is_revealed(&self, p: IVec2) -> bool {
        self.in_bounds(p) && self.tile(p).revealed
    }

    /// Orthogonally adjacent passable cells.
    pub fn adjacent_passable(&self, p: IVec2) -> Vec<IVec2> {
        DIR_4
            .iter()
            .map(|&d| p + d)
            .filter(|&q| self.passable(q))
            .collect()
    }

    /// In-bounds points at chessboard distance `1..=radius` from center.
    pub fn points_in_radius(
        &self,
        center: IVec2,
        radius: i32,
    ) -> impl Iterator<Item = IVec2> + '_ {
        (-radius..=radius)
            .flat_map(move |y| (-radius..=radius).map(move |x| ivec2(x, y)))
            .filter(|d| *d != IVec2::ZERO)
            .map(move |d| center + d)
            .filter(|&p| self.in_bounds(p))
    }

    /// Pick a random passable, unoccupied cell.
    pub fn random_pos(&self, rng: &mut impl Rng) -> Option<IVec2> {
        let free: Vec<IVec2> = self
            .points()
            .filter(|&p| self.passable(p) && self.occupant_at(p).is_none())
            .collect();
        free.choose(rng).copied()
    }

    pub fn occupant_at(&self, p: IVec2) -> Option<Entity> {
        if !self.in_bounds(p) {
            return None;
        }
        self.occupancy[self.idx(p)]
    }

    pub fn set_occupant(&mut self, p: IVec2, e: Entity) {
        let i = self.idx(p);
        self.occupancy[i] = Some(e);
    }

    pub fn clear_occupant(&mut self, p: IVec2) {
        let i = self.idx(p);
        self.occupancy[i] = None;
    }

    /// Rewrite the whole occupancy cache from actor positions.
    pub fn rebuild_occupancy(
        &mut self,
        actors: impl IntoIterator<Item = (Entity, IVec2)>,
    ) {
        self.occupancy.iter_mut().for_each(|c| *c = None);
        for (e, p) in actors {
            let i = self.idx(p);
            debug_assert!(
                self.occupancy[i].is_none(),
                "Board::rebuild_occupancy: two actors at {p}"
            );
            self.occupancy[i] = Some(e);
        }
    }

    pub fn place_item(&mut self, p: IVec2, e: Entity) {
        self.tile_mut(p).items.push(e);
    }

    /// Remove and return all items on a tile.
    pub fn take_items(&mut self, p: IVec2) -> Vec<Entity> {
        std::mem::take(&mut self.tile_mut(p).items)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            for x in 0..self.width {
                let t = self.tile(ivec2(x, y));
                let c = if t.wall {
                    '#'
                } else if t.stair_level != 0 {
                    '>'
                } else {
                    '.'
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    const MAP: &str = "
        #######
        #..#..#
        #.....#
        #..>..#
        #######";

    #[test]
    fn parse_map() {
        let b = Board::from_ascii(MAP).unwrap();
        assert_eq!(b.dimensions(), ivec2(7, 5));
        assert!(!b.passable(ivec2(0, 0)));
        assert!(b.passable(ivec2(1, 1)));
        assert!(!b.passable(ivec2(3, 1)));
        assert_eq!(b.tile(ivec2(3, 3)).stair_level, 1);
        assert!(!b.passable(ivec2(-1, 2)));
        assert!(!b.passable(ivec2(7, 2)));

        assert_eq!(
            b.to_string(),
            "#######\n#..#..#\n#.....#\n#..>..#\n#######\n"
        );
    }

    #[test]
    fn bad_maps() {
        assert!(Board::from_ascii("").is_err());
        assert!(Board::from_ascii("#.x#").is_err());
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_tile() {
        let b = Board::new(3, 3);
        b.tile(ivec2(3, 0));
    }

    #[test]
    fn adjacency() {
        let b = Board::from_ascii(MAP).unwrap();
        let mut adj = b.adjacent_passable(ivec2(2, 1));
        adj.sort_by_key(|p| (p.y, p.x));
        assert_eq!(adj, vec![ivec2(1, 1), ivec2(2, 2)]);

        assert_eq!(b.points_in_radius(ivec2(0, 0), 1).count(), 3);
        assert_eq!(b.points_in_radius(ivec2(3, 2), 2).count(), 24);
    }

    #[test]
    fn item_piles() {
        let mut b = Board::from_ascii(MAP).unwrap();
        let mut world = hecs::World::new();
        let (a, c) = (Entity(world.spawn(())), Entity(world.spawn(())));

        b.place_item(ivec2(1, 1), a);
        b.place_item(ivec2(1, 1), c);
        assert_eq!(b.tile(ivec2(1, 1)).items, vec![a, c]);
        assert_eq!(b.take_items(ivec2(1, 1)), vec![a, c]);
        assert!(b.tile(ivec2(1, 1)).items.is_empty());
    }
}
