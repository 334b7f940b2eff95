use rand::Rng;
use util::dijkstra_map;

use crate::prelude::*;

impl Board {
    /// Find a path using board passability, see [`util::find_path`].
    pub fn get_path(
        &self,
        start: IVec2,
        end: IVec2,
        cost: impl FnMut(IVec2) -> f32,
        rng: &mut impl Rng,
    ) -> Vec<IVec2> {
        util::find_path(
            self.dimensions(),
            start,
            end,
            |p| self.passable(p),
            cost,
            rng,
        )
    }
}

impl Runtime {
    /// Distances from unexplored floor to every passable cell connected to
    /// `start`.
    ///
    /// Empty if there's nothing left to explore.
    pub fn autoexplore_map(&self, start: IVec2) -> HashMap<IVec2, usize> {
        let ret: HashMap<IVec2, usize> = dijkstra_map(
            |&p: &IVec2| self.board.adjacent_passable(p),
            self.board.points().filter(|&p| {
                self.board.passable(p) && !self.board.is_revealed(p)
            }),
        )
        .collect();

        if !ret.contains_key(&start) {
            // Map must reach the starting point.
            Default::default()
        } else {
            ret
        }
    }

    /// Pick a command for the player when there's nobody at the controls.
    ///
    /// Fight visible monsters, explore the map and wait when there's nothing
    /// else to do.
    pub fn autopilot(&mut self) -> Action {
        let Some(player) = self.live_player() else {
            return Action::Pass;
        };
        let Some(pos) = player.pos(self) else {
            return Action::Pass;
        };

        // Go after the nearest visible monster.
        let mut enemies: Vec<(i32, IVec2)> = self
            .visible_monsters()
            .filter_map(|m| m.pos(self).map(|p| ((p - pos).chess_len(), p)))
            .collect();
        enemies.sort_by_key(|&(d, p)| (d, p.y, p.x));
        if let Some(&(dist, target)) = enemies.first() {
            if dist <= 1 {
                return Action::Step(target - pos);
            }
            let path = self.board.get_path(pos, target, |_| 1.0, &mut self.rng);
            if let Some(&next) = path.first() {
                if next != target {
                    return Action::Step(next - pos);
                }
            }
        }

        if player.hp(self) < player.max_hp(self) / 2 {
            return Action::Pass;
        }

        // Walk downhill on the exploration map.
        let map = self.autoexplore_map(pos);
        if let Some(&here) = map.get(&pos) {
            if let Some(next) = self
                .board
                .adjacent_passable(pos)
                .into_iter()
                .filter(|&p| self.board.occupant_at(p).is_none())
                .filter(|p| map.get(p).map_or(false, |&d| d < here))
                .min_by_key(|&p| (map[&p], p.y, p.x))
            {
                return Action::Step(next - pos);
            }
        }

        Action::Pass
    }
}
