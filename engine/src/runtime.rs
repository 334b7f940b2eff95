use std::cmp::Reverse;

use rand::{seq::SliceRandom, Rng, SeedableRng};
use util::GameRng;

use crate::{
    ecs::*, prelude::*, FieldKind, MessageLog, MonsterSpec, Noise,
    NORMAL_SPEED, SUBTICK_ENERGY,
};

/// Parameters for starting a new game.
#[derive(Clone, Debug, Default)]
pub struct WorldSpec {
    pub seed: u64,
    /// ASCII map, see [`Board::from_ascii`].
    pub map: String,
}

/// Main data container for game engine runtime.
pub struct Runtime {
    now: Instant,
    pub(crate) player: Option<Entity>,
    pub(crate) board: Board,
    pub(crate) ecs: Ecs,
    /// Actors in the order they were spawned.
    pub(crate) live: Vec<Entity>,
    pub(crate) noises: Vec<Noise>,
    log: MessageLog,
    pub(crate) rng: GameRng,
    /// Elapsed energy that hasn't added up to a full subtick yet.
    subtick_energy: i32,
    /// Cells the player currently sees.
    fov: HashSet<IVec2>,
}

impl AsRef<Runtime> for Runtime {
    fn as_ref(&self) -> &Runtime {
        self
    }
}

impl AsMut<Runtime> for Runtime {
    fn as_mut(&mut self) -> &mut Runtime {
        self
    }
}

impl Runtime {
    pub fn new(spec: &WorldSpec) -> anyhow::Result<Self> {
        let board = Board::from_ascii(&spec.map)?;
        log::info!(
            "Runtime::new: {}x{} map, seed {}",
            board.width(),
            board.height(),
            spec.seed
        );

        Ok(Runtime {
            now: Default::default(),
            player: None,
            board,
            ecs: Default::default(),
            live: Default::default(),
            noises: Default::default(),
            log: Default::default(),
            rng: GameRng::seed_from_u64(spec.seed),
            subtick_energy: 0,
            fov: Default::default(),
        })
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Access the persistent engine random number generator.
    pub fn rng(&mut self) -> &mut impl Rng {
        &mut self.rng
    }

    /// Random passable cell with nobody in it.
    pub fn random_free_pos(&mut self) -> Option<IVec2> {
        self.board.random_pos(&mut self.rng)
    }

    pub fn log_msg(&mut self, text: impl Into<String>) {
        self.log.push(text);
    }

    /// Last `n` lines of the message log, oldest first.
    pub fn messages(&self, n: usize) -> Vec<String> {
        self.log.last(n)
    }

    /// Spawn the player entity, does nothing if there already is a player.
    pub fn spawn_player(&mut self, pos: IVec2) -> Entity {
        if let Some(player) = self.player {
            log::warn!("Runtime::spawn_player: player already exists");
            return player;
        }

        let player = Entity(self.ecs.spawn((
            Role::Player,
            Name("player".into()),
            Icon('@'),
            Health { hp: 20, max_hp: 20 },
            Speed(NORMAL_SPEED),
            Stats {
                hit: 5,
                ev: 2,
                dmg: 4,
                stealth: 0,
            },
        )));

        self.player = Some(player);
        self.live.push(player);
        player.place(self, pos);
        self.update_view();
        player
    }

    /// Spawn a monster from the bestiary.
    ///
    /// Panics on an unknown monster id.
    pub fn spawn_monster(&mut self, id: &str, pos: IVec2) -> Entity {
        let spec = MonsterSpec::get(id);
        // Stagger initial energies so monsters don't move in lockstep.
        let energy = self.rng.gen_range(-100..100);

        let mob = Entity(self.ecs.spawn((
            Role::Monster,
            Name(spec.name.into()),
            Icon(spec.icon),
            Health {
                hp: spec.hp,
                max_hp: spec.hp,
            },
            Speed(spec.speed),
            Stats {
                hit: spec.hit,
                ev: spec.ev,
                dmg: spec.dmg,
                stealth: 0,
            },
            Species(Some(spec)),
            Energy(energy),
        )));

        if self.board.occupant_at(pos).is_some() {
            log::warn!("Runtime::spawn_monster: {pos} is already occupied");
        }
        self.live.push(mob);
        mob.place(self, pos);
        mob
    }

    /// Spawn an item that isn't anywhere yet.
    pub fn spawn_item(&mut self, name: &str, icon: char) -> Entity {
        Entity(self.ecs.spawn((Role::Item, Name(name.into()), Icon(icon))))
    }

    pub fn player(&self) -> Option<Entity> {
        self.player
    }

    /// Player entity if it's still alive.
    pub fn live_player(&self) -> Option<Entity> {
        self.player.filter(|p| p.is_alive(self))
    }

    pub fn live_actors(&self) -> impl Iterator<Item = Entity> + '_ {
        self.live.iter().copied().filter(|e| e.is_alive(self))
    }

    pub fn live_monsters(&self) -> impl Iterator<Item = Entity> + '_ {
        self.live_actors().filter(|e| e.is_monster(self))
    }

    /// Monsters in the player's field of view.
    pub fn visible_monsters(&self) -> impl Iterator<Item = Entity> + '_ {
        self.live_monsters()
            .filter(|e| e.pos(self).map_or(false, |p| self.fov.contains(&p)))
    }

    /// Living actor at position.
    pub fn mob_at(&self, p: IVec2) -> Option<Entity> {
        self.board.occupant_at(p).filter(|e| e.is_alive(self))
    }

    /// Queue a noise, monsters hear it when the turn is resolved.
    pub fn make_noise(&mut self, pos: IVec2, loudness: i32) {
        self.noises.push(Noise { pos, loudness });
    }

    pub(crate) fn dispatch_noises(&mut self) {
        let noises = std::mem::take(&mut self.noises);
        if noises.is_empty() {
            return;
        }

        let actors: Vec<Entity> = self.live_actors().collect();
        for noise in &noises {
            for e in &actors {
                if e.is_alive(self) {
                    e.hear(self, noise);
                }
            }
        }
    }

    /// Cover an area with fog.
    pub fn spawn_fog(&mut self, origin: IVec2, radius: i32) {
        log::debug!("Runtime::spawn_fog: fog at {origin}, radius {radius}");
        self.board.set_field_radius(origin, radius, FieldKind::Fog);
        self.update_view();
    }

    /// Cells the player can see.
    pub fn fov(&self) -> &HashSet<IVec2> {
        &self.fov
    }

    /// Recompute player's field of view and reveal the seen tiles.
    pub(crate) fn update_view(&mut self) {
        let Some(pos) = self.live_player().and_then(|p| p.pos(self)) else {
            return;
        };

        let board = &self.board;
        self.fov = board
            .fov(pos)
            .into_iter()
            .filter(|&p| !board.field_blocks_view(pos, p))
            .collect();

        let seen: Vec<IVec2> = self.fov.iter().copied().collect();
        for p in seen {
            self.board.reveal(p);
        }
    }

    /// ASCII rendering of what the player knows about the map.
    pub fn player_view(&self) -> String {
        let mut ret = String::new();
        for y in 0..self.board.height() {
            let mut line = String::new();
            for x in 0..self.board.width() {
                let p = ivec2(x, y);
                let tile = self.board.tile(p);
                let c = if !tile.revealed {
                    ' '
                } else if let Some(mob) =
                    self.mob_at(p).filter(|_| self.fov.contains(&p))
                {
                    mob.icon(self)
                } else if let Some(item) = tile.items.last() {
                    item.icon(self)
                } else if tile.wall {
                    '#'
                } else if self.board.field_at(p).is_some()
                    && self.fov.contains(&p)
                {
                    '~'
                } else if tile.stair_level != 0 {
                    '>'
                } else {
                    '.'
                };
                line.push(c);
            }
            ret.push_str(line.trim_end());
            ret.push('\n');
        }
        ret
    }

    /// Run a player command and let the rest of the world catch up.
    ///
    /// Returns false if the command did nothing and no time passed.
    pub fn player_turn(&mut self, action: Action) -> bool {
        let Some(player) = self.live_player() else {
            return false;
        };

        let action = if player.has_status(self, Status::Paralyzed) {
            Action::Pass
        } else {
            action
        };

        let cost = player.execute(self, action);
        if cost == 0 {
            return false;
        }

        let elapsed = cost * NORMAL_SPEED / player.speed(self).max(1);
        self.advance(elapsed);
        self.update_view();
        true
    }

    /// Let time pass for everyone but the player.
    pub(crate) fn advance(&mut self, elapsed: i32) {
        let monsters: Vec<Entity> = self.live_monsters().collect();
        for e in &monsters {
            let gain = e.energy_for(self, elapsed);
            e.gain_energy(self, gain);
        }

        self.dispatch_noises();

        self.subtick_energy += elapsed;
        while self.subtick_energy >= SUBTICK_ENERGY {
            self.subtick_energy -= SUBTICK_ENERGY;
            self.now += 1;

            let actors: Vec<Entity> = self.live_actors().collect();
            for e in actors {
                if e.is_alive(self) {
                    e.tick(self);
                }
            }
        }

        self.board.tick_fields(&mut self.rng, elapsed);
        self.rebuild_occupancy();
        self.resolve();
        self.gc();
    }

    /// Let monsters act until everyone is out of energy.
    fn resolve(&mut self) {
        loop {
            let mut ready: Vec<Entity> = self
                .live_monsters()
                .filter(|e| e.energy(self) > 0)
                .collect();
            if ready.is_empty() {
                break;
            }

            // Random order for equal energies.
            ready.shuffle(&mut self.rng);
            ready.sort_by_key(|e| Reverse(e.energy(self)));

            log::trace!("Runtime::resolve: {} actors ready", ready.len());
            for e in ready {
                // Might have been killed earlier in this pass.
                if !e.is_alive(self) || e.energy(self) <= 0 {
                    continue;
                }
                self.take_turn(e);
            }
        }
    }

    fn take_turn(&mut self, e: Entity) {
        let turns = e.turns(self);
        e.set(self, Turns(turns + 1));

        if e.has_status(self, Status::Paralyzed) {
            e.set_energy(self, 0);
            return;
        }

        let energy = e.energy(self);
        e.act(self);
        if e.is_alive(self) && e.energy(self) == energy {
            // Didn't do anything, don't get stuck on it.
            e.set_energy(self, 0);
        }
    }

    pub(crate) fn rebuild_occupancy(&mut self) {
        let actors: Vec<(Entity, IVec2)> = self
            .live_actors()
            .filter_map(|e| e.pos(self).map(|p| (e, p)))
            .collect();
        self.board.rebuild_occupancy(actors);
    }

    /// Remove dead actors.
    ///
    /// The player entity is kept around after death.
    pub(crate) fn gc(&mut self) {
        let (live, dead): (Vec<Entity>, Vec<Entity>) =
            self.live.iter().copied().partition(|e| e.is_alive(self));
        self.live = live;

        for e in dead {
            if Some(e) == self.player {
                continue;
            }
            log::debug!("Runtime::gc: removing {} {e}", e.name(self));
            if self.ecs.despawn(e.0).is_err() {
                log::warn!("Runtime::gc: {e} was already gone");
            }
        }
    }

    /// Wait until healed or interrupted, return the number of turns rested.
    pub fn rest(&mut self, max_turns: usize) -> usize {
        let mut n = 0;
        while n < max_turns {
            let Some(player) = self.live_player() else { break };
            if player.hp(self) >= player.max_hp(self) {
                break;
            }
            if self.visible_monsters().next().is_some() {
                if n == 0 {
                    msg!(self, "You can't rest with enemies in view.");
                }
                break;
            }

            self.player_turn(Action::Pass);
            n += 1;
        }
        n
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn runtime(seed: u64, map: &str) -> Runtime {
        Runtime::new(&WorldSpec {
            seed,
            map: map.into(),
        })
        .unwrap()
    }

    // Everybody gets their own room.
    const CELLS: &str = "
        ###############
        #...#...#...###
        #...#...#...###
        #...#...#...###
        ###############";

    #[test]
    fn equal_speed_fairness() {
        let mut r = runtime(1, CELLS);
        r.spawn_player(ivec2(1, 1));
        let a = r.spawn_monster("goblin", ivec2(6, 2));
        let b = r.spawn_monster("goblin", ivec2(10, 2));

        for _ in 0..200 {
            assert!(r.player_turn(Action::Pass));
        }

        let (ta, tb) = (a.turns(&r) as i64, b.turns(&r) as i64);
        assert!(ta > 100);
        assert!((ta - tb).abs() <= 2, "{ta} vs {tb}");
    }

    #[test]
    fn one_action_per_scan() {
        let mut r = runtime(9, CELLS);
        r.spawn_player(ivec2(1, 1));
        let a = r.spawn_monster("goblin", ivec2(6, 2));
        let b = r.spawn_monster("goblin", ivec2(10, 2));
        a.set_energy(&mut r, 100);
        b.set_energy(&mut r, 100);

        r.resolve();
        assert_eq!((a.turns(&r), b.turns(&r)), (1, 1));
        assert_eq!((a.energy(&r), b.energy(&r)), (0, 0));
    }

    #[test]
    fn double_speed_fairness() {
        let mut r = runtime(2, CELLS);
        r.spawn_player(ivec2(1, 1));
        let slow = r.spawn_monster("goblin", ivec2(6, 2));
        let fast = r.spawn_monster("goblin", ivec2(10, 2));
        fast.add_status(&mut r, Status::Hasted, 100_000);

        for _ in 0..400 {
            r.player_turn(Action::Pass);
        }

        let ratio = fast.turns(&r) as f32 / slow.turns(&r) as f32;
        assert!((1.8..2.2).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn occupancy_matches_positions() {
        let mut r = runtime(
            3,
            "
            ##########
            #........#
            #........#
            #........#
            #........#
            ##########",
        );
        r.spawn_player(ivec2(1, 1));
        let ids = ["rat", "jackal", "jackal", "bat", "ooze"];
        for (i, id) in ids.iter().enumerate() {
            r.spawn_monster(id, ivec2(3 + i as i32, 3));
        }

        for _ in 0..30 {
            r.player_turn(Action::Pass);
            r.rebuild_occupancy();

            let actors: Vec<Entity> = r.live_actors().collect();
            for &e in &actors {
                assert_eq!(r.board.occupant_at(e.pos(&r).unwrap()), Some(e));
            }
            let occupied = r
                .board
                .points()
                .filter(|&p| r.board.occupant_at(p).is_some())
                .count();
            assert_eq!(occupied, actors.len());
        }
    }

    #[test]
    fn fog_decays() {
        let mut r = runtime(
            4,
            "
            #########
            #.......#
            #.......#
            #.......#
            #########",
        );
        r.spawn_player(ivec2(1, 1));
        r.spawn_fog(ivec2(4, 2), 2);
        assert!(!r.board.fields.is_empty());

        // Fog rate 10 means a 1 in 10 chance per cell per turn.
        let mut turns = 0;
        while !r.board.fields.is_empty() {
            assert!(turns < 200, "fog didn't decay");
            r.player_turn(Action::Pass);
            turns += 1;
        }
        assert!(turns > 1);
    }

    #[test]
    fn view_reveals_map() {
        let mut r = runtime(
            5,
            "
            #######
            #.....#
            #.....#
            #####.#
            #.....#
            #######",
        );
        r.spawn_player(ivec2(1, 1));
        r.spawn_monster("rat", ivec2(3, 2));

        assert!(r.fov().contains(&ivec2(1, 1)));
        assert!(r.board.is_revealed(ivec2(0, 0)));
        assert!(!r.board.is_revealed(ivec2(1, 4)));
        assert_eq!(r.visible_monsters().count(), 1);

        let view = r.player_view();
        assert_eq!(view.lines().nth(1), Some("#@....#"));
        assert_eq!(view.lines().nth(2).map(|l| &l[..4]), Some("#..r"));
    }

    #[test]
    fn dead_are_purged() {
        let mut r = runtime(6, CELLS);
        let p = r.spawn_player(ivec2(1, 1));
        let m = r.spawn_monster("rat", ivec2(2, 1));
        m.set(&mut r, Health { hp: 1, max_hp: 4 });
        // Make sure the rat doesn't wander off.
        m.add_status(&mut r, Status::Paralyzed, 1000);

        for _ in 0..100 {
            r.player_turn(Action::Step(ivec2(1, 0)));
            if !m.exists(&r) {
                break;
            }
        }

        assert!(!m.exists(&r));
        assert!(!r.live.contains(&m));
        assert_eq!(r.mob_at(ivec2(2, 1)), None);
        assert_eq!(r.board.tile(ivec2(2, 1)).items.len(), 1);
        assert!(r.messages(5).iter().any(|m| m == "The rat dies!"));
        assert!(p.is_alive(&r));
    }

    #[test]
    fn resting() {
        let mut r = runtime(7, CELLS);
        let p = r.spawn_player(ivec2(1, 1));
        p.damage(&mut r, None, 5);

        let n = r.rest(1000);
        assert!(n > 0);
        assert_eq!(p.hp(&r), p.max_hp(&r));
        assert_eq!(r.rest(1000), 0);

        // Can't rest with a monster looking at you.
        p.damage(&mut r, None, 5);
        r.spawn_monster("rat", ivec2(3, 3));
        r.update_view();
        assert_eq!(r.rest(1000), 0);
        assert_eq!(
            r.messages(1),
            vec!["You can't rest with enemies in view.".to_string()]
        );
    }

    #[test]
    fn paralysis_skips_turns() {
        let mut r = runtime(8, CELLS);
        r.spawn_player(ivec2(1, 1));
        let m = r.spawn_monster("goblin", ivec2(6, 2));
        m.add_status(&mut r, Status::Paralyzed, 1000);

        for _ in 0..20 {
            r.player_turn(Action::Pass);
        }
        assert_eq!(m.pos(&r), Some(ivec2(6, 2)));
        assert!(m.turns(&r) > 0);
        assert!(m.energy(&r) <= 0);
    }
}
