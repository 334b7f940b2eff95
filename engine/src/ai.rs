//! Monster behavior.

use rand::{seq::SliceRandom, Rng};

use crate::{
    ecs::{Mind, Role},
    prelude::*,
    Alertness, MonsterFlags, BASE_ACTION_COST, PACK_ALERT_RADIUS, PACK_RADIUS,
};

/// A sound made somewhere on the board during a turn.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Noise {
    pub pos: IVec2,
    pub loudness: i32,
}

impl Entity {
    /// Take an action on the entity's own initiative.
    pub fn act(&self, r: &mut impl AsMut<Runtime>) {
        let r = r.as_mut();
        match self.role(r) {
            Role::Monster => self.think(r),
            // The player is driven by commands, items don't do anything.
            Role::Player | Role::Item => {}
        }
    }

    /// Upkeep that runs once every subtick.
    pub fn tick(&self, r: &mut impl AsMut<Runtime>) {
        let r = r.as_mut();
        match self.role(r) {
            Role::Monster => self.monster_tick(r),
            Role::Player => self.tick_body(r),
            Role::Item => {}
        }
    }

    /// React to a noise.
    pub fn hear(&self, r: &mut impl AsMut<Runtime>, noise: &Noise) {
        let r = r.as_mut();
        if self.role(r) == Role::Monster {
            self.on_hear_noise(r, noise);
        }
    }

    pub fn mind(&self, r: &impl AsRef<Runtime>) -> Mind {
        self.get::<Mind>(r)
    }

    pub fn alertness(&self, r: &impl AsRef<Runtime>) -> Alertness {
        self.with::<Mind, _>(r, |m| m.state)
    }

    pub fn is_aware(&self, r: &impl AsRef<Runtime>) -> bool {
        matches!(self.alertness(r), Alertness::Aware | Alertness::Tracking)
    }

    fn set_alertness(&self, r: &mut impl AsMut<Runtime>, state: Alertness) {
        self.with_mut::<Mind, _>(r, |m| m.state = state);
    }

    fn target(&self, r: &impl AsRef<Runtime>) -> Option<IVec2> {
        self.with::<Mind, _>(r, |m| m.target)
    }

    fn set_target(&self, r: &mut impl AsMut<Runtime>, p: IVec2) {
        self.with_mut::<Mind, _>(r, |m| m.target = Some(p));
    }

    fn clear_target(&self, r: &mut impl AsMut<Runtime>) {
        self.with_mut::<Mind, _>(r, |m| m.target = None);
    }

    fn is_ally(&self, r: &impl AsRef<Runtime>, other: &Entity) -> bool {
        other.is_monster(r) && self.species(r) == other.species(r)
    }

    /// Whether the entity can make out the other entity.
    pub fn sees(&self, r: &impl AsRef<Runtime>, other: &Entity) -> bool {
        let r = r.as_ref();
        if self == other {
            return true;
        }
        let (Some(a), Some(b)) = (self.pos(r), other.pos(r)) else {
            return false;
        };

        if self.is_monster(r) && !self.has_flag(r, MonsterFlags::SEES) {
            return false;
        }

        r.board.has_line_of_sight(a, b) && !r.board.field_blocks_view(a, b)
    }

    fn perception_roll(&self, r: &mut Runtime) -> i32 {
        let bonus = self.species(r).map_or(0, |s| s.perception);
        r.rng.gen_range(1..=20) + bonus
    }

    fn stealth_roll(&self, r: &mut Runtime) -> i32 {
        let bonus = self.stats(r).stealth;
        r.rng.gen_range(1..=20) + bonus
    }

    /// How many turns the monster keeps tracking a player it lost sight of.
    fn base_pursue_duration(&self, r: &impl AsRef<Runtime>) -> i32 {
        5 * self.species(r).map_or(1, |s| s.intelligence) + 10
    }

    /// Perception check against the player's stealth.
    fn check_alerted(&self, r: &mut Runtime, player: Entity) -> bool {
        if r.rng.one_chance_in(70) {
            return true;
        }

        let Some(ppos) = player.pos(r) else {
            return false;
        };
        let dist = self.distance(r, ppos);
        let perception = 10 + self.species(r).map_or(0, |s| s.perception);
        let stealth = player.stealth_roll(r);

        if stealth < perception {
            let margin = perception - stealth;
            r.rng.x_in_y(1, dist.min(7) - margin)
        } else {
            false
        }
    }

    /// Notice the player, packs wake up together.
    fn alerted(&self, r: &mut Runtime) {
        if self.is_aware(r) {
            return;
        }
        let Some(ppos) = r.player().and_then(|p| p.pos(r)) else {
            return;
        };

        if self.has_flag(r, MonsterFlags::PACK_TRAVEL) {
            for mon in self.nearby_allies(r, PACK_ALERT_RADIUS) {
                mon.set_alertness(r, Alertness::Aware);
                mon.set_target(r, ppos);
            }
        }

        log::debug!("{} noticed the player", self.name(r));
        self.set_alertness(r, Alertness::Aware);
        self.set_target(r, ppos);
    }

    fn nearby_allies(&self, r: &Runtime, radius: i32) -> Vec<Entity> {
        let Some(me) = self.pos(r) else {
            return Vec::new();
        };
        r.live_monsters()
            .filter(|m| {
                m != self
                    && self.is_ally(r, m)
                    && m.distance(r, me) <= radius
            })
            .collect()
    }

    fn on_hear_noise(&self, r: &mut Runtime, noise: &Noise) {
        let Some(player) = r.live_player() else { return };
        let Some(ppos) = player.pos(r) else { return };

        let mut volume = noise.loudness;
        if self.has_flag(r, MonsterFlags::KEEN_HEARING) {
            volume *= 2;
        }
        let loudness = volume - self.distance(r, noise.pos);
        if loudness <= 0 {
            return;
        }

        let intelligence = self.species(r).map_or(1, |s| s.intelligence);
        let duration = intelligence * loudness;

        let seen = self.sees_pos(r, noise.pos);
        let in_player_view = player.sees_pos(r, noise.pos);

        if matches!(self.alertness(r), Alertness::Idle | Alertness::Tracking) {
            let dist_to_player = (noise.pos - ppos).chess_len();
            if seen
                && in_player_view
                && dist_to_player < r.rng.gen_range(1..=10)
            {
                self.alerted(r);
            } else if self.mind(r).sound_focus < duration {
                log::debug!("{} heard a noise at {}", self.name(r), noise.pos);
                self.with_mut::<Mind, _>(r, |m| {
                    m.state = Alertness::TrackingSound;
                    m.target = Some(noise.pos);
                    m.sound_focus = duration;
                });
            }
        }
    }

    /// Monster was hit by someone.
    pub(crate) fn on_hit(&self, r: &mut impl AsMut<Runtime>, perp: Entity) {
        let r = r.as_mut();
        if perp.is_player(r) {
            self.alerted(r);
        }

        if self.has_flag(r, MonsterFlags::PACK_TRAVEL) {
            let Some(ppos) = perp.pos(r) else { return };
            let radius = r.rng.gen_range(8..=16);
            for mon in self.nearby_allies(r, radius) {
                if !r.rng.one_chance_in(3) {
                    mon.set_alertness(r, Alertness::Aware);
                    mon.set_target(r, ppos);
                }
            }
        }
    }

    fn monster_tick(&self, r: &mut Runtime) {
        if self.alertness(r) == Alertness::Tracking {
            self.with_mut::<Mind, _>(r, |m| {
                m.patience = (m.patience - 1).max(0)
            });
        }

        self.tick_body(r);
        if !self.is_alive(r) {
            return;
        }

        if self.alertness(r) == Alertness::Idle {
            if let Some(player) = r.live_player() {
                if self.sees(r, &player) && self.check_alerted(r, player) {
                    self.alerted(r);
                }
            }
        }
    }

    /// Decide and perform a monster's action.
    fn think(&self, r: &mut Runtime) {
        let Some(me) = self.pos(r) else { return };

        let Some((player, ppos)) =
            r.live_player().and_then(|p| Some((p, p.pos(r)?)))
        else {
            self.set_alertness(r, Alertness::Idle);
            if self.target(r) == Some(me) {
                self.clear_target(r);
            }
            self.idle(r);
            self.move_to_target(r);
            return;
        };

        let reached_target = self.target(r) == Some(me);
        let is_targeting_player = self.target(r) == Some(ppos);
        if reached_target {
            self.clear_target(r);
        }

        match self.alertness(r) {
            Alertness::Idle => self.idle(r),
            Alertness::Aware => {
                if self.sees(r, &player) {
                    if !(self.has_flag(r, MonsterFlags::PACK_TRAVEL)
                        && self.set_pack_target_pos(r))
                    {
                        self.set_target(r, ppos);
                    }

                    if self.has_flag(r, MonsterFlags::ERRATIC)
                        && r.rng.one_chance_in(4)
                    {
                        self.set_rand_target(r);
                    }
                } else if self.sees_pos(r, ppos) {
                    // In view but can't make them out.
                    let perceived = self.determine_unseen(r, player);
                    if !is_targeting_player && reached_target {
                        if perceived {
                            self.set_target(r, ppos);
                        } else {
                            self.random_guess(r);
                        }
                    }
                } else {
                    let patience = self.base_pursue_duration(r) as f32
                        * r.rng.gen_range(0.8..1.2);
                    self.with_mut::<Mind, _>(r, |m| {
                        m.state = Alertness::Tracking;
                        m.target = Some(ppos);
                        m.pursue_check = 0;
                        m.patience = patience.round() as i32;
                    });
                }
            }
            Alertness::Tracking => {
                let mind = self.mind(r);
                if mind.pursue_check > 0 {
                    self.idle(r);
                    let check = mind.pursue_check - 1;
                    self.with_mut::<Mind, _>(r, |m| m.pursue_check = check);
                    if check <= 0 {
                        self.clear_target(r);
                    }
                } else if self.target(r).map_or(true, |t| t == me) {
                    // Try to figure out where the player went.
                    if self.perception_roll(r) >= player.stealth_roll(r) {
                        self.set_target(r, ppos);
                    } else if self.has_flag(r, MonsterFlags::PACK_TRAVEL)
                        && self.set_pack_target_pos(r)
                    {
                        let extra = r.rng.gen_range(0..=1);
                        self.with_mut::<Mind, _>(r, |m| m.patience += extra);
                    } else {
                        let check = r.rng.gen_range(1..=4);
                        self.with_mut::<Mind, _>(r, |m| m.pursue_check = check);
                        self.idle(r);
                    }
                }

                if self.sees(r, &player) {
                    self.set_alertness(r, Alertness::Aware);
                } else if self.mind(r).patience <= 0 {
                    self.set_alertness(r, Alertness::Idle);
                }
            }
            Alertness::TrackingSound => {
                self.with_mut::<Mind, _>(r, |m| {
                    m.sound_focus = (m.sound_focus - 1).max(0)
                });

                let stealth = 10 + player.stats(r).stealth;
                if self.sees(r, &player)
                    && r.rng.one_chance_in(2)
                    && self.perception_roll(r) >= stealth
                {
                    self.alerted(r);
                } else if self.mind(r).sound_focus <= 0 {
                    self.set_alertness(r, Alertness::Idle);
                }
            }
        }

        self.move_to_target(r);
    }

    fn determine_unseen(&self, r: &mut Runtime, player: Entity) -> bool {
        let Some(ppos) = player.pos(r) else {
            return false;
        };
        if self.distance(r, ppos) <= 1 && r.rng.one_chance_in(4) {
            return true;
        }
        self.perception_roll(r) >= player.stealth_roll(r)
    }

    /// Pick a random cell in view nearby.
    fn random_guess(&self, r: &mut Runtime) {
        let Some(me) = self.pos(r) else { return };
        let cells: Vec<IVec2> = r
            .board
            .points_in_radius(me, 3)
            .filter(|&p| self.sees_pos(r, p))
            .collect();
        if let Some(&p) = cells.choose(&mut r.rng) {
            self.set_target(r, p);
        }
    }

    fn idle(&self, r: &mut Runtime) {
        if self.has_flag(r, MonsterFlags::PACK_TRAVEL)
            && self.set_pack_target_pos(r)
        {
            return;
        }
        self.set_rand_target(r);
    }

    /// Head for the middle of the pack. Returns false if there is no pack in
    /// view or moving there would be a step away from the player when
    /// chasing them.
    fn set_pack_target_pos(&self, r: &mut Runtime) -> bool {
        let Some(me) = self.pos(r) else { return false };
        let player = r.live_player();
        let targets_player = player.map_or(false, |p| self.sees(r, &p))
            && self.alertness(r) == Alertness::Aware;
        let is_idle = self.alertness(r) == Alertness::Idle;

        let mut sum = IVec2::ZERO;
        let mut n = 0;
        for mon in self.nearby_allies(r, PACK_RADIUS) {
            if !self.sees(r, &mon) {
                continue;
            }
            if mon.alertness(r) == Alertness::Idle && !is_idle {
                continue;
            }
            if let Some(p) = mon.pos(r) {
                sum += p;
                n += 1;
            }
        }

        if n == 0 {
            return false;
        }

        let target = ivec2(
            (sum.x as f32 / n as f32).round() as i32,
            (sum.y as f32 / n as f32).round() as i32,
        );
        let closer = player.and_then(|p| p.pos(r)).map_or(true, |ppos| {
            (target - ppos).chess_len() < (me - ppos).chess_len()
        });

        if !targets_player || closer {
            self.set_target(r, target);
            true
        } else {
            false
        }
    }

    fn set_rand_target(&self, r: &mut Runtime) {
        let Some(me) = self.pos(r) else { return };
        let mut adj = r.board.adjacent_passable(me);
        adj.shuffle(&mut r.rng);

        if let Some(p) = adj.into_iter().find(|&p| self.can_move_to(r, p)) {
            self.set_target(r, p);
        }
    }

    fn move_to_target(&self, r: &mut Runtime) {
        let Some(target) = self.target(r) else { return };
        let Some(me) = self.pos(r) else { return };

        // Boxed in, nothing to do.
        if !r
            .board
            .adjacent_passable(me)
            .into_iter()
            .any(|p| r.board.occupant_at(p).is_none())
        {
            return;
        }

        let dist = (target - me).chess_len();
        if let Some(c) = r.board.occupant_at(target) {
            if c.is_player(r)
                && dist <= 1
                && r.board.has_clear_path(me, target)
                && (r.rng.x_in_y(3, dist + 2) || r.rng.one_chance_in(3))
            {
                self.attack(r, c);
                self.use_energy(r, BASE_ACTION_COST);
                return;
            }
        }

        if !(self.path_towards(r, target) || self.move_towards(r, target)) {
            self.set_rand_target(r);
        }
    }

    fn calc_path_to(&self, r: &mut Runtime, dest: IVec2) {
        let Some(me) = self.pos(r) else { return };

        let board = &r.board;
        let player = r.player;
        // Other monsters are obstacles that may move out of the way.
        let path = board.get_path(
            me,
            dest,
            |p| match board.occupant_at(p) {
                Some(c) if Some(c) != player => 3.0,
                _ => 1.0,
            },
            &mut r.rng,
        );

        self.with_mut::<Mind, _>(r, |m| m.path = path.into_iter().collect());
    }

    /// Take a step along a path to dest, return whether a step was taken.
    fn path_towards(&self, r: &mut Runtime, dest: IVec2) -> bool {
        let Some(me) = self.pos(r) else { return false };

        if me == dest {
            self.with_mut::<Mind, _>(r, |m| m.path.clear());
            return true;
        }

        let mind = self.mind(r);
        if let (Some(&next), Some(&last)) =
            (mind.path.front(), mind.path.back())
        {
            if last == dest
                && (next - me).is_adjacent()
                && self.can_move_to(r, next)
            {
                self.with_mut::<Mind, _>(r, |m| m.path.pop_front());
                self.move_to(r, next);
                self.use_energy(r, BASE_ACTION_COST);
                return true;
            }
        }

        // Target changed, path is blocked or we're off course.
        self.calc_path_to(r, dest);
        let next = self.with_mut::<Mind, _>(r, |m| m.path.pop_front());
        let Some(next) = next else {
            return false;
        };

        if self.move_to(r, next) {
            self.use_energy(r, BASE_ACTION_COST);
            true
        } else {
            false
        }
    }

    /// Step directly towards target without pathfinding.
    fn move_towards(&self, r: &mut Runtime, target: IVec2) -> bool {
        let Some(me) = self.pos(r) else { return false };
        let delta = target - me;
        let (dx, dy) = (delta.x.signum(), delta.y.signum());
        let d = delta.abs();
        if d == IVec2::ZERO {
            return false;
        }

        let has_los = self.sees_pos(r, target);

        // Randomize, weighted by the distance along each axis.
        let mut move_x = r.rng.x_in_y(d.x, d.x + d.y);
        let t = if move_x { me + ivec2(dx, 0) } else { me + ivec2(0, dy) };

        let mut switched = false;
        if has_los && !r.board.has_line_of_sight(t, target) {
            move_x = !move_x;
            switched = true;
        }

        // Only try the other axis if that doesn't break line of sight.
        if move_x {
            self.move_dir(r, ivec2(dx, 0))
                || (!switched && dy != 0 && self.move_dir(r, ivec2(0, dy)))
        } else {
            self.move_dir(r, ivec2(0, dy))
                || (!switched && dx != 0 && self.move_dir(r, ivec2(dx, 0)))
        }
    }

    fn move_dir(&self, r: &mut Runtime, dir: IVec2) -> bool {
        let Some(me) = self.pos(r) else { return false };
        if dir == IVec2::ZERO || !self.move_to(r, me + dir) {
            return false;
        }
        self.use_energy(r, BASE_ACTION_COST);
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::WorldSpec;

    fn runtime(map: &str) -> Runtime {
        Runtime::new(&WorldSpec {
            seed: 11,
            map: map.into(),
        })
        .unwrap()
    }

    const ROOMS: &str = "
        #################
        #.......#.......#
        #.......#.......#
        #...............#
        #.......#.......#
        #################";

    const MESSAGE_LOG_LINES: usize = 20;

    #[test]
    fn hears_noise_through_walls() {
        let mut r = runtime(ROOMS);
        r.spawn_player(ivec2(2, 1));
        let m = r.spawn_monster("goblin", ivec2(14, 1));
        assert_eq!(m.alertness(&r), Alertness::Idle);

        r.make_noise(ivec2(2, 1), 20);
        r.dispatch_noises();
        assert_eq!(m.alertness(&r), Alertness::TrackingSound);
        assert_eq!(m.mind(&r).target, Some(ivec2(2, 1)));

        // Quiet noises far away go unheard.
        let n = r.spawn_monster("goblin", ivec2(14, 4));
        r.make_noise(ivec2(1, 4), 3);
        r.dispatch_noises();
        assert_eq!(n.alertness(&r), Alertness::Idle);
    }

    #[test]
    fn shout_draws_monsters() {
        let mut r = runtime(ROOMS);
        let p = r.spawn_player(ivec2(2, 1));
        let m = r.spawn_monster("goblin", ivec2(14, 1));
        let start = m.distance(&r, ivec2(2, 1));

        assert!(r.player_turn(Action::Shout));
        assert_ne!(m.alertness(&r), Alertness::Idle);

        for _ in 0..6 {
            r.player_turn(Action::Pass);
        }
        assert!(p.is_alive(&r));
        assert!(m.distance(&r, ivec2(2, 1)) < start);
    }

    #[test]
    fn chases_and_attacks() {
        let mut r = runtime(ROOMS);
        let p = r.spawn_player(ivec2(2, 2));
        let m = r.spawn_monster("goblin", ivec2(7, 2));
        m.with_mut::<Mind, _>(&mut r, |m| {
            m.state = Alertness::Aware;
            m.target = Some(ivec2(2, 2));
        });
        let hp = p.max_hp(&r);

        for _ in 0..40 {
            r.player_turn(Action::Pass);
            if !p.is_alive(&r) || p.hp(&r) < hp {
                break;
            }
        }
        // Got next to the player and started swinging.
        assert!(m.distance(&r, p.pos(&r).unwrap()) <= 1);
        assert!(r.messages(MESSAGE_LOG_LINES).iter().any(|m| {
            m.starts_with("The goblin hits you")
                || m.starts_with("The goblin misses you")
        }));
    }

    #[test]
    fn loses_track_of_hidden_player() {
        let mut r = runtime(ROOMS);
        r.spawn_player(ivec2(1, 1));
        let m = r.spawn_monster("rat", ivec2(15, 1));
        m.with_mut::<Mind, _>(&mut r, |m| m.state = Alertness::Aware);

        m.think(&mut r);
        // Can't see the player from the other room.
        assert_eq!(m.alertness(&r), Alertness::Tracking);
        assert!(m.mind(&r).patience > 0);
    }

    #[test]
    fn pack_wakes_up_together() {
        let mut r = runtime(ROOMS);
        r.spawn_player(ivec2(2, 2));
        let a = r.spawn_monster("jackal", ivec2(12, 2));
        let b = r.spawn_monster("jackal", ivec2(13, 3));
        let c = r.spawn_monster("rat", ivec2(14, 2));

        a.alerted(&mut r);
        assert!(a.is_aware(&r));
        assert!(b.is_aware(&r));
        assert!(!c.is_aware(&r));
    }

    #[test]
    fn blind_monsters_dont_see() {
        let mut r = runtime(ROOMS);
        let p = r.spawn_player(ivec2(2, 2));
        let o = r.spawn_monster("ooze", ivec2(4, 2));
        let g = r.spawn_monster("goblin", ivec2(5, 2));
        assert!(!o.sees(&r, &p));
        assert!(g.sees(&r, &p));
        assert!(g.sees(&r, &o));
    }
}
