//! Entity logic for active creatures.
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    ecs::*, prelude::*, Alertness, MonsterFlags, MonsterSpec,
    DEATH_ENERGY_DRAIN, NORMAL_SPEED,
};

/// Status effects.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
pub enum Status {
    Hasted,
    Slowed,
    Paralyzed,
}

impl Status {
    /// Parse a status name.
    ///
    /// Panics on unknown names, these only come from content.
    pub fn from_name(name: &str) -> Status {
        name.parse().unwrap_or_else(|_| {
            panic!("Status::from_name: unknown status {name:?}")
        })
    }

    fn expire_msg(&self, r: &mut Runtime, e: Entity) {
        let the = e.the(r);
        let is = if e.is_player(r) { "are" } else { "is" };
        match self {
            Status::Hasted => msg!(r, "{the} {is} no longer hasted."),
            Status::Slowed => msg!(r, "{the} {is} no longer slowed."),
            Status::Paralyzed => msg!(r, "{the} can move again."),
        }
    }
}

impl Entity {
    pub fn species(
        &self,
        r: &impl AsRef<Runtime>,
    ) -> Option<&'static MonsterSpec> {
        self.get::<Species>(r).0
    }

    pub fn has_flag(
        &self,
        r: &impl AsRef<Runtime>,
        flag: MonsterFlags,
    ) -> bool {
        self.species(r).map_or(false, |s| s.has(flag))
    }

    pub fn hp(&self, r: &impl AsRef<Runtime>) -> i32 {
        self.get::<Health>(r).hp
    }

    pub fn max_hp(&self, r: &impl AsRef<Runtime>) -> i32 {
        self.get::<Health>(r).max_hp
    }

    pub fn stats(&self, r: &impl AsRef<Runtime>) -> Stats {
        self.get::<Stats>(r)
    }

    pub fn poison(&self, r: &impl AsRef<Runtime>) -> i32 {
        self.get::<Poison>(r).0
    }

    pub fn add_poison(&self, r: &mut impl AsMut<Runtime>, amount: i32) {
        let r = r.as_mut();
        let p = self.poison(r);
        self.set(r, Poison((p + amount).max(0)));
    }

    pub fn add_status(
        &self,
        r: &mut impl AsMut<Runtime>,
        status: Status,
        duration: i32,
    ) {
        // Longer duration wins when reapplied.
        self.with_mut::<Buffs, _>(r, |b| {
            let d = b.entry(status).or_default();
            *d = (*d).max(duration);
        });
    }

    pub fn has_status(&self, r: &impl AsRef<Runtime>, status: Status) -> bool {
        self.with::<Buffs, _>(r, |b| b.contains_key(&status))
    }

    /// Current speed with status effects and AI state applied.
    pub fn speed(&self, r: &impl AsRef<Runtime>) -> i32 {
        let mut speed = self.get::<Speed>(r).0;
        if self.has_status(r, Status::Hasted) {
            speed *= 2;
        }
        if self.has_status(r, Status::Slowed) {
            speed /= 2;
        }
        if self.is_monster(r) && self.get::<Mind>(r).state == Alertness::Idle {
            speed = speed * 3 / 4;
        }
        speed
    }

    /// Energy gained over a stretch of elapsed time.
    pub(crate) fn energy_for(
        &self,
        r: &impl AsRef<Runtime>,
        elapsed: i32,
    ) -> i32 {
        elapsed * self.speed(r) / NORMAL_SPEED
    }

    pub fn heal(&self, r: &mut impl AsMut<Runtime>, amount: i32) {
        let r = r.as_mut();
        let mut h = self.get::<Health>(r);
        h.hp = (h.hp + amount).clamp(0, h.max_hp);
        self.set(r, h);
    }

    /// Take damage, `perp` is the attacker if there is one.
    pub fn damage(
        &self,
        r: &mut impl AsMut<Runtime>,
        perp: Option<Entity>,
        amount: i32,
    ) {
        let r = r.as_mut();
        if !self.is_alive(r) {
            return;
        }

        let mut h = self.get::<Health>(r);
        h.hp = (h.hp - amount).max(0);
        self.set(r, h);

        if h.hp <= 0 {
            self.die(r);
        } else if let Some(perp) = perp {
            if self.is_monster(r) {
                self.on_hit(r, perp);
            }
        }
    }

    pub(crate) fn die(&self, r: &mut impl AsMut<Runtime>) {
        let r = r.as_mut();

        if self.is_player(r) {
            msg!(r, "You die...");
        } else {
            msg!(r, "{} dies!", self.the(r));
        }
        log::debug!("{} died", self.name(r));

        let Some(pos) = self.pos(r) else { return };
        if r.board.occupant_at(pos) == Some(*self) {
            r.board.clear_occupant(pos);
        }
        self.use_energy(r, DEATH_ENERGY_DRAIN);

        if self.is_monster(r) {
            let corpse = r.spawn_item(&format!("{} corpse", self.name(r)), '%');
            r.board.place_item(pos, corpse);
        }

        if !self.is_player(r) {
            self.set(r, Pos(None));
        }
    }

    /// Melee attack against another actor.
    pub fn attack(&self, r: &mut impl AsMut<Runtime>, target: Entity) {
        let r = r.as_mut();
        let (att, def) = (self.stats(r), target.stats(r));

        let odds = Odds(att.hit - def.ev);
        if !r.rng.sample(odds) {
            let miss = if self.is_player(r) { "miss" } else { "misses" };
            msg!(r, "{} {miss} {}.", self.the(r), target.desc(r));
            return;
        }

        let dmg = r.rng.gen_range(1..=att.dmg.max(1));
        let verb = self.species(r).map_or("hit", |s| s.verb);
        msg!(r, "{} {verb} {}.", self.the(r), target.desc(r));

        if let Some(spec) = self.species(r) {
            if spec.poison > 0 {
                let amount = r.rng.gen_range(0..=spec.poison);
                if amount > 0 {
                    if target.is_player(r) {
                        msg!(r, "You are poisoned!");
                    } else {
                        msg!(r, "{} is poisoned!", target.the(r));
                    }
                    target.add_poison(r, amount);
                }
            }
        }

        target.damage(r, Some(*self), dmg);
    }

    /// Per-subtick upkeep shared by all actors.
    pub(crate) fn tick_body(&self, r: &mut impl AsMut<Runtime>) {
        let r = r.as_mut();

        let poison = self.poison(r);
        if poison > 0 {
            let amount = (1 + poison / 10).min(poison);
            self.set(r, Poison(poison - amount));
            self.damage(r, None, amount);
            if !self.is_alive(r) {
                return;
            }
        } else {
            let regen_chance = if self.is_player(r) { 12 } else { 16 };
            if !self.has_flag(r, MonsterFlags::NO_REGEN)
                && r.rng.one_chance_in(regen_chance)
            {
                self.heal(r, 1);
            }
        }

        self.tick_statuses(r);
    }

    fn tick_statuses(&self, r: &mut impl AsMut<Runtime>) {
        let r = r.as_mut();
        let expired = self.with_mut::<Buffs, _>(r, |b| {
            let mut expired = Vec::new();
            b.retain(|&s, d| {
                *d -= 1;
                if *d <= 0 {
                    expired.push(s);
                    false
                } else {
                    true
                }
            });
            expired
        });

        for s in expired {
            s.expire_msg(r, *self);
        }
    }
}
