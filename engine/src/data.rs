//! Static monster definitions.

use bitflags::bitflags;

bitflags! {
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct MonsterFlags: u32 {
        /// Uses eyesight, monsters without it only notice what they hear or
        /// bump into.
        const SEES = 1 << 0;
        /// Moves together with other monsters of the same kind.
        const PACK_TRAVEL = 1 << 1;
        /// Hears noises twice as loud.
        const KEEN_HEARING = 1 << 2;
        /// Doesn't heal over time.
        const NO_REGEN = 1 << 3;
        /// Flits around at random even when chasing.
        const ERRATIC = 1 << 4;
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MonsterSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: char,
    /// How the monster's attack is described, "the rat <verb> you".
    pub verb: &'static str,
    pub hp: i32,
    pub speed: i32,
    pub hit: i32,
    pub ev: i32,
    pub dmg: i32,
    /// Maximum poison inflicted by a damaging hit.
    pub poison: i32,
    /// Determines how long the monster keeps tracking things.
    pub intelligence: i32,
    /// Bonus to perception rolls.
    pub perception: i32,
    pub flags: MonsterFlags,
}

impl MonsterSpec {
    pub fn has(&self, flag: MonsterFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Look up a monster by id.
    ///
    /// Panics if the id isn't in the bestiary.
    pub fn get(id: &str) -> &'static MonsterSpec {
        BESTIARY
            .iter()
            .find(|s| s.id == id)
            .unwrap_or_else(|| {
                panic!("MonsterSpec::get: unknown monster {id:?}")
            })
    }
}

pub static BESTIARY: &[MonsterSpec] = &[
    MonsterSpec {
        id: "rat",
        name: "rat",
        icon: 'r',
        verb: "bites",
        hp: 4,
        speed: 100,
        hit: 0,
        ev: 2,
        dmg: 2,
        poison: 0,
        intelligence: 2,
        perception: 0,
        flags: MonsterFlags::SEES.union(MonsterFlags::KEEN_HEARING),
    },
    MonsterSpec {
        id: "jackal",
        name: "jackal",
        icon: 'j',
        verb: "bites",
        hp: 6,
        speed: 120,
        hit: 1,
        ev: 2,
        dmg: 2,
        poison: 0,
        intelligence: 3,
        perception: 2,
        flags: MonsterFlags::SEES
            .union(MonsterFlags::PACK_TRAVEL)
            .union(MonsterFlags::KEEN_HEARING),
    },
    MonsterSpec {
        id: "goblin",
        name: "goblin",
        icon: 'g',
        verb: "hits",
        hp: 10,
        speed: 100,
        hit: 2,
        ev: 0,
        dmg: 4,
        poison: 0,
        intelligence: 8,
        perception: 1,
        flags: MonsterFlags::SEES,
    },
    MonsterSpec {
        id: "spider",
        name: "giant spider",
        icon: 's',
        verb: "stings",
        hp: 8,
        speed: 100,
        hit: 2,
        ev: 1,
        dmg: 2,
        poison: 6,
        intelligence: 4,
        perception: 3,
        flags: MonsterFlags::SEES,
    },
    MonsterSpec {
        id: "bat",
        name: "bat",
        icon: 'b',
        verb: "bites",
        hp: 3,
        speed: 200,
        hit: 1,
        ev: 5,
        dmg: 1,
        poison: 0,
        intelligence: 2,
        perception: 2,
        flags: MonsterFlags::SEES.union(MonsterFlags::ERRATIC),
    },
    MonsterSpec {
        id: "ooze",
        name: "ooze",
        icon: 'o',
        verb: "engulfs",
        hp: 12,
        speed: 60,
        hit: 0,
        ev: -2,
        dmg: 3,
        poison: 0,
        intelligence: 1,
        perception: 0,
        flags: MonsterFlags::NO_REGEN,
    },
];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup() {
        assert_eq!(MonsterSpec::get("rat").icon, 'r');
        assert!(MonsterSpec::get("jackal").has(MonsterFlags::PACK_TRAVEL));
        assert!(!MonsterSpec::get("ooze").has(MonsterFlags::SEES));
    }

    #[test]
    #[should_panic]
    fn unknown_monster() {
        MonsterSpec::get("dragon");
    }
}
