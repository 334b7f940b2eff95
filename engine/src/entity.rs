//! Generic entity logic.
use std::fmt;

use derive_more::Deref;
use hecs::Component;
use util::StrExt;

use crate::{ecs::*, prelude::*};

// Dummy wrapper so we can write impls for it directly instead of deriving a
// trait for hecs::Entity and writing every fn signature twice.
/// Game entity identifier datatype. All the actual contents live in the ECS.
#[derive(Copy, Clone, Hash, Eq, Ord, PartialEq, PartialOrd, Debug, Deref)]
pub struct Entity(pub(crate) hecs::Entity);

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0.id())
    }
}

impl Entity {
    pub(crate) fn get<T>(&self, r: &impl AsRef<Runtime>) -> T
    where
        T: Component + Clone + Default,
    {
        let r = r.as_ref();
        r.ecs
            .get::<&T>(**self)
            .map(|c| (*c).clone())
            .unwrap_or_default()
    }

    pub(crate) fn set<T>(&self, r: &mut impl AsMut<Runtime>, val: T)
    where
        T: Component + Default + PartialEq,
    {
        let r = r.as_mut();
        if val == T::default() {
            // Remove default values, abstraction layer assumes components are
            // always present but defaulted.
            //
            // Will give an error if the component wasn't there to begin with,
            // just ignore that.
            let _ = r.ecs.remove_one::<T>(**self);
        } else if r.ecs.insert_one(**self, val).is_err() {
            log::warn!("Entity::set: entity {self} no longer exists");
        }
    }

    /// Access a component using a closure.
    ///
    /// Use for complex components that aren't just atomic values.
    pub(crate) fn with<T: Component + Default, U>(
        &self,
        r: &impl AsRef<Runtime>,
        f: impl FnOnce(&T) -> U,
    ) -> U {
        let r = r.as_ref();
        if let Ok(c) = r.ecs.get::<&T>(**self) {
            f(&*c)
        } else {
            f(&T::default())
        }
    }

    /// Access and mutate a component using a closure.
    ///
    /// Use for complex components that aren't just atomic values.
    pub(crate) fn with_mut<T: Component + Default + Eq, U>(
        &self,
        r: &mut impl AsMut<Runtime>,
        f: impl FnOnce(&mut T) -> U,
    ) -> U {
        let r = r.as_mut();
        let delete;
        let mut insert = None;
        let ret;

        if let Ok(query) = r.ecs.query_one_mut::<&mut T>(**self) {
            ret = f(&mut *query);
            delete = *query == T::default();
        } else {
            let mut scratch = T::default();
            ret = f(&mut scratch);
            delete = false;
            if scratch != T::default() {
                insert = Some(scratch);
            }
        }

        if delete {
            // Component became default value, remove from ECS.
            let _ = r.ecs.remove_one::<T>(**self);
        } else if let Some(val) = insert {
            // Scratch component became a valid value.
            if r.ecs.insert_one(**self, val).is_err() {
                log::warn!("Entity::with_mut: entity {self} no longer exists");
            }
        }

        ret
    }

    pub fn exists(&self, r: &impl AsRef<Runtime>) -> bool {
        r.as_ref().ecs.contains(**self)
    }

    pub fn role(&self, r: &impl AsRef<Runtime>) -> Role {
        self.get::<Role>(r)
    }

    pub fn is_player(&self, r: &impl AsRef<Runtime>) -> bool {
        let r = r.as_ref();
        r.player == Some(*self)
    }

    pub fn is_monster(&self, r: &impl AsRef<Runtime>) -> bool {
        self.role(r) == Role::Monster
    }

    pub fn pos(&self, r: &impl AsRef<Runtime>) -> Option<IVec2> {
        self.get::<Pos>(r).0
    }

    pub fn icon(&self, r: &impl AsRef<Runtime>) -> char {
        self.get::<Icon>(r).0
    }

    /// Base name of the entity.
    pub fn name(&self, r: &impl AsRef<Runtime>) -> String {
        self.get::<Name>(r).0
    }

    /// Name for use in messages.
    pub fn desc(&self, r: &impl AsRef<Runtime>) -> String {
        if self.is_player(r) {
            "you".into()
        } else {
            format!("the {}", self.name(r))
        }
    }

    /// Capitalized name for the start of a sentence.
    pub fn the(&self, r: &impl AsRef<Runtime>) -> String {
        self.desc(r).capitalize()
    }

    /// Actors are alive while they have hit points and a position.
    pub fn is_alive(&self, r: &impl AsRef<Runtime>) -> bool {
        self.exists(r)
            && self.role(r) != Role::Item
            && self.pos(r).is_some()
            && self.get::<Health>(r).hp > 0
    }

    pub fn energy(&self, r: &impl AsRef<Runtime>) -> i32 {
        self.get::<Energy>(r).0
    }

    pub fn set_energy(&self, r: &mut impl AsMut<Runtime>, energy: i32) {
        self.set(r, Energy(energy));
    }

    pub fn gain_energy(&self, r: &mut impl AsMut<Runtime>, amount: i32) {
        let r = r.as_mut();
        let e = self.energy(r);
        self.set_energy(r, e + amount);
    }

    pub fn use_energy(&self, r: &mut impl AsMut<Runtime>, amount: i32) {
        self.gain_energy(r, -amount);
    }

    pub fn turns(&self, r: &impl AsRef<Runtime>) -> u64 {
        self.get::<Turns>(r).0
    }

    /// Chessboard distance to a point, `i32::MAX` if the entity is not on
    /// the board.
    pub fn distance(&self, r: &impl AsRef<Runtime>, p: IVec2) -> i32 {
        self.pos(r).map_or(i32::MAX, |a| (p - a).chess_len())
    }

    /// Move the entity on the board, keeping the occupancy cache in sync.
    pub(crate) fn place(&self, r: &mut impl AsMut<Runtime>, p: IVec2) {
        let r = r.as_mut();
        if let Some(old) = self.pos(r) {
            if r.board.occupant_at(old) == Some(*self) {
                r.board.clear_occupant(old);
            }
        }
        self.set(r, Pos(Some(p)));
        r.board.set_occupant(p, *self);
    }

    /// Whether the entity could step into the cell.
    pub fn can_move_to(&self, r: &impl AsRef<Runtime>, p: IVec2) -> bool {
        let r = r.as_ref();
        r.board.passable(p) && r.board.occupant_at(p).is_none()
    }

    /// Move to a free cell, return whether the move happened.
    pub fn move_to(&self, r: &mut impl AsMut<Runtime>, p: IVec2) -> bool {
        let r = r.as_mut();
        if self.can_move_to(r, p) {
            self.place(r, p);
            true
        } else {
            false
        }
    }

    /// Whether the entity has an unbroken line of sight to the point.
    pub fn sees_pos(&self, r: &impl AsRef<Runtime>, p: IVec2) -> bool {
        let r = r.as_ref();
        self.pos(r)
            .map_or(false, |a| r.board.has_line_of_sight(a, p))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::WorldSpec;

    fn runtime() -> Runtime {
        Runtime::new(&WorldSpec {
            seed: 1,
            map: "
                ######
                #....#
                #....#
                ######"
                .into(),
        })
        .unwrap()
    }

    #[test]
    fn default_components_are_removed() {
        let mut r = runtime();
        let e = r.spawn_monster("rat", ivec2(1, 1));

        e.set(&mut r, Poison(3));
        assert_eq!(e.get::<Poison>(&r), Poison(3));
        e.set(&mut r, Poison(0));
        assert!(r.ecs.get::<&Poison>(e.0).is_err());

        e.with_mut::<Buffs, _>(&mut r, |b| b.insert(Status::Slowed, 2));
        assert!(r.ecs.get::<&Buffs>(e.0).is_ok());
        e.with_mut::<Buffs, _>(&mut r, |b| b.clear());
        assert!(r.ecs.get::<&Buffs>(e.0).is_err());
    }

    #[test]
    fn moving_updates_occupancy() {
        let mut r = runtime();
        let e = r.spawn_monster("rat", ivec2(1, 1));
        assert_eq!(r.board.occupant_at(ivec2(1, 1)), Some(e));

        assert!(e.move_to(&mut r, ivec2(2, 1)));
        assert_eq!(r.board.occupant_at(ivec2(1, 1)), None);
        assert_eq!(r.board.occupant_at(ivec2(2, 1)), Some(e));
        assert_eq!(e.pos(&r), Some(ivec2(2, 1)));

        // Can't walk into walls or other actors.
        assert!(!e.move_to(&mut r, ivec2(2, 0)));
        let f = r.spawn_monster("rat", ivec2(3, 1));
        assert!(!e.move_to(&mut r, ivec2(3, 1)));
        assert_eq!(r.board.occupant_at(ivec2(3, 1)), Some(f));
    }

    #[test]
    fn descriptions() {
        let mut r = runtime();
        let e = r.spawn_monster("rat", ivec2(1, 1));
        let p = r.spawn_player(ivec2(3, 2));
        assert_eq!(e.the(&r), "The rat");
        assert_eq!(p.desc(&r), "you");
        assert_eq!(e.distance(&r, ivec2(3, 2)), 2);
    }
}
