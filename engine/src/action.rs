//! Entities doing things

use serde::{Deserialize, Serialize};

use crate::{prelude::*, BASE_ACTION_COST, SHOUT_LOUDNESS};

/// Atomic player commands.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Stand still for a turn.
    Pass,
    /// Step in a direction, attack monsters if running into them.
    Step(IVec2),
    /// Make a loud noise that monsters can hear.
    Shout,
}

impl Entity {
    /// Execute a command, return the energy cost.
    ///
    /// Zero cost means nothing happened and no time should pass.
    pub fn execute(&self, r: &mut impl AsMut<Runtime>, action: Action) -> i32 {
        use Action::*;
        let r = r.as_mut();

        match action {
            Pass => BASE_ACTION_COST,
            Step(dir) => self.bump(r, dir),
            Shout => {
                let Some(pos) = self.pos(r) else { return 0 };
                if self.is_player(r) {
                    msg!(r, "You shout!");
                } else {
                    msg!(r, "{} shouts!", self.the(r));
                }
                r.make_noise(pos, SHOUT_LOUDNESS);
                BASE_ACTION_COST
            }
        }
    }

    /// Step that attacks enemies in the way.
    fn bump(&self, r: &mut Runtime, dir: IVec2) -> i32 {
        debug_assert!(
            DIR_8.contains(&dir),
            "Entity::bump: bad direction {dir}"
        );
        let Some(pos) = self.pos(r) else { return 0 };
        let dest = pos + dir;

        if let Some(mob) = r.mob_at(dest) {
            if mob != *self && mob.is_monster(r) {
                self.attack(r, mob);
                return BASE_ACTION_COST;
            }
        }

        if r.board.corner_blocked(pos, dest) || !self.move_to(r, dest) {
            return 0;
        }

        if self.is_player(r) {
            let items = r.board.tile(dest).items.clone();
            match items.as_slice() {
                [] => {}
                [item] => msg!(r, "You see a {} here.", item.name(r)),
                _ => msg!(r, "There are several things here."),
            }
        }

        BASE_ACTION_COST
    }
}
