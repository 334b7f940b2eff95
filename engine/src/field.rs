//! Transient overlays like fog that spread over floor tiles.

use rand::Rng;
use serde::{Deserialize, Serialize};
use util::{dijkstra_map, within_range};

use crate::{prelude::*, SUBTICK_ENERGY};

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
pub enum FieldKind {
    #[default]
    Fog,
}

impl FieldKind {
    /// Template field for this kind.
    pub fn field(self) -> Field {
        match self {
            FieldKind::Fog => Field {
                kind: self,
                transparency: 3,
                decay_rate: 10,
            },
        }
    }
}

/// Field on a single cell.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
pub struct Field {
    pub kind: FieldKind,
    /// How many consecutive field cells sight can pass through.
    pub transparency: i32,
    /// Expected lifetime in subticks.
    pub decay_rate: i32,
}

impl Board {
    pub fn field_at(&self, p: IVec2) -> Option<&Field> {
        self.fields.get(&p)
    }

    pub fn set_field(&mut self, p: IVec2, field: Field) {
        self.fields.insert(p, field);
    }

    /// Spread a field from origin through passable cells up to `radius`
    /// orthogonal steps away.
    pub fn set_field_radius(
        &mut self,
        origin: IVec2,
        radius: i32,
        kind: FieldKind,
    ) {
        if !self.passable(origin) || radius < 0 {
            return;
        }

        let cells: Vec<IVec2> = dijkstra_map(
            |&p: &IVec2| self.adjacent_passable(p),
            [origin],
        )
        .take_while(within_range(radius as usize))
        .map(|(p, _)| p)
        .collect();

        for p in cells {
            self.set_field(p, kind.field());
        }
    }

    /// Run field decay for a stretch of elapsed energy.
    pub fn tick_fields(&mut self, rng: &mut impl Rng, elapsed: i32) {
        if self.fields.is_empty() || elapsed <= 0 {
            return;
        }

        // Sort for a stable rng draw order.
        let mut cells: Vec<IVec2> = self.fields.keys().copied().collect();
        cells.sort_by_key(|p| (p.y, p.x));

        for p in cells {
            let rate = self.fields[&p].decay_rate.max(1);
            if rng.x_in_y(elapsed, SUBTICK_ENERGY * rate) {
                self.fields.remove(&p);
            }
        }
    }

    pub fn clear_fields(&mut self) {
        self.fields.clear();
    }
}
