//! Generic field-of-view computation.

mod line;
pub use line::Line;

mod raycast;
pub use raycast::{field_of_view, Sight};
