//! Tool activity tracking
//!
//! Folds protocol callbacks into the renderable provisional message and the
//! set of tools currently in flight.

mod categories;
mod reducer;

pub use categories::ToolCategories;
pub use reducer::{ActivityView, DEFAULT_STUCK_AFTER, ToolActivity};
