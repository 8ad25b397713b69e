//! Session coordination
//!
//! Wires a voice capture session's silence firing to protocol exchanges and
//! folds exchange callbacks into tool activity, all on one event loop.

mod coordinator;
mod events;
mod handle;

pub use coordinator::{SessionCoordinator, SessionView};
pub use events::{ExchangeEvent, ExchangeForwarder, ExchangeId, SessionEvent, SessionUpdate};
pub use handle::{SessionCommand, SessionHandle};
