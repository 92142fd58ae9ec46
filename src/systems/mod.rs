mod actions;
mod bookkeeping;
mod events;
mod population;

pub use actions::ActionSystem;
pub use bookkeeping::{BookkeepingSystem, DEPOPULATED_REASON};
pub(crate) use bookkeeping::declare_victory;
pub use events::EventSystem;
pub use population::PopulationSystem;
