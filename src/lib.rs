pub mod catalog;
pub mod config;
pub mod engine;
pub mod preview;
pub mod queue;
pub mod rules;
pub mod runtime;
pub mod scenario;
pub mod session;
pub mod skills;
pub mod snapshot;
pub mod systems;
pub mod world;

pub use engine::{tick, Engine};
pub use preview::{simulate_queue_preview, PreviewResult};
pub use session::{Command, Session};
pub use world::GameState;
