pub mod events;
pub mod phase;
pub mod project;
pub mod session;
pub mod state;
