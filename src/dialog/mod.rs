//! The dialog layer: per-user conversation state and the turn engine that
//! advances it.

pub mod engine;
pub mod session;

pub use engine::DialogEngine;
pub use session::{DialogSession, SessionState};
