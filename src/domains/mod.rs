pub mod attendance;
pub mod core;
pub mod curriculum;
pub mod export;
pub mod participant;

pub use participant::{RosterService, RosterServiceImpl};
