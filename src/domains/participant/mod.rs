pub mod demo;
pub mod lifecycle;
pub mod repository;
pub mod service;
pub mod types;

pub use lifecycle::{classify, effective_status, Classification};
pub use repository::{ApiParticipantRepository, InMemoryParticipantRepository, ParticipantRepository};
pub use service::{RosterService, RosterServiceImpl};
pub use types::{NewParticipant, Participant, ParticipantResponse, ParticipantStatus, UpdateParticipant};
