//! Saga orchestration over the chat backend, the identity provider and
//! the local store.
//!
//! Each orchestrator drives a fixed sequence of adapter calls, records a
//! compensating action for every step that succeeded, and on a later
//! failure unwinds those compensations in reverse order before reporting
//! one of the closed terminal outcomes.

pub mod account;
pub mod assignment;
pub mod chat_lifecycle;
pub mod enquiry;
pub mod outcome;
pub mod provisioning;
pub mod saga;
pub mod steps;
pub mod visibility;

pub use account::AccountMaintenance;
pub use assignment::SessionAssignmentSaga;
pub use chat_lifecycle::{ChatLifecycleSaga, ChatParticipant};
pub use enquiry::EnquiryCreationSaga;
pub use outcome::SagaOutcome;
pub use provisioning::{AccountProvisioningSaga, RegistrationRequest};
pub use saga::{CompensationStack, SagaError};
pub use steps::{GroupSteps, PeerScope};
pub use visibility::EntitlementVisibility;
