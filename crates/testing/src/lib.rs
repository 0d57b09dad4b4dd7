//! In-memory recording fakes for every port of the counseling platform
//! saga core.
//!
//! Each fake keeps real state (group membership, account records, rows) so
//! tests assert the final picture, records calls in invocation order so
//! compensation tests can assert strict reverse-order unwinding, and fails
//! on demand through a per-operation [`faults::FaultPlan`].

pub mod chat;
pub mod faults;
pub mod identity;
pub mod repositories;
pub mod services;

pub use chat::{ChatCall, FakeChatClient, PostedMessage};
pub use faults::FaultPlan;
pub use identity::{FakeIdentityClient, IdentityCall};
pub use repositories::{
    InMemoryChatRepository, InMemoryConsultantRepository, InMemorySessionRepository,
    InMemoryUserRepository,
};
pub use services::{
    FakeMonitoring, RecordingNotifier, StaticAgencyService, StaticVisibility,
};
