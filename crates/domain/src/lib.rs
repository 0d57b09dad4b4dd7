//! Domain model and ports for the counseling platform saga core.
//!
//! The local store owns [`User`], [`Consultant`], [`Session`] and [`Chat`];
//! the chat backend and identity provider are reached through the traits in
//! [`ports`]. Chat-backend groups referenced by session and chat rows are
//! dependent resources whose lifecycle the orchestrators keep in lockstep
//! with the local rows.

pub mod chat;
pub mod consultant;
pub mod error;
pub mod group_name;
pub mod ids;
pub mod ports;
pub mod session;
pub mod user;
pub mod username;

pub use chat::{Chat, ChatInterval};
pub use consultant::{Agency, Consultant};
pub use error::{DomainError, Result};
pub use ids::{
    AccountId, AgencyId, ChatId, ChatUserId, ConsultantId, ConsultingTypeId, GroupId, SessionId,
    UserId,
};
pub use session::{Session, SessionStatus};
pub use user::User;
