pub mod chat_client;
pub mod identity_client;
pub mod repositories;
pub mod services;

pub use chat_client::{ChatClient, ChatClientError, ChatCredential, ChatSession, GroupMember};
pub use identity_client::{
    AccountProfile, Entitlement, IdentityClient, IdentityError, Role,
};
pub use repositories::{ChatRepository, ConsultantRepository, SessionRepository, UserRepository};
pub use services::{
    AgencyService, EnquiryNotifier, MonitoringError, MonitoringInitializer, NotifyError,
    Visibility,
};
