//! Capability and side-channel ports consumed by the orchestrators.

use async_trait::async_trait;

use crate::consultant::{Agency, Consultant};
use crate::error::Result;
use crate::ids::AgencyId;
use crate::ports::identity_client::IdentityError;
use crate::session::Session;

/// Pure visibility predicates over a consultant, injected as a capability
/// so membership-swap logic is testable without a live entitlement call
/// per member. Production implementations delegate to
/// [`IdentityClient::has_entitlement`](crate::ports::IdentityClient::has_entitlement).
#[async_trait]
pub trait Visibility: Send + Sync {
    async fn can_view_peer_sessions(&self, consultant: &Consultant) -> Result<bool>;
    async fn can_view_all_feedback(&self, consultant: &Consultant) -> Result<bool>;
}

#[derive(thiserror::Error, Debug)]
#[error("Monitoring failure: {0}")]
pub struct MonitoringError(pub String);

/// Creates and removes the initial monitoring structure for a session.
/// Template parsing behind this port is out of scope.
#[async_trait]
pub trait MonitoringInitializer: Send + Sync {
    async fn initialize(&self, session: &Session) -> std::result::Result<(), MonitoringError>;
    async fn remove(&self, session: &Session) -> std::result::Result<(), MonitoringError>;
}

#[derive(thiserror::Error, Debug)]
#[error("Notification failure: {0}")]
pub struct NotifyError(pub String);

/// Fire-and-forget email notification on certain saga outcomes. Failures
/// are logged by the caller and never affect the saga's terminal outcome.
#[async_trait]
pub trait EnquiryNotifier: Send + Sync {
    async fn notify_enquiry_taken(
        &self,
        session: &Session,
        assignee: &Consultant,
    ) -> std::result::Result<(), NotifyError>;
}

/// Agency reference data, fetched from its owning external service.
#[async_trait]
pub trait AgencyService: Send + Sync {
    async fn get_agency(&self, agency_id: AgencyId) -> Result<Agency>;
}

// Lets Visibility implementations backed by the identity provider use `?`
// on entitlement lookups.
impl From<IdentityError> for crate::error::DomainError {
    fn from(err: IdentityError) -> Self {
        crate::error::DomainError::External(err.to_string())
    }
}
