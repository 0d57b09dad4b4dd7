//! Identity-provider-backed visibility capability.

use std::sync::Arc;

use async_trait::async_trait;

use counsel_domain::consultant::Consultant;
use counsel_domain::error::Result;
use counsel_domain::ports::{Entitlement, IdentityClient, Visibility};

/// [`Visibility`] that resolves each predicate with an entitlement lookup
/// at the identity provider, keyed by the consultant's account.
pub struct EntitlementVisibility {
    identity: Arc<dyn IdentityClient>,
}

impl EntitlementVisibility {
    pub fn new(identity: Arc<dyn IdentityClient>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl Visibility for EntitlementVisibility {
    async fn can_view_peer_sessions(&self, consultant: &Consultant) -> Result<bool> {
        Ok(self
            .identity
            .has_entitlement(&consultant.account_id, Entitlement::ViewAllPeerSessions)
            .await?)
    }

    async fn can_view_all_feedback(&self, consultant: &Consultant) -> Result<bool> {
        Ok(self
            .identity
            .has_entitlement(&consultant.account_id, Entitlement::ViewAllFeedbackSessions)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use counsel_domain::ids::AgencyId;
    use counsel_testing::FakeIdentityClient;

    fn consultant() -> Consultant {
        Consultant::new("acc-anna".into(), "anna", "anna@example.org", vec![AgencyId(1)])
    }

    #[tokio::test]
    async fn predicates_follow_granted_entitlements() {
        let identity = Arc::new(FakeIdentityClient::new());
        let anna = consultant();
        identity.grant(&anna.account_id, Entitlement::ViewAllPeerSessions);

        let visibility = EntitlementVisibility::new(identity);
        assert!(visibility.can_view_peer_sessions(&anna).await.unwrap());
        assert!(!visibility.can_view_all_feedback(&anna).await.unwrap());
    }

    #[tokio::test]
    async fn ungranted_consultant_sees_nothing() {
        let identity = Arc::new(FakeIdentityClient::new());
        let anna = consultant();

        let visibility = EntitlementVisibility::new(identity);
        assert!(!visibility.can_view_peer_sessions(&anna).await.unwrap());
        assert!(!visibility.can_view_all_feedback(&anna).await.unwrap());
    }

    #[tokio::test]
    async fn lookup_failure_propagates() {
        let identity = Arc::new(FakeIdentityClient::new());
        identity.fail_on("has_entitlement");

        let visibility = EntitlementVisibility::new(identity);
        assert!(visibility
            .can_view_peer_sessions(&consultant())
            .await
            .is_err());
    }
}
