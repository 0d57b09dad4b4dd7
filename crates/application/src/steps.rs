//! Saga step library: small reusable group-membership operations composed
//! by the orchestrators.
//!
//! All visibility decisions go through the injected [`Visibility`]
//! capability so the membership-swap algorithm is testable without a live
//! entitlement lookup per member.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use counsel_domain::consultant::Consultant;
use counsel_domain::ids::{AgencyId, ChatUserId, ConsultantId, GroupId};
use counsel_domain::ports::{ChatClient, ConsultantRepository, GroupMember, Visibility};
use counsel_shared::SettingsSnapshot;

use crate::saga::SagaError;

/// Which visibility entitlement gates peer inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerScope {
    /// Primary case group: "view all peer sessions"
    Primary,
    /// Feedback group: "view all feedback sessions"
    Feedback,
}

/// Reusable group-membership steps over the chat backend.
pub struct GroupSteps {
    chat: Arc<dyn ChatClient>,
    consultants: Arc<dyn ConsultantRepository>,
    visibility: Arc<dyn Visibility>,
    settings: Arc<SettingsSnapshot>,
}

impl GroupSteps {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        consultants: Arc<dyn ConsultantRepository>,
        visibility: Arc<dyn Visibility>,
        settings: Arc<SettingsSnapshot>,
    ) -> Self {
        Self {
            chat,
            consultants,
            visibility,
            settings,
        }
    }

    fn system_user_id(&self) -> &ChatUserId {
        &self.settings.chat.system.user_id
    }

    fn technical_user_id(&self) -> &ChatUserId {
        &self.settings.chat.technical.user_id
    }

    fn is_service_identity(&self, chat_user_id: &ChatUserId) -> bool {
        chat_user_id == self.system_user_id() || chat_user_id == self.technical_user_id()
    }

    /// Add the technical bridging identity to a group for membership
    /// surgery.
    pub async fn add_technical_member(&self, group_id: &GroupId) -> Result<(), SagaError> {
        self.chat
            .add_member(self.technical_user_id(), group_id)
            .await?;
        Ok(())
    }

    /// Remove the bridging identity on an exit path. Best-effort: a failure
    /// here must not change the saga's terminal outcome, so it is logged
    /// and swallowed.
    pub async fn remove_technical_member_best_effort(&self, group_id: &GroupId) {
        if let Err(err) = self
            .chat
            .remove_member(self.technical_user_id(), group_id)
            .await
        {
            warn!(
                group_id = %group_id,
                error = %err,
                "failed to remove bridging identity from group"
            );
        }
    }

    /// Add the platform system identity to a group.
    pub async fn add_system_member(&self, group_id: &GroupId) -> Result<(), SagaError> {
        self.chat.add_member(self.system_user_id(), group_id).await?;
        Ok(())
    }

    /// Co-consultants at an agency holding the entitlement for `scope`,
    /// restricted to those with a provisioned chat identity.
    pub async fn entitled_peers(
        &self,
        agency_id: AgencyId,
        scope: PeerScope,
    ) -> Result<Vec<Consultant>, SagaError> {
        let mut entitled = Vec::new();
        for peer in self.consultants.find_by_agency(agency_id).await? {
            if peer.chat_user_id.is_none() {
                continue;
            }
            let visible = match scope {
                PeerScope::Primary => self.visibility.can_view_peer_sessions(&peer).await?,
                PeerScope::Feedback => self.visibility.can_view_all_feedback(&peer).await?,
            };
            if visible {
                entitled.push(peer);
            }
        }
        Ok(entitled)
    }

    /// Members of a primary group that a reassignment must remove:
    /// memberships owned by consultants without the peer-view entitlement.
    /// Service identities, non-consultant members (the asker) and the
    /// explicitly kept chat identities stay.
    pub async fn removable_peer_members(
        &self,
        group_id: &GroupId,
        keep: &[&ChatUserId],
    ) -> Result<Vec<GroupMember>, SagaError> {
        let mut removable = Vec::new();
        for member in self.chat.members(group_id).await? {
            if self.is_service_identity(&member.chat_user_id)
                || keep.contains(&&member.chat_user_id)
            {
                continue;
            }
            let Some(owner) = self
                .consultants
                .find_by_chat_user_id(&member.chat_user_id)
                .await?
            else {
                continue;
            };
            if self.visibility.can_view_peer_sessions(&owner).await? {
                continue;
            }
            removable.push(member);
        }
        Ok(removable)
    }

    /// Feedback-group members displaced by a new occupant: consultant-owned
    /// memberships other than `incoming` whose owner lacks the
    /// feedback-view entitlement.
    pub async fn removable_feedback_members(
        &self,
        group_id: &GroupId,
        incoming: ConsultantId,
    ) -> Result<Vec<GroupMember>, SagaError> {
        let mut removable = Vec::new();
        for member in self.chat.members(group_id).await? {
            if self.is_service_identity(&member.chat_user_id) {
                continue;
            }
            let Some(owner) = self
                .consultants
                .find_by_chat_user_id(&member.chat_user_id)
                .await?
            else {
                continue;
            };
            if owner.id == incoming {
                continue;
            }
            if self.visibility.can_view_all_feedback(&owner).await? {
                continue;
            }
            removable.push(member);
        }
        Ok(removable)
    }

    /// Purge system join/leave messages generated within the saga's own
    /// time window.
    pub async fn purge_system_messages_window(
        &self,
        group_ids: &[&GroupId],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<(), SagaError> {
        for group_id in group_ids {
            self.chat.purge_system_messages(group_id, from, to).await?;
        }
        Ok(())
    }

    /// Compensation: delete a group created earlier in the saga.
    pub fn delete_group_compensation(
        &self,
        group_id: GroupId,
    ) -> impl Future<Output = Result<(), SagaError>> + Send + 'static {
        let chat = Arc::clone(&self.chat);
        let system = self.settings.chat.system.clone();
        async move {
            chat.delete_group(&group_id, &system).await?;
            Ok(())
        }
    }

    /// Compensation: remove a member added earlier in the saga.
    pub fn remove_member_compensation(
        &self,
        user_id: ChatUserId,
        group_id: GroupId,
    ) -> impl Future<Output = Result<(), SagaError>> + Send + 'static {
        let chat = Arc::clone(&self.chat);
        async move {
            chat.remove_member(&user_id, &group_id).await?;
            Ok(())
        }
    }

    /// Compensation: re-add a member removed earlier in the saga.
    pub fn add_member_compensation(
        &self,
        user_id: ChatUserId,
        group_id: GroupId,
    ) -> impl Future<Output = Result<(), SagaError>> + Send + 'static {
        let chat = Arc::clone(&self.chat);
        async move {
            chat.add_member(&user_id, &group_id).await?;
            Ok(())
        }
    }
}
