//! Session assignment: move a session's assigned consultant from none/old
//! to new while keeping chat-backend group membership consistent with who
//! may see the case.
//!
//! Membership surgery runs under the technical bridging identity, which is
//! added to every touched group and removed again on every exit path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use counsel_domain::consultant::Consultant;
use counsel_domain::ids::{ConsultantId, GroupId, SessionId};
use counsel_domain::ports::{
    ChatClient, ChatSession, ConsultantRepository, EnquiryNotifier, SessionRepository,
};
use counsel_domain::session::{Session, SessionStatus};
use counsel_shared::SettingsSnapshot;

use crate::outcome::SagaOutcome;
use crate::saga::{CompensationStack, SagaError};
use crate::steps::GroupSteps;

pub struct SessionAssignmentSaga {
    sessions: Arc<dyn SessionRepository>,
    consultants: Arc<dyn ConsultantRepository>,
    chat: Arc<dyn ChatClient>,
    notifier: Arc<dyn EnquiryNotifier>,
    steps: GroupSteps,
    settings: Arc<SettingsSnapshot>,
}

impl SessionAssignmentSaga {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        consultants: Arc<dyn ConsultantRepository>,
        chat: Arc<dyn ChatClient>,
        notifier: Arc<dyn EnquiryNotifier>,
        steps: GroupSteps,
        settings: Arc<SettingsSnapshot>,
    ) -> Self {
        Self {
            sessions,
            consultants,
            chat,
            notifier,
            steps,
            settings,
        }
    }

    /// Assign `target` to the session on behalf of `requester`.
    ///
    /// `enquiry_only` restricts the operation to taking an open enquiry,
    /// which additionally requires the requester to belong to the
    /// session's agency.
    pub async fn assign_session(
        &self,
        session_id: SessionId,
        requester_id: ConsultantId,
        target_id: ConsultantId,
        enquiry_only: bool,
    ) -> SagaOutcome {
        let started_at = Utc::now();

        let mut session = match self.sessions.find_by_id(&session_id).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                warn!(session_id = %session_id, "assignment for unknown session");
                return SagaOutcome::InternalFailure;
            }
            Err(err) => {
                error!(session_id = %session_id, error = %err, "session lookup failed");
                return SagaOutcome::InternalFailure;
            }
        };
        let (requester, target) =
            match self.load_consultants(requester_id, target_id).await {
                Ok(pair) => pair,
                Err(outcome) => return outcome,
            };

        // Already assigned to the same consultant: idempotent conflict.
        if session.status == SessionStatus::InProgress
            && session.consultant_id == Some(target.id)
        {
            return SagaOutcome::Conflict;
        }
        // No contention on open enquiries.
        if session.status == SessionStatus::New
            && session.consultant_id.is_some_and(|c| c != target.id)
        {
            return SagaOutcome::Conflict;
        }
        if enquiry_only && !requester.in_agency(session.agency_id) {
            warn!(
                session_id = %session_id,
                consultant_id = %requester.id,
                "requester not entitled to the session's agency"
            );
            return SagaOutcome::Forbidden;
        }
        // Missing chat identities or group id mean corrupt state; fail
        // before any remote call.
        if target.chat_user_id.is_none() || requester.chat_user_id.is_none() {
            error!(session_id = %session_id, "party without chat identity");
            return SagaOutcome::InternalFailure;
        }
        let Some(group_id) = session.group_id.clone() else {
            error!(session_id = %session_id, "assignable session without group");
            return SagaOutcome::InternalFailure;
        };

        info!(
            session_id = %session_id,
            consultant_id = %target.id,
            "assigning session"
        );

        let mut stack = CompensationStack::new();
        let mut bridged: Vec<GroupId> = Vec::new();
        let mut tech_session: Option<ChatSession> = None;

        let result = self
            .run(
                &mut stack,
                &mut bridged,
                &mut tech_session,
                &mut session,
                &requester,
                &target,
                &group_id,
                started_at,
            )
            .await;

        let outcome = match result {
            Ok(()) => {
                stack.discharge();
                info!(session_id = %session_id, "session assigned");
                SagaOutcome::Ok
            }
            Err(err) => {
                error!(
                    session_id = %session_id,
                    error = %err,
                    "assignment step failed, compensating"
                );
                stack.unwind().await;
                SagaOutcome::InternalFailure
            }
        };

        // The bridging identity never outlives the saga, success or not.
        for group in &bridged {
            self.steps.remove_technical_member_best_effort(group).await;
        }
        if let Some(tech) = tech_session {
            if let Err(err) = self.chat.logout(&tech).await {
                warn!(error = %err, "technical identity logout failed");
            }
        }

        outcome
    }

    async fn load_consultants(
        &self,
        requester_id: ConsultantId,
        target_id: ConsultantId,
    ) -> Result<(Consultant, Consultant), SagaOutcome> {
        let requester = match self.consultants.find_by_id(&requester_id).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                warn!(consultant_id = %requester_id, "unknown requesting consultant");
                return Err(SagaOutcome::InternalFailure);
            }
            Err(err) => {
                error!(error = %err, "consultant lookup failed");
                return Err(SagaOutcome::InternalFailure);
            }
        };
        if requester_id == target_id {
            let target = requester.clone();
            return Ok((requester, target));
        }
        match self.consultants.find_by_id(&target_id).await {
            Ok(Some(target)) => Ok((requester, target)),
            Ok(None) => {
                warn!(consultant_id = %target_id, "unknown target consultant");
                Err(SagaOutcome::InternalFailure)
            }
            Err(err) => {
                error!(error = %err, "consultant lookup failed");
                Err(SagaOutcome::InternalFailure)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        stack: &mut CompensationStack,
        bridged: &mut Vec<GroupId>,
        tech_session: &mut Option<ChatSession>,
        session: &mut Session,
        requester: &Consultant,
        target: &Consultant,
        group_id: &GroupId,
        started_at: DateTime<Utc>,
    ) -> Result<(), SagaError> {
        // Presence checked in the preconditions.
        let target_chat_id = target.chat_user_id.clone().ok_or_else(|| {
            SagaError::Domain(counsel_domain::DomainError::External(
                "target consultant has no chat identity".to_string(),
            ))
        })?;
        let requester_chat_id = requester.chat_user_id.clone().ok_or_else(|| {
            SagaError::Domain(counsel_domain::DomainError::External(
                "requesting consultant has no chat identity".to_string(),
            ))
        })?;

        // 1. Elevate the bridging identity into the primary group.
        let tech = self
            .chat
            .login(
                &self.settings.chat.technical.username,
                &self.settings.chat.technical.password,
            )
            .await?;
        *tech_session = Some(tech);
        self.steps.add_technical_member(group_id).await?;
        bridged.push(group_id.clone());

        // 2. Membership surgery: strip non-entitled peers, keeping the
        // requester, the target and the service identities.
        if session.team_session {
            let keep = [&target_chat_id, &requester_chat_id];
            for member in self.steps.removable_peer_members(group_id, &keep).await? {
                self.chat
                    .remove_member(&member.chat_user_id, group_id)
                    .await?;
                stack.push(
                    "re-add removed peer",
                    self.steps
                        .add_member_compensation(member.chat_user_id, group_id.clone()),
                );
            }
        }

        // 3. Seat the new consultant in the primary group.
        self.chat.add_member(&target_chat_id, group_id).await?;
        stack.push(
            "remove new consultant from primary group",
            self.steps
                .remove_member_compensation(target_chat_id.clone(), group_id.clone()),
        );

        // Feedback group: replace the prior occupant unless it holds the
        // feedback-view entitlement.
        let mut touched_feedback = None;
        if let Some(fb_id) = session.feedback_group_id.clone() {
            self.steps.add_technical_member(&fb_id).await?;
            bridged.push(fb_id.clone());

            for member in self
                .steps
                .removable_feedback_members(&fb_id, target.id)
                .await?
            {
                self.chat.remove_member(&member.chat_user_id, &fb_id).await?;
                stack.push(
                    "re-add displaced feedback occupant",
                    self.steps
                        .add_member_compensation(member.chat_user_id, fb_id.clone()),
                );
            }
            self.chat.add_member(&target_chat_id, &fb_id).await?;
            stack.push(
                "remove new consultant from feedback group",
                self.steps
                    .remove_member_compensation(target_chat_id.clone(), fb_id.clone()),
            );
            touched_feedback = Some(fb_id);
        }

        // 4. Purge the join/leave noise this saga generated.
        let mut purged: Vec<&GroupId> = vec![group_id];
        if let Some(fb_id) = &touched_feedback {
            purged.push(fb_id);
        }
        self.steps
            .purge_system_messages_window(&purged, started_at, Utc::now())
            .await?;

        // 5. Bridging removal happens on every exit path, in the caller.

        // 6. Persist assignment and status.
        session.assign(target.id)?;
        self.sessions.update(session).await?;

        // 7. Best-effort notification when someone assigns the session to
        // a colleague.
        if requester.id != target.id {
            if let Err(err) = self.notifier.notify_enquiry_taken(session, target).await {
                warn!(
                    session_id = %session.id,
                    error = %err,
                    "enquiry-taken notification failed"
                );
            }
        }

        Ok(())
    }
}
