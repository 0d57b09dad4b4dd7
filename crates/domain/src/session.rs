use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DomainError, Result};
use crate::ids::{AgencyId, ConsultantId, ConsultingTypeId, GroupId, SessionId, UserId};

/// Lifecycle states of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Session row exists but no enquiry has been submitted yet
    Initial,
    /// Enquiry submitted, visible and assignable
    New,
    /// Assigned to a consultant and being worked on
    InProgress,
    /// Counseling finished
    Done,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Initial => write!(f, "INITIAL"),
            SessionStatus::New => write!(f, "NEW"),
            SessionStatus::InProgress => write!(f, "IN_PROGRESS"),
            SessionStatus::Done => write!(f, "DONE"),
        }
    }
}

/// One asker's case within one consulting domain.
///
/// The chat-backend group referenced by `group_id` is a dependent resource:
/// it is created before the session leaves `Initial` and its lifecycle is
/// kept in lockstep by the sagas that mutate this row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub status: SessionStatus,
    pub user_id: UserId,
    pub consultant_id: Option<ConsultantId>,
    pub agency_id: AgencyId,
    pub consulting_type: ConsultingTypeId,
    pub group_id: Option<GroupId>,
    pub feedback_group_id: Option<GroupId>,
    /// Set exactly once, when the enquiry saga commits. Presence means the
    /// enquiry step already completed and re-invocation is a conflict.
    pub enquiry_message_at: Option<DateTime<Utc>>,
    pub team_session: bool,
}

impl Session {
    pub fn new_initial(
        user_id: UserId,
        agency_id: AgencyId,
        consulting_type: ConsultingTypeId,
        team_session: bool,
    ) -> Self {
        Self {
            id: SessionId::new(),
            status: SessionStatus::Initial,
            user_id,
            consultant_id: None,
            agency_id,
            consulting_type,
            group_id: None,
            feedback_group_id: None,
            enquiry_message_at: None,
            team_session,
        }
    }

    /// Whether the enquiry saga has already run to completion on this row.
    pub fn has_enquiry(&self) -> bool {
        self.enquiry_message_at.is_some()
    }

    /// Commit the enquiry idempotency marker together with the group id.
    pub fn record_enquiry(&mut self, group_id: GroupId, at: DateTime<Utc>) {
        self.group_id = Some(group_id);
        self.enquiry_message_at = Some(at);
        self.status = SessionStatus::New;
    }

    /// Revert [`record_enquiry`](Self::record_enquiry); used by compensation.
    pub fn clear_enquiry(&mut self) {
        self.group_id = None;
        self.feedback_group_id = None;
        self.enquiry_message_at = None;
        self.status = SessionStatus::Initial;
    }

    pub fn set_feedback_group(&mut self, group_id: GroupId) {
        self.feedback_group_id = Some(group_id);
    }

    /// Move the session to `InProgress` under the given consultant.
    ///
    /// Enforces the invariant that an in-progress session always carries
    /// both an assigned consultant and a chat-backend group.
    pub fn assign(&mut self, consultant_id: ConsultantId) -> Result<()> {
        if self.group_id.is_none() {
            return Err(DomainError::InvalidStateTransition {
                session_id: self.id,
                reason: "cannot move to IN_PROGRESS without a chat-backend group".to_owned(),
            });
        }
        self.consultant_id = Some(consultant_id);
        self.status = SessionStatus::InProgress;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new_initial(UserId::new(), AgencyId(1), ConsultingTypeId(0), false)
    }

    #[test]
    fn assign_requires_group() {
        let mut s = session();
        let err = s.assign(ConsultantId::new()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
        assert_eq!(s.status, SessionStatus::Initial);
    }

    #[test]
    fn record_enquiry_sets_marker_and_status() {
        let mut s = session();
        assert!(!s.has_enquiry());
        s.record_enquiry(GroupId::from("g1"), Utc::now());
        assert!(s.has_enquiry());
        assert_eq!(s.status, SessionStatus::New);

        s.assign(ConsultantId::new()).unwrap();
        assert_eq!(s.status, SessionStatus::InProgress);
        assert!(s.consultant_id.is_some());
    }

    #[test]
    fn clear_enquiry_reverts_marker() {
        let mut s = session();
        s.record_enquiry(GroupId::from("g1"), Utc::now());
        s.set_feedback_group(GroupId::from("fb1"));
        s.clear_enquiry();
        assert!(!s.has_enquiry());
        assert_eq!(s.status, SessionStatus::Initial);
        assert!(s.group_id.is_none());
        assert!(s.feedback_group_id.is_none());
    }
}
