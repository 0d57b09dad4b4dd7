use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AgencyId, ChatId, ConsultantId, GroupId};

/// Repetition interval for scheduled chats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatInterval {
    Weekly,
}

impl ChatInterval {
    /// Next start date after one repetition.
    pub fn advance(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            ChatInterval::Weekly => start + Duration::days(7),
        }
    }
}

/// A scheduled (possibly repeating) group conversation, decoupled from
/// any session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub topic: String,
    pub owner_id: ConsultantId,
    pub group_id: Option<GroupId>,
    pub active: bool,
    pub repetitive: bool,
    pub interval: Option<ChatInterval>,
    pub start_at: DateTime<Utc>,
    pub agency_ids: Vec<AgencyId>,
}

impl Chat {
    pub fn new(
        topic: impl Into<String>,
        owner_id: ConsultantId,
        start_at: DateTime<Utc>,
        agency_ids: Vec<AgencyId>,
    ) -> Self {
        Self {
            id: ChatId::new(),
            topic: topic.into(),
            owner_id,
            group_id: None,
            active: false,
            repetitive: false,
            interval: None,
            start_at,
            agency_ids,
        }
    }

    pub fn repeating(mut self, interval: ChatInterval) -> Self {
        self.repetitive = true;
        self.interval = Some(interval);
        self
    }

    /// Agency-membership permission gate used by every chat operation.
    pub fn accessible_by(&self, agencies: &[AgencyId]) -> bool {
        self.agency_ids.iter().any(|a| agencies.contains(a))
    }

    /// Deactivate a repetitive chat and advance its start date by one
    /// interval, keeping the row (and group) alive for the next run.
    pub fn rearm(&mut self) {
        if let Some(interval) = self.interval {
            self.start_at = interval.advance(self.start_at);
        }
        self.active = false;
    }
}
