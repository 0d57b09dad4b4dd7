use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, AgencyId, ChatUserId, ConsultantId};

/// A staff account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultant {
    pub id: ConsultantId,
    pub account_id: AccountId,
    /// Encoded username form
    pub username: String,
    pub email: String,
    pub chat_user_id: Option<ChatUserId>,
    pub absent: bool,
    pub absence_message: Option<String>,
    pub team_consultant: bool,
    pub language_formal: bool,
    pub agency_ids: Vec<AgencyId>,
}

impl Consultant {
    pub fn new(
        account_id: AccountId,
        username: impl Into<String>,
        email: impl Into<String>,
        agency_ids: Vec<AgencyId>,
    ) -> Self {
        Self {
            id: ConsultantId::new(),
            account_id,
            username: crate::username::encode(&username.into()),
            email: email.into(),
            chat_user_id: None,
            absent: false,
            absence_message: None,
            team_consultant: false,
            language_formal: false,
            agency_ids,
        }
    }

    pub fn in_agency(&self, agency_id: AgencyId) -> bool {
        self.agency_ids.contains(&agency_id)
    }

    pub fn set_absence(&mut self, absent: bool, message: Option<String>) {
        self.absent = absent;
        self.absence_message = if absent { message } else { None };
    }
}

/// External-service-owned agency reference data (fetched, never persisted
/// locally).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agency {
    pub id: AgencyId,
    pub name: String,
    pub consulting_type: crate::ids::ConsultingTypeId,
    pub team_agency: bool,
}
