use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, AgencyId, ChatUserId, UserId};

/// An asker account.
///
/// The stored username is always the encoded form (see [`crate::username`]);
/// decode on demand when a human-readable name is needed. The row is never
/// hard-deleted in lockstep with chat-backend state; deletion is deferred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub account_id: AccountId,
    /// Encoded username form
    pub username: String,
    pub email: String,
    /// Unset until the chat-backend identity has been provisioned
    pub chat_user_id: Option<ChatUserId>,
    pub agency_ids: Vec<AgencyId>,
    pub deleted: bool,
}

impl User {
    pub fn new(
        account_id: AccountId,
        username: impl Into<String>,
        email: impl Into<String>,
        agency_ids: Vec<AgencyId>,
    ) -> Self {
        Self {
            id: UserId::new(),
            account_id,
            username: crate::username::encode(&username.into()),
            email: email.into(),
            chat_user_id: None,
            agency_ids,
            deleted: false,
        }
    }
}
