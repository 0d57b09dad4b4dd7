//! Typed client contract for the group-chat backend.
//!
//! Calls are synchronous remote calls from the saga's point of view: each
//! returns a result or a typed failure, and no retry policy lives here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChatUserId, GroupId};

/// A chat-backend service credential (system or technical/bridging
/// identity), held in configuration and used transiently within sagas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCredential {
    pub user_id: ChatUserId,
    pub username: String,
    pub password: String,
}

/// An authenticated chat-backend session obtained via [`ChatClient::login`].
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub token: String,
    pub user_id: ChatUserId,
}

/// One member of a chat-backend group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub chat_user_id: ChatUserId,
    pub username: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ChatClientError {
    #[error("Group not found: {group_id}")]
    GroupNotFound { group_id: GroupId },

    #[error("Chat backend rejected {operation}: {reason}")]
    Rejected { operation: String, reason: String },

    #[error("Chat backend transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Create a group owned by the given credential's identity.
    async fn create_group(
        &self,
        name: &str,
        owner: &ChatCredential,
    ) -> Result<GroupId, ChatClientError>;

    /// Delete a group, acting as the given credential's identity.
    async fn delete_group(
        &self,
        group_id: &GroupId,
        acting: &ChatCredential,
    ) -> Result<(), ChatClientError>;

    async fn add_member(
        &self,
        user_id: &ChatUserId,
        group_id: &GroupId,
    ) -> Result<(), ChatClientError>;

    async fn remove_member(
        &self,
        user_id: &ChatUserId,
        group_id: &GroupId,
    ) -> Result<(), ChatClientError>;

    async fn members(&self, group_id: &GroupId) -> Result<Vec<GroupMember>, ChatClientError>;

    /// Post a message into a group as the given user identity.
    async fn post_message(
        &self,
        text: &str,
        as_user: &ChatUserId,
        group_id: &GroupId,
    ) -> Result<(), ChatClientError>;

    /// Post a message as the platform's system identity.
    async fn post_system_message(
        &self,
        text: &str,
        group_id: &GroupId,
    ) -> Result<(), ChatClientError>;

    /// Bulk-delete system join/leave messages in a time window.
    async fn purge_system_messages(
        &self,
        group_id: &GroupId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<(), ChatClientError>;

    /// Delete every message in a group.
    async fn purge_all_messages(&self, group_id: &GroupId) -> Result<(), ChatClientError>;

    async fn login(&self, username: &str, password: &str) -> Result<ChatSession, ChatClientError>;

    async fn logout(&self, session: &ChatSession) -> Result<(), ChatClientError>;
}
