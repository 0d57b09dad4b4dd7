//! Recording fake of the chat backend.
//!
//! Keeps real group/membership/message state so tests can assert the final
//! picture, records every call in order for reverse-order compensation
//! assertions, and fails on demand via [`FaultPlan`].

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use counsel_domain::ids::{ChatUserId, GroupId};
use counsel_domain::ports::{
    ChatClient, ChatClientError, ChatCredential, ChatSession, GroupMember,
};

use crate::faults::FaultPlan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCall {
    CreateGroup { name: String },
    DeleteGroup { group_id: GroupId },
    AddMember { user_id: ChatUserId, group_id: GroupId },
    RemoveMember { user_id: ChatUserId, group_id: GroupId },
    ListMembers { group_id: GroupId },
    PostMessage { as_user: ChatUserId, group_id: GroupId },
    PostSystemMessage { group_id: GroupId },
    PurgeSystemMessages { group_id: GroupId },
    PurgeAllMessages { group_id: GroupId },
    Login { username: String },
    Logout { user_id: ChatUserId },
}

#[derive(Debug, Clone)]
pub struct PostedMessage {
    pub text: String,
    pub author: ChatUserId,
    pub system: bool,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct GroupState {
    name: String,
    members: Vec<ChatUserId>,
    messages: Vec<PostedMessage>,
}

#[derive(Debug, Default)]
struct ChatState {
    groups: HashMap<GroupId, GroupState>,
    deleted: Vec<GroupId>,
    group_seq: u64,
}

#[derive(Debug, Default)]
pub struct FakeChatClient {
    state: Mutex<ChatState>,
    calls: Mutex<Vec<ChatCall>>,
    faults: Mutex<FaultPlan>,
}

impl FakeChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, op: &str) {
        self.faults.lock().unwrap().fail_on(op);
    }

    pub fn fail_on_nth(&self, op: &str, n: u32) {
        self.faults.lock().unwrap().fail_on_nth(op, n);
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Groups that exist right now.
    pub fn live_groups(&self) -> Vec<GroupId> {
        self.state.lock().unwrap().groups.keys().cloned().collect()
    }

    pub fn deleted_groups(&self) -> Vec<GroupId> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn group_members(&self, group_id: &GroupId) -> Option<Vec<ChatUserId>> {
        self.state
            .lock()
            .unwrap()
            .groups
            .get(group_id)
            .map(|g| g.members.clone())
    }

    pub fn messages(&self, group_id: &GroupId) -> Vec<PostedMessage> {
        self.state
            .lock()
            .unwrap()
            .groups
            .get(group_id)
            .map(|g| g.messages.clone())
            .unwrap_or_default()
    }

    /// Pre-create a group with members, for tests that start mid-lifecycle.
    pub fn seed_group(&self, group_id: GroupId, members: Vec<ChatUserId>) {
        let mut state = self.state.lock().unwrap();
        state.groups.insert(
            group_id.clone(),
            GroupState {
                name: group_id.0,
                members,
                messages: Vec::new(),
            },
        );
    }

    fn record(&self, call: ChatCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn trip(&self, op: &'static str) -> Result<(), ChatClientError> {
        if self.faults.lock().unwrap().trip(op) {
            return Err(ChatClientError::Rejected {
                operation: op.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatClient for FakeChatClient {
    async fn create_group(
        &self,
        name: &str,
        owner: &ChatCredential,
    ) -> Result<GroupId, ChatClientError> {
        self.record(ChatCall::CreateGroup {
            name: name.to_string(),
        });
        self.trip("create_group")?;
        let mut state = self.state.lock().unwrap();
        state.group_seq += 1;
        let group_id = GroupId(format!("grp-{}", state.group_seq));
        state.groups.insert(
            group_id.clone(),
            GroupState {
                name: name.to_string(),
                members: vec![owner.user_id.clone()],
                messages: Vec::new(),
            },
        );
        Ok(group_id)
    }

    async fn delete_group(
        &self,
        group_id: &GroupId,
        _acting: &ChatCredential,
    ) -> Result<(), ChatClientError> {
        self.record(ChatCall::DeleteGroup {
            group_id: group_id.clone(),
        });
        self.trip("delete_group")?;
        let mut state = self.state.lock().unwrap();
        // Deleting an unknown group succeeds, matching the backend's
        // idempotent bulk-delete semantics.
        state.groups.remove(group_id);
        state.deleted.push(group_id.clone());
        Ok(())
    }

    async fn add_member(
        &self,
        user_id: &ChatUserId,
        group_id: &GroupId,
    ) -> Result<(), ChatClientError> {
        self.record(ChatCall::AddMember {
            user_id: user_id.clone(),
            group_id: group_id.clone(),
        });
        self.trip("add_member")?;
        let mut state = self.state.lock().unwrap();
        let group = state
            .groups
            .get_mut(group_id)
            .ok_or_else(|| ChatClientError::GroupNotFound {
                group_id: group_id.clone(),
            })?;
        if !group.members.contains(user_id) {
            group.members.push(user_id.clone());
        }
        Ok(())
    }

    async fn remove_member(
        &self,
        user_id: &ChatUserId,
        group_id: &GroupId,
    ) -> Result<(), ChatClientError> {
        self.record(ChatCall::RemoveMember {
            user_id: user_id.clone(),
            group_id: group_id.clone(),
        });
        self.trip("remove_member")?;
        let mut state = self.state.lock().unwrap();
        let group = state
            .groups
            .get_mut(group_id)
            .ok_or_else(|| ChatClientError::GroupNotFound {
                group_id: group_id.clone(),
            })?;
        group.members.retain(|m| m != user_id);
        Ok(())
    }

    async fn members(&self, group_id: &GroupId) -> Result<Vec<GroupMember>, ChatClientError> {
        self.record(ChatCall::ListMembers {
            group_id: group_id.clone(),
        });
        self.trip("members")?;
        let state = self.state.lock().unwrap();
        let group = state
            .groups
            .get(group_id)
            .ok_or_else(|| ChatClientError::GroupNotFound {
                group_id: group_id.clone(),
            })?;
        Ok(group
            .members
            .iter()
            .map(|m| GroupMember {
                chat_user_id: m.clone(),
                username: m.0.clone(),
            })
            .collect())
    }

    async fn post_message(
        &self,
        text: &str,
        as_user: &ChatUserId,
        group_id: &GroupId,
    ) -> Result<(), ChatClientError> {
        self.record(ChatCall::PostMessage {
            as_user: as_user.clone(),
            group_id: group_id.clone(),
        });
        self.trip("post_message")?;
        let mut state = self.state.lock().unwrap();
        let group = state
            .groups
            .get_mut(group_id)
            .ok_or_else(|| ChatClientError::GroupNotFound {
                group_id: group_id.clone(),
            })?;
        group.messages.push(PostedMessage {
            text: text.to_string(),
            author: as_user.clone(),
            system: false,
            at: Utc::now(),
        });
        Ok(())
    }

    async fn post_system_message(
        &self,
        text: &str,
        group_id: &GroupId,
    ) -> Result<(), ChatClientError> {
        self.record(ChatCall::PostSystemMessage {
            group_id: group_id.clone(),
        });
        self.trip("post_system_message")?;
        let mut state = self.state.lock().unwrap();
        let group = state
            .groups
            .get_mut(group_id)
            .ok_or_else(|| ChatClientError::GroupNotFound {
                group_id: group_id.clone(),
            })?;
        group.messages.push(PostedMessage {
            text: text.to_string(),
            author: ChatUserId::from("system"),
            system: true,
            at: Utc::now(),
        });
        Ok(())
    }

    async fn purge_system_messages(
        &self,
        group_id: &GroupId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<(), ChatClientError> {
        self.record(ChatCall::PurgeSystemMessages {
            group_id: group_id.clone(),
        });
        self.trip("purge_system_messages")?;
        let mut state = self.state.lock().unwrap();
        if let Some(group) = state.groups.get_mut(group_id) {
            group
                .messages
                .retain(|m| !(m.system && m.at >= from && m.at <= to));
        }
        Ok(())
    }

    async fn purge_all_messages(&self, group_id: &GroupId) -> Result<(), ChatClientError> {
        self.record(ChatCall::PurgeAllMessages {
            group_id: group_id.clone(),
        });
        self.trip("purge_all_messages")?;
        let mut state = self.state.lock().unwrap();
        if let Some(group) = state.groups.get_mut(group_id) {
            group.messages.clear();
        }
        Ok(())
    }

    async fn login(&self, username: &str, _password: &str) -> Result<ChatSession, ChatClientError> {
        self.record(ChatCall::Login {
            username: username.to_string(),
        });
        self.trip("login")?;
        Ok(ChatSession {
            token: format!("tok-{username}"),
            user_id: ChatUserId(format!("rc-{username}")),
        })
    }

    async fn logout(&self, session: &ChatSession) -> Result<(), ChatClientError> {
        self.record(ChatCall::Logout {
            user_id: session.user_id.clone(),
        });
        self.trip("logout")?;
        Ok(())
    }
}
