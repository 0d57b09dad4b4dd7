//! Scheduled-chat lifecycle: start, stop, join and leave, all gated on
//! agency membership.
//!
//! No compensation stack here: every chat-backend step is individually
//! idempotent and the local-store write comes last, so backend state is
//! allowed to run ahead of the local row without breaking invariants.

use std::sync::Arc;

use tracing::{error, info, warn};

use counsel_domain::chat::Chat;
use counsel_domain::consultant::Consultant;
use counsel_domain::ids::{AgencyId, ChatId, ChatUserId, GroupId};
use counsel_domain::ports::{ChatClient, ChatRepository};
use counsel_domain::user::User;
use counsel_shared::SettingsSnapshot;

use crate::outcome::SagaOutcome;
use crate::saga::SagaError;

/// Who is acting on a chat: either an asker or a consultant, reduced to
/// the two facts the lifecycle operations need.
#[derive(Debug, Clone)]
pub struct ChatParticipant {
    pub chat_user_id: Option<ChatUserId>,
    pub agency_ids: Vec<AgencyId>,
}

impl From<&User> for ChatParticipant {
    fn from(user: &User) -> Self {
        Self {
            chat_user_id: user.chat_user_id.clone(),
            agency_ids: user.agency_ids.clone(),
        }
    }
}

impl From<&Consultant> for ChatParticipant {
    fn from(consultant: &Consultant) -> Self {
        Self {
            chat_user_id: consultant.chat_user_id.clone(),
            agency_ids: consultant.agency_ids.clone(),
        }
    }
}

pub struct ChatLifecycleSaga {
    chats: Arc<dyn ChatRepository>,
    chat_client: Arc<dyn ChatClient>,
    settings: Arc<SettingsSnapshot>,
}

impl ChatLifecycleSaga {
    pub fn new(
        chats: Arc<dyn ChatRepository>,
        chat_client: Arc<dyn ChatClient>,
        settings: Arc<SettingsSnapshot>,
    ) -> Self {
        Self {
            chats,
            chat_client,
            settings,
        }
    }

    /// Activate a scheduled chat so participants may join.
    pub async fn start_chat(&self, chat_id: ChatId, requester: &Consultant) -> SagaOutcome {
        let mut chat = match self.load(chat_id).await {
            Ok(chat) => chat,
            Err(outcome) => return outcome,
        };
        if !chat.accessible_by(&requester.agency_ids) {
            return SagaOutcome::Forbidden;
        }
        if chat.active {
            return SagaOutcome::Conflict;
        }
        if chat.group_id.is_none() {
            error!(chat_id = %chat_id, "chat row without backend group");
            return SagaOutcome::InternalFailure;
        }

        chat.active = true;
        match self.chats.update(&chat).await {
            Ok(()) => {
                info!(chat_id = %chat_id, "chat started");
                SagaOutcome::Ok
            }
            Err(err) => {
                error!(chat_id = %chat_id, error = %err, "chat start persist failed");
                SagaOutcome::InternalFailure
            }
        }
    }

    /// Stop an active chat: re-arm repetitive chats for their next run,
    /// tear one-shot chats down entirely.
    pub async fn stop_chat(&self, chat_id: ChatId, requester: &Consultant) -> SagaOutcome {
        let chat = match self.load(chat_id).await {
            Ok(chat) => chat,
            Err(outcome) => return outcome,
        };
        if !chat.accessible_by(&requester.agency_ids) {
            return SagaOutcome::Forbidden;
        }
        // Stopping an inactive chat is rejected with zero adapter calls.
        if !chat.active {
            return SagaOutcome::Conflict;
        }
        let Some(group_id) = chat.group_id.clone() else {
            error!(chat_id = %chat_id, "active chat without backend group");
            return SagaOutcome::InternalFailure;
        };

        match self.stop_active(chat, &group_id).await {
            Ok(()) => {
                info!(chat_id = %chat_id, "chat stopped");
                SagaOutcome::Ok
            }
            Err(err) => {
                error!(chat_id = %chat_id, error = %err, "chat stop failed");
                SagaOutcome::InternalFailure
            }
        }
    }

    async fn stop_active(&self, mut chat: Chat, group_id: &GroupId) -> Result<(), SagaError> {
        self.chat_client.purge_all_messages(group_id).await?;

        if chat.repetitive {
            // Keep the group for the next run, but empty it of ordinary
            // participants.
            for member in self.chat_client.members(group_id).await? {
                if member.chat_user_id == self.settings.chat.system.user_id
                    || member.chat_user_id == self.settings.chat.technical.user_id
                {
                    continue;
                }
                self.chat_client
                    .remove_member(&member.chat_user_id, group_id)
                    .await?;
            }
            chat.rearm();
            self.chats.update(&chat).await?;
        } else {
            self.chat_client
                .delete_group(group_id, &self.settings.chat.system)
                .await?;
            self.chats.delete(&chat.id).await?;
        }
        Ok(())
    }

    pub async fn join_chat(&self, chat_id: ChatId, participant: &ChatParticipant) -> SagaOutcome {
        self.membership(chat_id, participant, MembershipChange::Join)
            .await
    }

    pub async fn leave_chat(&self, chat_id: ChatId, participant: &ChatParticipant) -> SagaOutcome {
        self.membership(chat_id, participant, MembershipChange::Leave)
            .await
    }

    async fn membership(
        &self,
        chat_id: ChatId,
        participant: &ChatParticipant,
        change: MembershipChange,
    ) -> SagaOutcome {
        let chat = match self.load(chat_id).await {
            Ok(chat) => chat,
            Err(outcome) => return outcome,
        };
        if !chat.active {
            return SagaOutcome::Conflict;
        }
        if !chat.accessible_by(&participant.agency_ids) {
            return SagaOutcome::Forbidden;
        }
        let Some(chat_user_id) = &participant.chat_user_id else {
            error!(chat_id = %chat_id, "participant without chat identity");
            return SagaOutcome::InternalFailure;
        };
        let Some(group_id) = &chat.group_id else {
            error!(chat_id = %chat_id, "active chat without backend group");
            return SagaOutcome::InternalFailure;
        };

        let result = match change {
            MembershipChange::Join => self.chat_client.add_member(chat_user_id, group_id).await,
            MembershipChange::Leave => {
                self.chat_client.remove_member(chat_user_id, group_id).await
            }
        };
        match result {
            Ok(()) => SagaOutcome::Ok,
            Err(err) => {
                warn!(chat_id = %chat_id, error = %err, "chat membership change failed");
                SagaOutcome::InternalFailure
            }
        }
    }

    async fn load(&self, chat_id: ChatId) -> Result<Chat, SagaOutcome> {
        match self.chats.find_by_id(&chat_id).await {
            Ok(Some(chat)) => Ok(chat),
            Ok(None) => Err(SagaOutcome::NotFound),
            Err(err) => {
                error!(chat_id = %chat_id, error = %err, "chat lookup failed");
                Err(SagaOutcome::InternalFailure)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MembershipChange {
    Join,
    Leave,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use counsel_domain::chat::ChatInterval;
    use counsel_domain::ids::ConsultingTypeId;
    use counsel_domain::ports::ChatCredential;
    use counsel_shared::config::{ChatBackendSettings, ConsultingTypeSettings};
    use counsel_testing::{FakeChatClient, InMemoryChatRepository};

    fn settings() -> Arc<SettingsSnapshot> {
        Arc::new(SettingsSnapshot {
            chat: ChatBackendSettings {
                base_url: "http://localhost:3000".into(),
                system: ChatCredential {
                    user_id: "rc-system".into(),
                    username: "system".into(),
                    password: "x".into(),
                },
                technical: ChatCredential {
                    user_id: "rc-technical".into(),
                    username: "technical".into(),
                    password: "x".into(),
                },
            },
            placeholder_email_domain: "counsel.invalid".into(),
            consulting_types: vec![ConsultingTypeSettings {
                id: ConsultingTypeId(1),
                name: "debt".into(),
                welcome_message: None,
                monitoring: false,
                feedback_chat: false,
                all_peers_visible: false,
                provision_chat_account: false,
                register_session: false,
            }],
        })
    }

    struct Harness {
        saga: ChatLifecycleSaga,
        chats: Arc<InMemoryChatRepository>,
        client: Arc<FakeChatClient>,
    }

    fn harness() -> Harness {
        let chats = Arc::new(InMemoryChatRepository::new());
        let client = Arc::new(FakeChatClient::new());
        let saga = ChatLifecycleSaga::new(chats.clone(), client.clone(), settings());
        Harness {
            saga,
            chats,
            client,
        }
    }

    fn owner() -> Consultant {
        let mut c = Consultant::new(
            "acc-owner".into(),
            "olga",
            "olga@example.org",
            vec![AgencyId(1)],
        );
        c.chat_user_id = Some(ChatUserId::from("rc-olga"));
        c
    }

    fn weekly_chat(h: &Harness, owner: &Consultant, active: bool) -> Chat {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 0).unwrap();
        let mut chat = Chat::new("weekly round", owner.id, start, vec![AgencyId(1)])
            .repeating(ChatInterval::Weekly);
        chat.group_id = Some(GroupId::from("grp-round"));
        chat.active = active;
        h.chats.seed(chat.clone());
        chat
    }

    #[tokio::test]
    async fn stopping_a_weekly_chat_rearms_it() {
        let h = harness();
        let owner = owner();
        let chat = weekly_chat(&h, &owner, true);
        h.client.seed_group(
            GroupId::from("grp-round"),
            vec![
                ChatUserId::from("rc-system"),
                ChatUserId::from("rc-olga"),
                ChatUserId::from("rc-maria"),
            ],
        );

        let outcome = h.saga.stop_chat(chat.id, &owner).await;
        assert_eq!(outcome, SagaOutcome::Ok);

        let stored = h.chats.get(&chat.id).unwrap();
        assert!(!stored.active);
        assert_eq!(stored.start_at, chat.start_at + Duration::days(7));

        // Group survives with only the service identity left.
        let members = h.client.group_members(&GroupId::from("grp-round")).unwrap();
        assert_eq!(members, vec![ChatUserId::from("rc-system")]);
        assert!(h.client.messages(&GroupId::from("grp-round")).is_empty());
    }

    #[tokio::test]
    async fn stopping_a_one_shot_chat_deletes_group_and_row() {
        let h = harness();
        let owner = owner();
        let mut chat = Chat::new("one-off", owner.id, Utc::now(), vec![AgencyId(1)]);
        chat.group_id = Some(GroupId::from("grp-once"));
        chat.active = true;
        h.chats.seed(chat.clone());
        h.client.seed_group(
            GroupId::from("grp-once"),
            vec![ChatUserId::from("rc-system")],
        );

        let outcome = h.saga.stop_chat(chat.id, &owner).await;
        assert_eq!(outcome, SagaOutcome::Ok);
        assert!(h.chats.get(&chat.id).is_none());
        assert_eq!(h.client.deleted_groups(), vec![GroupId::from("grp-once")]);
    }

    #[tokio::test]
    async fn stopping_an_inactive_chat_conflicts_with_zero_adapter_calls() {
        let h = harness();
        let owner = owner();
        let chat = weekly_chat(&h, &owner, false);

        let outcome = h.saga.stop_chat(chat.id, &owner).await;
        assert_eq!(outcome, SagaOutcome::Conflict);
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn agency_outsiders_cannot_stop_a_chat() {
        let h = harness();
        let owner = owner();
        let chat = weekly_chat(&h, &owner, true);
        let mut outsider = owner.clone();
        outsider.agency_ids = vec![AgencyId(9)];

        let outcome = h.saga.stop_chat(chat.id, &outsider).await;
        assert_eq!(outcome, SagaOutcome::Forbidden);
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn stopping_an_unknown_chat_is_not_found() {
        let h = harness();
        let outcome = h.saga.stop_chat(ChatId::new(), &owner()).await;
        assert_eq!(outcome, SagaOutcome::NotFound);
    }

    #[tokio::test]
    async fn starting_marks_the_chat_active() {
        let h = harness();
        let owner = owner();
        let chat = weekly_chat(&h, &owner, false);

        let outcome = h.saga.start_chat(chat.id, &owner).await;
        assert_eq!(outcome, SagaOutcome::Ok);
        assert!(h.chats.get(&chat.id).unwrap().active);

        let again = h.saga.start_chat(chat.id, &owner).await;
        assert_eq!(again, SagaOutcome::Conflict);
    }

    #[tokio::test]
    async fn join_adds_the_participant_to_the_group() {
        let h = harness();
        let owner = owner();
        let chat = weekly_chat(&h, &owner, true);
        h.client.seed_group(
            GroupId::from("grp-round"),
            vec![ChatUserId::from("rc-system")],
        );

        let mut user = User::new(
            "acc-maria".into(),
            "maria",
            "maria@example.org",
            vec![AgencyId(1)],
        );
        user.chat_user_id = Some(ChatUserId::from("rc-maria"));

        let outcome = h
            .saga
            .join_chat(chat.id, &ChatParticipant::from(&user))
            .await;
        assert_eq!(outcome, SagaOutcome::Ok);
        let members = h.client.group_members(&GroupId::from("grp-round")).unwrap();
        assert!(members.contains(&ChatUserId::from("rc-maria")));

        let left = h
            .saga
            .leave_chat(chat.id, &ChatParticipant::from(&user))
            .await;
        assert_eq!(left, SagaOutcome::Ok);
        let members = h.client.group_members(&GroupId::from("grp-round")).unwrap();
        assert!(!members.contains(&ChatUserId::from("rc-maria")));
    }

    #[tokio::test]
    async fn joining_an_inactive_chat_conflicts() {
        let h = harness();
        let owner = owner();
        let chat = weekly_chat(&h, &owner, false);

        let outcome = h
            .saga
            .join_chat(chat.id, &ChatParticipant::from(&owner))
            .await;
        assert_eq!(outcome, SagaOutcome::Conflict);
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn joining_without_chat_identity_is_an_internal_failure() {
        let h = harness();
        let owner = owner();
        let chat = weekly_chat(&h, &owner, true);
        let participant = ChatParticipant {
            chat_user_id: None,
            agency_ids: vec![AgencyId(1)],
        };

        let outcome = h.saga.join_chat(chat.id, &participant).await;
        assert_eq!(outcome, SagaOutcome::InternalFailure);
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_while_stopping_is_an_internal_failure() {
        let h = harness();
        let owner = owner();
        let chat = weekly_chat(&h, &owner, true);
        h.client.seed_group(
            GroupId::from("grp-round"),
            vec![ChatUserId::from("rc-system")],
        );
        h.client.fail_on("purge_all_messages");

        let outcome = h.saga.stop_chat(chat.id, &owner).await;
        assert_eq!(outcome, SagaOutcome::InternalFailure);
        // Local row untouched.
        assert!(h.chats.get(&chat.id).unwrap().active);
    }
}
