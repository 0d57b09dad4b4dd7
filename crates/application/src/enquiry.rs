//! Enquiry creation: transition a session from `Initial` to
//! "enquiry submitted" exactly once, creating and populating its
//! chat-backend group(s).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use counsel_domain::group_name;
use counsel_domain::ids::{ChatUserId, SessionId, UserId};
use counsel_domain::ports::{
    ChatClient, MonitoringInitializer, SessionRepository, UserRepository,
};
use counsel_domain::session::Session;
use counsel_domain::user::User;
use counsel_domain::username;
use counsel_shared::config::ConsultingTypeSettings;
use counsel_shared::SettingsSnapshot;

use crate::outcome::SagaOutcome;
use crate::saga::{CompensationStack, SagaError};
use crate::steps::{GroupSteps, PeerScope};

pub struct EnquiryCreationSaga {
    sessions: Arc<dyn SessionRepository>,
    users: Arc<dyn UserRepository>,
    chat: Arc<dyn ChatClient>,
    monitoring: Arc<dyn MonitoringInitializer>,
    steps: GroupSteps,
    settings: Arc<SettingsSnapshot>,
}

impl EnquiryCreationSaga {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        users: Arc<dyn UserRepository>,
        chat: Arc<dyn ChatClient>,
        monitoring: Arc<dyn MonitoringInitializer>,
        steps: GroupSteps,
        settings: Arc<SettingsSnapshot>,
    ) -> Self {
        Self {
            sessions,
            users,
            chat,
            monitoring,
            steps,
            settings,
        }
    }

    /// Submit the first enquiry message for a session.
    ///
    /// `caller_chat_id` is the chat-backend identity the request was
    /// authenticated with; a mismatch against the session owner's stored
    /// identity is a request/credential problem, not a saga failure.
    pub async fn create_enquiry(
        &self,
        session_id: SessionId,
        caller: UserId,
        caller_chat_id: &ChatUserId,
        message: &str,
    ) -> SagaOutcome {
        let started_at = Utc::now();

        let mut session = match self.sessions.find_by_id(&session_id).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                warn!(session_id = %session_id, "enquiry for unknown session");
                return SagaOutcome::BadRequest;
            }
            Err(err) => {
                error!(session_id = %session_id, error = %err, "session lookup failed");
                return SagaOutcome::InternalFailure;
            }
        };

        let user = match self.users.find_by_id(&session.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(session_id = %session_id, "session owner row missing");
                return SagaOutcome::BadRequest;
            }
            Err(err) => {
                error!(session_id = %session_id, error = %err, "user lookup failed");
                return SagaOutcome::InternalFailure;
            }
        };

        if session.user_id != caller || user.chat_user_id.as_ref() != Some(caller_chat_id) {
            warn!(
                session_id = %session_id,
                "caller identity does not match session owner"
            );
            return SagaOutcome::BadRequest;
        }

        // Idempotency guard: once the marker is committed, re-invocation is
        // a conflict with zero adapter calls.
        if session.has_enquiry() {
            return SagaOutcome::Conflict;
        }

        let Some(ct) = self.settings.consulting_type(session.consulting_type) else {
            error!(
                session_id = %session_id,
                consulting_type = %session.consulting_type,
                "no configuration for session's consulting type"
            );
            return SagaOutcome::InternalFailure;
        };

        info!(session_id = %session_id, "creating enquiry");
        let mut stack = CompensationStack::new();
        match self
            .run(&mut stack, &mut session, &user, ct, caller_chat_id, message, started_at)
            .await
        {
            Ok(()) => {
                stack.discharge();
                info!(session_id = %session_id, "enquiry created");
                SagaOutcome::Created
            }
            Err(err) => {
                error!(session_id = %session_id, error = %err, "enquiry step failed, compensating");
                stack.unwind().await;
                SagaOutcome::InternalFailure
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        stack: &mut CompensationStack,
        session: &mut Session,
        user: &User,
        ct: &ConsultingTypeSettings,
        caller_chat_id: &ChatUserId,
        message: &str,
        started_at: DateTime<Utc>,
    ) -> Result<(), SagaError> {
        // 1. Primary group.
        let name = group_name::session_group(session.id, started_at);
        let group_id = self
            .chat
            .create_group(&name, &self.settings.chat.system)
            .await?;
        stack.push(
            "delete primary group",
            self.steps.delete_group_compensation(group_id.clone()),
        );

        // 2. Enquiry message, authored by the asker.
        self.chat
            .post_message(message, caller_chat_id, &group_id)
            .await?;

        // 3. Welcome message, best-effort.
        if let Some(template) = &ct.welcome_message {
            let text = template.replace("${username}", &username::decode(&user.username));
            if let Err(err) = self.chat.post_system_message(&text, &group_id).await {
                warn!(session_id = %session.id, error = %err, "welcome message not posted");
            }
        }

        // 4. Monitoring. The compensation is recorded before the call so
        // partial monitoring rows are cleaned when initialization itself
        // fails mid-way.
        if ct.monitoring {
            let monitoring = Arc::clone(&self.monitoring);
            let snapshot = session.clone();
            stack.push("remove monitoring", async move {
                monitoring.remove(&snapshot).await?;
                Ok(())
            });
            self.monitoring.initialize(session).await?;
        }

        // 5. System identity, needed for later automated group management.
        self.steps.add_system_member(&group_id).await?;
        stack.push(
            "remove system identity from primary group",
            self.steps.remove_member_compensation(
                self.settings.chat.system.user_id.clone(),
                group_id.clone(),
            ),
        );

        // 6. Entitled co-consultants at the session's agency.
        for peer in self
            .steps
            .entitled_peers(session.agency_id, PeerScope::Primary)
            .await?
        {
            let Some(peer_chat_id) = peer.chat_user_id else {
                continue;
            };
            self.chat.add_member(&peer_chat_id, &group_id).await?;
            stack.push(
                "remove peer from primary group",
                self.steps
                    .remove_member_compensation(peer_chat_id, group_id.clone()),
            );
        }

        // 7. Commit the idempotency marker.
        session.record_enquiry(group_id.clone(), started_at);
        self.sessions.update(session).await?;
        let sessions = Arc::clone(&self.sessions);
        let mut reverted = session.clone();
        reverted.clear_enquiry();
        stack.push("revert session enquiry marker", async move {
            sessions.update(&reverted).await?;
            Ok(())
        });

        // 8. Feedback channel.
        if ct.feedback_chat {
            let fb_name = group_name::feedback_group(session.id, started_at);
            let fb_id = self
                .chat
                .create_group(&fb_name, &self.settings.chat.system)
                .await?;
            stack.push(
                "delete feedback group",
                self.steps.delete_group_compensation(fb_id.clone()),
            );

            self.steps.add_system_member(&fb_id).await?;
            stack.push(
                "remove system identity from feedback group",
                self.steps.remove_member_compensation(
                    self.settings.chat.system.user_id.clone(),
                    fb_id.clone(),
                ),
            );

            for peer in self
                .steps
                .entitled_peers(session.agency_id, PeerScope::Feedback)
                .await?
            {
                let Some(peer_chat_id) = peer.chat_user_id else {
                    continue;
                };
                self.chat.add_member(&peer_chat_id, &fb_id).await?;
                stack.push(
                    "remove peer from feedback group",
                    self.steps
                        .remove_member_compensation(peer_chat_id, fb_id.clone()),
                );
            }

            self.chat
                .purge_system_messages(&fb_id, started_at, Utc::now())
                .await?;

            session.set_feedback_group(fb_id);
            self.sessions.update(session).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use counsel_domain::consultant::Consultant;
    use counsel_domain::ids::{AgencyId, ConsultingTypeId, GroupId};
    use counsel_domain::ports::ChatCredential;
    use counsel_domain::session::SessionStatus;
    use counsel_shared::config::ChatBackendSettings;
    use counsel_testing::{
        ChatCall, FakeChatClient, FakeMonitoring, InMemoryConsultantRepository,
        InMemorySessionRepository, InMemoryUserRepository, StaticVisibility,
    };

    fn settings(ct: ConsultingTypeSettings) -> Arc<SettingsSnapshot> {
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
            consulting_types: vec![ct],
        })
    }

    fn consulting_type() -> ConsultingTypeSettings {
        ConsultingTypeSettings {
            id: ConsultingTypeId(1),
            name: "debt".into(),
            welcome_message: None,
            monitoring: false,
            feedback_chat: false,
            all_peers_visible: false,
            provision_chat_account: false,
            register_session: true,
        }
    }

    struct Harness {
        saga: EnquiryCreationSaga,
        sessions: Arc<InMemorySessionRepository>,
        users: Arc<InMemoryUserRepository>,
        consultants: Arc<InMemoryConsultantRepository>,
        chat: Arc<FakeChatClient>,
        monitoring: Arc<FakeMonitoring>,
        visibility: Arc<StaticVisibility>,
    }

    fn harness(ct: ConsultingTypeSettings) -> Harness {
        let sessions = Arc::new(InMemorySessionRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let consultants = Arc::new(InMemoryConsultantRepository::new());
        let chat = Arc::new(FakeChatClient::new());
        let monitoring = Arc::new(FakeMonitoring::new());
        let visibility = Arc::new(StaticVisibility::new());
        let settings = settings(ct);
        let steps = GroupSteps::new(
            chat.clone(),
            consultants.clone(),
            visibility.clone(),
            settings.clone(),
        );
        let saga = EnquiryCreationSaga::new(
            sessions.clone(),
            users.clone(),
            chat.clone(),
            monitoring.clone(),
            steps,
            settings,
        );
        Harness {
            saga,
            sessions,
            users,
            consultants,
            chat,
            monitoring,
            visibility,
        }
    }

    fn asker(h: &Harness) -> (User, ChatUserId) {
        let mut user = User::new("acc-asker".into(), "maria", "maria@example.org", vec![AgencyId(1)]);
        let chat_id = ChatUserId::from("rc-maria");
        user.chat_user_id = Some(chat_id.clone());
        h.users.seed(user.clone());
        (user, chat_id)
    }

    fn initial_session(h: &Harness, user: &User) -> Session {
        let session = Session::new_initial(user.id, AgencyId(1), ConsultingTypeId(1), false);
        h.sessions.seed(session.clone());
        session
    }

    #[tokio::test]
    async fn creates_group_posts_message_and_commits_marker() {
        let h = harness(consulting_type());
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "I need help")
            .await;
        assert_eq!(outcome, SagaOutcome::Created);

        let stored = h.sessions.get(&session.id).unwrap();
        assert_eq!(stored.status, SessionStatus::New);
        assert!(stored.has_enquiry());
        let group_id = stored.group_id.unwrap();
        let members = h.chat.group_members(&group_id).unwrap();
        assert!(members.contains(&chat_id));
        assert!(members.contains(&ChatUserId::from("rc-system")));
        let messages = h.chat.messages(&group_id);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "I need help");
    }

    #[tokio::test]
    async fn second_invocation_conflicts_with_one_live_group() {
        let h = harness(consulting_type());
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);

        let first = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "first")
            .await;
        let second = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "again")
            .await;

        assert_eq!(first, SagaOutcome::Created);
        assert_eq!(second, SagaOutcome::Conflict);
        assert_eq!(h.chat.live_groups().len(), 1);
    }

    #[tokio::test]
    async fn identity_mismatch_is_rejected_before_any_adapter_call() {
        let h = harness(consulting_type());
        let (user, _) = asker(&h);
        let session = initial_session(&h, &user);

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &ChatUserId::from("rc-someone-else"), "hi")
            .await;

        assert_eq!(outcome, SagaOutcome::BadRequest);
        assert!(h.chat.calls().is_empty());
    }

    #[rstest::rstest]
    #[case::enquiry_message("post_message")]
    #[case::system_member("add_member")]
    #[tokio::test]
    async fn chat_failure_at_any_step_leaves_nothing_behind(#[case] op: &str) {
        let h = harness(consulting_type());
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);
        h.chat.fail_on(op);

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "hi")
            .await;

        assert_eq!(outcome, SagaOutcome::InternalFailure);
        assert!(h.chat.live_groups().is_empty());
        let stored = h.sessions.get(&session.id).unwrap();
        assert_eq!(stored.status, SessionStatus::Initial);
        assert!(!stored.has_enquiry());
    }

    #[tokio::test]
    async fn message_failure_deletes_the_group() {
        let h = harness(consulting_type());
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);
        h.chat.fail_on("post_message");

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "hi")
            .await;

        assert_eq!(outcome, SagaOutcome::InternalFailure);
        assert!(h.chat.live_groups().is_empty());
        let stored = h.sessions.get(&session.id).unwrap();
        assert_eq!(stored.status, SessionStatus::Initial);
        assert!(stored.group_id.is_none());
    }

    #[tokio::test]
    async fn welcome_message_failure_is_best_effort() {
        let mut ct = consulting_type();
        ct.welcome_message = Some("Hello ${username}!".into());
        let h = harness(ct);
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);
        h.chat.fail_on("post_system_message");

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "hi")
            .await;

        assert_eq!(outcome, SagaOutcome::Created);
        assert_eq!(h.chat.live_groups().len(), 1);
    }

    #[tokio::test]
    async fn welcome_message_substitutes_decoded_username() {
        let mut ct = consulting_type();
        ct.welcome_message = Some("Hello ${username}!".into());
        let h = harness(ct);
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "hi")
            .await;
        assert_eq!(outcome, SagaOutcome::Created);

        let group_id = h.sessions.get(&session.id).unwrap().group_id.unwrap();
        let texts: Vec<String> = h
            .chat
            .messages(&group_id)
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert!(texts.contains(&"Hello maria!".to_string()));
    }

    #[tokio::test]
    async fn monitoring_failure_removes_partial_rows_and_group() {
        let mut ct = consulting_type();
        ct.monitoring = true;
        let h = harness(ct);
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);
        h.monitoring.fail_initialize();

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "hi")
            .await;

        assert_eq!(outcome, SagaOutcome::InternalFailure);
        assert_eq!(h.monitoring.removals(), vec![session.id]);
        assert!(h.chat.live_groups().is_empty());
    }

    #[tokio::test]
    async fn monitoring_rows_survive_a_successful_run() {
        let mut ct = consulting_type();
        ct.monitoring = true;
        let h = harness(ct);
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "hi")
            .await;

        assert_eq!(outcome, SagaOutcome::Created);
        assert!(h.monitoring.is_initialized(&session.id));
        assert!(h.monitoring.removals().is_empty());
    }

    #[tokio::test]
    async fn unwind_mirrors_the_forward_calls_in_reverse() {
        let h = harness(consulting_type());
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);
        let mut peer =
            Consultant::new("acc-a".into(), "anna", "anna@example.org", vec![AgencyId(1)]);
        peer.chat_user_id = Some(ChatUserId::from("rc-anna"));
        h.visibility.allow_peer_view(peer.id);
        h.consultants.seed(peer);
        h.sessions.fail_on("update");

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "hi")
            .await;
        assert_eq!(outcome, SagaOutcome::InternalFailure);

        // Forward: create, message, system member, peer member. The unwind
        // must cover each of them exactly once, newest first.
        let group = GroupId::from("grp-1");
        let calls = h.chat.calls();
        assert_eq!(calls.len(), 7);
        assert_eq!(
            &calls[4..],
            &[
                ChatCall::RemoveMember {
                    user_id: ChatUserId::from("rc-anna"),
                    group_id: group.clone(),
                },
                ChatCall::RemoveMember {
                    user_id: ChatUserId::from("rc-system"),
                    group_id: group.clone(),
                },
                ChatCall::DeleteGroup { group_id: group },
            ]
        );
    }

    #[tokio::test]
    async fn peer_add_failure_removes_already_added_peers() {
        let h = harness(consulting_type());
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);
        for (account, name, rc) in [
            ("acc-a", "anna", "rc-anna"),
            ("acc-b", "bernd", "rc-bernd"),
        ] {
            let mut peer =
                Consultant::new(account.into(), name, "peer@example.org", vec![AgencyId(1)]);
            peer.chat_user_id = Some(ChatUserId::from(rc));
            h.visibility.allow_peer_view(peer.id);
            h.consultants.seed(peer);
        }
        // System identity joins first; the second of the two peers fails.
        h.chat.fail_on_nth("add_member", 3);

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "hi")
            .await;
        assert_eq!(outcome, SagaOutcome::InternalFailure);
        assert!(h.chat.live_groups().is_empty());

        // Whichever peer joined is the first one compensated away.
        let group = GroupId::from("grp-1");
        let calls = h.chat.calls();
        assert_eq!(calls.len(), 8);
        let ChatCall::AddMember { user_id: joined, .. } = &calls[3] else {
            panic!("fourth chat call should add the first peer");
        };
        assert_eq!(
            &calls[5..],
            &[
                ChatCall::RemoveMember {
                    user_id: joined.clone(),
                    group_id: group.clone(),
                },
                ChatCall::RemoveMember {
                    user_id: ChatUserId::from("rc-system"),
                    group_id: group.clone(),
                },
                ChatCall::DeleteGroup { group_id: group },
            ]
        );
    }

    #[tokio::test]
    async fn session_persist_failure_unwinds_every_remote_step() {
        let h = harness(consulting_type());
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);
        h.sessions.fail_on("update");

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "hi")
            .await;

        assert_eq!(outcome, SagaOutcome::InternalFailure);
        assert!(h.chat.live_groups().is_empty());
        assert_eq!(h.chat.deleted_groups().len(), 1);
        // The compensations ran after every forward call.
        let calls = h.chat.calls();
        assert!(matches!(calls.last(), Some(ChatCall::DeleteGroup { .. })));
    }

    #[tokio::test]
    async fn feedback_inclusion_is_entitlement_gated() {
        let mut ct = consulting_type();
        ct.feedback_chat = true;
        let h = harness(ct);
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);

        let mut entitled = Consultant::new("acc-a".into(), "anna", "anna@example.org", vec![AgencyId(1)]);
        entitled.chat_user_id = Some(ChatUserId::from("rc-anna"));
        let mut plain = Consultant::new("acc-b".into(), "bernd", "bernd@example.org", vec![AgencyId(1)]);
        plain.chat_user_id = Some(ChatUserId::from("rc-bernd"));
        h.visibility.allow_feedback_view(entitled.id);
        h.consultants.seed(entitled);
        h.consultants.seed(plain);

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "hi")
            .await;
        assert_eq!(outcome, SagaOutcome::Created);

        let stored = h.sessions.get(&session.id).unwrap();
        let fb = stored.feedback_group_id.unwrap();
        let fb_members = h.chat.group_members(&fb).unwrap();
        assert!(fb_members.contains(&ChatUserId::from("rc-anna")));
        assert!(!fb_members.contains(&ChatUserId::from("rc-bernd")));
        assert!(!fb_members.contains(&chat_id));
    }

    #[tokio::test]
    async fn feedback_purge_failure_reverts_both_groups() {
        let mut ct = consulting_type();
        ct.feedback_chat = true;
        let h = harness(ct);
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);
        h.chat.fail_on("purge_system_messages");

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "hi")
            .await;

        assert_eq!(outcome, SagaOutcome::InternalFailure);
        assert!(h.chat.live_groups().is_empty());
        let stored = h.sessions.get(&session.id).unwrap();
        assert_eq!(stored.status, SessionStatus::Initial);
        assert!(stored.group_id.is_none());
        assert!(stored.feedback_group_id.is_none());
    }

    #[tokio::test]
    async fn peers_without_chat_identity_are_skipped() {
        let h = harness(consulting_type());
        let (user, chat_id) = asker(&h);
        let session = initial_session(&h, &user);

        let unprovisioned =
            Consultant::new("acc-c".into(), "clara", "clara@example.org", vec![AgencyId(1)]);
        h.visibility.allow_peer_view(unprovisioned.id);
        h.consultants.seed(unprovisioned);

        let outcome = h
            .saga
            .create_enquiry(session.id, user.id, &chat_id, "hi")
            .await;
        assert_eq!(outcome, SagaOutcome::Created);

        let group_id = h.sessions.get(&session.id).unwrap().group_id.unwrap();
        let members = h.chat.group_members(&group_id).unwrap();
        assert_eq!(members.len(), 2); // asker + system
    }
}
