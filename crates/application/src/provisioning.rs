//! Account provisioning: create a new asker or consultant spanning the
//! identity provider, the local store and, for certain consulting types,
//! an upfront chat-backend login/logout handshake that yields a
//! session-independent chat identity.

use std::sync::Arc;

use tracing::{error, info, warn};

use counsel_domain::consultant::{Agency, Consultant};
use counsel_domain::error::DomainError;
use counsel_domain::ids::{AgencyId, ChatUserId, ConsultingTypeId};
use counsel_domain::ports::{
    AccountProfile, AgencyService, ChatClient, ConsultantRepository, IdentityClient,
    IdentityError, Role, SessionRepository, UserRepository,
};
use counsel_domain::session::Session;
use counsel_domain::user::User;
use counsel_domain::username;
use counsel_shared::config::ConsultingTypeSettings;
use counsel_shared::SettingsSnapshot;

use crate::outcome::SagaOutcome;
use crate::saga::{CompensationStack, SagaError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegistrationKind {
    Asker,
    Consultant,
}

/// Validated registration payload. Username may arrive in either the
/// encoded or the decoded form.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub agency_id: AgencyId,
    pub consulting_type: ConsultingTypeId,
}

pub struct AccountProvisioningSaga {
    identity: Arc<dyn IdentityClient>,
    users: Arc<dyn UserRepository>,
    consultants: Arc<dyn ConsultantRepository>,
    sessions: Arc<dyn SessionRepository>,
    agencies: Arc<dyn AgencyService>,
    chat: Arc<dyn ChatClient>,
    settings: Arc<SettingsSnapshot>,
}

impl AccountProvisioningSaga {
    pub fn new(
        identity: Arc<dyn IdentityClient>,
        users: Arc<dyn UserRepository>,
        consultants: Arc<dyn ConsultantRepository>,
        sessions: Arc<dyn SessionRepository>,
        agencies: Arc<dyn AgencyService>,
        chat: Arc<dyn ChatClient>,
        settings: Arc<SettingsSnapshot>,
    ) -> Self {
        Self {
            identity,
            users,
            consultants,
            sessions,
            agencies,
            chat,
            settings,
        }
    }

    pub async fn register_user(&self, request: RegistrationRequest) -> SagaOutcome {
        self.register(request, RegistrationKind::Asker).await
    }

    pub async fn register_consultant(&self, request: RegistrationRequest) -> SagaOutcome {
        self.register(request, RegistrationKind::Consultant).await
    }

    async fn register(&self, request: RegistrationRequest, kind: RegistrationKind) -> SagaOutcome {
        // Pre-checks carry no compensation: nothing has been created yet.
        let Some(ct) = self.settings.consulting_type(request.consulting_type) else {
            warn!(
                consulting_type = %request.consulting_type,
                "registration for unknown consulting type"
            );
            return SagaOutcome::BadRequest;
        };

        let decoded = username::decode(&request.username);
        match self.identity.is_username_available(&decoded).await {
            Ok(true) => {}
            Ok(false) => return SagaOutcome::Conflict,
            Err(err) => {
                error!(error = %err, "username availability check failed");
                return SagaOutcome::InternalFailure;
            }
        }

        let agency = match self.agencies.get_agency(request.agency_id).await {
            Ok(agency) => agency,
            Err(DomainError::AgencyNotFound { agency_id }) => {
                warn!(agency_id = %agency_id, "registration for unknown agency");
                return SagaOutcome::BadRequest;
            }
            Err(err) => {
                error!(error = %err, "agency lookup failed");
                return SagaOutcome::InternalFailure;
            }
        };
        if agency.consulting_type != request.consulting_type {
            warn!(
                agency_id = %agency.id,
                consulting_type = %request.consulting_type,
                "agency does not serve the requested consulting type"
            );
            return SagaOutcome::BadRequest;
        }

        info!(username = %decoded, "provisioning account");
        let mut stack = CompensationStack::new();
        match self
            .run(&mut stack, &request, kind, ct, &agency, &decoded)
            .await
        {
            Ok(()) => {
                stack.discharge();
                info!(username = %decoded, "account provisioned");
                SagaOutcome::Created
            }
            Err(err) => {
                error!(
                    username = %decoded,
                    error = %err,
                    "provisioning step failed, compensating"
                );
                stack.unwind().await;
                match err {
                    // A racing registration won the name between the
                    // availability pre-check and account creation.
                    SagaError::Identity(IdentityError::UsernameTaken { .. }) => {
                        SagaOutcome::Conflict
                    }
                    _ => SagaOutcome::InternalFailure,
                }
            }
        }
    }

    async fn run(
        &self,
        stack: &mut CompensationStack,
        request: &RegistrationRequest,
        kind: RegistrationKind,
        ct: &ConsultingTypeSettings,
        agency: &Agency,
        decoded: &str,
    ) -> Result<(), SagaError> {
        // Identity-provider account. Everything from here on rolls back by
        // deleting the account (idempotent on the provider side).
        let account_id = self
            .identity
            .create_account(&AccountProfile {
                username: decoded.to_owned(),
                email: request.email.clone(),
            })
            .await?;
        let identity = Arc::clone(&self.identity);
        let rollback_account = account_id.clone();
        stack.push("delete identity account", async move {
            identity.delete_account(&rollback_account).await?;
            Ok(())
        });

        let role = match kind {
            RegistrationKind::Asker => Role::Asker,
            RegistrationKind::Consultant => Role::Consultant,
        };
        self.identity.set_role(&account_id, role).await?;
        self.identity
            .set_password(&account_id, &request.password)
            .await?;

        let email = match &request.email {
            Some(email) => email.clone(),
            None => {
                let placeholder =
                    format!("{}@{}", account_id, self.settings.placeholder_email_domain);
                self.identity.set_email(&account_id, &placeholder).await?;
                placeholder
            }
        };

        // First-time chat handshake, when the consulting type provisions a
        // session-independent chat identity.
        let chat_user_id = if ct.provision_chat_account {
            Some(self.chat_handshake(decoded, &request.password).await?)
        } else {
            None
        };

        // Local row.
        match kind {
            RegistrationKind::Asker => {
                let mut user = User::new(
                    account_id.clone(),
                    request.username.as_str(),
                    email,
                    vec![request.agency_id],
                );
                user.chat_user_id = chat_user_id;
                self.users.save(&user).await?;
                let users = Arc::clone(&self.users);
                let user_id = user.id;
                stack.push("delete local user row", async move {
                    users.delete(&user_id).await?;
                    Ok(())
                });

                if ct.register_session {
                    let session = Session::new_initial(
                        user.id,
                        request.agency_id,
                        request.consulting_type,
                        agency.team_agency,
                    );
                    self.sessions.save(&session).await?;
                }
            }
            RegistrationKind::Consultant => {
                let mut consultant = Consultant::new(
                    account_id.clone(),
                    request.username.as_str(),
                    email,
                    vec![request.agency_id],
                );
                consultant.team_consultant = agency.team_agency;
                consultant.chat_user_id = chat_user_id;
                self.consultants.save(&consultant).await?;
                let consultants = Arc::clone(&self.consultants);
                let consultant_id = consultant.id;
                stack.push("delete local consultant row", async move {
                    consultants.delete(&consultant_id).await?;
                    Ok(())
                });
            }
        }

        Ok(())
    }

    /// Log in once against the chat backend to materialize the account's
    /// chat identity, then log straight out again.
    async fn chat_handshake(
        &self,
        decoded_username: &str,
        password: &str,
    ) -> Result<ChatUserId, SagaError> {
        let session = self.chat.login(decoded_username, password).await?;
        let chat_user_id = session.user_id.clone();
        if let Err(err) = self.chat.logout(&session).await {
            warn!(error = %err, "chat handshake logout failed");
        }
        Ok(chat_user_id)
    }
}
