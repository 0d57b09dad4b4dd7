//! Rollback-free account maintenance: single identity-provider call plus
//! a local persist, no compensation machinery needed.

use std::sync::Arc;

use tracing::{error, info};

use counsel_domain::ids::{ConsultantId, UserId};
use counsel_domain::ports::{ConsultantRepository, IdentityClient, UserRepository};

use crate::outcome::SagaOutcome;

pub struct AccountMaintenance {
    identity: Arc<dyn IdentityClient>,
    users: Arc<dyn UserRepository>,
    consultants: Arc<dyn ConsultantRepository>,
}

impl AccountMaintenance {
    pub fn new(
        identity: Arc<dyn IdentityClient>,
        users: Arc<dyn UserRepository>,
        consultants: Arc<dyn ConsultantRepository>,
    ) -> Self {
        Self {
            identity,
            users,
            consultants,
        }
    }

    /// Change an asker's email at the identity provider first, then
    /// locally. A local failure after the provider accepted the change is
    /// tolerable: the provider is authoritative for login email.
    pub async fn change_user_email(&self, user_id: UserId, email: &str) -> SagaOutcome {
        let mut user = match self.users.find_by_id(&user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return SagaOutcome::NotFound,
            Err(err) => {
                error!(user_id = %user_id, error = %err, "user lookup failed");
                return SagaOutcome::InternalFailure;
            }
        };

        if let Err(err) = self.identity.set_email(&user.account_id, email).await {
            error!(user_id = %user_id, error = %err, "identity email update failed");
            return SagaOutcome::InternalFailure;
        }

        user.email = email.to_owned();
        match self.users.update(&user).await {
            Ok(()) => {
                info!(user_id = %user_id, "email updated");
                SagaOutcome::Ok
            }
            Err(err) => {
                error!(user_id = %user_id, error = %err, "local email update failed");
                SagaOutcome::InternalFailure
            }
        }
    }

    /// Update a consultant's absence state. Purely local.
    pub async fn update_absence(
        &self,
        consultant_id: ConsultantId,
        absent: bool,
        message: Option<String>,
    ) -> SagaOutcome {
        let mut consultant = match self.consultants.find_by_id(&consultant_id).await {
            Ok(Some(consultant)) => consultant,
            Ok(None) => return SagaOutcome::NotFound,
            Err(err) => {
                error!(consultant_id = %consultant_id, error = %err, "consultant lookup failed");
                return SagaOutcome::InternalFailure;
            }
        };

        consultant.set_absence(absent, message);
        match self.consultants.update(&consultant).await {
            Ok(()) => SagaOutcome::Ok,
            Err(err) => {
                error!(
                    consultant_id = %consultant_id,
                    error = %err,
                    "absence update failed"
                );
                SagaOutcome::InternalFailure
            }
        }
    }
}
