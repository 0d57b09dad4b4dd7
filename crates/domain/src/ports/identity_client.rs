//! Typed client contract for the identity/credential provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::AccountId;

/// Named permission resolved per-identity from the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entitlement {
    ViewAllPeerSessions,
    ViewAllFeedbackSessions,
}

impl Entitlement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entitlement::ViewAllPeerSessions => "view-all-peer-sessions",
            Entitlement::ViewAllFeedbackSessions => "view-all-feedback-sessions",
        }
    }
}

impl fmt::Display for Entitlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account role assigned right after account creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Asker,
    Consultant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Asker => "asker",
            Role::Consultant => "consultant",
        }
    }
}

/// Profile data for a new identity-provider account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountProfile {
    /// Decoded username form
    pub username: String,
    pub email: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum IdentityError {
    #[error("Username already taken: {username}")]
    UsernameTaken { username: String },

    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: AccountId },

    #[error("Identity provider rejected {operation}: {reason}")]
    Rejected { operation: String, reason: String },

    #[error("Identity provider transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn create_account(&self, profile: &AccountProfile) -> Result<AccountId, IdentityError>;

    /// Delete an account. Idempotent: deleting an already-deleted account
    /// succeeds, so double-rollback is safe.
    async fn delete_account(&self, account_id: &AccountId) -> Result<(), IdentityError>;

    async fn set_role(&self, account_id: &AccountId, role: Role) -> Result<(), IdentityError>;

    async fn set_password(
        &self,
        account_id: &AccountId,
        password: &str,
    ) -> Result<(), IdentityError>;

    async fn set_email(&self, account_id: &AccountId, email: &str) -> Result<(), IdentityError>;

    async fn is_username_available(&self, username: &str) -> Result<bool, IdentityError>;

    async fn has_entitlement(
        &self,
        account_id: &AccountId,
        entitlement: Entitlement,
    ) -> Result<bool, IdentityError>;
}
