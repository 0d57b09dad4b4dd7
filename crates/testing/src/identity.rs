//! Recording fake of the identity provider.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use counsel_domain::ids::AccountId;
use counsel_domain::ports::{AccountProfile, Entitlement, IdentityClient, IdentityError, Role};

use crate::faults::FaultPlan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityCall {
    CreateAccount { username: String },
    DeleteAccount { account_id: AccountId },
    SetRole { account_id: AccountId },
    SetPassword { account_id: AccountId },
    SetEmail { account_id: AccountId, email: String },
    UsernameCheck { username: String },
    EntitlementCheck { account_id: AccountId },
}

#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub profile: AccountProfile,
    pub role: Option<Role>,
    pub password: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default)]
struct IdentityState {
    accounts: HashMap<AccountId, AccountRecord>,
    taken_usernames: HashSet<String>,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct FakeIdentityClient {
    state: Mutex<IdentityState>,
    entitlements: Mutex<HashMap<AccountId, HashSet<Entitlement>>>,
    calls: Mutex<Vec<IdentityCall>>,
    faults: Mutex<FaultPlan>,
}

impl FakeIdentityClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, op: &str) {
        self.faults.lock().unwrap().fail_on(op);
    }

    pub fn calls(&self) -> Vec<IdentityCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn account(&self, account_id: &AccountId) -> Option<AccountRecord> {
        self.state.lock().unwrap().accounts.get(account_id).cloned()
    }

    pub fn account_count(&self) -> usize {
        self.state.lock().unwrap().accounts.len()
    }

    pub fn delete_calls(&self, account_id: &AccountId) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, IdentityCall::DeleteAccount { account_id: id } if id == account_id))
            .count()
    }

    /// Mark a username as taken without creating an account.
    pub fn reserve_username(&self, username: &str) {
        self.state
            .lock()
            .unwrap()
            .taken_usernames
            .insert(username.to_string());
    }

    pub fn grant(&self, account_id: &AccountId, entitlement: Entitlement) {
        self.entitlements
            .lock()
            .unwrap()
            .entry(account_id.clone())
            .or_default()
            .insert(entitlement);
    }

    fn record(&self, call: IdentityCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn trip(&self, op: &'static str) -> Result<(), IdentityError> {
        if self.faults.lock().unwrap().trip(op) {
            return Err(IdentityError::Rejected {
                operation: op.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityClient for FakeIdentityClient {
    async fn create_account(&self, profile: &AccountProfile) -> Result<AccountId, IdentityError> {
        self.record(IdentityCall::CreateAccount {
            username: profile.username.clone(),
        });
        self.trip("create_account")?;
        let mut state = self.state.lock().unwrap();
        if !state.taken_usernames.insert(profile.username.clone()) {
            return Err(IdentityError::UsernameTaken {
                username: profile.username.clone(),
            });
        }
        state.seq += 1;
        let account_id = AccountId(format!("acc-{}", state.seq));
        state.accounts.insert(
            account_id.clone(),
            AccountRecord {
                profile: profile.clone(),
                role: None,
                password: None,
                email: profile.email.clone(),
            },
        );
        Ok(account_id)
    }

    async fn delete_account(&self, account_id: &AccountId) -> Result<(), IdentityError> {
        self.record(IdentityCall::DeleteAccount {
            account_id: account_id.clone(),
        });
        self.trip("delete_account")?;
        let mut state = self.state.lock().unwrap();
        // Idempotent: deleting a missing account succeeds.
        if let Some(record) = state.accounts.remove(account_id) {
            state.taken_usernames.remove(&record.profile.username);
        }
        Ok(())
    }

    async fn set_role(&self, account_id: &AccountId, role: Role) -> Result<(), IdentityError> {
        self.record(IdentityCall::SetRole {
            account_id: account_id.clone(),
        });
        self.trip("set_role")?;
        let mut state = self.state.lock().unwrap();
        let record =
            state
                .accounts
                .get_mut(account_id)
                .ok_or_else(|| IdentityError::AccountNotFound {
                    account_id: account_id.clone(),
                })?;
        record.role = Some(role);
        Ok(())
    }

    async fn set_password(
        &self,
        account_id: &AccountId,
        password: &str,
    ) -> Result<(), IdentityError> {
        self.record(IdentityCall::SetPassword {
            account_id: account_id.clone(),
        });
        self.trip("set_password")?;
        let mut state = self.state.lock().unwrap();
        let record =
            state
                .accounts
                .get_mut(account_id)
                .ok_or_else(|| IdentityError::AccountNotFound {
                    account_id: account_id.clone(),
                })?;
        record.password = Some(password.to_string());
        Ok(())
    }

    async fn set_email(&self, account_id: &AccountId, email: &str) -> Result<(), IdentityError> {
        self.record(IdentityCall::SetEmail {
            account_id: account_id.clone(),
            email: email.to_string(),
        });
        self.trip("set_email")?;
        let mut state = self.state.lock().unwrap();
        let record =
            state
                .accounts
                .get_mut(account_id)
                .ok_or_else(|| IdentityError::AccountNotFound {
                    account_id: account_id.clone(),
                })?;
        record.email = Some(email.to_string());
        Ok(())
    }

    async fn is_username_available(&self, username: &str) -> Result<bool, IdentityError> {
        self.record(IdentityCall::UsernameCheck {
            username: username.to_string(),
        });
        self.trip("is_username_available")?;
        Ok(!self
            .state
            .lock()
            .unwrap()
            .taken_usernames
            .contains(username))
    }

    async fn has_entitlement(
        &self,
        account_id: &AccountId,
        entitlement: Entitlement,
    ) -> Result<bool, IdentityError> {
        self.record(IdentityCall::EntitlementCheck {
            account_id: account_id.clone(),
        });
        self.trip("has_entitlement")?;
        Ok(self
            .entitlements
            .lock()
            .unwrap()
            .get(account_id)
            .is_some_and(|set| set.contains(&entitlement)))
    }
}
