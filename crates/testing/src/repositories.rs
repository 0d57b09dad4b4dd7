//! In-memory repositories with fault injection on writes.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use counsel_domain::chat::Chat;
use counsel_domain::consultant::Consultant;
use counsel_domain::error::{DomainError, Result};
use counsel_domain::ids::{AgencyId, ChatId, ChatUserId, ConsultantId, SessionId, UserId};
use counsel_domain::ports::{
    ChatRepository, ConsultantRepository, SessionRepository, UserRepository,
};
use counsel_domain::session::Session;
use counsel_domain::user::User;

use crate::faults::FaultPlan;

fn injected(op: &str) -> DomainError {
    DomainError::Storage(format!("injected failure in {op}"))
}

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    rows: Mutex<HashMap<UserId, User>>,
    faults: Mutex<FaultPlan>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, op: &str) {
        self.faults.lock().unwrap().fail_on(op);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn seed(&self, user: User) {
        self.rows.lock().unwrap().insert(user.id, user);
    }

    fn trip(&self, op: &'static str) -> Result<()> {
        if self.faults.lock().unwrap().trip(op) {
            return Err(injected(op));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: &User) -> Result<()> {
        self.trip("save")?;
        self.rows.lock().unwrap().insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        self.trip("update")?;
        self.rows.lock().unwrap().insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<User>> {
        Ok(self.rows.lock().unwrap().get(user_id).cloned())
    }

    async fn find_by_username(&self, encoded_username: &str) -> Result<Option<User>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|u| u.username == encoded_username)
            .cloned())
    }

    async fn delete(&self, user_id: &UserId) -> Result<()> {
        self.trip("delete")?;
        self.rows.lock().unwrap().remove(user_id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryConsultantRepository {
    rows: Mutex<HashMap<ConsultantId, Consultant>>,
    faults: Mutex<FaultPlan>,
}

impl InMemoryConsultantRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, op: &str) {
        self.faults.lock().unwrap().fail_on(op);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn seed(&self, consultant: Consultant) {
        self.rows
            .lock()
            .unwrap()
            .insert(consultant.id, consultant);
    }

    fn trip(&self, op: &'static str) -> Result<()> {
        if self.faults.lock().unwrap().trip(op) {
            return Err(injected(op));
        }
        Ok(())
    }
}

#[async_trait]
impl ConsultantRepository for InMemoryConsultantRepository {
    async fn save(&self, consultant: &Consultant) -> Result<()> {
        self.trip("save")?;
        self.rows
            .lock()
            .unwrap()
            .insert(consultant.id, consultant.clone());
        Ok(())
    }

    async fn update(&self, consultant: &Consultant) -> Result<()> {
        self.trip("update")?;
        self.rows
            .lock()
            .unwrap()
            .insert(consultant.id, consultant.clone());
        Ok(())
    }

    async fn find_by_id(&self, consultant_id: &ConsultantId) -> Result<Option<Consultant>> {
        Ok(self.rows.lock().unwrap().get(consultant_id).cloned())
    }

    async fn find_by_agency(&self, agency_id: AgencyId) -> Result<Vec<Consultant>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.agency_ids.contains(&agency_id))
            .cloned()
            .collect())
    }

    async fn find_by_chat_user_id(&self, chat_user_id: &ChatUserId) -> Result<Option<Consultant>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|c| c.chat_user_id.as_ref() == Some(chat_user_id))
            .cloned())
    }

    async fn delete(&self, consultant_id: &ConsultantId) -> Result<()> {
        self.trip("delete")?;
        self.rows.lock().unwrap().remove(consultant_id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    rows: Mutex<HashMap<SessionId, Session>>,
    faults: Mutex<FaultPlan>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, op: &str) {
        self.faults.lock().unwrap().fail_on(op);
    }

    pub fn fail_on_nth(&self, op: &str, n: u32) {
        self.faults.lock().unwrap().fail_on_nth(op, n);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn seed(&self, session: Session) {
        self.rows.lock().unwrap().insert(session.id, session);
    }

    pub fn get(&self, session_id: &SessionId) -> Option<Session> {
        self.rows.lock().unwrap().get(session_id).cloned()
    }

    fn trip(&self, op: &'static str) -> Result<()> {
        if self.faults.lock().unwrap().trip(op) {
            return Err(injected(op));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn save(&self, session: &Session) -> Result<()> {
        self.trip("save")?;
        self.rows.lock().unwrap().insert(session.id, session.clone());
        Ok(())
    }

    async fn update(&self, session: &Session) -> Result<()> {
        self.trip("update")?;
        self.rows.lock().unwrap().insert(session.id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, session_id: &SessionId) -> Result<Option<Session>> {
        Ok(self.rows.lock().unwrap().get(session_id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryChatRepository {
    rows: Mutex<HashMap<ChatId, Chat>>,
    faults: Mutex<FaultPlan>,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, op: &str) {
        self.faults.lock().unwrap().fail_on(op);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn seed(&self, chat: Chat) {
        self.rows.lock().unwrap().insert(chat.id, chat);
    }

    pub fn get(&self, chat_id: &ChatId) -> Option<Chat> {
        self.rows.lock().unwrap().get(chat_id).cloned()
    }

    fn trip(&self, op: &'static str) -> Result<()> {
        if self.faults.lock().unwrap().trip(op) {
            return Err(injected(op));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn save(&self, chat: &Chat) -> Result<()> {
        self.trip("save")?;
        self.rows.lock().unwrap().insert(chat.id, chat.clone());
        Ok(())
    }

    async fn update(&self, chat: &Chat) -> Result<()> {
        self.trip("update")?;
        self.rows.lock().unwrap().insert(chat.id, chat.clone());
        Ok(())
    }

    async fn find_by_id(&self, chat_id: &ChatId) -> Result<Option<Chat>> {
        Ok(self.rows.lock().unwrap().get(chat_id).cloned())
    }

    async fn delete(&self, chat_id: &ChatId) -> Result<()> {
        self.trip("delete")?;
        self.rows.lock().unwrap().remove(chat_id);
        Ok(())
    }
}
