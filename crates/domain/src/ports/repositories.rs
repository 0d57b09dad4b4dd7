//! Repository ports for the locally-owned aggregates.
//!
//! No cross-aggregate transaction is assumed available across the chat
//! backend or identity provider; each call is an independent store write.

use async_trait::async_trait;

use crate::chat::Chat;
use crate::consultant::Consultant;
use crate::error::Result;
use crate::ids::{AgencyId, ChatId, ChatUserId, ConsultantId, SessionId, UserId};
use crate::session::Session;
use crate::user::User;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn save(&self, user: &User) -> Result<()>;
    async fn update(&self, user: &User) -> Result<()>;
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<User>>;
    async fn find_by_username(&self, encoded_username: &str) -> Result<Option<User>>;
    /// Hard delete, used only to roll back a row created within the same
    /// saga. Regular removal is a deferred soft delete.
    async fn delete(&self, user_id: &UserId) -> Result<()>;
}

#[async_trait]
pub trait ConsultantRepository: Send + Sync {
    async fn save(&self, consultant: &Consultant) -> Result<()>;
    async fn update(&self, consultant: &Consultant) -> Result<()>;
    async fn find_by_id(&self, consultant_id: &ConsultantId) -> Result<Option<Consultant>>;
    /// Co-consultants at an agency, used to resolve who else should see a
    /// case.
    async fn find_by_agency(&self, agency_id: AgencyId) -> Result<Vec<Consultant>>;
    /// Reverse lookup from a chat-backend membership to its owning
    /// consultant. `None` for members that are not consultants (askers,
    /// service identities).
    async fn find_by_chat_user_id(&self, chat_user_id: &ChatUserId) -> Result<Option<Consultant>>;
    /// Hard delete, used only to roll back a row created within the same
    /// saga.
    async fn delete(&self, consultant_id: &ConsultantId) -> Result<()>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn save(&self, session: &Session) -> Result<()>;
    async fn update(&self, session: &Session) -> Result<()>;
    async fn find_by_id(&self, session_id: &SessionId) -> Result<Option<Session>>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn save(&self, chat: &Chat) -> Result<()>;
    async fn update(&self, chat: &Chat) -> Result<()>;
    async fn find_by_id(&self, chat_id: &ChatId) -> Result<Option<Chat>>;
    async fn delete(&self, chat_id: &ChatId) -> Result<()>;
}
