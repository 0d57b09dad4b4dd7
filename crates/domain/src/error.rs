use crate::ids::{AgencyId, ChatId, ConsultantId, ConsultingTypeId, SessionId, UserId};

#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: SessionId },

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: UserId },

    #[error("Consultant not found: {consultant_id}")]
    ConsultantNotFound { consultant_id: ConsultantId },

    #[error("Chat not found: {chat_id}")]
    ChatNotFound { chat_id: ChatId },

    #[error("Agency not found: {agency_id}")]
    AgencyNotFound { agency_id: AgencyId },

    #[error("Unknown consulting type: {consulting_type}")]
    UnknownConsultingType { consulting_type: ConsultingTypeId },

    #[error("Invalid state transition for session {session_id}: {reason}")]
    InvalidStateTransition { session_id: SessionId, reason: String },

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("External service failure: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
