//! Terminal saga outcomes and their presentation mapping.

use std::fmt;

/// The closed set of terminal states a saga can end in. The presentation
/// layer consumes these 1:1; adapter errors never leak past the
/// orchestrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaOutcome {
    /// All forward steps, including configured optional ones, succeeded and
    /// a resource was created.
    Created,
    /// All forward steps succeeded.
    Ok,
    /// A precondition found the operation already done or contended.
    Conflict,
    /// The requester lacks permission for the target resource.
    Forbidden,
    /// The request contradicts the caller's own state (e.g. chat identity
    /// mismatch).
    BadRequest,
    /// The target resource does not exist.
    NotFound,
    /// A step failed after preconditions passed; compensation has run.
    InternalFailure,
}

impl SagaOutcome {
    pub fn http_status(&self) -> u16 {
        match self {
            SagaOutcome::Created => 201,
            SagaOutcome::Ok => 200,
            SagaOutcome::Conflict => 409,
            SagaOutcome::Forbidden => 403,
            SagaOutcome::BadRequest => 400,
            SagaOutcome::NotFound => 404,
            SagaOutcome::InternalFailure => 500,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SagaOutcome::Created | SagaOutcome::Ok)
    }
}

impl fmt::Display for SagaOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SagaOutcome::Created => write!(f, "CREATED"),
            SagaOutcome::Ok => write!(f, "OK"),
            SagaOutcome::Conflict => write!(f, "CONFLICT"),
            SagaOutcome::Forbidden => write!(f, "FORBIDDEN"),
            SagaOutcome::BadRequest => write!(f, "BAD_REQUEST"),
            SagaOutcome::NotFound => write!(f, "NOT_FOUND"),
            SagaOutcome::InternalFailure => write!(f, "INTERNAL_FAILURE"),
        }
    }
}
