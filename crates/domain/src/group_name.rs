//! Deterministic, human-inspectable chat-backend group names.
//!
//! Collisions are accepted as negligible rather than formally guaranteed;
//! the millisecond timestamp only disambiguates recreation of a group for
//! the same entity.

use chrono::{DateTime, Utc};
use std::fmt::Display;

/// Primary case group: `{entityId}_{epochMillis}`
pub fn session_group(id: impl Display, at: DateTime<Utc>) -> String {
    format!("{}_{}", id, at.timestamp_millis())
}

/// Feedback group: `{entityId}_feedback_{epochMillis}`
pub fn feedback_group(id: impl Display, at: DateTime<Utc>) -> String {
    format!("{}_feedback_{}", id, at.timestamp_millis())
}

/// Ad-hoc group chat: `{entityId}_group_chat_{epochMillis}`
pub fn group_chat(id: impl Display, at: DateTime<Utc>) -> String {
    format!("{}_group_chat_{}", id, at.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn names_embed_entity_id_and_millis() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(session_group("s1", at), "s1_1700000000000");
        assert_eq!(feedback_group("s1", at), "s1_feedback_1700000000000");
        assert_eq!(group_chat("c1", at), "c1_group_chat_1700000000000");
    }
}
