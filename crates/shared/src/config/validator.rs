//! Configuration validation, run once after loading.

use std::collections::HashSet;

use super::dto::SettingsSnapshot;
use super::error::{ConfigError, Result};

pub fn validate_settings(settings: &SettingsSnapshot) -> Result<()> {
    if !settings.chat.base_url.starts_with("http://")
        && !settings.chat.base_url.starts_with("https://")
    {
        return Err(ConfigError::InvalidValue {
            var: super::loader::vars::CHAT_BASE_URL.to_string(),
            value: settings.chat.base_url.clone(),
        });
    }

    if settings.chat.system.user_id == settings.chat.technical.user_id {
        return Err(ConfigError::Validation(
            "system and technical chat identities must be distinct".to_string(),
        ));
    }

    if settings.placeholder_email_domain.contains('@') {
        return Err(ConfigError::InvalidValue {
            var: super::loader::vars::PLACEHOLDER_EMAIL_DOMAIN.to_string(),
            value: settings.placeholder_email_domain.clone(),
        });
    }

    if settings.consulting_types.is_empty() {
        return Err(ConfigError::Validation(
            "at least one consulting type is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for ct in &settings.consulting_types {
        if !seen.insert(ct.id) {
            return Err(ConfigError::Validation(format!(
                "duplicate consulting type id: {}",
                ct.id
            )));
        }
        if let Some(message) = &ct.welcome_message {
            if message.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "consulting type {} has an empty welcome message",
                    ct.id
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::dto::{ChatBackendSettings, ConsultingTypeSettings};
    use super::*;
    use counsel_domain::ids::ConsultingTypeId;
    use counsel_domain::ports::ChatCredential;

    fn settings() -> SettingsSnapshot {
        SettingsSnapshot {
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
            consulting_types: vec![ConsultingTypeSettings {
                id: ConsultingTypeId(1),
                name: "debt".into(),
                welcome_message: None,
                monitoring: false,
                feedback_chat: false,
                all_peers_visible: false,
                provision_chat_account: false,
                register_session: false,
            }],
        }
    }

    #[test]
    fn accepts_valid_settings() {
        assert!(validate_settings(&settings()).is_ok());
    }

    #[test]
    fn rejects_non_http_base_url() {
        let mut s = settings();
        s.chat.base_url = "localhost:3000".into();
        assert!(validate_settings(&s).is_err());
    }

    #[test]
    fn rejects_identical_service_identities() {
        let mut s = settings();
        s.chat.technical.user_id = s.chat.system.user_id.clone();
        assert!(validate_settings(&s).is_err());
    }

    #[test]
    fn rejects_duplicate_consulting_type_ids() {
        let mut s = settings();
        s.consulting_types.push(s.consulting_types[0].clone());
        assert!(validate_settings(&s).is_err());
    }

    #[test]
    fn rejects_empty_consulting_type_list() {
        let mut s = settings();
        s.consulting_types.clear();
        assert!(validate_settings(&s).is_err());
    }
}
