//! Configuration DTOs.
//!
//! [`SettingsSnapshot`] is the single source of truth for everything the
//! orchestrators need from configuration: the chat backend's service
//! credentials and the per-consulting-type switches. It is loaded once at
//! startup, validated, and injected read-only at construction time — never
//! read from ambient global state.

use serde::{Deserialize, Serialize};

use counsel_domain::ids::ConsultingTypeId;
use counsel_domain::ports::ChatCredential;

/// Immutable configuration snapshot injected into each orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub chat: ChatBackendSettings,
    /// Domain appended to generated placeholder addresses when a
    /// registration carries no email.
    pub placeholder_email_domain: String,
    pub consulting_types: Vec<ConsultingTypeSettings>,
}

impl SettingsSnapshot {
    pub fn consulting_type(&self, id: ConsultingTypeId) -> Option<&ConsultingTypeSettings> {
        self.consulting_types.iter().find(|ct| ct.id == id)
    }
}

/// Chat backend connection and service identities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBackendSettings {
    pub base_url: String,
    /// Platform system identity: owns groups, posts automated messages.
    pub system: ChatCredential,
    /// Technical bridging identity: transiently elevated for membership
    /// surgery no ordinary identity may perform.
    pub technical: ChatCredential,
}

/// Per-consulting-type behavior switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultingTypeSettings {
    pub id: ConsultingTypeId,
    pub name: String,
    /// Welcome message posted as the system identity after the enquiry;
    /// `${username}` is substituted with the asker's decoded name.
    #[serde(default)]
    pub welcome_message: Option<String>,
    /// Create the initial monitoring structure during enquiry creation.
    #[serde(default)]
    pub monitoring: bool,
    /// Maintain a parallel feedback group for supervising peers.
    #[serde(default)]
    pub feedback_chat: bool,
    /// All peers at the agency see the case; otherwise a single peer
    /// occupies the feedback group.
    #[serde(default)]
    pub all_peers_visible: bool,
    /// Perform the first-time chat-backend login/logout handshake during
    /// account provisioning to obtain a session-independent chat identity.
    #[serde(default)]
    pub provision_chat_account: bool,
    /// Create an initial session row during account provisioning.
    #[serde(default)]
    pub register_session: bool,
}
