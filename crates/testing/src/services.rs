//! Fakes for the capability and side-channel ports.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use counsel_domain::consultant::{Agency, Consultant};
use counsel_domain::error::{DomainError, Result};
use counsel_domain::ids::{AgencyId, ConsultantId, SessionId};
use counsel_domain::ports::{
    AgencyService, EnquiryNotifier, MonitoringError, MonitoringInitializer, NotifyError,
    Visibility,
};
use counsel_domain::session::Session;

/// Table-driven visibility capability.
#[derive(Debug, Default)]
pub struct StaticVisibility {
    peer_viewers: Mutex<HashSet<ConsultantId>>,
    feedback_viewers: Mutex<HashSet<ConsultantId>>,
}

impl StaticVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_peer_view(&self, consultant_id: ConsultantId) {
        self.peer_viewers.lock().unwrap().insert(consultant_id);
    }

    pub fn allow_feedback_view(&self, consultant_id: ConsultantId) {
        self.feedback_viewers.lock().unwrap().insert(consultant_id);
    }
}

#[async_trait]
impl Visibility for StaticVisibility {
    async fn can_view_peer_sessions(&self, consultant: &Consultant) -> Result<bool> {
        Ok(self.peer_viewers.lock().unwrap().contains(&consultant.id))
    }

    async fn can_view_all_feedback(&self, consultant: &Consultant) -> Result<bool> {
        Ok(self
            .feedback_viewers
            .lock()
            .unwrap()
            .contains(&consultant.id))
    }
}

/// Records notifications; can be told to fail to prove failures never
/// change a saga's outcome.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notified: Mutex<Vec<(SessionId, ConsultantId)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn notifications(&self) -> Vec<(SessionId, ConsultantId)> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl EnquiryNotifier for RecordingNotifier {
    async fn notify_enquiry_taken(
        &self,
        session: &Session,
        assignee: &Consultant,
    ) -> std::result::Result<(), NotifyError> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(NotifyError("injected failure".to_string()));
        }
        self.notified
            .lock()
            .unwrap()
            .push((session.id, assignee.id));
        Ok(())
    }
}

/// Tracks monitoring initialization per session.
#[derive(Debug, Default)]
pub struct FakeMonitoring {
    initialized: Mutex<HashSet<SessionId>>,
    removed: Mutex<Vec<SessionId>>,
    fail_initialize: AtomicBool,
}

impl FakeMonitoring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_initialize(&self) {
        self.fail_initialize.store(true, Ordering::SeqCst);
    }

    pub fn is_initialized(&self, session_id: &SessionId) -> bool {
        self.initialized.lock().unwrap().contains(session_id)
    }

    pub fn removals(&self) -> Vec<SessionId> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MonitoringInitializer for FakeMonitoring {
    async fn initialize(&self, session: &Session) -> std::result::Result<(), MonitoringError> {
        if self.fail_initialize.swap(false, Ordering::SeqCst) {
            return Err(MonitoringError("injected failure".to_string()));
        }
        self.initialized.lock().unwrap().insert(session.id);
        Ok(())
    }

    async fn remove(&self, session: &Session) -> std::result::Result<(), MonitoringError> {
        self.initialized.lock().unwrap().remove(&session.id);
        self.removed.lock().unwrap().push(session.id);
        Ok(())
    }
}

/// Static agency reference data.
#[derive(Debug, Default)]
pub struct StaticAgencyService {
    agencies: Mutex<HashMap<AgencyId, Agency>>,
}

impl StaticAgencyService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, agency: Agency) {
        self.agencies.lock().unwrap().insert(agency.id, agency);
    }
}

#[async_trait]
impl AgencyService for StaticAgencyService {
    async fn get_agency(&self, agency_id: AgencyId) -> Result<Agency> {
        self.agencies
            .lock()
            .unwrap()
            .get(&agency_id)
            .cloned()
            .ok_or(DomainError::AgencyNotFound { agency_id })
    }
}
