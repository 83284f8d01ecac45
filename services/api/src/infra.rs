use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use peergrade::config::AiConfig;
use peergrade::workflows::submissions::{
    CandidateDirectory, CompletionBackend, DependencyError, DisabledBackend, FeedbackArtifact,
    FeedbackStore, GenerationParams, HttpCompletionBackend, NotificationEvent, NotificationSink,
    NotifyError, ReviewAssignment, ReviewAssignmentId, ReviewAssignmentStore, ReviewStatus,
    ReviewerCandidate, StoreError, SubmissionId, SubmissionRecord, SubmissionStatus, SubmissionStore, UserId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Students known to the service. Submitting once registers the caller, so a
/// fresh in-memory deployment grows its reviewer pool as students show up.
pub(crate) type Roster = Arc<Mutex<BTreeMap<UserId, ReviewerCandidate>>>;

pub(crate) fn shared_roster() -> Roster {
    Arc::default()
}

pub(crate) fn enroll(roster: &Roster, id: &str, department: Option<&str>) {
    let user = UserId(id.to_string());
    let candidate = ReviewerCandidate {
        id: user.clone(),
        name: id.to_string(),
        department: department.map(str::to_string),
        skill_level: None,
    };
    let mut guard = roster.lock().expect("roster mutex poisoned");
    guard.insert(user, candidate);
}

pub(crate) struct InMemorySubmissionStore {
    records: Mutex<HashMap<SubmissionId, SubmissionRecord>>,
    roster: Roster,
}

impl InMemorySubmissionStore {
    pub(crate) fn new(roster: Roster) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            roster,
        }
    }
}

impl SubmissionStore for InMemorySubmissionStore {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, StoreError> {
        let mut guard = self.records.lock().expect("submission mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(StoreError::Conflict);
        }

        let mut roster = self.roster.lock().expect("roster mutex poisoned");
        roster
            .entry(record.submitter.clone())
            .or_insert_with(|| ReviewerCandidate {
                id: record.submitter.clone(),
                name: record.submitter.0.clone(),
                department: None,
                skill_level: None,
            });
        drop(roster);

        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, StoreError> {
        let guard = self.records.lock().expect("submission mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_status(
        &self,
        id: &SubmissionId,
        status: SubmissionStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("submission mutex poisoned");
        let record = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        record.status = status;
        record.updated_at = at;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryFeedbackStore {
    artifacts: Mutex<Vec<FeedbackArtifact>>,
}

impl FeedbackStore for InMemoryFeedbackStore {
    fn replace_ai(&self, artifact: FeedbackArtifact) -> Result<FeedbackArtifact, StoreError> {
        let mut guard = self.artifacts.lock().expect("feedback mutex poisoned");
        guard.retain(|stored| {
            !(stored.submission == artifact.submission && stored.author.is_ai())
        });
        guard.push(artifact.clone());
        Ok(artifact)
    }

    fn insert_peer(&self, artifact: FeedbackArtifact) -> Result<FeedbackArtifact, StoreError> {
        let mut guard = self.artifacts.lock().expect("feedback mutex poisoned");
        guard.push(artifact.clone());
        Ok(artifact)
    }

    fn list_for(&self, submission: &SubmissionId) -> Result<Vec<FeedbackArtifact>, StoreError> {
        let guard = self.artifacts.lock().expect("feedback mutex poisoned");
        Ok(guard
            .iter()
            .filter(|stored| &stored.submission == submission)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryAssignmentStore {
    assignments: Mutex<HashMap<(SubmissionId, UserId), ReviewAssignment>>,
}

impl ReviewAssignmentStore for InMemoryAssignmentStore {
    fn insert(&self, assignment: ReviewAssignment) -> Result<ReviewAssignment, StoreError> {
        let mut guard = self.assignments.lock().expect("assignment mutex poisoned");
        let key = (assignment.submission.clone(), assignment.reviewer.clone());
        if guard.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        guard.insert(key, assignment.clone());
        Ok(assignment)
    }

    fn fetch(&self, id: &ReviewAssignmentId) -> Result<Option<ReviewAssignment>, StoreError> {
        let guard = self.assignments.lock().expect("assignment mutex poisoned");
        Ok(guard.values().find(|stored| &stored.id == id).cloned())
    }

    fn exists(&self, submission: &SubmissionId, reviewer: &UserId) -> Result<bool, StoreError> {
        let guard = self.assignments.lock().expect("assignment mutex poisoned");
        Ok(guard.contains_key(&(submission.clone(), reviewer.clone())))
    }

    fn count_for(&self, submission: &SubmissionId) -> Result<usize, StoreError> {
        let guard = self.assignments.lock().expect("assignment mutex poisoned");
        Ok(guard
            .keys()
            .filter(|(stored, _)| stored == submission)
            .count())
    }

    fn list_for(&self, submission: &SubmissionId) -> Result<Vec<ReviewAssignment>, StoreError> {
        let guard = self.assignments.lock().expect("assignment mutex poisoned");
        Ok(guard
            .values()
            .filter(|stored| &stored.submission == submission)
            .cloned()
            .collect())
    }

    fn complete(
        &self,
        id: &ReviewAssignmentId,
        at: DateTime<Utc>,
    ) -> Result<ReviewAssignment, StoreError> {
        let mut guard = self.assignments.lock().expect("assignment mutex poisoned");
        let assignment = guard
            .values_mut()
            .find(|stored| &stored.id == id)
            .ok_or(StoreError::NotFound)?;
        assignment.status = ReviewStatus::Completed;
        assignment.completed_at = Some(at);
        Ok(assignment.clone())
    }
}

pub(crate) struct RosterDirectory {
    roster: Roster,
}

impl RosterDirectory {
    pub(crate) fn new(roster: Roster) -> Self {
        Self { roster }
    }
}

impl CandidateDirectory for RosterDirectory {
    fn students_excluding(
        &self,
        user: &UserId,
        department: Option<&str>,
    ) -> Result<Vec<ReviewerCandidate>, StoreError> {
        let guard = self.roster.lock().expect("roster mutex poisoned");
        Ok(guard
            .values()
            .filter(|candidate| &candidate.id != user)
            .filter(|candidate| match department {
                Some(wanted) => candidate.department.as_deref() == Some(wanted),
                None => true,
            })
            .cloned()
            .collect())
    }

    fn department_of(&self, user: &UserId) -> Result<Option<String>, StoreError> {
        let guard = self.roster.lock().expect("roster mutex poisoned");
        Ok(guard.get(user).and_then(|candidate| candidate.department.clone()))
    }
}

/// Notification sink that records events in the service log. A real deployment
/// would swap this for an inbox table or an e-mail relay.
#[derive(Default)]
pub(crate) struct LoggingNotificationSink;

impl NotificationSink for LoggingNotificationSink {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        info!(
            user = %event.user.0,
            category = ?event.category,
            title = %event.title,
            "notification dispatched"
        );
        Ok(())
    }
}

/// Backend selected at startup from configuration: the HTTP client when an
/// API key is present, otherwise the disabled stand-in that keeps every
/// feedback request on the deterministic fallback path.
pub(crate) enum ApiBackend {
    Http(HttpCompletionBackend),
    Disabled(DisabledBackend),
}

impl ApiBackend {
    pub(crate) fn from_config(config: &AiConfig) -> Result<Self, DependencyError> {
        Ok(match HttpCompletionBackend::from_config(config)? {
            Some(backend) => Self::Http(backend),
            None => Self::Disabled(DisabledBackend),
        })
    }

    pub(crate) fn is_configured(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

#[async_trait]
impl CompletionBackend for ApiBackend {
    async fn complete(
        &self,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, DependencyError> {
        match self {
            Self::Http(backend) => backend.complete(prompt, params).await,
            Self::Disabled(backend) => backend.complete(prompt, params).await,
        }
    }
}
