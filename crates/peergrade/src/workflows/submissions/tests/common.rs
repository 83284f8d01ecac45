use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::workflows::submissions::domain::{
    CallerContext, CourseId, FeedbackArtifact, FeedbackAuthor, NotificationEvent, ReviewAssignment,
    ReviewAssignmentId, ReviewStatus, ReviewerCandidate, SubmissionDraft, SubmissionId,
    SubmissionKind, SubmissionRecord, SubmissionStatus, UserId,
};
use crate::workflows::submissions::repository::{
    CandidateDirectory, CompletionBackend, DependencyError, FeedbackStore, GenerationParams,
    NotificationSink, NotifyError, ReviewAssignmentStore, StoreError, SubmissionStore,
};
use crate::workflows::submissions::{ReviewPolicy, SubmissionLifecycleService};

pub(super) type TestService<B> = SubmissionLifecycleService<
    MemorySubmissions,
    MemoryFeedback,
    MemoryAssignments,
    MemoryDirectory,
    MemoryNotifications,
    B,
>;

pub(super) struct Stores {
    pub(super) submissions: Arc<MemorySubmissions>,
    pub(super) feedback: Arc<MemoryFeedback>,
    pub(super) assignments: Arc<MemoryAssignments>,
    pub(super) directory: Arc<MemoryDirectory>,
    pub(super) notifications: Arc<MemoryNotifications>,
}

pub(super) fn stores() -> Stores {
    Stores {
        submissions: Arc::new(MemorySubmissions::default()),
        feedback: Arc::new(MemoryFeedback::default()),
        assignments: Arc::new(MemoryAssignments::default()),
        directory: Arc::new(MemoryDirectory::default()),
        notifications: Arc::new(MemoryNotifications::default()),
    }
}

pub(super) fn service_with<B: CompletionBackend + 'static>(
    stores: &Stores,
    policy: ReviewPolicy,
    backend: B,
) -> TestService<B> {
    SubmissionLifecycleService::new(
        Arc::clone(&stores.submissions),
        Arc::clone(&stores.feedback),
        Arc::clone(&stores.assignments),
        Arc::clone(&stores.directory),
        Arc::clone(&stores.notifications),
        Arc::new(backend),
        policy,
        GenerationParams::default(),
    )
}

pub(super) fn student(id: &str) -> CallerContext {
    CallerContext::student(UserId(id.to_string()))
}

pub(super) fn candidate(id: &str, department: Option<&str>) -> ReviewerCandidate {
    ReviewerCandidate {
        id: UserId(id.to_string()),
        name: format!("Student {id}"),
        department: department.map(str::to_string),
        skill_level: None,
    }
}

pub(super) fn code_draft() -> SubmissionDraft {
    SubmissionDraft {
        course: CourseId("cs101".to_string()),
        title: "Sorting exercise".to_string(),
        content: "def add(a, b):\n    return a + b\n".to_string(),
        task_description: "Implement addition".to_string(),
        kind: SubmissionKind::Code,
        files: Vec::new(),
        department: None,
        generate_feedback: true,
        practice: false,
    }
}

pub(super) fn essay_draft() -> SubmissionDraft {
    SubmissionDraft {
        content: "The industrial revolution reshaped European cities in three ways.".to_string(),
        kind: SubmissionKind::Essay,
        task_description: String::new(),
        ..code_draft()
    }
}

/// Backend double that always answers with a fixed narrative.
pub(super) struct StaticBackend(pub(super) String);

#[async_trait]
impl CompletionBackend for StaticBackend {
    async fn complete(
        &self,
        _prompt: &str,
        _params: GenerationParams,
    ) -> Result<String, DependencyError> {
        Ok(self.0.clone())
    }
}

/// Backend double that simulates an unreachable dependency.
pub(super) struct TimeoutBackend;

#[async_trait]
impl CompletionBackend for TimeoutBackend {
    async fn complete(
        &self,
        _prompt: &str,
        _params: GenerationParams,
    ) -> Result<String, DependencyError> {
        Err(DependencyError::Timeout)
    }
}

#[derive(Default)]
pub(super) struct MemorySubmissions {
    records: Mutex<HashMap<SubmissionId, SubmissionRecord>>,
}

impl MemorySubmissions {
    pub(super) fn get(&self, id: &SubmissionId) -> Option<SubmissionRecord> {
        self.records
            .lock()
            .expect("submission mutex poisoned")
            .get(id)
            .cloned()
    }
}

impl SubmissionStore for MemorySubmissions {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, StoreError> {
        let mut guard = self.records.lock().expect("submission mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(StoreError::Conflict);
        }
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
pub(super) struct MemoryFeedback {
    artifacts: Mutex<Vec<FeedbackArtifact>>,
}

impl MemoryFeedback {
    pub(super) fn all(&self) -> Vec<FeedbackArtifact> {
        self.artifacts
            .lock()
            .expect("feedback mutex poisoned")
            .clone()
    }

    pub(super) fn ai_artifacts(&self, submission: &SubmissionId) -> Vec<FeedbackArtifact> {
        self.all()
            .into_iter()
            .filter(|artifact| artifact.submission == *submission && artifact.author.is_ai())
            .collect()
    }
}

impl FeedbackStore for MemoryFeedback {
    fn replace_ai(&self, artifact: FeedbackArtifact) -> Result<FeedbackArtifact, StoreError> {
        let mut guard = self.artifacts.lock().expect("feedback mutex poisoned");
        guard.retain(|existing| {
            !(existing.submission == artifact.submission
                && matches!(existing.author, FeedbackAuthor::Ai))
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
        Ok(self
            .all()
            .into_iter()
            .filter(|artifact| artifact.submission == *submission)
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryAssignments {
    by_pair: Mutex<HashMap<(SubmissionId, UserId), ReviewAssignment>>,
}

impl MemoryAssignments {
    pub(super) fn all(&self) -> Vec<ReviewAssignment> {
        self.by_pair
            .lock()
            .expect("assignment mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl ReviewAssignmentStore for MemoryAssignments {
    fn insert(&self, assignment: ReviewAssignment) -> Result<ReviewAssignment, StoreError> {
        let mut guard = self.by_pair.lock().expect("assignment mutex poisoned");
        let key = (assignment.submission.clone(), assignment.reviewer.clone());
        if guard.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        guard.insert(key, assignment.clone());
        Ok(assignment)
    }

    fn fetch(&self, id: &ReviewAssignmentId) -> Result<Option<ReviewAssignment>, StoreError> {
        let guard = self.by_pair.lock().expect("assignment mutex poisoned");
        Ok(guard
            .values()
            .find(|assignment| assignment.id == *id)
            .cloned())
    }

    fn exists(&self, submission: &SubmissionId, reviewer: &UserId) -> Result<bool, StoreError> {
        let guard = self.by_pair.lock().expect("assignment mutex poisoned");
        Ok(guard.contains_key(&(submission.clone(), reviewer.clone())))
    }

    fn count_for(&self, submission: &SubmissionId) -> Result<usize, StoreError> {
        Ok(self.list_for(submission)?.len())
    }

    fn list_for(&self, submission: &SubmissionId) -> Result<Vec<ReviewAssignment>, StoreError> {
        let guard = self.by_pair.lock().expect("assignment mutex poisoned");
        Ok(guard
            .values()
            .filter(|assignment| assignment.submission == *submission)
            .cloned()
            .collect())
    }

    fn complete(
        &self,
        id: &ReviewAssignmentId,
        at: DateTime<Utc>,
    ) -> Result<ReviewAssignment, StoreError> {
        let mut guard = self.by_pair.lock().expect("assignment mutex poisoned");
        let assignment = guard
            .values_mut()
            .find(|assignment| assignment.id == *id)
            .ok_or(StoreError::NotFound)?;
        assignment.status = ReviewStatus::Completed;
        assignment.completed_at = Some(at);
        Ok(assignment.clone())
    }
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    students: Mutex<Vec<ReviewerCandidate>>,
}

impl MemoryDirectory {
    pub(super) fn add(&self, candidate: ReviewerCandidate) {
        self.students
            .lock()
            .expect("directory mutex poisoned")
            .push(candidate);
    }
}

impl CandidateDirectory for MemoryDirectory {
    fn students_excluding(
        &self,
        user: &UserId,
        department: Option<&str>,
    ) -> Result<Vec<ReviewerCandidate>, StoreError> {
        let guard = self.students.lock().expect("directory mutex poisoned");
        Ok(guard
            .iter()
            .filter(|candidate| candidate.id != *user)
            .filter(|candidate| match department {
                Some(department) => candidate.department.as_deref() == Some(department),
                None => true,
            })
            .cloned()
            .collect())
    }

    fn department_of(&self, user: &UserId) -> Result<Option<String>, StoreError> {
        let guard = self.students.lock().expect("directory mutex poisoned");
        Ok(guard
            .iter()
            .find(|candidate| candidate.id == *user)
            .and_then(|candidate| candidate.department.clone()))
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifications {
    events: Mutex<Vec<NotificationEvent>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().expect("notification mutex poisoned").clone()
    }
}

impl NotificationSink for MemoryNotifications {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(event);
        Ok(())
    }
}

/// Directory double that simulates an offline user service.
pub(super) struct UnavailableDirectory;

impl CandidateDirectory for UnavailableDirectory {
    fn students_excluding(
        &self,
        _user: &UserId,
        _department: Option<&str>,
    ) -> Result<Vec<ReviewerCandidate>, StoreError> {
        Err(StoreError::Unavailable("directory offline".to_string()))
    }

    fn department_of(&self, _user: &UserId) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("directory offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
