use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{
    FeedbackArtifact, NotificationEvent, ReviewAssignment, ReviewAssignmentId, ReviewerCandidate,
    SubmissionId, SubmissionRecord, SubmissionStatus, UserId,
};

/// Error enumeration shared by the persistence collaborators.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction for submissions so the lifecycle can be exercised in isolation.
pub trait SubmissionStore: Send + Sync {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, StoreError>;
    fn fetch(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, StoreError>;
    fn update_status(
        &self,
        id: &SubmissionId,
        status: SubmissionStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Storage abstraction for feedback artifacts.
pub trait FeedbackStore: Send + Sync {
    /// Remove any existing AI artifact for the submission and store the
    /// replacement in one atomic step, so concurrent regenerations can never
    /// leave two AI artifacts behind.
    fn replace_ai(&self, artifact: FeedbackArtifact) -> Result<FeedbackArtifact, StoreError>;
    fn insert_peer(&self, artifact: FeedbackArtifact) -> Result<FeedbackArtifact, StoreError>;
    fn list_for(&self, submission: &SubmissionId) -> Result<Vec<FeedbackArtifact>, StoreError>;
}

/// Storage abstraction for review assignments. Implementations must enforce
/// uniqueness on (submission, reviewer); `insert` answers `Conflict` when the
/// pair already exists.
pub trait ReviewAssignmentStore: Send + Sync {
    fn insert(&self, assignment: ReviewAssignment) -> Result<ReviewAssignment, StoreError>;
    fn fetch(&self, id: &ReviewAssignmentId) -> Result<Option<ReviewAssignment>, StoreError>;
    fn exists(&self, submission: &SubmissionId, reviewer: &UserId) -> Result<bool, StoreError>;
    fn count_for(&self, submission: &SubmissionId) -> Result<usize, StoreError>;
    fn list_for(&self, submission: &SubmissionId) -> Result<Vec<ReviewAssignment>, StoreError>;
    fn complete(
        &self,
        id: &ReviewAssignmentId,
        at: DateTime<Utc>,
    ) -> Result<ReviewAssignment, StoreError>;
}

/// Read-only view of the student directory used during reviewer selection.
pub trait CandidateDirectory: Send + Sync {
    /// Students other than `user`, optionally narrowed to one department.
    fn students_excluding(
        &self,
        user: &UserId,
        department: Option<&str>,
    ) -> Result<Vec<ReviewerCandidate>, StoreError>;

    fn department_of(&self, user: &UserId) -> Result<Option<String>, StoreError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Trait describing the outbound notification hook (in-app inbox, e-mail, ...).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError>;
}

/// Failure modes of the text-completion backend. Every variant routes the
/// caller to the deterministic fallback narrative.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error("completion backend not configured")]
    NotConfigured,
    #[error("completion request timed out")]
    Timeout,
    #[error("completion transport failure: {0}")]
    Transport(String),
    #[error("completion backend error: {0}")]
    Backend(String),
    #[error("completion response contained no text")]
    EmptyCompletion,
}

/// Sampling controls forwarded to the completion backend on each call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 3000,
            temperature: 0.3,
        }
    }
}

/// External text-completion dependency behind the feedback generator.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, DependencyError>;
}
