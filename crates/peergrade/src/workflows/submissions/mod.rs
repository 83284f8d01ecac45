//! Submission lifecycle: intake, deterministic scoring, AI feedback with a
//! rule-based fallback, peer reviewer matching, and peer review intake.

pub mod assignment;
pub mod domain;
pub mod evaluation;
pub mod feedback;
pub mod matching;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use assignment::{ReviewCoordinator, ReviewPolicy};
pub use domain::{
    CallerContext, CourseId, FeedbackArtifact, FeedbackAuthor, NotificationCategory,
    NotificationEvent, ReviewAssignment, ReviewAssignmentId, ReviewStatus, ReviewerCandidate, Role,
    SubmissionDraft, SubmissionFile, SubmissionId, SubmissionKind, SubmissionRecord,
    SubmissionStatus, UserId,
};
pub use evaluation::{PlagiarismReport, ScoreEngine, ScoreSet, ScoringConfig};
pub use feedback::{
    DisabledBackend, FeedbackBundle, FeedbackGenerator, FeedbackRequest, FeedbackSource,
    HttpCompletionBackend,
};
pub use matching::PeerMatcher;
pub use repository::{
    CandidateDirectory, CompletionBackend, DependencyError, FeedbackStore, GenerationParams,
    NotificationSink, NotifyError, ReviewAssignmentStore, StoreError, SubmissionStore,
};
pub use router::submission_router;
pub use service::{
    LifecycleError, RegenerateOutcome, SubmissionDetail, SubmissionLifecycleService,
    SubmissionOutcome, ValidationFailure,
};
