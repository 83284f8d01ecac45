use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    CallerContext, FeedbackArtifact, FeedbackAuthor, NotificationEvent, ReviewAssignment,
    ReviewAssignmentId, ReviewStatus, SubmissionRecord, SubmissionStatus, UserId,
};
use super::repository::{
    FeedbackStore, NotificationSink, ReviewAssignmentStore, StoreError, SubmissionStore,
};
use super::service::{LifecycleError, ValidationFailure};

/// Review-flow rules shared by the coordinator and the lifecycle service.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPolicy {
    /// How many reviewers to seek per submission.
    pub peers_per_submission: usize,
    /// When set, a submitter with no available peers reviews their own work.
    pub allow_self_review: bool,
    /// Minimum peer feedback length, in characters.
    pub min_feedback_chars: usize,
    /// Upper bound on peer feedback size, in bytes.
    pub max_feedback_bytes: usize,
    /// Upper bound on combined submission content, in bytes.
    pub max_content_bytes: usize,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            peers_per_submission: 2,
            allow_self_review: false,
            min_feedback_chars: 10,
            max_feedback_bytes: 20_000,
            max_content_bytes: 5 * 1024 * 1024,
        }
    }
}

static ASSIGNMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_assignment_id() -> ReviewAssignmentId {
    let id = ASSIGNMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReviewAssignmentId(format!("rev-{id:06}"))
}

/// Coordinates review assignment creation and peer review intake.
pub struct ReviewCoordinator<S, F, A, N> {
    submissions: Arc<S>,
    feedback: Arc<F>,
    assignments: Arc<A>,
    notifications: Arc<N>,
    policy: ReviewPolicy,
}

impl<S, F, A, N> ReviewCoordinator<S, F, A, N>
where
    S: SubmissionStore,
    F: FeedbackStore,
    A: ReviewAssignmentStore,
    N: NotificationSink,
{
    pub fn new(
        submissions: Arc<S>,
        feedback: Arc<F>,
        assignments: Arc<A>,
        notifications: Arc<N>,
        policy: ReviewPolicy,
    ) -> Self {
        Self {
            submissions,
            feedback,
            assignments,
            notifications,
            policy,
        }
    }

    /// Persist one pending assignment per reviewer, notifying each. A store
    /// `Conflict` means another worker assigned the same pair first and is
    /// silently skipped. When the matcher found nobody and self-review is
    /// enabled, the submitter is assigned instead (again guarded against
    /// duplicates).
    pub fn assign(&self, submission: &SubmissionRecord, reviewers: &[UserId]) -> Vec<ReviewAssignment> {
        let mut created = Vec::new();
        for reviewer in reviewers {
            match self.create_assignment(submission, reviewer) {
                Ok(Some(assignment)) => created.push(assignment),
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(
                        error = %error,
                        submission = %submission.id.0,
                        reviewer = %reviewer.0,
                        "failed to persist review assignment"
                    );
                }
            }
        }

        if reviewers.is_empty() && self.policy.allow_self_review {
            match self.create_assignment(submission, &submission.submitter) {
                Ok(Some(assignment)) => created.push(assignment),
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(
                        error = %error,
                        submission = %submission.id.0,
                        "failed to persist self-review assignment"
                    );
                }
            }
        }

        created
    }

    fn create_assignment(
        &self,
        submission: &SubmissionRecord,
        reviewer: &UserId,
    ) -> Result<Option<ReviewAssignment>, StoreError> {
        let assignment = ReviewAssignment {
            id: next_assignment_id(),
            submission: submission.id.clone(),
            reviewer: reviewer.clone(),
            status: ReviewStatus::Pending,
            assigned_at: Utc::now(),
            completed_at: None,
        };

        match self.assignments.insert(assignment) {
            Ok(stored) => {
                let event = NotificationEvent::review_assigned(submission, reviewer);
                if let Err(error) = self.notifications.notify(event) {
                    tracing::warn!(
                        error = %error,
                        reviewer = %reviewer.0,
                        "failed to notify reviewer of new assignment"
                    );
                }
                Ok(Some(stored))
            }
            Err(StoreError::Conflict) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Accept a completed peer review: only the assigned reviewer may submit,
    /// a completed assignment is terminal, and the feedback text and scores
    /// must clear the validation rules before anything is written.
    pub fn submit_review(
        &self,
        assignment_id: &ReviewAssignmentId,
        caller: &CallerContext,
        text: &str,
        scores: BTreeMap<String, f32>,
    ) -> Result<FeedbackArtifact, LifecycleError> {
        let assignment = self
            .assignments
            .fetch(assignment_id)?
            .ok_or(LifecycleError::NotFound("peer review"))?;

        if assignment.reviewer != caller.user {
            return Err(LifecycleError::Forbidden(
                "you are not assigned to review this submission",
            ));
        }
        if assignment.status == ReviewStatus::Completed {
            return Err(LifecycleError::AlreadyCompleted);
        }

        let submission = self
            .submissions
            .fetch(&assignment.submission)?
            .ok_or(LifecycleError::NotFound("submission"))?;

        if submission.submitter == caller.user && !self.policy.allow_self_review {
            return Err(LifecycleError::Forbidden(
                "you cannot review your own submission",
            ));
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ValidationFailure::single("feedback", "feedback text is required"));
        }
        if trimmed.chars().count() < self.policy.min_feedback_chars {
            return Err(ValidationFailure::single(
                "feedback",
                format!(
                    "feedback must be at least {} characters long",
                    self.policy.min_feedback_chars
                ),
            ));
        }
        if trimmed.len() > self.policy.max_feedback_bytes {
            return Err(ValidationFailure::single(
                "feedback",
                format!(
                    "feedback may not exceed {} bytes",
                    self.policy.max_feedback_bytes
                ),
            ));
        }
        if let Some((dimension, value)) = scores
            .iter()
            .find(|(_, value)| !(0.0..=1.0).contains(*value))
        {
            return Err(ValidationFailure::single(
                "scores",
                format!("score '{dimension}' must be between 0 and 1, got {value}"),
            ));
        }

        let now = Utc::now();
        // A prior attempt may have stored the artifact and then failed to
        // complete the assignment; reuse it on retry instead of inserting a
        // duplicate.
        let author = FeedbackAuthor::Peer(caller.user.clone());
        let existing = self
            .feedback
            .list_for(&assignment.submission)?
            .into_iter()
            .find(|artifact| artifact.author == author);
        let stored = match existing {
            Some(artifact) => artifact,
            None => self.feedback.insert_peer(FeedbackArtifact {
                submission: assignment.submission.clone(),
                author,
                body: trimmed.to_string(),
                scores,
                created_at: now,
            })?,
        };

        self.assignments.complete(assignment_id, now)?;

        let next = submission.status.advance(SubmissionStatus::Reviewed);
        if next != submission.status {
            if let Err(error) = self.submissions.update_status(&submission.id, next, now) {
                tracing::warn!(
                    error = %error,
                    submission = %submission.id.0,
                    "failed to advance submission status after review"
                );
            }
        }

        Ok(stored)
    }
}
