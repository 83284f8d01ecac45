use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::assignment::{ReviewCoordinator, ReviewPolicy};
use super::domain::{
    CallerContext, FeedbackArtifact, NotificationEvent, ReviewAssignment, ReviewAssignmentId,
    SubmissionDraft, SubmissionId, SubmissionRecord, SubmissionStatus, UserId,
};
use super::evaluation::ScoreEngine;
use super::feedback::{FeedbackBundle, FeedbackGenerator, FeedbackRequest, FeedbackSource};
use super::matching::PeerMatcher;
use super::repository::{
    CandidateDirectory, CompletionBackend, FeedbackStore, GenerationParams, NotificationSink,
    ReviewAssignmentStore, StoreError, SubmissionStore,
};

static SUBMISSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_submission_id() -> SubmissionId {
    let id = SUBMISSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SubmissionId(format!("sub-{id:06}"))
}

/// Orchestrates the submission lifecycle: intake, AI feedback, reviewer
/// matching, peer review intake, and detail reads.
pub struct SubmissionLifecycleService<S, F, A, D, N, B> {
    submissions: Arc<S>,
    feedback: Arc<F>,
    assignments: Arc<A>,
    directory: Arc<D>,
    notifications: Arc<N>,
    generator: FeedbackGenerator<B>,
    matcher: PeerMatcher<D, A>,
    coordinator: ReviewCoordinator<S, F, A, N>,
    policy: ReviewPolicy,
}

impl<S, F, A, D, N, B> SubmissionLifecycleService<S, F, A, D, N, B>
where
    S: SubmissionStore + 'static,
    F: FeedbackStore + 'static,
    A: ReviewAssignmentStore + 'static,
    D: CandidateDirectory + 'static,
    N: NotificationSink + 'static,
    B: CompletionBackend + 'static,
{
    pub fn new(
        submissions: Arc<S>,
        feedback: Arc<F>,
        assignments: Arc<A>,
        directory: Arc<D>,
        notifications: Arc<N>,
        backend: Arc<B>,
        policy: ReviewPolicy,
        params: GenerationParams,
    ) -> Self {
        let generator = FeedbackGenerator::new(backend, ScoreEngine::default(), params);
        let matcher = PeerMatcher::new(
            Arc::clone(&directory),
            Arc::clone(&assignments),
            policy.peers_per_submission,
        );
        let coordinator = ReviewCoordinator::new(
            Arc::clone(&submissions),
            Arc::clone(&feedback),
            Arc::clone(&assignments),
            Arc::clone(&notifications),
            policy.clone(),
        );

        Self {
            submissions,
            feedback,
            assignments,
            directory,
            notifications,
            generator,
            matcher,
            coordinator,
            policy,
        }
    }

    /// Accept a new submission: validate, persist, match reviewers, and
    /// (unless declined) generate and store AI feedback.
    pub async fn submit_assignment(
        &self,
        draft: SubmissionDraft,
        caller: &CallerContext,
    ) -> Result<SubmissionOutcome, LifecycleError> {
        let combined = draft.combined_content();

        let mut failure = ValidationFailure::default();
        if combined.trim().is_empty() {
            failure.push("content", "submission content cannot be empty");
        }
        if combined.len() > self.policy.max_content_bytes {
            failure.push(
                "content",
                format!(
                    "submission content may not exceed {} bytes",
                    self.policy.max_content_bytes
                ),
            );
        }
        if !failure.is_empty() {
            return Err(LifecycleError::Validation(failure));
        }

        let now = Utc::now();
        let status = if draft.practice {
            SubmissionStatus::Practice
        } else {
            SubmissionStatus::Submitted
        };
        let task_description = {
            let trimmed = draft.task_description.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        let title = {
            let trimmed = draft.title.trim();
            if trimmed.is_empty() {
                "Untitled submission".to_string()
            } else {
                trimmed.to_string()
            }
        };

        let record = self.submissions.insert(SubmissionRecord {
            id: next_submission_id(),
            submitter: caller.user.clone(),
            course: draft.course.clone(),
            title,
            content: combined,
            task_description,
            kind: draft.kind,
            status,
            files: draft.files.clone(),
            created_at: now,
            updated_at: now,
        })?;

        let assignments = if draft.practice {
            Vec::new()
        } else {
            let department = draft
                .department
                .clone()
                .or_else(|| self.department_of(&record.submitter));
            self.run_matching(&record, department.as_deref())
        };

        let mut feedback = None;
        let mut feedback_source = None;
        if draft.generate_feedback {
            let bundle = self.generate_and_store(&record).await?;
            feedback = Some(bundle.text);
            feedback_source = Some(bundle.source);
        }

        Ok(SubmissionOutcome {
            submission_id: record.id,
            feedback,
            feedback_source,
            peers_assigned: assignments.len(),
            reviewers: assignments
                .into_iter()
                .map(|assignment| assignment.reviewer)
                .collect(),
        })
    }

    /// Regenerate AI feedback for an existing submission, replacing the prior
    /// AI artifact. Reviewer matching runs lazily: only when the submission
    /// has no assignments yet. Practice submissions stay out of the review
    /// flow entirely.
    pub async fn regenerate_feedback(
        &self,
        submission_id: &SubmissionId,
        caller: &CallerContext,
    ) -> Result<RegenerateOutcome, LifecycleError> {
        let record = self
            .submissions
            .fetch(submission_id)?
            .ok_or(LifecycleError::NotFound("submission"))?;

        if !caller.is_teacher() && record.submitter != caller.user {
            return Err(LifecycleError::Forbidden(
                "you do not have permission to generate feedback for this submission",
            ));
        }

        let bundle = self.generate_and_store(&record).await?;

        let peers_assigned = if record.status == SubmissionStatus::Practice {
            0
        } else {
            match self.assignments.count_for(&record.id) {
                Ok(0) => {
                    let department = self.department_of(&record.submitter);
                    self.run_matching(&record, department.as_deref()).len()
                }
                Ok(_) => 0,
                Err(error) => {
                    tracing::warn!(
                        error = %error,
                        submission = %record.id.0,
                        "assignment count unavailable, skipping lazy peer matching"
                    );
                    0
                }
            }
        };

        Ok(RegenerateOutcome {
            feedback: bundle.text,
            source: bundle.source,
            peers_assigned,
        })
    }

    /// Accept a completed peer review for an assignment. The peer artifact is
    /// the source of truth for the reviewer's text and dimension scores.
    pub fn submit_peer_review(
        &self,
        assignment_id: &ReviewAssignmentId,
        caller: &CallerContext,
        text: &str,
        scores: BTreeMap<String, f32>,
    ) -> Result<FeedbackArtifact, LifecycleError> {
        self.coordinator
            .submit_review(assignment_id, caller, text, scores)
    }

    /// Full detail view for a submission. Students only see their own work;
    /// reviewers assigned to the submission and teachers see it too.
    pub fn submission_detail(
        &self,
        submission_id: &SubmissionId,
        caller: &CallerContext,
    ) -> Result<SubmissionDetail, LifecycleError> {
        let record = self
            .submissions
            .fetch(submission_id)?
            .ok_or(LifecycleError::NotFound("submission"))?;

        let assignments = self.assignments.list_for(&record.id)?;
        let is_reviewer = assignments
            .iter()
            .any(|assignment| assignment.reviewer == caller.user);
        if !caller.is_teacher() && record.submitter != caller.user && !is_reviewer {
            return Err(LifecycleError::Forbidden(
                "you do not have permission to view this submission",
            ));
        }

        let feedback = self.feedback.list_for(&record.id)?;

        Ok(SubmissionDetail {
            submission: record,
            feedback,
            assignments,
        })
    }

    async fn generate_and_store(
        &self,
        record: &SubmissionRecord,
    ) -> Result<FeedbackBundle, LifecycleError> {
        let bundle = self
            .generator
            .generate(FeedbackRequest {
                content: &record.content,
                task_description: record.task_description.as_deref().unwrap_or(""),
                kind: record.kind,
                files: &record.files,
            })
            .await;

        let artifact = FeedbackArtifact {
            submission: record.id.clone(),
            author: super::domain::FeedbackAuthor::Ai,
            body: bundle.text.clone(),
            scores: bundle.scores.into_map(),
            created_at: Utc::now(),
        };
        self.feedback.replace_ai(artifact)?;

        let event = NotificationEvent::feedback_ready(record);
        if let Err(error) = self.notifications.notify(event) {
            tracing::warn!(
                error = %error,
                submission = %record.id.0,
                "failed to notify submitter of new feedback"
            );
        }

        Ok(bundle)
    }

    fn run_matching(
        &self,
        record: &SubmissionRecord,
        department: Option<&str>,
    ) -> Vec<ReviewAssignment> {
        let peers = self
            .matcher
            .match_peers(&record.id, &record.submitter, department);
        self.coordinator.assign(record, &peers)
    }

    fn department_of(&self, user: &UserId) -> Option<String> {
        match self.directory.department_of(user) {
            Ok(department) => department,
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    user = %user.0,
                    "department lookup failed, matching without department preference"
                );
                None
            }
        }
    }
}

/// Result of a new submission: what was stored, what feedback was produced,
/// and who was assigned to review it.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub submission_id: SubmissionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_source: Option<FeedbackSource>,
    pub peers_assigned: usize,
    pub reviewers: Vec<UserId>,
}

/// Result of regenerating feedback for an existing submission.
#[derive(Debug, Clone, Serialize)]
pub struct RegenerateOutcome {
    pub feedback: String,
    pub source: FeedbackSource,
    pub peers_assigned: usize,
}

/// Full read model for one submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionDetail {
    pub submission: SubmissionRecord,
    pub feedback: Vec<FeedbackArtifact>,
    pub assignments: Vec<ReviewAssignment>,
}

/// Field-level validation details, reported before any side effect.
#[derive(Debug, Default)]
pub struct ValidationFailure {
    pub fields: BTreeMap<&'static str, String>,
}

impl ValidationFailure {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.insert(field, message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn single(field: &'static str, message: impl Into<String>) -> LifecycleError {
        let mut failure = Self::default();
        failure.push(field, message);
        LifecycleError::Validation(failure)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid request")?;
        for (index, (field, message)) in self.fields.iter().enumerate() {
            let sep = if index == 0 { ": " } else { "; " };
            write!(f, "{sep}{field}: {message}")?;
        }
        Ok(())
    }
}

/// Error raised by the submission lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("{0}")]
    Validation(ValidationFailure),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("this peer review has already been completed")]
    AlreadyCompleted,
    #[error(transparent)]
    Store(#[from] StoreError),
}
