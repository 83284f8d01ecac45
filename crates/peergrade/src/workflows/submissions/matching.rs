use std::sync::Arc;

use super::domain::{SubmissionId, UserId};
use super::repository::{CandidateDirectory, ReviewAssignmentStore, StoreError};

/// Selects peer reviewers for a submission.
///
/// Selection prefers the submitter's department, relaxes to the whole student
/// body when the department yields nobody, skips anyone already assigned, and
/// stops as soon as the cap is met. Matching is best-effort: directory or
/// store trouble degrades to an empty list rather than failing the caller.
pub struct PeerMatcher<D, A> {
    directory: Arc<D>,
    assignments: Arc<A>,
    cap: usize,
}

impl<D, A> PeerMatcher<D, A>
where
    D: CandidateDirectory,
    A: ReviewAssignmentStore,
{
    pub fn new(directory: Arc<D>, assignments: Arc<A>, cap: usize) -> Self {
        Self {
            directory,
            assignments,
            cap,
        }
    }

    /// Up to `cap` reviewer ids; never the submitter, never a duplicate.
    pub fn match_peers(
        &self,
        submission: &SubmissionId,
        submitter: &UserId,
        department: Option<&str>,
    ) -> Vec<UserId> {
        let candidates = match self.candidate_pool(submitter, department) {
            Ok(candidates) => candidates,
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    submission = %submission.0,
                    "candidate directory unavailable, skipping peer matching"
                );
                return Vec::new();
            }
        };

        candidates
            .into_iter()
            .filter(|candidate| match self.assignments.exists(submission, &candidate.id) {
                Ok(already_assigned) => !already_assigned,
                Err(error) => {
                    tracing::warn!(
                        error = %error,
                        reviewer = %candidate.id.0,
                        "duplicate-assignment check failed, skipping candidate"
                    );
                    false
                }
            })
            .take(self.cap)
            .map(|candidate| candidate.id)
            .collect()
    }

    fn candidate_pool(
        &self,
        submitter: &UserId,
        department: Option<&str>,
    ) -> Result<Vec<super::domain::ReviewerCandidate>, StoreError> {
        if let Some(department) = department {
            let same_department = self
                .directory
                .students_excluding(submitter, Some(department))?;
            if !same_department.is_empty() {
                return Ok(same_department);
            }
        }
        self.directory.students_excluding(submitter, None)
    }
}
