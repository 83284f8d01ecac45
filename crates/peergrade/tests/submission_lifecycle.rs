//! Integration specifications for the submission lifecycle delivered through
//! the public service facade: intake, feedback generation with fallback,
//! reviewer matching, regeneration, and peer review completion.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use peergrade::workflows::submissions::{
        CallerContext, CandidateDirectory, CompletionBackend, CourseId, DependencyError,
        FeedbackArtifact, FeedbackAuthor, FeedbackStore, GenerationParams, NotificationEvent,
        NotificationSink, NotifyError, ReviewAssignment, ReviewAssignmentId,
        ReviewAssignmentStore, ReviewPolicy, ReviewStatus, ReviewerCandidate, StoreError,
        SubmissionDraft, SubmissionId, SubmissionKind, SubmissionLifecycleService,
        SubmissionRecord, SubmissionStatus, SubmissionStore, UserId,
    };

    pub(super) type Service<B> = SubmissionLifecycleService<
        MemorySubmissions,
        MemoryFeedback,
        MemoryAssignments,
        MemoryDirectory,
        MemoryNotifications,
        B,
    >;

    pub(super) struct Harness {
        pub(super) submissions: Arc<MemorySubmissions>,
        pub(super) feedback: Arc<MemoryFeedback>,
        pub(super) assignments: Arc<MemoryAssignments>,
        pub(super) directory: Arc<MemoryDirectory>,
        pub(super) notifications: Arc<MemoryNotifications>,
    }

    pub(super) fn harness() -> Harness {
        Harness {
            submissions: Arc::new(MemorySubmissions::default()),
            feedback: Arc::new(MemoryFeedback::default()),
            assignments: Arc::new(MemoryAssignments::default()),
            directory: Arc::new(MemoryDirectory::default()),
            notifications: Arc::new(MemoryNotifications::default()),
        }
    }

    pub(super) fn service<B: CompletionBackend + 'static>(
        harness: &Harness,
        policy: ReviewPolicy,
        backend: B,
    ) -> Arc<Service<B>> {
        Arc::new(SubmissionLifecycleService::new(
            Arc::clone(&harness.submissions),
            Arc::clone(&harness.feedback),
            Arc::clone(&harness.assignments),
            Arc::clone(&harness.directory),
            Arc::clone(&harness.notifications),
            Arc::new(backend),
            policy,
            GenerationParams::default(),
        ))
    }

    pub(super) fn student(id: &str) -> CallerContext {
        CallerContext::student(UserId(id.to_string()))
    }

    pub(super) fn enroll(harness: &Harness, id: &str, department: Option<&str>) {
        harness.directory.add(ReviewerCandidate {
            id: UserId(id.to_string()),
            name: format!("Student {id}"),
            department: department.map(str::to_string),
            skill_level: None,
        });
    }

    pub(super) fn draft() -> SubmissionDraft {
        SubmissionDraft {
            course: CourseId("cs101".to_string()),
            title: "Linked list exercise".to_string(),
            content: "def push(stack, value):\n    stack.append(value)\n    return stack\n"
                .to_string(),
            task_description: "Implement stack operations".to_string(),
            kind: SubmissionKind::Code,
            files: Vec::new(),
            department: None,
            generate_feedback: true,
            practice: false,
        }
    }

    pub(super) struct CountingBackend {
        calls: Mutex<u32>,
    }

    impl CountingBackend {
        pub(super) fn new() -> Self {
            Self {
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for CountingBackend {
        async fn complete(
            &self,
            _prompt: &str,
            _params: GenerationParams,
        ) -> Result<String, DependencyError> {
            let mut calls = self.calls.lock().expect("call counter poisoned");
            *calls += 1;
            Ok(format!("Model feedback, call {calls}"))
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
                .filter(|artifact| {
                    artifact.submission == *submission && artifact.author.is_ai()
                })
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

        fn fetch(
            &self,
            id: &ReviewAssignmentId,
        ) -> Result<Option<ReviewAssignment>, StoreError> {
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

        fn list_for(
            &self,
            submission: &SubmissionId,
        ) -> Result<Vec<ReviewAssignment>, StoreError> {
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
            self.events
                .lock()
                .expect("notification mutex poisoned")
                .clone()
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
}

use common::{draft, enroll, harness, service, student, CountingBackend};
use peergrade::workflows::submissions::{
    DisabledBackend, FeedbackSource, NotificationCategory, ReviewPolicy, ReviewStatus,
    SubmissionStatus, UserId,
};

#[tokio::test]
async fn two_student_classroom_runs_the_full_loop() {
    let harness = harness();
    enroll(&harness, "alice", Some("cs"));
    enroll(&harness, "bob", Some("cs"));
    let service = service(&harness, ReviewPolicy::default(), DisabledBackend);

    // Alice submits; with a disabled backend she still gets graded fallback feedback.
    let outcome = service
        .submit_assignment(draft(), &student("alice"))
        .await
        .expect("submission accepted");
    assert_eq!(outcome.feedback_source, Some(FeedbackSource::Fallback));
    assert!(outcome
        .feedback
        .as_deref()
        .unwrap()
        .contains("Final Grade:"));
    assert_eq!(outcome.reviewers, vec![UserId("bob".to_string())]);

    // Bob was notified of the assignment, Alice of the feedback.
    let events = harness.notifications.events();
    assert!(events.iter().any(|event| {
        event.category == NotificationCategory::Review && event.user == UserId("bob".to_string())
    }));
    assert!(events.iter().any(|event| {
        event.category == NotificationCategory::Feedback
            && event.user == UserId("alice".to_string())
    }));

    // Bob completes his review; the submission advances.
    let assignment = harness.assignments.all().remove(0);
    service
        .submit_peer_review(
            &assignment.id,
            &student("bob"),
            "Push works, but pop is missing a length check.",
            std::collections::BTreeMap::from([("correctness".to_string(), 0.7_f32)]),
        )
        .expect("review accepted");

    let record = harness
        .submissions
        .get(&outcome.submission_id)
        .expect("submission stored");
    assert_eq!(record.status, SubmissionStatus::Reviewed);
    assert_eq!(
        harness.assignments.all()[0].status,
        ReviewStatus::Completed
    );

    // Detail view shows both artifacts.
    let detail = service
        .submission_detail(&outcome.submission_id, &student("alice"))
        .expect("owner reads detail");
    assert_eq!(detail.feedback.len(), 2);
}

#[tokio::test]
async fn concurrent_regenerations_leave_one_ai_artifact() {
    let harness = harness();
    let service = service(&harness, ReviewPolicy::default(), CountingBackend::new());

    let alice = student("alice");
    let outcome = service
        .submit_assignment(draft(), &alice)
        .await
        .expect("submission accepted");
    let submission_id = outcome.submission_id.clone();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let service = std::sync::Arc::clone(&service);
        let submission_id = submission_id.clone();
        let caller = alice.clone();
        tasks.push(tokio::spawn(async move {
            service
                .regenerate_feedback(&submission_id, &caller)
                .await
                .expect("regeneration succeeds")
        }));
    }
    for task in tasks {
        task.await.expect("task completes");
    }

    let ai = harness.feedback.ai_artifacts(&submission_id);
    assert_eq!(ai.len(), 1, "replacement is atomic under concurrency");
}

#[tokio::test]
async fn concurrent_matching_never_duplicates_a_reviewer() {
    let harness = harness();
    enroll(&harness, "alice", None);
    let service = service(&harness, ReviewPolicy::default(), DisabledBackend);

    let alice = student("alice");
    let mut no_feedback = draft();
    no_feedback.generate_feedback = false;

    // Alice submits while she is the only student, so no reviewer exists yet.
    let outcome = service
        .submit_assignment(no_feedback, &alice)
        .await
        .expect("submission accepted");
    let submission_id = outcome.submission_id.clone();
    assert_eq!(outcome.peers_assigned, 0);

    // Bob enrolls afterwards; racing regenerations all try to backfill him.
    enroll(&harness, "bob", None);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let service = std::sync::Arc::clone(&service);
        let submission_id = submission_id.clone();
        let caller = alice.clone();
        tasks.push(tokio::spawn(async move {
            service
                .regenerate_feedback(&submission_id, &caller)
                .await
                .expect("regeneration succeeds")
                .peers_assigned
        }));
    }
    let mut total_assigned = 0;
    for task in tasks {
        total_assigned += task.await.expect("task completes");
    }

    let assignments = harness.assignments.all();
    assert_eq!(assignments.len(), 1, "bob is assigned exactly once");
    assert_eq!(assignments[0].reviewer, UserId("bob".to_string()));
    assert_eq!(total_assigned, 1, "conflicting workers back off silently");
}

#[tokio::test]
async fn practice_and_declined_feedback_paths_stay_quiet() {
    let harness = harness();
    enroll(&harness, "alice", None);
    enroll(&harness, "bob", None);
    let service = service(&harness, ReviewPolicy::default(), DisabledBackend);

    let mut practice = draft();
    practice.practice = true;
    let outcome = service
        .submit_assignment(practice, &student("alice"))
        .await
        .expect("submission accepted");

    assert_eq!(outcome.peers_assigned, 0);
    let record = harness
        .submissions
        .get(&outcome.submission_id)
        .expect("record stored");
    assert_eq!(record.status, SubmissionStatus::Practice);

    let mut quiet = draft();
    quiet.generate_feedback = false;
    let outcome = service
        .submit_assignment(quiet, &student("bob"))
        .await
        .expect("submission accepted");
    assert!(outcome.feedback.is_none());
    assert!(harness
        .feedback
        .ai_artifacts(&outcome.submission_id)
        .is_empty());
}
