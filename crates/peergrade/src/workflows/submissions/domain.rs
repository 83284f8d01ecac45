use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for stored submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

/// Identifier wrapper for platform users (students and teachers).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for the course a submission belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId(pub String);

/// Identifier wrapper for review assignments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewAssignmentId(pub String);

/// Submission categories; essay-like kinds select the gentler feedback rubric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Code,
    Essay,
    Report,
    Reflection,
    ResearchPaper,
    CaseStudy,
    #[serde(other)]
    Other,
}

impl Default for SubmissionKind {
    fn default() -> Self {
        SubmissionKind::Code
    }
}

impl SubmissionKind {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionKind::Code => "code",
            SubmissionKind::Essay => "essay",
            SubmissionKind::Report => "report",
            SubmissionKind::Reflection => "reflection",
            SubmissionKind::ResearchPaper => "research_paper",
            SubmissionKind::CaseStudy => "case_study",
            SubmissionKind::Other => "other",
        }
    }

    /// Prose-style kinds are reviewed against the writing rubric rather than the code rubric.
    pub const fn is_prose(self) -> bool {
        matches!(
            self,
            SubmissionKind::Essay
                | SubmissionKind::Report
                | SubmissionKind::Reflection
                | SubmissionKind::ResearchPaper
                | SubmissionKind::CaseStudy
        )
    }
}

/// Lifecycle status of a submission. Transitions are forward-only; practice
/// submissions never enter the review flow and keep their status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    Reviewed,
    Graded,
    Practice,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Reviewed => "reviewed",
            SubmissionStatus::Graded => "graded",
            SubmissionStatus::Practice => "practice",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            SubmissionStatus::Submitted => 0,
            SubmissionStatus::Reviewed => 1,
            SubmissionStatus::Graded => 2,
            SubmissionStatus::Practice => 0,
        }
    }

    /// Returns `next` only when it moves the lifecycle forward, otherwise keeps `self`.
    pub fn advance(self, next: SubmissionStatus) -> SubmissionStatus {
        if matches!(self, SubmissionStatus::Practice) {
            return self;
        }
        if next.rank() > self.rank() {
            next
        } else {
            self
        }
    }
}

/// A named file attached to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFile {
    pub filename: String,
    pub content: String,
}

impl SubmissionFile {
    /// Extension-derived type tag, e.g. `rs` or `py`; empty when the name has none.
    pub fn file_type(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext,
            _ => "",
        }
    }
}

/// Inbound submission payload before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDraft {
    pub course: CourseId,
    pub title: String,
    pub content: String,
    pub task_description: String,
    pub kind: SubmissionKind,
    pub files: Vec<SubmissionFile>,
    pub department: Option<String>,
    pub generate_feedback: bool,
    pub practice: bool,
}

impl SubmissionDraft {
    /// The text the scorer and feedback generator see: attached files joined
    /// with named delimiters, or the inline content when no files were sent.
    pub fn combined_content(&self) -> String {
        if self.files.is_empty() {
            return self.content.clone();
        }

        let mut sections = Vec::with_capacity(self.files.len());
        for file in &self.files {
            sections.push(format!("=== FILE: {} ===\n{}", file.filename, file.content));
        }
        sections.join("\n\n")
    }
}

/// Persisted submission record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: SubmissionId,
    pub submitter: UserId,
    pub course: CourseId,
    pub title: String,
    pub content: String,
    pub task_description: Option<String>,
    pub kind: SubmissionKind,
    pub status: SubmissionStatus,
    pub files: Vec<SubmissionFile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who authored a piece of feedback. The author tag is explicit so machine
/// feedback and peer feedback can never be confused by a missing reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reviewer", rename_all = "snake_case")]
pub enum FeedbackAuthor {
    Ai,
    Peer(UserId),
}

impl FeedbackAuthor {
    pub const fn is_ai(&self) -> bool {
        matches!(self, FeedbackAuthor::Ai)
    }
}

/// Stored feedback artifact: narrative text plus per-dimension scores in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackArtifact {
    pub submission: SubmissionId,
    pub author: FeedbackAuthor,
    pub body: String,
    pub scores: BTreeMap<String, f32>,
    pub created_at: DateTime<Utc>,
}

/// Status of one reviewer's obligation toward one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Completed,
    Skipped,
}

impl ReviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Completed => "completed",
            ReviewStatus::Skipped => "skipped",
        }
    }
}

/// One reviewer's assignment to review one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAssignment {
    pub id: ReviewAssignmentId,
    pub submission: SubmissionId,
    pub reviewer: UserId,
    pub status: ReviewStatus,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Broad category used by notification consumers to route and render events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Feedback,
    Review,
}

/// Outbound notification emitted on feedback arrival and review assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub user: UserId,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub reference: SubmissionId,
    /// Always false at creation; read-tracking happens downstream.
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn feedback_ready(submission: &SubmissionRecord) -> Self {
        Self {
            user: submission.submitter.clone(),
            title: "AI Feedback Ready".to_string(),
            message: format!("Feedback is available for: {}", submission.title),
            category: NotificationCategory::Feedback,
            reference: submission.id.clone(),
            read: false,
            created_at: Utc::now(),
        }
    }

    pub fn review_assigned(submission: &SubmissionRecord, reviewer: &UserId) -> Self {
        Self {
            user: reviewer.clone(),
            title: "New Peer Review Assigned".to_string(),
            message: format!("You have been assigned to review: {}", submission.title),
            category: NotificationCategory::Review,
            reference: submission.id.clone(),
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// A student eligible to act as a peer reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewerCandidate {
    pub id: UserId,
    pub name: String,
    pub department: Option<String>,
    /// Self-assessed ability in [0, 1]; carried for analytics, not used by
    /// the matcher.
    pub skill_level: Option<f32>,
}

/// Platform roles relevant to authorization decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
}

impl Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

/// Authenticated identity attached to every lifecycle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub user: UserId,
    pub role: Role,
}

impl CallerContext {
    pub fn student(user: UserId) -> Self {
        Self {
            user,
            role: Role::Student,
        }
    }

    pub fn teacher(user: UserId) -> Self {
        Self {
            user,
            role: Role::Teacher,
        }
    }

    pub const fn is_teacher(&self) -> bool {
        matches!(self.role, Role::Teacher)
    }
}
