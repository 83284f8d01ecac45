use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    CallerContext, CourseId, ReviewAssignmentId, Role, SubmissionDraft, SubmissionFile,
    SubmissionId, SubmissionKind, UserId,
};
use super::repository::{
    CandidateDirectory, CompletionBackend, FeedbackStore, NotificationSink, ReviewAssignmentStore,
    SubmissionStore,
};
use super::service::{LifecycleError, SubmissionLifecycleService};

/// Router builder exposing the submission lifecycle over HTTP.
pub fn submission_router<S, F, A, D, N, B>(
    service: Arc<SubmissionLifecycleService<S, F, A, D, N, B>>,
) -> Router
where
    S: SubmissionStore + 'static,
    F: FeedbackStore + 'static,
    A: ReviewAssignmentStore + 'static,
    D: CandidateDirectory + 'static,
    N: NotificationSink + 'static,
    B: CompletionBackend + 'static,
{
    Router::new()
        .route(
            "/api/v1/submissions",
            post(submit_handler::<S, F, A, D, N, B>),
        )
        .route(
            "/api/v1/submissions/:submission_id",
            get(detail_handler::<S, F, A, D, N, B>),
        )
        .route(
            "/api/v1/submissions/:submission_id/feedback",
            post(regenerate_handler::<S, F, A, D, N, B>),
        )
        .route(
            "/api/v1/reviews/:assignment_id",
            post(review_handler::<S, F, A, D, N, B>),
        )
        .with_state(service)
}

/// Caller identity rides in the payload; authentication happens upstream.
#[derive(Debug, Deserialize)]
pub(crate) struct CallerFields {
    caller_id: String,
    #[serde(default)]
    caller_role: Role,
}

impl CallerFields {
    fn context(&self) -> CallerContext {
        CallerContext {
            user: UserId(self.caller_id.clone()),
            role: self.caller_role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    #[serde(flatten)]
    caller: CallerFields,
    #[serde(default)]
    course_id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    task_description: String,
    #[serde(default)]
    kind: SubmissionKind,
    #[serde(default)]
    files: Vec<FileInput>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default = "default_generate_feedback")]
    generate_feedback: bool,
    #[serde(default)]
    practice: bool,
}

fn default_generate_feedback() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileInput {
    filename: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    #[serde(flatten)]
    caller: CallerFields,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    scores: BTreeMap<String, f32>,
}

pub(crate) async fn submit_handler<S, F, A, D, N, B>(
    State(service): State<Arc<SubmissionLifecycleService<S, F, A, D, N, B>>>,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    F: FeedbackStore + 'static,
    A: ReviewAssignmentStore + 'static,
    D: CandidateDirectory + 'static,
    N: NotificationSink + 'static,
    B: CompletionBackend + 'static,
{
    let caller = request.caller.context();
    let draft = SubmissionDraft {
        course: CourseId(request.course_id.unwrap_or_else(|| "general".to_string())),
        title: request.title,
        content: request.content,
        task_description: request.task_description,
        kind: request.kind,
        files: request
            .files
            .into_iter()
            .map(|file| SubmissionFile {
                filename: file.filename,
                content: file.content,
            })
            .collect(),
        department: request.department,
        generate_feedback: request.generate_feedback,
        practice: request.practice,
    };

    match service.submit_assignment(draft, &caller).await {
        Ok(outcome) => (StatusCode::CREATED, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn detail_handler<S, F, A, D, N, B>(
    State(service): State<Arc<SubmissionLifecycleService<S, F, A, D, N, B>>>,
    Path(submission_id): Path<String>,
    Query(query): Query<CallerFields>,
) -> Response
where
    S: SubmissionStore + 'static,
    F: FeedbackStore + 'static,
    A: ReviewAssignmentStore + 'static,
    D: CandidateDirectory + 'static,
    N: NotificationSink + 'static,
    B: CompletionBackend + 'static,
{
    let caller = query.context();
    let id = SubmissionId(submission_id);

    match service.submission_detail(&id, &caller) {
        Ok(detail) => (StatusCode::OK, axum::Json(detail)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn regenerate_handler<S, F, A, D, N, B>(
    State(service): State<Arc<SubmissionLifecycleService<S, F, A, D, N, B>>>,
    Path(submission_id): Path<String>,
    axum::Json(request): axum::Json<CallerFields>,
) -> Response
where
    S: SubmissionStore + 'static,
    F: FeedbackStore + 'static,
    A: ReviewAssignmentStore + 'static,
    D: CandidateDirectory + 'static,
    N: NotificationSink + 'static,
    B: CompletionBackend + 'static,
{
    let caller = request.context();
    let id = SubmissionId(submission_id);

    match service.regenerate_feedback(&id, &caller).await {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn review_handler<S, F, A, D, N, B>(
    State(service): State<Arc<SubmissionLifecycleService<S, F, A, D, N, B>>>,
    Path(assignment_id): Path<String>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    F: FeedbackStore + 'static,
    A: ReviewAssignmentStore + 'static,
    D: CandidateDirectory + 'static,
    N: NotificationSink + 'static,
    B: CompletionBackend + 'static,
{
    let caller = request.caller.context();
    let id = ReviewAssignmentId(assignment_id);

    match service.submit_peer_review(&id, &caller, &request.feedback, request.scores) {
        Ok(artifact) => (StatusCode::CREATED, axum::Json(artifact)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: LifecycleError) -> Response {
    match error {
        LifecycleError::Validation(failure) => {
            let payload = json!({
                "error": "validation failed",
                "fields": failure.fields,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        LifecycleError::Forbidden(message) => {
            let payload = json!({ "error": message });
            (StatusCode::FORBIDDEN, axum::Json(payload)).into_response()
        }
        LifecycleError::NotFound(what) => {
            let payload = json!({ "error": format!("{what} not found") });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        LifecycleError::AlreadyCompleted => {
            let payload = json!({ "error": "this peer review has already been completed" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        LifecycleError::Store(source) => {
            tracing::error!(error = %source, "lifecycle request failed");
            let payload = json!({ "error": "internal error" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
