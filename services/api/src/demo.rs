use crate::infra::{
    enroll, shared_roster, ApiBackend, InMemoryAssignmentStore, InMemoryFeedbackStore,
    InMemorySubmissionStore, LoggingNotificationSink, RosterDirectory,
};
use clap::Args;
use peergrade::config::AppConfig;
use peergrade::error::AppError;
use peergrade::workflows::submissions::{
    CallerContext, CourseId, ReviewAssignmentStore, ScoreEngine, SubmissionDraft, SubmissionKind,
    SubmissionLifecycleService, UserId,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Path of the submission file to score
    pub(crate) file: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the peer review portion of the demo.
    #[arg(long)]
    pub(crate) skip_review: bool,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let content = std::fs::read_to_string(&args.file)?;
    let engine = ScoreEngine::default();

    let scores = engine.score(&content);
    println!("Scores for {}", args.file.display());
    println!("- correctness:  {:.2}", scores.correctness);
    println!("- quality:      {:.2}", scores.quality);
    println!("- completeness: {:.2}", scores.completeness);

    let report = engine.check_plagiarism(&content);
    if report.flagged {
        println!(
            "\nOriginality flag: {} (similarity {:.2}, confidence {:.2})",
            report.message, report.similarity, report.confidence
        );
        for suggestion in &report.suggestions {
            println!("- {}", suggestion);
        }
    } else {
        println!("\nOriginality: no concerns ({})", report.message);
    }

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;

    let roster = shared_roster();
    enroll(&roster, "alice", Some("cs"));
    enroll(&roster, "bob", Some("cs"));

    let submissions = Arc::new(InMemorySubmissionStore::new(roster.clone()));
    let feedback = Arc::new(InMemoryFeedbackStore::default());
    let assignments = Arc::new(InMemoryAssignmentStore::default());
    let directory = Arc::new(RosterDirectory::new(roster));
    let notifications = Arc::new(LoggingNotificationSink);
    let backend = ApiBackend::from_config(&config.ai)?;

    println!("Submission review demo");
    if backend.is_configured() {
        println!("Completion backend: configured ({})", config.ai.model);
    } else {
        println!("Completion backend: not configured, feedback uses the rule-based fallback");
    }

    let service = SubmissionLifecycleService::new(
        submissions,
        feedback,
        assignments.clone(),
        directory,
        notifications,
        Arc::new(backend),
        config.review.policy(),
        config.ai.generation_params(),
    );

    let draft = SubmissionDraft {
        course: CourseId("cs101".to_string()),
        title: "Linked list exercise".to_string(),
        content: demo_submission_content().to_string(),
        task_description: "Implement a singly linked list with push and pop.".to_string(),
        kind: SubmissionKind::Code,
        files: Vec::new(),
        department: Some("cs".to_string()),
        generate_feedback: true,
        practice: false,
    };

    let alice = CallerContext::student(UserId("alice".to_string()));
    let outcome = match service.submit_assignment(draft, &alice).await {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("  Submission rejected: {}", err);
            return Ok(());
        }
    };

    println!("\n- Received submission {}", outcome.submission_id.0);
    if let Some(source) = outcome.feedback_source {
        println!("  Feedback source: {:?}", source);
    }
    if let Some(text) = &outcome.feedback {
        println!("  Feedback:\n{}", indent(text));
    }
    println!(
        "  Peer reviewers assigned: {} ({})",
        outcome.peers_assigned,
        outcome
            .reviewers
            .iter()
            .map(|reviewer| reviewer.0.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    if args.skip_review {
        return Ok(());
    }

    let assigned = match assignments.list_for(&outcome.submission_id) {
        Ok(assigned) => assigned,
        Err(err) => {
            println!("\n  Assignment lookup failed: {}", err);
            return Ok(());
        }
    };
    let Some(assignment) = assigned.into_iter().next() else {
        println!("\n  No reviewer available, skipping the peer review step");
        return Ok(());
    };

    let reviewer = CallerContext::student(assignment.reviewer.clone());
    let review = service.submit_peer_review(
        &assignment.id,
        &reviewer,
        "Clear structure and good naming. Consider covering the empty-list case in pop.",
        BTreeMap::from([
            ("correctness".to_string(), 0.8_f32),
            ("quality".to_string(), 0.7_f32),
        ]),
    );
    match review {
        Ok(artifact) => {
            println!(
                "\n- Peer review recorded for {} by {}",
                artifact.submission.0, assignment.reviewer.0
            );
        }
        Err(err) => {
            println!("\n  Peer review rejected: {}", err);
            return Ok(());
        }
    }

    match service.submission_detail(&outcome.submission_id, &alice) {
        Ok(detail) => {
            println!(
                "  Submission status: {}",
                detail.submission.status.label()
            );
            match serde_json::to_string_pretty(&detail) {
                Ok(json) => println!("  Detail payload:\n{}", indent(&json)),
                Err(err) => println!("  Detail payload unavailable: {}", err),
            }
        }
        Err(err) => println!("  Detail unavailable: {}", err),
    }

    // Regenerating replaces the prior AI artifact rather than appending.
    match service.regenerate_feedback(&outcome.submission_id, &alice).await {
        Ok(regenerated) => {
            println!(
                "\n- Feedback regenerated ({:?}); the earlier AI artifact was replaced",
                regenerated.source
            );
        }
        Err(err) => println!("\n  Regeneration failed: {}", err),
    }

    Ok(())
}

fn demo_submission_content() -> &'static str {
    r#"# Singly linked list with push and pop
class Node:
    def __init__(self, value):
        self.value = value
        self.next = None


class LinkedList:
    def __init__(self):
        self.head = None

    def push(self, value):
        node = Node(value)
        node.next = self.head
        self.head = node

    def pop(self):
        # Empty list yields None rather than raising
        if self.head is None:
            return None
        node = self.head
        self.head = node.next
        return node.value
"#
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
