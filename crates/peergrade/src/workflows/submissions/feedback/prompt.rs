use crate::workflows::submissions::domain::{SubmissionFile, SubmissionKind};

/// Inputs the generator needs to produce one feedback narrative.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackRequest<'a> {
    pub content: &'a str,
    pub task_description: &'a str,
    pub kind: SubmissionKind,
    pub files: &'a [SubmissionFile],
}

const CODE_TEMPLATE_HEADER: &str = "You are a strict professional programming instructor. \
Identify every flaw, bug, and weakness in the student code. No compromises on quality.";

const CODE_TEMPLATE_RUBRIC: &str = "\
**MANDATORY EVALUATION CRITERIA:**
1. **FUNCTIONAL CORRECTNESS** - Does it work exactly as specified? Test edge cases mentally.
2. **REQUIREMENTS COMPLIANCE** - Every single requirement must be implemented correctly.
3. **CODE QUALITY** - Professional standards only; no excuses for poor naming or structure.
4. **ERROR HANDLING** - Must handle all possible errors gracefully.

**Format exactly like this:**

**EXECUTIVE SUMMARY**
• Overall grade: **A/B/C/D/F** (be honest, no grade inflation)
• **Critical verdict**: Pass/Fail with justification

**STRENGTHS** (only if genuinely excellent, max 3)
• Specific code reference and why it is strong

**CRITICAL FAILURES** (list all bugs)
• Exact bug description with the fix required

**REQUIREMENTS VERIFICATION** (check every requirement)
• **REQ**: [PASS / FAIL] with evidence

**IMMEDIATE FIXES REQUIRED** (prioritized)
1. Most critical fix first

**Final Grade: [A/B/C/D/F] - [Justification]**";

const PROSE_TEMPLATE_HEADER: &str = "You are a supportive writing instructor. \
Give clear, respectful, and specific feedback on the student's writing.";

const PROSE_TEMPLATE_RUBRIC: &str = "\
Format your response using these sections:

**SUMMARY**
• Two or three sentences on what the student wrote and the overall impression.

**STRENGTHS**
• Point out specific things that work well; quote short phrases when helpful.

**AREAS TO IMPROVE**
• Explain clearly what is confusing, missing, or weak. Focus on the writing itself.

**SUGGESTIONS**
• Give three to five concrete suggestions the student can actually follow.

Be honest but always respectful and encouraging.";

const TASK_SECTION_HEADER: &str = "**ASSIGNMENT SPECIFICATION** (all requirements are mandatory):";

/// Builds the backend prompt, choosing the strict code rubric or the gentler
/// writing rubric from the submission kind.
pub(crate) fn build(request: &FeedbackRequest<'_>) -> String {
    let task_section = task_section(request.task_description);

    if request.kind.is_prose() {
        let mut prompt = String::new();
        prompt.push_str(PROSE_TEMPLATE_HEADER);
        prompt.push_str("\n\n");
        if let Some(task) = &task_section {
            prompt.push_str(task);
            prompt.push_str("\n\n");
        }
        prompt.push_str("**STUDENT WRITING:**\n");
        prompt.push_str(request.content);
        prompt.push_str("\n\n");
        prompt.push_str(PROSE_TEMPLATE_RUBRIC);
        return prompt;
    }

    let mut prompt = String::new();
    prompt.push_str(CODE_TEMPLATE_HEADER);
    prompt.push_str("\n\n");
    if let Some(task) = &task_section {
        prompt.push_str(task);
        prompt.push_str("\n\n");
    }
    prompt.push_str(&submission_section(request));
    prompt.push_str("\n\n");
    prompt.push_str(CODE_TEMPLATE_RUBRIC);
    prompt
}

fn task_section(task_description: &str) -> Option<String> {
    let trimmed = task_description.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(format!("{TASK_SECTION_HEADER}\n\n{trimmed}"))
}

fn submission_section(request: &FeedbackRequest<'_>) -> String {
    if request.files.is_empty() {
        return format!("**STUDENT SUBMISSION:**\n```\n{}\n```", request.content);
    }

    let mut section = String::from("**MULTIPLE FILES SUBMISSION:**\n");
    for (index, file) in request.files.iter().enumerate() {
        section.push_str(&format!(
            "**FILE {}: {}**\n```\n{}\n```\n",
            index + 1,
            file.filename,
            file.content
        ));
    }
    section
}
