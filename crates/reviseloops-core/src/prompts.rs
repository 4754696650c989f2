//! Feedback and revision templates.
//!
//! Both are rendered with `system_prompt`, `user_input`, `current_output`,
//! `previous_output`, `evaluation_overall_score`, `evaluation_aspect_scores`
//! and `evaluation_combined_reasoning`; the revision template also takes
//! `feedback`.

use reviseloops_model::ChatPrompt;

/// Placeholder bound to the evaluation fields when no evaluator is configured
pub const NOT_EVALUATED: &str = "Not evaluated";

pub use reviseloops_eval::prompts::NO_PREVIOUS_OUTPUT;

/// Starting text when the caller supplies no initial output
pub const NO_INITIAL_OUTPUT: &str = "No initial output provided.";

const FEEDBACK_SYSTEM: &str = r#"You are an expert content reviewer giving constructive feedback on AI-generated content. Your feedback must be specific, actionable and grounded in the evaluation results provided.

Instructions:
1. Study the context, user input, current output and evaluation results.
2. Comment on:
   - Relevance to the user's input and the system prompt
   - Coherence and clarity
   - Accuracy of the information
3. For every aspect that scored low, propose a concrete improvement.
4. Point out missing elements and superfluous information.
5. Where a previous output exists, note what improved or regressed since then.

Keep the feedback detailed but concise."#;

const FEEDBACK_USER: &str = r#"Context and Requirements: {system_prompt}

User Input: {user_input}

Current Output: {current_output}

Evaluation Results:
Overall Score: {evaluation_overall_score}
Aspect Scores: {evaluation_aspect_scores}
Reasoning: {evaluation_combined_reasoning}

Previous Output (if available): {previous_output}

Provide your constructive feedback and specific suggestions for improvement:"#;

const REVISION_SYSTEM: &str = r#"You are an AI assistant improving content based on expert feedback and evaluation. Address every point raised in the feedback while keeping what already works.

Instructions:
1. Read the system prompt, user input, current output, evaluation results and feedback.
2. Revise the content to resolve every issue and suggestion in the feedback.
3. The revised output must:
   - Stay highly relevant to the user's input and the system prompt
   - Flow logically and read clearly
   - Be accurate and factual
   - Improve the aspects that scored low
4. Preserve the elements the evaluation noted as strengths.

Respond in exactly this format:
SUGGESTIONS:
- [one line per change you are making]
REVISED OUTPUT:
[the complete revised content, and nothing else]"#;

const REVISION_USER: &str = r#"System Prompt: {system_prompt}

User Input: {user_input}

Current Output: {current_output}

Evaluation Results:
Overall Score: {evaluation_overall_score}
Aspect Scores: {evaluation_aspect_scores}
Reasoning: {evaluation_combined_reasoning}

Feedback: {feedback}

Provide an improved version of the output that addresses every point raised in the evaluation and feedback:"#;

pub const FEEDBACK_PROMPT: ChatPrompt = ChatPrompt::new(FEEDBACK_SYSTEM, FEEDBACK_USER);

pub const REVISION_PROMPT: ChatPrompt = ChatPrompt::new(REVISION_SYSTEM, REVISION_USER);
