//! Rubric and judgment templates for the aspect evaluators.
//!
//! The user template is rendered with: `aspect`, `system_prompt`,
//! `user_input`, `current_output`, `previous_output`, `score_min`,
//! `score_max`.

use reviseloops_model::ChatPrompt;

pub const RELEVANCE_RUBRIC: &str = concat!(
    r#"You are an expert content evaluator focusing on relevance. Assess how well the output answers the user's input and follows the system prompt it was produced under.

Instructions:
1. Read the system prompt, the user input and the current output.
2. Score the relevance of the output.
3. Explain the score, naming concrete strengths and weaknesses.

"#,
    r#"Your response must follow this exact format:
Score: [an integer on the scale given in the request]
Reasoning: [your detailed explanation, quoting specific parts of the text]

Example:
Score: 85
Reasoning: The output covers the main causes the user asked about, but ignores the request for "simple terms" and gives no concrete examples."#
);

pub const COHERENCE_RUBRIC: &str = concat!(
    r#"You are an expert content evaluator focusing on coherence and clarity. Assess the logical flow, structure and readability of the output.

Instructions:
1. Read the current output.
2. Score its coherence and clarity.
3. Explain the score with reference to structure, transitions and clarity of ideas.

"#,
    r#"Your response must follow this exact format:
Score: [an integer on the scale given in the request]
Reasoning: [your detailed explanation, quoting specific parts of the text]

Example:
Score: 90
Reasoning: Each paragraph opens with a clear topic sentence and transitions are smooth. The conclusion does not tie back to the original question."#
);

pub const ACCURACY_RUBRIC: &str = concat!(
    r#"You are an expert content evaluator focusing on accuracy. Assess the factual correctness of the output and whether it honours the constraints in the system prompt.

Instructions:
1. Read the system prompt and the current output.
2. Score the accuracy of the information provided.
3. Explain the score, pointing out factual errors or misreadings of the instructions.

"#,
    r#"Your response must follow this exact format:
Score: [an integer on the scale given in the request]
Reasoning: [your detailed explanation, quoting specific parts of the text]

Example:
Score: 95
Reasoning: Evaporation, condensation and precipitation are all described correctly. Transpiration is never mentioned."#
);

pub const SIMPLICITY_RUBRIC: &str = concat!(
    r#"You are an expert content evaluator focusing on simplicity. Assess whether the output says what it needs to in plain, direct language without padding or needless jargon.

Instructions:
1. Read the user input and the current output.
2. Score the simplicity of the output.
3. Explain the score, quoting passages that are verbose, repetitive or harder to follow than necessary.

"#,
    r#"Your response must follow this exact format:
Score: [an integer on the scale given in the request]
Reasoning: [your detailed explanation, quoting specific parts of the text]

Example:
Score: 70
Reasoning: The answer is correct but the second paragraph restates the first, and "leveraging synergies" could simply be "working together"."#
);

pub const EVALUATION_USER_PROMPT: &str = r#"Evaluate the following output based on {aspect}:

System Prompt: {system_prompt}
User Input: {user_input}
Current Output: {current_output}
Previous Output (if available): {previous_output}

Give a score from {score_min} to {score_max} and explain your reasoning in detail, using the format specified in your instructions."#;

/// Placeholder bound to `previous_output` on the first evaluation
pub const NO_PREVIOUS_OUTPUT: &str = "No previous output available.";

/// Judgment prompt for one aspect
pub fn evaluation_prompt(rubric: &'static str) -> ChatPrompt {
    ChatPrompt::new(rubric, EVALUATION_USER_PROMPT)
}
