// All LLM prompt constants for the interview module. Each template embeds
// its own instructions; the completion backend takes a single prompt string.

/// Question-generation prompt. Replace `{job_description}` before sending.
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"You are an expert interviewer.
Given the following job description, extract the fields: role, seniority, skills, job_type, location, and then produce ONE concise, relevant interview question tailored to the role.
Return a JSON object with keys: "role", "seniority", "skills", "job_type", "location", "question" and nothing else.

Job Description:
{job_description}

Respond with JSON only."#;

/// Answer-evaluation prompt. Replace `{question}` and `{answer}`.
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"You are an expert interviewer and evaluator.
Question: {question}
Candidate Answer: {answer}

Return ONLY valid JSON with the exact keys: rating (0-10 integer), strengths (list of short strings), weaknesses (list of short strings), suggestions (list of short strings). Do not include any other text."#;

/// One-shot retry after an unparseable evaluation: ask for the same object
/// wrapped in explicit markers. Replace `{question}` and `{answer}`.
pub const EVALUATION_RETRY_TEMPLATE: &str = r#"Please provide the same JSON output, and wrap it between <JSON> and </JSON> tags with no other text.
Question: {question}
Candidate Answer: {answer}

Return only: <JSON>{...}</JSON>"#;

/// Yes/no probe used when the keyword heuristic cannot tell whether input
/// is a job description. Replace `{text}`.
pub const RELEVANCE_PROMPT_TEMPLATE: &str = r#"Is the following text a job description for a role (answer yes or no)?

{text}

Answer only 'yes' or 'no'."#;
