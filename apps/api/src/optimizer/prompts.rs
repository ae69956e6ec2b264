/// The resume optimisation prompt is sent as the user message with an empty
/// system prompt; the model is instructed through the user text alone.
pub const OPTIMIZE_SYSTEM: &str = "";

/// Builds the resume optimisation prompt.
///
/// Upstream models condition on this exact wording, so edits change outputs.
pub fn build_optimize_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        r#"
You are an expert in resume screening and improvement.

Given the following job description:
----
{job_description}
----

And the following resume:
----
{resume_text}
----

Provide a bullet-point list of suggestions to improve the resume specifically for this role.
Be specific. Include missing skills, formatting, or content improvements.

Then rewrite the resume tailored to the job.

Output valid JSON like:
{{
  "suggestions": ["...", "..."],
  "optimized_resume": "..."
}}
"#
    )
}
