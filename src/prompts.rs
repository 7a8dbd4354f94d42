//! Prompt templates sent to the remote `apply_prompt` endpoint.
//!
//! Placeholders of the form `{object_name}` are substituted **server-side**
//! with the content of the referenced input object; nothing here performs
//! substitution locally. Callers can override the default through
//! [`crate::config::SummarizeConfig::prompt_template`].

/// Instruction half of the default summary prompt.
///
/// The document placeholder is appended by [`summary_prompt`].
pub const SUMMARY_INSTRUCTIONS: &str = "Analyze this document and identify the key topics/subjects discussed. Provide exactly 2 bullet points that summarize the main themes. Format as clean bullet points without any additional text or explanation:";

/// The placeholder token the remote service replaces with `object_name`'s content.
pub fn placeholder(object_name: &str) -> String {
    format!("{{{object_name}}}")
}

/// Build the default two-bullet summary prompt over `input_object`.
pub fn summary_prompt(input_object: &str) -> String {
    format!("{} {}", SUMMARY_INSTRUCTIONS, placeholder(input_object))
}
