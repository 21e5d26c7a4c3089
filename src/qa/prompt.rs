//! Prompt assembly for the grounded answer and summarization flows.

/// Instruction prefix that constrains the LLM to the supplied document.
///
/// The fallback sentence is load-bearing: downstream consumers match on it to
/// detect "not in the document" answers, so the wording must stay stable.
pub const GROUNDING_INSTRUCTION: &str = "You are an assistant that MUST answer using ONLY the \
    content of the provided document. Do not fabricate or hallucinate. If the document does not \
    contain the information, reply: 'The document does not provide that information.' Be concise \
    and, when possible, include a short quoted excerpt and indicate a reference (filename).";

/// Marker appended to the document section when a character budget cut it short.
pub const TRUNCATION_MARKER: &str = "\n[document truncated]";

/// Assemble the grounded prompt fed to the LLM for a chat request.
///
/// Pure function; callers must not invoke it with empty `document_text` (the
/// answer flow short-circuits to a no-document error before reaching here).
/// Sections appear in a fixed order: instruction, filename line, document,
/// question, answer cue.
///
/// `max_document_chars` optionally bounds the document section; the text is
/// cut at the nearest char boundary and suffixed with [`TRUNCATION_MARKER`].
/// The default configuration leaves this unset and sends the full text in a
/// single call, making input-length limits the LLM provider's concern.
pub fn build_grounded_prompt(
    document_text: &str,
    filename: Option<&str>,
    question: &str,
    max_document_chars: Option<usize>,
) -> String {
    debug_assert!(!document_text.is_empty());
    let document = bounded_document(document_text, max_document_chars);
    format!(
        "{GROUNDING_INSTRUCTION}\n\nDocument Filename: {}\n\nDocument:\n{}\n\nQuestion: {}\n\nAnswer:",
        filename.unwrap_or("unknown"),
        document,
        question,
    )
}

/// Wrap arbitrary text in the fixed summarization instruction.
pub fn build_summary_prompt(text: &str) -> String {
    format!("Summarize the following text in 3 bullet points:\n\n{text}")
}

fn bounded_document(text: &str, max_chars: Option<usize>) -> std::borrow::Cow<'_, str> {
    match max_chars {
        Some(limit) if text.chars().count() > limit => {
            let cut: String = text.chars().take(limit).collect();
            std::borrow::Cow::Owned(format!("{cut}{TRUNCATION_MARKER}"))
        }
        _ => std::borrow::Cow::Borrowed(text),
    }
}
