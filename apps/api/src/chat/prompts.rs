// Chat prompt template.

pub const KNOWLEDGE_BASE_PREAMBLE: &str = "Based on the nursing resume knowledge base:";

/// Embeds the current document text and the user's query in a single prompt.
/// An empty document still yields the preamble and the query.
pub fn build_prompt(query: &str, document_text: &str) -> String {
    format!("{KNOWLEDGE_BASE_PREAMBLE}\n\n{document_text}\n\nUser: {query}\nAI:")
}
