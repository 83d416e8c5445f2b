// Session loop: per-session conversation history and current document text.
// All chat calls go through llm_client; extraction goes through documents.

pub mod handlers;
pub mod prompts;
pub mod query;
pub mod session;
