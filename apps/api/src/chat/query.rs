//! The "submit query" action.

use secrecy::SecretString;
use tracing::{info, warn};

use crate::chat::prompts::build_prompt;
use crate::chat::session::{Role, Session};
use crate::errors::AppError;
use crate::llm_client::{answer_text, LlmClient};

/// Records the query, asks the model about the session's current document and
/// records the answer.
///
/// The user turn is appended before the call and stays in the history even
/// when the call fails or the response carries no answer.
pub async fn answer_query(
    session: &mut Session,
    query: &str,
    llm: &LlmClient,
    api_key: &SecretString,
    model: &str,
) -> Result<String, AppError> {
    session.push_turn(Role::User, query);

    let prompt = build_prompt(query, session.document_text());
    let response = llm.chat_completion(api_key, model, &prompt).await?;

    let Some(answer) = answer_text(&response) else {
        warn!(
            "Session {}: chat response carried no choices: {}",
            session.id, response
        );
        return Err(AppError::NoResponse);
    };

    let answer = answer.to_string();
    session.push_turn(Role::Ai, answer.clone());
    info!(
        "Session {}: answered query ({} chars)",
        session.id,
        answer.len()
    );
    Ok(answer)
}
