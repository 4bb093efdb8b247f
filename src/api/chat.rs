use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::llm::chat::complete;
use crate::llm::tools::{clean_keywords, select_tool, ToolCall};
use crate::models::{ChatMessage, ChatRequest, ChatResponse};
use crate::prompts::{build_meta_prompt, EXPORT_MSG, NO_KEYWORDS_MSG, NO_RESULTS_MSG};
use crate::retrieval::pipeline;
use crate::sanitize::{sanitize_prompt, truncate_to_char_boundary};
use crate::state::AppState;

const MAX_CHAT_MESSAGE_LEN: usize = 2000;
const MAX_HISTORY_TURNS: usize = 10;

/// POST /api/chat — one conversational turn.
///
/// The model picks a tool for the message: keyword extraction runs the
/// retrieval pipeline and summarizes the result set against the user's
/// question; an export request points at the TSV endpoint; no tool at all
/// falls through to a plain completion over the session history.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let message = req.message.trim().to_string();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message is required".to_string()));
    }
    let message = sanitize_prompt(&truncate_to_char_boundary(&message, MAX_CHAT_MESSAGE_LEN));

    let _permit = state
        .chat_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Chat service at capacity".to_string(),
            )
        })?;

    let (session_id, session) = state.get_or_create_session(req.session_id);
    let mut session = session.lock().await;

    let result_budget = req
        .result_budget
        .unwrap_or(state.config.default_result_budget);
    let distance_threshold = req
        .distance_threshold
        .unwrap_or(state.config.default_distance_threshold);

    let llm = state.config.llm.clone();
    let tool = select_tool(&state.http_client, &llm, &message)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("LLM error: {e}")))?;

    let mut results_empty = false;
    let mut removed_count = 0;
    let mut matched_keywords = Vec::new();

    let reply = match tool {
        Some(ToolCall::ExtractKeywords { keywords }) => {
            let keywords = clean_keywords(keywords);
            if keywords.is_empty() {
                NO_KEYWORDS_MSG.to_string()
            } else {
                let outcome = pipeline::execute(
                    &state.http_client,
                    &llm,
                    &state.vectors,
                    &mut session.export_table,
                    &keywords,
                    result_budget,
                    distance_threshold,
                    &message,
                )
                .await
                .map_err(|e| {
                    let status = if e.is_caller_error() {
                        StatusCode::BAD_REQUEST
                    } else {
                        StatusCode::BAD_GATEWAY
                    };
                    (status, e.to_string())
                })?;

                results_empty = outcome.is_empty;
                removed_count = outcome.removed_count;
                matched_keywords = outcome.matched_keywords.clone();

                if outcome.is_empty {
                    NO_RESULTS_MSG.to_string()
                } else {
                    summarize_outcome(&state, &llm, &session.history, &message, &outcome.display_text)
                        .await
                }
            }
        }
        Some(ToolCall::ExportToTsv) => EXPORT_MSG.to_string(),
        None => {
            let mut messages = session.history.clone();
            messages.push(ChatMessage::user(message.clone()));
            complete(&state.http_client, &llm, &messages)
                .await
                .map_err(|e| (StatusCode::BAD_GATEWAY, format!("LLM error: {e}")))?
        }
    };

    session.history.push(ChatMessage::user(message));
    session.history.push(ChatMessage::assistant(reply.clone()));
    cap_history(&mut session.history);

    Ok(Json(ChatResponse {
        session_id,
        reply,
        results_empty,
        removed_count,
        matched_keywords,
    }))
}

/// Ask the model how well the result set answers the question, then stitch
/// the verdict above the raw result blocks. A summarization outage is not
/// fatal: the results still render, under a plain heading.
async fn summarize_outcome(
    state: &AppState,
    llm: &crate::config::LlmConfig,
    history: &[ChatMessage],
    user_message: &str,
    display_text: &str,
) -> String {
    let meta_prompt = build_meta_prompt(user_message, display_text);
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = history.first().filter(|m| m.role == "system") {
        messages.push(system.clone());
    }
    messages.push(ChatMessage::user(meta_prompt));

    match complete(&state.http_client, llm, &messages).await {
        Ok(summary) => {
            format!("**Outcome:** {summary}\n***\n**Results:**\n{display_text}")
        }
        Err(e) => {
            tracing::warn!("result summarization failed: {e}");
            format!("**Results:**\n{display_text}")
        }
    }
}

/// Keep the seeded system and welcome messages plus the most recent turns.
fn cap_history(history: &mut Vec<ChatMessage>) {
    let seeded = 2.min(history.len());
    let excess = history.len().saturating_sub(seeded + MAX_HISTORY_TURNS);
    if excess > 0 {
        history.drain(seeded..seeded + excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_history_keeps_seed_and_recent_turns() {
        let mut history = vec![
            ChatMessage::system("sys"),
            ChatMessage::assistant("welcome"),
        ];
        for i in 0..15 {
            history.push(ChatMessage::user(format!("msg {i}")));
        }
        cap_history(&mut history);
        assert_eq!(history.len(), 2 + MAX_HISTORY_TURNS);
        assert_eq!(history[0].role, "system");
        assert_eq!(history[1].content, "welcome");
        assert_eq!(history[2].content, "msg 5");
        assert_eq!(history.last().unwrap().content, "msg 14");
    }

    #[test]
    fn test_cap_history_noop_when_short() {
        let mut history = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        cap_history(&mut history);
        assert_eq!(history.len(), 2);
    }
}
