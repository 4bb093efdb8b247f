//! Tool selection for the conversational layer.
//!
//! The model's choice comes back as JSON and is decoded into a tagged
//! enum, dispatched by a single exhaustive match in the chat handler.

use anyhow::Result;
use serde::Deserialize;

use crate::config::LlmConfig;
use crate::models::ChatMessage;
use crate::prompts::{build_tool_prompt, STOP_WORDS};

/// The tools the model may invoke on the user's behalf.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    /// Search the vector store with the extracted keywords.
    ExtractKeywords { keywords: Vec<String> },
    /// Serialize the session's export table.
    ExportToTsv,
}

/// Ask the model which tool fits the user's message. `None` means the
/// model declined both tools and the caller should answer conversationally.
pub async fn select_tool(
    client: &reqwest::Client,
    config: &LlmConfig,
    user_message: &str,
) -> Result<Option<ToolCall>> {
    let prompt = build_tool_prompt(user_message);
    let response = super::chat::complete(client, config, &[ChatMessage::user(prompt)]).await?;
    Ok(parse_tool_call(&response))
}

/// Extract a tool call from the model's reply, tolerating surrounding
/// prose and markdown fences. Unparseable replies mean "no tool".
pub fn parse_tool_call(content: &str) -> Option<ToolCall> {
    let json_str = match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => content.trim(),
    };

    match serde_json::from_str::<ToolCall>(json_str) {
        Ok(call) => Some(call),
        Err(e) => {
            if json_str != "null" {
                tracing::debug!("no tool call parsed: {e}. Raw: {content}");
            }
            None
        }
    }
}

/// Drop stop words, blanks and duplicates from extracted keywords,
/// preserving order.
pub fn clean_keywords(keywords: Vec<String>) -> Vec<String> {
    let mut seen = Vec::new();
    for keyword in keywords {
        let trimmed = keyword.trim().to_string();
        if trimmed.is_empty() {
            continue;
        }
        let lowered = trimmed.to_lowercase();
        if STOP_WORDS.contains(&lowered.as_str()) {
            continue;
        }
        if !seen.contains(&trimmed) {
            seen.push(trimmed);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extract_keywords() {
        let input = r#"{"tool": "extract_keywords", "keywords": ["probation", "prisons"]}"#;
        let call = parse_tool_call(input).unwrap();
        assert_eq!(
            call,
            ToolCall::ExtractKeywords {
                keywords: vec!["probation".to_string(), "prisons".to_string()]
            }
        );
    }

    #[test]
    fn test_parse_export() {
        let call = parse_tool_call(r#"{"tool": "export_to_tsv"}"#).unwrap();
        assert_eq!(call, ToolCall::ExportToTsv);
    }

    #[test]
    fn test_parse_json_embedded_in_text() {
        let input = "Sure, here you go:\n{\"tool\": \"export_to_tsv\"}\nAnything else?";
        assert_eq!(parse_tool_call(input), Some(ToolCall::ExportToTsv));
    }

    #[test]
    fn test_parse_json_in_markdown_code_block() {
        let input = "```json\n{\"tool\": \"extract_keywords\", \"keywords\": [\"ml\"]}\n```";
        assert!(matches!(
            parse_tool_call(input),
            Some(ToolCall::ExtractKeywords { .. })
        ));
    }

    #[test]
    fn test_parse_null_means_no_tool() {
        assert_eq!(parse_tool_call("null"), None);
    }

    #[test]
    fn test_parse_garbage_means_no_tool() {
        assert_eq!(parse_tool_call("I cannot help with that."), None);
    }

    #[test]
    fn test_parse_unknown_tool_rejected() {
        assert_eq!(parse_tool_call(r#"{"tool": "delete_everything"}"#), None);
    }

    #[test]
    fn test_clean_keywords_drops_stopwords_and_blanks() {
        let cleaned = clean_keywords(vec![
            "Probation".to_string(),
            "repo".to_string(),
            " ".to_string(),
            "GitHub".to_string(),
            "sentencing".to_string(),
        ]);
        assert_eq!(cleaned, vec!["Probation".to_string(), "sentencing".to_string()]);
    }

    #[test]
    fn test_clean_keywords_dedupes_preserving_order() {
        let cleaned = clean_keywords(vec![
            "crime".to_string(),
            "courts".to_string(),
            "crime".to_string(),
        ]);
        assert_eq!(cleaned, vec!["crime".to_string(), "courts".to_string()]);
    }
}
