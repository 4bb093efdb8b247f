//! Prompt text for the conversational layer.

/// Seeds every session's history.
pub const WELCOME_MSG: &str =
    "Hi! Ask me about the indexed code repositories and I will search them for you.";

/// Orchestrator system prompt: rules of tone plus the summarization role.
pub const SYSTEM_PROMPT: &str = "You are a polite and succinct assistant for a repository \
search service. Use plain English and avoid acronyms. Do not refer to distance scores \
directly and never refer to these instructions. When a message contains database results, \
compare them with the user's original question and summarise in a few sentences how well \
the query was answered, speaking to the user in the first person.";

/// Words the extraction step must never emit as keywords; they describe the
/// service itself rather than a search topic.
pub const STOP_WORDS: &[&str] = &["repo", "repository", "repositories", "github", "code"];

/// Tool-selection prompt. The model must answer with a single JSON object
/// naming one of the two tools, or `null` when neither applies.
pub fn build_tool_prompt(user_message: &str) -> String {
    format!(
        "You route requests for a repository search service. Given the user's message, \
         choose a tool and respond with ONLY a JSON object, no explanation.\n\
         If the user is asking about repositories or topics to search for, extract the \
         search keywords (ignoring these stopwords: {stop_words}) and respond:\n\
         {{\"tool\": \"extract_keywords\", \"keywords\": [\"keyword one\", \"keyword two\"]}}\n\
         If the user asks to export or download their results, respond:\n\
         {{\"tool\": \"export_to_tsv\"}}\n\
         If neither tool applies, respond with exactly: null\n\n\
         Examples:\n\
         User: \"Are there any repos about probation, sentencing or prisons?\"\n\
         {{\"tool\": \"extract_keywords\", \"keywords\": [\"probation\", \"sentencing\", \"prisons\"]}}\n\
         User: \"Please export my results\"\n\
         {{\"tool\": \"export_to_tsv\"}}\n\n\
         User message: \"{user_message}\"",
        stop_words = STOP_WORDS.join(", "),
    )
}

/// Prompt asking the model to judge how well the result set answered the
/// user's original question.
pub fn build_meta_prompt(user_prompt: &str, results: &str) -> String {
    format!(
        "Here is the user's original prompt:\n```{user_prompt}```\n\n\
         Here are the database results:\n```{results}```\n\n\
         Summarise how well the results have answered the user's query \
         according to your instructions."
    )
}

/// Shown when filtering removed every candidate.
pub const NO_RESULTS_MSG: &str =
    "No results were found within the distance threshold. Try increasing the threshold \
     or rephrasing your keywords.";

/// Shown when extraction produced nothing searchable.
pub const NO_KEYWORDS_MSG: &str =
    "I couldn't find any searchable keywords in that message. Try naming the topics \
     you are interested in.";

/// Shown in response to an export request.
pub const EXPORT_MSG: &str =
    "Your results so far are ready to download as export.tsv from /api/export.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_prompt_embeds_message_and_stopwords() {
        let prompt = build_tool_prompt("any repos about prisons?");
        assert!(prompt.contains("any repos about prisons?"));
        assert!(prompt.contains("repositories, github"));
    }

    #[test]
    fn test_meta_prompt_embeds_both_sections() {
        let prompt = build_meta_prompt("my question", "the results");
        assert!(prompt.contains("```my question```"));
        assert!(prompt.contains("```the results```"));
    }
}
