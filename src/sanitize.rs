//! Prompt input hygiene.
//!
//! User text is passed verbatim into LLM prompts, so a few hostile
//! encodings are stripped first: invisible Unicode tag characters (which
//! can hide instructions the user never sees), ChatML control tokens, and
//! raw angle brackets.

const TAG_BLOCK_START: u32 = 0xE0000;
const TAG_BLOCK_END: u32 = 0xE007F;

/// Remove invisible Unicode tag characters (U+E0000..=U+E007F). Any hidden
/// payload is decoded to ASCII and logged before removal.
pub fn strip_invisible_tags(s: &str) -> String {
    let hidden: String = s
        .chars()
        .filter(|c| (TAG_BLOCK_START..=TAG_BLOCK_END).contains(&(*c as u32)))
        .filter_map(|c| char::from_u32(c as u32 - TAG_BLOCK_START + 0x20))
        .collect();
    if !hidden.is_empty() {
        tracing::warn!("hidden unicode message removed from input: {hidden}");
    }
    s.chars()
        .filter(|c| !(TAG_BLOCK_START..=TAG_BLOCK_END).contains(&(*c as u32)))
        .collect()
}

/// Strip ChatML control tokens so user text cannot impersonate a role.
pub fn strip_chatml_tokens(s: &str) -> String {
    s.replace("<|im_start|>", "").replace("<|im_end|>", "")
}

/// Escape angle brackets so user text cannot smuggle markup.
pub fn escape_tags(s: &str) -> String {
    s.replace('<', r"/<").replace('>', r"/>")
}

/// Full sanitization pass applied to every piece of user-supplied text
/// before it reaches a prompt.
pub fn sanitize_prompt(s: &str) -> String {
    escape_tags(&strip_chatml_tokens(&strip_invisible_tags(s)))
}

/// Truncate on a char boundary at or before `max_len` bytes.
pub fn truncate_to_char_boundary(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    s.char_indices()
        .take_while(|(i, _)| *i < max_len)
        .map(|(_, c)| c)
        .collect()
}
