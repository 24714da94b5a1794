//! Idiom keyword sets.
//!
//! Matching is plain substring containment on compact rendered code, so
//! `page.goto(...)` and a variable named `gotoNext` both count as
//! navigation.

use super::ActionType;

pub const NAVIGATION: &[&str] = &["goto", "navigate", "open", "visit", "newPage", "createPage"];

pub const INTERACTION: &[&str] = &[
    "click", "type", "fill", "select", "submit", "press", "hover", "focus",
];

pub const DATA_EXTRACTION: &[&str] = &[
    "textContent",
    "innerHTML",
    "getAttribute",
    "evaluate",
    "$$eval",
    "$eval",
    "title",
];

/// Checked in this order; the first set with a hit wins
const PRIORITY: [(ActionType, &[&str]); 3] = [
    (ActionType::Navigation, NAVIGATION),
    (ActionType::Interaction, INTERACTION),
    (ActionType::DataExtraction, DATA_EXTRACTION),
];

pub fn classify(code: &str) -> Option<ActionType> {
    PRIORITY
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| code.contains(keyword)))
        .map(|(action_type, _)| *action_type)
}

/// Contents of the first non-empty `'…'` or `"…"` literal
pub fn first_string_literal(code: &str) -> Option<&str> {
    let is_quote = |c: char| c == '"' || c == '\'';
    for (idx, ch) in code.char_indices() {
        if !is_quote(ch) {
            continue;
        }
        let rest = &code[idx + ch.len_utf8()..];
        match rest.find(is_quote) {
            Some(end) if end > 0 => return Some(&rest[..end]),
            Some(_) => continue,
            None => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_priority() {
        assert_eq!(
            classify("const p = newPage(); p.click();"),
            Some(ActionType::Navigation)
        );
        assert_eq!(
            classify("await input.fill('#q', text);"),
            Some(ActionType::Interaction)
        );
        assert_eq!(
            classify("const t = await el.textContent();"),
            Some(ActionType::DataExtraction)
        );
        assert_eq!(classify("total += 1;"), None);
    }

    #[test]
    fn classify_is_case_sensitive() {
        assert_eq!(classify("const p = NEWPAGE();"), None);
        assert_eq!(classify("const p = newpage();"), None);
    }

    #[test]
    fn first_string_literal_skips_empty_quotes() {
        assert_eq!(
            first_string_literal(r#"page.goto("https://example.com");"#),
            Some("https://example.com")
        );
        assert_eq!(first_string_literal("f('', 'b')"), Some(", "));
        assert_eq!(first_string_literal("f(`tpl`)"), None);
        assert_eq!(first_string_literal("f('open"), None);
    }
}
