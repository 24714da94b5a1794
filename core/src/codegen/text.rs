//! Small text helpers shared by the views.

/// Default width of one-line summaries
pub const DEFAULT_ONE_LINE_MAX: usize = 80;

/// Collapse whitespace runs to one space, trim, and cut to `max` chars
/// with a trailing `…` when longer
pub fn one_line(code: &str, max: usize) -> String {
    let normalized = code.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_with_ellipsis(&normalized, max)
}

pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}

/// Split into lines, keeping at most `max_lines` and marking the cut with
/// a final `...` line
pub fn split_lines(code: &str, max_lines: Option<usize>) -> Vec<String> {
    let lines: Vec<String> = code.split('\n').map(str::to_string).collect();
    match max_lines {
        Some(max) if max > 0 && lines.len() > max => {
            let mut kept: Vec<String> = lines.into_iter().take(max).collect();
            kept.push("...".to_string());
            kept
        }
        _ => lines,
    }
}

/// Escape text for embedding in HTML
pub fn escape_code(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    for ch in code.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

/// Join the non-empty entries
pub fn join_texts<I, S>(texts: I, separator: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    texts
        .into_iter()
        .filter(|text| !text.as_ref().is_empty())
        .map(|text| text.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(separator)
}
