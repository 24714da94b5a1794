//! Type stripping: turn a typed script into plain script.
//!
//! The parser records every type-only construct as an [`Edit`] on the
//! original text. Applying those edits by byte range keeps the remaining
//! code, its formatting and its comments exactly as written.

use thiserror::Error;
use tracing::{debug, warn};

use super::ast::Edit;
use super::{parse_module, ParseError};

#[derive(Debug, Error)]
pub enum StripError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("edit {start}..{end} does not fall on character boundaries")]
    Range { start: usize, end: usize },
}

/// Remove type-only syntax from `source`.
///
/// Never fails: if the source cannot be parsed or the edits cannot be
/// applied, the source is returned unchanged.
pub fn strip_types(source: &str) -> String {
    match try_strip_types(source) {
        Ok(stripped) => stripped,
        Err(err) => {
            warn!(error = %err, "type stripping failed, keeping original source");
            source.to_string()
        }
    }
}

/// Fallible variant of [`strip_types`]
pub fn try_strip_types(source: &str) -> Result<String, StripError> {
    let module = parse_module(source)?;
    if module.type_edits.is_empty() {
        return Ok(source.to_string());
    }
    debug!(edits = module.type_edits.len(), "stripping type syntax");
    apply_edits(source, module.type_edits)
}

/// Apply edits in source order; an edit nested inside an earlier one is
/// already covered and gets dropped
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> Result<String, StripError> {
    edits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;

    for edit in edits {
        if edit.start < cursor || edit.end > source.len() || edit.start > edit.end {
            continue;
        }
        if !source.is_char_boundary(edit.start) || !source.is_char_boundary(edit.end) {
            return Err(StripError::Range {
                start: edit.start,
                end: edit.end,
            });
        }
        let (start, end) = if edit.whole_line {
            widen_to_line(source, edit.start, edit.end, cursor)
        } else {
            (edit.start, edit.end)
        };

        out.push_str(&source[cursor..start]);
        out.push_str(&edit.replacement);
        cursor = end;
    }

    out.push_str(&source[cursor..]);
    Ok(out)
}

/// Extend a removal over its indentation and line break when nothing else
/// shares the line
fn widen_to_line(source: &str, start: usize, end: usize, floor: usize) -> (usize, usize) {
    let line_start = source[..start].rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let line_end = source[end..]
        .find('\n')
        .map(|idx| end + idx + 1)
        .unwrap_or(source.len());

    let leading = &source[line_start.max(floor)..start];
    let trailing = &source[end..line_end];
    let is_blank = |text: &str| text.chars().all(|ch| ch == ' ' || ch == '\t' || ch == '\r' || ch == '\n');

    if line_start >= floor && is_blank(leading) && is_blank(trailing) {
        (line_start, line_end)
    } else {
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Stmt;
    use proptest::prelude::*;

    #[test]
    fn test_strip_annotations() {
        let source = "function workflow(): void {\n  const x: number = 1;\n  return x as any;\n}\n";
        assert_eq!(
            strip_types(source),
            "function workflow() {\n  const x = 1;\n  return x;\n}\n"
        );
    }

    #[test]
    fn test_strip_declarations_take_their_line() {
        let source = "interface Item {\n  name: string;\n}\ntype Id = string;\nfunction workflow() {\n  return 1;\n}\n";
        assert_eq!(strip_types(source), "function workflow() {\n  return 1;\n}\n");
    }

    #[test]
    fn test_strip_params_generics_and_assertions() {
        let source = "function pick<T>(items: T[], index?: number): T {\n  return items[index!];\n}\nconst v = pick<string>(['a'], 0) satisfies string;\n";
        assert_eq!(
            strip_types(source),
            "function pick(items, index) {\n  return items[index];\n}\nconst v = pick(['a'], 0);\n"
        );
    }

    #[test]
    fn test_strip_type_imports() {
        let source = "import type { Page } from 'pw';\nimport { type Locator, chromium } from 'pw';\nimport { type Only } from 'x';\n";
        assert_eq!(strip_types(source), "import { chromium } from 'pw';\n");
    }

    #[test]
    fn test_strip_type_exports() {
        let source = "export type { A } from './a';\nexport interface B { x: number }\nexport { type C, d };\n";
        assert_eq!(strip_types(source), "export { d };\n");
    }

    #[test]
    fn test_strip_keeps_comments_and_formatting() {
        let source = "// entry\nfunction workflow() {\n    // keep me\n    let  spaced   = 1 /* inline */;\n}\n";
        assert_eq!(strip_types(source), source);
    }

    #[test]
    fn test_strip_definite_and_arrow_types() {
        let source = "let x!: string;\nconst f = async (a: number): Promise<void> => { await a; };\n";
        assert_eq!(
            strip_types(source),
            "let x;\nconst f = async (a) => { await a; };\n"
        );
    }

    #[test]
    fn test_strip_keeps_line_breaks_without_semicolons() {
        assert_eq!(strip_types("let v: number\nlet w = 2\n"), "let v\nlet w = 2\n");
        assert_eq!(
            strip_types("const y = a as any\nconst z = 1\n"),
            "const y = a\nconst z = 1\n"
        );
        assert_eq!(
            strip_types("const t = x satisfies T\nfoo()\n"),
            "const t = x\nfoo()\n"
        );
        assert_eq!(
            strip_types("function f(): void\n{\n  return\n}\n"),
            "function f()\n{\n  return\n}\n"
        );
    }

    #[test]
    fn test_strip_keeps_trailing_comments() {
        assert_eq!(
            strip_types("let v: number // count\nlet w = v as any /* cast */\nw++\n"),
            "let v // count\nlet w = v /* cast */\nw++\n"
        );
        assert_eq!(
            strip_types("type A = 'a//b' // note\nconst s = 'x'\n"),
            " // note\nconst s = 'x'\n"
        );
    }

    #[test]
    fn test_trim_trivia() {
        assert_eq!(crate::parser::trim_trivia(": number \n  "), ": number");
        assert_eq!(crate::parser::trim_trivia(": T /* a */ // b\n"), ": T");
        assert_eq!(crate::parser::trim_trivia(": 'http://x'"), ": 'http://x'");
    }

    #[test]
    fn test_strip_invalid_source_is_unchanged() {
        let source = "function workflow( {";
        assert_eq!(strip_types(source), source);
        assert!(try_strip_types(source).is_err());
    }

    #[test]
    fn test_apply_edits_skips_nested() {
        let edits = vec![Edit::remove(2, 4), Edit::remove(0, 6)];
        assert_eq!(apply_edits("abcdefgh", edits).unwrap(), "gh");
    }

    #[test]
    fn test_strip_is_idempotent_on_sample() {
        let source = "enum Mode { A, B }\nfunction workflow(): Promise<string> {\n  const m = (document.title as string)!;\n  return m;\n}\n";
        let once = strip_types(source);
        assert_eq!(strip_types(&once), once);
    }

    fn fragment() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "const a: number = 1;\n",
            "let b = a as unknown as string;\n",
            "type T = { x: number };\n",
            "interface I { y?: string }\n",
            "function f<U>(u: U): U { return u!; }\n",
            "page.goto('https://example.com');\n",
            "if (a > 1) { b = 'x'; }\n",
            "const g = (p: string) => p.length;\n",
            "for (const item of items) { console.log(item); }\n",
            "import type { Z } from 'z';\n",
            "const broken = (;\n",
            "// comment\n",
            "let c: string\n",
            "const d = c as any\n",
            "const e = d satisfies string\n",
            "foo()\n",
            "let n = c!\n",
        ])
    }

    /// Top-level items that survive stripping
    fn runtime_items(source: &str) -> Option<usize> {
        parse_module(source).ok().map(|module| {
            module
                .items
                .iter()
                .filter(|item| !matches!(item, Stmt::TypeOnly { .. } | Stmt::Import { .. }))
                .count()
        })
    }

    proptest! {
        #[test]
        fn prop_strip_is_idempotent(parts in prop::collection::vec(fragment(), 0..8)) {
            let source: String = parts.concat();
            let once = strip_types(&source);
            prop_assert_eq!(strip_types(&once), once);
        }

        #[test]
        fn prop_stripped_source_parses_to_same_statements(parts in prop::collection::vec(fragment(), 0..8)) {
            let source: String = parts.concat();
            if let Some(count) = runtime_items(&source) {
                let stripped = strip_types(&source);
                prop_assert_eq!(runtime_items(&stripped), Some(count), "stripped: {:?}", stripped);
            }
        }

        #[test]
        fn prop_strip_never_panics(source in "\\PC{0,64}") {
            let _ = strip_types(&source);
        }
    }
}
