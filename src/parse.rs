//! Parse Module
//!
//! Thin layer over `oxc_parser`: whole-unit parsing for extraction, snippet parsing for
//! the rewrite passes (member bodies and template expressions are stored as text in the
//! IR and re-parsed on demand), leading-comment recovery and the naming helpers shared by
//! the backends.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{Expression, Program};
use oxc_parser::Parser;
use oxc_span::{SourceType, Span};
use regex::Regex;

use crate::error::CompileError;

lazy_static! {
    static ref WORD_BREAK_RE: Regex = Regex::new(r"[-_\s]+([A-Za-z0-9])").unwrap();
    static ref CAMEL_HUMP_RE: Regex = Regex::new(r"([a-z0-9])([A-Z])").unwrap();
    static ref IDENTIFIER_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
    static ref NUMBER_RE: Regex = Regex::new(r"^-?(\d[\d_]*\.?\d*|\.\d+)([eE][-+]?\d+)?$").unwrap();
}

pub(crate) fn source_type() -> SourceType {
    SourceType::default()
        .with_module(true)
        .with_typescript(true)
        .with_jsx(true)
}

/// Parses a whole source unit, failing on the first syntax error.
pub fn parse_program<'a>(
    allocator: &'a Allocator,
    source: &'a str,
) -> Result<Program<'a>, CompileError> {
    let ret = Parser::new(allocator, source, source_type()).parse();
    if let Some(error) = ret.errors.first() {
        return Err(CompileError::parse(error.to_string()));
    }
    if ret.panicked {
        return Err(CompileError::parse("parser aborted"));
    }
    Ok(ret.program)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNIPPETS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetKind {
    /// A single expression (initializer, computed operand, template expression).
    Expression,
    /// A statement list (method or lifecycle body).
    Statements,
}

impl SnippetKind {
    fn wrap(self) -> (&'static str, &'static str) {
        match self {
            SnippetKind::Expression => ("(", "\n);"),
            SnippetKind::Statements => ("async function __snippet__() {\n", "\n}"),
        }
    }
}

/// Parses `code` inside a wrapper that makes it a complete program and hands the
/// program, the wrapped text and the span covering `code` to `f`.
///
/// Spans reported by the AST are offsets into the wrapped text; the user span is what
/// splicing must be restricted to.
pub(crate) fn with_snippet<R, F>(code: &str, kind: SnippetKind, f: F) -> Result<R, CompileError>
where
    F: for<'a> FnOnce(&Program<'a>, &str, Span) -> Result<R, CompileError>,
{
    let (prefix, suffix) = kind.wrap();
    let wrapped = format!("{prefix}{code}{suffix}");
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, &wrapped, source_type()).parse();
    if let Some(error) = ret.errors.first() {
        return Err(CompileError::parse(format!(
            "cannot parse `{}`: {}",
            code.trim(),
            error
        )));
    }
    let start = prefix.len() as u32;
    let user = Span::new(start, start + code.len() as u32);
    f(&ret.program, &wrapped, user)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE TEXT
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) fn span_text(source: &str, span: Span) -> &str {
    &source[span.start as usize..span.end as usize]
}

pub(crate) fn unwrap_parens<'e, 'a>(expr: &'e Expression<'a>) -> &'e Expression<'a> {
    match expr {
        Expression::ParenthesizedExpression(paren) => unwrap_parens(&paren.expression),
        _ => expr,
    }
}

/// Leading comments attached to any of `anchors` (the member start and its decorators).
pub(crate) fn leading_comments(program: &Program, source: &str, anchors: &[u32]) -> Vec<String> {
    program
        .comments
        .iter()
        .filter(|comment| anchors.contains(&comment.attached_to))
        .map(|comment| {
            let text = span_text(source, comment.span);
            if text.starts_with("//") || text.starts_with("/*") {
                text.to_string()
            } else if text.contains('\n') {
                format!("/*{}*/", text)
            } else {
                format!("//{}", text)
            }
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAMING
// ═══════════════════════════════════════════════════════════════════════════════

/// `card-header` / `card_header` / `card header` → `cardHeader`.
pub fn to_camel_case(name: &str) -> String {
    let joined = WORD_BREAK_RE.replace_all(name.trim(), |caps: &regex::Captures| {
        caps[1].to_uppercase()
    });
    lower_first(&joined)
}

/// `TodoItem` → `todo-item`.
pub fn to_kebab_case(name: &str) -> String {
    CAMEL_HUMP_RE
        .replace_all(name, "$1-$2")
        .replace('_', "-")
        .to_lowercase()
}

pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Component tags start with an upper-case letter.
pub fn is_component_tag(tag: &str) -> bool {
    tag.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

/// Best-effort type of a literal initializer, used when a prop has no annotation.
pub fn literal_type(code: &str) -> &'static str {
    let code = code.trim();
    if code.starts_with('"') || code.starts_with('\'') || code.starts_with('`') {
        "string"
    } else if code == "true" || code == "false" {
        "boolean"
    } else if NUMBER_RE.is_match(code) {
        "number"
    } else {
        "unknown"
    }
}

/// Removes blank edge lines and the common leading indentation.
pub fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let (Some(start), Some(end)) = (
        lines.iter().position(|l| !l.trim().is_empty()),
        lines.iter().rposition(|l| !l.trim().is_empty()),
    ) else {
        return String::new();
    };
    let body = &lines[start..=end];
    let common = body
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    body.iter()
        .map(|l| match l.get(..common) {
            Some(prefix) if prefix.trim().is_empty() => l[common..].trim_end(),
            _ => l.trim(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefixes every non-empty line of `text` with `prefix`.
pub fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                format!("{}{}", prefix, l)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalized inline styles: newlines removed, surrounding whitespace trimmed.
pub fn normalize_styles(styles: &str) -> String {
    styles
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_conversions() {
        assert_eq!(to_camel_case("card-header"), "cardHeader");
        assert_eq!(to_camel_case("Footer"), "footer");
        assert_eq!(to_camel_case("side_bar top"), "sideBarTop");
        assert_eq!(to_kebab_case("TodoItem"), "todo-item");
        assert_eq!(capitalize("count"), "Count");
        assert_eq!(lower_first("ItemAdded"), "itemAdded");
    }

    #[test]
    fn test_literal_type() {
        assert_eq!(literal_type("\"Todos\""), "string");
        assert_eq!(literal_type("42"), "number");
        assert_eq!(literal_type("-1.5e3"), "number");
        assert_eq!(literal_type("false"), "boolean");
        assert_eq!(literal_type("[]"), "unknown");
    }

    #[test]
    fn test_normalize_styles() {
        assert_eq!(
            normalize_styles("\n  .a { color: red; }\n\n  .b { margin: 0; }\n"),
            ".a { color: red; } .b { margin: 0; }"
        );
    }

    #[test]
    fn test_dedent_and_indent() {
        assert_eq!(dedent("\n    if (a) {\n      b();\n    }\n  "), "if (a) {\n  b();\n}");
        assert_eq!(dedent(" return 1; "), "return 1;");
        assert_eq!(indent("a\n\n  b", "  "), "  a\n\n    b");
    }

    #[test]
    fn test_snippet_span_covers_code() {
        let code = "this.count + 1";
        let text = with_snippet(code, SnippetKind::Expression, |_, wrapped, user| {
            Ok(span_text(wrapped, user).to_string())
        })
        .unwrap();
        assert_eq!(text, code);
    }

    #[test]
    fn test_snippet_reports_parse_error() {
        let err = with_snippet("this.count +", SnippetKind::Expression, |_, _, _| Ok(()))
            .unwrap_err();
        assert_eq!(err.kind(), "Parse");
    }

    #[test]
    fn test_parse_program_rejects_garbage() {
        let allocator = Allocator::default();
        assert!(parse_program(&allocator, "class {").is_err());
    }
}
