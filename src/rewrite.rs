//! Span-edit rewriting and member reference resolution.
//!
//! Rewrites never rebuild the AST: visitors record `(start, end, text)` edits against the
//! parsed snippet and the edits are spliced back into the original text. Edits produced by
//! one pass never overlap because a visitor does not descend into a node it replaced.

use oxc_ast::ast::{Argument, CallExpression, Expression, StaticMemberExpression};
use oxc_ast_visit::{walk, Visit};
use oxc_span::{GetSpan, Span};

use crate::error::CompileError;
use crate::parse::{span_text, with_snippet, SnippetKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
    pub start: u32,
    pub end: u32,
    pub text: String,
}

impl Edit {
    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Edit {
            start: span.start,
            end: span.end,
            text: text.into(),
        }
    }
}

/// Applies `edits` to the `span` slice of `source`. Edits outside the span are ignored.
pub(crate) fn splice(source: &str, span: Span, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.start.cmp(&a.start));
    let mut out = span_text(source, span).to_string();
    for edit in edits {
        if edit.start < span.start || edit.end > span.end {
            continue;
        }
        let start = (edit.start - span.start) as usize;
        let end = (edit.end - span.start) as usize;
        out.replace_range(start..end, &edit.text);
    }
    out
}

/// How a backend spells references to component members.
pub trait MemberResolver {
    /// Replacement for a read of `this.member`, or `None` to leave it as written.
    fn read(&self, member: &str) -> Option<String>;

    /// Replacement for `this.member.emit(args)`; `args` is the rendered argument list.
    fn emit(&self, _member: &str, _args: &str) -> Option<String> {
        None
    }
}

/// Resolver that leaves every reference untouched.
pub struct Unresolved;

impl MemberResolver for Unresolved {
    fn read(&self, _member: &str) -> Option<String> {
        None
    }
}

/// `this.name` → `name`.
pub(crate) fn this_property<'e>(member: &'e StaticMemberExpression) -> Option<&'e str> {
    match &member.object {
        Expression::ThisExpression(_) => Some(member.property.name.as_str()),
        _ => None,
    }
}

/// The `this` member at the base of a member chain: `this.user.tags[0]` → `user`.
pub(crate) fn root_this_member<'e>(expr: &'e Expression) -> Option<&'e str> {
    match expr {
        Expression::StaticMemberExpression(m) => {
            this_property(m).or_else(|| root_this_member(&m.object))
        }
        Expression::ComputedMemberExpression(m) => root_this_member(&m.object),
        _ => None,
    }
}

/// `this.member.emit(...)` → `(member, arguments)`.
pub(crate) fn emit_call<'e, 'a>(
    call: &'e CallExpression<'a>,
) -> Option<(&'e str, &'e [Argument<'a>])> {
    match &call.callee {
        Expression::StaticMemberExpression(callee) if callee.property.name == "emit" => {
            match &callee.object {
                Expression::StaticMemberExpression(target) => {
                    this_property(target).map(|member| (member, call.arguments.as_slice()))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Span covering an argument list, or `None` when it is empty.
pub(crate) fn arguments_span(args: &[Argument]) -> Option<Span> {
    match (args.first(), args.last()) {
        (Some(first), Some(last)) => Some(Span::new(first.span().start, last.span().end)),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEMBER REWRITER
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) struct MemberRewriter<'s, 'r> {
    source: &'s str,
    resolver: &'r dyn MemberResolver,
    pub edits: Vec<Edit>,
}

impl<'s, 'r> MemberRewriter<'s, 'r> {
    pub fn new(source: &'s str, resolver: &'r dyn MemberResolver) -> Self {
        MemberRewriter {
            source,
            resolver,
            edits: Vec::new(),
        }
    }

    fn render_arguments(&self, args: &[Argument]) -> String {
        let Some(span) = arguments_span(args) else {
            return String::new();
        };
        let mut sub = MemberRewriter::new(self.source, self.resolver);
        for arg in args {
            sub.visit_argument(arg);
        }
        splice(self.source, span, sub.edits)
    }
}

impl<'a> Visit<'a> for MemberRewriter<'_, '_> {
    fn visit_static_member_expression(&mut self, it: &StaticMemberExpression<'a>) {
        if let Some(member) = this_property(it) {
            if let Some(text) = self.resolver.read(member) {
                self.edits.push(Edit::replace(it.span, text));
                return;
            }
        }
        walk::walk_static_member_expression(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Some((member, args)) = emit_call(it) {
            let rendered = self.render_arguments(args);
            if let Some(text) = self.resolver.emit(member, &rendered) {
                self.edits.push(Edit::replace(it.span, text));
                return;
            }
        }
        walk::walk_call_expression(self, it);
    }
}

/// Resolves every `this.member` read and `this.onX.emit(...)` call in `code`.
pub fn rewrite_members(
    code: &str,
    kind: SnippetKind,
    resolver: &dyn MemberResolver,
) -> Result<String, CompileError> {
    with_snippet(code, kind, |program, wrapped, user| {
        let mut rewriter = MemberRewriter::new(wrapped, resolver);
        rewriter.visit_program(program);
        Ok(splice(wrapped, user, rewriter.edits))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    impl MemberResolver for Bare {
        fn read(&self, member: &str) -> Option<String> {
            match member {
                "input" => Some("input.current".to_string()),
                "skip" => None,
                other => Some(other.to_string()),
            }
        }

        fn emit(&self, member: &str, args: &str) -> Option<String> {
            Some(format!("{}?.({})", member, args))
        }
    }

    #[test]
    fn test_rewrites_reads() {
        let out = rewrite_members("this.count + this.step * 2", SnippetKind::Expression, &Bare)
            .unwrap();
        assert_eq!(out, "count + step * 2");
    }

    #[test]
    fn test_keeps_unresolved_members() {
        let out = rewrite_members("this.skip.value + this.input.focus()", SnippetKind::Expression, &Bare)
            .unwrap();
        assert_eq!(out, "this.skip.value + input.current.focus()");
    }

    #[test]
    fn test_rewrites_emit_with_nested_reads() {
        let out = rewrite_members(
            "this.onAdd.emit(this.draft.trim());\nreturn this.count;",
            SnippetKind::Statements,
            &Bare,
        )
        .unwrap();
        assert_eq!(out, "onAdd?.(draft.trim());\nreturn count;");
    }

    #[test]
    fn test_splice_ignores_out_of_span_edits() {
        let src = "(abc)";
        let out = splice(
            src,
            Span::new(1, 4),
            vec![Edit::replace(Span::new(0, 1), "["), Edit::replace(Span::new(2, 3), "B")],
        );
        assert_eq!(out, "aBc");
    }
}
