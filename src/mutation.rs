//! Mutation Rewrite Engine
//!
//! Turns in-place writes to component members into the update form a target's reactivity
//! model needs. Recognized shapes, where `m` is a member the backend can update:
//!
//! | source                         | setter style                                   |
//! |--------------------------------|------------------------------------------------|
//! | `this.m = v`                   | `setM(v)`                                      |
//! | `this.m += v`, `this.m++`      | `setM(m => m + v)`, `setM(m => m + 1)`         |
//! | `this.m.p = v`                 | `setM(m => ({ ...m, p: v }))`                  |
//! | `this.m.list.push(x)`          | `setM(m => { m.list.push(x); return m; })`     |
//! | `this.m[i] = v`                | `setM(m => { m[i] = v; return m; })`           |
//!
//! The invalidate style keeps the write in place and appends an invalidation expression
//! to the shapes a compile-time or property-setter reactivity model cannot observe
//! (nested property writes and in-place calls).

use std::collections::BTreeSet;

use oxc_ast::ast::{
    AssignmentExpression, AssignmentTarget, CallExpression, Expression, IdentifierReference,
    SimpleAssignmentTarget, StaticMemberExpression, UpdateExpression,
};
use oxc_ast_visit::{walk, Visit};
use oxc_span::{GetSpan, Span};
use oxc_syntax::operator::{AssignmentOperator, UpdateOperator};

use crate::error::{CompileError, ERR_MUTATION};
use crate::parse::{capitalize, with_snippet, SnippetKind};
use crate::rewrite::{
    arguments_span, emit_call, rewrite_members, root_this_member, splice, this_property, Edit,
    MemberResolver,
};

/// Array methods that mutate their receiver.
pub const MUTATING_METHODS: &[&str] = &[
    "push",
    "pop",
    "shift",
    "unshift",
    "splice",
    "sort",
    "reverse",
    "fill",
    "copyWithin",
];

pub enum UpdateStyle<'r> {
    /// Functional setter calls. Returns the setter name for members that have one.
    Setter(&'r dyn Fn(&str) -> Option<String>),
    /// In-place writes followed by an invalidation expression (in `this.member` form).
    Invalidate(&'r dyn Fn(&str) -> Option<String>),
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHAPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Assign,
    Binary(&'static str),
    /// `&&=`, `||=`, `??=`
    Logical,
}

pub(crate) enum Shape<'e, 'a> {
    /// `this.m = v` / `this.m op= v` / `this.m++`
    Member {
        member: &'e str,
        op: Op,
        value: Option<&'e Expression<'a>>,
    },
    /// `this.m.p = v` / `this.m.p op= v` / `this.m.p++`
    Nested {
        member: &'e str,
        property: &'e str,
        op: Op,
        value: Option<&'e Expression<'a>>,
    },
    /// A write more than one property below the member.
    Deep { member: &'e str },
    /// Mutating call or computed-index write somewhere below the member.
    InPlace { member: &'e str },
}

impl Shape<'_, '_> {
    pub fn member(&self) -> &str {
        match self {
            Shape::Member { member, .. }
            | Shape::Nested { member, .. }
            | Shape::Deep { member }
            | Shape::InPlace { member } => *member,
        }
    }
}

fn assignment_op(op: AssignmentOperator) -> Op {
    match op {
        AssignmentOperator::Assign => Op::Assign,
        AssignmentOperator::Addition => Op::Binary("+"),
        AssignmentOperator::Subtraction => Op::Binary("-"),
        AssignmentOperator::Multiplication => Op::Binary("*"),
        AssignmentOperator::Division => Op::Binary("/"),
        AssignmentOperator::Remainder => Op::Binary("%"),
        AssignmentOperator::Exponential => Op::Binary("**"),
        AssignmentOperator::ShiftLeft => Op::Binary("<<"),
        AssignmentOperator::ShiftRight => Op::Binary(">>"),
        AssignmentOperator::ShiftRightZeroFill => Op::Binary(">>>"),
        AssignmentOperator::BitwiseOR => Op::Binary("|"),
        AssignmentOperator::BitwiseXOR => Op::Binary("^"),
        AssignmentOperator::BitwiseAnd => Op::Binary("&"),
        _ => Op::Logical,
    }
}

fn update_op(op: UpdateOperator) -> Op {
    match op {
        UpdateOperator::Increment => Op::Binary("+"),
        UpdateOperator::Decrement => Op::Binary("-"),
    }
}

fn static_member_shape<'e, 'a>(
    target: &'e StaticMemberExpression<'a>,
    op: Op,
    value: Option<&'e Expression<'a>>,
) -> Option<Shape<'e, 'a>> {
    if let Some(member) = this_property(target) {
        return Some(Shape::Member { member, op, value });
    }
    if let Expression::StaticMemberExpression(parent) = &target.object {
        if let Some(member) = this_property(parent) {
            return Some(Shape::Nested {
                member,
                property: target.property.name.as_str(),
                op,
                value,
            });
        }
    }
    root_this_member(&target.object).map(|member| Shape::Deep { member })
}

pub(crate) fn assignment_shape<'e, 'a>(it: &'e AssignmentExpression<'a>) -> Option<Shape<'e, 'a>> {
    let op = assignment_op(it.operator);
    match &it.left {
        AssignmentTarget::StaticMemberExpression(target) => {
            static_member_shape(target, op, Some(&it.right))
        }
        AssignmentTarget::ComputedMemberExpression(target) => {
            root_this_member(&target.object).map(|member| Shape::InPlace { member })
        }
        _ => None,
    }
}

pub(crate) fn update_shape<'e, 'a>(it: &'e UpdateExpression<'a>) -> Option<Shape<'e, 'a>> {
    let op = update_op(it.operator);
    match &it.argument {
        SimpleAssignmentTarget::StaticMemberExpression(target) => {
            static_member_shape(target, op, None)
        }
        SimpleAssignmentTarget::ComputedMemberExpression(target) => {
            root_this_member(&target.object).map(|member| Shape::InPlace { member })
        }
        _ => None,
    }
}

pub(crate) fn call_shape<'e, 'a>(it: &'e CallExpression<'a>) -> Option<Shape<'e, 'a>> {
    match &it.callee {
        Expression::StaticMemberExpression(callee)
            if MUTATING_METHODS.contains(&callee.property.name.as_str()) =>
        {
            root_this_member(&callee.object).map(|member| Shape::InPlace { member })
        }
        _ => None,
    }
}

/// Plain identifiers read anywhere inside a node.
#[derive(Default)]
struct IdentifierCollector {
    names: BTreeSet<String>,
}

impl<'a> Visit<'a> for IdentifierCollector {
    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        self.names.insert(it.name.to_string());
    }
}

fn referenced_identifiers(visit: impl FnOnce(&mut IdentifierCollector)) -> BTreeSet<String> {
    let mut collector = IdentifierCollector::default();
    visit(&mut collector);
    collector.names
}

fn mentions(text: &str, name: &str) -> bool {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    text.match_indices(name).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + name.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

/// Parameter of a functional updater. Named after the member unless the update reads an
/// outer binding of that name, which the parameter would shadow.
fn updater_param(member: &str, referenced: &BTreeSet<String>, rendered: &str) -> String {
    if !referenced.contains(member) {
        return member.to_string();
    }
    let mut candidate = format!("prev{}", capitalize(member));
    while referenced.contains(&candidate) || mentions(rendered, &candidate) {
        candidate.push('_');
    }
    candidate
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLECTOR
// ═══════════════════════════════════════════════════════════════════════════════

struct MutationCollector<'s, 'r> {
    source: &'s str,
    style: &'r UpdateStyle<'r>,
    resolver: &'r dyn MemberResolver,
    /// Inside a rewritten fragment: member reads are resolved as well.
    resolve_reads: bool,
    edits: Vec<Edit>,
    error: Option<CompileError>,
}

impl<'s, 'r> MutationCollector<'s, 'r> {
    fn new(
        source: &'s str,
        style: &'r UpdateStyle<'r>,
        resolver: &'r dyn MemberResolver,
        resolve_reads: bool,
    ) -> Self {
        MutationCollector {
            source,
            style,
            resolver,
            resolve_reads,
            edits: Vec::new(),
            error: None,
        }
    }

    fn fail(&mut self, err: CompileError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Text of `span` with the nested rewrites of `visit` applied.
    fn render(&mut self, span: Span, visit: impl FnOnce(&mut MutationCollector<'s, 'r>)) -> String {
        let resolve = matches!(self.style, UpdateStyle::Setter(_));
        let mut sub = MutationCollector::new(self.source, self.style, self.resolver, resolve);
        visit(&mut sub);
        if let Some(err) = sub.error.take() {
            self.fail(err);
        }
        splice(self.source, span, sub.edits)
    }

    fn render_value<'a>(&mut self, value: Option<&Expression<'a>>) -> String {
        match value {
            Some(expr) => self.render(expr.span(), |sub| sub.visit_expression(expr)),
            None => "1".to_string(),
        }
    }

    /// Builds the replacement for a recognized shape, or `None` to leave the node alone.
    fn rewrite<'a>(
        &mut self,
        shape: &Shape<'_, 'a>,
        whole: Span,
        referenced: &BTreeSet<String>,
        visit_whole: impl FnOnce(&mut MutationCollector<'s, 'r>),
    ) -> Option<String> {
        let style = self.style;
        match style {
            UpdateStyle::Setter(setter) => {
                let setter = setter(shape.member())?;
                let text = match shape {
                    Shape::Member { op: Op::Assign, value, .. } => {
                        format!("{}({})", setter, self.render_value(*value))
                    }
                    Shape::Member { member, op: Op::Binary(bin), value } => {
                        let value = self.render_value(*value);
                        let prev = updater_param(member, referenced, &value);
                        format!("{setter}({prev} => {prev} {bin} {value})")
                    }
                    Shape::Nested { member, property, op, value } => {
                        let value = self.render_value(*value);
                        let prev = updater_param(member, referenced, &value);
                        let updated = match op {
                            Op::Assign => value,
                            Op::Binary(bin) => format!("{prev}.{property} {bin} {value}"),
                            Op::Logical => return self.logical(member),
                        };
                        format!("{setter}({prev} => ({{ ...{prev}, {property}: {updated} }}))")
                    }
                    Shape::Member { member, op: Op::Logical, .. } => return self.logical(member),
                    Shape::Deep { member } => {
                        self.fail(CompileError::unsupported(
                            ERR_MUTATION,
                            format!(
                                "assignment more than one property below `this.{}`; \
                                 replace the whole value or mutate one level down",
                                member
                            ),
                        ));
                        return None;
                    }
                    Shape::InPlace { member } if referenced.contains(*member) => {
                        self.fail(CompileError::unsupported(
                            ERR_MUTATION,
                            format!(
                                "in-place update of `this.{0}` also reads a local named `{0}`; \
                                 rename the local",
                                member
                            ),
                        ));
                        return None;
                    }
                    Shape::InPlace { member } => {
                        let original = self.render(whole, visit_whole);
                        format!("{setter}({member} => {{ {original}; return {member}; }})")
                    }
                };
                Some(text)
            }
            UpdateStyle::Invalidate(invalidate) => match shape {
                Shape::Member { .. } => None,
                Shape::Nested { member, .. }
                | Shape::Deep { member }
                | Shape::InPlace { member } => {
                    let invalidation = invalidate(member)?;
                    let original = self.render(whole, visit_whole);
                    Some(format!("({}, {})", original, invalidation))
                }
            },
        }
    }

    fn logical(&mut self, member: &str) -> Option<String> {
        self.fail(CompileError::unsupported(
            ERR_MUTATION,
            format!(
                "logical assignment to `this.{}` has no functional-update form; \
                 use an explicit condition",
                member
            ),
        ));
        None
    }
}

impl<'a> Visit<'a> for MutationCollector<'_, '_> {
    fn visit_assignment_expression(&mut self, it: &AssignmentExpression<'a>) {
        if self.error.is_some() {
            return;
        }
        if let Some(shape) = assignment_shape(it) {
            let whole = it.span;
            let referenced = referenced_identifiers(|c| walk::walk_assignment_expression(c, it));
            if let Some(text) = self.rewrite(&shape, whole, &referenced, |sub| walk::walk_assignment_expression(sub, it)) {
                self.edits.push(Edit::replace(whole, text));
                return;
            }
        }
        walk::walk_assignment_expression(self, it);
    }

    fn visit_update_expression(&mut self, it: &UpdateExpression<'a>) {
        if self.error.is_some() {
            return;
        }
        if let Some(shape) = update_shape(it) {
            let whole = it.span;
            let referenced = referenced_identifiers(|c| walk::walk_update_expression(c, it));
            if let Some(text) = self.rewrite(&shape, whole, &referenced, |sub| walk::walk_update_expression(sub, it)) {
                self.edits.push(Edit::replace(whole, text));
                return;
            }
        }
        walk::walk_update_expression(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if self.error.is_some() {
            return;
        }
        if let Some(shape) = call_shape(it) {
            let whole = it.span;
            let referenced = referenced_identifiers(|c| walk::walk_call_expression(c, it));
            if let Some(text) = self.rewrite(&shape, whole, &referenced, |sub| walk::walk_call_expression(sub, it)) {
                self.edits.push(Edit::replace(whole, text));
                return;
            }
        }
        if self.resolve_reads {
            if let Some((member, args)) = emit_call(it) {
                let rendered = match arguments_span(args) {
                    Some(span) => self.render(span, |sub| {
                        for arg in args {
                            sub.visit_argument(arg);
                        }
                    }),
                    None => String::new(),
                };
                if let Some(text) = self.resolver.emit(member, &rendered) {
                    self.edits.push(Edit::replace(it.span, text));
                    return;
                }
            }
        }
        walk::walk_call_expression(self, it);
    }

    fn visit_static_member_expression(&mut self, it: &StaticMemberExpression<'a>) {
        if self.resolve_reads {
            if let Some(text) = this_property(it).and_then(|member| self.resolver.read(member)) {
                self.edits.push(Edit::replace(it.span, text));
                return;
            }
        }
        walk::walk_static_member_expression(self, it);
    }
}

/// Rewrites member mutations in `code` according to `style`.
///
/// Reads outside rewritten fragments are left in `this.member` form for the member pass.
pub fn rewrite_mutations(
    code: &str,
    kind: SnippetKind,
    style: &UpdateStyle<'_>,
    resolver: &dyn MemberResolver,
) -> Result<String, CompileError> {
    with_snippet(code, kind, |program, wrapped, user| {
        let mut collector = MutationCollector::new(wrapped, style, resolver, false);
        collector.visit_program(program);
        match collector.error {
            Some(err) => Err(err),
            None => Ok(splice(wrapped, user, collector.edits)),
        }
    })
}

/// Mutation pass followed by the member pass: the full rewrite of a body or expression.
pub fn rewrite_body(
    code: &str,
    kind: SnippetKind,
    style: &UpdateStyle<'_>,
    resolver: &dyn MemberResolver,
) -> Result<String, CompileError> {
    let mutated = rewrite_mutations(code, kind, style, resolver)?;
    rewrite_members(&mutated, kind, resolver)
}
