//! Dependency Inference & Method Ordering
//!
//! Memoized values and callbacks need the minimal set of reactive members they read.
//! Members written through a mutation shape are not reads: after the setter rewrite they
//! are only touched through the functional updater.

use oxc_ast::ast::{
    AssignmentExpression, AssignmentTarget, CallExpression, Expression, IdentifierReference,
    StaticMemberExpression, UpdateExpression,
};
use oxc_ast_visit::{walk, Visit};
use std::collections::HashSet;

use crate::error::CompileError;
use crate::ir::{ComputedMetadata, MethodMetadata};
use crate::mutation::{assignment_shape, call_shape, update_shape};
use crate::parse::{with_snippet, SnippetKind};
use crate::rewrite::this_property;
use crate::scope::BindingCollector;

/// The reactive vocabulary a snippet is scanned against.
#[derive(Debug, Clone, Default)]
pub struct ReactiveScope {
    /// Members whose `this.member` reads are dependencies.
    pub members: HashSet<String>,
    /// Members with a setter; their mutation targets are not reads.
    pub stateful: HashSet<String>,
    /// Bare identifiers that count as dependencies when read as a value.
    pub free: HashSet<String>,
}

impl ReactiveScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_stateful<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stateful.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_free<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.free.extend(names.into_iter().map(Into::into));
        self
    }
}

struct DependencyScanner<'s> {
    scope: &'s ReactiveScope,
    locals: &'s BindingCollector,
    deps: Vec<String>,
}

impl DependencyScanner<'_> {
    fn add(&mut self, name: &str) {
        if !self.deps.iter().any(|d| d == name) {
            self.deps.push(name.to_string());
        }
    }

    fn is_stateful(&self, member: &str) -> bool {
        self.scope.stateful.contains(member)
    }
}

impl<'a> Visit<'a> for DependencyScanner<'_> {
    fn visit_static_member_expression(&mut self, it: &StaticMemberExpression<'a>) {
        match this_property(it) {
            Some(member) => {
                if self.scope.members.contains(member) {
                    self.add(member);
                }
            }
            None => walk::walk_static_member_expression(self, it),
        }
    }

    fn visit_assignment_expression(&mut self, it: &AssignmentExpression<'a>) {
        match assignment_shape(it) {
            Some(shape) if self.is_stateful(shape.member()) => {
                if let AssignmentTarget::ComputedMemberExpression(target) = &it.left {
                    self.visit_expression(&target.expression);
                }
                self.visit_expression(&it.right);
            }
            _ => walk::walk_assignment_expression(self, it),
        }
    }

    fn visit_update_expression(&mut self, it: &UpdateExpression<'a>) {
        match update_shape(it) {
            Some(shape) if self.is_stateful(shape.member()) => {}
            _ => walk::walk_update_expression(self, it),
        }
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        let skip_callee = match call_shape(it) {
            Some(shape) => self.is_stateful(shape.member()),
            None => matches!(it.callee, Expression::Identifier(_)),
        };
        if skip_callee {
            for arg in &it.arguments {
                self.visit_argument(arg);
            }
        } else {
            walk::walk_call_expression(self, it);
        }
    }

    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        let name = it.name.as_str();
        if self.scope.free.contains(name) && !self.locals.is_bound(name) {
            self.add(name);
        }
    }
}

/// Reactive reads of `code` in first-read order, without duplicates.
pub fn infer_dependencies(
    code: &str,
    kind: SnippetKind,
    scope: &ReactiveScope,
) -> Result<Vec<String>, CompileError> {
    with_snippet(code, kind, |program, _, _| {
        let locals = BindingCollector::collect(program);
        let mut scanner = DependencyScanner {
            scope,
            locals: &locals,
            deps: Vec::new(),
        };
        scanner.visit_program(program);
        Ok(scanner.deps)
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORDERING
// ═══════════════════════════════════════════════════════════════════════════════

/// Names from `candidates` referenced as `this.name` in `code`, in first-reference order.
pub fn referenced_members(
    code: &str,
    kind: SnippetKind,
    candidates: &[&str],
) -> Result<Vec<String>, CompileError> {
    let scope = ReactiveScope::new().with_members(candidates.iter().copied());
    infer_dependencies(code, kind, &scope)
}

/// Emission order over items whose dependencies are given by index.
///
/// An item is emitted once everything it depends on has been emitted; among ready items
/// the earliest in source order wins. When only cycles remain, the earliest remaining item
/// is emitted regardless of its dependencies.
pub fn stable_topological_order(deps: &[Vec<usize>]) -> Vec<usize> {
    let n = deps.len();
    let mut emitted = vec![false; n];
    let mut order = Vec::with_capacity(n);
    while order.len() < n {
        let ready = (0..n).find(|&i| !emitted[i] && deps[i].iter().all(|&d| d == i || emitted[d]));
        let next = ready.or_else(|| (0..n).find(|&i| !emitted[i]));
        match next {
            Some(i) => {
                emitted[i] = true;
                order.push(i);
            }
            None => break,
        }
    }
    order
}

fn order_by_references<T>(
    items: &[T],
    name: impl Fn(&T) -> &str,
    code: impl Fn(&T) -> (&str, SnippetKind),
) -> Result<Vec<usize>, CompileError> {
    let names: Vec<&str> = items.iter().map(&name).collect();
    let mut deps = Vec::with_capacity(items.len());
    for item in items {
        let (text, kind) = code(item);
        let referenced = referenced_members(text, kind, &names)?;
        deps.push(
            referenced
                .iter()
                .filter_map(|r| names.iter().position(|n| *n == r.as_str()))
                .collect::<Vec<_>>(),
        );
    }
    Ok(stable_topological_order(&deps))
}

/// Orders methods so that every method follows the methods it references.
pub fn order_methods(methods: &[MethodMetadata]) -> Result<Vec<usize>, CompileError> {
    order_by_references(
        methods,
        |m| m.name.as_str(),
        |m| (m.body.as_str(), SnippetKind::Statements),
    )
}

/// Orders computed values so that every value follows the values it reads.
pub fn order_computed(computed: &[ComputedMetadata]) -> Result<Vec<usize>, CompileError> {
    order_by_references(
        computed,
        |c| c.name.as_str(),
        |c| (c.expression.as_str(), SnippetKind::Expression),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ReactiveScope {
        ReactiveScope::new()
            .with_members(["x", "y", "count", "items", "title", "save"])
            .with_stateful(["x", "y", "count", "items"])
            .with_free(["setCount"])
    }

    fn method(name: &str, body: &str) -> MethodMetadata {
        MethodMetadata {
            name: name.to_string(),
            body: body.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_read_order_without_duplicates() {
        let deps = infer_dependencies(
            "this.x + this.y + this.x * this.y",
            SnippetKind::Expression,
            &scope(),
        )
        .unwrap();
        assert_eq!(deps, vec!["x", "y"]);
    }

    #[test]
    fn test_mutation_targets_are_not_reads() {
        let deps = infer_dependencies(
            "this.count = this.x; this.items.push(this.y); this.count++;",
            SnippetKind::Statements,
            &scope(),
        )
        .unwrap();
        assert_eq!(deps, vec!["x", "y"]);
    }

    #[test]
    fn test_non_state_members_and_calls_are_reads() {
        let deps = infer_dependencies(
            "if (this.title) { this.save(); }",
            SnippetKind::Statements,
            &scope(),
        )
        .unwrap();
        assert_eq!(deps, vec!["title", "save"]);
    }

    #[test]
    fn test_setter_only_counts_when_read_as_value() {
        let called = infer_dependencies("setCount(1)", SnippetKind::Expression, &scope()).unwrap();
        assert!(called.is_empty());
        let passed =
            infer_dependencies("subscribe(setCount)", SnippetKind::Expression, &scope()).unwrap();
        assert_eq!(passed, vec!["setCount"]);
        let shadowed = infer_dependencies(
            "[1].forEach((setCount) => log(setCount))",
            SnippetKind::Expression,
            &scope(),
        )
        .unwrap();
        assert!(shadowed.is_empty());
    }

    #[test]
    fn test_caller_follows_callee() {
        let methods = vec![method("a", "this.b();"), method("b", "return 1;")];
        assert_eq!(order_methods(&methods).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_transitive_order() {
        let methods = vec![
            method("a", "this.b();"),
            method("b", "this.c();"),
            method("c", "return 1;"),
            method("d", "return 2;"),
        ];
        assert_eq!(order_methods(&methods).unwrap(), vec![2, 1, 0, 3]);
    }

    #[test]
    fn test_unrelated_keep_source_order() {
        let methods = vec![method("a", "return 1;"), method("b", "return 2;")];
        assert_eq!(order_methods(&methods).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_cycle_is_deterministic() {
        let methods = vec![
            method("a", "this.b();"),
            method("b", "this.a();"),
            method("c", "return 3;"),
        ];
        let first = order_methods(&methods).unwrap();
        assert_eq!(first, vec![2, 0, 1]);
        assert_eq!(order_methods(&methods).unwrap(), first);
    }

    #[test]
    fn test_recursive_method_is_ready() {
        let methods = vec![method("walk", "if (n) this.walk(n - 1);")];
        assert_eq!(order_methods(&methods).unwrap(), vec![0]);
    }

    #[test]
    fn test_computed_order() {
        let computed = vec![
            ComputedMetadata {
                name: "label".into(),
                expression: "`${this.total} items`".into(),
                ..Default::default()
            },
            ComputedMetadata {
                name: "total".into(),
                expression: "this.items.length".into(),
                ..Default::default()
            },
        ];
        assert_eq!(order_computed(&computed).unwrap(), vec![1, 0]);
    }
}
