//! Binding inventory for code snippets.
//!
//! Dependency inference must not mistake a locally bound name (a parameter, a `const`
//! inside a callback, a catch parameter) for a reactive free identifier.

use oxc_ast::ast::{BindingIdentifier, IdentifierReference, Program};
use oxc_ast_visit::Visit;
use oxc_span::Span;
use std::collections::HashSet;

/// Collects every name bound anywhere in the visited tree and every identifier reference.
#[derive(Debug, Default)]
pub struct BindingCollector {
    pub bindings: HashSet<String>,
    pub references: Vec<(String, Span)>,
}

impl BindingCollector {
    pub fn collect(program: &Program) -> Self {
        let mut collector = BindingCollector::default();
        collector.visit_program(program);
        collector
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains(name)
    }
}

impl<'a> Visit<'a> for BindingCollector {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.references.push((ident.name.to_string(), ident.span));
    }

    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.bindings.insert(ident.name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{with_snippet, SnippetKind};

    #[test]
    fn test_collects_params_and_locals() {
        let code = "const total = items.reduce((sum, item) => sum + item, 0); try {} catch (err) {}";
        let (bound, refs) = with_snippet(code, SnippetKind::Statements, |program, _, _| {
            let c = BindingCollector::collect(program);
            Ok((c.bindings, c.references))
        })
        .unwrap();
        assert!(bound.contains("total"));
        assert!(bound.contains("sum"));
        assert!(bound.contains("item"));
        assert!(bound.contains("err"));
        assert!(!bound.contains("items"));
        assert!(refs.iter().any(|(name, _)| name == "items"));
    }
}
