//! Template Lowering
//!
//! Converts the JSX returned by `render()` into [`TemplateNode`]s. Text follows the JSX
//! whitespace rules; expression and attribute code is kept as source text. Anything the
//! backends could not translate statically (spreads, markup buried inside arbitrary
//! expressions, dynamic tags) is rejected here with a located error.

use oxc_ast::ast::{
    ArrowFunctionExpression, BindingPattern, Expression, JSXAttributeItem, JSXAttributeName,
    JSXAttributeValue, JSXChild, JSXElement, JSXElementName, JSXExpression, JSXFragment,
    ObjectExpression, ObjectPropertyKind, PropertyKey, PropertyKind, Statement,
};
use oxc_ast_visit::Visit;
use oxc_span::{GetSpan, Span};

use crate::error::{
    CompileError, SourceLocation, ERR_NESTED_JSX, ERR_SPREAD_ATTRIBUTE, ERR_SPREAD_CHILD, ERR_TAG,
};
use crate::ir::{
    AttributeNode, AttributeValue, ElementNode, ExpressionNode, FragmentNode, MapEntry,
    SelfClosingElementNode, TemplateCallback, TemplateNode, TextNode,
};
use crate::parse::{span_text, to_camel_case, unwrap_parens};
use crate::visitor::{walk_element, walk_self_closing_element, TemplateVisitor};

pub(crate) struct TemplateLowerer<'s> {
    source: &'s str,
}

impl<'s> TemplateLowerer<'s> {
    pub fn new(source: &'s str) -> Self {
        TemplateLowerer { source }
    }

    fn text(&self, span: Span) -> String {
        span_text(self.source, span).to_string()
    }

    fn located(&self, err: CompileError, span: Span) -> CompileError {
        err.at(SourceLocation::from_offset(self.source, span.start))
    }

    /// Lowers the (parenthesis-unwrapped) operand of the render `return`.
    pub fn lower_root(&self, expr: &Expression) -> Result<TemplateNode, CompileError> {
        match unwrap_parens(expr) {
            Expression::JSXElement(el) => self.lower_element(el),
            Expression::JSXFragment(frag) => self.lower_fragment(frag),
            other => Err(self.located(
                CompileError::unsupported(ERR_NESTED_JSX, "template root must be markup"),
                other.span(),
            )),
        }
    }

    fn lower_element(&self, element: &JSXElement) -> Result<TemplateNode, CompileError> {
        let opening = &element.opening_element;
        let tag = self.tag_name(&opening.name)?;

        let mut attributes = Vec::with_capacity(opening.attributes.len());
        for item in &opening.attributes {
            match item {
                JSXAttributeItem::Attribute(attr) => {
                    let name = match &attr.name {
                        JSXAttributeName::Identifier(id) => id.name.to_string(),
                        JSXAttributeName::NamespacedName(ns) => {
                            format!("{}:{}", ns.namespace.name, ns.name.name)
                        }
                    };
                    let value = match &attr.value {
                        None => AttributeValue::Boolean,
                        Some(JSXAttributeValue::StringLiteral(s)) => {
                            AttributeValue::Static(s.value.to_string())
                        }
                        Some(JSXAttributeValue::Element(el)) => {
                            AttributeValue::Template(Box::new(self.lower_element(el)?))
                        }
                        Some(JSXAttributeValue::Fragment(frag)) => {
                            AttributeValue::Template(Box::new(self.lower_fragment(frag)?))
                        }
                        Some(JSXAttributeValue::ExpressionContainer(container)) => {
                            match container.expression.as_expression() {
                                Some(expr) => self.lower_attribute_expression(expr)?,
                                None => AttributeValue::Boolean,
                            }
                        }
                    };
                    attributes.push(AttributeNode { name, value });
                }
                JSXAttributeItem::SpreadAttribute(spread) => {
                    return Err(self.located(
                        CompileError::unsupported(
                            ERR_SPREAD_ATTRIBUTE,
                            format!("spread attribute on <{}> cannot be analyzed statically", tag),
                        ),
                        spread.span,
                    ));
                }
            }
        }

        if element.closing_element.is_none() {
            return Ok(TemplateNode::SelfClosingElement(SelfClosingElementNode {
                tag,
                attributes,
            }));
        }
        let children = self.lower_children(&element.children)?;
        Ok(TemplateNode::Element(ElementNode {
            tag,
            attributes,
            children,
        }))
    }

    fn lower_fragment(&self, fragment: &JSXFragment) -> Result<TemplateNode, CompileError> {
        Ok(TemplateNode::Fragment(FragmentNode {
            children: self.lower_children(&fragment.children)?,
        }))
    }

    fn tag_name(&self, name: &JSXElementName) -> Result<String, CompileError> {
        match name {
            JSXElementName::Identifier(id) => Ok(id.name.to_string()),
            JSXElementName::IdentifierReference(id) => Ok(id.name.to_string()),
            JSXElementName::NamespacedName(ns) => {
                Ok(format!("{}:{}", ns.namespace.name, ns.name.name))
            }
            other => Err(self.located(
                CompileError::unsupported(
                    ERR_TAG,
                    format!("`{}` is not a static tag name", self.text(other.span())),
                ),
                other.span(),
            )),
        }
    }

    fn lower_children(&self, children: &[JSXChild]) -> Result<Vec<TemplateNode>, CompileError> {
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            match child {
                JSXChild::Text(text) => {
                    if let Some(value) = clean_jsx_text(&text.value) {
                        out.push(TemplateNode::Text(TextNode { value }));
                    }
                }
                JSXChild::Element(el) => out.push(self.lower_element(el)?),
                JSXChild::Fragment(frag) => out.push(self.lower_fragment(frag)?),
                JSXChild::ExpressionContainer(container) => match &container.expression {
                    JSXExpression::EmptyExpression(_) => {}
                    jsx => {
                        if let Some(expr) = jsx.as_expression() {
                            out.push(self.lower_child_expression(expr)?);
                        }
                    }
                },
                JSXChild::Spread(spread) => {
                    return Err(self.located(
                        CompileError::unsupported(
                            ERR_SPREAD_CHILD,
                            "spread children cannot be analyzed statically",
                        ),
                        spread.span,
                    ));
                }
            }
        }
        Ok(out)
    }

    fn lower_child_expression(&self, expr: &Expression) -> Result<TemplateNode, CompileError> {
        match unwrap_parens(expr) {
            Expression::JSXElement(el) => self.lower_element(el),
            Expression::JSXFragment(frag) => self.lower_fragment(frag),
            Expression::ArrowFunctionExpression(arrow) => {
                match self.markup_callback(arrow)? {
                    Some(callback) => Ok(TemplateNode::Expression(ExpressionNode {
                        code: self.text(arrow.span),
                        callback: Some(callback),
                    })),
                    None => self.plain_expression(expr),
                }
            }
            _ => self.plain_expression(expr),
        }
    }

    fn plain_expression(&self, expr: &Expression) -> Result<TemplateNode, CompileError> {
        self.reject_markup(expr)?;
        Ok(TemplateNode::Expression(ExpressionNode {
            code: self.text(expr.span()),
            callback: None,
        }))
    }

    /// `(item, index) => <li/>` or `(item) => { return <li/>; }`.
    fn markup_callback(
        &self,
        arrow: &ArrowFunctionExpression,
    ) -> Result<Option<TemplateCallback>, CompileError> {
        let returned = match arrow.body.statements.as_slice() {
            [Statement::ExpressionStatement(stmt)] if arrow.expression => &stmt.expression,
            [Statement::ReturnStatement(ret)] => match &ret.argument {
                Some(arg) => arg,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        let body = match unwrap_parens(returned) {
            Expression::JSXElement(el) => self.lower_element(el)?,
            Expression::JSXFragment(frag) => self.lower_fragment(frag)?,
            _ => return Ok(None),
        };
        let mut params: Vec<String> = arrow
            .params
            .items
            .iter()
            .map(|param| match &param.pattern {
                BindingPattern::BindingIdentifier(id) => id.name.to_string(),
                other => self.text(other.span()),
            })
            .collect();
        if let Some(rest) = &arrow.params.rest {
            params.push(self.text(rest.span()));
        }
        Ok(Some(TemplateCallback {
            params,
            body: Box::new(body),
        }))
    }

    fn lower_attribute_expression(&self, expr: &Expression) -> Result<AttributeValue, CompileError> {
        match unwrap_parens(expr) {
            Expression::JSXElement(el) => {
                return Ok(AttributeValue::Template(Box::new(self.lower_element(el)?)))
            }
            Expression::JSXFragment(frag) => {
                return Ok(AttributeValue::Template(Box::new(self.lower_fragment(frag)?)))
            }
            _ => {}
        }
        self.reject_markup(expr)?;
        if let Expression::ObjectExpression(object) = unwrap_parens(expr) {
            if let Some(entries) = self.static_entries(object) {
                return Ok(AttributeValue::ObjectMap {
                    entries,
                    code: self.text(object.span),
                });
            }
        }
        Ok(AttributeValue::Expression(self.text(expr.span())))
    }

    /// Entries of an object literal whose keys are all static, or `None`.
    fn static_entries(&self, object: &ObjectExpression) -> Option<Vec<MapEntry>> {
        let mut entries = Vec::with_capacity(object.properties.len());
        for property in &object.properties {
            let ObjectPropertyKind::ObjectProperty(prop) = property else {
                return None;
            };
            if prop.computed || prop.method || prop.kind != PropertyKind::Init {
                return None;
            }
            let key = match &prop.key {
                PropertyKey::StaticIdentifier(id) => id.name.to_string(),
                PropertyKey::StringLiteral(s) => s.value.to_string(),
                _ => return None,
            };
            entries.push(MapEntry {
                key,
                value: self.text(prop.value.span()),
            });
        }
        Some(entries)
    }

    fn reject_markup(&self, expr: &Expression) -> Result<(), CompileError> {
        let mut finder = MarkupFinder::default();
        finder.visit_expression(expr);
        match finder.found {
            Some(span) => Err(self.located(
                CompileError::unsupported(
                    ERR_NESTED_JSX,
                    "markup inside an expression; use <Show> or <For> instead",
                ),
                span,
            )),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
struct MarkupFinder {
    found: Option<Span>,
}

impl<'a> Visit<'a> for MarkupFinder {
    fn visit_jsx_element(&mut self, it: &JSXElement<'a>) {
        self.found.get_or_insert(it.span);
    }

    fn visit_jsx_fragment(&mut self, it: &JSXFragment<'a>) {
        self.found.get_or_insert(it.span);
    }
}

/// JSX text whitespace rules: lines are trimmed, whitespace-only lines dropped and the
/// remaining lines joined with one space. Returns `None` when nothing is left.
pub fn clean_jsx_text(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    let last_non_empty = lines
        .iter()
        .rposition(|l| l.chars().any(|c| c != ' ' && c != '\t'))
        .unwrap_or(0);
    let last = lines.len() - 1;
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let line = line.replace('\t', " ");
        let mut trimmed = line.as_str();
        if i != 0 {
            trimmed = trimmed.trim_start_matches(' ');
        }
        if i != last {
            trimmed = trimmed.trim_end_matches(' ');
        }
        if !trimmed.is_empty() {
            out.push_str(trimmed);
            if i != last_non_empty {
                out.push(' ');
            }
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SLOTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct SlotCollector {
    slots: Vec<String>,
}

impl SlotCollector {
    fn record(&mut self, tag: &str, attributes: &[AttributeNode]) {
        if tag != "slot" {
            return;
        }
        let name = attributes.iter().find(|a| a.name == "name").map(|a| &a.value);
        let slot = match name {
            Some(AttributeValue::Static(name)) => to_camel_case(name),
            Some(AttributeValue::Expression(code)) => code.clone(),
            _ => "default".to_string(),
        };
        self.slots.push(slot);
    }
}

impl TemplateVisitor for SlotCollector {
    fn visit_element(&mut self, element: &ElementNode) {
        self.record(&element.tag, &element.attributes);
        walk_element(self, element);
    }

    fn visit_self_closing_element(&mut self, element: &SelfClosingElementNode) {
        self.record(&element.tag, &element.attributes);
        walk_self_closing_element(self, element);
    }
}

/// Slot names in document order. Duplicates are kept.
pub fn collect_slots(template: &TemplateNode) -> Vec<String> {
    let mut collector = SlotCollector::default();
    collector.visit_node(template);
    collector.slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_program;
    use oxc_allocator::Allocator;
    use pretty_assertions::assert_eq;

    fn lower(markup: &str) -> Result<TemplateNode, CompileError> {
        let source = format!("const t = ({});", markup);
        let allocator = Allocator::default();
        let program = parse_program(&allocator, &source)?;
        let Some(Statement::VariableDeclaration(decl)) = program.body.first() else {
            panic!("expected declaration");
        };
        let init = decl.declarations[0].init.as_ref().unwrap();
        TemplateLowerer::new(&source).lower_root(init)
    }

    fn text(value: &str) -> TemplateNode {
        TemplateNode::Text(TextNode { value: value.into() })
    }

    #[test]
    fn test_whitespace_rules() {
        assert_eq!(clean_jsx_text("\n    \n  "), None);
        assert_eq!(clean_jsx_text(" "), Some(" ".to_string()));
        assert_eq!(clean_jsx_text("  Hello  "), Some("  Hello  ".to_string()));
        assert_eq!(
            clean_jsx_text("\n  Hello\n  world  \n"),
            Some("Hello world".to_string())
        );
    }

    #[test]
    fn test_lowers_elements_and_attributes() {
        let node = lower(r#"<div id="a" hidden onClick={() => this.go()}><b>Hi</b> {this.name}<br /></div>"#)
            .unwrap();
        let TemplateNode::Element(el) = &node else {
            panic!("expected element");
        };
        assert_eq!(el.tag, "div");
        assert_eq!(el.attributes[0].value, AttributeValue::Static("a".into()));
        assert_eq!(el.attributes[1].value, AttributeValue::Boolean);
        assert_eq!(
            el.attributes[2].value,
            AttributeValue::Expression("() => this.go()".into())
        );
        assert_eq!(el.children.len(), 4);
        assert_eq!(el.children[1], text(" "));
        assert_eq!(
            el.children[2],
            TemplateNode::Expression(ExpressionNode {
                code: "this.name".into(),
                callback: None
            })
        );
        assert!(matches!(el.children[3], TemplateNode::SelfClosingElement(_)));
    }

    #[test]
    fn test_object_maps() {
        let node = lower(r#"<p class={{ done: this.done, "is-big": true }} style={{ [k]: 1 }} />"#)
            .unwrap();
        let attrs = node.attributes();
        match &attrs[0].value {
            AttributeValue::ObjectMap { entries, .. } => {
                assert_eq!(entries[0].key, "done");
                assert_eq!(entries[0].value, "this.done");
                assert_eq!(entries[1].key, "is-big");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(attrs[1].value, AttributeValue::Expression(_)));
    }

    #[test]
    fn test_for_callback() {
        let node = lower("<For each={this.items}>{(item, i) => <li>{item}</li>}</For>").unwrap();
        let TemplateNode::Expression(expr) = &node.children()[0] else {
            panic!("expected callback");
        };
        let callback = expr.callback.as_ref().unwrap();
        assert_eq!(callback.params, vec!["item", "i"]);
        assert_eq!(callback.body.tag(), Some("li"));
    }

    #[test]
    fn test_rejects_spreads_and_nested_markup() {
        assert_eq!(lower("<div {...props} />").unwrap_err().code(), ERR_SPREAD_ATTRIBUTE);
        assert_eq!(lower("<div>{...items}</div>").unwrap_err().code(), ERR_SPREAD_CHILD);
        let err = lower("<div>{this.ok ? <a /> : null}</div>").unwrap_err();
        assert_eq!(err.code(), ERR_NESTED_JSX);
        assert!(err.location().is_some());
    }

    #[test]
    fn test_slot_names() {
        let node = lower(r#"<div><slot name="card-header" /><slot /><slot name={this.which} /></div>"#)
            .unwrap();
        assert_eq!(collect_slots(&node), vec!["cardHeader", "default", "this.which"]);
    }
}
