use crate::ir::{
    AttributeNode, AttributeValue, ElementNode, ExpressionNode, FragmentNode,
    SelfClosingElementNode, TemplateNode, TextNode,
};

/// Read-only traversal over the template IR.
///
/// Rules:
/// 1. Attributes are visited before children.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers call the matching `walk_*` function to continue traversal unless pruning
///    is intended.
/// 4. Markup nested in attribute values and `<For>` callbacks is part of the traversal.
pub trait TemplateVisitor {
    fn visit_node(&mut self, node: &TemplateNode) {
        walk_node(self, node);
    }

    fn visit_element(&mut self, element: &ElementNode) {
        walk_element(self, element);
    }

    fn visit_self_closing_element(&mut self, element: &SelfClosingElementNode) {
        walk_self_closing_element(self, element);
    }

    fn visit_fragment(&mut self, fragment: &FragmentNode) {
        walk_children(self, &fragment.children);
    }

    fn visit_attribute(&mut self, attribute: &AttributeNode) {
        walk_attribute(self, attribute);
    }

    fn visit_text(&mut self, _text: &TextNode) {}

    fn visit_expression(&mut self, expression: &ExpressionNode) {
        walk_expression(self, expression);
    }
}

pub fn walk_children<V: TemplateVisitor + ?Sized>(visitor: &mut V, children: &[TemplateNode]) {
    for node in children {
        visitor.visit_node(node);
    }
}

pub fn walk_node<V: TemplateVisitor + ?Sized>(visitor: &mut V, node: &TemplateNode) {
    match node {
        TemplateNode::Element(el) => visitor.visit_element(el),
        TemplateNode::SelfClosingElement(el) => visitor.visit_self_closing_element(el),
        TemplateNode::Fragment(frag) => visitor.visit_fragment(frag),
        TemplateNode::Text(text) => visitor.visit_text(text),
        TemplateNode::Expression(expr) => visitor.visit_expression(expr),
    }
}

pub fn walk_element<V: TemplateVisitor + ?Sized>(visitor: &mut V, element: &ElementNode) {
    for attr in &element.attributes {
        visitor.visit_attribute(attr);
    }
    walk_children(visitor, &element.children);
}

pub fn walk_self_closing_element<V: TemplateVisitor + ?Sized>(
    visitor: &mut V,
    element: &SelfClosingElementNode,
) {
    for attr in &element.attributes {
        visitor.visit_attribute(attr);
    }
}

pub fn walk_attribute<V: TemplateVisitor + ?Sized>(visitor: &mut V, attribute: &AttributeNode) {
    if let AttributeValue::Template(node) = &attribute.value {
        visitor.visit_node(node);
    }
}

pub fn walk_expression<V: TemplateVisitor + ?Sized>(visitor: &mut V, expression: &ExpressionNode) {
    if let Some(callback) = &expression.callback {
        visitor.visit_node(&callback.body);
    }
}
