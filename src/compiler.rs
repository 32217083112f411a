//! Template Compiler
//!
//! [`compile_template`] walks the template IR and hands every node to a target's
//! [`TemplateRenderer`]. Control forms are recognized first by [`classify`], then generic
//! elements are rendered attributes-first. Control renderers only ever see their parts
//! already rendered.

use crate::error::{CompileError, ERR_CONTROL_FORM};
use crate::ir::{
    AttributeNode, AttributeValue, ElementNode, ExpressionNode, FragmentNode, MapEntry,
    SelfClosingElementNode, TemplateCallback, TemplateNode, TextNode,
};
use crate::parse::{lower_first, to_camel_case};
use crate::target::Target;
use crate::validate::ref_member;

pub const SLOT_TAG: &str = "slot";
pub const SHOW_TAG: &str = "Show";
pub const FOR_TAG: &str = "For";

/// An attribute value with its code already rewritten for the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedValue {
    Boolean,
    Static(String),
    Expression(String),
    /// Rendered markup passed as a value.
    Template(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotParts {
    /// Name as written; `None` for the default slot.
    pub name: Option<String>,
    /// Property name of the slot: `children` or the camel-cased name.
    pub prop: String,
    pub fallback: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowParts {
    pub when: String,
    pub body: Vec<String>,
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForParts {
    pub each: String,
    pub item: String,
    pub index: Option<String>,
    pub key: Option<String>,
    pub body: String,
}

/// Target-specific rendering of template nodes.
pub trait TemplateRenderer {
    fn target(&self) -> Target;

    /// Rewrites expression code found in the template.
    fn script(&mut self, code: &str) -> Result<String, CompileError>;

    fn element(
        &mut self,
        tag: &str,
        attributes: Vec<String>,
        children: Vec<String>,
    ) -> Result<String, CompileError>;

    fn self_closing_element(&mut self, tag: &str, attributes: Vec<String>) -> Result<String, CompileError>;

    fn fragment(&mut self, children: Vec<String>) -> Result<String, CompileError>;

    fn attribute(&mut self, tag: &str, name: &str, value: &RenderedValue) -> Result<String, CompileError>;

    fn text(&mut self, text: &str) -> Result<String, CompileError>;

    /// An embedded expression; `code` is already rewritten.
    fn expression(&mut self, code: &str) -> Result<String, CompileError>;

    fn reference(&mut self, tag: &str, member: &str) -> Result<String, CompileError> {
        self.attribute(tag, "ref", &RenderedValue::Expression(member.to_string()))
    }

    fn slot(&mut self, _parts: SlotParts) -> Result<String, CompileError> {
        Err(CompileError::backend(self.target(), "slots"))
    }

    fn show(&mut self, _parts: ShowParts) -> Result<String, CompileError> {
        Err(CompileError::backend(self.target(), "<Show>"))
    }

    fn for_each(&mut self, _parts: ForParts) -> Result<String, CompileError> {
        Err(CompileError::backend(self.target(), "<For>"))
    }

    /// When true, static `class`/`className` attributes on an element that also carries a
    /// class map are folded into the map as always-on entries instead of being rendered.
    fn merges_static_class(&self) -> bool {
        false
    }

    /// `class={{ name: test }}`; entry values are already rewritten.
    fn class_map(
        &mut self,
        tag: &str,
        name: &str,
        _entries: &[MapEntry],
        code: &str,
    ) -> Result<String, CompileError> {
        self.attribute(tag, name, &RenderedValue::Expression(code.to_string()))
    }

    /// `style={{ prop: value }}`; entry values are already rewritten.
    fn style_map(&mut self, tag: &str, _entries: &[MapEntry], code: &str) -> Result<String, CompileError> {
        self.attribute(tag, "style", &RenderedValue::Expression(code.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum NodeShape<'n> {
    Slot {
        name: Option<&'n str>,
        children: &'n [TemplateNode],
    },
    Show {
        when: &'n str,
        fallback: Option<&'n AttributeValue>,
        children: &'n [TemplateNode],
    },
    For {
        each: &'n str,
        key: Option<String>,
        callback: &'n TemplateCallback,
        /// The callback body with any root `key` attribute removed.
        body: TemplateNode,
    },
    Element(&'n ElementNode),
    SelfClosing(&'n SelfClosingElementNode),
    Fragment(&'n FragmentNode),
    Text(&'n TextNode),
    Expression(&'n ExpressionNode),
}

fn control_error(message: impl Into<String>) -> CompileError {
    CompileError::unsupported(ERR_CONTROL_FORM, message)
}

fn expression_attribute<'n>(node: &'n TemplateNode, name: &str) -> Option<&'n str> {
    match node.attribute(name).map(|a| &a.value) {
        Some(AttributeValue::Expression(code)) => Some(code),
        _ => None,
    }
}

fn without_key(node: &TemplateNode) -> (TemplateNode, Option<String>) {
    let mut body = node.clone();
    let attributes = match &mut body {
        TemplateNode::Element(el) => &mut el.attributes,
        TemplateNode::SelfClosingElement(el) => &mut el.attributes,
        _ => return (body, None),
    };
    let key = match attributes.iter().position(|a| a.name == "key") {
        Some(i) => match attributes.remove(i).value {
            AttributeValue::Expression(code) => Some(code),
            AttributeValue::Static(s) => Some(serde_json::Value::from(s).to_string()),
            _ => None,
        },
        None => None,
    };
    (body, key)
}

fn classify_for(node: &TemplateNode) -> Result<NodeShape<'_>, CompileError> {
    let each = expression_attribute(node, "each")
        .ok_or_else(|| control_error("<For> requires an `each={...}` expression"))?;
    let callbacks: Vec<&TemplateCallback> = node
        .children()
        .iter()
        .filter(|child| !matches!(child, TemplateNode::Text(t) if t.value.trim().is_empty()))
        .map(|child| match child {
            TemplateNode::Expression(ExpressionNode {
                callback: Some(callback),
                ..
            }) => Ok(callback),
            _ => Err(control_error(
                "<For> takes exactly one `(item, index) => markup` callback child",
            )),
        })
        .collect::<Result<_, _>>()?;
    let [callback] = *callbacks.as_slice() else {
        return Err(control_error(
            "<For> takes exactly one `(item, index) => markup` callback child",
        ));
    };
    if callback.params.is_empty() || callback.params.len() > 2 {
        return Err(control_error("<For> callbacks take an item and an optional index"));
    }
    let (body, root_key) = without_key(&callback.body);
    let key = expression_attribute(node, "key").map(str::to_string).or(root_key);
    Ok(NodeShape::For {
        each,
        key,
        callback,
        body,
    })
}

/// Recognizes control forms before generic element dispatch.
pub fn classify(node: &TemplateNode) -> Result<NodeShape<'_>, CompileError> {
    match node.tag() {
        Some(SLOT_TAG) => {
            let name = match node.attribute("name").map(|a| &a.value) {
                None => None,
                Some(AttributeValue::Static(name)) => Some(name.as_str()),
                Some(_) => return Err(control_error("slot names are static strings")),
            };
            return Ok(NodeShape::Slot {
                name,
                children: node.children(),
            });
        }
        Some(SHOW_TAG) => {
            let when = expression_attribute(node, "when")
                .ok_or_else(|| control_error("<Show> requires a `when={...}` expression"))?;
            return Ok(NodeShape::Show {
                when,
                fallback: node.attribute("fallback").map(|a| &a.value),
                children: node.children(),
            });
        }
        Some(FOR_TAG) => return classify_for(node),
        _ => {}
    }
    Ok(match node {
        TemplateNode::Element(el) => NodeShape::Element(el),
        TemplateNode::SelfClosingElement(el) => NodeShape::SelfClosing(el),
        TemplateNode::Fragment(frag) => NodeShape::Fragment(frag),
        TemplateNode::Text(text) => NodeShape::Text(text),
        TemplateNode::Expression(expr) if expr.callback.is_some() => {
            return Err(control_error("markup callbacks are only allowed inside <For>"))
        }
        TemplateNode::Expression(expr) => NodeShape::Expression(expr),
    })
}

#[derive(Debug)]
pub enum AttributeShape<'n> {
    Ref(&'n str),
    ClassMap {
        name: &'n str,
        entries: &'n [MapEntry],
        code: &'n str,
    },
    StyleMap {
        entries: &'n [MapEntry],
        code: &'n str,
    },
    Plain(&'n AttributeNode),
}

pub fn classify_attribute(attribute: &AttributeNode) -> AttributeShape<'_> {
    match (attribute.name.as_str(), &attribute.value) {
        ("ref", AttributeValue::Expression(code)) => match ref_member(code) {
            Some(member) => AttributeShape::Ref(member),
            None => AttributeShape::Plain(attribute),
        },
        (name @ ("class" | "className"), AttributeValue::ObjectMap { entries, code }) => {
            AttributeShape::ClassMap {
                name,
                entries,
                code,
            }
        }
        ("style", AttributeValue::ObjectMap { entries, code }) => {
            AttributeShape::StyleMap { entries, code }
        }
        _ => AttributeShape::Plain(attribute),
    }
}

/// HTML name of a JSX DOM attribute: `className` → `class`, `htmlFor` → `for`.
pub fn html_attribute_name(name: &str) -> &str {
    match name {
        "className" => "class",
        "htmlFor" => "for",
        other => other,
    }
}

/// `onClick` → `click`, `onItemAdded` → `itemAdded`; `None` for non-handler names.
pub fn event_attribute(name: &str) -> Option<String> {
    let rest = name.strip_prefix("on")?;
    match rest.chars().next() {
        Some(c) if c.is_ascii_uppercase() => Some(lower_first(rest)),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILATION
// ═══════════════════════════════════════════════════════════════════════════════

fn rewrite_entries<R: TemplateRenderer + ?Sized>(
    entries: &[MapEntry],
    renderer: &mut R,
) -> Result<Vec<MapEntry>, CompileError> {
    entries
        .iter()
        .map(|entry| {
            Ok(MapEntry {
                key: entry.key.clone(),
                value: renderer.script(&entry.value)?,
            })
        })
        .collect()
}

/// Value of a static `class`/`className` attribute.
fn static_class(attribute: &AttributeNode) -> Option<&str> {
    match (attribute.name.as_str(), &attribute.value) {
        ("class" | "className", AttributeValue::Static(value)) => Some(value.as_str()),
        _ => None,
    }
}

fn compile_value<R: TemplateRenderer + ?Sized>(
    value: &AttributeValue,
    renderer: &mut R,
) -> Result<RenderedValue, CompileError> {
    Ok(match value {
        AttributeValue::Boolean => RenderedValue::Boolean,
        AttributeValue::Static(s) => RenderedValue::Static(s.clone()),
        AttributeValue::Expression(code) | AttributeValue::ObjectMap { code, .. } => {
            RenderedValue::Expression(renderer.script(code)?)
        }
        AttributeValue::Template(node) => RenderedValue::Template(compile_template(node, renderer)?),
    })
}

fn compile_attributes<R: TemplateRenderer + ?Sized>(
    tag: &str,
    attributes: &[AttributeNode],
    renderer: &mut R,
) -> Result<Vec<String>, CompileError> {
    let has_class_map = attributes
        .iter()
        .any(|a| matches!(classify_attribute(a), AttributeShape::ClassMap { .. }));
    let merge = has_class_map && renderer.merges_static_class();
    let static_classes: Vec<MapEntry> = if merge {
        attributes
            .iter()
            .filter_map(static_class)
            .flat_map(str::split_whitespace)
            .map(|class| MapEntry {
                key: class.to_string(),
                value: "true".to_string(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut out = Vec::with_capacity(attributes.len());
    for attribute in attributes {
        if merge && static_class(attribute).is_some() {
            continue;
        }
        let rendered = match classify_attribute(attribute) {
            AttributeShape::Ref(member) => renderer.reference(tag, member)?,
            AttributeShape::ClassMap {
                name,
                entries,
                code,
            } => {
                let mut merged = static_classes.clone();
                merged.extend(rewrite_entries(entries, renderer)?);
                let entries = merged;
                let code = renderer.script(code)?;
                renderer.class_map(tag, name, &entries, &code)?
            }
            AttributeShape::StyleMap { entries, code } => {
                let entries = rewrite_entries(entries, renderer)?;
                let code = renderer.script(code)?;
                renderer.style_map(tag, &entries, &code)?
            }
            AttributeShape::Plain(attribute) => {
                let value = compile_value(&attribute.value, renderer)?;
                renderer.attribute(tag, &attribute.name, &value)?
            }
        };
        out.push(rendered);
    }
    Ok(out)
}

fn compile_children<R: TemplateRenderer + ?Sized>(
    children: &[TemplateNode],
    renderer: &mut R,
) -> Result<Vec<String>, CompileError> {
    children
        .iter()
        .map(|child| compile_template(child, renderer))
        .collect()
}

/// Renders `node` and everything below it with `renderer`.
pub fn compile_template<R: TemplateRenderer + ?Sized>(
    node: &TemplateNode,
    renderer: &mut R,
) -> Result<String, CompileError> {
    match classify(node)? {
        NodeShape::Element(el) => {
            let attributes = compile_attributes(&el.tag, &el.attributes, renderer)?;
            let children = compile_children(&el.children, renderer)?;
            renderer.element(&el.tag, attributes, children)
        }
        NodeShape::SelfClosing(el) => {
            let attributes = compile_attributes(&el.tag, &el.attributes, renderer)?;
            renderer.self_closing_element(&el.tag, attributes)
        }
        NodeShape::Fragment(frag) => {
            let children = compile_children(&frag.children, renderer)?;
            renderer.fragment(children)
        }
        NodeShape::Text(text) => renderer.text(&text.value),
        NodeShape::Expression(expr) => {
            let code = renderer.script(&expr.code)?;
            renderer.expression(&code)
        }
        NodeShape::Slot { name, children } => {
            let fallback = compile_children(children, renderer)?;
            renderer.slot(SlotParts {
                name: name.map(str::to_string),
                prop: name.map(to_camel_case).unwrap_or_else(|| "children".to_string()),
                fallback,
            })
        }
        NodeShape::Show {
            when,
            fallback,
            children,
        } => {
            let when = renderer.script(when)?;
            let body = compile_children(children, renderer)?;
            let fallback = match fallback {
                Some(AttributeValue::Template(node)) => Some(compile_template(node, renderer)?),
                Some(AttributeValue::Static(text)) => Some(renderer.text(text)?),
                Some(AttributeValue::Expression(code)) | Some(AttributeValue::ObjectMap { code, .. }) => {
                    let code = renderer.script(code)?;
                    Some(renderer.expression(&code)?)
                }
                Some(AttributeValue::Boolean) | None => None,
            };
            renderer.show(ShowParts {
                when,
                body,
                fallback,
            })
        }
        NodeShape::For {
            each,
            key,
            callback,
            body,
        } => {
            let each = renderer.script(each)?;
            let key = key.map(|k| renderer.script(&k)).transpose()?;
            let body = compile_template(&body, renderer)?;
            renderer.for_each(ForParts {
                each,
                item: callback.params[0].clone(),
                index: callback.params.get(1).cloned(),
                key,
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_component;
    use pretty_assertions::assert_eq;

    fn template(markup: &str) -> TemplateNode {
        let source = format!(
            "import {{ Component, Ref }} from \"@tessera/core\";\n\
             @Component()\n\
             class T {{\n  @Ref() private input!: HTMLInputElement;\n  render() {{ return ({}); }}\n}}\n",
            markup
        );
        extract_component(&source).unwrap().template
    }

    /// Renders a compact JSX-like form and records the dispatch order.
    #[derive(Default)]
    struct Echo {
        log: Vec<String>,
        controls: bool,
    }

    impl TemplateRenderer for Echo {
        fn target(&self) -> Target {
            Target::Svelte
        }

        fn script(&mut self, code: &str) -> Result<String, CompileError> {
            Ok(code.replace("this.", ""))
        }

        fn element(
            &mut self,
            tag: &str,
            attributes: Vec<String>,
            children: Vec<String>,
        ) -> Result<String, CompileError> {
            self.log.push(format!("element {}", tag));
            let attrs: String = attributes.iter().map(|a| format!(" {}", a)).collect();
            Ok(format!("<{tag}{attrs}>{}</{tag}>", children.concat()))
        }

        fn self_closing_element(&mut self, tag: &str, attributes: Vec<String>) -> Result<String, CompileError> {
            self.log.push(format!("element {}", tag));
            let attrs: String = attributes.iter().map(|a| format!(" {}", a)).collect();
            Ok(format!("<{}{} />", tag, attrs))
        }

        fn fragment(&mut self, children: Vec<String>) -> Result<String, CompileError> {
            Ok(children.concat())
        }

        fn attribute(&mut self, _tag: &str, name: &str, value: &RenderedValue) -> Result<String, CompileError> {
            self.log.push(format!("attribute {}", name));
            Ok(match value {
                RenderedValue::Boolean => name.to_string(),
                RenderedValue::Static(s) => format!("{}=\"{}\"", name, s),
                RenderedValue::Expression(code) | RenderedValue::Template(code) => {
                    format!("{}={{{}}}", name, code)
                }
            })
        }

        fn text(&mut self, text: &str) -> Result<String, CompileError> {
            Ok(text.to_string())
        }

        fn expression(&mut self, code: &str) -> Result<String, CompileError> {
            Ok(format!("{{{}}}", code))
        }

        fn slot(&mut self, parts: SlotParts) -> Result<String, CompileError> {
            Ok(format!("[slot {} {:?}]{}", parts.prop, parts.name, parts.fallback.concat()))
        }

        fn show(&mut self, parts: ShowParts) -> Result<String, CompileError> {
            if !self.controls {
                return Err(CompileError::backend(self.target(), "<Show>"));
            }
            Ok(format!(
                "[if {}]{}[else]{}[/if]",
                parts.when,
                parts.body.concat(),
                parts.fallback.unwrap_or_default()
            ))
        }

        fn for_each(&mut self, parts: ForParts) -> Result<String, CompileError> {
            Ok(format!(
                "[each {} as {} {:?} key={:?}]{}[/each]",
                parts.each, parts.item, parts.index, parts.key, parts.body
            ))
        }

        fn class_map(
            &mut self,
            _tag: &str,
            name: &str,
            entries: &[MapEntry],
            _code: &str,
        ) -> Result<String, CompileError> {
            let parts: Vec<String> = entries.iter().map(|e| format!("{}:{}", e.key, e.value)).collect();
            Ok(format!("{}=[{}]", name, parts.join(",")))
        }
    }

    fn render(markup: &str) -> Result<String, CompileError> {
        let mut echo = Echo {
            controls: true,
            ..Default::default()
        };
        compile_template(&template(markup), &mut echo)
    }

    #[test]
    fn test_event_attribute() {
        assert_eq!(event_attribute("onClick"), Some("click".to_string()));
        assert_eq!(event_attribute("onItemAdded"), Some("itemAdded".to_string()));
        assert_eq!(event_attribute("once"), None);
        assert_eq!(event_attribute("on"), None);
    }

    #[test]
    fn test_attributes_before_children() {
        let mut echo = Echo::default();
        let out = compile_template(&template(r#"<div id="a"><span title="b" /></div>"#), &mut echo).unwrap();
        assert_eq!(out, r#"<div id="a"><span title="b" /></div>"#);
        assert_eq!(
            echo.log,
            vec!["attribute id", "attribute title", "element span", "element div"]
        );
    }

    #[test]
    fn test_show_receives_rendered_parts() {
        let out = render(r#"<Show when={this.input} fallback={<p>none</p>}><b>{this.input}</b></Show>"#).unwrap();
        assert_eq!(out, "[if input]<b>{input}</b>[else]<p>none</p>[/if]");
    }

    #[test]
    fn test_for_key_from_body_root() {
        let out = render(r#"<ul><For each={this.items}>{(item, i) => <li key={item.id}>{item.name}</li>}</For></ul>"#)
            .unwrap();
        assert_eq!(
            out,
            "<ul>[each items as item Some(\"i\") key=Some(\"item.id\")]<li>{item.name}</li>[/each]</ul>"
        );
    }

    #[test]
    fn test_for_attribute_key_wins() {
        let out = render(r#"<For each={this.items} key={item}>{(item) => <li>{item}</li>}</For>"#).unwrap();
        assert_eq!(out, "[each items as item None key=Some(\"item\")]<li>{item}</li>[/each]");
    }

    #[test]
    fn test_slots() {
        let out = render(r#"<div><slot name="card-header" /><slot>Empty</slot></div>"#).unwrap();
        assert_eq!(
            out,
            "<div>[slot cardHeader Some(\"card-header\")][slot children None]Empty</div>"
        );
    }

    #[test]
    fn test_ref_and_class_map() {
        let out = render(r#"<input ref={this.input} class={{ done: this.done, "is-big": true }} />"#).unwrap();
        assert_eq!(out, "<input ref={input} class=[done:done,is-big:true] />");
    }

    #[test]
    fn test_show_without_when_is_rejected() {
        let err = render(r#"<Show><b>x</b></Show>"#).unwrap_err();
        assert_eq!(err.code(), ERR_CONTROL_FORM);
    }

    #[test]
    fn test_for_without_callback_is_rejected() {
        let err = render(r#"<For each={this.items}><li /></For>"#).unwrap_err();
        assert_eq!(err.code(), ERR_CONTROL_FORM);
        let err = render(r#"<For each={this.items} />"#).unwrap_err();
        assert_eq!(err.code(), ERR_CONTROL_FORM);
    }

    #[test]
    fn test_callback_outside_for_is_rejected() {
        let err = render(r#"<ul>{(i) => <li>{i}</li>}</ul>"#).unwrap_err();
        assert_eq!(err.code(), ERR_CONTROL_FORM);
    }

    #[test]
    fn test_default_control_renderer_is_unsupported() {
        let mut echo = Echo::default();
        let err = compile_template(&template(r#"<Show when={true}>x</Show>"#), &mut echo).unwrap_err();
        assert_eq!(err.kind(), "BackendUnsupported");
    }
}
