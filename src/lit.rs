//! Lit backend.
//!
//! Components become `LitElement` subclasses registered under their selector. Member
//! access keeps its `this.` form; reactive properties observe plain assignments, so only
//! nested writes and in-place calls are followed by `this.requestUpdate()`.

use crate::compiler::{
    compile_template, event_attribute, html_attribute_name, ForParts, RenderedValue, ShowParts,
    SlotParts, TemplateRenderer,
};
use crate::error::CompileError;
use crate::imports::ImportRegistrar;
use crate::ir::{ComponentMetadata, MapEntry};
use crate::mutation::{rewrite_body, UpdateStyle};
use crate::parse::{indent, is_component_tag, is_identifier, literal_type, to_kebab_case, SnippetKind};
use crate::rewrite::MemberResolver;
use crate::style::escape_template_literal;
use crate::target::Target;
use crate::transform::{Artifact, Transformer, TransformerResult};

const LIT: &str = "lit";
const DECORATORS: &str = "lit/decorators.js";
const REF_DIRECTIVE: &str = "lit/directives/ref.js";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Attributes bound as properties so the live DOM value is updated.
const PROPERTY_ATTRIBUTES: &[&str] = &["value", "checked", "selected"];

const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "disabled", "hidden", "required", "readonly", "readOnly", "multiple", "open", "autofocus",
    "inert",
];

struct LitResolver<'c> {
    component: &'c ComponentMetadata,
}

impl MemberResolver for LitResolver<'_> {
    fn read(&self, member: &str) -> Option<String> {
        self.component
            .is_ref(member)
            .then(|| format!("this.{}.value", member))
    }

    fn emit(&self, member: &str, args: &str) -> Option<String> {
        self.component.event(member).map(|event| {
            let detail = if args.is_empty() {
                String::new()
            } else {
                format!("detail: {}, ", args)
            };
            format!(
                "this.dispatchEvent(new CustomEvent(\"{}\", {{ {}bubbles: true, composed: true }}))",
                event.event_name, detail
            )
        })
    }
}

fn rewrite(component: &ComponentMetadata, code: &str, kind: SnippetKind) -> Result<String, CompileError> {
    let invalidate = |member: &str| {
        (component.is_state(member) || component.is_prop(member))
            .then(|| "this.requestUpdate()".to_string())
    };
    rewrite_body(code, kind, &UpdateStyle::Invalidate(&invalidate), &LitResolver { component })
}

fn with_comments(comments: &[String], code: String) -> String {
    if comments.is_empty() {
        code
    } else {
        format!("{}\n{}", comments.join("\n"), code)
    }
}

fn typed(type_annotation: Option<&str>) -> String {
    type_annotation
        .map(|t| format!(": {}", t))
        .unwrap_or_default()
}

/// `@property` options for a prop of the given type.
fn property_options(ty: &str) -> &'static str {
    match ty.trim() {
        "string" => "{ type: String }",
        "number" => "{ type: Number }",
        "boolean" => "{ type: Boolean }",
        _ => "{ attribute: false }",
    }
}

fn element_name(tag: &str) -> String {
    if is_component_tag(tag) {
        to_kebab_case(tag)
    } else {
        tag.to_string()
    }
}

fn object_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        serde_json::Value::from(key).to_string()
    }
}

fn object_literal(entries: &[MapEntry]) -> String {
    let fields: Vec<String> = entries
        .iter()
        .map(|e| format!("{}: {}", object_key(&e.key), e.value))
        .collect();
    format!("{{ {} }}", fields.join(", "))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE RENDERER
// ═══════════════════════════════════════════════════════════════════════════════

struct LitRenderer<'c> {
    component: &'c ComponentMetadata,
    imports: &'c mut ImportRegistrar,
}

fn join_attributes(attributes: &[String]) -> String {
    attributes.iter().map(|a| format!(" {}", a)).collect()
}

impl TemplateRenderer for LitRenderer<'_> {
    fn target(&self) -> Target {
        Target::Lit
    }

    fn script(&mut self, code: &str) -> Result<String, CompileError> {
        rewrite(self.component, code, SnippetKind::Expression)
    }

    fn element(
        &mut self,
        tag: &str,
        attributes: Vec<String>,
        children: Vec<String>,
    ) -> Result<String, CompileError> {
        let tag = element_name(tag);
        Ok(format!(
            "<{tag}{}>{}</{tag}>",
            join_attributes(&attributes),
            children.concat()
        ))
    }

    fn self_closing_element(&mut self, tag: &str, attributes: Vec<String>) -> Result<String, CompileError> {
        if VOID_ELEMENTS.contains(&tag) {
            return Ok(format!("<{}{}>", tag, join_attributes(&attributes)));
        }
        self.element(tag, attributes, Vec::new())
    }

    fn fragment(&mut self, children: Vec<String>) -> Result<String, CompileError> {
        Ok(children.concat())
    }

    fn attribute(&mut self, tag: &str, name: &str, value: &RenderedValue) -> Result<String, CompileError> {
        let name = html_attribute_name(name);
        Ok(match value {
            RenderedValue::Boolean => name.to_string(),
            RenderedValue::Static(s) => format!(
                "{}=\"{}\"",
                name,
                escape_template_literal(s).replace('"', "&quot;")
            ),
            RenderedValue::Expression(code) => {
                if let Some(event) = event_attribute(name) {
                    format!("@{}=${{{}}}", event, code)
                } else if is_component_tag(tag) || PROPERTY_ATTRIBUTES.contains(&name) {
                    format!(".{}=${{{}}}", name, code)
                } else if BOOLEAN_ATTRIBUTES.contains(&name) {
                    format!("?{}=${{{}}}", name, code)
                } else {
                    format!("{}=${{{}}}", name, code)
                }
            }
            RenderedValue::Template(markup) => format!(".{}=${{html`{}`}}", name, markup),
        })
    }

    fn text(&mut self, text: &str) -> Result<String, CompileError> {
        Ok(escape_template_literal(text))
    }

    fn expression(&mut self, code: &str) -> Result<String, CompileError> {
        Ok(format!("${{{}}}", code))
    }

    fn reference(&mut self, _tag: &str, member: &str) -> Result<String, CompileError> {
        self.imports.named("ref", REF_DIRECTIVE);
        Ok(format!("${{ref(this.{})}}", member))
    }

    fn slot(&mut self, parts: SlotParts) -> Result<String, CompileError> {
        let name = parts
            .name
            .map(|n| format!(" name=\"{}\"", n))
            .unwrap_or_default();
        Ok(format!("<slot{}>{}</slot>", name, parts.fallback.concat()))
    }

    fn show(&mut self, parts: ShowParts) -> Result<String, CompileError> {
        let fallback = match parts.fallback {
            Some(fallback) => format!("html`{}`", fallback),
            None => {
                self.imports.named("nothing", LIT);
                "nothing".to_string()
            }
        };
        Ok(format!(
            "${{{} ? html`{}` : {}}}",
            parts.when,
            parts.body.concat(),
            fallback
        ))
    }

    fn for_each(&mut self, parts: ForParts) -> Result<String, CompileError> {
        let params = match &parts.index {
            Some(index) => format!("({}, {})", parts.item, index),
            None => format!("({})", parts.item),
        };
        Ok(match parts.key {
            Some(key) => {
                self.imports.named("repeat", "lit/directives/repeat.js");
                format!(
                    "${{repeat({}, {params} => {}, {params} => html`{}`)}}",
                    parts.each,
                    key,
                    parts.body,
                    params = params
                )
            }
            None => format!("${{{}.map({} => html`{}`)}}", parts.each, params, parts.body),
        })
    }

    fn merges_static_class(&self) -> bool {
        true
    }

    fn class_map(
        &mut self,
        _tag: &str,
        _name: &str,
        entries: &[MapEntry],
        _code: &str,
    ) -> Result<String, CompileError> {
        self.imports.named("classMap", "lit/directives/class-map.js");
        Ok(format!("class=${{classMap({})}}", object_literal(entries)))
    }

    fn style_map(&mut self, _tag: &str, entries: &[MapEntry], _code: &str) -> Result<String, CompileError> {
        self.imports.named("styleMap", "lit/directives/style-map.js");
        Ok(format!("style=${{styleMap({})}}", object_literal(entries)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORMER
// ═══════════════════════════════════════════════════════════════════════════════

pub fn transformer() -> Transformer {
    Transformer::new()
        .with_pre_transform(|ctx| {
            if ctx.component.selector.is_none() {
                return Err(CompileError::missing_selector(Target::Lit));
            }
            if !ctx.component.providers.is_empty() || !ctx.component.injects.is_empty() {
                return Err(CompileError::backend(Target::Lit, "dependency injection"));
            }
            ctx.imports.named("LitElement", LIT);
            ctx.imports.named("html", LIT);
            ctx.imports.named("customElement", DECORATORS);
            Ok(())
        })
        .with_prop(|prop, ctx| {
            ctx.imports.named("property", DECORATORS);
            let ty = prop.type_annotation.clone().or_else(|| {
                prop.default_value
                    .as_deref()
                    .map(literal_type)
                    .filter(|t| *t != "unknown")
                    .map(str::to_string)
            });
            let options = property_options(ty.as_deref().unwrap_or_default());
            let field = match (&prop.default_value, prop.optional) {
                (Some(default), _) => format!(
                    "{}{} = {};",
                    prop.name,
                    typed(prop.type_annotation.as_deref()),
                    rewrite(ctx.component, default, SnippetKind::Expression)?
                ),
                (None, true) => format!("{}?{};", prop.name, typed(prop.type_annotation.as_deref())),
                (None, false) => format!("{}!{};", prop.name, typed(prop.type_annotation.as_deref())),
            };
            let code = format!("@property({})\n{}", options, field);
            Ok(Artifact::code(with_comments(&prop.comments, code)))
        })
        .with_state(|state, ctx| {
            ctx.imports.named("state", DECORATORS);
            let init = match &state.initializer {
                Some(init) => format!(" = {}", rewrite(ctx.component, init, SnippetKind::Expression)?),
                None => String::new(),
            };
            let code = format!(
                "@state()\nprivate {}{}{};",
                state.name,
                typed(state.type_annotation.as_deref()),
                init
            );
            Ok(Artifact::code(with_comments(&state.comments, code)))
        })
        .with_computed(|computed, ctx| {
            let expression = rewrite(ctx.component, &computed.expression, SnippetKind::Expression)?;
            let code = format!(
                "get {}(){} {{\n  return {};\n}}",
                computed.name,
                typed(computed.return_type.as_deref()),
                expression
            );
            Ok(Artifact::code(with_comments(&computed.comments, code)))
        })
        .with_event(|event, _| {
            let tag = match &event.payload_type {
                Some(payload) => format!("@fires {} - detail: {}", event.event_name, payload),
                None => format!("@fires {}", event.event_name),
            };
            Ok(Artifact::default().with_declaration(tag))
        })
        .with_reference(|reference, ctx| {
            ctx.imports.named("createRef", REF_DIRECTIVE);
            let code = format!(
                "private {} = createRef{}();",
                reference.name,
                reference
                    .type_annotation
                    .as_deref()
                    .map(|t| format!("<{}>", t))
                    .unwrap_or_default()
            );
            Ok(Artifact::code(with_comments(&reference.comments, code)))
        })
        .with_method(|method, ctx| {
            let body = rewrite(ctx.component, &method.body, SnippetKind::Statements)?;
            let code = format!(
                "{}{}({}){} {{\n{}\n}}",
                if method.is_async { "async " } else { "" },
                method.name,
                method.params,
                typed(method.return_type.as_deref()),
                indent(&body, "  ")
            );
            Ok(Artifact::code(with_comments(&method.comments, code)))
        })
        .with_on_init(|hook, ctx| {
            let body = rewrite(ctx.component, &hook.body, SnippetKind::Statements)?;
            let body = if hook.is_async {
                format!("(async () => {{\n{}\n}})();", indent(&body, "  "))
            } else {
                body
            };
            Ok(Artifact::code(format!(
                "connectedCallback() {{\n  super.connectedCallback();\n{}\n}}",
                indent(&body, "  ")
            )))
        })
        .with_on_destroy(|hook, ctx| {
            let body = rewrite(ctx.component, &hook.body, SnippetKind::Statements)?;
            let body = if hook.is_async {
                format!("(async () => {{\n{}\n}})();", indent(&body, "  "))
            } else {
                body
            };
            Ok(Artifact::code(format!(
                "disconnectedCallback() {{\n  super.disconnectedCallback();\n{}\n}}",
                indent(&body, "  ")
            )))
        })
        .with_styles(|styles, ctx| {
            if !styles.is_empty() {
                ctx.imports.named("css", LIT);
            }
            Ok(styles.to_string())
        })
        .with_template(|template, _, ctx| {
            let mut renderer = LitRenderer {
                component: ctx.component,
                imports: &mut ctx.imports,
            };
            let markup = compile_template(template, &mut renderer)?;
            Ok(Artifact::code(format!(
                "render() {{\n  return html`{}`;\n}}",
                markup
            )))
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRINTER
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print(result: &TransformerResult) -> Result<String, CompileError> {
    let selector = result
        .selector
        .as_deref()
        .ok_or_else(|| CompileError::missing_selector(Target::Lit))?;

    let mut sections: Vec<String> = Vec::new();
    if !result.imports.is_empty() {
        sections.push(result.imports.render());
    }
    if !result.declarations.is_empty() {
        sections.push(result.declarations.join("\n\n"));
    }

    let mut members: Vec<String> = Vec::new();
    if !result.styles.is_empty() {
        members.push(format!(
            "static styles = css`{}`;",
            escape_template_literal(&result.styles)
        ));
    }
    members.extend(result.props.iter().map(|p| p.code().to_string()));
    members.extend(result.state.iter().map(|s| s.code().to_string()));
    members.extend(result.refs.iter().map(|r| r.code().to_string()));
    members.extend(result.ordered_computed().map(|c| c.code().to_string()));
    members.extend(result.ordered_methods().map(|m| m.code().to_string()));
    members.extend(result.on_init.as_ref().map(|h| h.code().to_string()));
    members.extend(result.on_destroy.as_ref().map(|h| h.code().to_string()));
    members.extend(result.template.artifact().map(|a| a.code.clone()));

    let fires: Vec<&str> = result.events.iter().filter_map(|e| e.declaration()).collect();
    let mut class = String::new();
    if !fires.is_empty() {
        class.push_str("/**\n");
        for tag in fires {
            class.push_str(&format!(" * {}\n", tag));
        }
        class.push_str(" */\n");
    }
    class.push_str(&format!(
        "@customElement(\"{}\")\nexport class {} extends LitElement {{\n{}\n}}",
        selector,
        result.name,
        indent(&members.join("\n\n"), "  ")
    ));
    sections.push(class);
    Ok(sections.join("\n\n") + "\n")
}
