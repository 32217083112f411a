//! React backend.
//!
//! Components become function components: state lives in `useState` with mutations
//! rewritten to functional setter calls, computed values and methods are memoized with
//! inferred dependency lists, and the template is returned as JSX.

use serde_json::{json, Value};

use crate::compiler::{
    compile_template, ForParts, RenderedValue, ShowParts, SlotParts, TemplateRenderer, FOR_TAG,
    SHOW_TAG, SLOT_TAG,
};
use crate::deps::{infer_dependencies, ReactiveScope};
use crate::error::CompileError;
use crate::imports::ImportRegistrar;
use crate::ir::{
    AttributeNode, AttributeValue, ComponentMetadata, MapEntry, ProviderClassMetadata,
    TemplateNode,
};
use crate::mutation::{rewrite_body, UpdateStyle};
use crate::parse::{capitalize, indent, is_identifier, literal_type, to_camel_case, SnippetKind};
use crate::rewrite::MemberResolver;
use crate::style::{escape_template_literal, scope_id, scope_styles};
use crate::target::Target;
use crate::transform::{Artifact, TransformContext, Transformer, TransformerResult};

const REACT: &str = "react";
const SCOPE_KEY: &str = "react.scope";
const PROVIDERS_KEY: &str = "react.providers";

pub fn setter_name(member: &str) -> String {
    format!("set{}", capitalize(member))
}

fn context_name(token: &str) -> String {
    format!("{}Context", token)
}

fn with_comments(comments: &[String], code: String) -> String {
    if comments.is_empty() {
        code
    } else {
        format!("{}\n{}", comments.join("\n"), code)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REWRITING
// ═══════════════════════════════════════════════════════════════════════════════

struct ReactResolver<'c> {
    component: &'c ComponentMetadata,
}

impl MemberResolver for ReactResolver<'_> {
    fn read(&self, member: &str) -> Option<String> {
        if self.component.is_ref(member) {
            Some(format!("{}.current", member))
        } else if self.component.has_member(member) {
            Some(member.to_string())
        } else {
            None
        }
    }

    fn emit(&self, member: &str, args: &str) -> Option<String> {
        self.component
            .event(member)
            .map(|_| format!("{}?.({})", member, args))
    }
}

fn rewrite(component: &ComponentMetadata, code: &str, kind: SnippetKind) -> Result<String, CompileError> {
    let setter = |member: &str| component.is_state(member).then(|| setter_name(member));
    rewrite_body(code, kind, &UpdateStyle::Setter(&setter), &ReactResolver { component })
}

fn reactive_scope(component: &ComponentMetadata) -> ReactiveScope {
    ReactiveScope::new()
        .with_members(component.props.iter().map(|p| p.name.as_str()))
        .with_members(component.state.iter().map(|s| s.name.as_str()))
        .with_members(component.computed.iter().map(|c| c.name.as_str()))
        .with_members(component.events.iter().map(|e| e.name.as_str()))
        .with_members(component.providers.iter().map(|p| p.name.as_str()))
        .with_members(component.injects.iter().map(|i| i.name.as_str()))
        .with_members(component.methods.iter().map(|m| m.name.as_str()))
        .with_stateful(component.state.iter().map(|s| s.name.as_str()))
        .with_free(component.state.iter().map(|s| setter_name(&s.name)))
}

/// Dependency list of a memoized member, without the member itself.
fn dependency_list(
    component: &ComponentMetadata,
    own: &str,
    code: &str,
    kind: SnippetKind,
) -> Result<String, CompileError> {
    let deps = infer_dependencies(code, kind, &reactive_scope(component))?;
    Ok(deps
        .into_iter()
        .filter(|d| d != own)
        .collect::<Vec<_>>()
        .join(", "))
}

fn generic(type_annotation: Option<&str>) -> String {
    type_annotation
        .map(|t| format!("<{}>", t))
        .unwrap_or_default()
}

/// Registers the `TokenContext` import from the module the token class comes from.
fn import_context(token: &str, ctx: &mut TransformContext<'_>) {
    match ctx.component.import_source_of(token) {
        Some(module) => {
            let module = module.to_string();
            ctx.imports.named(&context_name(token), &module);
        }
        None => tracing::warn!(
            component = %ctx.component.name,
            token,
            "provider class is not imported; assuming its context is in scope"
        ),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE RENDERER
// ═══════════════════════════════════════════════════════════════════════════════

struct ReactRenderer<'c> {
    component: &'c ComponentMetadata,
    imports: &'c mut ImportRegistrar,
}

fn intrinsic(tag: &str) -> bool {
    tag.chars().next().map(|c| c.is_lowercase()).unwrap_or(false)
}

fn jsx_attribute_name<'n>(tag: &str, name: &'n str) -> &'n str {
    match name {
        "class" if intrinsic(tag) => "className",
        "for" if intrinsic(tag) => "htmlFor",
        other => other,
    }
}

fn join_attributes(attributes: &[String]) -> String {
    attributes.iter().map(|a| format!(" {}", a)).collect()
}

impl TemplateRenderer for ReactRenderer<'_> {
    fn target(&self) -> Target {
        Target::React
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
        Ok(format!(
            "<{tag}{}>{}</{tag}>",
            join_attributes(&attributes),
            children.concat()
        ))
    }

    fn self_closing_element(&mut self, tag: &str, attributes: Vec<String>) -> Result<String, CompileError> {
        Ok(format!("<{}{} />", tag, join_attributes(&attributes)))
    }

    fn fragment(&mut self, children: Vec<String>) -> Result<String, CompileError> {
        Ok(format!("<>{}</>", children.concat()))
    }

    fn attribute(&mut self, tag: &str, name: &str, value: &RenderedValue) -> Result<String, CompileError> {
        let name = jsx_attribute_name(tag, name);
        Ok(match value {
            RenderedValue::Boolean => name.to_string(),
            RenderedValue::Static(s) if s.contains('"') => {
                format!("{}={{{}}}", name, Value::from(s.as_str()))
            }
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

    fn reference(&mut self, _tag: &str, member: &str) -> Result<String, CompileError> {
        Ok(format!("ref={{{}}}", member))
    }

    fn slot(&mut self, parts: SlotParts) -> Result<String, CompileError> {
        if parts.fallback.is_empty() {
            Ok(format!("{{{}}}", parts.prop))
        } else {
            Ok(format!("{{{} ?? <>{}</>}}", parts.prop, parts.fallback.concat()))
        }
    }

    fn show(&mut self, parts: ShowParts) -> Result<String, CompileError> {
        let fallback = match parts.fallback {
            Some(fallback) => format!("(<>{}</>)", fallback),
            None => "null".to_string(),
        };
        Ok(format!(
            "{{{} ? (<>{}</>) : {}}}",
            parts.when,
            parts.body.concat(),
            fallback
        ))
    }

    fn for_each(&mut self, parts: ForParts) -> Result<String, CompileError> {
        self.imports.named("Fragment", REACT);
        let index = parts.index.unwrap_or_else(|| "__index".to_string());
        let key = parts.key.unwrap_or_else(|| index.clone());
        Ok(format!(
            "{{{}.map(({}, {}) => (<Fragment key={{{}}}>{}</Fragment>))}}",
            parts.each, parts.item, index, key, parts.body
        ))
    }

    fn merges_static_class(&self) -> bool {
        true
    }

    fn class_map(
        &mut self,
        tag: &str,
        name: &str,
        entries: &[MapEntry],
        _code: &str,
    ) -> Result<String, CompileError> {
        let classes: Vec<String> = entries
            .iter()
            .map(|e| {
                let class = Value::from(e.key.as_str());
                if e.value == "true" {
                    class.to_string()
                } else {
                    format!("({}) && {}", e.value, class)
                }
            })
            .collect();
        Ok(format!(
            "{}={{[{}].filter(Boolean).join(\" \")}}",
            jsx_attribute_name(tag, name),
            classes.join(", ")
        ))
    }

    fn style_map(&mut self, _tag: &str, entries: &[MapEntry], _code: &str) -> Result<String, CompileError> {
        let properties: Vec<String> = entries
            .iter()
            .map(|e| {
                let key = if e.key.starts_with("--") {
                    Value::from(e.key.as_str()).to_string()
                } else {
                    to_camel_case(&e.key)
                };
                let key = if is_identifier(&key) || key.starts_with('"') {
                    key
                } else {
                    Value::from(key.as_str()).to_string()
                };
                format!("{}: {}", key, e.value)
            })
            .collect();
        Ok(format!("style={{{{ {} }}}}", properties.join(", ")))
    }
}

/// Adds the scope attribute to the root element, or to each element of a root fragment.
fn with_scope(template: &TemplateNode, scope: &str) -> TemplateNode {
    fn mark(node: &mut TemplateNode, scope: &str) {
        let attributes = match node {
            TemplateNode::Element(el) if ![SLOT_TAG, SHOW_TAG, FOR_TAG].contains(&el.tag.as_str()) => {
                &mut el.attributes
            }
            TemplateNode::SelfClosingElement(el)
                if ![SLOT_TAG, SHOW_TAG, FOR_TAG].contains(&el.tag.as_str()) =>
            {
                &mut el.attributes
            }
            _ => return,
        };
        attributes.push(AttributeNode {
            name: scope.to_string(),
            value: AttributeValue::Boolean,
        });
    }

    let mut root = template.clone();
    match &mut root {
        TemplateNode::Fragment(frag) => {
            for child in &mut frag.children {
                mark(child, scope);
            }
        }
        other => mark(other, scope),
    }
    root
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORMER
// ═══════════════════════════════════════════════════════════════════════════════

pub fn transformer() -> Transformer {
    Transformer::new()
        .with_prop(|prop, _| {
            let ty = prop
                .type_annotation
                .clone()
                .or_else(|| {
                    prop.default_value
                        .as_deref()
                        .map(|d| literal_type(d).to_string())
                })
                .unwrap_or_else(|| "unknown".to_string());
            let optional = if prop.optional { "?" } else { "" };
            let code = match &prop.default_value {
                Some(default) => format!("{} = {}", prop.name, default),
                None => prop.name.clone(),
            };
            let declaration = with_comments(&prop.comments, format!("{}{}: {};", prop.name, optional, ty));
            Ok(Artifact::code(code).with_declaration(declaration))
        })
        .with_state(|state, ctx| {
            ctx.imports.named("useState", REACT);
            let init = match &state.initializer {
                Some(init) => rewrite(ctx.component, init, SnippetKind::Expression)?,
                None => String::new(),
            };
            let code = format!(
                "const [{}, {}] = useState{}({});",
                state.name,
                setter_name(&state.name),
                generic(state.type_annotation.as_deref()),
                init
            );
            Ok(Artifact::code(with_comments(&state.comments, code)))
        })
        .with_computed(|computed, ctx| {
            ctx.imports.named("useMemo", REACT);
            let deps = dependency_list(
                ctx.component,
                &computed.name,
                &computed.expression,
                SnippetKind::Expression,
            )?;
            let expression = rewrite(ctx.component, &computed.expression, SnippetKind::Expression)?;
            let code = format!(
                "const {} = useMemo{}(() => {}, [{}]);",
                computed.name,
                generic(computed.return_type.as_deref()),
                expression,
                deps
            );
            Ok(Artifact::code(with_comments(&computed.comments, code)))
        })
        .with_event(|event, _| {
            let signature = match &event.payload_type {
                Some(payload) => format!("(value: {}) => void", payload),
                None => "() => void".to_string(),
            };
            let declaration = with_comments(&event.comments, format!("{}?: {};", event.name, signature));
            Ok(Artifact::code(event.name.clone()).with_declaration(declaration))
        })
        .with_reference(|reference, ctx| {
            ctx.imports.named("useRef", REACT);
            let ty = reference
                .type_annotation
                .as_deref()
                .map(|t| format!("<{} | null>", t))
                .unwrap_or_default();
            let code = format!("const {} = useRef{}(null);", reference.name, ty);
            Ok(Artifact::code(with_comments(&reference.comments, code)))
        })
        .with_provider(|provider, ctx| {
            ctx.imports.named("useMemo", REACT);
            import_context(&provider.token, ctx);
            let mut providers = match ctx.scratch.remove(PROVIDERS_KEY) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            providers.push(json!({
                "context": context_name(&provider.token),
                "value": provider.name,
            }));
            ctx.set(PROVIDERS_KEY, Value::Array(providers));
            let init = rewrite(ctx.component, &provider.initializer, SnippetKind::Expression)?;
            let code = format!(
                "const {} = useMemo{}(() => {}, []);",
                provider.name,
                generic(provider.type_annotation.as_deref()),
                init
            );
            Ok(Artifact::code(with_comments(&provider.comments, code)))
        })
        .with_inject(|inject, ctx| {
            ctx.imports.named("useContext", REACT);
            import_context(&inject.token, ctx);
            let code = format!(
                "const {} = useContext({})!;",
                inject.name,
                context_name(&inject.token)
            );
            Ok(Artifact::code(with_comments(&inject.comments, code)))
        })
        .with_method(|method, ctx| {
            ctx.imports.named("useCallback", REACT);
            let deps = dependency_list(ctx.component, &method.name, &method.body, SnippetKind::Statements)?;
            let body = rewrite(ctx.component, &method.body, SnippetKind::Statements)?;
            let code = format!(
                "const {} = useCallback({}({}){} => {{\n{}\n}}, [{}]);",
                method.name,
                if method.is_async { "async " } else { "" },
                method.params,
                method
                    .return_type
                    .as_deref()
                    .map(|t| format!(": {}", t))
                    .unwrap_or_default(),
                indent(&body, "  "),
                deps
            );
            Ok(Artifact::code(with_comments(&method.comments, code)))
        })
        .with_on_init(|hook, ctx| {
            ctx.imports.named("useEffect", REACT);
            let body = rewrite(ctx.component, &hook.body, SnippetKind::Statements)?;
            let code = if hook.is_async {
                format!("(async () => {{\n{}\n}})();", indent(&body, "  "))
            } else {
                body
            };
            Ok(Artifact::code(code))
        })
        .with_on_destroy(|hook, ctx| {
            ctx.imports.named("useEffect", REACT);
            Ok(Artifact::code(rewrite(ctx.component, &hook.body, SnippetKind::Statements)?))
        })
        .with_slots(|slots, ctx| {
            let mut props: Vec<String> = Vec::new();
            for slot in slots {
                let prop = if slot == "default" { "children".to_string() } else { slot.clone() };
                if !props.contains(&prop) {
                    props.push(prop);
                }
            }
            if props.is_empty() {
                return Ok(Artifact::default());
            }
            ctx.imports.type_named("ReactNode", REACT);
            let declaration = props
                .iter()
                .map(|p| format!("{}?: ReactNode;", p))
                .collect::<Vec<_>>()
                .join("\n");
            Ok(Artifact::code(props.join(", ")).with_declaration(declaration))
        })
        .with_styles(|styles, ctx| {
            if styles.is_empty() {
                return Ok(String::new());
            }
            let scope = scope_id(&ctx.component.name, styles);
            let scoped = scope_styles(&scope, styles);
            ctx.set(SCOPE_KEY, scope);
            Ok(scoped)
        })
        .with_template(|template, styles, ctx| {
            let root = match ctx.get_str(SCOPE_KEY) {
                Some(scope) => with_scope(template, scope),
                None => template.clone(),
            };
            let mut renderer = ReactRenderer {
                component: ctx.component,
                imports: &mut ctx.imports,
            };
            let mut markup = compile_template(&root, &mut renderer)?;
            if !styles.is_empty() {
                markup = format!("<><style>{{styles}}</style>{}</>", markup);
            }
            if let Some(Value::Array(providers)) = ctx.scratch.get(PROVIDERS_KEY) {
                for provider in providers.iter().rev() {
                    let context = provider["context"].as_str().unwrap_or_default();
                    let value = provider["value"].as_str().unwrap_or_default();
                    markup = format!(
                        "<{context}.Provider value={{{value}}}>{markup}</{context}.Provider>"
                    );
                }
            }
            Ok(Artifact::code(markup))
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRINTER
// ═══════════════════════════════════════════════════════════════════════════════

fn effect(result: &TransformerResult) -> Option<String> {
    let init = result.on_init.as_ref().map(|h| h.code().to_string());
    let destroy = result.on_destroy.as_ref().map(|h| h.code().to_string());
    if init.is_none() && destroy.is_none() {
        return None;
    }
    let mut body = Vec::new();
    if let Some(init) = init {
        body.push(init);
    }
    if let Some(destroy) = destroy {
        body.push(format!("return () => {{\n{}\n}};", indent(&destroy, "  ")));
    }
    Some(format!(
        "useEffect(() => {{\n{}\n}}, []);",
        indent(&body.join("\n"), "  ")
    ))
}

pub fn print(result: &TransformerResult) -> Result<String, CompileError> {
    let mut sections: Vec<String> = Vec::new();
    if !result.imports.is_empty() {
        sections.push(result.imports.render());
    }
    if !result.declarations.is_empty() {
        sections.push(result.declarations.join("\n\n"));
    }
    if !result.styles.is_empty() {
        sections.push(format!(
            "const styles = `{}`;",
            escape_template_literal(&result.styles)
        ));
    }

    let fields: Vec<&str> = result
        .props
        .iter()
        .filter_map(|p| p.declaration())
        .chain(result.events.iter().filter_map(|e| e.declaration()))
        .chain(result.slots.declaration())
        .collect();
    sections.push(if fields.is_empty() {
        format!("export interface {}Props {{}}", result.name)
    } else {
        format!(
            "export interface {}Props {{\n{}\n}}",
            result.name,
            indent(&fields.join("\n"), "  ")
        )
    });

    let params: Vec<&str> = result
        .props
        .iter()
        .map(|p| p.code())
        .chain(result.events.iter().map(|e| e.code()))
        .chain(result.slots.artifact().map(|a| a.code.as_str()))
        .filter(|p| !p.is_empty())
        .collect();
    let mut body: Vec<String> = Vec::new();
    body.extend(result.state.iter().map(|s| s.code().to_string()));
    body.extend(result.refs.iter().map(|r| r.code().to_string()));
    body.extend(result.injects.iter().map(|i| i.code().to_string()));
    body.extend(result.providers.iter().map(|p| p.code().to_string()));
    body.extend(result.ordered_computed().map(|c| c.code().to_string()));
    body.extend(result.ordered_methods().map(|m| m.code().to_string()));
    body.extend(effect(result));
    let markup = result
        .template
        .artifact()
        .map(|a| a.code.clone())
        .unwrap_or_default();
    body.push(format!("return (\n  {}\n);", markup));

    let params = if params.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", params.join(", "))
    };
    sections.push(format!(
        "export function {}({}: {}Props) {{\n{}\n}}",
        result.name,
        params,
        result.name,
        indent(&body.join("\n\n"), "  ")
    ));
    Ok(sections.join("\n\n") + "\n")
}

/// Provider class plus the context consumers inject it through.
pub fn print_provider(provider: &ProviderClassMetadata) -> String {
    let mut imports = ImportRegistrar::new();
    imports.named("createContext", REACT);
    for import in &provider.imports {
        imports.register(import);
    }
    let mut sections = vec![imports.render()];
    if !provider.declarations.is_empty() {
        sections.push(provider.declarations.join("\n\n"));
    }
    sections.push(provider.source.clone());
    sections.push(format!(
        "export const {} = createContext<{} | null>(null);",
        context_name(&provider.name),
        provider.name
    ));
    sections.join("\n\n") + "\n"
}
