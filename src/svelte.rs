//! Svelte backend.
//!
//! Svelte tracks assignments at compile time, so plain writes stay as they are and only
//! nested writes and in-place calls get a self-assignment to trigger invalidation.

use crate::compiler::{
    compile_template, event_attribute, html_attribute_name, ForParts, RenderedValue, ShowParts,
    SlotParts, TemplateRenderer,
};
use crate::error::CompileError;
use crate::imports::ImportRegistrar;
use crate::ir::{ComponentMetadata, MapEntry, ProviderClassMetadata};
use crate::mutation::{rewrite_body, UpdateStyle};
use crate::parse::{indent, to_kebab_case, SnippetKind};
use crate::rewrite::MemberResolver;
use crate::target::Target;
use crate::transform::{Artifact, Transformer, TransformerResult};

const SVELTE: &str = "svelte";

struct SvelteResolver<'c> {
    component: &'c ComponentMetadata,
}

impl MemberResolver for SvelteResolver<'_> {
    fn read(&self, member: &str) -> Option<String> {
        self.component.has_member(member).then(|| member.to_string())
    }

    fn emit(&self, member: &str, args: &str) -> Option<String> {
        self.component.event(member).map(|event| {
            if args.is_empty() {
                format!("dispatch(\"{}\")", event.event_name)
            } else {
                format!("dispatch(\"{}\", {})", event.event_name, args)
            }
        })
    }
}

fn rewrite(component: &ComponentMetadata, code: &str, kind: SnippetKind) -> Result<String, CompileError> {
    let invalidate = |member: &str| {
        (component.is_state(member) || component.is_prop(member))
            .then(|| format!("this.{0} = this.{0}", member))
    };
    rewrite_body(code, kind, &UpdateStyle::Invalidate(&invalidate), &SvelteResolver { component })
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

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE RENDERER
// ═══════════════════════════════════════════════════════════════════════════════

struct SvelteRenderer<'c> {
    component: &'c ComponentMetadata,
}

fn join_attributes(attributes: &[String]) -> String {
    attributes.iter().map(|a| format!(" {}", a)).collect()
}

impl TemplateRenderer for SvelteRenderer<'_> {
    fn target(&self) -> Target {
        Target::Svelte
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
        Ok(children.concat())
    }

    fn attribute(&mut self, _tag: &str, name: &str, value: &RenderedValue) -> Result<String, CompileError> {
        let name = html_attribute_name(name);
        match value {
            RenderedValue::Boolean => Ok(name.to_string()),
            RenderedValue::Static(s) => Ok(format!(
                "{}=\"{}\"",
                name,
                s.replace('"', "&quot;").replace('{', "&#123;").replace('}', "&#125;")
            )),
            RenderedValue::Expression(code) => match event_attribute(name) {
                Some(event) => Ok(format!("on:{}={{{}}}", event, code)),
                None => Ok(format!("{}={{{}}}", name, code)),
            },
            RenderedValue::Template(_) => Err(CompileError::backend(
                Target::Svelte,
                format!("markup as the value of attribute `{}`", name),
            )),
        }
    }

    fn text(&mut self, text: &str) -> Result<String, CompileError> {
        Ok(text.to_string())
    }

    fn expression(&mut self, code: &str) -> Result<String, CompileError> {
        Ok(format!("{{{}}}", code))
    }

    fn reference(&mut self, _tag: &str, member: &str) -> Result<String, CompileError> {
        Ok(format!("bind:this={{{}}}", member))
    }

    fn slot(&mut self, parts: SlotParts) -> Result<String, CompileError> {
        let name = parts
            .name
            .map(|n| format!(" name=\"{}\"", n))
            .unwrap_or_default();
        if parts.fallback.is_empty() {
            Ok(format!("<slot{} />", name))
        } else {
            Ok(format!("<slot{}>{}</slot>", name, parts.fallback.concat()))
        }
    }

    fn show(&mut self, parts: ShowParts) -> Result<String, CompileError> {
        let fallback = parts
            .fallback
            .map(|f| format!("{{:else}}{}", f))
            .unwrap_or_default();
        Ok(format!(
            "{{#if {}}}{}{}{{/if}}",
            parts.when,
            parts.body.concat(),
            fallback
        ))
    }

    fn for_each(&mut self, parts: ForParts) -> Result<String, CompileError> {
        let index = parts.index.map(|i| format!(", {}", i)).unwrap_or_default();
        let key = parts.key.map(|k| format!(" ({})", k)).unwrap_or_default();
        Ok(format!(
            "{{#each {} as {}{}{}}}{}{{/each}}",
            parts.each, parts.item, index, key, parts.body
        ))
    }

    fn class_map(
        &mut self,
        _tag: &str,
        _name: &str,
        entries: &[MapEntry],
        _code: &str,
    ) -> Result<String, CompileError> {
        Ok(entries
            .iter()
            .map(|e| format!("class:{}={{{}}}", e.key, e.value))
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn style_map(&mut self, _tag: &str, entries: &[MapEntry], _code: &str) -> Result<String, CompileError> {
        Ok(entries
            .iter()
            .map(|e| {
                let property = if e.key.starts_with("--") {
                    e.key.clone()
                } else {
                    to_kebab_case(&e.key)
                };
                format!("style:{}={{{}}}", property, e.value)
            })
            .collect::<Vec<_>>()
            .join(" "))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORMER
// ═══════════════════════════════════════════════════════════════════════════════

pub fn transformer() -> Transformer {
    Transformer::new()
        .with_prop(|prop, ctx| {
            let ty = typed(prop.type_annotation.as_deref());
            let code = match (&prop.default_value, prop.optional) {
                (Some(default), _) => format!(
                    "export let {}{} = {};",
                    prop.name,
                    ty,
                    rewrite(ctx.component, default, SnippetKind::Expression)?
                ),
                (None, true) => match prop.type_annotation.as_deref() {
                    Some(t) => format!("export let {}: {} | undefined = undefined;", prop.name, t),
                    None => format!("export let {} = undefined;", prop.name),
                },
                (None, false) => format!("export let {}{};", prop.name, ty),
            };
            Ok(Artifact::code(with_comments(&prop.comments, code)))
        })
        .with_state(|state, ctx| {
            let init = match &state.initializer {
                Some(init) => format!(" = {}", rewrite(ctx.component, init, SnippetKind::Expression)?),
                None => String::new(),
            };
            let code = format!(
                "let {}{}{};",
                state.name,
                typed(state.type_annotation.as_deref()),
                init
            );
            Ok(Artifact::code(with_comments(&state.comments, code)))
        })
        .with_computed(|computed, ctx| {
            let expression = rewrite(ctx.component, &computed.expression, SnippetKind::Expression)?;
            let code = format!(
                "let {}{};\n$: {} = {};",
                computed.name,
                typed(computed.return_type.as_deref()),
                computed.name,
                expression
            );
            Ok(Artifact::code(with_comments(&computed.comments, code)))
        })
        .with_event(|event, ctx| {
            ctx.imports.named("createEventDispatcher", SVELTE);
            let payload = event.payload_type.as_deref().unwrap_or("null");
            Ok(Artifact::default().with_declaration(format!("{}: {};", event.event_name, payload)))
        })
        .with_reference(|reference, _| {
            let code = format!(
                "let {}{};",
                reference.name,
                typed(reference.type_annotation.as_deref())
            );
            Ok(Artifact::code(with_comments(&reference.comments, code)))
        })
        .with_provider(|provider, ctx| {
            ctx.imports.named("setContext", SVELTE);
            let init = rewrite(ctx.component, &provider.initializer, SnippetKind::Expression)?;
            let code = format!(
                "const {name}{ty} = {init};\nsetContext(\"{token}\", {name});",
                name = provider.name,
                ty = typed(provider.type_annotation.as_deref()),
                token = provider.token
            );
            Ok(Artifact::code(with_comments(&provider.comments, code)))
        })
        .with_inject(|inject, ctx| {
            ctx.imports.named("getContext", SVELTE);
            let code = format!(
                "const {} = getContext<{}>(\"{}\");",
                inject.name, inject.token, inject.token
            );
            Ok(Artifact::code(with_comments(&inject.comments, code)))
        })
        .with_method(|method, ctx| {
            let body = rewrite(ctx.component, &method.body, SnippetKind::Statements)?;
            let code = format!(
                "{}function {}({}){} {{\n{}\n}}",
                if method.is_async { "async " } else { "" },
                method.name,
                method.params,
                typed(method.return_type.as_deref()),
                indent(&body, "  ")
            );
            Ok(Artifact::code(with_comments(&method.comments, code)))
        })
        .with_on_init(|hook, ctx| {
            ctx.imports.named("onMount", SVELTE);
            let body = rewrite(ctx.component, &hook.body, SnippetKind::Statements)?;
            Ok(Artifact::code(format!(
                "onMount({}() => {{\n{}\n}});",
                if hook.is_async { "async " } else { "" },
                indent(&body, "  ")
            )))
        })
        .with_on_destroy(|hook, ctx| {
            ctx.imports.named("onDestroy", SVELTE);
            let body = rewrite(ctx.component, &hook.body, SnippetKind::Statements)?;
            Ok(Artifact::code(format!(
                "onDestroy({}() => {{\n{}\n}});",
                if hook.is_async { "async " } else { "" },
                indent(&body, "  ")
            )))
        })
        .with_template(|template, _, ctx| {
            let mut renderer = SvelteRenderer {
                component: ctx.component,
            };
            Ok(Artifact::code(compile_template(template, &mut renderer)?))
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRINTER
// ═══════════════════════════════════════════════════════════════════════════════

fn dispatcher(result: &TransformerResult) -> Option<String> {
    let events: Vec<&str> = result.events.iter().filter_map(|e| e.declaration()).collect();
    if events.is_empty() {
        return None;
    }
    Some(format!(
        "const dispatch = createEventDispatcher<{{ {} }}>();",
        events.join(" ")
    ))
}

pub fn print(result: &TransformerResult) -> Result<String, CompileError> {
    let mut script: Vec<String> = Vec::new();
    if !result.imports.is_empty() {
        script.push(result.imports.render());
    }
    if !result.declarations.is_empty() {
        script.push(result.declarations.join("\n\n"));
    }
    script.extend(result.props.iter().map(|p| p.code().to_string()));
    script.extend(result.state.iter().map(|s| s.code().to_string()));
    script.extend(result.refs.iter().map(|r| r.code().to_string()));
    script.extend(dispatcher(result));
    script.extend(result.injects.iter().map(|i| i.code().to_string()));
    script.extend(result.providers.iter().map(|p| p.code().to_string()));
    script.extend(result.ordered_computed().map(|c| c.code().to_string()));
    script.extend(result.ordered_methods().map(|m| m.code().to_string()));
    script.extend(result.on_init.as_ref().map(|h| h.code().to_string()));
    script.extend(result.on_destroy.as_ref().map(|h| h.code().to_string()));

    let markup = result
        .template
        .artifact()
        .map(|a| a.code.clone())
        .unwrap_or_default();
    let mut out = format!(
        "<script lang=\"ts\">\n{}\n</script>\n\n{}\n",
        script.join("\n\n"),
        markup
    );
    if !result.styles.is_empty() {
        out.push_str(&format!("\n<style>\n{}\n</style>\n", result.styles));
    }
    Ok(out)
}

pub fn print_provider(provider: &ProviderClassMetadata) -> String {
    let mut imports = ImportRegistrar::new();
    for import in &provider.imports {
        imports.register(import);
    }
    let mut sections = Vec::new();
    if !imports.is_empty() {
        sections.push(imports.render());
    }
    if !provider.declarations.is_empty() {
        sections.push(provider.declarations.join("\n\n"));
    }
    sections.push(provider.source.clone());
    sections.join("\n\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::transform;

    const LIST: &str = r#"
import { Component, Prop, State, Computed, Event, Ref, Provide, EventEmitter } from "@tessera/core";
import { TodoStore } from "./todo-store";

@Component()
export class TodoList {
  @Prop() readonly title: string = "Todos";
  @State() private items: string[] = [];
  @State() private user = { name: "" };
  @Computed() get count(): number { return this.items.length; }
  @Event() readonly onClear = new EventEmitter<void>();
  @Ref() private input!: HTMLInputElement;
  @Provide() private store = new TodoStore();

  add(text: string) {
    this.items.push(text);
    this.user.name = text;
  }

  clear() { this.items = []; this.onClear.emit(); }

  onDestroy() { this.clear(); }

  render() {
    return (
      <ul class={{ empty: this.count === 0 }} style={{ fontSize: "12px" }}>
        <For each={this.items} key={item}>{(item) => <li>{item}</li>}</For>
        <input bind:value={this.user.name} ref={this.input} />
        <button onClick={() => this.clear()}>Clear</button>
        <slot name="footer">Nothing</slot>
      </ul>
    );
  }
}
"#;

    fn compile(source: &str) -> String {
        print(&transform(source, &transformer()).unwrap()).unwrap()
    }

    #[test]
    fn test_script() {
        let out = compile(LIST);
        assert!(out.contains("import { createEventDispatcher, setContext, onDestroy } from \"svelte\";"));
        assert!(out.contains("export let title: string = \"Todos\";"));
        assert!(out.contains("let items: string[] = [];"));
        assert!(out.contains("let count: number;\n$: count = items.length;"));
        assert!(out.contains("let input: HTMLInputElement;"));
        assert!(out.contains("const dispatch = createEventDispatcher<{ clear: void; }>();"));
        assert!(out.contains("const store = new TodoStore();\nsetContext(\"TodoStore\", store);"));
        assert!(out.contains(
            "function add(text: string) {\n  (items.push(text), items = items);\n  (user.name = text, user = user);\n}"
        ));
        assert!(out.contains("function clear() {\n  items = []; dispatch(\"clear\");\n}"));
        assert!(out.contains("onDestroy(() => {\n  clear();\n});"));
    }

    #[test]
    fn test_optional_prop_without_default() {
        let out = compile(
            r#"
import { Component, Prop } from "@tessera/core";
@Component()
class Badge {
  @Prop() readonly label?: string;
  @Prop() readonly count: number;
  render() { return <span>{this.label}{this.count}</span>; }
}
"#,
        );
        assert!(out.contains("export let label: string | undefined = undefined;"));
        assert!(out.contains("export let count: number;"));
    }

    #[test]
    fn test_markup() {
        let out = compile(LIST);
        assert!(out.contains("<ul class:empty={count === 0} style:font-size={\"12px\"}>"));
        assert!(out.contains("{#each items as item (item)}<li>{item}</li>{/each}"));
        assert!(out.contains("<input bind:value={user.name} bind:this={input} />"));
        assert!(out.contains("<button on:click={() => clear()}>Clear</button>"));
        assert!(out.contains("<slot name=\"footer\">Nothing</slot>"));
    }
}
