//! Vue backend: single-file components with `<script setup lang="ts">`.
//!
//! State and computed values are refs, so script reads go through `.value` while the
//! template reads every member bare. No mutation rewrite is needed: refs are reactive
//! under in-place writes.

use crate::compiler::{
    compile_template, event_attribute, html_attribute_name, ForParts, RenderedValue, ShowParts,
    SlotParts, TemplateRenderer,
};
use crate::error::CompileError;
use crate::imports::ImportRegistrar;
use crate::ir::{ComponentMetadata, MapEntry, ProviderClassMetadata};
use crate::parse::{indent, literal_type, SnippetKind};
use crate::rewrite::{rewrite_members, MemberResolver};
use crate::target::Target;
use crate::transform::{Artifact, Transformer, TransformerResult};

const VUE: &str = "vue";

fn emit_call(component: &ComponentMetadata, member: &str, args: &str) -> Option<String> {
    component.event(member).map(|event| {
        if args.is_empty() {
            format!("emit(\"{}\")", event.event_name)
        } else {
            format!("emit(\"{}\", {})", event.event_name, args)
        }
    })
}

/// Reads inside `<script setup>`.
struct ScriptResolver<'c> {
    component: &'c ComponentMetadata,
}

impl MemberResolver for ScriptResolver<'_> {
    fn read(&self, member: &str) -> Option<String> {
        let c = self.component;
        if c.is_state(member) || c.is_computed(member) || c.is_ref(member) {
            Some(format!("{}.value", member))
        } else if c.is_prop(member) {
            Some(format!("props.{}", member))
        } else if c.has_member(member) {
            Some(member.to_string())
        } else {
            None
        }
    }

    fn emit(&self, member: &str, args: &str) -> Option<String> {
        emit_call(self.component, member, args)
    }
}

/// Reads inside `<template>`, where refs are unwrapped.
struct TemplateResolver<'c> {
    component: &'c ComponentMetadata,
}

impl MemberResolver for TemplateResolver<'_> {
    fn read(&self, member: &str) -> Option<String> {
        self.component.has_member(member).then(|| member.to_string())
    }

    fn emit(&self, member: &str, args: &str) -> Option<String> {
        emit_call(self.component, member, args)
    }
}

fn script(component: &ComponentMetadata, code: &str, kind: SnippetKind) -> Result<String, CompileError> {
    rewrite_members(code, kind, &ScriptResolver { component })
}

fn with_comments(comments: &[String], code: String) -> String {
    if comments.is_empty() {
        code
    } else {
        format!("{}\n{}", comments.join("\n"), code)
    }
}

/// Escapes expression code placed inside a double-quoted template attribute.
fn quote(code: &str) -> String {
    format!("\"{}\"", code.replace('&', "&amp;").replace('"', "&quot;"))
}

/// Quotes a static attribute value. Entities in it are already markup.
fn quote_static(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "&quot;"))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE RENDERER
// ═══════════════════════════════════════════════════════════════════════════════

struct VueRenderer<'c> {
    component: &'c ComponentMetadata,
}

fn join_attributes(attributes: &[String]) -> String {
    attributes.iter().map(|a| format!(" {}", a)).collect()
}

impl TemplateRenderer for VueRenderer<'_> {
    fn target(&self) -> Target {
        Target::Vue
    }

    fn script(&mut self, code: &str) -> Result<String, CompileError> {
        rewrite_members(
            code,
            SnippetKind::Expression,
            &TemplateResolver {
                component: self.component,
            },
        )
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
            RenderedValue::Static(s) => Ok(format!("{}={}", name, quote_static(s))),
            RenderedValue::Expression(code) => match event_attribute(name) {
                Some(event) => Ok(format!("@{}={}", event, quote(code))),
                None => Ok(format!(":{}={}", name, quote(code))),
            },
            RenderedValue::Template(_) => Err(CompileError::backend(
                Target::Vue,
                format!("markup as the value of attribute `{}`", name),
            )),
        }
    }

    fn text(&mut self, text: &str) -> Result<String, CompileError> {
        Ok(text.to_string())
    }

    fn expression(&mut self, code: &str) -> Result<String, CompileError> {
        Ok(format!("{{{{ {} }}}}", code))
    }

    fn reference(&mut self, _tag: &str, member: &str) -> Result<String, CompileError> {
        Ok(format!("ref=\"{}\"", member))
    }

    fn slot(&mut self, parts: SlotParts) -> Result<String, CompileError> {
        let name = parts
            .name
            .map(|n| format!(" name={}", quote(&n)))
            .unwrap_or_default();
        if parts.fallback.is_empty() {
            Ok(format!("<slot{} />", name))
        } else {
            Ok(format!("<slot{}>{}</slot>", name, parts.fallback.concat()))
        }
    }

    fn show(&mut self, parts: ShowParts) -> Result<String, CompileError> {
        let mut out = format!(
            "<template v-if={}>{}</template>",
            quote(&parts.when),
            parts.body.concat()
        );
        if let Some(fallback) = parts.fallback {
            out.push_str(&format!("<template v-else>{}</template>", fallback));
        }
        Ok(out)
    }

    fn for_each(&mut self, parts: ForParts) -> Result<String, CompileError> {
        let binders = match &parts.index {
            Some(index) => format!("({}, {})", parts.item, index),
            None => parts.item.clone(),
        };
        let key = parts
            .key
            .map(|k| format!(" :key={}", quote(&k)))
            .unwrap_or_default();
        Ok(format!(
            "<template v-for={}{}>{}</template>",
            quote(&format!("{} in {}", binders, parts.each)),
            key,
            parts.body
        ))
    }

    fn class_map(
        &mut self,
        _tag: &str,
        _name: &str,
        _entries: &[MapEntry],
        code: &str,
    ) -> Result<String, CompileError> {
        Ok(format!(":class={}", quote(code)))
    }

    fn style_map(&mut self, _tag: &str, _entries: &[MapEntry], code: &str) -> Result<String, CompileError> {
        Ok(format!(":style={}", quote(code)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORMER
// ═══════════════════════════════════════════════════════════════════════════════

/// Default entry for `withDefaults`; non-primitive values need a factory.
fn default_entry(name: &str, value: &str) -> String {
    let value = value.trim();
    if literal_type(value) != "unknown" || value == "null" || value == "undefined" {
        format!("{}: {}", name, value)
    } else if value.starts_with('{') {
        format!("{}: () => ({})", name, value)
    } else {
        format!("{}: () => {}", name, value)
    }
}

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
            let code = prop
                .default_value
                .as_deref()
                .map(|d| default_entry(&prop.name, d))
                .unwrap_or_default();
            let declaration = with_comments(&prop.comments, format!("{}{}: {};", prop.name, optional, ty));
            Ok(Artifact::code(code).with_declaration(declaration))
        })
        .with_event(|event, _| {
            let params = match &event.payload_type {
                Some(payload) => format!("e: \"{}\", value: {}", event.event_name, payload),
                None => format!("e: \"{}\"", event.event_name),
            };
            Ok(Artifact::default().with_declaration(format!("({}): void;", params)))
        })
        .with_state(|state, ctx| {
            ctx.imports.named("ref", VUE);
            let init = match &state.initializer {
                Some(init) => script(ctx.component, init, SnippetKind::Expression)?,
                None => String::new(),
            };
            let ty = state
                .type_annotation
                .as_deref()
                .map(|t| format!("<{}>", t))
                .unwrap_or_default();
            let code = format!("const {} = ref{}({});", state.name, ty, init);
            Ok(Artifact::code(with_comments(&state.comments, code)))
        })
        .with_computed(|computed, ctx| {
            ctx.imports.named("computed", VUE);
            let expression = script(ctx.component, &computed.expression, SnippetKind::Expression)?;
            let ty = computed
                .return_type
                .as_deref()
                .map(|t| format!("<{}>", t))
                .unwrap_or_default();
            let code = format!("const {} = computed{}(() => {});", computed.name, ty, expression);
            Ok(Artifact::code(with_comments(&computed.comments, code)))
        })
        .with_reference(|reference, ctx| {
            ctx.imports.named("ref", VUE);
            let ty = reference
                .type_annotation
                .as_deref()
                .map(|t| format!("<{} | null>", t))
                .unwrap_or_default();
            let code = format!("const {} = ref{}(null);", reference.name, ty);
            Ok(Artifact::code(with_comments(&reference.comments, code)))
        })
        .with_provider(|provider, ctx| {
            ctx.imports.named("provide", VUE);
            let init = script(ctx.component, &provider.initializer, SnippetKind::Expression)?;
            let ty = provider
                .type_annotation
                .as_deref()
                .map(|t| format!(": {}", t))
                .unwrap_or_default();
            let code = format!(
                "const {name}{ty} = {init};\nprovide(\"{token}\", {name});",
                name = provider.name,
                token = provider.token
            );
            Ok(Artifact::code(with_comments(&provider.comments, code)))
        })
        .with_inject(|inject, ctx| {
            ctx.imports.named("inject", VUE);
            let code = format!(
                "const {} = inject<{}>(\"{}\")!;",
                inject.name, inject.token, inject.token
            );
            Ok(Artifact::code(with_comments(&inject.comments, code)))
        })
        .with_method(|method, ctx| {
            let body = script(ctx.component, &method.body, SnippetKind::Statements)?;
            let code = format!(
                "{}function {}({}){} {{\n{}\n}}",
                if method.is_async { "async " } else { "" },
                method.name,
                method.params,
                method
                    .return_type
                    .as_deref()
                    .map(|t| format!(": {}", t))
                    .unwrap_or_default(),
                indent(&body, "  ")
            );
            Ok(Artifact::code(with_comments(&method.comments, code)))
        })
        .with_on_init(|hook, ctx| {
            ctx.imports.named("onMounted", VUE);
            let body = script(ctx.component, &hook.body, SnippetKind::Statements)?;
            Ok(Artifact::code(format!(
                "onMounted({}() => {{\n{}\n}});",
                if hook.is_async { "async " } else { "" },
                indent(&body, "  ")
            )))
        })
        .with_on_destroy(|hook, ctx| {
            ctx.imports.named("onUnmounted", VUE);
            let body = script(ctx.component, &hook.body, SnippetKind::Statements)?;
            Ok(Artifact::code(format!(
                "onUnmounted({}() => {{\n{}\n}});",
                if hook.is_async { "async " } else { "" },
                indent(&body, "  ")
            )))
        })
        .with_template(|template, _, ctx| {
            let mut renderer = VueRenderer {
                component: ctx.component,
            };
            Ok(Artifact::code(compile_template(template, &mut renderer)?))
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRINTER
// ═══════════════════════════════════════════════════════════════════════════════

fn props_block(result: &TransformerResult) -> Option<String> {
    if result.props.is_empty() {
        return None;
    }
    let fields: Vec<&str> = result.props.iter().filter_map(|p| p.declaration()).collect();
    let defaults: Vec<&str> = result
        .props
        .iter()
        .map(|p| p.code())
        .filter(|c| !c.is_empty())
        .collect();
    let define = format!("defineProps<{{\n{}\n}}>()", indent(&fields.join("\n"), "  "));
    Some(if defaults.is_empty() {
        format!("const props = {};", define)
    } else {
        format!(
            "const props = withDefaults({}, {{\n{}\n}});",
            define,
            indent(&defaults.join(",\n"), "  ")
        )
    })
}

fn emits_block(result: &TransformerResult) -> Option<String> {
    let signatures: Vec<&str> = result.events.iter().filter_map(|e| e.declaration()).collect();
    if signatures.is_empty() {
        return None;
    }
    Some(format!(
        "const emit = defineEmits<{{\n{}\n}}>();",
        indent(&signatures.join("\n"), "  ")
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
    script.extend(props_block(result));
    script.extend(emits_block(result));
    script.extend(result.state.iter().map(|s| s.code().to_string()));
    script.extend(result.refs.iter().map(|r| r.code().to_string()));
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
        "<script setup lang=\"ts\">\n{}\n</script>\n\n<template>\n  {}\n</template>\n",
        script.join("\n\n"),
        markup
    );
    if !result.styles.is_empty() {
        out.push_str(&format!("\n<style scoped>\n{}\n</style>\n", result.styles));
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

    const TODO: &str = r#"
import { Component, Prop, State, Computed, Event, Ref, Inject, EventEmitter } from "@tessera/core";
import { TodoStore } from "./todo-store";

@Component({ styles: ".done { opacity: 0.5; }" })
export class TodoList {
  @Prop() readonly title: string = "Todos";
  @Prop() readonly tags: string[] = [];
  @State() private items: string[] = [];
  @Computed() get count() { return this.items.length; }
  @Event() readonly onAdd = new EventEmitter<string>();
  @Ref() private input!: HTMLInputElement;
  @Inject() private readonly store!: TodoStore;

  onInit() { this.items = this.store.load(); }
  add(text: string) { this.items.push(text); this.onAdd.emit(text); }

  render() {
    return (
      <section class={{ empty: this.count === 0 }}>
        <h1>{this.title}</h1>
        <Show when={this.count > 0} fallback={<p>Nothing yet</p>}>
          <For each={this.items}>{(item, index) => <li key={index}>{item}</li>}</For>
        </Show>
        <input ref={this.input} />
        <button onClick={() => this.add("x")}>Add</button>
      </section>
    );
  }
}
"#;

    fn compile(source: &str) -> String {
        print(&transform(source, &transformer()).unwrap()).unwrap()
    }

    #[test]
    fn test_script_setup() {
        let out = compile(TODO);
        assert!(out.starts_with(
            "<script setup lang=\"ts\">\nimport { TodoStore } from \"./todo-store\";\nimport { ref, computed, inject, onMounted } from \"vue\";"
        ));
        assert!(out.contains(
            "const props = withDefaults(defineProps<{\n  title?: string;\n  tags?: string[];\n}>(), {\n  title: \"Todos\",\n  tags: () => []\n});"
        ));
        assert!(out.contains("const emit = defineEmits<{\n  (e: \"add\", value: string): void;\n}>();"));
        assert!(out.contains("const items = ref<string[]>([]);"));
        assert!(out.contains("const count = computed(() => items.value.length);"));
        assert!(out.contains("const input = ref<HTMLInputElement | null>(null);"));
        assert!(out.contains("const store = inject<TodoStore>(\"TodoStore\")!;"));
        assert!(out.contains("function add(text: string) {\n  items.value.push(text); emit(\"add\", text);\n}"));
        assert!(out.contains("onMounted(() => {\n  items.value = store.load();\n});"));
    }

    #[test]
    fn test_template() {
        let out = compile(TODO);
        assert!(out.contains("<section :class=\"{ empty: count === 0 }\">"));
        assert!(out.contains("<h1>{{ title }}</h1>"));
        assert!(out.contains(
            "<template v-if=\"count > 0\"><template v-for=\"(item, index) in items\" :key=\"index\"><li>{{ item }}</li></template></template><template v-else><p>Nothing yet</p></template>"
        ));
        assert!(out.contains("<input ref=\"input\" />"));
        assert!(out.contains("<button @click=\"() => add(&quot;x&quot;)\">Add</button>"));
        assert!(out.ends_with("<style scoped>\n.done { opacity: 0.5; }\n</style>\n"));
    }

    #[test]
    fn test_markup_attribute_is_unsupported() {
        let err = transform(
            r#"
import { Component } from "@tessera/core";
@Component()
class Card {
  render() { return <Layout header={<h1>Hi</h1>} />; }
}
"#,
            &transformer(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "BackendUnsupported");
    }
}
