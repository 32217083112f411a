//! Extraction Tests
//!
//! Unit-level behavior of the extractor: unit shape checks, marker resolution, member
//! classification, comments, retained imports and the invariant violations.

#[cfg(test)]
mod tests {
    use crate::error::*;
    use crate::extract::{extract, extract_component};
    use crate::ir::{AttributeValue, SourceUnit, TemplateNode};
    use pretty_assertions::assert_eq;

    const TODO_LIST: &str = r#"
import { Component, Prop, State, Computed, Event, Ref, Inject, EventEmitter, Show, For } from "@tessera/core";
import { TodoStore } from "./todo-store";
import type { Todo } from "./types";

export interface Filter { done: boolean; }

@Component({ selector: "todo-list", styles: `.done { opacity: 0.5; }` })
export class TodoList {
  /** Heading text. */
  @Prop() readonly title: string = "Todos";
  @Prop() readonly filter?: Filter;
  @State() private items: Todo[] = [];
  @State() private draft = "";
  @Computed() get count() { return this.items.length; }
  @Event() readonly onItemAdded = new EventEmitter<string>();
  @Event() readonly onCleared = new EventEmitter<void>();
  @Ref() private input!: HTMLInputElement;
  @Inject() private readonly store!: TodoStore;

  onInit() { this.items = this.store.load(); }

  async add(text: string): Promise<void> {
    this.items.push({ text, done: false });
    this.onItemAdded.emit(text);
  }

  render() {
    return (
      <section>
        <slot name="header" />
        <Show when={this.count > 0} fallback={<p>Nothing yet</p>}>
          <For each={this.items}>{(item, index) => <li key={index}>{item.text}</li>}</For>
        </Show>
        <input ref={this.input} value={this.draft} />
        <slot />
      </section>
    );
  }
}
"#;

    fn component_with(members: &str) -> String {
        format!(
            "import {{ Component, Prop, State, Computed, Event, Ref, Inject, EventEmitter }} from \"@tessera/core\";\n\
             @Component()\n\
             class C {{\n{}\n  render() {{ return <div />; }}\n}}\n",
            members
        )
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Metadata
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_extraction_is_deterministic() {
        assert_eq!(extract(TODO_LIST).unwrap(), extract(TODO_LIST).unwrap());
    }

    #[test]
    fn test_component_options() {
        let c = extract_component(TODO_LIST).unwrap();
        assert_eq!(c.name, "TodoList");
        assert_eq!(c.selector.as_deref(), Some("todo-list"));
        assert_eq!(c.styles, ".done { opacity: 0.5; }");
    }

    #[test]
    fn test_members_land_in_role_slots() {
        let c = extract_component(TODO_LIST).unwrap();
        let names = |v: Vec<&str>| v.into_iter().map(String::from).collect::<Vec<_>>();
        assert_eq!(
            c.props.iter().map(|p| p.name.clone()).collect::<Vec<_>>(),
            names(vec!["title", "filter"])
        );
        assert_eq!(
            c.state.iter().map(|s| s.name.clone()).collect::<Vec<_>>(),
            names(vec!["items", "draft"])
        );
        assert_eq!(c.computed[0].expression, "this.items.length");
        assert_eq!(c.refs[0].type_annotation.as_deref(), Some("HTMLInputElement"));
        assert_eq!(c.injects[0].token, "TodoStore");
        assert_eq!(c.methods.len(), 1);
        assert!(c.on_init.is_some());
        assert!(c.on_destroy.is_none());
    }

    #[test]
    fn test_prop_defaults_and_optionality() {
        let c = extract_component(TODO_LIST).unwrap();
        assert_eq!(c.props[0].default_value.as_deref(), Some("\"Todos\""));
        assert!(c.props[0].optional);
        assert_eq!(c.props[1].default_value, None);
        assert!(c.props[1].optional);
        assert_eq!(c.props[1].type_annotation.as_deref(), Some("Filter"));
    }

    #[test]
    fn test_events() {
        let c = extract_component(TODO_LIST).unwrap();
        assert_eq!(c.events[0].event_name, "itemAdded");
        assert_eq!(c.events[0].payload_type.as_deref(), Some("string"));
        assert_eq!(c.events[1].event_name, "cleared");
        assert_eq!(c.events[1].payload_type.as_deref(), Some("void"));
    }

    #[test]
    fn test_methods() {
        let c = extract_component(TODO_LIST).unwrap();
        let add = &c.methods[0];
        assert_eq!(add.name, "add");
        assert_eq!(add.params, "text: string");
        assert_eq!(add.return_type.as_deref(), Some("Promise<void>"));
        assert!(add.is_async);
        assert_eq!(
            add.body,
            "this.items.push({ text, done: false });\nthis.onItemAdded.emit(text);"
        );
        assert_eq!(c.on_init.as_ref().unwrap().body, "this.items = this.store.load();");
    }

    #[test]
    fn test_leading_comments_are_recovered() {
        let c = extract_component(TODO_LIST).unwrap();
        assert_eq!(c.props[0].comments, vec!["/** Heading text. */".to_string()]);
        assert!(c.props[1].comments.is_empty());
    }

    #[test]
    fn test_slots_in_document_order() {
        let c = extract_component(TODO_LIST).unwrap();
        assert_eq!(c.slots, vec!["header".to_string(), "default".to_string()]);
    }

    #[test]
    fn test_retained_imports_and_declarations() {
        let c = extract_component(TODO_LIST).unwrap();
        let sources: Vec<&str> = c.imports.iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, vec!["./todo-store", "./types"]);
        assert!(c.imports[1].type_only);
        assert_eq!(c.import_source_of("TodoStore"), Some("./todo-store"));
        assert_eq!(c.declarations, vec!["export interface Filter { done: boolean; }".to_string()]);
    }

    #[test]
    fn test_template_root() {
        let c = extract_component(TODO_LIST).unwrap();
        assert_eq!(c.template.tag(), Some("section"));
        let input = c
            .template
            .children()
            .iter()
            .find(|n| n.tag() == Some("input"))
            .unwrap();
        assert_eq!(
            input.attribute("ref").map(|a| &a.value),
            Some(&AttributeValue::Expression("this.input".to_string()))
        );
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Markers
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_aliased_and_bare_markers() {
        let c = extract_component(
            r#"
import { Component as View, Prop as P, State } from "@tessera/core";
@View
class Aliased {
  @P() readonly label: string = "";
  @State private n = 0;
  render() { return <p>{this.label}</p>; }
}
"#,
        )
        .unwrap();
        assert_eq!(c.name, "Aliased");
        assert_eq!(c.props[0].name, "label");
        assert_eq!(c.state[0].name, "n");
    }

    #[test]
    fn test_namespace_markers() {
        let c = extract_component(
            r#"
import * as ts from "@tessera/core";
@ts.Component()
class Spaced {
  @ts.State() private n = 0;
  render() { return <p>{this.n}</p>; }
}
"#,
        )
        .unwrap();
        assert_eq!(c.state[0].name, "n");
        assert!(c.imports.is_empty());
    }

    #[test]
    fn test_provider_unit_strips_markers() {
        let unit = extract(
            r#"
import { Provider } from "@tessera/core";
import { Api } from "./api";

@Provider()
export class TodoStore {
  private api = new Api();
  load(): string[] { return []; }
}
"#,
        )
        .unwrap();
        let SourceUnit::Provider(provider) = unit else {
            panic!("expected a provider unit");
        };
        assert_eq!(provider.name, "TodoStore");
        assert!(provider.source.starts_with("export class TodoStore {"));
        assert!(!provider.source.contains("@Provider"));
        assert_eq!(provider.imports.len(), 1);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Unit shape
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_no_component() {
        let err = extract("export class Plain {}").unwrap_err();
        assert_eq!(err.code(), ERR_NO_COMPONENT);
        assert_eq!(err.kind(), "StructuralViolation");
    }

    #[test]
    fn test_multiple_components() {
        let err = extract(
            r#"
import { Component } from "@tessera/core";
@Component() class A { render() { return <a />; } }
@Component() class B { render() { return <b />; } }
"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), ERR_MULTIPLE_COMPONENTS);
        assert_eq!(err.location().map(|l| l.line), Some(4));
    }

    #[test]
    fn test_mixed_unit() {
        let err = extract(
            r#"
import { Component, Provider } from "@tessera/core";
@Provider() class S {}
@Component() class A { render() { return <a />; } }
"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), ERR_MIXED_UNIT);
    }

    #[test]
    fn test_extraneous_statement() {
        let err = extract(
            r#"
import { Component } from "@tessera/core";
const LIMIT = 10;
@Component() class A { render() { return <a />; } }
"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), ERR_EXTRANEOUS_STATEMENT);
    }

    #[test]
    fn test_non_literal_options() {
        let err = extract(
            r#"
import { Component } from "@tessera/core";
@Component({ selector: name })
class A { render() { return <a />; } }
"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), ERR_COMPONENT_OPTIONS);
    }

    #[test]
    fn test_parse_error() {
        let err = extract("class {").unwrap_err();
        assert_eq!(err.kind(), "Parse");
        assert_eq!(err.code(), ERR_PARSE);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Member invariants
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_prop_without_readonly_names_member() {
        let err = extract_component(&component_with("  @Prop() title: string = \"\";")).unwrap_err();
        assert_eq!(err.kind(), "MemberConstraintViolation");
        assert_eq!(err.code(), ERR_PROP_CONSTRAINT);
        assert!(err.to_string().contains("`title`"));
        assert_eq!(err.location().map(|l| l.line), Some(4));
    }

    #[test]
    fn test_event_without_readonly_names_member() {
        let err = extract_component(&component_with(
            "  @Event() onSave = new EventEmitter<string>();",
        ))
        .unwrap_err();
        assert_eq!(err.code(), ERR_EVENT_CONSTRAINT);
        assert!(err.to_string().contains("`onSave`"));
    }

    #[test]
    fn test_unmarked_field() {
        let err = extract_component(&component_with("  private cache = new Map();")).unwrap_err();
        assert_eq!(err.code(), ERR_UNMARKED_MEMBER);
    }

    #[test]
    fn test_public_state() {
        let err = extract_component(&component_with("  @State() count = 0;")).unwrap_err();
        assert_eq!(err.code(), ERR_VISIBILITY);
    }

    #[test]
    fn test_computed_on_field() {
        let err = extract_component(&component_with("  @Computed() private total = 0;")).unwrap_err();
        assert_eq!(err.code(), ERR_MARKER_KIND);
    }

    #[test]
    fn test_inject_needs_class_token() {
        let err = extract_component(&component_with(
            "  @Inject() private readonly store!: Map<string, number>;",
        ))
        .unwrap_err();
        assert_eq!(err.code(), ERR_INJECTION_TOKEN);
    }

    #[test]
    fn test_missing_render_names_method() {
        let err = extract_component(
            r#"
import { Component } from "@tessera/core";
@Component() class Empty {}
"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "StructuralViolation");
        assert_eq!(err.code(), ERR_MISSING_RENDER);
        assert!(err.to_string().contains("render()"));
    }

    #[test]
    fn test_unknown_template_ref() {
        let err = extract_component(
            r#"
import { Component } from "@tessera/core";
@Component() class R { render() { return <input ref={this.field} />; } }
"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), ERR_UNKNOWN_REF);
    }

    #[test]
    fn test_template_constructs() {
        let err = extract_component(
            r#"
import { Component } from "@tessera/core";
@Component() class S { render() { return <div {...rest} />; } }
"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), ERR_SPREAD_ATTRIBUTE);
        assert!(matches!(
            extract_component(&component_with("")).unwrap().template,
            TemplateNode::SelfClosingElement(_)
        ));
    }
}
