//! Pipeline Tests
//!
//! End-to-end compilation through [`crate::compile`]: every target must produce output
//! that survives verification and re-parses with `oxc_parser`.

#[cfg(test)]
mod tests {
    use crate::error::{ERR_MISSING_SELECTOR, ERR_PROP_CONSTRAINT};
    use crate::{compile, compile_component, compile_many, CompileOptions, Target};
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    const TODO_LIST: &str = r#"
import { Component, Prop, State, Computed, Event, Ref, EventEmitter } from "@tessera/core";

@Component({ selector: "todo-list", styles: ".done { opacity: 0.5; }" })
export class TodoList {
  /** Heading text. */
  @Prop() readonly heading: string = "Todos";
  @State() private items: string[] = [];
  @State() private draft = "";
  @Computed() get count(): number { return this.items.length; }
  @Event() readonly onAdd = new EventEmitter<string>();
  @Ref() private input!: HTMLInputElement;

  add() {
    this.items.push(this.draft);
    this.onAdd.emit(this.draft);
    this.draft = "";
  }

  onInit() { this.input.focus(); }

  render() {
    return (
      <section class={{ empty: this.count === 0 }}>
        <h1>{this.heading}</h1>
        <Show when={this.count > 0} fallback={<p>Nothing yet</p>}>
          <ul>
            <For each={this.items}>{(item, index) => <li key={index}>{item}</li>}</For>
          </ul>
        </Show>
        <input ref={this.input} value={this.draft} onInput={(e) => this.draft = (e.target as HTMLInputElement).value} />
        <button onClick={() => this.add()}>Add</button>
      </section>
    );
  }
}
"#;

    const STORE: &str = r#"
import { Provider } from "@tessera/core";

@Provider()
export class TodoStore {
  load(): string[] { return []; }
}
"#;

    fn reparses(code: &str, jsx: bool) -> bool {
        let allocator = Allocator::default();
        let source_type = SourceType::default()
            .with_module(true)
            .with_typescript(true)
            .with_jsx(jsx);
        let ret = Parser::new(&allocator, code, source_type).parse();
        ret.errors.is_empty() && !ret.panicked
    }

    fn script_block(code: &str) -> &str {
        let start = code.find('>').map(|i| i + 1).unwrap_or(0);
        let end = code.find("</script>").unwrap_or(code.len());
        &code[start..end]
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Every target
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_every_target_compiles_and_reparses() {
        for target in Target::ALL {
            let output = compile_component(TODO_LIST, target)
                .unwrap_or_else(|err| panic!("{} failed: {}", target, err));
            assert_eq!(output.target, target);
            assert_eq!(output.file_name, format!("TodoList.{}", target.extension()));
            let ok = match target {
                Target::React => reparses(&output.code, true),
                Target::Lit => reparses(&output.code, false),
                Target::Vue | Target::Svelte => {
                    output.code.starts_with("<script") && reparses(script_block(&output.code), false)
                }
            };
            assert!(ok, "{} output does not re-parse:\n{}", target, output.code);
        }
    }

    #[test]
    fn test_compile_is_deterministic() {
        for target in Target::ALL {
            assert_eq!(
                compile_component(TODO_LIST, target).unwrap(),
                compile_component(TODO_LIST, target).unwrap()
            );
        }
    }

    #[test]
    fn test_member_comments_survive() {
        for target in Target::ALL {
            let output = compile_component(TODO_LIST, target).unwrap();
            assert!(output.code.contains("/** Heading text. */"), "{}", target);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Options
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_normalize_reprints_react() {
        let options = CompileOptions {
            target: Target::React,
            normalize: true,
            ..Default::default()
        };
        let output = compile(TODO_LIST, &options).unwrap();
        assert!(output.code.contains("export function TodoList("));
        assert!(reparses(&output.code, true));
    }

    #[test]
    fn test_options_from_json() {
        let options: CompileOptions =
            serde_json::from_str(r#"{ "target": "lit", "verify": false }"#).unwrap();
        let output = compile(TODO_LIST, &options).unwrap();
        assert_eq!(output.file_name, "TodoList.ts");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Units and batches
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_provider_units() {
        let react = compile_component(STORE, Target::React).unwrap();
        assert_eq!(react.file_name, "TodoStore.ts");
        assert!(react
            .code
            .contains("export const TodoStoreContext = createContext<TodoStore | null>(null);"));

        let svelte = compile_component(STORE, Target::Svelte).unwrap();
        assert_eq!(
            svelte.code,
            "export class TodoStore {\n  load(): string[] { return []; }\n}\n"
        );
    }

    #[test]
    fn test_compile_many_keeps_order() {
        let broken = TODO_LIST.replace("readonly heading", "heading");
        let sources = vec![TODO_LIST.to_string(), broken, STORE.to_string()];
        let results = compile_many(&sources, &CompileOptions::for_target(Target::Vue));
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().file_name, "TodoList.vue");
        assert_eq!(results[1].as_ref().unwrap_err().code(), ERR_PROP_CONSTRAINT);
        assert_eq!(results[2].as_ref().unwrap().file_name, "TodoStore.ts");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Errors
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_lit_requires_selector() {
        let source = TODO_LIST.replace("selector: \"todo-list\", ", "");
        let err = compile_component(&source, Target::Lit).unwrap_err();
        assert_eq!(err.code(), ERR_MISSING_SELECTOR);
        assert!(compile_component(&source, Target::React).is_ok());
    }

    #[test]
    fn test_errors_serialize_with_kind_and_code() {
        let err = compile_component(&TODO_LIST.replace("readonly heading", "heading"), Target::React)
            .unwrap_err();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "memberConstraintViolation");
        assert_eq!(json["code"], "TSR204");
        assert_eq!(json["member"], "heading");
        assert_eq!(json["location"]["line"], 7);
    }
}
