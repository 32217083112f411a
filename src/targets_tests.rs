//! Target Tests
//!
//! One component compiled for every backend, compared side by side. These pin down how
//! the same member roles and template forms map onto each framework's idiom.

#[cfg(test)]
mod tests {
    use crate::error::{CompileError, ERR_BACKEND_FEATURE};
    use crate::{compile_component, CompileOutput, Target};

    const COUNTER: &str = r#"
import { Component, Prop, State, Event, EventEmitter } from "@tessera/core";

@Component({ selector: "step-counter" })
export class StepCounter {
  @Prop() readonly step: number = 1;
  @State() private count = 0;
  @Event() readonly onChange = new EventEmitter<number>();

  increment() {
    this.count += this.step;
    this.onChange.emit(this.count);
  }

  render() {
    return (
      <button class={{ active: this.count > 0 }} onClick={() => this.increment()}>
        {this.count}
      </button>
    );
  }
}
"#;

    const LABEL: &str = r#"
import { Component, State } from "@tessera/core";

@Component({ selector: "toggle-label" })
export class ToggleLabel {
  @State() private open = false;

  render() {
    return (
      <label className="c" class={{ active: this.open }} htmlFor="name" title="a &quot;b&quot;">
        Name
      </label>
    );
  }
}
"#;

    const INJECTED: &str = r#"
import { Component, Inject } from "@tessera/core";
import { TodoStore } from "./todo-store";

@Component({ selector: "todo-count" })
export class TodoCount {
  @Inject() private readonly store!: TodoStore;

  render() {
    return <p>{this.store.size}</p>;
  }
}
"#;

    const STORE: &str = r#"
import { Provider } from "@tessera/core";
import { Todo } from "./types";

@Provider()
export class TodoStore {
  private todos: Todo[] = [];
  get size(): number { return this.todos.length; }
}
"#;

    fn each_target(source: &str) -> Vec<(Target, Result<CompileOutput, CompileError>)> {
        Target::ALL
            .iter()
            .map(|&target| (target, compile_component(source, target)))
            .collect()
    }

    fn code(source: &str, target: Target) -> String {
        compile_component(source, target)
            .unwrap_or_else(|err| panic!("{} failed: {}", target, err))
            .code
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Members
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_state_update_per_target() {
        assert!(code(COUNTER, Target::React).contains("setCount(count => count + step);"));
        assert!(code(COUNTER, Target::Vue).contains("count.value += props.step;"));
        assert!(code(COUNTER, Target::Svelte).contains("count += step;"));
        assert!(code(COUNTER, Target::Lit).contains("this.count += this.step;"));
    }

    #[test]
    fn test_event_emission_per_target() {
        assert!(code(COUNTER, Target::React).contains("onChange?.(count);"));
        assert!(code(COUNTER, Target::Vue).contains("emit(\"change\", count.value);"));
        assert!(code(COUNTER, Target::Svelte).contains("dispatch(\"change\", count);"));
        assert!(code(COUNTER, Target::Lit).contains(
            "this.dispatchEvent(new CustomEvent(\"change\", { detail: this.count, bubbles: true, composed: true }));"
        ));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Template
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_event_binding_per_target() {
        assert!(code(COUNTER, Target::React).contains("onClick={() => increment()}"));
        assert!(code(COUNTER, Target::Vue).contains("@click=\"() => increment()\""));
        assert!(code(COUNTER, Target::Svelte).contains("on:click={() => increment()}"));
        assert!(code(COUNTER, Target::Lit).contains("@click=${() => this.increment()}"));
    }

    #[test]
    fn test_class_map_per_target() {
        assert!(code(COUNTER, Target::React)
            .contains("className={[(count > 0) && \"active\"].filter(Boolean).join(\" \")}"));
        assert!(code(COUNTER, Target::Vue).contains(":class=\"{ active: count > 0 }\""));
        assert!(code(COUNTER, Target::Svelte).contains("class:active={count > 0}"));
        assert!(code(COUNTER, Target::Lit).contains("class=${classMap({ active: this.count > 0 })}"));
    }

    #[test]
    fn test_interpolation_per_target() {
        assert!(code(COUNTER, Target::React).contains("{count}"));
        assert!(code(COUNTER, Target::Vue).contains("{{ count }}"));
        assert!(code(COUNTER, Target::Svelte).contains("{count}"));
        assert!(code(COUNTER, Target::Lit).contains("${this.count}"));
    }

    #[test]
    fn test_static_class_next_to_class_map() {
        let react = code(LABEL, Target::React);
        assert!(react.contains("className={[\"c\", (open) && \"active\"].filter(Boolean).join(\" \")}"));
        assert!(!react.contains("className=\"c\""));

        let lit = code(LABEL, Target::Lit);
        assert!(lit.contains("class=${classMap({ c: true, active: this.open })}"));
        assert!(!lit.contains("class=\"c\""));

        let vue = code(LABEL, Target::Vue);
        assert!(vue.contains("class=\"c\""));
        assert!(vue.contains(":class=\"{ active: open }\""));

        let svelte = code(LABEL, Target::Svelte);
        assert!(svelte.contains("class=\"c\""));
        assert!(svelte.contains("class:active={open}"));
    }

    #[test]
    fn test_label_for_per_target() {
        assert!(code(LABEL, Target::React).contains("htmlFor=\"name\""));
        for target in [Target::Vue, Target::Svelte, Target::Lit] {
            let out = code(LABEL, target);
            assert!(out.contains("for=\"name\""), "{}", target);
            assert!(!out.contains("htmlFor"), "{}", target);
        }
    }

    #[test]
    fn test_static_entities_are_not_escaped_twice() {
        for target in Target::ALL {
            let out = code(LABEL, target);
            assert!(out.contains("title=\"a &quot;b&quot;\""), "{}:\n{}", target, out);
            assert!(!out.contains("&amp;quot;"), "{}", target);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Dependency injection
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_inject_per_target() {
        for (target, result) in each_target(INJECTED) {
            match target {
                Target::React => {
                    let out = result.unwrap().code;
                    assert!(out.contains("const store = useContext(TodoStoreContext)!;"));
                    assert!(out.contains("TodoStoreContext"));
                }
                Target::Vue => assert!(result
                    .unwrap()
                    .code
                    .contains("const store = inject<TodoStore>(\"TodoStore\")!;")),
                Target::Svelte => assert!(result
                    .unwrap()
                    .code
                    .contains("const store = getContext<TodoStore>(\"TodoStore\");")),
                Target::Lit => {
                    let err = result.unwrap_err();
                    assert_eq!(err.kind(), "BackendUnsupported");
                    assert_eq!(err.code(), ERR_BACKEND_FEATURE);
                }
            }
        }
    }

    #[test]
    fn test_provider_unit_per_target() {
        let outputs: Vec<(Target, String)> = each_target(STORE)
            .into_iter()
            .map(|(target, result)| (target, result.unwrap().code))
            .collect();
        for (target, out) in &outputs {
            assert!(out.contains("import { Todo } from \"./types\";"), "{}", target);
            assert!(out.contains("export class TodoStore {"), "{}", target);
            assert!(!out.contains("@Provider"), "{}", target);
        }
        let react = &outputs[0].1;
        assert!(react.contains("export const TodoStoreContext = createContext<TodoStore | null>(null);"));
        assert_eq!(outputs[1].1, outputs[2].1);
        assert_eq!(outputs[2].1, outputs[3].1);
    }
}
