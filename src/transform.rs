//! Transform Pipeline
//!
//! A [`Transformer`] is a table of optional hooks, one per member role plus slots, styles,
//! template and the pre/post passes. [`transform_metadata`] drives the hooks over the IR
//! in a fixed order and collects their [`Artifact`]s into a [`TransformerResult`] that
//! the target printer lays out. A missing hook passes the member through unchanged.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::deps::{order_computed, order_methods};
use crate::error::CompileError;
use crate::extract::extract_component;
use crate::imports::ImportRegistrar;
use crate::ir::{
    ComponentMetadata, ComputedMetadata, EventMetadata, InjectMetadata, LifecycleMetadata,
    MemberSource, MethodMetadata, PropMetadata, ProviderMetadata, RefMetadata, StateMetadata,
    TemplateNode,
};
use crate::parse::normalize_styles;

// ═══════════════════════════════════════════════════════════════════════════════
// CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// State threaded through every hook of one compilation.
pub struct TransformContext<'m> {
    pub component: &'m ComponentMetadata,
    pub imports: ImportRegistrar,
    /// Free-form values shared between hooks, e.g. a scoped-style id.
    pub scratch: BTreeMap<String, Value>,
}

impl<'m> TransformContext<'m> {
    pub fn new(component: &'m ComponentMetadata) -> Self {
        TransformContext {
            component,
            imports: ImportRegistrar::new(),
            scratch: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.scratch.insert(key.to_string(), value.into());
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.scratch.get(key).and_then(Value::as_str)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOOK OUTPUTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Code fragment produced by a hook.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Statement or expression placed in the body of the output.
    pub code: String,
    /// Accompanying type-level entry (an interface field, an emits signature).
    pub declaration: Option<String>,
}

impl Artifact {
    pub fn code(code: impl Into<String>) -> Self {
        Artifact {
            code: code.into(),
            declaration: None,
        }
    }

    pub fn with_declaration(mut self, declaration: impl Into<String>) -> Self {
        self.declaration = Some(declaration.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Emitted<M> {
    /// No hook ran; the IR value as extracted.
    Raw(M),
    Artifact(Artifact),
}

impl<M> Emitted<M> {
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Emitted::Artifact(artifact) => Some(artifact),
            Emitted::Raw(_) => None,
        }
    }

    pub fn declaration(&self) -> Option<&str> {
        self.artifact().and_then(|a| a.declaration.as_deref())
    }
}

impl<M: MemberSource> Emitted<M> {
    /// Hook output, or the member's source text when no hook ran.
    pub fn code(&self) -> &str {
        match self {
            Emitted::Artifact(artifact) => &artifact.code,
            Emitted::Raw(member) => member.source(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORMER
// ═══════════════════════════════════════════════════════════════════════════════

pub type MemberHook<M> =
    Box<dyn Fn(&M, &mut TransformContext<'_>) -> Result<Artifact, CompileError> + Send + Sync>;
pub type SlotsHook =
    Box<dyn Fn(&[String], &mut TransformContext<'_>) -> Result<Artifact, CompileError> + Send + Sync>;
pub type StylesHook =
    Box<dyn Fn(&str, &mut TransformContext<'_>) -> Result<String, CompileError> + Send + Sync>;
pub type TemplateHook = Box<
    dyn Fn(&TemplateNode, &str, &mut TransformContext<'_>) -> Result<Artifact, CompileError>
        + Send
        + Sync,
>;
pub type PreHook = Box<dyn Fn(&mut TransformContext<'_>) -> Result<(), CompileError> + Send + Sync>;
pub type PostHook =
    Box<dyn Fn(TransformerResult) -> Result<TransformerResult, CompileError> + Send + Sync>;

#[derive(Default)]
pub struct Transformer {
    pub prop: Option<MemberHook<PropMetadata>>,
    pub state: Option<MemberHook<StateMetadata>>,
    pub computed: Option<MemberHook<ComputedMetadata>>,
    pub event: Option<MemberHook<EventMetadata>>,
    pub reference: Option<MemberHook<RefMetadata>>,
    pub method: Option<MemberHook<MethodMetadata>>,
    pub on_init: Option<MemberHook<LifecycleMetadata>>,
    pub on_destroy: Option<MemberHook<LifecycleMetadata>>,
    pub provider: Option<MemberHook<ProviderMetadata>>,
    pub inject: Option<MemberHook<InjectMetadata>>,
    pub slots: Option<SlotsHook>,
    pub styles: Option<StylesHook>,
    pub template: Option<TemplateHook>,
    pub pre_transform: Option<PreHook>,
    pub post_transform: Option<PostHook>,
}

macro_rules! member_hook_setters {
    ($($setter:ident => $field:ident: $meta:ty),* $(,)?) => {
        $(
            pub fn $setter<F>(mut self, hook: F) -> Self
            where
                F: Fn(&$meta, &mut TransformContext<'_>) -> Result<Artifact, CompileError>
                    + Send
                    + Sync
                    + 'static,
            {
                self.$field = Some(Box::new(hook));
                self
            }
        )*
    };
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    member_hook_setters!(
        with_prop => prop: PropMetadata,
        with_state => state: StateMetadata,
        with_computed => computed: ComputedMetadata,
        with_event => event: EventMetadata,
        with_reference => reference: RefMetadata,
        with_method => method: MethodMetadata,
        with_on_init => on_init: LifecycleMetadata,
        with_on_destroy => on_destroy: LifecycleMetadata,
        with_provider => provider: ProviderMetadata,
        with_inject => inject: InjectMetadata,
    );

    pub fn with_slots<F>(mut self, hook: F) -> Self
    where
        F: Fn(&[String], &mut TransformContext<'_>) -> Result<Artifact, CompileError>
            + Send
            + Sync
            + 'static,
    {
        self.slots = Some(Box::new(hook));
        self
    }

    pub fn with_styles<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &mut TransformContext<'_>) -> Result<String, CompileError> + Send + Sync + 'static,
    {
        self.styles = Some(Box::new(hook));
        self
    }

    pub fn with_template<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TemplateNode, &str, &mut TransformContext<'_>) -> Result<Artifact, CompileError>
            + Send
            + Sync
            + 'static,
    {
        self.template = Some(Box::new(hook));
        self
    }

    pub fn with_pre_transform<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut TransformContext<'_>) -> Result<(), CompileError> + Send + Sync + 'static,
    {
        self.pre_transform = Some(Box::new(hook));
        self
    }

    pub fn with_post_transform<F>(mut self, hook: F) -> Self
    where
        F: Fn(TransformerResult) -> Result<TransformerResult, CompileError> + Send + Sync + 'static,
    {
        self.post_transform = Some(Box::new(hook));
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESULT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformerResult {
    pub name: String,
    pub selector: Option<String>,
    pub props: Vec<Emitted<PropMetadata>>,
    pub state: Vec<Emitted<StateMetadata>>,
    pub computed: Vec<Emitted<ComputedMetadata>>,
    pub events: Vec<Emitted<EventMetadata>>,
    pub refs: Vec<Emitted<RefMetadata>>,
    pub providers: Vec<Emitted<ProviderMetadata>>,
    pub injects: Vec<Emitted<InjectMetadata>>,
    pub methods: Vec<Emitted<MethodMetadata>>,
    pub on_init: Option<Emitted<LifecycleMetadata>>,
    pub on_destroy: Option<Emitted<LifecycleMetadata>>,
    pub slots: Emitted<Vec<String>>,
    /// Normalized styles after the styles hook.
    pub styles: String,
    pub template: Emitted<TemplateNode>,
    /// Emission order of `methods`: callees before callers.
    pub method_order: Vec<usize>,
    /// Emission order of `computed`: dependencies first.
    pub computed_order: Vec<usize>,
    pub imports: ImportRegistrar,
    pub scratch: BTreeMap<String, Value>,
    pub declarations: Vec<String>,
}

impl TransformerResult {
    pub fn ordered_methods(&self) -> impl Iterator<Item = &Emitted<MethodMetadata>> {
        self.method_order.iter().filter_map(|&i| self.methods.get(i))
    }

    pub fn ordered_computed(&self) -> impl Iterator<Item = &Emitted<ComputedMetadata>> {
        self.computed_order.iter().filter_map(|&i| self.computed.get(i))
    }

    pub fn scratch_str(&self, key: &str) -> Option<&str> {
        self.scratch.get(key).and_then(Value::as_str)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE
// ═══════════════════════════════════════════════════════════════════════════════

fn run_members<M: Clone>(
    role: &str,
    items: &[M],
    name: impl Fn(&M) -> &str,
    hook: Option<&MemberHook<M>>,
    ctx: &mut TransformContext<'_>,
) -> Result<Vec<Emitted<M>>, CompileError> {
    items
        .iter()
        .map(|item| match hook {
            Some(hook) => {
                tracing::trace!(role, member = name(item), "running member hook");
                hook(item, ctx).map(Emitted::Artifact)
            }
            None => Ok(Emitted::Raw(item.clone())),
        })
        .collect()
}

fn run_lifecycle(
    role: &str,
    member: Option<&LifecycleMetadata>,
    hook: Option<&MemberHook<LifecycleMetadata>>,
    ctx: &mut TransformContext<'_>,
) -> Result<Option<Emitted<LifecycleMetadata>>, CompileError> {
    match (member, hook) {
        (Some(member), Some(hook)) => {
            tracing::trace!(role, "running lifecycle hook");
            hook(member, ctx).map(|a| Some(Emitted::Artifact(a)))
        }
        (Some(member), None) => Ok(Some(Emitted::Raw(member.clone()))),
        (None, _) => Ok(None),
    }
}

/// Runs `transformer` over already extracted metadata.
pub fn transform_metadata(
    component: &ComponentMetadata,
    transformer: &Transformer,
) -> Result<TransformerResult, CompileError> {
    let mut ctx = TransformContext::new(component);
    for import in &component.imports {
        ctx.imports.register(import);
    }

    if let Some(pre) = &transformer.pre_transform {
        pre(&mut ctx)?;
    }
    tracing::debug!(component = %component.name, "running member hooks");

    let props = run_members("prop", &component.props, |m| &m.name, transformer.prop.as_ref(), &mut ctx)?;
    let state = run_members("state", &component.state, |m| &m.name, transformer.state.as_ref(), &mut ctx)?;
    let computed = run_members(
        "computed",
        &component.computed,
        |m| &m.name,
        transformer.computed.as_ref(),
        &mut ctx,
    )?;
    let events = run_members("event", &component.events, |m| &m.name, transformer.event.as_ref(), &mut ctx)?;
    let refs = run_members("ref", &component.refs, |m| &m.name, transformer.reference.as_ref(), &mut ctx)?;
    let providers = run_members(
        "provider",
        &component.providers,
        |m| &m.name,
        transformer.provider.as_ref(),
        &mut ctx,
    )?;
    let injects = run_members("inject", &component.injects, |m| &m.name, transformer.inject.as_ref(), &mut ctx)?;
    let methods = run_members("method", &component.methods, |m| &m.name, transformer.method.as_ref(), &mut ctx)?;
    let on_init = run_lifecycle("onInit", component.on_init.as_ref(), transformer.on_init.as_ref(), &mut ctx)?;
    let on_destroy = run_lifecycle(
        "onDestroy",
        component.on_destroy.as_ref(),
        transformer.on_destroy.as_ref(),
        &mut ctx,
    )?;
    let slots = match &transformer.slots {
        Some(hook) => Emitted::Artifact(hook(&component.slots, &mut ctx)?),
        None => Emitted::Raw(component.slots.clone()),
    };

    let normalized = normalize_styles(&component.styles);
    let styles = match &transformer.styles {
        Some(hook) => hook(&normalized, &mut ctx)?,
        None => normalized,
    };
    let template = match &transformer.template {
        Some(hook) => Emitted::Artifact(hook(&component.template, &styles, &mut ctx)?),
        None => Emitted::Raw(component.template.clone()),
    };

    let method_order = order_methods(&component.methods)?;
    let computed_order = order_computed(&component.computed)?;
    tracing::debug!(
        component = %component.name,
        methods = method_order.len(),
        computed = computed_order.len(),
        imports = ctx.imports.modules().len(),
        "ordered members"
    );

    let result = TransformerResult {
        name: component.name.clone(),
        selector: component.selector.clone(),
        props,
        state,
        computed,
        events,
        refs,
        providers,
        injects,
        methods,
        on_init,
        on_destroy,
        slots,
        styles,
        template,
        method_order,
        computed_order,
        imports: ctx.imports,
        scratch: ctx.scratch,
        declarations: component.declarations.clone(),
    };
    match &transformer.post_transform {
        Some(post) => post(result),
        None => Ok(result),
    }
}

/// Extracts, validates and transforms one component source unit.
pub fn transform(source: &str, transformer: &Transformer) -> Result<TransformerResult, CompileError> {
    let component = extract_component(source)?;
    transform_metadata(&component, transformer)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: &str = r#"
import { Component, Prop, State } from "@tessera/core";
import { format } from "./format";

@Component({ styles: `
  .count { font-weight: bold; }
` })
export class Counter {
  @Prop() readonly step: number = 1;
  @State() private count = 0;
  increment() { this.count += this.step; this.log(); }
  log() { console.log(format(this.count)); }
  render() { return <span class="count">{this.count}</span>; }
}
"#;

    #[test]
    fn test_missing_hooks_pass_members_through() {
        let result = transform(COUNTER, &Transformer::new()).unwrap();
        assert!(matches!(&result.props[0], Emitted::Raw(p) if p.name == "step"));
        assert_eq!(result.state[0].code(), "@State() private count = 0;");
        assert!(matches!(result.template, Emitted::Raw(_)));
        assert_eq!(result.styles, ".count { font-weight: bold; }");
        assert_eq!(result.imports.render(), "import { format } from \"./format\";");
    }

    #[test]
    fn test_hooks_share_context() {
        let transformer = Transformer::new()
            .with_pre_transform(|ctx| {
                ctx.set("prefix", "use");
                Ok(())
            })
            .with_state(|state, ctx| {
                ctx.imports.named("useState", "react");
                let prefix = ctx.get_str("prefix").unwrap_or_default().to_string();
                Ok(Artifact::code(format!("{}State:{}", prefix, state.name)))
            })
            .with_styles(|styles, _| Ok(format!("/* scoped */ {}", styles)));
        let result = transform(COUNTER, &transformer).unwrap();
        assert_eq!(result.state[0].code(), "useState:count");
        assert!(result.styles.starts_with("/* scoped */"));
        assert_eq!(result.imports.modules()[1].module, "react");
    }

    #[test]
    fn test_methods_are_ordered() {
        let result = transform(COUNTER, &Transformer::new()).unwrap();
        let names: Vec<&str> = result
            .ordered_methods()
            .map(|m| match m {
                Emitted::Raw(m) => m.name.as_str(),
                Emitted::Artifact(_) => "",
            })
            .collect();
        assert_eq!(names, vec!["log", "increment"]);
    }

    #[test]
    fn test_pre_transform_can_reject() {
        let transformer = Transformer::new().with_pre_transform(|ctx| {
            match ctx.component.selector {
                Some(_) => Ok(()),
                None => Err(CompileError::structural("TSR999", "selector required")),
            }
        });
        assert_eq!(transform(COUNTER, &transformer).unwrap_err().code(), "TSR999");
    }

    #[test]
    fn test_post_transform_rewrites_result() {
        let transformer = Transformer::new().with_post_transform(|mut result| {
            result.name = format!("{}View", result.name);
            Ok(result)
        });
        assert_eq!(transform(COUNTER, &transformer).unwrap().name, "CounterView");
    }

    #[test]
    fn test_missing_component_aborts_before_hooks() {
        let transformer = Transformer::new().with_pre_transform(|_| panic!("hook ran"));
        let err = transform("import { x } from \"y\";", &transformer).unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_NO_COMPONENT);
    }
}
