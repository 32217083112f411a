//! Canonical component IR.
//!
//! Produced once per compilation by the extractor, consumed read-only by the transform
//! pipeline and dropped after printing. Everything here is target-agnostic: member code is
//! kept as source text in its original `this.member` form and each backend rewrites it.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE UNITS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SourceUnit {
    Component(ComponentMetadata),
    Provider(ProviderClassMetadata),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMetadata {
    pub name: String,
    pub selector: Option<String>,
    pub styles: String,
    pub template: TemplateNode,
    pub props: Vec<PropMetadata>,
    pub state: Vec<StateMetadata>,
    pub computed: Vec<ComputedMetadata>,
    pub events: Vec<EventMetadata>,
    pub refs: Vec<RefMetadata>,
    pub providers: Vec<ProviderMetadata>,
    pub injects: Vec<InjectMetadata>,
    pub methods: Vec<MethodMetadata>,
    pub on_init: Option<LifecycleMetadata>,
    pub on_destroy: Option<LifecycleMetadata>,
    /// Slot names in document order; `"default"` for unnamed slots.
    pub slots: Vec<String>,
    pub imports: Vec<ImportMetadata>,
    /// Top-level interface and type alias declarations, verbatim.
    pub declarations: Vec<String>,
}

impl ComponentMetadata {
    pub fn is_state(&self, name: &str) -> bool {
        self.state.iter().any(|s| s.name == name)
    }

    pub fn is_prop(&self, name: &str) -> bool {
        self.props.iter().any(|p| p.name == name)
    }

    pub fn is_computed(&self, name: &str) -> bool {
        self.computed.iter().any(|c| c.name == name)
    }

    pub fn is_ref(&self, name: &str) -> bool {
        self.refs.iter().any(|r| r.name == name)
    }

    pub fn is_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name)
    }

    /// Whether `name` is declared by any member role.
    pub fn has_member(&self, name: &str) -> bool {
        self.is_prop(name)
            || self.is_state(name)
            || self.is_computed(name)
            || self.is_ref(name)
            || self.is_method(name)
            || self.event(name).is_some()
            || self.providers.iter().any(|p| p.name == name)
            || self.injects.iter().any(|i| i.name == name)
    }

    pub fn event(&self, name: &str) -> Option<&EventMetadata> {
        self.events.iter().find(|e| e.name == name)
    }

    /// Looks up the module a local binding was imported from.
    pub fn import_source_of(&self, local: &str) -> Option<&str> {
        self.imports
            .iter()
            .find(|i| {
                i.default.as_deref() == Some(local)
                    || i.namespace.as_deref() == Some(local)
                    || i.named.iter().any(|n| n.local == local)
            })
            .map(|i| i.source.as_str())
    }
}

/// A `@Provider()` class unit. Carries the class text with its markers removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderClassMetadata {
    pub name: String,
    pub source: String,
    pub imports: Vec<ImportMetadata>,
    pub declarations: Vec<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEMBERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Source text of a member as written, used when a transformer leaves it untouched.
pub trait MemberSource {
    fn source(&self) -> &str;
}

macro_rules! member_source {
    ($($ty:ty),* $(,)?) => {
        $(impl MemberSource for $ty {
            fn source(&self) -> &str {
                &self.source
            }
        })*
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PropMetadata {
    pub name: String,
    pub type_annotation: Option<String>,
    pub default_value: Option<String>,
    pub optional: bool,
    pub comments: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StateMetadata {
    pub name: String,
    pub type_annotation: Option<String>,
    pub initializer: Option<String>,
    pub comments: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ComputedMetadata {
    pub name: String,
    pub return_type: Option<String>,
    /// The operand of the getter's single `return`.
    pub expression: String,
    pub comments: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    /// Member name, e.g. `onItemAdded`.
    pub name: String,
    /// Dispatched name, e.g. `itemAdded`.
    pub event_name: String,
    /// `T` of `EventEmitter<T>`.
    pub payload_type: Option<String>,
    pub comments: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefMetadata {
    pub name: String,
    pub type_annotation: Option<String>,
    pub comments: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    pub name: String,
    pub token: String,
    pub type_annotation: Option<String>,
    pub initializer: String,
    pub comments: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InjectMetadata {
    pub name: String,
    pub token: String,
    pub comments: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MethodMetadata {
    pub name: String,
    /// Parameter list without the surrounding parentheses.
    pub params: String,
    pub return_type: Option<String>,
    /// Statements between the body braces.
    pub body: String,
    pub is_async: bool,
    pub comments: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleMetadata {
    pub body: String,
    pub is_async: bool,
    pub comments: Vec<String>,
    pub source: String,
}

member_source!(
    PropMetadata,
    StateMetadata,
    ComputedMetadata,
    EventMetadata,
    RefMetadata,
    ProviderMetadata,
    InjectMetadata,
    MethodMetadata,
    LifecycleMetadata,
);

// ═══════════════════════════════════════════════════════════════════════════════
// IMPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportMetadata {
    pub source: String,
    pub default: Option<String>,
    pub namespace: Option<String>,
    pub named: Vec<ImportedName>,
    pub type_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportedName {
    pub imported: String,
    pub local: String,
    pub type_only: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TemplateNode {
    Element(ElementNode),
    SelfClosingElement(SelfClosingElementNode),
    Fragment(FragmentNode),
    Text(TextNode),
    Expression(ExpressionNode),
}

impl Default for TemplateNode {
    fn default() -> Self {
        TemplateNode::Fragment(FragmentNode { children: vec![] })
    }
}

impl TemplateNode {
    pub fn tag(&self) -> Option<&str> {
        match self {
            TemplateNode::Element(el) => Some(&el.tag),
            TemplateNode::SelfClosingElement(el) => Some(&el.tag),
            _ => None,
        }
    }

    pub fn attributes(&self) -> &[AttributeNode] {
        match self {
            TemplateNode::Element(el) => &el.attributes,
            TemplateNode::SelfClosingElement(el) => &el.attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeNode> {
        self.attributes().iter().find(|a| a.name == name)
    }

    pub fn children(&self) -> &[TemplateNode] {
        match self {
            TemplateNode::Element(el) => &el.children,
            TemplateNode::Fragment(frag) => &frag.children,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub tag: String,
    pub attributes: Vec<AttributeNode>,
    pub children: Vec<TemplateNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfClosingElementNode {
    pub tag: String,
    pub attributes: Vec<AttributeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentNode {
    pub children: Vec<TemplateNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionNode {
    pub code: String,
    /// Present when the expression is `(params) => <markup/>`.
    pub callback: Option<TemplateCallback>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCallback {
    pub params: Vec<String>,
    pub body: Box<TemplateNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeNode {
    pub name: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum AttributeValue {
    /// Bare attribute, i.e. boolean `true`.
    Boolean,
    Static(String),
    Expression(String),
    /// Object literal with static keys, e.g. `class={{ done: this.done }}`.
    ObjectMap { entries: Vec<MapEntry>, code: String },
    Template(Box<TemplateNode>),
}

impl AttributeValue {
    /// Expression code for the value, when it has one.
    pub fn code(&self) -> Option<&str> {
        match self {
            AttributeValue::Expression(code) => Some(code),
            AttributeValue::ObjectMap { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapEntry {
    pub key: String,
    pub value: String,
}
