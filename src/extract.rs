//! Metadata Extractor
//!
//! Parses one source unit and produces its [`SourceUnit`]. Shape checks (exactly one
//! annotated class, nothing but imports and type declarations beside it) run first. The
//! class body is then walked once into raw member records, validated, and every record is
//! classified into exactly one [`MemberRole`] before moving into its IR slot.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Class, ClassElement, Declaration, Decorator, ExportDefaultDeclarationKind, Expression,
    Function, ImportDeclaration, ImportDeclarationSpecifier, MethodDefinitionKind,
    ObjectPropertyKind, Program, PropertyKey, Statement, TSAccessibility,
};
use oxc_span::{GetSpan, Span};
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::error::{
    CompileError, SourceLocation, ERR_ANONYMOUS_CLASS, ERR_COMPONENT_OPTIONS,
    ERR_EXTRANEOUS_STATEMENT, ERR_INJECTION_TOKEN, ERR_MALFORMED_RENDER, ERR_MIXED_UNIT,
    ERR_MULTIPLE_COMPONENTS, ERR_NO_COMPONENT,
};
use crate::ir::{
    ComponentMetadata, ComputedMetadata, EventMetadata, ImportMetadata, ImportedName,
    InjectMetadata, LifecycleMetadata, MethodMetadata, PropMetadata, ProviderClassMetadata,
    ProviderMetadata, RefMetadata, SourceUnit, StateMetadata,
};
use crate::parse::{
    dedent, is_identifier, leading_comments, lower_first, parse_program, span_text, unwrap_parens,
};
use crate::rewrite::{splice, Edit};
use crate::template::{collect_slots, TemplateLowerer};
use crate::validate::{check_template_refs, validate_members};

/// Module the role markers are imported from. Its import is never retained.
pub const MARKER_MODULE: &str = "@tessera/core";

pub(crate) const RENDER_METHOD: &str = "render";
pub(crate) const ON_INIT: &str = "onInit";
pub(crate) const ON_DESTROY: &str = "onDestroy";

lazy_static! {
    static ref EMITTER_INIT_RE: Regex =
        Regex::new(r"(?s)^new\s+EventEmitter\s*<(.+)>\s*\(\s*\)$").unwrap();
    static ref EMITTER_TYPE_RE: Regex = Regex::new(r"(?s)^EventEmitter\s*<(.+)>$").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// MARKERS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Component,
    Provider,
    Prop,
    State,
    Computed,
    Event,
    Ref,
    Inject,
    Provide,
}

impl Marker {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Component" => Marker::Component,
            "Provider" => Marker::Provider,
            "Prop" => Marker::Prop,
            "State" => Marker::State,
            "Computed" => Marker::Computed,
            "Event" => Marker::Event,
            "Ref" => Marker::Ref,
            "Inject" => Marker::Inject,
            "Provide" => Marker::Provide,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Marker::Component => "Component",
            Marker::Provider => "Provider",
            Marker::Prop => "Prop",
            Marker::State => "State",
            Marker::Computed => "Computed",
            Marker::Event => "Event",
            Marker::Ref => "Ref",
            Marker::Inject => "Inject",
            Marker::Provide => "Provide",
        }
    }
}

/// Local names that denote markers in this unit.
#[derive(Debug, Default)]
struct MarkerTable {
    aliases: HashMap<String, Marker>,
    namespaces: HashSet<String>,
}

impl MarkerTable {
    fn from_program(program: &Program) -> Self {
        let mut table = MarkerTable::default();
        for stmt in &program.body {
            let Statement::ImportDeclaration(decl) = stmt else {
                continue;
            };
            if decl.source.value != MARKER_MODULE {
                continue;
            }
            for spec in decl.specifiers.iter().flatten() {
                match spec {
                    ImportDeclarationSpecifier::ImportSpecifier(s) => {
                        if let Some(marker) = Marker::from_name(s.imported.name().as_str()) {
                            table.aliases.insert(s.local.name.to_string(), marker);
                        }
                    }
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                        table.namespaces.insert(s.local.name.to_string());
                    }
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(_) => {}
                }
            }
        }
        table
    }

    /// `@Prop`, `@Prop()`, `@P()` (aliased) or `@core.Prop()` (namespace import).
    fn resolve(&self, expr: &Expression) -> Option<Marker> {
        let callee = match expr {
            Expression::CallExpression(call) => &call.callee,
            other => other,
        };
        match callee {
            Expression::Identifier(id) => self
                .aliases
                .get(id.name.as_str())
                .copied()
                .or_else(|| Marker::from_name(id.name.as_str())),
            Expression::StaticMemberExpression(member) => match &member.object {
                Expression::Identifier(ns) if self.namespaces.contains(ns.name.as_str()) => {
                    Marker::from_name(member.property.name.as_str())
                }
                _ => None,
            },
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RAW MEMBERS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum DeclKind {
    #[default]
    Field,
    Getter,
    Setter,
    Method,
    Constructor,
    AccessorField,
    StaticBlock,
    IndexSignature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl From<Option<TSAccessibility>> for Visibility {
    fn from(accessibility: Option<TSAccessibility>) -> Self {
        match accessibility {
            Some(TSAccessibility::Private) => Visibility::Private,
            Some(TSAccessibility::Protected) => Visibility::Protected,
            Some(TSAccessibility::Public) | None => Visibility::Public,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FunctionParts {
    pub params: String,
    pub param_count: usize,
    pub return_type: Option<String>,
    pub body: String,
    pub is_async: bool,
    pub statement_count: usize,
    /// Operand text when the body is exactly `return <expr>;`.
    pub single_return: Option<String>,
    /// The body is exactly `return;`.
    pub bare_return: bool,
    pub returns_markup: bool,
}

/// A class member as declared, before validation.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawMember {
    pub name: String,
    pub kind: DeclKind,
    pub markers: Vec<Marker>,
    pub unknown_decorators: Vec<String>,
    pub is_static: bool,
    pub is_private_name: bool,
    pub computed_key: bool,
    pub visibility: Visibility,
    pub readonly: bool,
    pub optional: bool,
    pub type_annotation: Option<String>,
    pub initializer: Option<String>,
    /// Class name of a `new X()` initializer.
    pub constructed: Option<String>,
    pub function: Option<FunctionParts>,
    pub comments: Vec<String>,
    pub source: String,
    pub location: SourceLocation,
}

impl RawMember {
    pub fn marker(&self) -> Option<Marker> {
        self.markers.first().copied()
    }
}

/// Closed role classification, computed once per validated member.
#[derive(Debug, Clone)]
pub(crate) enum MemberRole {
    Prop(PropMetadata),
    State(StateMetadata),
    Computed(ComputedMetadata),
    Event(EventMetadata),
    Ref(RefMetadata),
    Provide(ProviderMetadata),
    Inject(InjectMetadata),
    Method(MethodMetadata),
    OnInit(LifecycleMetadata),
    OnDestroy(LifecycleMetadata),
    Render,
}

fn constructed_class(expr: &Expression) -> Option<String> {
    match unwrap_parens(expr) {
        Expression::NewExpression(new) => match &new.callee {
            Expression::Identifier(id) => Some(id.name.to_string()),
            _ => None,
        },
        _ => None,
    }
}

fn element_decorators<'e, 'a>(element: &'e ClassElement<'a>) -> &'e [Decorator<'a>] {
    match element {
        ClassElement::MethodDefinition(m) => m.decorators.as_slice(),
        ClassElement::PropertyDefinition(p) => p.decorators.as_slice(),
        ClassElement::AccessorProperty(a) => a.decorators.as_slice(),
        ClassElement::StaticBlock(_) | ClassElement::TSIndexSignature(_) => &[],
    }
}

fn payload_type(member: &RawMember) -> Option<String> {
    let from_init = member
        .initializer
        .as_deref()
        .and_then(|init| EMITTER_INIT_RE.captures(init.trim()));
    let from_type = member
        .type_annotation
        .as_deref()
        .and_then(|ty| EMITTER_TYPE_RE.captures(ty.trim()));
    from_init
        .or(from_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn classify(raw: RawMember) -> Result<MemberRole, CompileError> {
    let payload = payload_type(&raw);
    let RawMember {
        name,
        kind,
        markers,
        optional,
        type_annotation,
        initializer,
        constructed,
        function,
        comments,
        source,
        ..
    } = raw;

    let role = match markers.first() {
        Some(Marker::Prop) => MemberRole::Prop(PropMetadata {
            name,
            type_annotation,
            optional: optional || initializer.is_some(),
            default_value: initializer,
            comments,
            source,
        }),
        Some(Marker::State) => MemberRole::State(StateMetadata {
            name,
            type_annotation,
            initializer,
            comments,
            source,
        }),
        Some(Marker::Computed) => {
            let f = function.unwrap_or_default();
            MemberRole::Computed(ComputedMetadata {
                name,
                return_type: f.return_type,
                expression: f.single_return.unwrap_or_default(),
                comments,
                source,
            })
        }
        Some(Marker::Event) => MemberRole::Event(EventMetadata {
            event_name: lower_first(name.strip_prefix("on").unwrap_or(&name)),
            payload_type: payload,
            name,
            comments,
            source,
        }),
        Some(Marker::Ref) => MemberRole::Ref(RefMetadata {
            name,
            type_annotation,
            comments,
            source,
        }),
        Some(Marker::Inject) => {
            let token = type_annotation
                .filter(|ty| is_identifier(ty))
                .ok_or_else(|| {
                    CompileError::member(
                        ERR_INJECTION_TOKEN,
                        &name,
                        "injected members are annotated with the provider class, e.g. `store!: TodoStore`",
                    )
                })?;
            MemberRole::Inject(InjectMetadata {
                name,
                token,
                comments,
                source,
            })
        }
        Some(Marker::Provide) => {
            let Some(initializer) = initializer else {
                return Err(CompileError::member(
                    ERR_INJECTION_TOKEN,
                    &name,
                    "provided members need an initializer",
                ));
            };
            let token = constructed
                .or_else(|| type_annotation.clone().filter(|ty| is_identifier(ty)))
                .ok_or_else(|| {
                    CompileError::member(
                        ERR_INJECTION_TOKEN,
                        &name,
                        "cannot determine the provided class; use `new X()` or annotate the member",
                    )
                })?;
            MemberRole::Provide(ProviderMetadata {
                name,
                token,
                type_annotation,
                initializer,
                comments,
                source,
            })
        }
        // Validation has rejected every other marker placement.
        Some(_) | None => {
            let f = function.unwrap_or_default();
            match (kind, name.as_str()) {
                (DeclKind::Method, RENDER_METHOD) => MemberRole::Render,
                (DeclKind::Method, ON_INIT | ON_DESTROY) => {
                    let lifecycle = LifecycleMetadata {
                        body: f.body,
                        is_async: f.is_async,
                        comments,
                        source,
                    };
                    if name == ON_INIT {
                        MemberRole::OnInit(lifecycle)
                    } else {
                        MemberRole::OnDestroy(lifecycle)
                    }
                }
                _ => MemberRole::Method(MethodMetadata {
                    name,
                    params: f.params,
                    return_type: f.return_type,
                    body: f.body,
                    is_async: f.is_async,
                    comments,
                    source,
                }),
            }
        }
    };
    Ok(role)
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXTRACTOR
// ═══════════════════════════════════════════════════════════════════════════════

struct AnnotatedClass<'e, 'a> {
    class: &'e Class<'a>,
    kind: Marker,
    decorator: &'e Decorator<'a>,
    /// The declaring statement, widened to cover leading decorators.
    span: Span,
}

struct Extractor<'p, 'a> {
    source: &'a str,
    program: &'p Program<'a>,
    markers: MarkerTable,
}

impl<'p, 'a> Extractor<'p, 'a> {
    fn new(source: &'a str, program: &'p Program<'a>) -> Self {
        Extractor {
            source,
            program,
            markers: MarkerTable::from_program(program),
        }
    }

    fn text(&self, span: Span) -> String {
        span_text(self.source, span).to_string()
    }

    fn location(&self, offset: u32) -> SourceLocation {
        SourceLocation::from_offset(self.source, offset)
    }

    fn unit(&self) -> Result<SourceUnit, CompileError> {
        let mut imports = Vec::new();
        let mut declarations = Vec::new();
        let mut classes: Vec<AnnotatedClass<'p, 'a>> = Vec::new();
        let mut extraneous: Option<Span> = None;

        let program = self.program;
        for stmt in &program.body {
            let class = match stmt {
                Statement::ImportDeclaration(decl) => {
                    if decl.source.value != MARKER_MODULE {
                        imports.push(self.import_metadata(decl));
                    }
                    continue;
                }
                Statement::TSInterfaceDeclaration(_) | Statement::TSTypeAliasDeclaration(_) => {
                    declarations.push(self.text(stmt.span()));
                    continue;
                }
                Statement::EmptyStatement(_) => continue,
                Statement::ClassDeclaration(class) => Some(&**class),
                Statement::ExportNamedDeclaration(export) => match &export.declaration {
                    Some(Declaration::ClassDeclaration(class)) => Some(&**class),
                    Some(
                        Declaration::TSInterfaceDeclaration(_)
                        | Declaration::TSTypeAliasDeclaration(_),
                    ) => {
                        declarations.push(self.text(stmt.span()));
                        continue;
                    }
                    _ => None,
                },
                Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => Some(&**class),
                    _ => None,
                },
                _ => None,
            };
            match class.and_then(|class| self.annotated(class, stmt.span())) {
                Some(annotated) => classes.push(annotated),
                None => {
                    extraneous.get_or_insert(stmt.span());
                }
            }
        }

        let Some(first) = classes.first() else {
            return Err(CompileError::structural(
                ERR_NO_COMPONENT,
                "no @Component or @Provider class found",
            ));
        };
        if let Some(mixed) = classes.iter().find(|c| c.kind != first.kind) {
            return Err(CompileError::structural(
                ERR_MIXED_UNIT,
                "a unit declares either a component or a provider, not both",
            )
            .at(self.location(mixed.span.start)));
        }
        if classes.len() > 1 {
            return Err(CompileError::structural(
                ERR_MULTIPLE_COMPONENTS,
                format!(
                    "found {} @{} classes; a unit declares exactly one",
                    classes.len(),
                    first.kind.name()
                ),
            )
            .at(self.location(classes[1].span.start)));
        }
        if let Some(span) = extraneous {
            return Err(CompileError::structural(
                ERR_EXTRANEOUS_STATEMENT,
                "only imports, interfaces and type aliases may accompany the annotated class",
            )
            .at(self.location(span.start)));
        }
        let Some(id) = &first.class.id else {
            return Err(CompileError::structural(
                ERR_ANONYMOUS_CLASS,
                format!("@{} class has no name", first.kind.name()),
            )
            .at(self.location(first.span.start)));
        };
        let name = id.name.to_string();

        match first.kind {
            Marker::Provider => Ok(SourceUnit::Provider(self.provider(
                first,
                name,
                imports,
                declarations,
            ))),
            _ => Ok(SourceUnit::Component(self.component(
                first,
                name,
                imports,
                declarations,
            )?)),
        }
    }

    fn annotated(&self, class: &'p Class<'a>, span: Span) -> Option<AnnotatedClass<'p, 'a>> {
        let start = class
            .decorators
            .iter()
            .map(|d| d.span.start)
            .chain(std::iter::once(span.start))
            .min()
            .unwrap_or(span.start);
        class.decorators.iter().find_map(|decorator| {
            match self.markers.resolve(&decorator.expression) {
                Some(kind @ (Marker::Component | Marker::Provider)) => Some(AnnotatedClass {
                    class,
                    kind,
                    decorator,
                    span: Span::new(start, span.end),
                }),
                _ => None,
            }
        })
    }

    fn import_metadata(&self, decl: &ImportDeclaration) -> ImportMetadata {
        let mut import = ImportMetadata {
            source: decl.source.value.to_string(),
            type_only: decl.import_kind.is_type(),
            ..Default::default()
        };
        for spec in decl.specifiers.iter().flatten() {
            match spec {
                ImportDeclarationSpecifier::ImportSpecifier(s) => import.named.push(ImportedName {
                    imported: s.imported.name().to_string(),
                    local: s.local.name.to_string(),
                    type_only: s.import_kind.is_type(),
                }),
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    import.default = Some(s.local.name.to_string())
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    import.namespace = Some(s.local.name.to_string())
                }
            }
        }
        import
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Provider units
    // ───────────────────────────────────────────────────────────────────────────

    /// Removal of a decorator together with the whitespace that follows it.
    fn removal(&self, span: Span) -> Edit {
        let rest = &self.source[span.end as usize..];
        let trailing = rest.len() - rest.trim_start().len();
        Edit::replace(Span::new(span.start, span.end + trailing as u32), "")
    }

    fn provider(
        &self,
        annotated: &AnnotatedClass,
        name: String,
        imports: Vec<ImportMetadata>,
        declarations: Vec<String>,
    ) -> ProviderClassMetadata {
        let class_markers = annotated.class.decorators.iter();
        let member_markers = annotated
            .class
            .body
            .body
            .iter()
            .flat_map(|element| element_decorators(element).iter());
        let edits = class_markers
            .chain(member_markers)
            .filter(|d| self.markers.resolve(&d.expression).is_some())
            .map(|d| self.removal(d.span))
            .collect();
        tracing::debug!(provider = %name, "extracted provider class");
        ProviderClassMetadata {
            source: splice(self.source, annotated.span, edits),
            name,
            imports,
            declarations,
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Component units
    // ───────────────────────────────────────────────────────────────────────────

    fn component(
        &self,
        annotated: &AnnotatedClass,
        name: String,
        imports: Vec<ImportMetadata>,
        declarations: Vec<String>,
    ) -> Result<ComponentMetadata, CompileError> {
        let (selector, styles) = self.component_options(annotated.decorator, &name)?;
        let raw: Vec<RawMember> = annotated
            .class
            .body
            .body
            .iter()
            .map(|element| self.raw_member(element))
            .collect();
        validate_members(&name, &raw)?;

        let mut component = ComponentMetadata {
            name,
            selector,
            styles,
            imports,
            declarations,
            ..Default::default()
        };
        for member in raw {
            let location = member.location;
            match classify(member).map_err(|err| err.at(location))? {
                MemberRole::Prop(m) => component.props.push(m),
                MemberRole::State(m) => component.state.push(m),
                MemberRole::Computed(m) => component.computed.push(m),
                MemberRole::Event(m) => component.events.push(m),
                MemberRole::Ref(m) => component.refs.push(m),
                MemberRole::Provide(m) => component.providers.push(m),
                MemberRole::Inject(m) => component.injects.push(m),
                MemberRole::Method(m) => component.methods.push(m),
                MemberRole::OnInit(m) => component.on_init = Some(m),
                MemberRole::OnDestroy(m) => component.on_destroy = Some(m),
                MemberRole::Render => {}
            }
        }

        let operand = render_operand(annotated.class).ok_or_else(|| {
            CompileError::structural(ERR_MALFORMED_RENDER, "render() returns a JSX element or fragment")
        })?;
        component.template = TemplateLowerer::new(self.source).lower_root(operand)?;
        component.slots = collect_slots(&component.template);
        check_template_refs(&component.template, &component)?;

        tracing::debug!(
            component = %component.name,
            props = component.props.len(),
            state = component.state.len(),
            computed = component.computed.len(),
            events = component.events.len(),
            methods = component.methods.len(),
            slots = component.slots.len(),
            "extracted component metadata"
        );
        Ok(component)
    }

    fn component_options(
        &self,
        decorator: &Decorator,
        component: &str,
    ) -> Result<(Option<String>, String), CompileError> {
        let Expression::CallExpression(call) = &decorator.expression else {
            return Ok((None, String::new()));
        };
        let Some(first) = call.arguments.first() else {
            return Ok((None, String::new()));
        };
        let object = match first.as_expression().map(unwrap_parens) {
            Some(Expression::ObjectExpression(object)) => object,
            _ => {
                return Err(CompileError::structural(
                    ERR_COMPONENT_OPTIONS,
                    "@Component options must be an object literal",
                )
                .at(self.location(first.span().start)))
            }
        };

        let mut selector = None;
        let mut styles = String::new();
        for property in &object.properties {
            let prop = match property {
                ObjectPropertyKind::ObjectProperty(prop) if !prop.computed => prop,
                other => {
                    return Err(CompileError::structural(
                        ERR_COMPONENT_OPTIONS,
                        "@Component options use static keys only",
                    )
                    .at(self.location(other.span().start)))
                }
            };
            let key = match &prop.key {
                PropertyKey::StaticIdentifier(id) => id.name.as_str(),
                PropertyKey::StringLiteral(s) => s.value.as_str(),
                other => {
                    return Err(CompileError::structural(
                        ERR_COMPONENT_OPTIONS,
                        "@Component options use static keys only",
                    )
                    .at(self.location(other.span().start)))
                }
            };
            match key {
                "selector" => selector = Some(self.literal_string(&prop.value, key)?),
                "styles" => styles = self.literal_string(&prop.value, key)?,
                other => {
                    tracing::warn!(component, option = other, "ignoring unknown @Component option")
                }
            }
        }
        Ok((selector, styles))
    }

    fn literal_string(&self, expr: &Expression, key: &str) -> Result<String, CompileError> {
        match unwrap_parens(expr) {
            Expression::StringLiteral(s) => Ok(s.value.to_string()),
            Expression::TemplateLiteral(t) if t.expressions.is_empty() => {
                let text = span_text(self.source, t.span);
                Ok(text[1..text.len() - 1].to_string())
            }
            other => Err(CompileError::structural(
                ERR_COMPONENT_OPTIONS,
                format!("`{}` must be a string literal", key),
            )
            .at(self.location(other.span().start))),
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Members
    // ───────────────────────────────────────────────────────────────────────────

    /// `(name, is_private_name, is_computed_key)`
    fn key(&self, key: &PropertyKey) -> (String, bool, bool) {
        match key {
            PropertyKey::StaticIdentifier(id) => (id.name.to_string(), false, false),
            PropertyKey::PrivateIdentifier(id) => (format!("#{}", id.name), true, false),
            PropertyKey::StringLiteral(s) => (s.value.to_string(), false, false),
            other => (self.text(other.span()), false, true),
        }
    }

    fn raw_member(&self, element: &ClassElement) -> RawMember {
        let span = element.span();
        let decorators = element_decorators(element);
        let mut member = RawMember {
            source: self.text(span),
            location: self.location(span.start),
            ..Default::default()
        };

        let mut anchors = vec![span.start];
        for decorator in decorators {
            anchors.push(decorator.span.start);
            match self.markers.resolve(&decorator.expression) {
                Some(marker) => member.markers.push(marker),
                None => member.unknown_decorators.push(self.text(decorator.span)),
            }
        }
        member.comments = leading_comments(self.program, self.source, &anchors);

        match element {
            ClassElement::PropertyDefinition(p) => {
                let (name, private, computed) = self.key(&p.key);
                member.name = name;
                member.is_private_name = private;
                member.computed_key = computed || p.computed;
                member.kind = DeclKind::Field;
                member.is_static = p.r#static;
                member.visibility = p.accessibility.into();
                member.readonly = p.readonly;
                member.optional = p.optional;
                member.type_annotation = p
                    .type_annotation
                    .as_ref()
                    .map(|t| self.text(t.type_annotation.span()));
                member.initializer = p.value.as_ref().map(|v| self.text(v.span()));
                member.constructed = p.value.as_ref().and_then(constructed_class);
            }
            ClassElement::MethodDefinition(m) => {
                let (name, private, computed) = self.key(&m.key);
                member.name = name;
                member.is_private_name = private;
                member.computed_key = computed || m.computed;
                member.kind = match m.kind {
                    MethodDefinitionKind::Constructor => DeclKind::Constructor,
                    MethodDefinitionKind::Method => DeclKind::Method,
                    MethodDefinitionKind::Get => DeclKind::Getter,
                    MethodDefinitionKind::Set => DeclKind::Setter,
                };
                member.is_static = m.r#static;
                member.visibility = m.accessibility.into();
                member.function = Some(self.function_parts(&m.value));
            }
            ClassElement::AccessorProperty(a) => {
                let (name, private, computed) = self.key(&a.key);
                member.name = name;
                member.is_private_name = private;
                member.computed_key = computed;
                member.kind = DeclKind::AccessorField;
                member.is_static = a.r#static;
            }
            ClassElement::StaticBlock(_) => {
                member.name = "static".to_string();
                member.kind = DeclKind::StaticBlock;
                member.is_static = true;
            }
            ClassElement::TSIndexSignature(_) => {
                member.name = "[index]".to_string();
                member.kind = DeclKind::IndexSignature;
            }
        }
        member
    }

    fn function_parts(&self, func: &Function) -> FunctionParts {
        let params = &func.params;
        let start = params
            .items
            .first()
            .map(|p| p.span().start)
            .or_else(|| params.rest.as_ref().map(|r| r.span().start));
        let end = params
            .rest
            .as_ref()
            .map(|r| r.span().end)
            .or_else(|| params.items.last().map(|p| p.span().end));
        let mut parts = FunctionParts {
            params: match (start, end) {
                (Some(start), Some(end)) => self.text(Span::new(start, end)),
                _ => String::new(),
            },
            param_count: params.items.len() + usize::from(params.rest.is_some()),
            return_type: func
                .return_type
                .as_ref()
                .map(|t| self.text(t.type_annotation.span())),
            is_async: func.r#async,
            ..Default::default()
        };
        if let Some(body) = &func.body {
            let text = span_text(self.source, body.span);
            let inner = text
                .strip_prefix('{')
                .and_then(|t| t.strip_suffix('}'))
                .unwrap_or(text);
            parts.body = dedent(inner);
            parts.statement_count = body.statements.len();
            if let [Statement::ReturnStatement(ret)] = body.statements.as_slice() {
                match &ret.argument {
                    Some(arg) => {
                        parts.single_return = Some(self.text(arg.span()));
                        parts.returns_markup = matches!(
                            unwrap_parens(arg),
                            Expression::JSXElement(_) | Expression::JSXFragment(_)
                        );
                    }
                    None => parts.bare_return = true,
                }
            }
        }
        parts
    }
}

/// Operand of the `return` in `render()`.
fn render_operand<'e, 'a>(class: &'e Class<'a>) -> Option<&'e Expression<'a>> {
    class.body.body.iter().find_map(|element| match element {
        ClassElement::MethodDefinition(m)
            if m.kind == MethodDefinitionKind::Method
                && matches!(&m.key, PropertyKey::StaticIdentifier(id) if id.name == RENDER_METHOD) =>
        {
            m.value.body.as_ref().and_then(|body| match body.statements.as_slice() {
                [Statement::ReturnStatement(ret)] => ret.argument.as_ref(),
                _ => None,
            })
        }
        _ => None,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Extracts the component or provider declared by `source`.
pub fn extract(source: &str) -> Result<SourceUnit, CompileError> {
    let allocator = Allocator::default();
    let program = parse_program(&allocator, source)?;
    Extractor::new(source, &program).unit()
}

/// Extracts a component unit; a provider unit is reported as a missing component.
pub fn extract_component(source: &str) -> Result<ComponentMetadata, CompileError> {
    match extract(source)? {
        SourceUnit::Component(component) => Ok(component),
        SourceUnit::Provider(provider) => Err(CompileError::structural(
            ERR_NO_COMPONENT,
            format!("`{}` is a provider; no @Component class found", provider.name),
        )),
    }
}
