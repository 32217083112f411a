//! Member validation.
//!
//! Raw member records are checked in a fixed order and the first violation aborts
//! extraction. Each check runs over every member before the next check starts, so the
//! error a unit reports does not depend on member order within the class.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{
    CompileError, ERR_COMPUTED_SHAPE, ERR_EVENT_CONSTRAINT, ERR_MALFORMED_RENDER, ERR_MARKER_KIND,
    ERR_MEMBER_KIND, ERR_MISSING_RENDER, ERR_MULTIPLE_MARKERS, ERR_PROP_CONSTRAINT,
    ERR_STATIC_MEMBER, ERR_UNKNOWN_REF, ERR_UNMARKED_MEMBER, ERR_VISIBILITY,
};
use crate::extract::{DeclKind, Marker, RawMember, Visibility, RENDER_METHOD};
use crate::ir::{AttributeNode, AttributeValue, ComponentMetadata, TemplateNode};
use crate::visitor::{walk_attribute, TemplateVisitor};

lazy_static! {
    static ref EVENT_NAME_RE: Regex = Regex::new(r"^on[A-Z]").unwrap();
    static ref THIS_MEMBER_RE: Regex = Regex::new(r"^this\.([A-Za-z_$][A-Za-z0-9_$]*)$").unwrap();
}

type MemberCheck = fn(&RawMember) -> Result<(), CompileError>;

/// Checks in evaluation order. The render check runs last, over the whole class.
const MEMBER_CHECKS: &[MemberCheck] = &[
    check_member_kind,
    check_marker_count,
    check_marker_kind,
    check_prop,
    check_event,
    check_non_public,
    check_computed_shape,
];

pub(crate) fn validate_members(component: &str, members: &[RawMember]) -> Result<(), CompileError> {
    for check in MEMBER_CHECKS {
        for member in members {
            check(member).map_err(|err| err.at(member.location))?;
        }
    }
    check_render(component, members)
}

fn describe(markers: &[Marker]) -> String {
    markers
        .iter()
        .map(|m| format!("@{}", m.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_member_kind(m: &RawMember) -> Result<(), CompileError> {
    if m.is_static {
        return Err(CompileError::member(
            ERR_STATIC_MEMBER,
            &m.name,
            "static members are not supported",
        ));
    }
    let problem = match m.kind {
        DeclKind::Constructor => Some("constructors are not supported; initialize members inline"),
        DeclKind::AccessorField => Some("`accessor` fields are not supported"),
        DeclKind::IndexSignature => Some("index signatures are not supported"),
        DeclKind::Setter => Some("write accessors are not supported"),
        DeclKind::StaticBlock => Some("static blocks are not supported"),
        DeclKind::Field | DeclKind::Getter | DeclKind::Method => None,
    };
    if let Some(problem) = problem {
        return Err(CompileError::member(ERR_MEMBER_KIND, &m.name, problem));
    }
    if m.is_private_name {
        return Err(CompileError::member(
            ERR_MEMBER_KIND,
            &m.name,
            "#private names are not supported; use the `private` modifier",
        ));
    }
    if m.computed_key {
        return Err(CompileError::member(
            ERR_MEMBER_KIND,
            &m.name,
            "computed member names are not supported",
        ));
    }
    Ok(())
}

fn check_marker_count(m: &RawMember) -> Result<(), CompileError> {
    if m.markers.len() > 1 {
        return Err(CompileError::member(
            ERR_MULTIPLE_MARKERS,
            &m.name,
            format!("carries more than one role marker ({})", describe(&m.markers)),
        ));
    }
    if m.markers.is_empty() && matches!(m.kind, DeclKind::Field | DeclKind::Getter) {
        let hint = match m.unknown_decorators.first() {
            Some(other) => format!(" (`{}` is not a role marker)", other),
            None => String::new(),
        };
        return Err(CompileError::member(
            ERR_UNMARKED_MEMBER,
            &m.name,
            format!("data members and getters need exactly one role marker{}", hint),
        ));
    }
    Ok(())
}

fn check_marker_kind(m: &RawMember) -> Result<(), CompileError> {
    let Some(marker) = m.marker() else {
        return Ok(());
    };
    let message = match (marker, m.kind) {
        (Marker::Component | Marker::Provider, _) => {
            format!("@{} is a class marker", marker.name())
        }
        (Marker::Computed, DeclKind::Getter) => return Ok(()),
        (Marker::Computed, _) => "@Computed applies to getters only".to_string(),
        (_, DeclKind::Field) => return Ok(()),
        (_, DeclKind::Method) => {
            format!("methods carry no role marker; found @{}", marker.name())
        }
        _ => format!("@{} applies to fields only", marker.name()),
    };
    Err(CompileError::member(ERR_MARKER_KIND, &m.name, message))
}

fn check_prop(m: &RawMember) -> Result<(), CompileError> {
    if m.marker() != Some(Marker::Prop) {
        return Ok(());
    }
    if m.visibility != Visibility::Public {
        return Err(CompileError::member(ERR_PROP_CONSTRAINT, &m.name, "props must be public"));
    }
    if !m.readonly {
        return Err(CompileError::member(ERR_PROP_CONSTRAINT, &m.name, "props must be readonly"));
    }
    Ok(())
}

fn check_event(m: &RawMember) -> Result<(), CompileError> {
    if m.marker() != Some(Marker::Event) {
        return Ok(());
    }
    let problem = if m.visibility != Visibility::Public {
        Some("events must be public")
    } else if !m.readonly {
        Some("events must be readonly")
    } else if !EVENT_NAME_RE.is_match(&m.name) {
        Some("event names start with `on` followed by an upper-case letter")
    } else if m.constructed.as_deref() != Some("EventEmitter") {
        Some("events must be initialized with `new EventEmitter<T>()`")
    } else {
        None
    };
    match problem {
        Some(problem) => Err(CompileError::member(ERR_EVENT_CONSTRAINT, &m.name, problem)),
        None => Ok(()),
    }
}

fn check_non_public(m: &RawMember) -> Result<(), CompileError> {
    let marker = match m.marker() {
        Some(marker @ (Marker::State | Marker::Ref | Marker::Inject)) => marker,
        _ => return Ok(()),
    };
    if m.visibility == Visibility::Public {
        return Err(CompileError::member(
            ERR_VISIBILITY,
            &m.name,
            format!("@{} members must be private or protected", marker.name()),
        ));
    }
    if marker == Marker::Inject && !m.readonly {
        return Err(CompileError::member(
            ERR_VISIBILITY,
            &m.name,
            "injected members must be readonly",
        ));
    }
    Ok(())
}

fn check_computed_shape(m: &RawMember) -> Result<(), CompileError> {
    if m.marker() != Some(Marker::Computed) {
        return Ok(());
    }
    match &m.function {
        Some(f) if f.single_return.is_some() => Ok(()),
        _ => Err(CompileError::member(
            ERR_COMPUTED_SHAPE,
            &m.name,
            "computed getters consist of a single `return <expression>;`",
        )),
    }
}

fn check_render(component: &str, members: &[RawMember]) -> Result<(), CompileError> {
    let render = members
        .iter()
        .find(|m| m.kind == DeclKind::Method && m.name == RENDER_METHOD);
    let Some(render) = render else {
        return Err(CompileError::structural(
            ERR_MISSING_RENDER,
            format!("component `{}` has no {}() method", component, RENDER_METHOD),
        ));
    };
    let malformed = |message: &str| {
        Err(CompileError::structural(ERR_MALFORMED_RENDER, message).at(render.location))
    };
    let Some(f) = &render.function else {
        return malformed("render() has no body");
    };
    if f.param_count > 0 {
        return malformed("render() takes no parameters");
    }
    if f.bare_return {
        return malformed("render() must return JSX; its return statement has no value");
    }
    if f.single_return.is_none() {
        return malformed(&format!(
            "render() must consist of a single `return <jsx>;` statement, found {} statement(s)",
            f.statement_count
        ));
    }
    if !f.returns_markup {
        return malformed("render() must return a JSX element or fragment");
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE REFS
// ═══════════════════════════════════════════════════════════════════════════════

struct RefBindings<'m> {
    component: &'m ComponentMetadata,
    error: Option<CompileError>,
}

impl TemplateVisitor for RefBindings<'_> {
    fn visit_attribute(&mut self, attribute: &AttributeNode) {
        if attribute.name == "ref" && self.error.is_none() {
            let bound = match &attribute.value {
                AttributeValue::Expression(code) => ref_member(code).map(str::to_string),
                _ => None,
            };
            match bound {
                Some(name) if self.component.is_ref(&name) => {}
                Some(name) => {
                    self.error = Some(CompileError::member(
                        ERR_UNKNOWN_REF,
                        name,
                        "ref binding does not name a declared @Ref member",
                    ))
                }
                None => {
                    self.error = Some(CompileError::member(
                        ERR_UNKNOWN_REF,
                        attribute.value.code().unwrap_or("ref"),
                        "ref bindings take the form `ref={this.member}`",
                    ))
                }
            }
        }
        walk_attribute(self, attribute);
    }
}

/// Every `ref={this.x}` in the template must name a `@Ref` member.
pub(crate) fn check_template_refs(
    template: &TemplateNode,
    component: &ComponentMetadata,
) -> Result<(), CompileError> {
    let mut bindings = RefBindings {
        component,
        error: None,
    };
    bindings.visit_node(template);
    match bindings.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Member named by a `ref={this.x}` expression.
pub(crate) fn ref_member(code: &str) -> Option<&str> {
    THIS_MEMBER_RE
        .captures(code.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
