//! Compiler error taxonomy.
//!
//! Every failure the compiler can report is a [`CompileError`]. Each variant carries a
//! stable code (see the constants below) so callers can match on failures without
//! parsing messages, and [`CompileError::guarantee`] names the invariant the code protects.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::target::Target;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

// Structural (TSR1xx)
pub const ERR_NO_COMPONENT: &str = "TSR101";
pub const ERR_MULTIPLE_COMPONENTS: &str = "TSR102";
pub const ERR_MIXED_UNIT: &str = "TSR103";
pub const ERR_EXTRANEOUS_STATEMENT: &str = "TSR104";
pub const ERR_MISSING_RENDER: &str = "TSR105";
pub const ERR_MALFORMED_RENDER: &str = "TSR106";
pub const ERR_ANONYMOUS_CLASS: &str = "TSR107";
pub const ERR_COMPONENT_OPTIONS: &str = "TSR108";

// Member constraints (TSR2xx)
pub const ERR_UNMARKED_MEMBER: &str = "TSR201";
pub const ERR_MULTIPLE_MARKERS: &str = "TSR202";
pub const ERR_MARKER_KIND: &str = "TSR203";
pub const ERR_PROP_CONSTRAINT: &str = "TSR204";
pub const ERR_EVENT_CONSTRAINT: &str = "TSR205";
pub const ERR_VISIBILITY: &str = "TSR206";
pub const ERR_COMPUTED_SHAPE: &str = "TSR207";
pub const ERR_STATIC_MEMBER: &str = "TSR208";
pub const ERR_MEMBER_KIND: &str = "TSR209";
pub const ERR_UNKNOWN_REF: &str = "TSR210";
pub const ERR_INJECTION_TOKEN: &str = "TSR211";

// Unsupported constructs (TSR3xx)
pub const ERR_SPREAD_ATTRIBUTE: &str = "TSR301";
pub const ERR_SPREAD_CHILD: &str = "TSR302";
pub const ERR_NESTED_JSX: &str = "TSR303";
pub const ERR_CONTROL_FORM: &str = "TSR304";
pub const ERR_MUTATION: &str = "TSR305";
pub const ERR_TAG: &str = "TSR306";

// Backends (TSR4xx)
pub const ERR_BACKEND_FEATURE: &str = "TSR401";
pub const ERR_MISSING_SELECTOR: &str = "TSR402";

// Parse / output (TSR5xx)
pub const ERR_PARSE: &str = "TSR501";
pub const ERR_INVALID_OUTPUT: &str = "TSR502";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_NO_COMPONENT | ERR_MULTIPLE_COMPONENTS => {
            "Each source unit declares exactly one annotated class."
        }
        ERR_MIXED_UNIT => "A source unit is either a component or a provider, never both.",
        ERR_EXTRANEOUS_STATEMENT => {
            "Only imports and type declarations may accompany the annotated class."
        }
        ERR_MISSING_RENDER | ERR_MALFORMED_RENDER => {
            "A component has one parameterless render() returning a single markup tree."
        }
        ERR_ANONYMOUS_CLASS => "Annotated classes are named.",
        ERR_COMPONENT_OPTIONS => "Component options are static literals.",
        ERR_UNMARKED_MEMBER | ERR_MULTIPLE_MARKERS => {
            "Every data member and accessor carries exactly one role marker."
        }
        ERR_MARKER_KIND => "Role markers are only applied to the declaration kind they describe.",
        ERR_PROP_CONSTRAINT => "Props are public and readonly.",
        ERR_EVENT_CONSTRAINT => {
            "Events are public, readonly, on-prefixed and initialized with an EventEmitter."
        }
        ERR_VISIBILITY => "State, refs and injected dependencies are not publicly visible.",
        ERR_COMPUTED_SHAPE => "Computed values are getters returning a single expression.",
        ERR_STATIC_MEMBER => "Components carry no static members.",
        ERR_MEMBER_KIND => "Components declare fields, getters and methods only.",
        ERR_UNKNOWN_REF => "Template refs bind declared @Ref members.",
        ERR_INJECTION_TOKEN => "Injected and provided members name their class token.",
        ERR_SPREAD_ATTRIBUTE | ERR_SPREAD_CHILD => "Template structure is statically analyzable.",
        ERR_NESTED_JSX => "Markup only appears in template positions or <For> callbacks.",
        ERR_CONTROL_FORM => "Control forms carry their required parts.",
        ERR_MUTATION => "Every state mutation has a functional-update equivalent.",
        ERR_TAG => "Element tags are static names.",
        ERR_BACKEND_FEATURE => "Generated code only uses features the target can express.",
        ERR_MISSING_SELECTOR => "Custom-element targets receive a selector.",
        ERR_PARSE => "Input is syntactically valid TypeScript with JSX.",
        ERR_INVALID_OUTPUT => "Generated code parses and passes semantic checks.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE LOCATION
// ═══════════════════════════════════════════════════════════════════════════════

/// 1-based line/column position in the compiled source unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn from_offset(source: &str, offset: u32) -> Self {
        let offset = (offset as usize).min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() as u32 + 1;
        let column = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count() as u32 + 1,
            None => before.chars().count() as u32 + 1,
        };
        SourceLocation { line, column }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CompileError {
    /// The unit does not have the shape of exactly one component or provider.
    #[error("[{code}] {message}")]
    StructuralViolation {
        code: &'static str,
        message: String,
        location: Option<SourceLocation>,
    },

    /// A member violates the constraints of its role.
    #[error("[{code}] member `{member}`: {message}")]
    MemberConstraintViolation {
        code: &'static str,
        member: String,
        message: String,
        location: Option<SourceLocation>,
    },

    /// Syntax the compiler cannot analyze statically.
    #[error("[{code}] {message}")]
    UnsupportedConstruct {
        code: &'static str,
        message: String,
        location: Option<SourceLocation>,
    },

    /// A feature the chosen target has no representation for.
    #[error("[{code}] the {target} target does not support {feature}")]
    BackendUnsupported {
        code: &'static str,
        target: Target,
        feature: String,
    },

    #[error("[{code}] {message}")]
    Parse {
        code: &'static str,
        message: String,
        location: Option<SourceLocation>,
    },

    #[error("[{code}] generated {target} output is invalid: {message}")]
    InvalidOutput {
        code: &'static str,
        target: Target,
        message: String,
    },
}

impl CompileError {
    pub fn structural(code: &'static str, message: impl Into<String>) -> Self {
        CompileError::StructuralViolation {
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn member(code: &'static str, member: impl Into<String>, message: impl Into<String>) -> Self {
        CompileError::MemberConstraintViolation {
            code,
            member: member.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn unsupported(code: &'static str, message: impl Into<String>) -> Self {
        CompileError::UnsupportedConstruct {
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn backend(target: Target, feature: impl Into<String>) -> Self {
        CompileError::BackendUnsupported {
            code: ERR_BACKEND_FEATURE,
            target,
            feature: feature.into(),
        }
    }

    pub fn missing_selector(target: Target) -> Self {
        CompileError::BackendUnsupported {
            code: ERR_MISSING_SELECTOR,
            target,
            feature: "components without a `selector` option".to_string(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        CompileError::Parse {
            code: ERR_PARSE,
            message: message.into(),
            location: None,
        }
    }

    pub fn invalid_output(target: Target, message: impl Into<String>) -> Self {
        CompileError::InvalidOutput {
            code: ERR_INVALID_OUTPUT,
            target,
            message: message.into(),
        }
    }

    /// Attaches a location unless one is already present.
    pub fn at(mut self, loc: SourceLocation) -> Self {
        match &mut self {
            CompileError::StructuralViolation { location, .. }
            | CompileError::MemberConstraintViolation { location, .. }
            | CompileError::UnsupportedConstruct { location, .. }
            | CompileError::Parse { location, .. } => {
                location.get_or_insert(loc);
            }
            CompileError::BackendUnsupported { .. } | CompileError::InvalidOutput { .. } => {}
        }
        self
    }

    pub fn code(&self) -> &'static str {
        match self {
            CompileError::StructuralViolation { code, .. }
            | CompileError::MemberConstraintViolation { code, .. }
            | CompileError::UnsupportedConstruct { code, .. }
            | CompileError::BackendUnsupported { code, .. }
            | CompileError::Parse { code, .. }
            | CompileError::InvalidOutput { code, .. } => code,
        }
    }

    pub fn guarantee(&self) -> &'static str {
        get_guarantee(self.code())
    }

    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            CompileError::StructuralViolation { location, .. }
            | CompileError::MemberConstraintViolation { location, .. }
            | CompileError::UnsupportedConstruct { location, .. }
            | CompileError::Parse { location, .. } => *location,
            _ => None,
        }
    }

    /// Short kind name, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::StructuralViolation { .. } => "StructuralViolation",
            CompileError::MemberConstraintViolation { .. } => "MemberConstraintViolation",
            CompileError::UnsupportedConstruct { .. } => "UnsupportedConstruct",
            CompileError::BackendUnsupported { .. } => "BackendUnsupported",
            CompileError::Parse { .. } => "Parse",
            CompileError::InvalidOutput { .. } => "InvalidOutput",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_offset() {
        let src = "ab\ncde\nf";
        assert_eq!(SourceLocation::from_offset(src, 0), SourceLocation { line: 1, column: 1 });
        assert_eq!(SourceLocation::from_offset(src, 4), SourceLocation { line: 2, column: 2 });
        assert_eq!(SourceLocation::from_offset(src, 7), SourceLocation { line: 3, column: 1 });
    }

    #[test]
    fn test_member_error_names_member() {
        let err = CompileError::member(ERR_PROP_CONSTRAINT, "title", "props must be readonly");
        assert_eq!(err.code(), "TSR204");
        assert_eq!(err.kind(), "MemberConstraintViolation");
        assert!(err.to_string().contains("`title`"));
        assert_eq!(err.guarantee(), "Props are public and readonly.");
    }

    #[test]
    fn test_at_keeps_first_location() {
        let first = SourceLocation { line: 2, column: 3 };
        let err = CompileError::structural(ERR_NO_COMPONENT, "no component")
            .at(first)
            .at(SourceLocation { line: 9, column: 9 });
        assert_eq!(err.location(), Some(first));
    }
}
