//! Output verification.
//!
//! Generated script is parsed again and run through semantic analysis before it is handed
//! back, so a printer bug surfaces as an [`CompileError::InvalidOutput`] rather than as a
//! broken file in the caller's build. Single-file-component outputs (Vue, Svelte) are
//! checked through their `<script>` block.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use regex::Regex;

use crate::error::CompileError;
use crate::target::Target;

lazy_static! {
    static ref SCRIPT_BLOCK_RE: Regex = Regex::new(r"(?s)<script[^>]*>(.*?)</script>").unwrap();
}

fn source_type(target: Target) -> SourceType {
    let source_type = SourceType::default().with_module(true).with_typescript(true);
    match target {
        Target::React => source_type.with_jsx(true),
        Target::Vue | Target::Svelte | Target::Lit => source_type,
    }
}

/// The part of `code` that is TypeScript.
fn script_of(target: Target, code: &str) -> Result<&str, CompileError> {
    match target {
        Target::React | Target::Lit => Ok(code),
        Target::Vue | Target::Svelte => SCRIPT_BLOCK_RE
            .captures(code)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| CompileError::invalid_output(target, "missing <script> block")),
    }
}

/// Parses `script`, runs semantic checks and hands the program to `f`.
fn checked<R>(
    target: Target,
    script: &str,
    f: impl for<'a> FnOnce(&oxc_ast::ast::Program<'a>) -> R,
) -> Result<R, CompileError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, script, source_type(target)).parse();
    if let Some(error) = ret.errors.first() {
        return Err(CompileError::invalid_output(target, error.to_string()));
    }
    if ret.panicked {
        return Err(CompileError::invalid_output(target, "parser aborted"));
    }
    let semantic = SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(&ret.program);
    if let Some(error) = semantic.errors.first() {
        return Err(CompileError::invalid_output(target, error.to_string()));
    }
    Ok(f(&ret.program))
}

/// Fails with `InvalidOutput` when the generated script does not parse or does not pass
/// semantic analysis.
pub fn verify(target: Target, code: &str) -> Result<(), CompileError> {
    verify_module(target, script_of(target, code)?)?;
    tracing::trace!(target = %target, bytes = code.len(), "output verified");
    Ok(())
}

/// Like [`verify`] for a plain TypeScript module, e.g. a compiled provider class.
pub fn verify_module(target: Target, code: &str) -> Result<(), CompileError> {
    checked(target, code, |_| ())
}

/// Reprints script-only outputs through the code generator. Other outputs are returned as
/// they are.
pub fn normalize(target: Target, code: &str) -> Result<String, CompileError> {
    match target {
        Target::React | Target::Lit => checked(target, code, |program| Codegen::new().build(program).code),
        Target::Vue | Target::Svelte => Ok(code.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_outputs() {
        verify(Target::React, "export function A() {\n  return <div />;\n}\n").unwrap();
        verify(Target::Lit, "export class A { x: number = 1; }\n").unwrap();
        verify(
            Target::Vue,
            "<script setup lang=\"ts\">\nconst a = ref<number>(1);\n</script>\n\n<template>\n  <p>{{ a }}</p>\n</template>\n",
        )
        .unwrap();
        verify(
            Target::Svelte,
            "<script lang=\"ts\">\nlet n = 0;\nlet d: number;\n$: d = n * 2;\n</script>\n\n<p>{d}</p>\n",
        )
        .unwrap();
    }

    #[test]
    fn test_syntax_error_is_invalid_output() {
        let err = verify(Target::Lit, "export class A { x = ; }").unwrap_err();
        assert_eq!(err.kind(), "InvalidOutput");
        assert_eq!(err.code(), crate::error::ERR_INVALID_OUTPUT);
    }

    #[test]
    fn test_redeclaration_is_invalid_output() {
        let err = verify(
            Target::Svelte,
            "<script lang=\"ts\">\nlet a = 1;\nlet a = 2;\n</script>\n",
        )
        .unwrap_err();
        assert_eq!(err.kind(), "InvalidOutput");
    }

    #[test]
    fn test_missing_script_block() {
        let err = verify(Target::Vue, "<template><p /></template>").unwrap_err();
        assert_eq!(err.kind(), "InvalidOutput");
    }

    #[test]
    fn test_normalize_reprints_scripts_only() {
        let out = normalize(Target::Lit, "export class A {x=1}").unwrap();
        assert!(out.contains("export class A {"));
        assert!(out.contains("x = 1;"));
        let sfc = "<script lang=\"ts\">let a=1</script>\n";
        assert_eq!(normalize(Target::Svelte, sfc).unwrap(), sfc);
    }
}
