//! # Tessera Component Compiler
//!
//! Compiles one declarative component (a TypeScript class whose members carry role
//! markers from `@tessera/core` and whose `render()` returns JSX) into idiomatic source
//! for React, Vue, Svelte or Lit.
//!
//! ## Pipeline
//!
//! 1. **Extract** ([`extract`]): parse with `oxc`, validate the member invariants and build
//!    the canonical [`ComponentMetadata`] IR.
//! 2. **Transform** ([`transform`]): run the target's [`Transformer`] hooks over every
//!    member, threading one [`TransformContext`] (imports, scratch) through them.
//! 3. **Print**: the target printer lays the hook artifacts out as a complete file.
//! 4. **Verify** ([`verify`]): re-parse the generated script and run semantic checks.
//!
//! Member bodies and template expressions stay source text in the IR. Backends rewrite
//! them by re-parsing snippets and splicing span edits ([`mutation`], [`rewrite`]).
//!
//! Provider (`@Provider()`) units compile to the plain class, plus a React context when
//! targeting React.

#[cfg(feature = "napi")]
use napi_derive::napi;
use rayon::prelude::*;

pub mod compiler;
pub mod deps;
pub mod error;
pub mod extract;
pub mod imports;
pub mod ir;
pub mod lit;
pub mod mutation;
mod parse;
pub mod react;
pub mod rewrite;
mod scope;
mod style;
pub mod svelte;
pub mod target;
mod template;
pub mod transform;
mod validate;
pub mod verify;
mod visitor;
pub mod vue;

#[cfg(test)]
mod extract_tests;
#[cfg(test)]
mod pipeline_tests;
#[cfg(test)]
mod targets_tests;

pub use error::{CompileError, SourceLocation};
pub use extract::{extract, extract_component};
pub use ir::{ComponentMetadata, ProviderClassMetadata, SourceUnit, TemplateNode};
pub use parse::SnippetKind;
pub use target::{CompileOptions, CompileOutput, Target, UnknownTarget};
pub use transform::{transform, transform_metadata, Transformer, TransformContext, TransformerResult};

/// Compiles one source unit for `options.target`.
#[tracing::instrument(skip(source), fields(target = %options.target))]
pub fn compile(source: &str, options: &CompileOptions) -> Result<CompileOutput, CompileError> {
    let target = options.target;
    let output = match extract(source)? {
        SourceUnit::Component(component) => {
            let result = transform_metadata(&component, &target.transformer())?;
            let mut code = target.print(&result)?;
            if options.normalize {
                code = verify::normalize(target, &code)?;
            }
            if options.verify {
                verify::verify(target, &code)?;
            }
            CompileOutput {
                target,
                file_name: format!("{}.{}", component.name, target.extension()),
                code,
            }
        }
        SourceUnit::Provider(provider) => {
            let code = target.print_provider(&provider);
            if options.verify {
                verify::verify_module(target, &code)?;
            }
            CompileOutput {
                target,
                file_name: format!("{}.ts", provider.name),
                code,
            }
        }
    };
    tracing::debug!(file = %output.file_name, bytes = output.code.len(), "compiled unit");
    Ok(output)
}

/// Compiles a component unit for `target` with default options.
pub fn compile_component(source: &str, target: Target) -> Result<CompileOutput, CompileError> {
    compile(source, &CompileOptions::for_target(target))
}

/// Compiles independent units in parallel. Results keep the order of `sources`.
#[tracing::instrument(skip(sources), fields(units = sources.len(), target = %options.target))]
pub fn compile_many<S>(sources: &[S], options: &CompileOptions) -> Vec<Result<CompileOutput, CompileError>>
where
    S: AsRef<str> + Sync,
{
    sources
        .par_iter()
        .map(|source| compile(source.as_ref(), options))
        .collect()
}

/// Node bridge: `options_json` is a camelCase [`CompileOptions`] object. Returns the
/// [`CompileOutput`] as JSON; a compile error is thrown with its JSON form as the reason.
#[cfg(feature = "napi")]
#[napi]
pub fn compile_component_native(source: String, options_json: String) -> napi::Result<String> {
    let options: CompileOptions = if options_json.trim().is_empty() {
        CompileOptions::default()
    } else {
        serde_json::from_str(&options_json).map_err(|e| napi::Error::from_reason(e.to_string()))?
    };
    match compile(&source, &options) {
        Ok(output) => serde_json::to_string(&output).map_err(|e| napi::Error::from_reason(e.to_string())),
        Err(err) => {
            let reason = serde_json::to_string(&err).unwrap_or_else(|_| err.to_string());
            Err(napi::Error::from_reason(reason))
        }
    }
}
