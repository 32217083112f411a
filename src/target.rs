//! Compilation targets and options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CompileError;
use crate::ir::ProviderClassMetadata;
use crate::transform::{Transformer, TransformerResult};
use crate::{lit, react, svelte, vue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    React,
    Vue,
    Svelte,
    Lit,
}

impl Target {
    pub const ALL: [Target; 4] = [Target::React, Target::Vue, Target::Svelte, Target::Lit];

    pub fn name(self) -> &'static str {
        match self {
            Target::React => "react",
            Target::Vue => "vue",
            Target::Svelte => "svelte",
            Target::Lit => "lit",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Target::React => "tsx",
            Target::Vue => "vue",
            Target::Svelte => "svelte",
            Target::Lit => "ts",
        }
    }

    pub fn transformer(self) -> Transformer {
        match self {
            Target::React => react::transformer(),
            Target::Vue => vue::transformer(),
            Target::Svelte => svelte::transformer(),
            Target::Lit => lit::transformer(),
        }
    }

    pub fn print(self, result: &TransformerResult) -> Result<String, CompileError> {
        match self {
            Target::React => react::print(result),
            Target::Vue => vue::print(result),
            Target::Svelte => svelte::print(result),
            Target::Lit => lit::print(result),
        }
    }

    pub fn print_provider(self, provider: &ProviderClassMetadata) -> String {
        match self {
            Target::React => react::print_provider(provider),
            Target::Vue => vue::print_provider(provider),
            // Plain class module; Lit rejects injection at the component side.
            Target::Svelte | Target::Lit => svelte::print_provider(provider),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown target `{0}` (expected one of react, vue, svelte, lit)")]
pub struct UnknownTarget(pub String);

impl FromStr for Target {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "react" => Ok(Target::React),
            "vue" => Ok(Target::Vue),
            "svelte" => Ok(Target::Svelte),
            "lit" => Ok(Target::Lit),
            other => Err(UnknownTarget(other.to_string())),
        }
    }
}

/// Per-compilation options. Arrives as camelCase JSON over the Node bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    pub target: Target,
    /// Re-parse the generated script and run semantic checks on it.
    pub verify: bool,
    /// Reprint script-only outputs (React, Lit) through the code generator.
    pub normalize: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            target: Target::React,
            verify: true,
            normalize: false,
        }
    }
}

impl CompileOptions {
    pub fn for_target(target: Target) -> Self {
        CompileOptions {
            target,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub target: Target,
    pub file_name: String,
    pub code: String,
}
