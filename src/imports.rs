//! Import registrar.
//!
//! Hooks register the symbols their output needs as `(symbol, module)` pairs. The
//! registrar deduplicates them, merges everything for one module into one record and keeps
//! modules in first-registration order so output is deterministic.

use serde::{Deserialize, Serialize};

use crate::ir::ImportMetadata;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedImport {
    pub imported: String,
    pub local: String,
    pub type_only: bool,
}

/// Everything imported from one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleImports {
    pub module: String,
    pub default: Option<String>,
    pub namespace: Option<String>,
    pub named: Vec<NamedImport>,
    /// Set when every binding from this module came from an `import type`.
    pub type_only: bool,
}

impl ModuleImports {
    fn new(module: &str, type_only: bool) -> Self {
        ModuleImports {
            module: module.to_string(),
            default: None,
            namespace: None,
            named: Vec::new(),
            type_only,
        }
    }

    fn is_side_effect(&self) -> bool {
        self.default.is_none() && self.namespace.is_none() && self.named.is_empty()
    }

    /// Renders as one or two statements (a namespace cannot share a clause with named imports).
    pub fn statements(&self) -> Vec<String> {
        let from = format!("\"{}\"", self.module);
        if self.is_side_effect() {
            return vec![format!("import {};", from)];
        }
        let keyword = if self.type_only { "import type" } else { "import" };
        let mut out = Vec::new();
        let mut clause = Vec::new();
        if let Some(default) = &self.default {
            clause.push(default.clone());
        }
        if !self.named.is_empty() {
            let names: Vec<String> = self
                .named
                .iter()
                .map(|n| {
                    let prefix = if n.type_only && !self.type_only { "type " } else { "" };
                    if n.imported == n.local {
                        format!("{}{}", prefix, n.local)
                    } else {
                        format!("{}{} as {}", prefix, n.imported, n.local)
                    }
                })
                .collect();
            clause.push(format!("{{ {} }}", names.join(", ")));
        }
        match &self.namespace {
            Some(ns) if self.named.is_empty() => {
                clause.push(format!("* as {}", ns));
                out.push(format!("{} {} from {};", keyword, clause.join(", "), from));
            }
            Some(ns) => {
                out.push(format!("{} {} from {};", keyword, clause.join(", "), from));
                out.push(format!("{} * as {} from {};", keyword, ns, from));
            }
            None => out.push(format!("{} {} from {};", keyword, clause.join(", "), from)),
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRegistrar {
    modules: Vec<ModuleImports>,
}

impl ImportRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, module: &str, type_only: bool) -> &mut ModuleImports {
        let index = match self.modules.iter().position(|m| m.module == module) {
            Some(index) => {
                if !type_only {
                    self.modules[index].type_only = false;
                }
                index
            }
            None => {
                self.modules.push(ModuleImports::new(module, type_only));
                self.modules.len() - 1
            }
        };
        &mut self.modules[index]
    }

    fn add_named(&mut self, imported: &str, local: &str, module: &str, type_only: bool) {
        let entry = self.entry(module, type_only);
        match entry.named.iter_mut().find(|n| n.local == local) {
            Some(existing) => {
                // A value import subsumes a type import of the same binding.
                existing.type_only &= type_only;
            }
            None => entry.named.push(NamedImport {
                imported: imported.to_string(),
                local: local.to_string(),
                type_only,
            }),
        }
    }

    /// `import { symbol } from "module"`
    pub fn named(&mut self, symbol: &str, module: &str) {
        self.add_named(symbol, symbol, module, false);
    }

    /// `import { imported as local } from "module"`
    pub fn named_as(&mut self, imported: &str, local: &str, module: &str) {
        self.add_named(imported, local, module, false);
    }

    /// `import type { symbol } from "module"`
    pub fn type_named(&mut self, symbol: &str, module: &str) {
        self.add_named(symbol, symbol, module, true);
    }

    /// `import symbol from "module"`
    pub fn default_import(&mut self, symbol: &str, module: &str) {
        let entry = self.entry(module, false);
        match &entry.default {
            Some(existing) if existing != symbol => {
                tracing::warn!(
                    module,
                    kept = %existing,
                    dropped = symbol,
                    "conflicting default imports"
                );
            }
            _ => entry.default = Some(symbol.to_string()),
        }
    }

    /// `import * as symbol from "module"`
    pub fn namespace(&mut self, symbol: &str, module: &str) {
        let entry = self.entry(module, false);
        if entry.namespace.is_none() {
            entry.namespace = Some(symbol.to_string());
        }
    }

    /// `import "module"`
    pub fn side_effect(&mut self, module: &str) {
        self.entry(module, false);
    }

    /// Registers a declaration retained from the source unit.
    pub fn register(&mut self, import: &ImportMetadata) {
        if import.default.is_none() && import.namespace.is_none() && import.named.is_empty() {
            self.side_effect(&import.source);
            return;
        }
        if let Some(default) = &import.default {
            if import.type_only {
                self.entry(&import.source, true).default = Some(default.clone());
            } else {
                self.default_import(default, &import.source);
            }
        }
        if let Some(ns) = &import.namespace {
            let entry = self.entry(&import.source, import.type_only);
            entry.namespace.get_or_insert_with(|| ns.clone());
        }
        for name in &import.named {
            self.add_named(
                &name.imported,
                &name.local,
                &import.source,
                import.type_only || name.type_only,
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Structured import records in first-registration order.
    pub fn modules(&self) -> &[ModuleImports] {
        &self.modules
    }

    pub fn statements(&self) -> Vec<String> {
        self.modules.iter().flat_map(|m| m.statements()).collect()
    }

    pub fn render(&self) -> String {
        self.statements().join("\n")
    }
}
