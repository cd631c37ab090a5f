//! Conflict-free naming for identifiers introduced by the loop rewrite.
//!
//! A [`NameRegistry`] is scoped to one compilation unit. It is seeded with
//! every identifier that appears in the module and hands out names that are
//! not in it yet, suffixing `$1`, `$2`, … on collision.

use std::collections::{HashMap, HashSet};

use swc_ecma_ast as ast;
use swc_ecma_visit::{Visit, VisitWith};

#[derive(Debug, Default, Clone)]
pub struct NameRegistry {
    taken: HashSet<String>,
    history: HashMap<String, Vec<String>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a registry with every identifier used anywhere in `module`.
    pub fn from_module(module: &ast::Module) -> Self {
        let mut collector = IdentCollector::default();
        module.visit_with(&mut collector);
        Self {
            taken: collector.names,
            history: HashMap::new(),
        }
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Mark `name` as used without generating anything.
    pub fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_string());
    }

    /// `base` itself if nobody uses it yet, otherwise the first free `base$N`.
    pub fn fresh(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        self.fresh_suffixed(base)
    }

    /// Always a suffixed name (`this$1`), even when `base` is free.
    pub fn fresh_suffixed(&mut self, base: &str) -> String {
        let mut n = 1;
        loop {
            let candidate = format!("{base}${n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Rename a binding originally called `original` and record the new name
    /// in its history.
    pub fn rename(&mut self, original: &str) -> String {
        let renamed = self.fresh_suffixed(original);
        tracing::trace!(original, renamed = %renamed, "renamed binding");
        self.history
            .entry(original.to_string())
            .or_default()
            .push(renamed.clone());
        renamed
    }

    /// Every name `original` has been renamed to, oldest first.
    pub fn history(&self, original: &str) -> &[String] {
        self.history.get(original).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Default)]
struct IdentCollector {
    names: HashSet<String>,
}

impl Visit for IdentCollector {
    fn visit_ident(&mut self, ident: &ast::Ident) {
        self.names.insert(ident.sym.to_string());
    }
}
