//! Turns a synthesized definition into a type the mock facade can
//! instantiate.
//!
//! The facade only depends on [`SynthesisBackend`]; everything a backend
//! needs (reference set, caches) is passed in or owned by the backend value.

mod cache;
mod dispatch;

pub use cache::CachingBackend;
pub use dispatch::DispatchBackend;

use crate::contract::ReturnKind;
use crate::strategy::Behavior;
use crate::synth::Definition;
use crate::MockError;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Crate roots the backend may resolve paths against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSet {
    roots: BTreeSet<String>,
}

impl ReferenceSet {
    /// An empty set. Most callers want [`ReferenceSet::default`].
    pub fn empty() -> Self {
        Self {
            roots: BTreeSet::new(),
        }
    }

    pub fn with(mut self, root: impl Into<String>) -> Self {
        self.insert(root);
        self
    }

    pub fn insert(&mut self, root: impl Into<String>) -> bool {
        self.roots.insert(root.into())
    }

    pub fn contains(&self, root: &str) -> bool {
        self.roots.contains(root)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roots.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl Default for ReferenceSet {
    fn default() -> Self {
        ["std", "core", "alloc", "futures", "futures_util", "dummy_mock"]
            .into_iter()
            .fold(Self::empty(), |set, root| set.with(root))
    }
}

impl<S: Into<String>> Extend<S> for ReferenceSet {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        for root in iter {
            self.insert(root);
        }
    }
}

/// One problem found while building a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileDiagnostic {
    pub message: String,
    /// 1-based line in the definition source, when known
    pub line: Option<usize>,
    /// 0-based column in the definition source, when known
    pub column: Option<usize>,
}

impl CompileDiagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for CompileDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{}:{}: {}", line, column, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Every problem a backend found in one definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileDiagnostics {
    pub type_name: String,
    pub diagnostics: Vec<CompileDiagnostic>,
}

impl fmt::Display for CompileDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "errors occurred while building {}", self.type_name)?;
        for diagnostic in &self.diagnostics {
            write!(f, "; {}", diagnostic)?;
        }
        Ok(())
    }
}

impl From<CompileDiagnostics> for MockError {
    fn from(diagnostics: CompileDiagnostics) -> Self {
        MockError::Synthesis(diagnostics.to_string())
    }
}

/// How one operation of a built type behaves when called.
#[derive(Debug, Clone)]
pub struct DispatchEntry {
    pub kind: ReturnKind,
    /// Declared return type, `()` for void operations
    pub return_type: String,
    pub behavior: Behavior,
}

/// A built, immutable mock type: its source and its dispatch table.
#[derive(Debug)]
pub struct SynthesizedType {
    pub name: String,
    pub contract: String,
    pub source: String,
    dispatch: HashMap<String, DispatchEntry>,
}

impl SynthesizedType {
    /// Build a dispatch table from the definition's methods. When names
    /// repeat, the first declaration wins.
    pub fn from_definition(definition: &Definition) -> Self {
        let mut dispatch = HashMap::with_capacity(definition.methods.len());
        for method in &definition.methods {
            dispatch
                .entry(method.operation.name.clone())
                .or_insert_with(|| DispatchEntry {
                    kind: method.operation.return_kind,
                    return_type: method.operation.rendered_return_type().to_string(),
                    behavior: method.body.behavior.clone(),
                });
        }
        Self {
            name: definition.type_name.clone(),
            contract: definition.contract_path.clone(),
            source: definition.source.clone(),
            dispatch,
        }
    }

    pub fn entry(&self, operation: &str) -> Option<&DispatchEntry> {
        self.dispatch.get(operation)
    }

    /// Operation names in the dispatch table, sorted.
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dispatch.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Compiles definitions into instantiable types.
pub trait SynthesisBackend: Send + Sync {
    fn name(&self) -> &str;

    fn compile(
        &self,
        definition: &Definition,
        references: &ReferenceSet,
    ) -> Result<Arc<SynthesizedType>, CompileDiagnostics>;
}

impl<B: SynthesisBackend + ?Sized> SynthesisBackend for Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn compile(
        &self,
        definition: &Definition,
        references: &ReferenceSet,
    ) -> Result<Arc<SynthesizedType>, CompileDiagnostics> {
        (**self).compile(definition, references)
    }
}
