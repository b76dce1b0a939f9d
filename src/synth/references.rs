use std::collections::BTreeSet;
use syn::visit::{self, Visit};
use syn::{Type, TypePath};

/// Roots that are always linked and never need to be declared.
const IMPLICIT_ROOTS: &[&str] = &["std", "core", "alloc", "crate", "self", "super", "Self"];

/// Path roots named inside one type.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct TypeRoots {
    /// `::krate::..` paths: these can only name an external crate.
    pub crates: BTreeSet<String>,
    /// `first::..` paths, which may name a crate or a module in scope.
    pub ambiguous: BTreeSet<String>,
}

/// Roots named by multi-segment paths inside `ty`.
pub(crate) fn type_roots(ty: &Type) -> TypeRoots {
    let mut collector = RootCollector::default();
    collector.visit_type(ty);
    collector.roots
}

#[derive(Default)]
struct RootCollector {
    roots: TypeRoots,
}

impl<'ast> Visit<'ast> for RootCollector {
    fn visit_type_path(&mut self, node: &'ast TypePath) {
        let path = &node.path;
        let is_absolute = path.leading_colon.is_some();
        if node.qself.is_none() && (is_absolute || path.segments.len() > 1) {
            if let Some(first) = path.segments.first() {
                let root = first.ident.to_string();
                if !IMPLICIT_ROOTS.contains(&root.as_str()) {
                    if is_absolute {
                        self.roots.crates.insert(root);
                    } else {
                        self.roots.ambiguous.insert(root);
                    }
                }
            }
        }
        visit::visit_type_path(self, node);
    }
}
