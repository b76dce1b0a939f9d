use super::{CompileDiagnostic, CompileDiagnostics, ReferenceSet, SynthesisBackend, SynthesizedType};
use crate::logging;
use crate::synth::Definition;
use std::collections::HashSet;
use std::sync::Arc;
use syn::{ImplItem, Item};

/// Builds a fresh dispatch-table type for every definition it is given.
///
/// The source is parsed and checked for the synthesized struct, its
/// constructor and one method per operation; every crate root the
/// definition needs must be in the reference set.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchBackend;

impl DispatchBackend {
    pub fn new() -> Self {
        Self
    }

    fn check_source(definition: &Definition) -> Vec<CompileDiagnostic> {
        let file = match syn::parse_file(&definition.source) {
            Ok(file) => file,
            Err(errors) => {
                return errors
                    .into_iter()
                    .map(|error| {
                        let start = error.span().start();
                        CompileDiagnostic::new(error.to_string()).at(start.line, start.column)
                    })
                    .collect();
            }
        };

        let mut diagnostics = Vec::new();
        let mut has_struct = false;
        let mut has_constructor = false;
        let mut implemented = HashSet::new();

        for item in &file.items {
            match item {
                Item::Struct(item) if item.ident == definition.type_name => has_struct = true,
                Item::Impl(item) if self_type_is(&item.self_ty, &definition.type_name) => {
                    let is_contract_impl = item.trait_.as_ref().is_some_and(|(_, path, _)| {
                        path.segments
                            .last()
                            .is_some_and(|segment| segment.ident == definition.contract)
                    });
                    for impl_item in &item.items {
                        let ImplItem::Fn(method) = impl_item else {
                            continue;
                        };
                        if is_contract_impl {
                            implemented.insert(method.sig.ident.to_string());
                        } else if method.sig.ident == "new" {
                            has_constructor = true;
                        }
                    }
                }
                _ => {}
            }
        }

        if !has_struct {
            diagnostics.push(CompileDiagnostic::new(format!(
                "type `{}` is not declared",
                definition.type_name
            )));
        }
        if !has_constructor {
            diagnostics.push(CompileDiagnostic::new(format!(
                "type `{}` has no registry constructor",
                definition.type_name
            )));
        }
        for method in &definition.methods {
            if !implemented.contains(&method.operation.name) {
                diagnostics.push(CompileDiagnostic::new(format!(
                    "operation `{}` of `{}` is not implemented",
                    method.operation.name, definition.contract
                )));
            }
        }

        diagnostics
    }
}

fn self_type_is(ty: &syn::Type, name: &str) -> bool {
    match ty {
        syn::Type::Path(path) => path.path.is_ident(name),
        _ => false,
    }
}

impl SynthesisBackend for DispatchBackend {
    fn name(&self) -> &str {
        "dispatch"
    }

    fn compile(
        &self,
        definition: &Definition,
        references: &ReferenceSet,
    ) -> Result<Arc<SynthesizedType>, CompileDiagnostics> {
        let mut diagnostics = Self::check_source(definition);
        for root in &definition.references {
            if !references.contains(root) {
                diagnostics.push(CompileDiagnostic::new(format!(
                    "unresolved crate `{root}`; add it to the reference set"
                )));
            }
        }
        // Relative roots may be modules behind the contract's glob import
        for root in &definition.relative_roots {
            if !references.contains(root) {
                logging::log_relative_root(&definition.type_name, root);
            }
        }

        if !diagnostics.is_empty() {
            logging::log_compile_failed(&definition.type_name, diagnostics.len());
            return Err(CompileDiagnostics {
                type_name: definition.type_name.clone(),
                diagnostics,
            });
        }

        let ty = SynthesizedType::from_definition(definition);
        logging::log_type_built(&ty.name, ty.operation_names().len());
        Ok(Arc::new(ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractDescriptor;
    use crate::strategy::{Behavior, StrategyEngine};
    use crate::synth::Synthesizer;

    fn definition() -> Definition {
        let descriptor = ContractDescriptor::builder("Greeter")
            .module_path("app")
            .operation("get_greeting", &[], Some("String"))
            .operation("notify", &[], None)
            .build();
        Synthesizer::synthesize(&descriptor, &StrategyEngine::default()).unwrap()
    }

    #[test]
    fn test_compile_builds_dispatch_table() {
        let references = ReferenceSet::default().with("app");
        let ty = DispatchBackend.compile(&definition(), &references).unwrap();

        assert_eq!(ty.name, "GreeterMock");
        assert_eq!(ty.contract, "app::Greeter");
        assert_eq!(ty.operation_names(), vec!["get_greeting", "notify"]);
        assert!(matches!(
            ty.entry("get_greeting").unwrap().behavior,
            Behavior::Lookup
        ));
        assert_eq!(ty.entry("notify").unwrap().return_type, "()");
    }

    #[test]
    fn test_every_compile_yields_a_fresh_type() {
        let references = ReferenceSet::default().with("app");
        let definition = definition();
        let first = DispatchBackend.compile(&definition, &references).unwrap();
        let second = DispatchBackend.compile(&definition, &references).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_missing_reference_is_diagnosed() {
        let error = DispatchBackend
            .compile(&definition(), &ReferenceSet::default())
            .unwrap_err();

        assert_eq!(error.type_name, "GreeterMock");
        assert_eq!(error.diagnostics.len(), 1);
        assert!(error.diagnostics[0].message.contains("`app`"));
    }

    #[test]
    fn test_module_paths_need_no_reference() {
        let descriptor = ContractDescriptor::builder("Users")
            .module_path("app")
            .operation("current", &[], Some("models::User"))
            .operation("audit", &[], Some("::chrono::Utc"))
            .build();
        let definition = Synthesizer::synthesize(&descriptor, &StrategyEngine::default()).unwrap();

        let error = DispatchBackend
            .compile(&definition, &ReferenceSet::default().with("app"))
            .unwrap_err();
        assert_eq!(error.diagnostics.len(), 1);
        assert!(error.diagnostics[0].message.contains("`chrono`"));

        let references = ReferenceSet::default().with("app").with("chrono");
        assert!(DispatchBackend.compile(&definition, &references).is_ok());
    }

    #[test]
    fn test_syntax_errors_carry_positions() {
        let mut definition = definition();
        definition.source.push_str("\nfn broken( {\n");
        let references = ReferenceSet::default().with("app");

        let error = DispatchBackend.compile(&definition, &references).unwrap_err();
        assert!(!error.diagnostics.is_empty());
        assert!(error.diagnostics[0].line.is_some());
    }

    #[test]
    fn test_missing_method_is_diagnosed() {
        let mut definition = definition();
        definition.source = definition.source.replace("fn notify(", "fn notified(");
        let references = ReferenceSet::default().with("app");

        let error = DispatchBackend.compile(&definition, &references).unwrap_err();
        assert!(error
            .diagnostics
            .iter()
            .any(|d| d.message.contains("`notify` of `Greeter` is not implemented")));
    }
}
