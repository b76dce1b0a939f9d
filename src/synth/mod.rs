//! Assembles the full conforming definition of a mock type from a contract
//! descriptor and the body strategies chosen for its operations.

mod references;

use crate::contract::{describe, ContractDescriptor, Operation};
use crate::logging;
use crate::strategy::{MethodBody, StrategyEngine};
use crate::{MockError, Result};
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use syn::Type;

/// One method of the synthesized type.
#[derive(Debug, Clone)]
pub struct SynthesizedMethod {
    pub operation: Operation,
    pub body: MethodBody,
}

/// A complete, self-contained mock type definition.
#[derive(Debug, Clone)]
pub struct Definition {
    /// Contract name, e.g. `Greeter`
    pub contract: String,
    /// Path the contract is reachable at, e.g. `app::Greeter`
    pub contract_path: String,
    /// Name of the synthesized type, e.g. `GreeterMock`
    pub type_name: String,
    /// Rust source of the type
    pub source: String,
    pub methods: Vec<SynthesizedMethod>,
    /// Crates the source must be able to resolve: the contract's own crate,
    /// `dummy_mock` and the roots of `::krate::..` paths
    pub references: BTreeSet<String>,
    /// Roots of relative multi-segment paths. Each names either a crate or a
    /// module reachable through the contract's glob import.
    pub relative_roots: BTreeSet<String>,
}

impl Definition {
    /// Write the source to `path`, replacing any earlier dump.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| MockError::File(e.to_string()))?;
        }
        fs::write(path, &self.source).map_err(|e| MockError::File(e.to_string()))
    }
}

/// Template engine for mock types.
pub struct Synthesizer;

impl Synthesizer {
    pub fn synthesize(
        descriptor: &ContractDescriptor,
        engine: &StrategyEngine,
    ) -> Result<Definition> {
        let operations = describe(descriptor)?;
        logging::log_synthesis_start(&descriptor.name, operations.len());

        let mut references = BTreeSet::from(["dummy_mock".to_string()]);
        if let Some(root) = descriptor.crate_root() {
            references.insert(root.to_string());
        }
        let mut relative_roots = BTreeSet::new();

        let mut methods = Vec::with_capacity(operations.len());
        for operation in operations {
            let types = Self::validate(&descriptor.name, &operation)?;
            for ty in &types {
                let roots = references::type_roots(ty);
                references.extend(roots.crates);
                relative_roots.extend(roots.ambiguous);
            }
            let body = engine.build_body(&operation);
            methods.push(SynthesizedMethod { operation, body });
        }

        let type_name = format!("{}Mock", descriptor.unraw_name());
        let contract_path = descriptor.qualified_name();
        let source = Self::render(descriptor, &type_name, &methods);

        Ok(Definition {
            contract: descriptor.name.clone(),
            contract_path,
            type_name,
            source,
            methods,
            references,
            relative_roots,
        })
    }

    /// Check that every part of the signature can be rendered, returning the
    /// parsed parameter and return types.
    fn validate(contract: &str, operation: &Operation) -> Result<Vec<Type>> {
        let reject = |reason: String| {
            logging::log_operation_rejected(contract, &operation.name, &reason);
            Err(MockError::Synthesis(format!(
                "{contract}::{}: {reason}",
                operation.name
            )))
        };

        if syn::parse_str::<syn::Ident>(&operation.name).is_err() {
            return reject("operation name is not an identifier".to_string());
        }

        let mut types = Vec::with_capacity(operation.parameters.len() + 1);
        for parameter in &operation.parameters {
            if syn::parse::Parser::parse_str(syn::Pat::parse_single, &parameter.name).is_err() {
                return reject(format!("invalid parameter name '{}'", parameter.name));
            }
            let ty = match syn::parse_str::<Type>(&parameter.ty) {
                Ok(ty) => ty,
                Err(e) => {
                    return reject(format!(
                        "parameter '{}' has unparsable type '{}': {e}",
                        parameter.name, parameter.ty
                    ))
                }
            };
            if let Some(shape) = unsupported_parameter_shape(&ty) {
                return reject(format!(
                    "parameter '{}' of type '{}' is {shape}",
                    parameter.name, parameter.ty
                ));
            }
            types.push(ty);
        }

        if let Some(return_type) = &operation.return_type {
            let ty = match syn::parse_str::<Type>(return_type) {
                Ok(ty) => ty,
                Err(e) => return reject(format!("unparsable return type '{return_type}': {e}")),
            };
            if matches!(ty, Type::ImplTrait(_) | Type::Infer(_)) {
                return reject(format!("return type '{return_type}' has no nameable type"));
            }
            types.push(ty);
        }

        Ok(types)
    }

    fn render(descriptor: &ContractDescriptor, type_name: &str, methods: &[SynthesizedMethod]) -> String {
        let mut code = String::new();

        code.push_str(&format!(
            "// Mock type for {}\n",
            descriptor.qualified_name()
        ));
        if !descriptor.module_path.is_empty() {
            code.push_str(&format!("#[allow(unused_imports)]\nuse {}::*;\n", descriptor.module_path));
        }
        code.push('\n');

        // Registry injected through the constructor
        code.push_str(&format!("pub struct {type_name} {{\n"));
        code.push_str("    setups: ::dummy_mock::SharedRegistry,\n");
        code.push_str("}\n\n");

        code.push_str(&format!("impl {type_name} {{\n"));
        code.push_str("    pub fn new(setups: ::dummy_mock::SharedRegistry) -> Self {\n");
        code.push_str("        Self { setups }\n");
        code.push_str("    }\n\n");
        code.push_str(
            "    fn mocked_result(&self, method: &str) -> ::std::boxed::Box<dyn ::std::any::Any> {\n",
        );
        code.push_str("        let provider = self\n");
        code.push_str("            .setups\n");
        code.push_str("            .read()\n");
        code.push_str("            .ok()\n");
        code.push_str("            .and_then(|registry| registry.provider(method));\n");
        code.push_str("        match provider {\n");
        code.push_str("            Some(provider) => provider(),\n");
        code.push_str("            None => ::std::panic::panic_any(\n");
        code.push_str(
            "                ::dummy_mock::MockError::UnconfiguredOperation(method.to_string()),\n",
        );
        code.push_str("            ),\n");
        code.push_str("        }\n");
        code.push_str("    }\n");
        code.push_str("}\n\n");

        // Operations
        code.push_str("#[allow(unused_variables)]\n");
        code.push_str(&format!("impl {} for {type_name} {{\n", descriptor.name));
        for (index, method) in methods.iter().enumerate() {
            if index > 0 {
                code.push('\n');
            }
            let operation = &method.operation;
            let parameters = std::iter::once("&self".to_string())
                .chain(
                    operation
                        .parameters
                        .iter()
                        .map(|p| format!("{}: {}", p.name, p.ty)),
                )
                .join(", ");
            let returns = operation
                .return_type
                .as_deref()
                .map(|ty| format!(" -> {ty}"))
                .unwrap_or_default();

            code.push_str(&format!(
                "    fn {}({parameters}){returns} {{\n",
                operation.name
            ));
            for line in &method.body.lines {
                code.push_str(&format!("        {line}\n"));
            }
            code.push_str("    }\n");
        }
        code.push_str("}\n");

        code
    }
}

fn unsupported_parameter_shape(ty: &Type) -> Option<&'static str> {
    match ty {
        Type::ImplTrait(_) => Some("an `impl Trait` parameter"),
        Type::TraitObject(_) => Some("an unsized trait object"),
        Type::Infer(_) => Some("an inferred type"),
        Type::Macro(_) => Some("a macro invocation"),
        Type::Verbatim(_) => Some("not a Rust type"),
        Type::Paren(paren) => unsupported_parameter_shape(&paren.elem),
        Type::Group(group) => unsupported_parameter_shape(&group.elem),
        _ => None,
    }
}
