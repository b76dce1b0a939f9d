use super::classify::ReturnKind;
use crate::{MockError, Result};

/// A named, typed parameter as declared by the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: String,
}

/// One operation exactly as declared, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSignature {
    pub name: String,
    pub parameters: Vec<Parameter>,
    /// `None` when the method has no `-> T`
    pub return_type: Option<String>,
}

/// A classified operation.
///
/// Its name is the registry key: operations sharing a name share one setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub return_kind: ReturnKind,
    pub return_type: Option<String>,
    pub parameters: Vec<Parameter>,
}

impl Operation {
    /// Declared return type as it should be rendered, `()` for void methods.
    pub fn rendered_return_type(&self) -> &str {
        self.return_type.as_deref().unwrap_or("()")
    }
}

/// Static description of a contract's mockable surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDescriptor {
    pub name: String,
    /// Module the contract is declared in, e.g. `my_crate::services`
    pub module_path: String,
    pub signatures: Vec<OperationSignature>,
}

impl ContractDescriptor {
    pub fn builder(name: impl Into<String>) -> ContractDescriptorBuilder {
        ContractDescriptorBuilder {
            descriptor: ContractDescriptor {
                name: name.into(),
                module_path: String::new(),
                signatures: Vec::new(),
            },
        }
    }

    /// Path the contract is reachable at from outside its module.
    pub fn qualified_name(&self) -> String {
        if self.module_path.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.module_path, self.name)
        }
    }

    /// The name without a raw identifier prefix, e.g. `type` for `r#type`.
    pub fn unraw_name(&self) -> &str {
        self.name.strip_prefix("r#").unwrap_or(&self.name)
    }

    /// First segment of the module path, i.e. the crate declaring the contract.
    pub fn crate_root(&self) -> Option<&str> {
        self.module_path
            .split("::")
            .next()
            .filter(|root| !root.is_empty())
    }
}

pub struct ContractDescriptorBuilder {
    descriptor: ContractDescriptor,
}

impl ContractDescriptorBuilder {
    pub fn module_path(mut self, module_path: impl Into<String>) -> Self {
        self.descriptor.module_path = module_path.into();
        self
    }

    /// Declare an operation. `parameters` are `(name, type)` pairs.
    pub fn operation(
        mut self,
        name: impl Into<String>,
        parameters: &[(&str, &str)],
        return_type: Option<&str>,
    ) -> Self {
        self.descriptor.signatures.push(OperationSignature {
            name: name.into(),
            parameters: parameters
                .iter()
                .map(|(name, ty)| Parameter {
                    name: name.to_string(),
                    ty: ty.to_string(),
                })
                .collect(),
            return_type: return_type.map(str::to_string),
        });
        self
    }

    pub fn build(self) -> ContractDescriptor {
        self.descriptor
    }
}

/// Enumerate and classify the mockable operations of a contract, in
/// declaration order.
pub fn describe(descriptor: &ContractDescriptor) -> Result<Vec<Operation>> {
    let name = descriptor.name.trim();
    if name.is_empty() {
        return Err(MockError::InvalidContract(
            "contract descriptor has no name".to_string(),
        ));
    }
    if syn::parse_str::<syn::Ident>(name).is_err() {
        return Err(MockError::InvalidContract(format!(
            "'{name}' is not a valid contract identifier"
        )));
    }

    Ok(descriptor
        .signatures
        .iter()
        .map(|signature| Operation {
            name: signature.name.clone(),
            return_kind: ReturnKind::classify(signature.return_type.as_deref()),
            return_type: signature.return_type.clone(),
            parameters: signature.parameters.clone(),
        })
        .collect())
}
