pub mod classify;
pub mod descriptor;

pub use classify::ReturnKind;
pub use descriptor::{
    describe, ContractDescriptor, ContractDescriptorBuilder, Operation, OperationSignature,
    Parameter,
};

use crate::handle::MockHandle;
use std::fmt::Debug;
use std::hash::Hash;

/// A mockable surface: usually `dyn Trait` for a trait annotated with
/// `#[dummy_mock::contract]`, which generates every item below.
pub trait Contract: 'static {
    /// One token per mockable operation, used to address setups.
    type Op: OperationToken;

    /// The forwarding implementation handed out by `Mock::object`.
    type Object: Send + Sync + 'static;

    /// Declared operations of the contract.
    fn descriptor() -> ContractDescriptor;

    /// Bind a forwarding object to a built type and its live setup registry.
    fn instantiate(handle: MockHandle) -> Self::Object;
}

/// Identity of one contract operation.
///
/// Tokens are resolved to names once; the arguments a test author would pass
/// at call time never take part in selecting a setup.
pub trait OperationToken: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    fn name(&self) -> &'static str;
}
