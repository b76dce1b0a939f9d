//! Trait-driven test doubles.
//!
//! Annotate a trait with [`contract`], build a [`Mock`] for it, register
//! per-operation providers with [`Mock::setup`] and hand [`Mock::object`]
//! to the code under test.
//!
//! ```ignore
//! #[dummy_mock::contract]
//! pub trait Greeter: Send + Sync {
//!     fn get_greeting(&self) -> String;
//! }
//!
//! let mock = Mock::<dyn Greeter>::new();
//! mock.setup(GreeterOp::GetGreeting, || "hi".to_string());
//! assert_eq!(mock.object()?.get_greeting(), "hi");
//! ```

extern crate self as dummy_mock;

pub mod backend;
pub mod config;
pub mod contract;
pub mod handle;
pub mod logging;
pub mod mock;
pub mod registry;
pub mod strategy;
pub mod synth;

use miette::Diagnostic;

pub use backend::{CachingBackend, DispatchBackend, ReferenceSet, SynthesisBackend};
pub use contract::{Contract, ContractDescriptor, Operation, OperationToken, ReturnKind};
pub use dummy_mock_derive::contract;
pub use handle::MockHandle;
pub use mock::{BuildState, Mock, MockOptions};
pub use registry::{Provider, SetupRegistry, SharedRegistry};
pub use strategy::{Behavior, MethodBody, MethodStrategy, StrategyEngine};
pub use synth::{Definition, Synthesizer};

/// Result type alias for mock construction and dispatch
pub type Result<T> = std::result::Result<T, MockError>;

/// Error types for mock construction and dispatch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum MockError {
    #[error("Invalid contract: {0}")]
    #[diagnostic(
        code(dummy_mock::invalid_contract),
        help("Annotate the trait with `#[dummy_mock::contract]` or give the hand-built descriptor a valid identifier as its name.")
    )]
    InvalidContract(String),

    #[error("Failed to synthesize mock type: {0}")]
    #[diagnostic(
        code(dummy_mock::synthesis_failed),
        help("The contract has a signature the mock cannot represent. Construct a new Mock once the contract or the reference set is fixed.")
    )]
    Synthesis(String),

    #[error("No setup registered for operation '{0}'")]
    #[diagnostic(
        code(dummy_mock::unconfigured_operation),
        help("Register a provider with `mock.setup(Op::..., || value)` before calling this operation.")
    )]
    UnconfiguredOperation(String),

    #[error("Provider for operation '{operation}' did not return a value of type {expected}")]
    #[diagnostic(
        code(dummy_mock::result_type_mismatch),
        help("The provider must return exactly the declared return type, e.g. `String` rather than `&str`.")
    )]
    ResultTypeMismatch { operation: String, expected: String },

    #[error("Operation '{0}' is not part of the synthesized type")]
    #[diagnostic(
        code(dummy_mock::unknown_operation),
        help("The forwarding type and the contract descriptor disagree. Regenerate them from the same trait.")
    )]
    UnknownOperation(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(dummy_mock::config_error),
        help("Check the TOML syntax and field names of the configuration file.")
    )]
    Config(String),

    #[error("File operation failed: {0}")]
    #[diagnostic(
        code(dummy_mock::file_error),
        help("Check if you have necessary permissions and that the path exists.")
    )]
    File(String),
}

impl MockError {
    /// Structural failures are raised while building the mock type and poison the facade.
    pub fn is_build_time(&self) -> bool {
        matches!(self, MockError::InvalidContract(_) | MockError::Synthesis(_))
    }
}
