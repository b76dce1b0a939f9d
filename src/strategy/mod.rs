//! Per-return-kind method body strategies.
//!
//! An engine holds an ordered chain of strategies. The first one whose
//! `matches` accepts an operation builds its body; the default value
//! strategy always closes the chain and accepts everything.

pub mod builtin;

pub use builtin::{DefaultStrategy, FutureVoidStrategy, VoidStrategy};

use crate::contract::Operation;
use crate::registry::Provider;
use std::fmt;
use std::sync::Arc;

/// Runtime semantics of a synthesized method body.
#[derive(Clone)]
pub enum Behavior {
    /// Do nothing and return nothing.
    Nothing,
    /// Return an already completed future without payload.
    CompletedFuture,
    /// Invoke the registered provider, failing when there is none.
    Lookup,
    /// Invoke the registered provider, or `fallback` when there is none.
    LookupOr(Provider),
    /// Invoke `provider`, ignoring the registry.
    Always(Provider),
}

impl Behavior {
    /// The provider this behavior carries, if any.
    pub fn provider(&self) -> Option<&Provider> {
        match self {
            Behavior::LookupOr(provider) | Behavior::Always(provider) => Some(provider),
            _ => None,
        }
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Behavior::Nothing => write!(f, "Nothing"),
            Behavior::CompletedFuture => write!(f, "CompletedFuture"),
            Behavior::Lookup => write!(f, "Lookup"),
            Behavior::LookupOr(_) => write!(f, "LookupOr(..)"),
            Behavior::Always(_) => write!(f, "Always(..)"),
        }
    }
}

/// A method body: the source lines rendered into the definition and the
/// behavior the dispatch table executes for it.
#[derive(Debug, Clone)]
pub struct MethodBody {
    pub lines: Vec<String>,
    pub behavior: Behavior,
}

impl MethodBody {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            lines: Vec::new(),
            behavior,
        }
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }
}

/// A body strategy for a family of operations.
pub trait MethodStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether this strategy handles `operation`, usually decided by its
    /// return kind and declared return type.
    fn matches(&self, operation: &Operation) -> bool;

    fn build_body(&self, operation: &Operation) -> MethodBody;
}

/// Ordered strategy chain closed by [`DefaultStrategy`].
#[derive(Clone)]
pub struct StrategyEngine {
    strategies: Vec<Arc<dyn MethodStrategy>>,
    default: DefaultStrategy,
}

impl StrategyEngine {
    pub fn builder() -> StrategyEngineBuilder {
        StrategyEngineBuilder::default()
    }

    /// First strategy accepting `operation`, or the default one.
    pub fn select(&self, operation: &Operation) -> &dyn MethodStrategy {
        self.strategies
            .iter()
            .find(|strategy| strategy.matches(operation))
            .map(|strategy| strategy.as_ref())
            .unwrap_or(&self.default as &dyn MethodStrategy)
    }

    pub fn build_body(&self, operation: &Operation) -> MethodBody {
        let strategy = self.select(operation);
        tracing::trace!(
            operation = operation.name.as_str(),
            strategy = strategy.name(),
            "Strategy selected"
        );
        strategy.build_body(operation)
    }

    /// Strategy names in evaluation order, default last.
    pub fn strategy_names(&self) -> Vec<String> {
        self.strategies
            .iter()
            .map(|strategy| strategy.name().to_string())
            .chain(std::iter::once(self.default.name().to_string()))
            .collect()
    }
}

impl Default for StrategyEngine {
    fn default() -> Self {
        Self::builder()
            .with_void_strategy()
            .with_future_void_strategy()
            .build()
    }
}

impl fmt::Debug for StrategyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyEngine")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

#[derive(Default)]
pub struct StrategyEngineBuilder {
    strategies: Vec<Arc<dyn MethodStrategy>>,
}

impl StrategyEngineBuilder {
    /// Append a strategy. Strategies are evaluated in the order they were added.
    pub fn with_strategy(mut self, strategy: impl MethodStrategy + 'static) -> Self {
        self.strategies.push(Arc::new(strategy));
        self
    }

    pub fn with_void_strategy(self) -> Self {
        self.with_strategy(VoidStrategy)
    }

    pub fn with_future_void_strategy(self) -> Self {
        self.with_strategy(FutureVoidStrategy)
    }

    pub fn build(self) -> StrategyEngine {
        StrategyEngine {
            strategies: self.strategies,
            default: DefaultStrategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ReturnKind;
    use crate::registry::provider;

    fn operation(name: &str, return_type: Option<&str>) -> Operation {
        Operation {
            name: name.to_string(),
            return_kind: ReturnKind::classify(return_type),
            return_type: return_type.map(str::to_string),
            parameters: Vec::new(),
        }
    }

    struct OptionStrategy;

    impl MethodStrategy for OptionStrategy {
        fn name(&self) -> &str {
            "option"
        }

        fn matches(&self, operation: &Operation) -> bool {
            operation.return_kind == ReturnKind::Value
                && operation
                    .return_type
                    .as_deref()
                    .is_some_and(|ty| ty.starts_with("Option"))
        }

        fn build_body(&self, _operation: &Operation) -> MethodBody {
            MethodBody::new(Behavior::LookupOr(provider(|| None::<String>))).line("None")
        }
    }

    #[test]
    fn test_default_engine_order() {
        let engine = StrategyEngine::default();
        assert_eq!(
            engine.strategy_names(),
            vec!["void", "future-void", "default"]
        );
    }

    #[test]
    fn test_builtin_selection_by_kind() {
        let engine = StrategyEngine::default();

        assert_eq!(engine.select(&operation("do_it", None)).name(), "void");
        assert_eq!(
            engine
                .select(&operation("do_async", Some("BoxFuture<'static, ()>")))
                .name(),
            "future-void"
        );
        assert_eq!(
            engine.select(&operation("get", Some("String"))).name(),
            "default"
        );
    }

    #[test]
    fn test_default_catches_everything_when_builtins_are_left_out() {
        let engine = StrategyEngine::builder().build();

        assert_eq!(engine.strategy_names(), vec!["default"]);
        assert!(matches!(
            engine.build_body(&operation("do_it", None)).behavior,
            Behavior::Lookup
        ));
    }

    #[test]
    fn test_custom_strategy_runs_ahead_of_builtins() {
        let engine = StrategyEngine::builder()
            .with_strategy(OptionStrategy)
            .with_void_strategy()
            .with_future_void_strategy()
            .build();

        assert_eq!(
            engine.strategy_names(),
            vec!["option", "void", "future-void", "default"]
        );
        let body = engine.build_body(&operation("find", Some("Option<String>")));
        assert!(matches!(body.behavior, Behavior::LookupOr(_)));
        assert_eq!(
            engine.select(&operation("get", Some("String"))).name(),
            "default"
        );
    }

    #[test]
    fn test_behavior_provider() {
        let fallback = provider(|| 1_u8);

        assert!(Behavior::LookupOr(fallback.clone())
            .provider()
            .is_some_and(|p| Arc::ptr_eq(p, &fallback)));
        assert!(Behavior::Always(fallback).provider().is_some());
        assert!(Behavior::Lookup.provider().is_none());
        assert!(Behavior::Nothing.provider().is_none());
        assert!(Behavior::CompletedFuture.provider().is_none());
    }
}
