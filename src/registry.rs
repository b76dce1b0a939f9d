use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Deferred result of one operation. Invoked on every call.
pub type Provider = Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>;

/// Registry shared between a `Mock` and every object it hands out.
pub type SharedRegistry = Arc<RwLock<SetupRegistry>>;

/// Wrap a typed closure into a type-erased provider.
pub fn provider<R, F>(f: F) -> Provider
where
    R: 'static,
    F: Fn() -> R + Send + Sync + 'static,
{
    Arc::new(move || Box::new(f()) as Box<dyn Any>)
}

/// Mapping from operation name to provider. The last registration for a
/// name wins.
#[derive(Clone, Default)]
pub struct SetupRegistry {
    entries: HashMap<String, Provider>,
}

impl SetupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Store `provider` for `operation`, returning whether an earlier entry was replaced.
    pub fn register(&mut self, operation: &str, provider: Provider) -> bool {
        self.entries
            .insert(operation.to_string(), provider)
            .is_some()
    }

    pub fn provider(&self, operation: &str) -> Option<Provider> {
        self.entries.get(operation).cloned()
    }

    pub fn contains(&self, operation: &str) -> bool {
        self.entries.contains_key(operation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered operation names, sorted.
    pub fn operation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for SetupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupRegistry")
            .field("operations", &self.operation_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of<R: Clone + 'static>(registry: &SetupRegistry, operation: &str) -> Option<R> {
        let provider = registry.provider(operation)?;
        provider().downcast_ref::<R>().cloned()
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = SetupRegistry::new();
        assert!(registry.is_empty());

        let replaced = registry.register("get_greeting", provider(|| "hi".to_string()));

        assert!(!replaced);
        assert!(registry.contains("get_greeting"));
        assert_eq!(
            value_of::<String>(&registry, "get_greeting").as_deref(),
            Some("hi")
        );
        assert!(registry.provider("process").is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = SetupRegistry::new();
        registry.register("process", provider(|| 1_i32));
        let replaced = registry.register("process", provider(|| 2_i32));

        assert!(replaced);
        assert_eq!(registry.len(), 1);
        assert_eq!(value_of::<i32>(&registry, "process"), Some(2));
    }

    #[test]
    fn test_provider_runs_on_every_resolution() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = SetupRegistry::new();
        registry.register(
            "tick",
            provider(move || counter.fetch_add(1, Ordering::SeqCst)),
        );

        assert_eq!(value_of::<usize>(&registry, "tick"), Some(0));
        assert_eq!(value_of::<usize>(&registry, "tick"), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_operation_names_are_sorted() {
        let mut registry = SetupRegistry::new();
        registry.register("b", provider(|| ()));
        registry.register("a", provider(|| ()));
        assert_eq!(registry.operation_names(), vec!["a", "b"]);
    }
}
