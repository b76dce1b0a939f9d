use crate::backend::SynthesizedType;
use crate::logging;
use crate::registry::{Provider, SharedRegistry};
use crate::strategy::Behavior;
use crate::{MockError, Result};
use futures_util::future::{BoxFuture, LocalBoxFuture};
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Runtime state behind every mock object: the built type and the live
/// registry of the `Mock` that created it.
///
/// Behavior always goes through the registry, so setups registered after
/// the object was handed out still apply.
#[derive(Clone)]
pub struct MockHandle {
    ty: Arc<SynthesizedType>,
    setups: SharedRegistry,
}

impl MockHandle {
    pub fn new(ty: Arc<SynthesizedType>, setups: SharedRegistry) -> Self {
        Self { ty, setups }
    }

    pub fn synthesized_type(&self) -> &SynthesizedType {
        &self.ty
    }

    pub fn setups(&self) -> &SharedRegistry {
        &self.setups
    }

    /// Run `operation` and return its result as `R`.
    pub fn try_dispatch<R: 'static>(&self, operation: &str) -> Result<R> {
        let entry = self
            .ty
            .entry(operation)
            .ok_or_else(|| MockError::UnknownOperation(operation.to_string()))?;
        let mismatch = || MockError::ResultTypeMismatch {
            operation: operation.to_string(),
            expected: entry.return_type.clone(),
        };

        let outcome: Box<dyn Any> = match &entry.behavior {
            Behavior::Nothing => Box::new(()),
            Behavior::CompletedFuture => return completed_future::<R>().ok_or_else(mismatch),
            Behavior::Lookup => {
                let provider = self
                    .provider(operation)
                    .ok_or_else(|| MockError::UnconfiguredOperation(operation.to_string()))?;
                provider()
            }
            Behavior::LookupOr(fallback) => {
                let provider = self.provider(operation).unwrap_or_else(|| fallback.clone());
                provider()
            }
            Behavior::Always(provider) => provider(),
        };

        outcome.downcast::<R>().map(|value| *value).map_err(|_| mismatch())
    }

    /// Like [`MockHandle::try_dispatch`], raising failures as a panic whose
    /// payload is the [`MockError`].
    pub fn dispatch<R: 'static>(&self, operation: &str) -> R {
        match self.try_dispatch(operation) {
            Ok(value) => value,
            Err(error) => {
                logging::log_dispatch_failed(&self.ty.name, operation, &error);
                std::panic::panic_any(error)
            }
        }
    }

    pub fn is_configured(&self, operation: &str) -> bool {
        self.provider(operation).is_some()
    }

    // The provider is cloned out so it runs without holding the lock.
    fn provider(&self, operation: &str) -> Option<Provider> {
        let registry = match self.setups.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        registry.provider(operation)
    }
}

/// An already completed unit future in whichever representation `R` is.
fn completed_future<R: 'static>() -> Option<R> {
    cast::<R, BoxFuture<'static, ()>>(Box::pin(std::future::ready(())))
        .or_else(|| cast::<R, LocalBoxFuture<'static, ()>>(Box::pin(std::future::ready(()))))
        .or_else(|| {
            cast::<R, Pin<Box<dyn Future<Output = ()> + Send + Sync>>>(Box::pin(
                std::future::ready(()),
            ))
        })
        .or_else(|| cast::<R, std::future::Ready<()>>(std::future::ready(())))
        .or_else(|| cast::<R, futures_util::future::Ready<()>>(futures_util::future::ready(())))
}

fn cast<R: 'static, T: 'static>(value: T) -> Option<R> {
    (Box::new(value) as Box<dyn Any>)
        .downcast::<R>()
        .ok()
        .map(|value| *value)
}
