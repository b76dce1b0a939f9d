use crate::backend::{CachingBackend, DispatchBackend, ReferenceSet, SynthesisBackend, SynthesizedType};
use crate::config::Config;
use crate::contract::{Contract, OperationToken};
use crate::handle::MockHandle;
use crate::logging;
use crate::registry::{self, SetupRegistry, SharedRegistry};
use crate::strategy::StrategyEngine;
use crate::synth::Synthesizer;
use crate::Result;
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// Everything a mock needs to build its type. Nothing here is global:
/// mocks share a type cache only when they share a backend.
#[derive(Clone)]
pub struct MockOptions {
    pub engine: Arc<StrategyEngine>,
    pub backend: Arc<dyn SynthesisBackend>,
    pub references: ReferenceSet,
    /// Directory receiving the generated source of every built type
    pub dump_dir: Option<PathBuf>,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            engine: Arc::new(StrategyEngine::default()),
            backend: Arc::new(DispatchBackend),
            references: ReferenceSet::default(),
            dump_dir: None,
        }
    }
}

impl MockOptions {
    pub fn from_config(config: &Config) -> Self {
        let mut options = Self::default();
        options
            .references
            .extend(config.synthesis.references.iter().cloned());
        if config.synthesis.share_types {
            options.backend = Arc::new(CachingBackend::new(DispatchBackend));
        }
        options.dump_dir = config.synthesis.dump_dir.clone();
        options
    }

    /// Options from `.dummy-mock.toml` in the working directory, with the
    /// configured log filter installed. Falls back to defaults when the file
    /// is missing or broken.
    pub fn from_project_config() -> Self {
        let config = Config::load_or_default();
        logging::init(config.log_filter());
        Self::from_config(&config)
    }

    pub fn with_engine(mut self, engine: StrategyEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    pub fn with_backend(mut self, backend: impl SynthesisBackend + 'static) -> Self {
        self.backend = Arc::new(backend);
        self
    }

    /// Use a backend shared with other options, e.g. one `CachingBackend`
    /// for a whole test module.
    pub fn with_shared_backend(mut self, backend: Arc<dyn SynthesisBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_reference(mut self, root: impl Into<String>) -> Self {
        self.references.insert(root);
        self
    }

    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }
}

impl fmt::Debug for MockOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockOptions")
            .field("engine", &self.engine)
            .field("backend", &self.backend.name())
            .field("references", &self.references)
            .field("dump_dir", &self.dump_dir)
            .finish()
    }
}

/// Lifecycle of the object behind a [`Mock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// `object` has not been called yet.
    Uninitialized,
    /// The object was built and is cached.
    Built,
    /// Building failed; the error is replayed on every `object` call.
    Failed,
}

struct Built<C: Contract + ?Sized> {
    object: Arc<C::Object>,
    ty: Arc<SynthesizedType>,
}

/// Test double for the contract `C`, typically `dyn SomeTrait`.
///
/// Setups are keyed by operation only. Operations sharing a name share one
/// setup, and arguments never select between setups.
pub struct Mock<C: Contract + ?Sized> {
    setups: SharedRegistry,
    options: MockOptions,
    built: OnceLock<Result<Built<C>>>,
    _contract: PhantomData<fn() -> *const C>,
}

impl<C: Contract + ?Sized> Mock<C> {
    pub fn new() -> Self {
        Self::with_options(MockOptions::default())
    }

    pub fn with_options(options: MockOptions) -> Self {
        Self {
            setups: SetupRegistry::new().shared(),
            options,
            built: OnceLock::new(),
            _contract: PhantomData,
        }
    }

    /// Register `provider` as the behavior of `operation`, replacing any
    /// earlier setup for it. Legal before and after `object` was built.
    ///
    /// Setups for void and unit-future operations are accepted but the
    /// built-in strategies never consult them.
    pub fn setup<R, F>(&self, operation: C::Op, provider: F) -> &Self
    where
        R: 'static,
        F: Fn() -> R + Send + Sync + 'static,
    {
        let name = operation.name();
        let replaced = {
            let mut setups = match self.setups.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            setups.register(name, registry::provider(provider))
        };
        logging::log_setup_registered(std::any::type_name::<C>(), name, replaced);
        self
    }

    /// The mock object, built on first access and cached afterwards.
    ///
    /// Concurrent first calls build once; all callers observe the same
    /// object, or the same error.
    pub fn object(&self) -> Result<Arc<C::Object>> {
        match self.built.get_or_init(|| self.build()) {
            Ok(built) => Ok(built.object.clone()),
            Err(error) => Err(error.clone()),
        }
    }

    pub fn state(&self) -> BuildState {
        match self.built.get() {
            None => BuildState::Uninitialized,
            Some(Ok(_)) => BuildState::Built,
            Some(Err(_)) => BuildState::Failed,
        }
    }

    /// Generated source of the built type, once `object` succeeded.
    pub fn definition_source(&self) -> Option<&str> {
        match self.built.get() {
            Some(Ok(built)) => Some(built.ty.source.as_str()),
            _ => None,
        }
    }

    /// Operations with a registered setup, sorted.
    pub fn registered_operations(&self) -> Vec<String> {
        match self.setups.read() {
            Ok(setups) => setups.operation_names(),
            Err(poisoned) => poisoned.into_inner().operation_names(),
        }
    }

    pub fn options(&self) -> &MockOptions {
        &self.options
    }

    fn build(&self) -> Result<Built<C>> {
        let contract = std::any::type_name::<C>();
        let result = self.try_build();
        match &result {
            Ok(_) => logging::log_instance_created(contract, self.registered_operations().len()),
            Err(error) => logging::log_build_failed(contract, error),
        }
        result
    }

    fn try_build(&self) -> Result<Built<C>> {
        let descriptor = C::descriptor();
        let definition = Synthesizer::synthesize(&descriptor, &self.options.engine)?;

        if let Some(dir) = &self.options.dump_dir {
            let path = dir.join(format!("{}.rs", definition.type_name));
            match definition.write_to_file(&path) {
                Ok(()) => logging::log_definition_dumped(
                    &definition.type_name,
                    &path.display().to_string(),
                ),
                Err(e) => tracing::warn!("Failed to write mock type source: {}", e),
            }
        }

        // The contract's own crate is always resolvable
        let mut references = self.options.references.clone();
        references.extend(descriptor.crate_root());

        let ty = self.options.backend.compile(&definition, &references)?;
        let object = Arc::new(C::instantiate(MockHandle::new(
            ty.clone(),
            self.setups.clone(),
        )));

        Ok(Built { object, ty })
    }
}

impl<C: Contract + ?Sized> Default for Mock<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Contract + ?Sized> fmt::Debug for Mock<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mock")
            .field("contract", &std::any::type_name::<C>())
            .field("state", &self.state())
            .field("setups", &self.registered_operations())
            .finish()
    }
}
