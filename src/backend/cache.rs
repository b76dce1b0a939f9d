use super::{CompileDiagnostics, ReferenceSet, SynthesisBackend, SynthesizedType};
use crate::logging;
use crate::synth::Definition;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Shares built types between mocks of the same contract shape.
///
/// Keys are the SHA-256 of the definition source, the body behaviors and the
/// reference set. Behaviors carrying a provider are keyed by the provider's
/// identity, since two providers cannot be compared. Failed builds are not
/// cached. The cache lives in this value:
/// mocks share types only when they share the backend.
pub struct CachingBackend<B> {
    inner: B,
    types: Mutex<HashMap<String, Arc<SynthesizedType>>>,
}

impl<B: SynthesisBackend> CachingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            types: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached_types(&self) -> usize {
        self.types.lock().map(|types| types.len()).unwrap_or(0)
    }

    fn cache_key(definition: &Definition, references: &ReferenceSet) -> String {
        let mut hasher = Sha256::new();
        hasher.update(definition.source.as_bytes());
        for method in &definition.methods {
            hasher.update(format!("{}={:?}", method.operation.name, method.body.behavior));
            // A cached type keeps its providers alive, so addresses are not reused
            if let Some(provider) = method.body.behavior.provider() {
                let address = Arc::as_ptr(provider) as *const () as usize;
                hasher.update(address.to_le_bytes());
            }
            hasher.update(b";");
        }
        for root in references.iter() {
            hasher.update(root.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

impl<B: SynthesisBackend> SynthesisBackend for CachingBackend<B> {
    fn name(&self) -> &str {
        "caching"
    }

    fn compile(
        &self,
        definition: &Definition,
        references: &ReferenceSet,
    ) -> Result<Arc<SynthesizedType>, CompileDiagnostics> {
        let key = Self::cache_key(definition, references);

        // Holding the lock across the inner build keeps one build per shape
        let mut types = match self.types.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(ty) = types.get(&key) {
            logging::log_type_cache_hit(&ty.name);
            return Ok(ty.clone());
        }

        let ty = self.inner.compile(definition, references)?;
        types.insert(key, ty.clone());
        Ok(ty)
    }
}
