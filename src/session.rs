use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::CacheConfig;
use crate::canonical::{BackendKind, CanonicalizationBackend, CanonicalizationEngine, Normalized};
use crate::compose::{ComposeError, ComposeOptions, ComposedContext, Composer};
use crate::entity::{Entity, EntityError};
use crate::registry::{builtin_registry, RegistryError, VocabularyRegistry};
use crate::types::identifiers::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: BackendKind,
    pub compose_cache: CacheConfig,
    pub canonical_cache: CacheConfig,
}

impl SessionConfig {
    pub fn v0() -> Self {
        Self {
            backend: BackendKind::Urdna2015,
            compose_cache: CacheConfig::new(256, None),
            canonical_cache: CacheConfig::new(1024, Some(3600)),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::v0()
    }
}

/// Owns the registry, composer and canonicalization engine, and with them
/// every cache. Cloning shares the same instances; two sessions built
/// separately share nothing.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    composer: Composer,
    engine: CanonicalizationEngine,
}

impl Session {
    pub fn new(registry: VocabularyRegistry, config: &SessionConfig) -> Self {
        Self::with_backend(registry, config.backend.build(), config)
    }

    /// Uses `backend` in place of `config.backend`.
    pub fn with_backend(
        registry: VocabularyRegistry,
        backend: Box<dyn CanonicalizationBackend>,
        config: &SessionConfig,
    ) -> Self {
        let composer = Composer::new(Arc::new(registry), &config.compose_cache);
        let engine = CanonicalizationEngine::new(backend, &config.canonical_cache);
        Self {
            inner: Arc::new(SessionInner { composer, engine }),
        }
    }

    /// Session over the built-in vocabularies.
    pub fn builtin(config: &SessionConfig) -> Result<Self, RegistryError> {
        Ok(Self::new(builtin_registry()?, config))
    }

    pub fn registry(&self) -> &Arc<VocabularyRegistry> {
        self.inner.composer.registry()
    }

    pub fn composer(&self) -> &Composer {
        &self.inner.composer
    }

    pub fn engine(&self) -> &CanonicalizationEngine {
        &self.inner.engine
    }

    pub fn compose<S>(
        &self,
        prefixes: &[S],
        options: ComposeOptions,
    ) -> Result<Arc<ComposedContext>, ComposeError>
    where
        S: AsRef<str>,
    {
        self.inner.composer.compose(prefixes, options)
    }

    pub fn normalize(&self, document: &Value) -> Arc<Normalized> {
        self.inner.engine.normalize(document)
    }

    /// An entity with a freshly generated id.
    pub fn entity<S>(&self, vocab: &[S], content: Value) -> Result<Entity, EntityError>
    where
        S: AsRef<str>,
    {
        Entity::new(self, None, vocab, content)
    }

    pub fn entity_with_id<S>(
        &self,
        id: EntityId,
        vocab: &[S],
        content: Value,
    ) -> Result<Entity, EntityError>
    where
        S: AsRef<str>,
    {
        Entity::new(self, Some(id), vocab, content)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("vocabularies", &self.registry().len())
            .field("backend", &self.engine().backend_id())
            .finish()
    }
}
