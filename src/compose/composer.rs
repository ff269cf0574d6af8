use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::cache::{CacheConfig, CacheStats, MemoCache};
use crate::collision::{CollisionPlan, CollisionPolicy, CollisionResolver, Strategy};
use crate::registry::{UnknownVocabularyError, VocabularyEntry, VocabularyRegistry};
use crate::types::identifiers::VocabPrefix;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("Cannot compose an empty vocabulary list")]
    EmptyInput,
    #[error("Unknown vocabulary: '{0}'")]
    UnknownVocabulary(String),
}

impl From<UnknownVocabularyError> for ComposeError {
    fn from(err: UnknownVocabularyError) -> Self {
        ComposeError::UnknownVocabulary(err.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComposeOptions {
    /// Inject `"@nest": "@nest"` into a single-mapping result.
    pub support_nest: bool,
    /// When false, the first context layer carries `"@propagate": false`.
    pub propagate: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            support_nest: false,
            propagate: true,
        }
    }
}

/// One pairwise decision taken while composing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanRecord {
    pub primary: VocabPrefix,
    pub secondary: VocabPrefix,
    pub plan: CollisionPlan,
}

/// `{"@context": ...}` plus the plans that shaped it.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedContext {
    document: Value,
    plans: Vec<PlanRecord>,
}

impl ComposedContext {
    /// The full `{"@context": X}` document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// `X` alone: a mapping or an ordered array of mappings.
    pub fn context(&self) -> &Value {
        &self.document["@context"]
    }

    pub fn is_layered(&self) -> bool {
        self.context().is_array()
    }

    pub fn plans(&self) -> &[PlanRecord] {
        &self.plans
    }

    pub fn into_document(self) -> Value {
        self.document
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ComposeKey {
    prefixes: Vec<String>,
    options: ComposeOptions,
}

/// Folds an ordered vocabulary list into one context.
///
/// Order is priority: `prefixes[0]` is the primary and seeds the result.
/// Every later prefix is resolved against that fixed primary, never against
/// the running result, so each decision involves exactly two vocabularies.
pub struct Composer<P = CollisionResolver> {
    registry: Arc<VocabularyRegistry>,
    policy: P,
    cache: MemoCache<ComposeKey, Arc<ComposedContext>>,
}

impl Composer<CollisionResolver> {
    pub fn new(registry: Arc<VocabularyRegistry>, cache: &CacheConfig) -> Self {
        Self::with_policy(registry, CollisionResolver, cache)
    }
}

impl<P> Composer<P>
where
    P: CollisionPolicy,
{
    pub fn with_policy(registry: Arc<VocabularyRegistry>, policy: P, cache: &CacheConfig) -> Self {
        Self {
            registry,
            policy,
            cache: MemoCache::new(cache),
        }
    }

    pub fn registry(&self) -> &Arc<VocabularyRegistry> {
        &self.registry
    }

    pub fn compose<S>(
        &self,
        prefixes: &[S],
        options: ComposeOptions,
    ) -> Result<Arc<ComposedContext>, ComposeError>
    where
        S: AsRef<str>,
    {
        if prefixes.is_empty() {
            return Err(ComposeError::EmptyInput);
        }

        let key = ComposeKey {
            prefixes: prefixes.iter().map(|p| p.as_ref().to_string()).collect(),
            options,
        };
        self.cache
            .get_or_try_insert_with(key, || self.compose_uncached(prefixes, options).map(Arc::new))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn compose_uncached<S>(
        &self,
        prefixes: &[S],
        options: ComposeOptions,
    ) -> Result<ComposedContext, ComposeError>
    where
        S: AsRef<str>,
    {
        let primary = self.registry.resolve(prefixes[0].as_ref())?;
        let mut layers = Layers::seed(primary);
        let mut plans = Vec::with_capacity(prefixes.len() - 1);
        let mut seen: Vec<&str> = vec![primary.prefix.as_str()];

        for raw in &prefixes[1..] {
            let secondary = self.registry.resolve(raw.as_ref())?;

            // A vocabulary never collides with itself.
            if seen.contains(&secondary.prefix.as_str()) {
                debug!(prefix = %secondary.prefix, "skipping repeated vocabulary");
                continue;
            }
            seen.push(secondary.prefix.as_str());

            let plan = self.policy.choose(primary, secondary);
            layers.fold(primary, secondary, &plan.strategy);
            plans.push(PlanRecord {
                primary: primary.prefix.clone(),
                secondary: secondary.prefix.clone(),
                plan,
            });
        }

        let context = layers.finish(options);
        Ok(ComposedContext {
            document: json!({ "@context": context }),
            plans,
        })
    }
}

struct Layers {
    layers: Vec<Map<String, Value>>,
    // index of the primary vocabulary's layer
    primary: usize,
}

impl Layers {
    fn seed(primary: &VocabularyEntry) -> Self {
        Self {
            layers: vec![primary.context.clone()],
            primary: 0,
        }
    }

    fn fold(
        &mut self,
        primary: &VocabularyEntry,
        secondary: &VocabularyEntry,
        strategy: &Strategy,
    ) {
        match strategy {
            Strategy::PropertyScoped { property } => {
                self.layers[self.primary].insert(property.clone(), secondary.context_value());
            }
            Strategy::NestedContexts { outer, .. } => {
                if outer == &primary.prefix {
                    self.layers.push(secondary.context.clone());
                } else {
                    self.layers.insert(0, secondary.context.clone());
                    self.primary += 1;
                }
            }
            Strategy::GraphPartition { .. }
            | Strategy::ContextVersioning { .. }
            | Strategy::SeparateGraphs => {
                self.layers.push(secondary.context.clone());
            }
        }
    }

    fn finish(mut self, options: ComposeOptions) -> Value {
        if !options.propagate {
            if let Some(first) = self.layers.first_mut() {
                first.insert("@propagate".into(), Value::Bool(false));
            }
        }

        if self.layers.len() == 1 {
            let mut only = self.layers.remove(0);
            if options.support_nest {
                only.insert("@nest".into(), Value::String("@nest".into()));
            }
            Value::Object(only)
        } else {
            Value::Array(self.layers.into_iter().map(Value::Object).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CollisionFeatures;

    fn registry() -> Arc<VocabularyRegistry> {
        let mut registry = VocabularyRegistry::new();
        let make = |prefix: &str, term: &str| {
            let mut context = Map::new();
            context.insert(term.to_string(), json!(format!("http://{prefix}.example/{term}")));
            VocabularyEntry::new(
                VocabPrefix::new(prefix).unwrap(),
                format!("http://{prefix}.example/"),
                context,
            )
        };
        registry.register(make("a", "alpha")).unwrap();
        registry.register(make("b", "beta")).unwrap();
        registry
            .register(make("c", "gamma").with_features(CollisionFeatures {
                nested_in: ["a".to_string()].into_iter().collect(),
                ..CollisionFeatures::default()
            }))
            .unwrap();
        Arc::new(registry)
    }

    #[test]
    fn test_single_vocabulary_is_pass_through() {
        let composer = Composer::new(registry(), &CacheConfig::new(8, None));
        let composed = composer.compose(&["a"], ComposeOptions::default()).unwrap();
        assert_eq!(composed.document(), &json!({"@context": {"alpha": "http://a.example/alpha"}}));
        assert!(composed.plans().is_empty());
    }

    #[test]
    fn test_repeated_prefix_short_circuits() {
        let composer = Composer::new(registry(), &CacheConfig::disabled());
        let once = composer.compose(&["a"], ComposeOptions::default()).unwrap();
        let twice = composer.compose(&["a", "a"], ComposeOptions::default()).unwrap();
        assert_eq!(once.document(), twice.document());
        assert!(twice.plans().is_empty());
    }

    #[test]
    fn test_propagate_false_marks_first_layer() {
        let composer = Composer::new(registry(), &CacheConfig::disabled());
        let options = ComposeOptions {
            propagate: false,
            ..ComposeOptions::default()
        };
        let single = composer.compose(&["a"], options).unwrap();
        assert_eq!(single.context()["@propagate"], json!(false));

        let layered = composer.compose(&["a", "b"], options).unwrap();
        assert_eq!(layered.context()[0]["@propagate"], json!(false));
        assert!(layered.context()[1].get("@propagate").is_none());
    }

    #[test]
    fn test_nest_only_for_single_mapping() {
        let composer = Composer::new(registry(), &CacheConfig::disabled());
        let options = ComposeOptions {
            support_nest: true,
            ..ComposeOptions::default()
        };
        let single = composer.compose(&["a"], options).unwrap();
        assert_eq!(single.context()["@nest"], json!("@nest"));

        let layered = composer.compose(&["a", "b"], options).unwrap();
        assert!(layered.is_layered());
        assert!(layered.context()[0].get("@nest").is_none());
    }

    #[test]
    fn test_inner_vocabulary_placed_after_outer() {
        let composer = Composer::new(registry(), &CacheConfig::disabled());
        let composed = composer.compose(&["c", "a"], ComposeOptions::default()).unwrap();
        // c declares itself nested in a, so a is outer even though c is primary.
        assert_eq!(
            composed.context(),
            &json!([{"alpha": "http://a.example/alpha"}, {"gamma": "http://c.example/gamma"}])
        );
    }

    #[test]
    fn test_cache_serves_repeat_calls() {
        let composer = Composer::new(registry(), &CacheConfig::new(8, None));
        let first = composer.compose(&["a", "b"], ComposeOptions::default()).unwrap();
        let second = composer.compose(&["a", "b"], ComposeOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(composer.cache_stats().hits, 1);
    }
}
