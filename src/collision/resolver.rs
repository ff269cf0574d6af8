use tracing::{debug, warn};

use crate::collision::{AmbiguityReason, CollisionPlan, Strategy};
use crate::registry::VocabularyEntry;

/// Decides how a secondary vocabulary folds into a primary one.
///
/// Implementations must be deterministic and total.
pub trait CollisionPolicy {
    fn choose(&self, primary: &VocabularyEntry, secondary: &VocabularyEntry) -> CollisionPlan;
}

/// Metadata-driven policy. Rules are tried in this order, first match wins:
///
/// 1. `property_scoped` - primary `scopes` the secondary, or the secondary is
///    `scoped_under` the primary.
/// 2. `nested_contexts` - one entry lists the other in `nested_in`.
/// 3. `graph_partition` - the two entries declare different named graphs.
/// 4. `context_versioning` - either entry has coexisting versions, or both
///    share a namespace.
/// 5. `separate_graphs`.
///
/// A contradiction in rule 1 or 2 short-circuits to `separate_graphs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionResolver;

impl CollisionPolicy for CollisionResolver {
    fn choose(&self, primary: &VocabularyEntry, secondary: &VocabularyEntry) -> CollisionPlan {
        let plan = match self.try_choose(primary, secondary) {
            Ok(strategy) => CollisionPlan::new(strategy),
            Err(reason) => {
                warn!(
                    primary = %primary.prefix,
                    secondary = %secondary.prefix,
                    %reason,
                    "ambiguous collision metadata, falling back to separate_graphs"
                );
                CollisionPlan::degraded(reason)
            }
        };
        debug!(
            primary = %primary.prefix,
            secondary = %secondary.prefix,
            strategy = plan.strategy.name(),
            "collision plan chosen"
        );
        plan
    }
}

impl CollisionResolver {
    fn try_choose(
        &self,
        primary: &VocabularyEntry,
        secondary: &VocabularyEntry,
    ) -> Result<Strategy, AmbiguityReason> {
        if let Some(property) = scoped_property(primary, secondary)? {
            return Ok(Strategy::PropertyScoped { property });
        }
        if let Some(strategy) = nesting(primary, secondary)? {
            return Ok(strategy);
        }

        let primary_graph = primary.features.named_graph.clone();
        let secondary_graph = secondary.features.named_graph.clone();
        if (primary_graph.is_some() || secondary_graph.is_some())
            && primary_graph != secondary_graph
        {
            return Ok(Strategy::GraphPartition {
                primary_graph,
                secondary_graph,
            });
        }

        if primary.version.coexisting
            || secondary.version.coexisting
            || primary.namespace == secondary.namespace
        {
            return Ok(Strategy::ContextVersioning {
                primary_version: primary.version.current.clone(),
                secondary_version: secondary.version.current.clone(),
            });
        }

        Ok(Strategy::SeparateGraphs)
    }
}

fn scoped_property(
    primary: &VocabularyEntry,
    secondary: &VocabularyEntry,
) -> Result<Option<String>, AmbiguityReason> {
    let p = primary.prefix.as_str();
    let s = secondary.prefix.as_str();

    let by_primary = primary.features.scopes.get(s);
    let by_secondary = secondary.features.scoped_under.get(p);

    if by_primary.is_none() && by_secondary.is_none() {
        return Ok(None);
    }

    let reverse_claim =
        secondary.features.scopes.contains_key(p) || primary.features.scoped_under.contains_key(s);
    if reverse_claim {
        return Err(AmbiguityReason::MutualScoping {
            primary: p.to_string(),
            secondary: s.to_string(),
        });
    }

    match (by_primary, by_secondary) {
        (Some(a), Some(b)) if a != b => Err(AmbiguityReason::ConflictingScopeProperty {
            primary: p.to_string(),
            secondary: s.to_string(),
            declared_by_primary: a.clone(),
            declared_by_secondary: b.clone(),
        }),
        (Some(property), _) | (None, Some(property)) => Ok(Some(property.clone())),
        (None, None) => Ok(None),
    }
}

fn nesting(
    primary: &VocabularyEntry,
    secondary: &VocabularyEntry,
) -> Result<Option<Strategy>, AmbiguityReason> {
    let secondary_inside = secondary.features.nested_in.contains(primary.prefix.as_str());
    let primary_inside = primary.features.nested_in.contains(secondary.prefix.as_str());

    match (secondary_inside, primary_inside) {
        (true, true) => Err(AmbiguityReason::MutualNesting {
            primary: primary.prefix.to_string(),
            secondary: secondary.prefix.to_string(),
        }),
        (true, false) => Ok(Some(Strategy::NestedContexts {
            outer: primary.prefix.clone(),
            inner: secondary.prefix.clone(),
        })),
        (false, true) => Ok(Some(Strategy::NestedContexts {
            outer: secondary.prefix.clone(),
            inner: primary.prefix.clone(),
        })),
        (false, false) => Ok(None),
    }
}
