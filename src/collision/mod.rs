//! Pairwise merge strategy selection.
//!
//! [`CollisionResolver::choose`] is a pure function of two entries' static
//! metadata. It is total: contradictory metadata degrades to
//! [`Strategy::SeparateGraphs`] and the reason is kept on the plan.

pub mod resolver;

pub use resolver::{CollisionPolicy, CollisionResolver};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::identifiers::VocabPrefix;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Strategy {
    /// The secondary context lives under one property of the primary context.
    PropertyScoped { property: String },
    /// Two-element `[outer, inner]` context array.
    NestedContexts { outer: VocabPrefix, inner: VocabPrefix },
    /// Side-by-side contexts whose data belongs in separate named graphs.
    /// The partition is enforced by storage, not here.
    GraphPartition {
        primary_graph: Option<String>,
        secondary_graph: Option<String>,
    },
    /// Positional append so last-definition-wins is deliberate.
    ContextVersioning {
        primary_version: String,
        secondary_version: String,
    },
    SeparateGraphs,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::PropertyScoped { .. } => "property_scoped",
            Strategy::NestedContexts { .. } => "nested_contexts",
            Strategy::GraphPartition { .. } => "graph_partition",
            Strategy::ContextVersioning { .. } => "context_versioning",
            Strategy::SeparateGraphs => "separate_graphs",
        }
    }
}

/// Contradictory collision metadata. Never surfaced as a failure; the
/// resolver falls back to `separate_graphs` and records this on the plan.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AmbiguityReason {
    #[error("'{primary}' and '{secondary}' each claim to scope the other under a property")]
    MutualScoping { primary: String, secondary: String },
    #[error("'{secondary}' scoped as both '{declared_by_primary}' and '{declared_by_secondary}'")]
    ConflictingScopeProperty {
        primary: String,
        secondary: String,
        declared_by_primary: String,
        declared_by_secondary: String,
    },
    #[error("'{primary}' and '{secondary}' each declare themselves nested inside the other")]
    MutualNesting { primary: String, secondary: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionPlan {
    #[serde(flatten)]
    pub strategy: Strategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<AmbiguityReason>,
}

impl CollisionPlan {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            fallback: None,
        }
    }

    pub fn degraded(reason: AmbiguityReason) -> Self {
        Self {
            strategy: Strategy::SeparateGraphs,
            fallback: Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.fallback.is_some()
    }
}
