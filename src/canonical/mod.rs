//! Document normalization.
//!
//! The default backend expands JSON-LD to RDF and runs URDNA2015, so any two
//! RDF-equivalent documents normalize to the same bytes. A sorted-key JSON
//! serialization stands in when that fails; its output is always marked
//! degraded.

pub mod engine;
pub mod json;
pub mod rdf;
pub mod to_rdf;
pub mod urdna2015;

use thiserror::Error;

pub use engine::{
    BackendId, BackendKind, CanonicalizationBackend, CanonicalizationEngine, Normalized,
    SortedJsonBackend, Urdna2015Backend,
};
pub use json::to_sorted_json;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalizationError {
    #[error("Remote context '{0}' cannot be loaded")]
    RemoteContext(String),

    #[error("Invalid context: {0}")]
    InvalidContext(String),

    #[error("Invalid term definition for '{0}'")]
    InvalidTermDefinition(String),

    #[error("Unsupported JSON-LD feature: {0}")]
    Unsupported(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Blank node labeling exceeded {0} hashing steps")]
    ComplexityLimit(usize),
}
