//! Multi-vocabulary JSON-LD context composition and content-addressed entities.
//!
//! `vocab-context-core` merges an ordered list of registered vocabularies into
//! one conflict-aware `@context`, choosing a collision strategy for every
//! (primary, secondary) pair, and signs entity documents by the SHA-256 of
//! their URDNA2015-canonical N-Quads. Composition and normalization are
//! deterministic: identical inputs produce identical outputs, byte-for-byte.

pub mod cache;
pub mod canonical;
pub mod collision;
pub mod compose;
pub mod entity;
pub mod registry;
pub mod session;
pub mod types;

pub use canonical::{
    BackendId, BackendKind, CanonicalizationEngine, CanonicalizationError, Normalized,
};
pub use collision::{CollisionPlan, CollisionPolicy, CollisionResolver, Strategy};
pub use compose::{ComposeError, ComposeOptions, ComposedContext, Composer};
pub use entity::{Entity, EntityError, Signature, SignatureRecord};
pub use registry::{builtin_registry, UnknownVocabularyError, VocabularyEntry, VocabularyRegistry};
pub use session::{Session, SessionConfig};
pub use types::{ContentDigest, EntityId, VocabPrefix};
