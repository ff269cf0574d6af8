pub mod builtin;
pub mod entry;
pub mod registry;

pub use builtin::builtin_registry;
pub use entry::{CollisionFeatures, VersionInfo, VocabularyEntry};
pub use registry::{RegistryConfig, RegistryError, UnknownVocabularyError, VocabularyRegistry};
