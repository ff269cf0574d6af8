pub mod identifiers;

pub use identifiers::{ContentDigest, EntityId, PrefixError, VocabPrefix};
