pub mod entity;

pub use entity::{Entity, EntityError, Signature, SignatureRecord};
