pub mod composer;

pub use composer::{ComposeError, ComposeOptions, ComposedContext, Composer, PlanRecord};
