pub mod memo;

pub use memo::{CacheConfig, CacheStats, MemoCache};
