//! Core engine behind the `memocache` facade crate: entries, eviction
//! strategies, TTL-sweeping stores, singleflight call coalescing, key
//! generation, the hook pipeline, and stats. The `#[cached]` macro crate is
//! the only intended caller of most of this; everything here is also usable
//! directly for callers who want the cache without the attribute macro.

pub mod cache;
pub mod context;
pub mod debug;
pub mod entry;
pub mod error;
pub mod eviction;
pub mod hooks;
pub mod keygen;
pub mod metrics;
pub mod outcome;
pub mod singleflight;
pub mod stats;
pub mod store;

pub use cache::{Cache, CacheBuilder};
pub use context::HookContext;
pub use entry::Entry;
pub use error::{Error, Result};
pub use eviction::StrategyKind;
pub use hooks::{EvictReason, HookPipeline, Predicate};
pub use keygen::{CustomKeyFn, DefaultKeyGenerator, KeyArg, KeyGenerator, SimpleKeyGenerator, ToKeyArg};
pub use metrics::{CacheOperation, MetricsExporter};
pub use outcome::CachedOutcome;
pub use stats::{Stats, StatsSnapshot};
pub use store::{MemoryStore, Store};
