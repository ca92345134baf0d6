//! # memocache
//!
//! An in-process memoization and key-value cache: LRU/LFU/FIFO eviction, TTL
//! sweeping, singleflight-coalesced function wrapping, and a prioritized hook
//! pipeline.
//!
//! ## Features
//!
//! - **Easy to use**: add `#[cached]` to any free function to memoize it
//! - **Three eviction strategies**: LRU, LFU, FIFO
//! - **TTL expiration**: per-entry, swept lazily on access or by a background
//!   thread
//! - **Singleflight**: concurrent calls for the same key share one
//!   computation
//! - **Result-aware**: functions returning `Result<T, E>` cache only `Ok` by
//!   default, with opt-in `Err` caching under a separate TTL
//! - **Hooks**: on-hit/on-miss/on-evict/on-invalidate callbacks, ordered by
//!   phase and priority
//! - **Statistics**: hit/miss/eviction/invalidation counters via the `stats`
//!   feature
//! - **Metrics export**: an optional `MetricsExporter` for wiring into your
//!   own observability backend
//!
//! ## Quick Start
//!
//! ```rust
//! use memocache::cached;
//!
//! #[cached]
//! fn fibonacci(n: u32) -> u64 {
//!     if n <= 1 {
//!         return n as u64;
//!     }
//!     fibonacci(n - 1) + fibonacci(n - 2)
//! }
//!
//! // First call computes the result.
//! let result1 = fibonacci(10);
//! // Second call returns the cached result.
//! let result2 = fibonacci(10);
//! assert_eq!(result1, result2);
//! ```
//!
//! ## Configuring the Cache
//!
//! ```rust
//! use memocache::cached;
//!
//! #[cached(capacity = 100, eviction = "lru", ttl = 60)]
//! fn expensive_computation(x: i32) -> i32 {
//!     x * x
//! }
//!
//! assert_eq!(expensive_computation(7), 49);
//! ```
//!
//! ## Result-Returning Functions
//!
//! By default only `Ok` values are cached; `Err` values are recomputed every
//! call unless `cache_errors` is set.
//!
//! ```rust
//! use memocache::cached;
//!
//! #[cached(capacity = 10, ttl = 30)]
//! fn divide(a: i32, b: i32) -> Result<i32, String> {
//!     if b == 0 {
//!         Err("division by zero".to_string())
//!     } else {
//!         Ok(a / b)
//!     }
//! }
//!
//! assert_eq!(divide(10, 2), Ok(5));
//! assert!(divide(10, 0).is_err());
//! ```
//!
//! ## Using the Cache Facade Directly
//!
//! The engine underneath `#[cached]` is also usable without the macro, for
//! callers who want explicit control over when to read, write, or
//! invalidate:
//!
//! ```rust
//! use memocache::{Cache, CacheBuilder, StrategyKind};
//!
//! let cache: Cache<String> = CacheBuilder::new("greetings")
//!     .max_entries(500)
//!     .eviction(StrategyKind::Lru)
//!     .build()
//!     .unwrap();
//!
//! cache.set("alice", "hello, alice".to_string()).unwrap();
//! assert_eq!(cache.get("alice"), Some("hello, alice".to_string()));
//! ```

pub use memocache_core::{
    Cache, CacheBuilder, CacheOperation, CachedOutcome, CustomKeyFn, DefaultKeyGenerator, Entry,
    Error, EvictReason, HookContext, HookPipeline, KeyArg, KeyGenerator, MemoryStore,
    MetricsExporter, Predicate, Result, SimpleKeyGenerator, Stats, StatsSnapshot, Store,
    StrategyKind, ToKeyArg,
};
pub use memocache_macros::cached;
