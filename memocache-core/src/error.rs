/// Error kinds the engine distinguishes, per the engine's error-handling
/// contract. `WrapIneligible` has no runtime variant: an ineligible function
/// signature is rejected at macro-expansion time with `compile_error!`, never
/// at runtime.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// Invalid cache configuration: non-positive capacity, an external store
    /// without connection parameters, or an unsupported store kind. Surfaced
    /// only at cache construction.
    #[error("invalid cache configuration: {0}")]
    ConfigInvalid(String),

    /// The external store rejected an operation. `Get` treats this as a
    /// miss; `Set` returns this failure without caching anything.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The wrapped function returned an error value.
    #[error("computation failed: {0}")]
    ComputationFailed(String),

    /// The wrapped function panicked. Never cached; every singleflight
    /// waiter observes the same synthesized failure.
    #[error("computation aborted: {0}")]
    ComputationAborted(String),

    /// A singleflight waiter's own cancellation fired while it was blocked;
    /// the leader is unaffected and its result is still cached normally.
    #[error("cancelled while waiting for in-flight computation")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
