/// The `#[cached]` wrapper's cache payload for a `Result`-returning
/// function: the engine caches one `V` type per `Cache`, so a success and a
/// cacheable error share this sum type rather than two separate caches.
/// `Ok` is cached under the call's configured TTL; `Err` is cached — only
/// when error-caching is opted into — under the call's `error_ttl`, per the
/// function wrapper's "separate sentinel encoding" contract.
#[derive(Clone, Debug)]
pub enum CachedOutcome<T, E> {
    Ok(T),
    Err(E),
}

impl<T, E> CachedOutcome<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            CachedOutcome::Ok(v) => Ok(v),
            CachedOutcome::Err(e) => Err(e),
        }
    }

    pub fn is_err(&self) -> bool {
        matches!(self, CachedOutcome::Err(_))
    }
}
