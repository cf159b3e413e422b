use std::sync::Arc;

/// A trait for random sources that fill packets.
///
/// This abstraction allows you to plug in a real random source or a seeded
/// one in tests.
///
/// Implementations take `&self` so a single source can be shared by every
/// task that builds packets. Sharing must not race: a source is either
/// thread-confined (see [`ThreadRandom`](crate::ThreadRandom)) or guards its
/// state with a lock (see [`SeededRandom`](crate::SeededRandom)).
///
/// # Example
/// ```
/// use pipeline_core::RandSource;
///
/// struct FixedRand;
/// impl RandSource for FixedRand {
///     fn below(&self, _upper: i64) -> i64 {
///         7
///     }
/// }
///
/// assert_eq!(FixedRand.below(20), 7);
/// ```
pub trait RandSource {
    /// Returns a value drawn uniformly from `[0, upper)`, or `0` when
    /// `upper <= 0`.
    fn below(&self, upper: i64) -> i64;
}

impl<R: RandSource + ?Sized> RandSource for Arc<R> {
    fn below(&self, upper: i64) -> i64 {
        (**self).below(upper)
    }
}

impl<R: RandSource + ?Sized> RandSource for &R {
    fn below(&self, upper: i64) -> i64 {
        (**self).below(upper)
    }
}
