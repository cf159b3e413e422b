use crate::RandSource;
use rand::{Rng, rng};

/// A `RandSource` that uses the thread-local RNG (`rand::rng()`).
///
/// Each OS thread has its own RNG instance, so concurrent builders running on
/// different worker threads never contend on shared state. This type does
/// **not** store the RNG itself; it accesses the thread-local generator on
/// each call, which keeps it `Send + Sync`.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource for ThreadRandom {
    fn below(&self, upper: i64) -> i64 {
        if upper <= 0 {
            return 0;
        }
        rng().random_range(0..upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_range() {
        let source = ThreadRandom;
        for _ in 0..1000 {
            let value = source.below(20);
            assert!((0..20).contains(&value), "{value} out of range");
        }
    }

    #[test]
    fn degenerate_upper_bound_yields_zero() {
        assert_eq!(ThreadRandom.below(0), 0);
        assert_eq!(ThreadRandom.below(-5), 0);
    }
}
