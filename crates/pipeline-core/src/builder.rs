use crate::{Packet, RandSource, ThreadRandom};
use core::marker::PhantomData;

/// Exclusive upper bound of generated packet values.
pub const VALUE_UPPER_BOUND: i64 = 20;

/// Builds one packet per call.
///
/// The generator stage only depends on this trait, so the way packets are
/// filled is a pluggable strategy.
pub trait PacketBuilder<P: Packet>: Send + Sync {
    fn build(&self) -> P;
}

/// Options for [`RandomPacketBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuilderOptions {
    /// Number of elements in every built packet.
    pub size: usize,
}

/// Builds packets of a fixed size with every slot drawn uniformly from
/// `[0, VALUE_UPPER_BOUND)`.
///
/// The random source is shared by every call. It must be safe to use from
/// several tasks at once, which both [`ThreadRandom`] and
/// [`SeededRandom`](crate::SeededRandom) are.
#[derive(Debug)]
pub struct RandomPacketBuilder<P, R = ThreadRandom> {
    rand: R,
    options: BuilderOptions,
    _packet: PhantomData<fn() -> P>,
}

impl<P: Packet> RandomPacketBuilder<P, ThreadRandom> {
    pub fn new(options: BuilderOptions) -> Self {
        Self::with_rand(ThreadRandom, options)
    }
}

impl<P: Packet, R: RandSource> RandomPacketBuilder<P, R> {
    pub const fn with_rand(rand: R, options: BuilderOptions) -> Self {
        Self {
            rand,
            options,
            _packet: PhantomData,
        }
    }

    pub const fn options(&self) -> BuilderOptions {
        self.options
    }
}

impl<P, R> PacketBuilder<P> for RandomPacketBuilder<P, R>
where
    P: Packet,
    R: RandSource + Send + Sync,
{
    fn build(&self) -> P {
        let mut packet = P::zeroed(self.options.size);
        for slot in packet.values_mut() {
            *slot = self.rand.below(VALUE_UPPER_BOUND);
        }
        packet
    }
}
