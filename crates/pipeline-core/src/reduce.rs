use crate::Packet;

/// Reduces a packet to a (usually smaller) result packet.
pub trait Reduce<P: Packet>: Send + Sync {
    fn reduce(&self, packet: P) -> P;
}

/// Keeps the `result_size` largest values of a packet.
///
/// The packet is sorted ascending and the trailing `result_size` elements are
/// kept, so the result is itself ascending. A `result_size` at or above the
/// packet length keeps the whole sorted packet; `0` keeps nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TopN {
    result_size: usize,
}

impl TopN {
    pub const fn new(result_size: usize) -> Self {
        Self { result_size }
    }

    pub const fn result_size(&self) -> usize {
        self.result_size
    }
}

impl<P: Packet> Reduce<P> for TopN {
    fn reduce(&self, packet: P) -> P {
        let mut values = packet.into_values();
        values.sort_unstable();
        let cut = values.len() - self.result_size.min(values.len());
        values.drain(..cut);
        P::from_values(values)
    }
}
