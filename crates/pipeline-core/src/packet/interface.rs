use crate::{Error, Result};
use core::fmt;

/// The capability set every packet representation exposes to the pipeline
/// stages.
///
/// A packet is an ordered sequence of integers whose length is fixed at
/// construction. The two constructors are the only way stages create packets,
/// so any type implementing this trait can be swapped in for
/// [`BasicPacket`](crate::BasicPacket).
///
/// Packets are handed between stages by value. Once a stage sends a packet it
/// no longer owns it, so a packet always has a single writer.
pub trait Packet: fmt::Display + fmt::Debug + Send + Sized + 'static {
    /// Creates a zero-filled packet of `len` elements.
    fn zeroed(len: usize) -> Self;

    /// Creates a packet that takes ownership of `values`.
    fn from_values(values: Vec<i64>) -> Self;

    /// Consumes the packet and returns its backing values.
    fn into_values(self) -> Vec<i64>;

    /// Read-only view of the whole packet.
    fn values(&self) -> &[i64];

    /// Mutable view of the whole packet. The length cannot change.
    fn values_mut(&mut self) -> &mut [i64];

    fn len(&self) -> usize {
        self.values().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index`, or `None` past the end.
    fn get(&self, index: usize) -> Option<i64> {
        self.values().get(index).copied()
    }

    /// Overwrites the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= len`.
    fn set(&mut self, index: usize, value: i64) -> Result<()> {
        let len = self.len();
        let slot = self
            .values_mut()
            .get_mut(index)
            .ok_or(Error::IndexOutOfBounds { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Slices the packet from a single boundary.
    ///
    /// A non-negative `boundary` drops the first `boundary` elements. A
    /// negative `boundary` keeps the last `-boundary` elements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SliceOutOfBounds`] if the boundary falls outside the
    /// packet.
    fn slice_from(&self, boundary: isize) -> Result<&[i64]> {
        let len = self.len();
        let start = resolve_boundary(boundary, len).ok_or(Error::SliceOutOfBounds {
            start: boundary,
            end: len as isize,
            len,
        })?;
        Ok(&self.values()[start..])
    }

    /// Slices the half-open range `[start, end)`. Negative boundaries count
    /// from the end of the packet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SliceOutOfBounds`] if either boundary falls outside
    /// the packet or `start` resolves past `end`.
    fn slice_range(&self, start: isize, end: isize) -> Result<&[i64]> {
        let len = self.len();
        let err = Error::SliceOutOfBounds { start, end, len };
        let lo = resolve_boundary(start, len).ok_or_else(|| err.clone())?;
        let hi = resolve_boundary(end, len).ok_or_else(|| err.clone())?;
        if lo > hi {
            return Err(err);
        }
        Ok(&self.values()[lo..hi])
    }
}

/// Maps a possibly negative boundary onto `[0, len]`.
fn resolve_boundary(boundary: isize, len: usize) -> Option<usize> {
    if boundary < 0 {
        len.checked_sub(boundary.unsigned_abs())
    } else {
        let boundary = boundary.unsigned_abs();
        (boundary <= len).then_some(boundary)
    }
}

/// Writes `values` in the canonical `[v0,v1,...]` form.
pub(crate) fn write_values(f: &mut fmt::Formatter<'_>, values: &[i64]) -> fmt::Result {
    f.write_str("[")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{value}")?;
    }
    f.write_str("]")
}
