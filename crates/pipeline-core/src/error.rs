/// A result type defaulting to the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `pipeline-core` can emit.
///
/// Pipe operations report their own [`SendError`](crate::pipe::SendError) and
/// [`RecvError`](crate::pipe::RecvError) so a failed send can hand the value
/// back to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An indexed access fell outside `[0, len)`.
    #[error("index {index} out of bounds for packet of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A slice boundary resolved outside the packet, or `start > end`.
    #[error("slice [{start}..{end}] out of bounds for packet of length {len}")]
    SliceOutOfBounds { start: isize, end: isize, len: usize },
}
