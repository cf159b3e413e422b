use core::fmt;

/// A send that did not complete. The undelivered value is handed back.
#[derive(Clone, PartialEq, Eq)]
pub enum SendError<T> {
    /// The caller's cancellation token fired first.
    Cancelled(T),
    /// The pipe was closed.
    Closed(T),
}

impl<T> SendError<T> {
    /// Returns the value that was not delivered.
    pub fn into_inner(self) -> T {
        match self {
            Self::Cancelled(value) | Self::Closed(value) => value,
        }
    }

    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled(_) => f.write_str("Cancelled(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled(_) => f.write_str("send cancelled before delivery"),
            Self::Closed(_) => f.write_str("send on a closed pipe"),
        }
    }
}

impl<T> core::error::Error for SendError<T> {}

/// A receive that did not yield a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecvError {
    /// The caller's cancellation token fired first.
    #[error("receive cancelled")]
    Cancelled,
    /// The pipe was closed.
    #[error("receive on a closed pipe")]
    Closed,
}
