//! Cancellable many-sender / many-receiver pipes between pipeline stages.
//!
//! [`channel`] with capacity `0` returns a rendezvous pipe: a send completes
//! only once a receiver has taken the value. Any other capacity returns a
//! bounded queue. Both flavors share the same contract:
//!
//! - Every blocking call races the caller's [`CancellationToken`], and
//!   cancellation wins when both are ready at once.
//! - A send that does not complete hands the value back in its
//!   [`SendError`], so dropping it is the caller's decision.
//! - [`PipeReceiver::close`] ends the pipe for every holder. Later sends fail
//!   with [`SendError::Closed`] and later receives with
//!   [`RecvError::Closed`].
//!
//! The futures returned by `send` and `recv` are not cancel-safe when dropped
//! mid-flight: stop them through the token instead.

mod buffered;
mod error;
mod rendezvous;

pub use error::{RecvError, SendError};

use tokio_util::sync::CancellationToken;

/// Creates a pipe. A `capacity` of `0` makes it a rendezvous point.
pub fn channel<T: Send>(capacity: usize) -> (PipeSender<T>, PipeReceiver<T>) {
    let closed = CancellationToken::new();
    if capacity == 0 {
        let (tx, rx) = rendezvous::channel(closed);
        (
            PipeSender {
                inner: SenderFlavor::Rendezvous(tx),
            },
            PipeReceiver {
                inner: ReceiverFlavor::Rendezvous(rx),
                capacity,
            },
        )
    } else {
        let (tx, rx) = buffered::channel(capacity, closed);
        (
            PipeSender {
                inner: SenderFlavor::Buffered(tx),
            },
            PipeReceiver {
                inner: ReceiverFlavor::Buffered(rx),
                capacity,
            },
        )
    }
}

enum SenderFlavor<T> {
    Rendezvous(rendezvous::Sender<T>),
    Buffered(buffered::Sender<T>),
}

enum ReceiverFlavor<T> {
    Rendezvous(rendezvous::Receiver<T>),
    Buffered(buffered::Receiver<T>),
}

/// Sending half of a pipe. Clone it to add producers.
pub struct PipeSender<T> {
    inner: SenderFlavor<T>,
}

/// Receiving half of a pipe. Clone it to add competing consumers; each value
/// is delivered to exactly one of them.
pub struct PipeReceiver<T> {
    inner: ReceiverFlavor<T>,
    capacity: usize,
}

impl<T: Send> PipeSender<T> {
    /// Attempts a single delivery of `value`.
    ///
    /// # Errors
    ///
    /// - [`SendError::Cancelled`] if `token` fired before a receiver (or a
    ///   free slot) took the value.
    /// - [`SendError::Closed`] if the pipe was closed.
    pub async fn send(&self, value: T, token: &CancellationToken) -> Result<(), SendError<T>> {
        match &self.inner {
            SenderFlavor::Rendezvous(tx) => tx.send(value, token).await,
            SenderFlavor::Buffered(tx) => tx.send(value, token).await,
        }
    }
}

impl<T: Send> PipeReceiver<T> {
    /// Waits for the next value.
    ///
    /// A value that was already handed over when `token` fires is still
    /// returned, so a successful send is never lost on the receiving side.
    ///
    /// # Errors
    ///
    /// - [`RecvError::Cancelled`] if `token` fired first.
    /// - [`RecvError::Closed`] if the pipe was closed.
    pub async fn recv(&self, token: &CancellationToken) -> Result<T, RecvError> {
        match &self.inner {
            ReceiverFlavor::Rendezvous(rx) => rx.recv(token).await,
            ReceiverFlavor::Buffered(rx) => rx.recv(token).await,
        }
    }

    /// Takes a value that is already buffered, without waiting.
    ///
    /// Returns `None` when the buffer is empty or another receiver is
    /// draining it at the same moment. A rendezvous pipe never buffers, so
    /// it always returns `None`.
    pub fn try_recv(&self) -> Option<T> {
        match &self.inner {
            ReceiverFlavor::Rendezvous(_) => None,
            ReceiverFlavor::Buffered(rx) => rx.try_recv(),
        }
    }

    /// Closes the pipe for every sender and receiver.
    ///
    /// Only call this once every task that may still send has stopped; any
    /// later send is refused with [`SendError::Closed`].
    pub async fn close(&self) {
        match &self.inner {
            ReceiverFlavor::Rendezvous(rx) => rx.close().await,
            ReceiverFlavor::Buffered(rx) => rx.close().await,
        }
    }

    pub fn is_closed(&self) -> bool {
        match &self.inner {
            ReceiverFlavor::Rendezvous(rx) => rx.is_closed(),
            ReceiverFlavor::Buffered(rx) => rx.is_closed(),
        }
    }

    /// Buffer capacity; `0` for a rendezvous pipe.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Clone for PipeSender<T> {
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            SenderFlavor::Rendezvous(tx) => SenderFlavor::Rendezvous(tx.clone()),
            SenderFlavor::Buffered(tx) => SenderFlavor::Buffered(tx.clone()),
        };
        Self { inner }
    }
}

impl<T> Clone for PipeReceiver<T> {
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            ReceiverFlavor::Rendezvous(rx) => ReceiverFlavor::Rendezvous(rx.clone()),
            ReceiverFlavor::Buffered(rx) => ReceiverFlavor::Buffered(rx.clone()),
        };
        Self {
            inner,
            capacity: self.capacity,
        }
    }
}
