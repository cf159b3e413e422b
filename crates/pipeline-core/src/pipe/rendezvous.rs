use super::{RecvError, SendError};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// A receiver parked on the pipe, waiting for a sender to fill it.
type Slot<T> = oneshot::Sender<T>;

type SlotQueue<T> = Arc<Mutex<mpsc::UnboundedReceiver<Slot<T>>>>;

/// Receivers announce themselves by queueing a [`Slot`]; a sender completes
/// by filling the oldest slot whose receiver is still waiting. A value
/// therefore only leaves the sender once a receiver is ready for it.
pub(super) fn channel<T>(closed: CancellationToken) -> (Sender<T>, Receiver<T>) {
    let (slots_tx, slots_rx) = mpsc::unbounded_channel();
    let slots = Arc::new(Mutex::new(slots_rx));
    (
        Sender {
            slots: Arc::clone(&slots),
            closed: closed.clone(),
        },
        Receiver {
            slots_tx,
            slots,
            closed,
        },
    )
}

pub(super) struct Sender<T> {
    slots: SlotQueue<T>,
    closed: CancellationToken,
}

pub(super) struct Receiver<T> {
    slots_tx: mpsc::UnboundedSender<Slot<T>>,
    slots: SlotQueue<T>,
    closed: CancellationToken,
}

impl<T: Send> Sender<T> {
    pub(super) async fn send(
        &self,
        mut value: T,
        token: &CancellationToken,
    ) -> Result<(), SendError<T>> {
        // Senders take turns; the holder of the lock owns the next free slot.
        let mut slots = tokio::select! {
            biased;
            () = token.cancelled() => return Err(SendError::Cancelled(value)),
            () = self.closed.cancelled() => return Err(SendError::Closed(value)),
            slots = self.slots.lock() => slots,
        };

        loop {
            let slot = tokio::select! {
                biased;
                () = token.cancelled() => return Err(SendError::Cancelled(value)),
                () = self.closed.cancelled() => return Err(SendError::Closed(value)),
                slot = slots.recv() => slot,
            };
            let Some(slot) = slot else {
                return Err(SendError::Closed(value));
            };
            match slot.send(value) {
                Ok(()) => return Ok(()),
                // That receiver stopped waiting; offer the value to the next.
                Err(returned) => value = returned,
            }
        }
    }
}

impl<T: Send> Receiver<T> {
    pub(super) async fn recv(&self, token: &CancellationToken) -> Result<T, RecvError> {
        if token.is_cancelled() {
            return Err(RecvError::Cancelled);
        }
        if self.closed.is_cancelled() {
            return Err(RecvError::Closed);
        }

        let (slot, mut handoff) = oneshot::channel();
        if self.slots_tx.send(slot).is_err() {
            return Err(RecvError::Closed);
        }

        tokio::select! {
            biased;
            () = token.cancelled() => {
                // A sender may have filled the slot at the same moment. Its
                // send already reported success, so keep the value.
                handoff.close();
                handoff.try_recv().map_err(|_| RecvError::Cancelled)
            }
            () = self.closed.cancelled() => {
                handoff.close();
                handoff.try_recv().map_err(|_| RecvError::Closed)
            }
            value = &mut handoff => value.map_err(|_| RecvError::Closed),
        }
    }

    pub(super) async fn close(&self) {
        self.closed.cancel();
        let mut slots = self.slots.lock().await;
        slots.close();
        // Dropping the parked slots wakes any receiver still waiting on them.
        while slots.try_recv().is_ok() {}
    }

    pub(super) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            closed: self.closed.clone(),
        }
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            slots_tx: self.slots_tx.clone(),
            slots: Arc::clone(&self.slots),
            closed: self.closed.clone(),
        }
    }
}
