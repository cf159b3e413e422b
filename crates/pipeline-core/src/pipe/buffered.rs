use super::{RecvError, SendError};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// A bounded queue shared by competing receivers.
pub(super) fn channel<T>(capacity: usize, closed: CancellationToken) -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        Sender {
            tx,
            closed: closed.clone(),
        },
        Receiver {
            rx: Arc::new(Mutex::new(rx)),
            closed,
        },
    )
}

pub(super) struct Sender<T> {
    tx: mpsc::Sender<T>,
    closed: CancellationToken,
}

pub(super) struct Receiver<T> {
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
    closed: CancellationToken,
}

impl<T: Send> Sender<T> {
    pub(super) async fn send(&self, value: T, token: &CancellationToken) -> Result<(), SendError<T>> {
        // Reserve first so a cancelled send still owns its value.
        tokio::select! {
            biased;
            () = token.cancelled() => Err(SendError::Cancelled(value)),
            () = self.closed.cancelled() => Err(SendError::Closed(value)),
            permit = self.tx.reserve() => match permit {
                Ok(permit) => {
                    permit.send(value);
                    Ok(())
                }
                Err(_) => Err(SendError::Closed(value)),
            },
        }
    }
}

impl<T: Send> Receiver<T> {
    pub(super) async fn recv(&self, token: &CancellationToken) -> Result<T, RecvError> {
        let mut rx = tokio::select! {
            biased;
            () = token.cancelled() => return Err(RecvError::Cancelled),
            () = self.closed.cancelled() => return Err(RecvError::Closed),
            rx = self.rx.lock() => rx,
        };

        tokio::select! {
            biased;
            () = token.cancelled() => Err(RecvError::Cancelled),
            () = self.closed.cancelled() => Err(RecvError::Closed),
            value = rx.recv() => value.ok_or(RecvError::Closed),
        }
    }

    pub(super) fn try_recv(&self) -> Option<T> {
        let mut rx = self.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    pub(super) async fn close(&self) {
        self.closed.cancel();
        self.rx.lock().await.close();
    }

    pub(super) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
            closed: self.closed.clone(),
        }
    }
}
