//! The unit every pipeline task is built from.

use core::future::Future;
use tokio_util::sync::CancellationToken;

/// A long-running pipeline task.
///
/// `run` consumes the stage and resolves once `token` is cancelled (or the
/// stage can no longer make progress). Stages are spawned on the controller's
/// tracker, so the returned future must be `Send`.
pub trait Stage: Send + 'static {
    fn run(self, token: CancellationToken) -> impl Future<Output = ()> + Send;
}

/// An absent stage returns immediately.
impl<S: Stage> Stage for Option<S> {
    async fn run(self, token: CancellationToken) {
        if let Some(stage) = self {
            stage.run(token).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    struct Flag(Arc<AtomicBool>);

    impl Stage for Flag {
        async fn run(self, _token: CancellationToken) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn absent_stage_is_a_no_op() {
        let token = CancellationToken::new();
        None::<Flag>.run(token).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn present_stage_runs() {
        let ran = Arc::new(AtomicBool::new(false));
        Some(Flag(ran.clone())).run(CancellationToken::new()).await;
        assert!(ran.load(Ordering::SeqCst));
    }
}
