use std::sync::Mutex;
use std::time::Duration;

use tokio::task::AbortHandle;

/// A handle to a scheduled, cancellable delay. Dropping it cancels the
/// pending fire, same as calling `cancel` explicitly.
pub trait DelayHandle: Send {
    fn cancel(&self);
}

/// A source of monotonic time and delayed execution, decoupling the
/// supervisor from any particular async runtime.
pub trait Clock: Send + Sync {
    fn schedule(&self, after: Duration, f: Box<dyn FnOnce() + Send>) -> Box<dyn DelayHandle>;
}

/// A [`Clock`] backed by the ambient tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn schedule(&self, after: Duration, f: Box<dyn FnOnce() + Send>) -> Box<dyn DelayHandle> {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            f();
        });
        Box::new(TokioDelay {
            abort: Mutex::new(Some(handle.abort_handle())),
        })
    }
}

struct TokioDelay {
    abort: Mutex<Option<AbortHandle>>,
}

impl TokioDelay {
    fn abort_once(&self) {
        if let Some(abort) = self.abort.lock().unwrap().take() {
            abort.abort();
        }
    }
}

impl DelayHandle for TokioDelay {
    fn cancel(&self) {
        self.abort_once();
    }
}

impl Drop for TokioDelay {
    fn drop(&mut self) {
        self.abort_once();
    }
}
