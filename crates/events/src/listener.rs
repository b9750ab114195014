//! Synchronous listener registry.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{PoisonError, RwLock};

use tracing::warn;

use crate::event::{JobEvent, JobEventKind};

/// Callback invoked for every event of the kind it was registered for.
pub type Listener = Box<dyn Fn(&JobEvent) -> anyhow::Result<()> + Send + Sync>;

/// Ordered set of listeners keyed by event kind.
///
/// Listeners run synchronously on the emitting thread, in registration order.
/// A listener that returns an error or panics is logged and skipped; it never
/// affects the emitter or the remaining listeners.
///
/// Listeners must not register further listeners from inside a callback.
#[derive(Default)]
pub struct Listeners {
    entries: RwLock<Vec<(JobEventKind, Listener)>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for events of `kind`.
    pub fn on<F>(&self, kind: JobEventKind, listener: F)
    where
        F: Fn(&JobEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, Box::new(listener)));
    }

    /// Deliver `event` to every listener registered for its kind.
    ///
    /// Returns how many listeners completed successfully.
    pub fn emit(&self, event: &JobEvent) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;

        for (kind, listener) in entries.iter() {
            if *kind != event.kind {
                continue;
            }

            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    warn!(event = %event.kind, job_id = %event.job.id, error = %e, "listener failed");
                }
                Err(_) => {
                    warn!(event = %event.kind, job_id = %event.job.id, "listener panicked");
                }
            }
        }

        delivered
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl core::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}
