use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use uuid::Uuid;

use crate::models::error::CaptureError;
use crate::models::event::InitializeOutcome;

pub type InitializeResult = Result<InitializeOutcome, CaptureError>;

type Completion = Box<dyn FnOnce(InitializeResult) + Send + 'static>;
type CancelHook = Box<dyn Fn(Uuid) + Send + Sync + 'static>;

#[derive(Default)]
struct Slot {
    result: Option<InitializeResult>,
    completions: Vec<Completion>,
}

struct Shared {
    id: Uuid,
    slot: Mutex<Slot>,
    resolved: Condvar,
    on_cancel: CancelHook,
}

/// An initialize request that may still be waiting on the user's
/// permission answer.
///
/// The first resolution wins; later ones are ignored. Clones refer to the
/// same request.
#[derive(Clone)]
pub struct PendingInitialize {
    shared: Arc<Shared>,
}

impl PendingInitialize {
    pub(crate) fn new(on_cancel: impl Fn(Uuid) + Send + Sync + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                slot: Mutex::new(Slot::default()),
                resolved: Condvar::new(),
                on_cancel: Box::new(on_cancel),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.slot.lock().result.is_some()
    }

    pub fn try_result(&self) -> Option<InitializeResult> {
        self.shared.slot.lock().result.clone()
    }

    /// Block until resolved. With a prompting permission provider this may
    /// never return; prefer [`wait_timeout`](Self::wait_timeout).
    pub fn wait(&self) -> InitializeResult {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(result) = &slot.result {
                return result.clone();
            }
            self.shared.resolved.wait(&mut slot);
        }
    }

    /// Block for at most `timeout`. On `Err(Timeout)` the request stays
    /// pending; call [`cancel`](Self::cancel) to abandon it.
    pub fn wait_timeout(&self, timeout: Duration) -> InitializeResult {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(result) = &slot.result {
                return result.clone();
            }
            if self
                .shared
                .resolved
                .wait_until(&mut slot, deadline)
                .timed_out()
            {
                return slot.result.clone().unwrap_or(Err(CaptureError::Timeout));
            }
        }
    }

    /// Register a completion. Runs immediately when already resolved,
    /// otherwise on the thread that resolves the request.
    pub fn on_resolved(&self, completion: impl FnOnce(InitializeResult) + Send + 'static) {
        let mut slot = self.shared.slot.lock();
        match slot.result.clone() {
            Some(result) => {
                drop(slot);
                completion(result);
            }
            None => slot.completions.push(Box::new(completion)),
        }
    }

    /// Abandon the request. Returns `false` if it had already resolved.
    pub fn cancel(&self) -> bool {
        if !self.resolve(Err(CaptureError::Cancelled)) {
            return false;
        }
        (self.shared.on_cancel)(self.shared.id);
        true
    }

    pub(crate) fn resolve(&self, result: InitializeResult) -> bool {
        let completions = {
            let mut slot = self.shared.slot.lock();
            if slot.result.is_some() {
                return false;
            }
            slot.result = Some(result.clone());
            std::mem::take(&mut slot.completions)
        };
        self.shared.resolved.notify_all();
        for completion in completions {
            completion(result.clone());
        }
        true
    }
}

impl std::fmt::Debug for PendingInitialize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingInitialize")
            .field("id", &self.shared.id)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
