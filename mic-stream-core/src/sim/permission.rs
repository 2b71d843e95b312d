use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::traits::permission::{PermissionCallback, PermissionProvider};

struct ScriptInner {
    granted: AtomicBool,
    auto_answer: Option<bool>,
    waiting: Mutex<Vec<PermissionCallback>>,
    checks: AtomicUsize,
    requests: AtomicUsize,
}

/// Permission provider with a scripted user.
///
/// Requests are either answered on the spot or queued until [`answer`] is
/// called.
///
/// [`answer`]: ScriptedPermission::answer
#[derive(Clone)]
pub struct ScriptedPermission {
    inner: Arc<ScriptInner>,
}

impl ScriptedPermission {
    fn build(granted: bool, auto_answer: Option<bool>) -> Self {
        Self {
            inner: Arc::new(ScriptInner {
                granted: AtomicBool::new(granted),
                auto_answer,
                waiting: Mutex::new(Vec::new()),
                checks: AtomicUsize::new(0),
                requests: AtomicUsize::new(0),
            }),
        }
    }

    /// Permission already granted.
    pub fn granted() -> Self {
        Self::build(true, None)
    }

    /// Not granted; any request is answered immediately with `answer`.
    pub fn answering(answer: bool) -> Self {
        Self::build(false, Some(answer))
    }

    /// Not granted; requests wait for [`ScriptedPermission::answer`].
    pub fn prompting() -> Self {
        Self::build(false, None)
    }

    /// Answer every outstanding request. Returns how many were answered.
    pub fn answer(&self, granted: bool) -> usize {
        if granted {
            self.inner.granted.store(true, Ordering::SeqCst);
        }
        let waiting: Vec<_> = self.inner.waiting.lock().drain(..).collect();
        let answered = waiting.len();
        for on_result in waiting {
            on_result(granted);
        }
        answered
    }

    /// Flip the OS setting without a prompt.
    pub fn set_granted(&self, granted: bool) {
        self.inner.granted.store(granted, Ordering::SeqCst);
    }

    pub fn check_count(&self) -> usize {
        self.inner.checks.load(Ordering::SeqCst)
    }

    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.inner.waiting.lock().len()
    }
}

impl PermissionProvider for ScriptedPermission {
    fn check(&self) -> bool {
        self.inner.checks.fetch_add(1, Ordering::SeqCst);
        self.inner.granted.load(Ordering::SeqCst)
    }

    fn request(&self, on_result: PermissionCallback) {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);
        match self.inner.auto_answer {
            Some(answer) => {
                if answer {
                    self.inner.granted.store(true, Ordering::SeqCst);
                }
                on_result(answer);
            }
            None => self.inner.waiting.lock().push(on_result),
        }
    }
}
