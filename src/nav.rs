use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::ports::nav::Navigator;
use crate::ports::time::TimeProvider;
use crate::routing::Destination;

struct PendingAction {
    destination: Destination,
    retry_count: u32,
}

struct Inner<N> {
    navigator: Option<N>,
    pending: VecDeque<PendingAction>,
    timer: Option<JoinHandle<()>>,
}

/// Holds navigation attempts made before the UI navigator is mounted and
/// retries them on a timer. Navigation is best-effort: an action that
/// keeps failing past the retry budget is dropped with a warning, never
/// surfaced to the user.
#[derive(Clone)]
pub struct NavigationQueue<N, T> {
    inner: Arc<Mutex<Inner<N>>>,
    time: T,
    retry_interval: Duration,
    retry_budget: u32,
}

impl<N, T> NavigationQueue<N, T>
where
    N: Navigator,
    T: TimeProvider,
{
    pub fn new(time: T, retry_interval: Duration, retry_budget: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                navigator: None,
                pending: VecDeque::new(),
                timer: None,
            })),
            time,
            retry_interval,
            retry_budget,
        }
    }

    /// Registers the mounted navigator and immediately flushes whatever
    /// queued up before the UI was ready.
    pub fn set_navigator_ready(&self, navigator: N) {
        {
            let mut inner = self.inner.lock().expect("navigation queue lock");
            inner.navigator = Some(navigator);
        }
        self.flush();
    }

    pub fn execute(&self, destination: Destination) {
        self.attempt(PendingAction {
            destination,
            retry_count: 0,
        });
    }

    /// Drains the queue in FIFO order, re-queueing whatever still cannot
    /// run. Called on navigator registration and from the retry timer.
    pub fn flush(&self) {
        let drained: Vec<PendingAction> = {
            let mut inner = self.inner.lock().expect("navigation queue lock");
            inner.pending.drain(..).collect()
        };
        for action in drained {
            self.attempt(action);
        }
    }

    /// Empties the queue and stops the retry timer. Used on logout, when
    /// any still-pending destination belongs to the old session.
    pub fn clear_pending(&self) {
        let mut inner = self.inner.lock().expect("navigation queue lock");
        inner.pending.clear();
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
    }

    fn attempt(&self, action: PendingAction) {
        let navigator = {
            let inner = self.inner.lock().expect("navigation queue lock");
            inner.navigator.clone()
        };

        if let Some(navigator) = navigator
            && navigator.is_ready()
        {
            match navigator.navigate(&action.destination) {
                Ok(()) => return,
                Err(err) => {
                    tracing::warn!("navigation to {} failed: {err}", action.destination.screen);
                }
            }
        }
        self.enqueue(action);
    }

    fn enqueue(&self, action: PendingAction) {
        if action.retry_count >= self.retry_budget {
            tracing::warn!(
                "dropping navigation to {} after {} retries",
                action.destination.screen,
                self.retry_budget
            );
            return;
        }

        let mut inner = self.inner.lock().expect("navigation queue lock");
        inner.pending.push_back(PendingAction {
            destination: action.destination,
            retry_count: action.retry_count + 1,
        });
        self.ensure_timer(&mut inner);
    }

    /// Starts the retry timer lazily. The task keeps ticking while the
    /// queue is non-empty and exits on its own once drained; the drained
    /// check and any enqueue share the queue lock, so an exit cannot race
    /// a new action.
    fn ensure_timer(&self, inner: &mut Inner<N>) {
        if inner.timer.as_ref().is_some_and(|timer| !timer.is_finished()) {
            return;
        }

        let queue = self.clone();
        inner.timer = Some(tokio::spawn(async move {
            loop {
                queue.time.sleep(queue.retry_interval).await;

                let (has_pending, has_navigator) = {
                    let inner = queue.inner.lock().expect("navigation queue lock");
                    (!inner.pending.is_empty(), inner.navigator.is_some())
                };
                if has_pending {
                    if has_navigator {
                        queue.flush();
                    }
                    continue;
                }

                let mut inner = queue.inner.lock().expect("navigation queue lock");
                if inner.pending.is_empty() {
                    inner.timer = None;
                    return;
                }
            }
        }));
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.inner.lock().expect("navigation queue lock").pending.len()
    }

    #[cfg(test)]
    pub(crate) fn timer_active(&self) -> bool {
        self.inner
            .lock()
            .expect("navigation queue lock")
            .timer
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}
