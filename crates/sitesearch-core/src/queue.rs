//! FIFO job queue with a concurrency cap.
//!
//! [`TaskQueue::add`] never rejects work: once `concurrency` jobs are running,
//! new jobs wait in submission order and the next one starts as soon as a
//! running job finishes. Each job reports through its own [`JobHandle`]; a job
//! that panics fails only its handle and frees its slot like any other job.
//!
//! The queue spawns onto the ambient Tokio runtime, so `add` must be called
//! from within one.

use crate::{Error, Result};
use futures::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::debug;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Bounded-concurrency FIFO scheduler. Cloning shares the same queue.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

struct Inner {
    concurrency: usize,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    running: usize,
    pending: VecDeque<Job>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskQueue {
    /// Create a queue running at most `concurrency` jobs at once.
    pub fn new(concurrency: NonZeroUsize) -> Self {
        Self {
            inner: Arc::new(Inner {
                concurrency: concurrency.get(),
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Maximum number of concurrently running jobs.
    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }

    /// Jobs currently executing.
    pub fn running(&self) -> usize {
        self.inner.state().running
    }

    /// Jobs waiting for a free slot.
    pub fn queued(&self) -> usize {
        self.inner.state().pending.len()
    }

    /// Submit a job. It starts immediately if a slot is free, otherwise after
    /// every job submitted before it has started.
    pub fn add<F, Fut, T>(&self, job: F) -> JobHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(async move { job().await })
                .catch_unwind()
                .await
                .map_err(|_| "job panicked".to_string());
            // The caller may have dropped its handle; the job still ran.
            let _ = tx.send(outcome);
        });

        let start_now = {
            let mut state = self.inner.state();
            if state.running < self.inner.concurrency {
                state.running += 1;
                Some(job)
            } else {
                state.pending.push_back(job);
                debug!(queued = state.pending.len(), "job deferred");
                None
            }
        };

        if let Some(job) = start_now {
            Self::spawn(Arc::clone(&self.inner), job);
        }

        JobHandle { rx }
    }

    fn spawn(inner: Arc<Inner>, job: Job) {
        tokio::spawn(async move {
            job.await;
            Self::complete(inner);
        });
    }

    fn complete(inner: Arc<Inner>) {
        let next = {
            let mut state = inner.state();
            let next = state.pending.pop_front();
            if next.is_none() {
                state.running -= 1;
            }
            next
        };

        if let Some(job) = next {
            Self::spawn(inner, job);
        }
    }
}

/// Completion of a job submitted to a [`TaskQueue`].
///
/// Resolves to the job's output, or [`Error::Queue`] when the job panicked.
#[must_use = "a job handle does nothing unless awaited"]
pub struct JobHandle<T> {
    rx: oneshot::Receiver<std::result::Result<T, String>>,
}

impl<T> Future for JobHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(reason)) => Err(Error::Queue(reason)),
            Err(_) => Err(Error::Queue("job dropped before completion".to_string())),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn queue(n: usize) -> TaskQueue {
        TaskQueue::new(NonZeroUsize::new(n).unwrap())
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let queue = queue(3);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                queue.add(move || async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    i
                })
            })
            .collect();

        assert!(queue.running() <= 3);
        assert!(queue.queued() >= 9);

        let results = futures::future::join_all(handles).await;
        let values: Vec<usize> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, (0..12).collect::<Vec<_>>());
        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(queue.running(), 0);
        assert_eq!(queue.queued(), 0);
    }

    #[tokio::test]
    async fn test_jobs_start_in_submission_order() {
        let queue = queue(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let order = Arc::clone(&order);
                queue.add(move || async move {
                    order.lock().unwrap().push(i);
                    tokio::task::yield_now().await;
                })
            })
            .collect();

        futures::future::join_all(handles).await;
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_panicking_job_is_isolated() {
        let queue = queue(1);

        let failing = queue.add(|| async {
            panic!("boom");
        });
        let ok = queue.add(|| async { 42 });

        let err = failing.await.unwrap_err();
        assert!(matches!(err, Error::Queue(_)));
        assert_eq!(ok.await.unwrap(), 42);
        assert_eq!(queue.running(), 0);
    }

    #[tokio::test]
    async fn test_errors_surface_only_through_own_handle() {
        let queue = queue(2);

        let bad = queue.add(|| async { Err::<u32, _>(Error::HttpStatus { url: "/bad".into(), status: 500 }) });
        let good = queue.add(|| async { Ok::<u32, Error>(7) });

        assert!(matches!(bad.await.unwrap(), Err(Error::HttpStatus { status: 500, .. })));
        assert_eq!(good.await.unwrap().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_dropped_handle_still_runs_job() {
        let queue = queue(1);
        let ran = Arc::new(AtomicUsize::new(0));

        {
            let ran = Arc::clone(&ran);
            drop(queue.add(move || async move {
                ran.fetch_add(1, Ordering::SeqCst);
            }));
        }

        queue.add(|| async {}).await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
