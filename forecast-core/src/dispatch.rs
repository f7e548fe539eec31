//! Deliver completions on one designated context.
//!
//! Network work runs on the tokio runtime the queue was created with; finished
//! results are posted to a [`CompletionQueue`] and run one at a time, in
//! arrival order, by whichever thread or task drives the matching
//! [`CompletionPump`]. A UI loop with no runtime of its own can own the pump
//! and update its state directly from completions.
//!
//! Every completion runs exactly once, with one exception: if the pump has
//! been dropped by the time a result is ready, the completion is dropped
//! unrun and a warning is logged.

use std::sync::Arc;

use tokio::{runtime::Handle, sync::mpsc};
use tracing::warn;

use crate::{
    client::{Coordinate, ForecastError},
    model::Forecast,
    provider::ForecastProvider,
};

type Job = Box<dyn FnOnce() + Send>;

/// Sending half: cheap to clone, handed to every request.
#[derive(Debug, Clone)]
pub struct CompletionQueue {
    tx: mpsc::UnboundedSender<Job>,
    runtime: Handle,
}

/// Receiving half: runs posted completions serially.
#[derive(Debug)]
pub struct CompletionPump {
    rx: mpsc::UnboundedReceiver<Job>,
}

/// Create a queue whose requests run on `runtime`. The queue may be used from
/// any thread, including ones outside the runtime.
pub fn completion_queue(runtime: Handle) -> (CompletionQueue, CompletionPump) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionQueue { tx, runtime }, CompletionPump { rx })
}

impl CompletionQueue {
    pub(crate) fn spawn<Fut>(&self, work: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(work);
    }

    pub(crate) fn post<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(job)).is_err() {
            warn!("Completion pump is gone; dropping completion");
        }
    }
}

impl CompletionPump {
    /// Run completions until every [`CompletionQueue`] has been dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            job();
        }
    }

    /// Wait for the next completion and run it. Returns `false` once every
    /// queue has been dropped and nothing is pending.
    pub async fn run_one(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Blocking form of [`CompletionPump::run_one`] for threads outside the
    /// runtime, such as a UI loop. Must not be called from async code.
    pub fn blocking_run_one(&mut self) -> bool {
        match self.rx.blocking_recv() {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run whatever completions are already waiting, without blocking.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }
}

/// Request a forecast on the queue's runtime and deliver the outcome to
/// `completion` through `queue`. Callable from any thread. `completion` runs
/// exactly once unless the pump is dropped before the result arrives.
pub fn request_forecast_with<F>(
    provider: Arc<dyn ForecastProvider>,
    coordinate: Coordinate,
    queue: &CompletionQueue,
    completion: F,
) where
    F: FnOnce(Result<Forecast, ForecastError>) + Send + 'static,
{
    let posted = queue.clone();
    queue.spawn(async move {
        let result = provider.request_forecast(&coordinate).await;
        posted.post(move || completion(result));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn completions_run_in_post_order() {
        let (queue, mut pump) = completion_queue(Handle::current());
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let seen = seen.clone();
            queue.post(move || seen.lock().unwrap().push(i));
        }

        assert_eq!(pump.run_pending(), 5);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn run_stops_when_all_queues_are_dropped() {
        let (queue, pump) = completion_queue(Handle::current());
        let seen = Arc::new(Mutex::new(0));

        let counter = seen.clone();
        queue.post(move || *counter.lock().unwrap() += 1);
        drop(queue);

        pump.run().await;
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn run_one_reports_closed_queue() {
        let (queue, mut pump) = completion_queue(Handle::current());
        drop(queue);

        assert!(!pump.run_one().await);
    }

    #[tokio::test]
    async fn posting_without_pump_drops_the_completion() {
        let (queue, pump) = completion_queue(Handle::current());
        drop(pump);

        queue.post(|| unreachable!("pump was dropped"));
    }

    #[test]
    fn pump_can_be_driven_from_a_thread_outside_the_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (queue, mut pump) = completion_queue(runtime.handle().clone());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let posted = queue.clone();
        let counter = seen.clone();
        queue.spawn(async move {
            posted.post(move || counter.lock().unwrap().push("done"));
        });

        assert!(pump.blocking_run_one());
        assert_eq!(*seen.lock().unwrap(), vec!["done"]);
    }
}
