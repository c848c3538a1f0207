use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use kvburst_model::{
    ErrorPolicy, RunReport, RunState, StopReason, TaskError, TaskIndex, TaskResult,
};

use crate::{
    error::CoreError,
    task::{TaskFuture, TaskRef},
};

/// Shape of a run: how many tasks, how many at once, what a failure does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    pub total: usize,
    pub limit: usize,
    pub policy: ErrorPolicy,
}

impl RunnerConfig {
    pub fn new(total: usize, limit: usize) -> Self {
        Self {
            total,
            limit,
            policy: ErrorPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `total > 0` and `1 <= limit <= total`.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.total == 0 {
            return Err(CoreError::InvalidConfig("total must be greater than 0".into()));
        }
        if self.limit == 0 {
            return Err(CoreError::InvalidConfig("limit must be at least 1".into()));
        }
        if self.limit > self.total {
            return Err(CoreError::InvalidConfig(format!(
                "limit {} exceeds total {}",
                self.limit, self.total
            )));
        }
        Ok(())
    }
}

/// Runs `total` tasks with at most `limit` in flight.
///
/// Dispatch is index-ascending. Each dispatched future is spawned onto the tokio
/// runtime; results come back to the `run` future, which is the only place the
/// [`RunState`] is mutated.
pub struct BoundedRunner {
    cfg: RunnerConfig,
}

enum Wake {
    Finished(Option<(TaskIndex, TaskResult)>),
    Cancelled,
}

impl BoundedRunner {
    pub fn new(cfg: RunnerConfig) -> Result<Self, CoreError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Run every task to completion (or until the error policy stops the run).
    pub async fn run(&self, task: TaskRef) -> Result<RunReport, CoreError> {
        self.run_until_cancelled(task, CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), but stops dispatching once `cancel` fires.
    ///
    /// Tasks already in flight are always awaited and tallied before returning.
    #[instrument(
        level = "info",
        skip_all,
        fields(
            run = %Uuid::new_v4(),
            task = task.name(),
            total = self.cfg.total,
            limit = self.cfg.limit,
            policy = %self.cfg.policy,
        )
    )]
    pub async fn run_until_cancelled(
        &self,
        task: TaskRef,
        cancel: CancellationToken,
    ) -> Result<RunReport, CoreError> {
        let began = Instant::now();
        let mut state = RunState::new(self.cfg.total, self.cfg.limit, self.cfg.policy);
        let mut in_flight = FuturesUnordered::new();

        state.start()?;
        info!("run started");

        loop {
            while let Some(index) = state.next_dispatch() {
                if cancel.is_cancelled() {
                    state.cancel();
                    break;
                }
                let fut = dispatch(&task, index);
                state.record_dispatch(index);

                let handle = tokio::spawn(fut);
                in_flight.push(async move {
                    let result = handle.await.unwrap_or_else(|e| Err(join_failure(e)));
                    (index, result)
                });
                trace!(index, in_flight = state.in_flight(), "task dispatched");
            }

            let wake = tokio::select! {
                done = in_flight.next() => Wake::Finished(done),
                () = cancel.cancelled(), if !state.dispatch_closed() => Wake::Cancelled,
            };

            match wake {
                Wake::Cancelled => {
                    state.cancel();
                    info!(
                        started = state.started(),
                        in_flight = state.in_flight(),
                        "cancellation requested; draining in-flight tasks"
                    );
                }
                Wake::Finished(None) => break,
                Wake::Finished(Some((index, result))) => {
                    let was_stopped = state.stopped().is_some();
                    let outcome = state.record_completion(index, &result);

                    match &result {
                        Ok(code) => debug!(index, status = code, "task completed"),
                        Err(err) => warn!(index, error = %err, "task failed"),
                    }
                    if !was_stopped
                        && let Some(StopReason::Aborted { .. }) = state.stopped()
                    {
                        warn!(
                            index,
                            in_flight = state.in_flight(),
                            "aborting run on first failure; draining in-flight tasks"
                        );
                    }
                    trace!(index, %outcome, completed = state.completed(), "outcome folded");
                }
            }
        }

        let report = state.finish(began.elapsed())?;
        info!(
            started = report.started,
            completed = report.completed,
            failed = report.failed(),
            elapsed_ms = report.elapsed_ms,
            "run completed"
        );
        Ok(report)
    }
}

/// Call `task.dispatch`, turning a panic in its synchronous part into a
/// future that fails with [`TaskError::Panicked`].
fn dispatch(task: &TaskRef, index: TaskIndex) -> TaskFuture {
    match catch_unwind(AssertUnwindSafe(|| task.dispatch(index))) {
        Ok(fut) => fut,
        Err(payload) => {
            let reason = panic_reason(payload);
            Box::pin(async move { Err(TaskError::Panicked { reason }) })
        }
    }
}

fn join_failure(err: JoinError) -> TaskError {
    if err.is_panic() {
        TaskError::Panicked {
            reason: panic_reason(err.into_panic()),
        }
    } else {
        TaskError::Canceled
    }
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::task::TaskFn;

    /// Records what the runner does to a task.
    #[derive(Default)]
    struct Tracker {
        running: AtomicUsize,
        peak: AtomicUsize,
        dispatched: Mutex<Vec<TaskIndex>>,
        finished: Mutex<Vec<TaskIndex>>,
    }

    impl Tracker {
        fn enter(&self) {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self, index: TaskIndex) {
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.finished.lock().unwrap().push(index);
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }

        fn dispatched(&self) -> Vec<TaskIndex> {
            self.dispatched.lock().unwrap().clone()
        }

        fn finished(&self) -> Vec<TaskIndex> {
            self.finished.lock().unwrap().clone()
        }
    }

    /// Task that sleeps `delay(index)` and then returns `result(index)`.
    fn tracked<D, R>(tracker: &Arc<Tracker>, delay: D, result: R) -> TaskRef
    where
        D: Fn(TaskIndex) -> Duration + Send + Sync + 'static,
        R: Fn(TaskIndex) -> TaskResult + Send + Sync + 'static,
    {
        let tracker = Arc::clone(tracker);
        let result = Arc::new(result);
        TaskFn::arc("tracked", move |index| {
            tracker.dispatched.lock().unwrap().push(index);
            let tracker = Arc::clone(&tracker);
            let result = Arc::clone(&result);
            let delay = delay(index);
            async move {
                tracker.enter();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                tracker.exit(index);
                result(index)
            }
        })
    }

    fn jitter(index: TaskIndex) -> Duration {
        Duration::from_millis(((index * 7) % 5) as u64 + 1)
    }

    fn runner(total: usize, limit: usize, policy: ErrorPolicy) -> BoundedRunner {
        BoundedRunner::new(RunnerConfig::new(total, limit).with_policy(policy)).unwrap()
    }

    #[test]
    fn rejects_invalid_configs() {
        assert!(matches!(
            BoundedRunner::new(RunnerConfig::new(0, 1)),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(matches!(
            BoundedRunner::new(RunnerConfig::new(5, 0)),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(matches!(
            BoundedRunner::new(RunnerConfig::new(3, 4)),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(BoundedRunner::new(RunnerConfig::new(3, 3)).is_ok());
    }

    #[tokio::test]
    async fn all_succeed() {
        let tracker = Arc::new(Tracker::default());
        let task = tracked(&tracker, jitter, |_| Ok(200));

        let report = runner(10, 3, ErrorPolicy::TolerateAndTally)
            .run(task)
            .await
            .unwrap();

        assert_eq!(report.statuses.len(), 1);
        assert_eq!(report.count_of(200), 10);
        assert_eq!(report.started, 10);
        assert_eq!(report.completed, 10);
        assert!(report.is_complete());
        assert!(report.stopped.is_none());
        assert!(tracker.peak() <= 3);
        assert!(report.peak_in_flight <= 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn window_never_exceeds_limit() {
        for (total, limit) in [(1, 1), (7, 2), (20, 5), (16, 16), (30, 4), (12, 11)] {
            let tracker = Arc::new(Tracker::default());
            let task = tracked(&tracker, jitter, |i| {
                if i % 4 == 0 {
                    Err(TaskError::fail("flaky"))
                } else {
                    Ok(200)
                }
            });

            let report = runner(total, limit, ErrorPolicy::TolerateAndTally)
                .run(task)
                .await
                .unwrap();

            assert!(tracker.peak() <= limit, "peak {} > limit {limit}", tracker.peak());
            assert!(report.peak_in_flight <= limit);
            assert_eq!(report.tallied(), total);
            assert_eq!(report.completed, total);
        }
    }

    #[tokio::test]
    async fn failures_are_tallied() {
        let tracker = Arc::new(Tracker::default());
        let task = tracked(&tracker, jitter, |i| {
            if i == 2 || i == 5 {
                Err(TaskError::fail("network unreachable"))
            } else {
                Ok(200)
            }
        });

        let report = runner(10, 3, ErrorPolicy::TolerateAndTally)
            .run(task)
            .await
            .unwrap();

        assert_eq!(report.count_of(200), 8);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.completed, 10);
        assert!(report.stopped.is_none());

        let mut failed: Vec<_> = report.failures.iter().map(|f| f.index).collect();
        failed.sort_unstable();
        assert_eq!(failed, vec![2, 5]);
        assert!(report.failures.iter().all(|f| f.reason == "network unreachable"));
    }

    #[tokio::test]
    async fn dispatch_order_ignores_completion_order() {
        let tracker = Arc::new(Tracker::default());
        // Later indices finish first.
        let task = tracked(
            &tracker,
            |i| Duration::from_millis(30 - i as u64),
            |_| Ok(204),
        );

        let report = runner(12, 4, ErrorPolicy::TolerateAndTally)
            .run(task)
            .await
            .unwrap();

        assert_eq!(tracker.dispatched(), (0..12).collect::<Vec<_>>());
        assert_ne!(tracker.finished(), (0..12).collect::<Vec<_>>());
        assert_eq!(report.count_of(204), 12);
    }

    #[tokio::test]
    async fn serial_run_completes_in_index_order() {
        let tracker = Arc::new(Tracker::default());
        let task = tracked(&tracker, |i| Duration::from_millis(5 - i as u64), |_| Ok(200));

        let report = runner(5, 1, ErrorPolicy::TolerateAndTally)
            .run(task)
            .await
            .unwrap();

        let order: Vec<_> = (0..5).collect();
        assert_eq!(tracker.dispatched(), order);
        assert_eq!(tracker.finished(), order);
        assert_eq!(tracker.peak(), 1);
        assert_eq!(report.peak_in_flight, 1);
    }

    #[tokio::test]
    async fn abort_stops_dispatching() {
        let tracker = Arc::new(Tracker::default());
        let task = tracked(
            &tracker,
            |i| {
                if i == 1 {
                    Duration::ZERO
                } else {
                    Duration::from_millis(20)
                }
            },
            |i| {
                if i == 1 {
                    Err(TaskError::fail("connection refused"))
                } else {
                    Ok(200)
                }
            },
        );

        let limit = 3;
        let report = runner(10, limit, ErrorPolicy::AbortOnFirstError)
            .run(task)
            .await
            .unwrap();

        assert_eq!(
            report.stopped,
            Some(StopReason::Aborted {
                index: 1,
                reason: "connection refused".into()
            })
        );
        assert!(report.completed < 10);
        assert_eq!(report.completed, report.started);
        assert!(report.started <= 1 + limit);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn abort_without_failures_runs_everything() {
        let tracker = Arc::new(Tracker::default());
        let task = tracked(&tracker, jitter, |_| Ok(404));

        let report = runner(6, 2, ErrorPolicy::AbortOnFirstError)
            .run(task)
            .await
            .unwrap();

        assert!(report.stopped.is_none());
        assert_eq!(report.count_of(404), 6);
    }

    #[tokio::test]
    async fn cancelled_before_start_dispatches_nothing() {
        let tracker = Arc::new(Tracker::default());
        let task = tracked(&tracker, jitter, |_| Ok(200));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = runner(5, 2, ErrorPolicy::TolerateAndTally)
            .run_until_cancelled(task, cancel)
            .await
            .unwrap();

        assert_eq!(report.started, 0);
        assert_eq!(report.completed, 0);
        assert_eq!(report.stopped, Some(StopReason::Cancelled));
        assert!(tracker.dispatched().is_empty());
    }

    #[tokio::test]
    async fn cancel_mid_run_drains_in_flight() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let task = TaskFn::arc("cancel-at-3", move |index| {
            if index == 3 {
                trigger.cancel();
            }
            async move {
                tokio::time::sleep(Duration::from_millis(2)).await;
                Ok::<_, TaskError>(200)
            }
        });

        let report = runner(20, 2, ErrorPolicy::TolerateAndTally)
            .run_until_cancelled(task, cancel)
            .await
            .unwrap();

        assert_eq!(report.started, 4);
        assert_eq!(report.completed, 4);
        assert_eq!(report.count_of(200), 4);
        assert_eq!(report.stopped, Some(StopReason::Cancelled));
    }

    #[tokio::test]
    async fn cancel_while_waiting_for_a_slot() {
        let cancel = CancellationToken::new();
        let task = TaskFn::arc("slow", |_| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, TaskError>(200)
        });

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let report = runner(100, 2, ErrorPolicy::TolerateAndTally)
            .run_until_cancelled(task, cancel)
            .await
            .unwrap();

        assert_eq!(report.started, 2);
        assert_eq!(report.completed, 2);
        assert_eq!(report.stopped, Some(StopReason::Cancelled));
    }

    #[tokio::test]
    async fn panicking_task_counts_as_failure() {
        let task = TaskFn::arc("panics", |index| async move {
            if index == 0 {
                panic!("boom");
            }
            Ok::<_, TaskError>(200)
        });

        let report = runner(3, 1, ErrorPolicy::TolerateAndTally)
            .run(task)
            .await
            .unwrap();

        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].index, 0);
        assert_eq!(report.failures[0].reason, "boom");
        assert_eq!(report.count_of(200), 2);
    }

    #[tokio::test]
    async fn failure_on_last_index_does_not_abort() {
        let tracker = Arc::new(Tracker::default());
        let task = tracked(&tracker, jitter, |i| {
            if i == 4 {
                Err(TaskError::fail("last one"))
            } else {
                Ok(200)
            }
        });

        let report = runner(5, 1, ErrorPolicy::AbortOnFirstError)
            .run(task)
            .await
            .unwrap();

        assert!(report.stopped.is_none());
        assert!(report.is_complete());
        assert_eq!(report.count_of(200), 4);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].index, 4);
    }

    #[tokio::test]
    async fn panic_while_dispatching_counts_as_failure() {
        let task = TaskFn::arc("panics-early", |index: TaskIndex| {
            if index == 1 {
                panic!("no key for {index}");
            }
            async move { Ok::<_, TaskError>(200) }
        });

        let report = runner(4, 2, ErrorPolicy::TolerateAndTally)
            .run(task)
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.count_of(200), 3);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].reason, "no key for 1");
    }
}
