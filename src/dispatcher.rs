use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Mutex};
use std::thread;

/// Terminal fate of one work item. `Crashed` carries the submission
/// position so the caller can map it back to its own bookkeeping.
#[derive(Debug)]
pub enum PoolOutcome<R> {
    Finished(R),
    Crashed { task: usize, message: String },
}

/// Runs every item through `handler` on a fixed-size pool of worker
/// threads. Items are consumed exactly once, outcomes are delivered to
/// `on_outcome` on the calling thread in completion order, and a panicking
/// handler is contained to its own item: siblings keep running and the
/// panic is reported as a `Crashed` outcome.
pub fn run_pool<T, R, F>(
    items: Vec<T>,
    workers: usize,
    handler: F,
    mut on_outcome: impl FnMut(PoolOutcome<R>),
) where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let queue: Mutex<VecDeque<(usize, T)>> = Mutex::new(items.into_iter().enumerate().collect());
    let (tx, rx) = mpsc::channel::<PoolOutcome<R>>();
    let workers = workers.max(1);

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let queue = &queue;
            let handler = &handler;
            scope.spawn(move || loop {
                let next = queue.lock().unwrap().pop_front();
                let Some((task, item)) = next else { break };

                let outcome = match panic::catch_unwind(AssertUnwindSafe(|| handler(item))) {
                    Ok(result) => PoolOutcome::Finished(result),
                    Err(payload) => PoolOutcome::Crashed {
                        task,
                        message: panic_message(payload),
                    },
                };

                if tx.send(outcome).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        for outcome in rx {
            on_outcome(outcome);
        }
    });
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Completion tally shared by all workers; reporting only, never control
/// flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub succeeded: usize,
    pub errored: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

pub struct ProgressTracker {
    inner: Mutex<Progress>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        ProgressTracker {
            inner: Mutex::new(Progress {
                total,
                ..Progress::default()
            }),
        }
    }

    /// Records one completion and returns the updated snapshot for the
    /// caller's progress line.
    pub fn record(&self, succeeded: bool) -> Progress {
        let mut progress = self.inner.lock().unwrap();
        progress.completed += 1;
        if succeeded {
            progress.succeeded += 1;
        } else {
            progress.errored += 1;
        }
        *progress
    }

    pub fn snapshot(&self) -> Progress {
        *self.inner.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn every_item_is_handled_exactly_once() {
        let calls = AtomicUsize::new(0);
        let mut seen = HashSet::new();

        run_pool(
            (0..20).collect(),
            4,
            |n: usize| {
                calls.fetch_add(1, Ordering::SeqCst);
                n * 2
            },
            |outcome| match outcome {
                PoolOutcome::Finished(doubled) => {
                    assert!(seen.insert(doubled));
                }
                PoolOutcome::Crashed { .. } => panic!("no crashes expected"),
            },
        );

        assert_eq!(calls.load(Ordering::SeqCst), 20);
        assert_eq!(seen.len(), 20);
    }

    #[test]
    fn a_panicking_item_does_not_abort_siblings() {
        let mut finished = 0;
        let mut crashed_tasks = Vec::new();

        run_pool(
            vec![1, 2, 3, 4, 5],
            2,
            |n: i32| {
                if n == 3 {
                    panic!("bad item");
                }
                n
            },
            |outcome| match outcome {
                PoolOutcome::Finished(_) => finished += 1,
                PoolOutcome::Crashed { task, message } => {
                    assert!(message.contains("bad item"));
                    crashed_tasks.push(task);
                }
            },
        );

        assert_eq!(finished, 4);
        assert_eq!(crashed_tasks, vec![2]);
    }

    #[test]
    fn zero_workers_still_drains_the_queue() {
        let mut outcomes = 0;
        run_pool(vec![(), ()], 0, |_| (), |_| outcomes += 1);
        assert_eq!(outcomes, 2);
    }

    #[test]
    fn tracker_counts_successes_and_errors() {
        let tracker = ProgressTracker::new(3);
        tracker.record(true);
        tracker.record(false);
        let progress = tracker.record(true);
        assert_eq!(progress.completed, 3);
        assert_eq!(progress.succeeded, 2);
        assert_eq!(progress.errored, 1);
        assert!((progress.percent() - 100.0).abs() < f64::EPSILON);
    }
}
