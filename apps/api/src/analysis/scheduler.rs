//! Delayed, cancellable analysis with last-input-wins semantics.
//!
//! Every `submit` allocates a new generation. A pending computation only
//! publishes its result if the published state still belongs to its own
//! generation; the check runs under the watch channel's lock, so a
//! superseded computation can never overwrite the state of newer input.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::analysis::models::AnalysisResult;
use crate::analysis::scorer::analyze;

/// What a client should currently display for a piece of input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisState {
    /// No input, or blank input. Nothing to show.
    Empty { generation: u64 },
    /// Input accepted, result not ready yet.
    Pending { generation: u64 },
    Ready {
        generation: u64,
        result: Arc<AnalysisResult>,
    },
}

impl AnalysisState {
    pub fn generation(&self) -> u64 {
        match self {
            AnalysisState::Empty { generation }
            | AnalysisState::Pending { generation }
            | AnalysisState::Ready { generation, .. } => *generation,
        }
    }
}

/// Latest generation handed out plus the task computing it, if any.
#[derive(Default)]
struct InFlight {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

pub struct AnalysisScheduler {
    delay: Duration,
    state: Arc<watch::Sender<AnalysisState>>,
    /// Held for the whole of `submit`/`cancel`: allocating a generation,
    /// aborting the old task, publishing and storing the new task happen as
    /// one step, so publish order always follows generation order.
    in_flight: Mutex<InFlight>,
}

impl AnalysisScheduler {
    pub fn new(delay: Duration) -> Self {
        let (state, _) = watch::channel(AnalysisState::Empty { generation: 0 });
        Self {
            delay,
            state: Arc::new(state),
            in_flight: Mutex::new(InFlight::default()),
        }
    }

    /// Schedules analysis of `text`, superseding anything still pending.
    /// Blank text clears the state without running the scorer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, text: String) -> u64 {
        let mut in_flight = self.lock_in_flight();
        in_flight.generation += 1;
        let generation = in_flight.generation;
        if let Some(task) = in_flight.task.take() {
            task.abort();
        }

        if text.trim().is_empty() {
            self.state.send_replace(AnalysisState::Empty { generation });
            return generation;
        }

        self.state.send_replace(AnalysisState::Pending { generation });

        let state = Arc::clone(&self.state);
        let delay = self.delay;
        in_flight.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = Arc::new(analyze(&text));
            let published = state.send_if_modified(|current| {
                if current.generation() != generation {
                    return false;
                }
                *current = AnalysisState::Ready { generation, result };
                true
            });
            if !published {
                debug!("Discarded stale analysis for generation {generation}");
            }
        }));
        generation
    }

    pub fn current(&self) -> AnalysisState {
        self.state.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<AnalysisState> {
        self.state.subscribe()
    }

    /// Aborts any pending computation and clears the state.
    pub fn cancel(&self) {
        let mut in_flight = self.lock_in_flight();
        in_flight.generation += 1;
        if let Some(task) = in_flight.task.take() {
            task.abort();
        }
        self.state.send_replace(AnalysisState::Empty {
            generation: in_flight.generation,
        });
    }

    // A panic while holding the lock leaves `InFlight` consistent, so a
    // poisoned lock is recovered rather than skipped.
    fn lock_in_flight(&self) -> MutexGuard<'_, InFlight> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for AnalysisScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.lock_in_flight().task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1500);

    async fn wait_ready(rx: &mut watch::Receiver<AnalysisState>) -> AnalysisState {
        rx.wait_for(|s| matches!(s, AnalysisState::Ready { .. }))
            .await
            .unwrap()
            .clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_published_after_delay() {
        let scheduler = AnalysisScheduler::new(DELAY);
        let generation = scheduler.submit("Built APIs in python.".to_string());

        assert_eq!(scheduler.current(), AnalysisState::Pending { generation });

        let mut rx = scheduler.subscribe();
        let state = wait_ready(&mut rx).await;
        match state {
            AnalysisState::Ready { generation: g, result } => {
                assert_eq!(g, generation);
                assert_eq!(*result, analyze("Built APIs in python."));
            }
            other => panic!("expected ready, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_input_supersedes_pending() {
        let scheduler = AnalysisScheduler::new(DELAY);
        let mut rx = scheduler.subscribe();

        let first = scheduler.submit("First draft".to_string());
        tokio::time::sleep(Duration::from_millis(500)).await;
        let second = scheduler.submit("Second draft with react.".to_string());
        assert!(second > first);

        let state = wait_ready(&mut rx).await;
        assert_eq!(state.generation(), second);

        // Give any stale task a chance to run; the state must not regress.
        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(scheduler.current().generation(), second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_task_never_publishes_ready() {
        let scheduler = AnalysisScheduler::new(DELAY);
        let mut rx = scheduler.subscribe();

        let stale = scheduler.submit("Old text.".to_string());
        let fresh = scheduler.submit("New text.".to_string());

        let mut seen = Vec::new();
        loop {
            rx.changed().await.unwrap();
            let state = rx.borrow_and_update().clone();
            let done = matches!(state, AnalysisState::Ready { .. });
            seen.push(state);
            if done {
                break;
            }
        }

        assert!(seen
            .iter()
            .all(|s| !matches!(s, AnalysisState::Ready { generation, .. } if *generation == stale)));
        assert_eq!(seen.last().map(AnalysisState::generation), Some(fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_input_clears_state() {
        let scheduler = AnalysisScheduler::new(DELAY);
        let mut rx = scheduler.subscribe();

        scheduler.submit("Some resume text.".to_string());
        wait_ready(&mut rx).await;

        let generation = scheduler.submit("   \n\t".to_string());
        assert_eq!(scheduler.current(), AnalysisState::Empty { generation });
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_input_cancels_pending() {
        let scheduler = AnalysisScheduler::new(DELAY);
        scheduler.submit("Pending text.".to_string());
        let generation = scheduler.submit(String::new());

        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(scheduler.current(), AnalysisState::Empty { generation });
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_clears_pending() {
        let scheduler = AnalysisScheduler::new(DELAY);
        scheduler.submit("Pending text.".to_string());
        scheduler.cancel();

        tokio::time::sleep(DELAY * 2).await;
        assert!(matches!(scheduler.current(), AnalysisState::Empty { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poisoned_lock_still_aborts_pending() {
        let scheduler = Arc::new(AnalysisScheduler::new(DELAY));
        scheduler.submit("Pending text.".to_string());

        let holder = Arc::clone(&scheduler);
        let _ = std::thread::spawn(move || {
            let _guard = holder.in_flight.lock().unwrap();
            panic!("panic while holding the in-flight lock");
        })
        .join();
        assert!(scheduler.in_flight.is_poisoned());

        let generation = scheduler.submit(String::new());
        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(scheduler.current(), AnalysisState::Empty { generation });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submits_last_generation_wins() {
        for _ in 0..300 {
            let scheduler = Arc::new(AnalysisScheduler::new(Duration::from_millis(1)));
            let barrier = Arc::new(tokio::sync::Barrier::new(4));

            let submits: Vec<_> = (0..4)
                .map(|i| {
                    let scheduler = Arc::clone(&scheduler);
                    let barrier = Arc::clone(&barrier);
                    tokio::spawn(async move {
                        barrier.wait().await;
                        scheduler.submit(format!("Draft number {i}."))
                    })
                })
                .collect();

            let mut newest = 0;
            for submit in submits {
                newest = newest.max(submit.await.unwrap());
            }
            assert_eq!(newest, 4);
            assert_eq!(scheduler.current().generation(), newest);

            let mut rx = scheduler.subscribe();
            let state = wait_ready(&mut rx).await;
            assert_eq!(state.generation(), newest);
        }
    }

    #[test]
    fn test_state_serializes_with_status_tag() {
        let json = serde_json::to_value(AnalysisState::Pending { generation: 3 }).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["generation"], 3);
    }
}
