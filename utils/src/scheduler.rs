// Copyright (c) 2021-2026 RBB S.r.l
// opensource@mintlayer.org
// SPDX-License-Identifier: MIT
// Licensed under the MIT License;
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://github.com/mintlayer/mintlayer-core/blob/master/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cancellable background tasks: fixed-interval jobs, trailing-edge debouncing and bounded
//! exponential backoff for retry loops.

use std::{future::Future, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::tokio_utils::tokio_spawn;

/// Handle of a background task. The task is cancelled when the handle is dropped.
pub struct TaskHandle {
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    fn new(token: CancellationToken, join: JoinHandle<()>) -> Self {
        Self {
            token,
            join: Some(join),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(|join| join.is_finished())
    }

    /// Cancel the task and wait for it to stop.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            // A cancelled or panicked task has nothing left to report.
            let _ = join.await;
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.token.cancel()
    }
}

/// Run `future` in the background until it completes or `token` is cancelled.
pub fn spawn_cancellable<Fut>(task_name: &str, token: CancellationToken, future: Fut) -> TaskHandle
where
    Fut: Future<Output = ()> + Send + 'static,
{
    let task_token = token.clone();
    let join = tokio_spawn(
        async move {
            tokio::select! {
                _ = task_token.cancelled() => {}
                _ = future => {}
            }
        },
        task_name,
    );
    TaskHandle::new(token, join)
}

/// Run `job` every `period` (first run one period from now) until `token` is cancelled.
///
/// A run that takes longer than the period delays the next one instead of causing a burst.
pub fn spawn_periodic<F, Fut>(
    task_name: &str,
    period: Duration,
    token: CancellationToken,
    mut job: F,
) -> TaskHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let task_token = token.clone();
    let join = tokio_spawn(
        async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = task_token.cancelled() => break,
                            _ = job() => {}
                        }
                    }
                }
            }
        },
        task_name,
    );
    TaskHandle::new(token, join)
}

/// Coalesces bursts of notifications into a single callback invocation, fired once no new
/// notification has arrived for `delay` (trailing edge).
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
    handle: TaskHandle,
}

impl Debouncer {
    pub fn new<F>(task_name: &str, delay: Duration, token: CancellationToken, mut callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let task_token = token.clone();
        let join = tokio_spawn(
            async move {
                loop {
                    tokio::select! {
                        _ = task_token.cancelled() => return,
                        event = rx.recv() => if event.is_none() { return },
                    }
                    loop {
                        tokio::select! {
                            _ = task_token.cancelled() => return,
                            event = rx.recv() => match event {
                                Some(()) => continue,
                                None => {
                                    callback();
                                    return;
                                }
                            },
                            _ = tokio::time::sleep(delay) => {
                                callback();
                                break;
                            }
                        }
                    }
                }
            },
            task_name,
        );
        Self {
            tx,
            handle: TaskHandle::new(token, join),
        }
    }

    pub fn notify(&self) {
        // Fails only once the task has stopped, in which case there is nobody to notify.
        let _ = self.tx.send(());
    }

    /// A handle that can notify the debouncer from another task
    pub fn notifier(&self) -> DebounceNotifier {
        DebounceNotifier {
            tx: self.tx.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    pub async fn shutdown(self) {
        self.handle.shutdown().await
    }
}

#[derive(Clone)]
pub struct DebounceNotifier {
    tx: mpsc::UnboundedSender<()>,
}

impl DebounceNotifier {
    pub fn notify(&self) {
        let _ = self.tx.send(());
    }
}

/// Bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = std::cmp::max(initial, max);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// The delay to wait before the next attempt; doubles on every call up to the maximum.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = std::cmp::min(self.current.saturating_mul(2), self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn periodic_task_runs_until_cancelled() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = spawn_periodic(
            "test-periodic",
            Duration::from_secs(10),
            CancellationToken::new(),
            {
                let counter = Arc::clone(&counter);
                move || {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                }
            },
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels_the_task() {
        let token = CancellationToken::new();
        let handle = spawn_periodic("test-drop", Duration::from_secs(1), token.clone(), || async {});
        drop(handle);
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellable_task() {
        let finished = Arc::new(AtomicUsize::new(0));
        let handle = spawn_cancellable("test-cancellable", CancellationToken::new(), {
            let finished = Arc::clone(&finished);
            async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!handle.is_finished());
        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn debouncer_fires_once_per_burst() {
        let counter = Arc::new(AtomicUsize::new(0));
        let debouncer = Debouncer::new(
            "test-debounce",
            Duration::from_secs(5),
            CancellationToken::new(),
            {
                let counter = Arc::clone(&counter);
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
        );

        for _ in 0..10 {
            debouncer.notify();
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        debouncer.notifier().notify();
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        debouncer.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_debouncer_never_fires() {
        let counter = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let debouncer = Debouncer::new("test-debounce-cancel", Duration::from_secs(5), token.clone(), {
            let counter = Arc::clone(&counter);
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        debouncer.notify();
        token.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_cancelled());
    }

    #[rstest::rstest]
    #[case(1, 8, vec![1, 2, 4, 8, 8])]
    #[case(5, 60, vec![5, 10, 20, 40, 60, 60])]
    #[case(10, 3, vec![10, 10, 10])]
    fn backoff_is_bounded(#[case] initial: u64, #[case] max: u64, #[case] expected: Vec<u64>) {
        let mut backoff = Backoff::new(Duration::from_secs(initial), Duration::from_secs(max));
        let delays: Vec<u64> = expected.iter().map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, expected);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(initial));
    }
}
