//! Cancellable background refresh tasks.
//!
//! A [`RefreshTask`] runs its tick on a dedicated thread, then sleeps for the
//! interval on a channel so that [`Stoppable::stop`] wakes it immediately.
//! Stopping joins the thread, so no task outlives its owner.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

const TASKS_TARGET: &str = "btcz_cli::tasks";

/// Background work that can be shut down by its owner.
pub(crate) trait Stoppable {
    /// Stops the work and waits for it to finish. Stopping twice is a no-op.
    fn stop(&mut self);
}

/// Periodic work on a dedicated thread.
#[derive(Debug)]
pub(crate) struct RefreshTask {
    name: &'static str,
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshTask {
    /// Starts running `tick` now and then every `interval`.
    pub(crate) fn spawn<F>(name: &'static str, interval: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name(format!("refresh-{name}"))
            .spawn(move || {
                loop {
                    tick();
                    match cancelled.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!(target: TASKS_TARGET, task = name, "refresh task finished");
            })?;
        Ok(Self {
            name,
            cancel: Some(cancel),
            handle: Some(handle),
        })
    }

    pub(crate) const fn name(&self) -> &'static str {
        self.name
    }
}

impl Stoppable for RefreshTask {
    fn stop(&mut self) {
        // Dropping the sender wakes the sleeping thread.
        drop(self.cancel.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(target: TASKS_TARGET, task = self.name, "refresh task panicked");
            }
        }
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use super::*;

    fn counting_task(interval: Duration) -> (RefreshTask, Arc<AtomicUsize>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let task = RefreshTask::spawn("test", interval, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .expect("spawn task");
        (task, ticks)
    }

    fn wait_for_ticks(ticks: &AtomicUsize, expected: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while ticks.load(Ordering::SeqCst) < expected {
            assert!(Instant::now() < deadline, "task did not tick {expected} times");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn ticks_immediately_and_repeatedly() {
        let (mut task, ticks) = counting_task(Duration::from_millis(10));
        wait_for_ticks(&ticks, 3);
        task.stop();
    }

    #[test]
    fn stop_interrupts_a_long_sleep() {
        let (mut task, ticks) = counting_task(Duration::from_secs(3600));
        wait_for_ticks(&ticks, 1);

        let started = Instant::now();
        task.stop();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stopping_twice_is_harmless() {
        let (mut task, ticks) = counting_task(Duration::from_secs(3600));
        wait_for_ticks(&ticks, 1);
        task.stop();
        task.stop();
        assert_eq!(task.name(), "test");
    }

    #[test]
    fn dropping_a_task_stops_it() {
        let (task, ticks) = counting_task(Duration::from_millis(1));
        wait_for_ticks(&ticks, 1);
        drop(task);
        let after_drop = ticks.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(ticks.load(Ordering::SeqCst), after_drop);
    }
}
