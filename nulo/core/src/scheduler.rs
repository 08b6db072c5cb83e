//! Timer Tasks
//!
//! The only place in the core that touches tokio timers. A [`Scheduler`]
//! spawns small tasks that post [`SessionEvent`]s into the session inbox and
//! hands back an owned [`TaskHandle`]. Dropping or cancelling the handle
//! aborts the task, so whoever stores the handle controls the task's lifetime.
//!
//! Cancellation is not enough on its own: a tick may already sit in the
//! inbox when its task is aborted. Every event the scheduler posts therefore
//! carries the owner's epoch (see [`crate::events`]).

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::events::SessionEvent;

/// Spawns periodic and one-shot event posters
#[derive(Clone, Debug)]
pub struct Scheduler {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl Scheduler {
    /// Create a scheduler posting into `tx`
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }

    /// Create a scheduler together with the inbox it posts into
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Sender for non-timer events (player input)
    #[must_use]
    pub fn sender(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.tx.clone()
    }

    /// Post `event` every `period`, first after one full period
    ///
    /// Missed ticks are skipped rather than bursted. The task ends on its own
    /// once the inbox is closed.
    #[must_use = "dropping the handle cancels the task"]
    pub fn every(&self, period: Duration, event: SessionEvent) -> TaskHandle {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if tx.send(event.clone()).is_err() {
                    break;
                }
            }
        });
        TaskHandle::new(handle)
    }

    /// Post `event` once after `delay`
    #[must_use = "dropping the handle cancels the task"]
    pub fn after(&self, delay: Duration, event: SessionEvent) -> TaskHandle {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            // Inbox closed means the session is gone
            let _ = tx.send(event);
        });
        TaskHandle::new(handle)
    }

    /// Post `event` immediately
    pub fn post(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

/// Owned handle to a spawned timer task; aborts the task on drop
#[derive(Debug)]
pub struct TaskHandle {
    handle: JoinHandle<()>,
}

impl TaskHandle {
    fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    /// Abort the task
    pub fn cancel(self) {
        drop(self);
    }

    /// Whether the task has completed (fired, aborted or closed)
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Holds at most one task; installing a new one cancels the previous
#[derive(Debug, Default)]
pub struct TaskSlot {
    current: Option<TaskHandle>,
}

impl TaskSlot {
    /// Empty slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handle`, cancelling whatever was there
    pub fn replace(&mut self, handle: TaskHandle) {
        self.current = Some(handle);
    }

    /// Cancel the current task, if any
    pub fn cancel(&mut self) {
        self.current = None;
    }

    /// Whether a task is installed and still running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// Every task scheduled for one phase
#[derive(Debug, Default)]
pub struct TaskGroup {
    tasks: Vec<TaskHandle>,
}

impl TaskGroup {
    /// Empty group
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task to the group
    pub fn push(&mut self, handle: TaskHandle) {
        // Keep the list short during long sequences
        self.tasks.retain(|h| !h.is_finished());
        self.tasks.push(handle);
    }

    /// Cancel every task in the group
    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    /// Number of tasks that have not finished yet
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.iter().filter(|h| !h.is_finished()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_after_fires_once() {
        let (scheduler, mut rx) = Scheduler::channel();
        let _handle = scheduler.after(Duration::from_secs(2), SessionEvent::Restart);

        let start = Instant::now();
        assert_eq!(rx.recv().await, Some(SessionEvent::Restart));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_waits_one_period_first() {
        let (scheduler, mut rx) = Scheduler::channel();
        let _handle = scheduler.every(Duration::from_millis(50), SessionEvent::ClockTick { epoch: 1 });

        let start = Instant::now();
        for n in 1..=3u32 {
            assert_eq!(rx.recv().await, Some(SessionEvent::ClockTick { epoch: 1 }));
            assert_eq!(start.elapsed(), Duration::from_millis(50) * n);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels() {
        let (scheduler, mut rx) = Scheduler::channel();
        let handle = scheduler.every(Duration::from_millis(10), SessionEvent::Frame { epoch: 0 });
        handle.cancel();

        time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_replaces_previous_task() {
        let (scheduler, mut rx) = Scheduler::channel();
        let mut slot = TaskSlot::new();
        slot.replace(scheduler.every(Duration::from_millis(10), SessionEvent::RevealTick { epoch: 1 }));
        slot.replace(scheduler.every(Duration::from_millis(10), SessionEvent::RevealTick { epoch: 2 }));
        assert!(slot.is_active());

        time::sleep(Duration::from_millis(35)).await;
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event);
        }
        assert_eq!(seen.len(), 3);
        assert!(seen
            .iter()
            .all(|e| *e == SessionEvent::RevealTick { epoch: 2 }));

        slot.cancel();
        assert!(!slot.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_cancel_all() {
        let (scheduler, mut rx) = Scheduler::channel();
        let mut group = TaskGroup::new();
        for n in 1..=5u64 {
            group.push(scheduler.after(Duration::from_secs(n), SessionEvent::Quit));
        }
        assert_eq!(group.pending(), 5);

        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(rx.try_recv(), Ok(SessionEvent::Quit));

        group.cancel_all();
        time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }
}
