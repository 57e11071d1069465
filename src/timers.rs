//! Virtual-clock timer queue.
//!
//! Time only moves when the owner advances it, so timed behavior is fully
//! deterministic. Tasks run in `(due_at, order)` order. `order` is the
//! scheduling sequence number, which breaks ties between tasks due at the same
//! instant.

use tracing::trace;

use crate::dom::NodeId;

pub type TimerId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerAction {
    /// Strip `classes` from `node` when the timer fires.
    RemoveClasses { node: NodeId, classes: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScheduledTask {
    pub(crate) id: TimerId,
    pub(crate) due_at: i64,
    pub(crate) order: i64,
    pub(crate) action: TimerAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: TimerId,
    pub due_at: i64,
    pub order: i64,
    pub action: TimerAction,
}

#[derive(Debug, Clone)]
pub struct TimerQueue {
    tasks: Vec<ScheduledTask>,
    now_ms: i64,
    next_timer_id: TimerId,
    next_task_order: i64,
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            now_ms: 0,
            next_timer_id: 1,
            next_task_order: 0,
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    /// Moves the clock forward. Never moves it backwards.
    pub(crate) fn set_now(&mut self, now_ms: i64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn schedule_timeout(&mut self, delay_ms: i64, action: TimerAction) -> TimerId {
        let delay_ms = delay_ms.max(0);
        let due_at = self.now_ms.saturating_add(delay_ms);
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        trace!(id, due_at, delay_ms, "schedule timeout");
        self.tasks.push(ScheduledTask {
            id,
            due_at,
            order,
            action,
        });
        id
    }

    /// Returns whether a pending task was removed. Unknown or already-run ids
    /// are ignored.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        let removed = before != self.tasks.len();
        trace!(id, removed, "clear timeout");
        removed
    }

    pub fn clear_all(&mut self) -> usize {
        let cleared = self.tasks.len();
        self.tasks.clear();
        cleared
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pending(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .tasks
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
                action: task.action.clone(),
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    /// Earliest task due at or before `due_limit`, left in the queue.
    pub(crate) fn peek_next(&self, due_limit: Option<i64>) -> Option<&ScheduledTask> {
        self.next_task_index(due_limit).map(|idx| &self.tasks[idx])
    }

    /// Removes and returns the earliest task due at or before `due_limit`
    /// (any task when `None`).
    pub(crate) fn pop_next(&mut self, due_limit: Option<i64>) -> Option<ScheduledTask> {
        let idx = self.next_task_index(due_limit)?;
        Some(self.tasks.remove(idx))
    }
}
