//! Cooperative single-threaded scheduler.
//!
//! Callbacks and alarms are plain task values rather than function pointers.
//! The owner of the scheduler pulls one task at a time with
//! [`Scheduler::run_one_pending_task`] and dispatches it itself, so every unit
//! of work runs to completion before the next one is looked at.
//!
//! ```rust
//! use zb_modbus::scheduler::{Schedule, Scheduler};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Task { Blink, Poll }
//!
//! let mut sched: Scheduler<Task, 4, 4> = Scheduler::new();
//! sched.schedule_alarm(Task::Blink, 100).unwrap();
//! sched.schedule_callback(Task::Poll).unwrap();
//!
//! assert_eq!(sched.run_one_pending_task(0), Some(Task::Poll));
//! assert_eq!(sched.run_one_pending_task(50), None);
//! assert_eq!(sched.run_one_pending_task(100), Some(Task::Blink));
//! ```

use crate::error::Error;
use heapless::{Deque, Vec};

/// Milliseconds since an arbitrary epoch chosen by the caller.
pub type Millis = u64;

/// Scheduling operations a component may request.
///
/// Components only ever see this trait, parameterised over their own task
/// type, so they can be driven by any scheduler whose task type they convert
/// into.
pub trait Schedule<T> {
    /// Run `task` on a following turn, after anything already queued.
    fn schedule_callback(&mut self, task: T) -> Result<(), Error>;

    /// Run `task` once `delay_ms` milliseconds have elapsed.
    fn schedule_alarm(&mut self, task: T, delay_ms: u32) -> Result<(), Error>;

    /// Remove every pending alarm equal to `task`.
    ///
    /// Returns `true` if at least one alarm was removed. Already-run work is
    /// not rolled back.
    fn cancel_alarm(&mut self, task: T) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Alarm<T> {
    deadline: Millis,
    task: T,
}

/// Fixed-capacity scheduler with `C` callback slots and `A` alarm slots.
#[derive(Debug)]
pub struct Scheduler<T, const C: usize, const A: usize> {
    callbacks: Deque<T, C>,
    // Kept in insertion order; ties on deadline run first-armed first.
    alarms: Vec<Alarm<T>, A>,
    now: Millis,
}

impl<T: Copy + PartialEq, const C: usize, const A: usize> Scheduler<T, C, A> {
    /// Creates an empty scheduler with its clock at zero.
    pub fn new() -> Self {
        Self {
            callbacks: Deque::new(),
            alarms: Vec::new(),
            now: 0,
        }
    }

    /// Current scheduler time, i.e. the latest `now` passed to
    /// [`run_one_pending_task`](Self::run_one_pending_task).
    pub fn now(&self) -> Millis {
        self.now
    }

    /// Number of callbacks plus alarms still waiting.
    pub fn pending(&self) -> usize {
        self.callbacks.len() + self.alarms.len()
    }

    /// Whether an alarm equal to `task` is armed.
    pub fn is_armed(&self, task: T) -> bool {
        self.alarms.iter().any(|a| a.task == task)
    }

    /// Deadline of the earliest armed alarm.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.alarms.iter().map(|a| a.deadline).min()
    }

    /// Advances the clock to `now` and hands back one runnable task.
    ///
    /// Queued callbacks always win over alarms. Among due alarms the one with
    /// the earliest deadline is returned. The clock never moves backwards.
    pub fn run_one_pending_task(&mut self, now: Millis) -> Option<T> {
        if now > self.now {
            self.now = now;
        }

        if let Some(task) = self.callbacks.pop_front() {
            return Some(task);
        }

        let mut due: Option<(usize, Millis)> = None;
        for (i, alarm) in self.alarms.iter().enumerate() {
            if alarm.deadline > self.now {
                continue;
            }
            match due {
                Some((_, best)) if best <= alarm.deadline => {}
                _ => due = Some((i, alarm.deadline)),
            }
        }

        due.map(|(i, _)| self.alarms.remove(i).task)
    }
}

impl<T: Copy + PartialEq, const C: usize, const A: usize> Default for Scheduler<T, C, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, U, const C: usize, const A: usize> Schedule<U> for Scheduler<T, C, A>
where
    T: Copy + PartialEq + From<U>,
{
    fn schedule_callback(&mut self, task: U) -> Result<(), Error> {
        self.callbacks
            .push_back(T::from(task))
            .map_err(|_| Error::SchedulerFull)
    }

    fn schedule_alarm(&mut self, task: U, delay_ms: u32) -> Result<(), Error> {
        let alarm = Alarm {
            deadline: self.now.saturating_add(Millis::from(delay_ms)),
            task: T::from(task),
        };
        self.alarms.push(alarm).map_err(|_| Error::SchedulerFull)
    }

    fn cancel_alarm(&mut self, task: U) -> bool {
        let task = T::from(task);
        let before = self.alarms.len();
        self.alarms.retain(|a| a.task != task);
        self.alarms.len() != before
    }
}
