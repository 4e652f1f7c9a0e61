//! Cooperative deferred-task scheduling.
//!
//! Interrupt handlers never do real work; they hand it to a [Scheduler], and the main loop runs
//! whatever is due. Each task has a single pending activation: scheduling it again moves it to
//! the new due tick and [merges](TaskData::merge) the new data into what was still pending, so
//! nothing an interrupt handed over is lost.

use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use log::{trace, warn};
use crate::clock::{elapsed, TickClock, Ticks};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TaskId(pub usize);

/// Auxiliary data of a task activation.
pub trait TaskData: Debug {
    /// Folds the data of a newer activation into this still pending one.
    fn merge(&mut self, newer: Self);
}

impl TaskData for () {
    fn merge(&mut self, _newer: Self) {}
}

/// Queue of deferred task activations carrying data of type `D`.
///
/// Methods take `&self` so that interrupt handlers and the task loop can share one scheduler.
pub trait Scheduler<D>: Debug {
    /// Runs `task` with `data` once `delay` ticks have passed. A delay of 0 means as soon as
    /// possible. A pending activation of `task` is moved, its data merged with `data`.
    fn schedule(&self, task: TaskId, data: D, delay: Ticks);
    /// Drops the pending activation of `task`, returning its data.
    fn deschedule(&self, task: TaskId) -> Option<D>;
}

struct Activation<D> {
    due: Ticks,
    data: D,
}

/// A [Scheduler] with `N` task slots, driven by a [TickClock].
pub struct TickScheduler<'a, D, const N: usize> {
    clock: &'a dyn TickClock,
    slots: RefCell<[Option<Activation<D>>; N]>,
}

impl<'a, D, const N: usize> TickScheduler<'a, D, N> {
    pub fn new(clock: &'a dyn TickClock) -> Self {
        TickScheduler {
            clock,
            slots: RefCell::new(std::array::from_fn(|_| None)),
        }
    }

    /// Gets the tick the pending activation of `task` is due at.
    pub fn pending(&self, task: TaskId) -> Option<Ticks> {
        self.slots.borrow().get(task.0)?.as_ref().map(|activation| activation.due)
    }

    /// Removes and returns the most overdue activation, if any is due.
    pub fn take_due(&self) -> Option<(TaskId, D)> {
        let now = self.clock.ticks();
        let mut slots = self.slots.borrow_mut();

        let (index, _) = slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let overdue = elapsed(now, slot.as_ref()?.due);
                // Anything more than half the tick range "overdue" is really in the future.
                (overdue <= Ticks::MAX / 2).then_some((index, overdue))
            })
            .max_by_key(|&(_, overdue)| overdue)?;

        let activation = slots[index].take()?;
        Some((TaskId(index), activation.data))
    }
}

impl<D, const N: usize> Debug for TickScheduler<'_, D, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pending = self.slots.borrow().iter().filter(|slot| slot.is_some()).count();
        write!(f, "TickScheduler({}/{} pending)", pending, N)
    }
}

impl<D: TaskData, const N: usize> Scheduler<D> for TickScheduler<'_, D, N> {
    fn schedule(&self, task: TaskId, data: D, delay: Ticks) {
        let due = self.clock.ticks().wrapping_add(delay);
        let mut slots = self.slots.borrow_mut();
        let Some(slot) = slots.get_mut(task.0) else {
            warn!("Task {} does not exist, activation dropped.", task.0);
            return;
        };

        let data = match slot.take() {
            Some(mut pending) => {
                pending.data.merge(data);
                pending.data
            }
            None => data,
        };
        trace!("Task {} scheduled for tick {} with {:?}", task.0, due, data);
        *slot = Some(Activation { due, data });
    }

    fn deschedule(&self, task: TaskId) -> Option<D> {
        let activation = self.slots.borrow_mut().get_mut(task.0)?.take()?;
        Some(activation.data)
    }
}
