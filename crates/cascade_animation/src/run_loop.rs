// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cooperative host run loop.
//!
//! Timed playback never blocks: steps and delays register callbacks here and
//! the host drives time forward with [`RunLoop::advance`], typically once per
//! frame. Everything runs on the thread owning the loop.

use std::cell::RefCell;
use std::rc::Rc;

/// Identifier of a scheduled timer or ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Result returned by a ticker after each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Keep the ticker registered
    Continue,
    /// Remove the ticker
    Finished,
}

type TimerFn = Box<dyn FnOnce()>;
type TickerFn = Box<dyn FnMut(f64) -> Tick>;

struct Timer {
    id: TaskId,
    due: f64,
    callback: TimerFn,
}

#[derive(Default)]
struct RunLoopInner {
    now: f64,
    next_id: u64,
    timers: Vec<Timer>,
    tickers: Vec<(TaskId, TickerFn)>,
    /// Ticker currently executing, and whether it was cancelled meanwhile
    running_ticker: Option<(TaskId, bool)>,
    interaction_locks: usize,
}

impl RunLoopInner {
    fn allocate_id(&mut self) -> TaskId {
        self.next_id += 1;
        TaskId(self.next_id)
    }

    /// Remove and return the earliest timer due at or before `now`
    fn pop_due_timer(&mut self) -> Option<Timer> {
        let now = self.now;
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)))
            .map(|(i, _)| i)?;
        Some(self.timers.remove(index))
    }
}

/// Handle to a single-threaded run loop
///
/// Clones share the same loop.
#[derive(Clone, Default)]
pub struct RunLoop {
    inner: Rc<RefCell<RunLoopInner>>,
}

impl RunLoop {
    /// Create a new run loop at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current loop time in seconds
    pub fn now(&self) -> f64 {
        self.inner.borrow().now
    }

    /// Run `callback` once, `delay` seconds from now
    pub fn schedule_after(&self, delay: f64, callback: impl FnOnce() + 'static) -> TaskId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.allocate_id();
        let due = inner.now + delay.max(0.0);
        inner.timers.push(Timer {
            id,
            due,
            callback: Box::new(callback),
        });
        id
    }

    /// Run `ticker` on every frame until it returns [`Tick::Finished`]
    pub fn add_ticker(&self, ticker: impl FnMut(f64) -> Tick + 'static) -> TaskId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.allocate_id();
        inner.tickers.push((id, Box::new(ticker)));
        id
    }

    /// Cancel a timer or ticker. Unknown or already fired ids are ignored.
    pub fn cancel(&self, id: TaskId) {
        let mut inner = self.inner.borrow_mut();
        inner.timers.retain(|t| t.id != id);
        inner.tickers.retain(|(tid, _)| *tid != id);
        if let Some((running, cancelled)) = inner.running_ticker.as_mut() {
            if *running == id {
                *cancelled = true;
            }
        }
    }

    /// Whether a timer or ticker is still pending
    pub fn is_pending(&self, id: TaskId) -> bool {
        let inner = self.inner.borrow();
        inner.timers.iter().any(|t| t.id == id) || inner.tickers.iter().any(|(tid, _)| *tid == id)
    }

    /// Number of pending timers and tickers
    pub fn pending_count(&self) -> usize {
        let inner = self.inner.borrow();
        inner.timers.len() + inner.tickers.len()
    }

    /// Advance time by `delta_time` seconds, firing due timers then tickers
    pub fn advance(&self, delta_time: f64) {
        self.inner.borrow_mut().now += delta_time.max(0.0);

        // Timers may schedule further timers that are already due
        loop {
            let timer = self.inner.borrow_mut().pop_due_timer();
            match timer {
                Some(timer) => (timer.callback)(),
                None => break,
            }
        }

        let ids: Vec<TaskId> = self.inner.borrow().tickers.iter().map(|(id, _)| *id).collect();
        for id in ids {
            let taken = {
                let mut inner = self.inner.borrow_mut();
                let position = inner.tickers.iter().position(|(tid, _)| *tid == id);
                let taken = position.map(|p| inner.tickers.remove(p));
                if taken.is_some() {
                    inner.running_ticker = Some((id, false));
                }
                taken
            };
            let Some((id, mut ticker)) = taken else {
                continue;
            };

            let now = self.now();
            let tick = ticker(now);

            let mut inner = self.inner.borrow_mut();
            let cancelled = matches!(inner.running_ticker.take(), Some((_, true)));
            if tick == Tick::Continue && !cancelled {
                inner.tickers.push((id, ticker));
            }
        }
    }

    /// Advance time in fixed frames until nothing is pending or `max_time` elapsed
    ///
    /// Returns the time actually advanced.
    pub fn run_until_idle(&self, frame: f64, max_time: f64) -> f64 {
        let frame = if frame > 0.0 { frame } else { 1.0 / 60.0 };
        let mut elapsed = 0.0;
        while self.pending_count() > 0 && elapsed < max_time {
            self.advance(frame);
            elapsed += frame;
        }
        elapsed
    }

    /// Block user interaction with the host UI (counted)
    pub fn lock_interaction(&self) {
        self.inner.borrow_mut().interaction_locks += 1;
    }

    /// Release one interaction lock
    pub fn unlock_interaction(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.interaction_locks == 0 {
            tracing::warn!("Unbalanced interaction unlock ignored");
            return;
        }
        inner.interaction_locks -= 1;
    }

    /// Whether at least one interaction lock is held
    pub fn is_interaction_locked(&self) -> bool {
        self.inner.borrow().interaction_locks > 0
    }
}

impl std::fmt::Debug for RunLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("RunLoop")
            .field("now", &inner.now)
            .field("timers", &inner.timers.len())
            .field("tickers", &inner.tickers.len())
            .field("interaction_locks", &inner.interaction_locks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_timers_fire_in_due_order() {
        let run_loop = RunLoop::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (delay, label) in [(0.5, "late"), (0.1, "early"), (0.1, "early-second")] {
            let log = log.clone();
            run_loop.schedule_after(delay, move || log.borrow_mut().push(label));
        }

        run_loop.advance(0.2);
        assert_eq!(*log.borrow(), vec!["early", "early-second"]);
        run_loop.advance(0.3);
        assert_eq!(*log.borrow(), vec!["early", "early-second", "late"]);
        assert_eq!(run_loop.pending_count(), 0);
    }

    #[test]
    fn test_nested_due_timer_fires_same_advance() {
        let run_loop = RunLoop::new();
        let fired = Rc::new(Cell::new(false));

        let inner_loop = run_loop.clone();
        let inner_fired = fired.clone();
        run_loop.schedule_after(0.1, move || {
            let inner_fired = inner_fired.clone();
            inner_loop.schedule_after(0.0, move || inner_fired.set(true));
        });

        run_loop.advance(0.1);
        assert!(fired.get());
    }

    #[test]
    fn test_ticker_runs_until_finished() {
        let run_loop = RunLoop::new();
        let count = Rc::new(Cell::new(0));

        let ticks = count.clone();
        run_loop.add_ticker(move |_| {
            ticks.set(ticks.get() + 1);
            if ticks.get() == 3 {
                Tick::Finished
            } else {
                Tick::Continue
            }
        });

        for _ in 0..5 {
            run_loop.advance(0.016);
        }
        assert_eq!(count.get(), 3);
        assert_eq!(run_loop.pending_count(), 0);
    }

    #[test]
    fn test_ticker_cancelled_from_inside_is_removed() {
        let run_loop = RunLoop::new();
        let id_cell = Rc::new(Cell::new(None));
        let count = Rc::new(Cell::new(0));

        let handle = run_loop.clone();
        let own_id = id_cell.clone();
        let ticks = count.clone();
        let id = run_loop.add_ticker(move |_| {
            ticks.set(ticks.get() + 1);
            if let Some(id) = own_id.get() {
                handle.cancel(id);
            }
            Tick::Continue
        });
        id_cell.set(Some(id));

        run_loop.advance(0.016);
        run_loop.advance(0.016);
        assert_eq!(count.get(), 1);
        assert!(!run_loop.is_pending(id));
    }

    #[test]
    fn test_cancel_timer() {
        let run_loop = RunLoop::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let id = run_loop.schedule_after(0.1, move || flag.set(true));

        run_loop.cancel(id);
        run_loop.advance(1.0);
        assert!(!fired.get());
    }

    #[test]
    fn test_interaction_lock_is_counted() {
        let run_loop = RunLoop::new();
        run_loop.lock_interaction();
        run_loop.lock_interaction();
        run_loop.unlock_interaction();
        assert!(run_loop.is_interaction_locked());
        run_loop.unlock_interaction();
        assert!(!run_loop.is_interaction_locked());
        run_loop.unlock_interaction();
        assert!(!run_loop.is_interaction_locked());
    }
}
