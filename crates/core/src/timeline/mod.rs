//! Deterministic single-threaded host for timers, animation frames and
//! viewport resize notifications.
//!
//! Every registration hands back a [`Registration`] which cancels the
//! callback when dropped. Callbacks are always invoked after the loop's
//! internal state has been released, so they are free to register new
//! callbacks or cancel existing ones.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    rc::{Rc, Weak},
    time::Duration,
};

use crate::Viewport;

type TimerCallback = Box<dyn FnOnce(Duration)>;
type FrameCallback = Box<dyn FnOnce(Duration)>;
type ResizeCallback = Rc<RefCell<dyn FnMut(Viewport)>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Timer(u64),
    Frame(u64),
    Resize(u64),
}

struct PendingTimer {
    due: Duration,
    callback: TimerCallback,
}

/// A callback taken out of the registry, to be dropped once the registry is
/// no longer borrowed.
#[allow(dead_code)]
enum Released {
    Timer(PendingTimer),
    Frame(FrameCallback),
    Resize(ResizeCallback),
}

struct LoopState {
    now: Duration,
    viewport: Viewport,
    next_id: u64,
    timers: BTreeMap<u64, PendingTimer>,
    frames: BTreeMap<u64, FrameCallback>,
    resize_listeners: BTreeMap<u64, ResizeCallback>,
}

impl LoopState {
    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn release(&mut self, slot: Slot) -> Option<Released> {
        match slot {
            Slot::Timer(id) => self.timers.remove(&id).map(Released::Timer),
            Slot::Frame(id) => self.frames.remove(&id).map(Released::Frame),
            Slot::Resize(id) => self.resize_listeners.remove(&id).map(Released::Resize),
        }
    }

    fn next_due_timer(&self, deadline: Duration) -> Option<(u64, Duration)> {
        self.timers
            .iter()
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(id, timer)| (timer.due, **id))
            .map(|(id, timer)| (*id, timer.due))
    }
}

/// Virtual clock and callback registry driving the application.
pub struct EventLoop {
    state: Rc<RefCell<LoopState>>,
}

impl EventLoop {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            state: Rc::new(RefCell::new(LoopState {
                now: Duration::ZERO,
                viewport,
                next_id: 0,
                timers: BTreeMap::new(),
                frames: BTreeMap::new(),
                resize_listeners: BTreeMap::new(),
            })),
        }
    }

    /// Returns a handle components use to register callbacks.
    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            state: self.state.clone(),
        }
    }

    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    pub fn viewport(&self) -> Viewport {
        self.state.borrow().viewport
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.state.borrow().frames.len()
    }

    pub fn resize_listeners(&self) -> usize {
        self.state.borrow().resize_listeners.len()
    }

    /// Moves the clock forward by `delta`, firing every timer that falls due
    /// on the way in due order. Timers registered by a firing timer are
    /// honoured if they also fall inside the window.
    pub fn advance(&self, delta: Duration) {
        let deadline = self.now() + delta;
        loop {
            let (now, callback) = {
                let mut state = self.state.borrow_mut();
                let Some((id, due)) = state.next_due_timer(deadline) else {
                    break;
                };
                state.now = state.now.max(due);
                (state.now, state.timers.remove(&id).map(|timer| timer.callback))
            };
            if let Some(callback) = callback {
                callback(now);
            }
        }
        self.state.borrow_mut().now = deadline;
    }

    /// Runs one animation frame. Only callbacks requested before the tick
    /// started are run; requests made while it runs wait for the next tick.
    /// Returns the number of callbacks invoked.
    pub fn tick_frame(&self) -> usize {
        let (now, ids) = {
            let state = self.state.borrow();
            (state.now, state.frames.keys().copied().collect::<Vec<_>>())
        };

        let mut count = 0;
        for id in ids {
            // Earlier callbacks in this tick may have cancelled later ones.
            let callback = self.state.borrow_mut().frames.remove(&id);
            if let Some(callback) = callback {
                callback(now);
                count += 1;
            }
        }
        tracing::trace!(count, "frame tick");
        count
    }

    /// Updates the viewport and notifies every registered resize listener.
    pub fn resize(&self, viewport: Viewport) {
        let listeners: Vec<(u64, ResizeCallback)> = {
            let mut state = self.state.borrow_mut();
            state.viewport = viewport;
            state
                .resize_listeners
                .iter()
                .map(|(id, listener)| (*id, listener.clone()))
                .collect()
        };
        tracing::debug!(?viewport, listeners = listeners.len(), "viewport resized");

        for (id, listener) in listeners {
            // A previous listener may have removed this one.
            if !self.state.borrow().resize_listeners.contains_key(&id) {
                continue;
            }
            (listener.borrow_mut())(viewport);
        }
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventLoop")
            .field("now", &state.now)
            .field("viewport", &state.viewport)
            .field("timers", &state.timers.len())
            .field("frames", &state.frames.len())
            .field("resize_listeners", &state.resize_listeners.len())
            .finish()
    }
}

/// Cloneable registration interface over an [`EventLoop`].
#[derive(Clone)]
pub struct LoopHandle {
    state: Rc<RefCell<LoopState>>,
}

impl LoopHandle {
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    pub fn viewport(&self) -> Viewport {
        self.state.borrow().viewport
    }

    /// Runs `callback` once, `delay` after now, passing the clock value it
    /// fired at.
    pub fn set_timeout(
        &self,
        delay: Duration,
        callback: impl FnOnce(Duration) + 'static,
    ) -> Registration {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        let due = state.now + delay;
        state.timers.insert(
            id,
            PendingTimer {
                due,
                callback: Box::new(callback),
            },
        );
        self.registration(Slot::Timer(id))
    }

    /// Runs `callback` on the next frame tick with the current clock value.
    pub fn request_frame(&self, callback: impl FnOnce(Duration) + 'static) -> Registration {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.frames.insert(id, Box::new(callback));
        self.registration(Slot::Frame(id))
    }

    /// Runs `callback` on every viewport change until the registration ends.
    pub fn on_resize(&self, callback: impl FnMut(Viewport) + 'static) -> Registration {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        let listener: ResizeCallback = Rc::new(RefCell::new(callback));
        state.resize_listeners.insert(id, listener);
        self.registration(Slot::Resize(id))
    }

    /// A handle that does not keep the loop alive, for callbacks stored
    /// inside the loop itself.
    pub fn downgrade(&self) -> WeakLoopHandle {
        WeakLoopHandle {
            state: Rc::downgrade(&self.state),
        }
    }

    fn registration(&self, slot: Slot) -> Registration {
        Registration {
            slot,
            state: Rc::downgrade(&self.state),
        }
    }
}

impl fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopHandle").finish()
    }
}

/// Non-owning counterpart of [`LoopHandle`].
#[derive(Clone)]
pub struct WeakLoopHandle {
    state: Weak<RefCell<LoopState>>,
}

impl WeakLoopHandle {
    pub fn upgrade(&self) -> Option<LoopHandle> {
        self.state.upgrade().map(|state| LoopHandle { state })
    }
}

/// Scoped ownership of a registered callback. Dropping it cancels the
/// callback if it has not run yet (or removes the listener).
#[must_use = "dropping a registration cancels it"]
pub struct Registration {
    slot: Slot,
    state: Weak<RefCell<LoopState>>,
}

impl Registration {
    /// Cancels explicitly. Returns whether anything was still pending.
    pub fn cancel(self) -> bool {
        self.release()
    }

    /// Whether the callback is still registered with a live loop.
    pub fn is_pending(&self) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        let state = state.borrow();
        match self.slot {
            Slot::Timer(id) => state.timers.contains_key(&id),
            Slot::Frame(id) => state.frames.contains_key(&id),
            Slot::Resize(id) => state.resize_listeners.contains_key(&id),
        }
    }

    fn release(&self) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        // Dropping the released callback may drop further registrations, so
        // the borrow must end before the callback is freed.
        let released = state.try_borrow_mut().map(|mut state| state.release(self.slot));
        match released {
            Ok(released) => released.is_some(),
            Err(_) => {
                tracing::warn!(slot = ?self.slot, "event loop busy, registration not released");
                false
            }
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("slot", &self.slot)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn event_loop() -> EventLoop {
        EventLoop::new(Viewport::new(800, 600))
    }

    #[test]
    fn fires_timers_in_due_order() {
        let event_loop = event_loop();
        let handle = event_loop.handle();
        let log = Rc::new(RefCell::new(Vec::new()));

        let late = {
            let log = log.clone();
            handle.set_timeout(Duration::from_millis(300), move |_| log.borrow_mut().push("late"))
        };
        let early = {
            let log = log.clone();
            handle.set_timeout(Duration::from_millis(100), move |_| log.borrow_mut().push("early"))
        };

        event_loop.advance(Duration::from_millis(200));
        assert_eq!(*log.borrow(), vec!["early"]);
        assert!(!early.is_pending());
        assert!(late.is_pending());

        event_loop.advance(Duration::from_millis(100));
        assert_eq!(*log.borrow(), vec!["early", "late"]);
        assert_eq!(event_loop.now(), Duration::from_millis(300));
    }

    #[test]
    fn dropping_a_registration_cancels_the_timer() {
        let event_loop = event_loop();
        let fired = Rc::new(Cell::new(false));

        let registration = {
            let fired = fired.clone();
            event_loop
                .handle()
                .set_timeout(Duration::from_millis(10), move |_| fired.set(true))
        };
        drop(registration);

        event_loop.advance(Duration::from_secs(1));
        assert!(!fired.get());
        assert_eq!(event_loop.pending_timers(), 0);
    }

    #[test]
    fn frames_requested_during_a_tick_wait_for_the_next() {
        let event_loop = event_loop();
        let handle = event_loop.handle();
        let count = Rc::new(Cell::new(0));
        let follow_up: Rc<RefCell<Option<Registration>>> = Rc::new(RefCell::new(None));

        let _first = {
            let count = count.clone();
            let handle = handle.clone();
            let follow_up = follow_up.clone();
            handle.clone().request_frame(move |_| {
                count.set(count.get() + 1);
                let count = count.clone();
                let next = handle.request_frame(move |_| count.set(count.get() + 1));
                *follow_up.borrow_mut() = Some(next);
            })
        };

        assert_eq!(event_loop.tick_frame(), 1);
        assert_eq!(count.get(), 1);
        assert_eq!(event_loop.pending_frames(), 1);

        assert_eq!(event_loop.tick_frame(), 1);
        assert_eq!(count.get(), 2);
        assert_eq!(event_loop.tick_frame(), 0);
    }

    #[test]
    fn resize_listeners_run_until_released() {
        let event_loop = event_loop();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let listener = {
            let seen = seen.clone();
            event_loop
                .handle()
                .on_resize(move |viewport| seen.borrow_mut().push(viewport))
        };

        event_loop.resize(Viewport::new(1600, 900));
        assert_eq!(event_loop.resize_listeners(), 1);
        assert!(listener.cancel());
        assert_eq!(event_loop.resize_listeners(), 0);

        event_loop.resize(Viewport::new(320, 240));
        assert_eq!(*seen.borrow(), vec![Viewport::new(1600, 900)]);
        assert_eq!(event_loop.viewport(), Viewport::new(320, 240));
    }

    #[test]
    fn registrations_outliving_the_loop_are_inert() {
        let event_loop = event_loop();
        let registration = event_loop.handle().set_timeout(Duration::ZERO, |_| {});
        drop(event_loop);
        assert!(!registration.is_pending());
        assert!(!registration.cancel());
    }
}
