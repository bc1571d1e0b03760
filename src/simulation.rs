/// Simulation execution loop.
///
/// Drives the scheduler: pops events, advances the virtual clock,
/// dispatches to a user-supplied handler. Purely synchronous and
/// single-threaded; two simulations never share state, so independent
/// instances may run on separate threads without coordination.

use crate::error::{SimError, SimResult};
use crate::event::{Event, EventId, EventKind};
use crate::scheduler::Scheduler;
use crate::time::VirtualTime;

// ── Handler trait ─────────────────────────────────────────────────────

/// User-defined event handler.
///
/// The handler receives a mutable [`SimulationContext`] so it can
/// schedule (or cancel) follow-up events. `Topology` is the main
/// implementor; closures work for tests and one-off scripts.
pub trait EventHandler {
    /// Called for every dispatched event.
    fn handle(&mut self, ctx: &mut SimulationContext, event: &Event);
}

impl<F> EventHandler for F
where
    F: FnMut(&mut SimulationContext, &Event),
{
    fn handle(&mut self, ctx: &mut SimulationContext, event: &Event) {
        (self)(ctx, event);
    }
}

// ── Simulation context ────────────────────────────────────────────────

/// Mutable context passed to the handler on every dispatch.
///
/// Borrows the scheduler, so handlers can only influence ordering
/// through the schedule/cancel API.
pub struct SimulationContext<'a> {
    pub(crate) scheduler: &'a mut Scheduler,
    pub(crate) now: VirtualTime,
}

impl SimulationContext<'_> {
    /// Current virtual time.
    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Schedule an event at an absolute virtual time.
    ///
    /// Fails with `InvalidDelay` if `at` is before the current time.
    pub fn schedule_at(&mut self, at: VirtualTime, kind: EventKind) -> SimResult<EventId> {
        if at < self.now {
            return Err(SimError::InvalidDelay {
                requested: at,
                current: self.now,
            });
        }
        Ok(self.scheduler.schedule(at, kind))
    }

    /// Schedule an event `delay` ticks after now.
    ///
    /// # Panics
    /// Panics on clock overflow (astronomically unlikely).
    pub fn schedule_after(&mut self, delay: u64, kind: EventKind) -> EventId {
        let at = self
            .now
            .plus(delay)
            .expect("VirtualTime overflow when scheduling");
        self.scheduler.schedule(at, kind)
    }

    /// Withdraw a pending event. Fails with `AlreadyFired` once the
    /// event has been dispatched or cancelled.
    pub fn cancel(&mut self, id: EventId) -> SimResult<()> {
        self.scheduler.cancel(id)
    }

    /// Number of live pending events.
    pub fn pending_count(&self) -> usize {
        self.scheduler.len()
    }
}

// ── Simulation ────────────────────────────────────────────────────────

/// Top-level simulation driver.
///
/// Owns the scheduler and the clock. `run` drains the queue (honoring
/// the stop time if one is set); `step` advances by exactly one event.
/// Lifecycle is explicit: construct, seed events, run, drop — there is
/// no ambient global scheduler.
#[derive(Debug, Default)]
pub struct Simulation {
    scheduler: Scheduler,
    current_time: VirtualTime,
    events_processed: u64,
    stop_time: Option<VirtualTime>,
}

impl Simulation {
    /// Create a new simulation starting at time zero.
    pub fn new() -> Self {
        Simulation {
            scheduler: Scheduler::new(),
            current_time: VirtualTime::ZERO,
            events_processed: 0,
            stop_time: None,
        }
    }

    /// Current virtual time.
    pub fn current_time(&self) -> VirtualTime {
        self.current_time
    }

    /// Total events processed so far.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Events scheduled strictly after `at` are never dispatched.
    pub fn set_stop_time(&mut self, at: VirtualTime) {
        self.stop_time = Some(at);
    }

    /// Schedule an event from outside a handler.
    ///
    /// Fails with `InvalidDelay` if `at` is before the current time,
    /// so seeding events between runs can never rewind the clock.
    pub fn schedule(&mut self, at: VirtualTime, kind: EventKind) -> SimResult<EventId> {
        if at < self.current_time {
            return Err(SimError::InvalidDelay {
                requested: at,
                current: self.current_time,
            });
        }
        Ok(self.scheduler.schedule(at, kind))
    }

    /// Withdraw a pending event by handle.
    pub fn cancel(&mut self, id: EventId) -> SimResult<()> {
        self.scheduler.cancel(id)
    }

    /// Execute one step: pop the earliest event, advance the clock,
    /// dispatch. Returns `None` when the queue is drained or the next
    /// event lies beyond the stop time.
    pub fn step(&mut self, handler: &mut dyn EventHandler) -> Option<Event> {
        if let Some(stop) = self.stop_time {
            if self.scheduler.peek_next()?.scheduled_at > stop {
                return None;
            }
        }
        let event = self.scheduler.pop_next()?;

        // The heap guarantees this; a violation means kernel corruption.
        debug_assert!(event.scheduled_at >= self.current_time);
        self.current_time = event.scheduled_at;
        self.events_processed += 1;

        let mut ctx = SimulationContext {
            scheduler: &mut self.scheduler,
            now: self.current_time,
        };
        handler.handle(&mut ctx, &event);

        Some(event)
    }

    /// Run until the queue is empty or the stop time is reached.
    /// Returns the number of events processed during this call.
    pub fn run(&mut self, handler: &mut dyn EventHandler) -> u64 {
        let start = self.events_processed;
        while self.step(handler).is_some() {}
        self.events_processed - start
    }

    /// Run at most `max_steps` events.
    pub fn run_for(&mut self, max_steps: u64, handler: &mut dyn EventHandler) -> u64 {
        let start = self.events_processed;
        for _ in 0..max_steps {
            if self.step(handler).is_none() {
                break;
            }
        }
        self.events_processed - start
    }

    /// `true` when no live events remain.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_execution_loop() {
        let mut sim = Simulation::new();

        sim.schedule(VirtualTime::new(10), EventKind::Log("a".into())).unwrap();
        sim.schedule(VirtualTime::new(20), EventKind::Log("b".into())).unwrap();
        sim.schedule(VirtualTime::new(30), EventKind::Log("c".into())).unwrap();

        let mut log: Vec<String> = Vec::new();
        let processed = sim.run(&mut |_ctx: &mut SimulationContext, event: &Event| {
            if let EventKind::Log(msg) = &event.kind {
                log.push(msg.clone());
            }
        });

        assert_eq!(processed, 3);
        assert_eq!(log, vec!["a", "b", "c"]);
        assert_eq!(sim.current_time(), VirtualTime::new(30));
    }

    #[test]
    fn test_handler_schedules_followup() {
        let mut sim = Simulation::new();
        sim.schedule(VirtualTime::ZERO, EventKind::Noop).unwrap();

        let mut times: Vec<u64> = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext, _event: &Event| {
            times.push(ctx.now().ticks());
            if ctx.now().ticks() < 30 {
                ctx.schedule_after(10, EventKind::Noop);
            }
        });

        assert_eq!(times, vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_schedule_at_in_past_fails() {
        let mut sim = Simulation::new();
        sim.schedule(VirtualTime::new(10), EventKind::Noop).unwrap();

        let mut result = None;
        sim.run(&mut |ctx: &mut SimulationContext, _event: &Event| {
            result = Some(ctx.schedule_at(VirtualTime::new(3), EventKind::Noop));
        });

        assert_eq!(
            result.unwrap(),
            Err(SimError::InvalidDelay {
                requested: VirtualTime::new(3),
                current: VirtualTime::new(10),
            })
        );
    }

    #[test]
    fn test_schedule_before_clock_fails() {
        let mut sim = Simulation::new();
        sim.schedule(VirtualTime::new(30), EventKind::Noop).unwrap();

        let mut noop = |_ctx: &mut SimulationContext, _event: &Event| {};
        sim.run(&mut noop);

        // Seeding behind the clock between runs must not rewind it.
        assert_eq!(
            sim.schedule(VirtualTime::new(10), EventKind::Noop),
            Err(SimError::InvalidDelay {
                requested: VirtualTime::new(10),
                current: VirtualTime::new(30),
            })
        );
        // At or past the clock is still fine.
        sim.schedule(VirtualTime::new(30), EventKind::Noop).unwrap();
        sim.run(&mut noop);
        assert_eq!(sim.current_time(), VirtualTime::new(30));
    }

    #[test]
    fn test_stop_time_halts_run() {
        let mut sim = Simulation::new();
        for i in 1..=5 {
            sim.schedule(VirtualTime::new(i * 10), EventKind::Noop).unwrap();
        }
        sim.set_stop_time(VirtualTime::new(30));

        let mut noop = |_ctx: &mut SimulationContext, _event: &Event| {};
        let processed = sim.run(&mut noop);

        // Events at 10, 20, 30 run; 40 and 50 never do.
        assert_eq!(processed, 3);
        assert_eq!(sim.current_time(), VirtualTime::new(30));
        assert!(!sim.is_finished());
    }

    #[test]
    fn test_cancel_via_context() {
        let mut sim = Simulation::new();
        sim.schedule(VirtualTime::new(0), EventKind::Log("trigger".into())).unwrap();

        let mut fired: Vec<String> = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext, event: &Event| {
            match &event.kind {
                EventKind::Log(msg) if msg == "trigger" => {
                    let doomed = ctx.schedule_after(5, EventKind::Log("doomed".into()));
                    ctx.schedule_after(10, EventKind::Log("survivor".into()));
                    ctx.cancel(doomed).unwrap();
                }
                EventKind::Log(msg) => fired.push(msg.clone()),
                _ => {}
            }
        });

        assert_eq!(fired, vec!["survivor"]);
    }

    #[test]
    fn test_cancel_pre_run() {
        let mut sim = Simulation::new();
        let id = sim.schedule(VirtualTime::new(5), EventKind::Noop).unwrap();
        sim.cancel(id).unwrap();

        let mut noop = |_ctx: &mut SimulationContext, _event: &Event| {};
        assert_eq!(sim.run(&mut noop), 0);
        assert_eq!(sim.cancel(id), Err(SimError::AlreadyFired(id)));
    }

    #[test]
    fn test_run_for_limits_steps() {
        let mut sim = Simulation::new();
        for i in 0..100 {
            sim.schedule(VirtualTime::new(i), EventKind::Noop).unwrap();
        }

        let mut noop = |_ctx: &mut SimulationContext, _event: &Event| {};
        assert_eq!(sim.run_for(10, &mut noop), 10);
        assert!(!sim.is_finished());
    }

    #[test]
    fn test_time_monotonicity() {
        let mut sim = Simulation::new();
        sim.schedule(VirtualTime::new(100), EventKind::Noop).unwrap();
        sim.schedule(VirtualTime::new(50), EventKind::Noop).unwrap();
        sim.schedule(VirtualTime::new(75), EventKind::Noop).unwrap();
        sim.schedule(VirtualTime::new(10), EventKind::Noop).unwrap();

        let mut times: Vec<u64> = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext, _event: &Event| {
            times.push(ctx.now().ticks());
        });

        assert_eq!(times, vec![10, 50, 75, 100]);
    }

    #[test]
    fn test_deterministic_replay() {
        fn run_trace() -> Vec<(u64, u64, String)> {
            let mut sim = Simulation::new();
            sim.schedule(VirtualTime::new(5), EventKind::Log("alpha".into())).unwrap();
            sim.schedule(VirtualTime::new(5), EventKind::Log("beta".into())).unwrap();
            sim.schedule(VirtualTime::new(3), EventKind::Log("gamma".into())).unwrap();

            let mut trace = Vec::new();
            sim.run(&mut |ctx: &mut SimulationContext, event: &Event| {
                if let EventKind::Log(msg) = &event.kind {
                    trace.push((event.id.raw(), ctx.now().ticks(), msg.clone()));
                }
            });
            trace
        }

        assert_eq!(run_trace(), run_trace());
    }

    #[test]
    fn test_empty_simulation() {
        let mut sim = Simulation::new();
        let mut noop = |_ctx: &mut SimulationContext, _event: &Event| {};
        assert_eq!(sim.run(&mut noop), 0);
        assert!(sim.is_finished());
    }
}
