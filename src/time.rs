/// Virtual time for the deterministic simulation.
///
/// A `VirtualTime` is a count of simulated nanoseconds since the start
/// of the run. It has no relationship to `std::time` — the clock only
/// advances when the scheduler dispatches an event.

/// A point in simulated time, in nanosecond ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// The start of simulation time.
    pub const ZERO: VirtualTime = VirtualTime(0);

    /// Create a `VirtualTime` from raw nanosecond ticks.
    #[inline]
    pub const fn new(ticks: u64) -> Self {
        VirtualTime(ticks)
    }

    /// `millis` milliseconds after time zero. Convenient in tests.
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        VirtualTime(millis * 1_000_000)
    }

    /// `micros` microseconds after time zero.
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        VirtualTime(micros * 1_000)
    }

    /// Raw tick value.
    #[inline]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// The time `delta` ticks after `self`. `None` on overflow.
    #[inline]
    pub fn advance(self, delta: u64) -> Option<VirtualTime> {
        self.0.checked_add(delta).map(VirtualTime)
    }

    /// Alias for [`advance`](Self::advance); reads better at call sites
    /// that schedule future events.
    #[inline]
    pub fn plus(self, delay: u64) -> Option<VirtualTime> {
        self.advance(delay)
    }

    /// Ticks elapsed since `earlier`, or `None` if `earlier` is later.
    #[inline]
    pub fn duration_since(self, earlier: VirtualTime) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}ns", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(VirtualTime::ZERO.ticks(), 0);
        assert_eq!(VirtualTime::default(), VirtualTime::ZERO);
    }

    #[test]
    fn test_ordering() {
        assert!(VirtualTime::new(10) < VirtualTime::new(20));
        assert_eq!(VirtualTime::new(7), VirtualTime::new(7));
    }

    #[test]
    fn test_unit_constructors() {
        assert_eq!(VirtualTime::from_millis(2).ticks(), 2_000_000);
        assert_eq!(VirtualTime::from_micros(3).ticks(), 3_000);
    }

    #[test]
    fn test_advance() {
        let t = VirtualTime::new(100).advance(50).unwrap();
        assert_eq!(t.ticks(), 150);
    }

    #[test]
    fn test_advance_overflow() {
        assert!(VirtualTime::new(u64::MAX).advance(1).is_none());
    }

    #[test]
    fn test_duration_since() {
        let t1 = VirtualTime::new(10);
        let t2 = VirtualTime::new(30);
        assert_eq!(t2.duration_since(t1), Some(20));
        assert_eq!(t1.duration_since(t2), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", VirtualTime::new(42)), "T=42ns");
    }
}
