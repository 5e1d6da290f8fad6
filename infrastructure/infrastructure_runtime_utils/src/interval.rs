//! Interval Counter Module
//!
//! Provides the monotonic 64-bit counter that stamps global logical time
//! (GC epochs, timer intervals) across scheduler threads.
//! Based on the erts_interval_t operations in erl_utils.h
//!
//! The counter only ever moves forward. It is lock free: `step` is a single
//! atomic increment, and `ensure_later` is a compare-and-swap loop that
//! writes only when the counter has not already passed the target.
//!
//! Every operation takes the ordering it needs:
//!
//! | Barrier | Use |
//! |---|---|
//! | `Nob` | unique, increasing stamps with no ordering of other memory |
//! | `Relb` | a thread that later reads this value also sees our earlier writes |
//! | `Acqb` | we see the writes of whoever advanced the counter to the value we read |
//!
//! The counter is an ordinary value: create one, share it with `Arc`, and
//! pass it to whoever needs it.
//!
//! ```rust
//! use infrastructure_runtime_utils::IntervalCounter;
//!
//! let counter: IntervalCounter = IntervalCounter::new();
//! assert_eq!(counter.step_nob(), 1);
//! assert_eq!(counter.ensure_later_acqb(10), 11);
//! assert_eq!(counter.ensure_later_nob(5), 11);
//! assert_eq!(counter.current_acqb(), 11);
//! ```

use std::sync::atomic::Ordering;

use entities_data_handling::atomics::{DefaultWordAtomic, WordAtomic};

/// Barrier for operations that advance the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepBarrier {
    /// No barrier
    Nob,
    /// Release barrier
    Relb,
}

impl StepBarrier {
    fn ordering(self) -> Ordering {
        match self {
            StepBarrier::Nob => Ordering::Relaxed,
            StepBarrier::Relb => Ordering::Release,
        }
    }
}

/// Barrier for operations that read the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadBarrier {
    /// No barrier
    Nob,
    /// Acquire barrier
    Acqb,
}

impl ReadBarrier {
    fn ordering(self) -> Ordering {
        match self {
            ReadBarrier::Nob => Ordering::Relaxed,
            ReadBarrier::Acqb => Ordering::Acquire,
        }
    }
}

/// Lock-free monotonic 64-bit counter
pub struct IntervalCounter<A: WordAtomic = DefaultWordAtomic> {
    counter: A,
}

impl<A: WordAtomic> IntervalCounter<A> {
    /// Create a counter at 0
    pub fn new() -> Self {
        Self::with_base(0)
    }

    /// Create a counter starting at `base`
    pub fn with_base(base: u64) -> Self {
        Self {
            counter: A::new(base),
        }
    }

    /// Reset the counter to 0.
    ///
    /// Taking `&mut self` means nothing else can be reading or stepping it.
    pub fn init(&mut self) {
        self.counter = A::new(0);
    }

    /// Increment by one and return the new value
    #[inline]
    pub fn step(&self, barrier: StepBarrier) -> u64 {
        let value = self.counter.fetch_increment(barrier.ordering());
        debug_assert_ne!(value, 0, "interval counter wrapped");
        value
    }

    /// [`step`](Self::step) with no barrier
    #[inline]
    pub fn step_nob(&self) -> u64 {
        self.step(StepBarrier::Nob)
    }

    /// [`step`](Self::step) with a release barrier
    #[inline]
    pub fn step_relb(&self) -> u64 {
        self.step(StepBarrier::Relb)
    }

    /// Make sure the counter is later than `target`.
    ///
    /// Returns the counter value afterwards: the value read if it was
    /// already past `target`, otherwise `target + 1`.
    pub fn ensure_later(&self, target: u64, barrier: ReadBarrier) -> u64 {
        debug_assert_ne!(target, u64::MAX, "interval counter would wrap");
        let order = barrier.ordering();
        let later = target + 1;
        let mut current = self.counter.load(order);
        loop {
            if current > target {
                return current;
            }
            match self.counter.compare_exchange_weak(current, later, order, order) {
                Ok(_) => return later,
                Err(observed) => current = observed,
            }
        }
    }

    /// [`ensure_later`](Self::ensure_later) with no barrier
    #[inline]
    pub fn ensure_later_nob(&self, target: u64) -> u64 {
        self.ensure_later(target, ReadBarrier::Nob)
    }

    /// [`ensure_later`](Self::ensure_later) with an acquire barrier
    #[inline]
    pub fn ensure_later_acqb(&self, target: u64) -> u64 {
        self.ensure_later(target, ReadBarrier::Acqb)
    }

    /// Read the counter
    #[inline]
    pub fn current(&self, barrier: ReadBarrier) -> u64 {
        self.counter.load(barrier.ordering())
    }

    /// [`current`](Self::current) with no barrier
    #[inline]
    pub fn current_nob(&self) -> u64 {
        self.current(ReadBarrier::Nob)
    }

    /// [`current`](Self::current) with an acquire barrier
    #[inline]
    pub fn current_acqb(&self) -> u64 {
        self.current(ReadBarrier::Acqb)
    }
}

impl<A: WordAtomic> Default for IntervalCounter<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: WordAtomic> std::fmt::Debug for IntervalCounter<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalCounter")
            .field("current", &self.current_nob())
            .finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use entities_data_handling::atomics::{DoubleWordAtomic, NativeWordAtomic};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    fn concurrent_steps<A: WordAtomic + 'static>() {
        let counter: Arc<IntervalCounter<A>> = Arc::new(IntervalCounter::new());
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..100_000 {
                        let value = counter.step_nob();
                        assert!(value > last);
                        last = value;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.current_nob(), 200_000);
    }

    #[test]
    fn test_concurrent_steps_native() {
        concurrent_steps::<NativeWordAtomic>();
    }

    #[test]
    fn test_concurrent_steps_double_word() {
        concurrent_steps::<DoubleWordAtomic>();
    }

    /// Readers never see the counter go back while others step and ensure_later
    fn monotonic_reads<A: WordAtomic + 'static>() {
        let counter: Arc<IntervalCounter<A>> = Arc::new(IntervalCounter::new());
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..2)
            .map(|reader| {
                let counter = Arc::clone(&counter);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut last = 0;
                    let mut reads = 0u64;
                    while !done.load(Ordering::Acquire) || reads == 0 {
                        let value = if reader == 0 {
                            counter.current_nob()
                        } else {
                            counter.current_acqb()
                        };
                        assert!(value >= last, "read {value} after {last}");
                        last = value;
                        reads += 1;
                    }
                    last
                })
            })
            .collect();

        let stepper = {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..50_000 {
                    counter.step_relb();
                }
            })
        };
        let ensurer = {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                // Jumps across the low word boundary of the double-word backend
                for target in (0..8u64).map(|i| (i << 31) + 5) {
                    let value = counter.ensure_later_acqb(target);
                    assert!(value > target);
                    counter.ensure_later_nob(target / 2);
                }
            })
        };

        stepper.join().unwrap();
        ensurer.join().unwrap();
        done.store(true, Ordering::Release);
        let end = counter.current_acqb();
        for reader in readers {
            assert!(reader.join().unwrap() <= end);
        }
        assert!(end > 7 << 31);
    }

    #[test]
    fn test_monotonic_reads_native() {
        monotonic_reads::<NativeWordAtomic>();
    }

    #[test]
    fn test_monotonic_reads_double_word() {
        monotonic_reads::<DoubleWordAtomic>();
    }

    #[test]
    fn test_step_returns_new_value() {
        let counter: IntervalCounter = IntervalCounter::with_base(41);
        assert_eq!(counter.step_relb(), 42);
        assert_eq!(counter.step(StepBarrier::Nob), 43);
        assert_eq!(counter.current(ReadBarrier::Acqb), 43);
    }

    #[test]
    fn test_ensure_later() {
        let counter: IntervalCounter = IntervalCounter::new();
        counter.step_nob();
        let original = counter.current_acqb();

        let value = counter.ensure_later_acqb(original + 5);
        assert_eq!(value, original + 6);
        assert!(counter.current_acqb() > original + 5);

        // Already later: nothing is written.
        assert_eq!(counter.ensure_later_nob(original), original + 6);
        assert_eq!(counter.current_nob(), original + 6);
    }

    #[test]
    fn test_ensure_later_double_word_carry() {
        let counter: IntervalCounter<DoubleWordAtomic> = IntervalCounter::new();
        let target = u64::from(u32::MAX);
        assert_eq!(counter.ensure_later_nob(target), 1 << 32);
        assert_eq!(counter.step_nob(), (1 << 32) + 1);
    }

    #[test]
    fn test_init_resets() {
        let mut counter: IntervalCounter = IntervalCounter::with_base(100);
        counter.step_nob();
        counter.init();
        assert_eq!(counter.current_nob(), 0);
        assert_eq!(format!("{counter:?}"), "IntervalCounter { current: 0 }");
    }

    #[test]
    fn test_ensure_later_with_concurrent_steppers() {
        let counter: Arc<IntervalCounter> = Arc::new(IntervalCounter::new());
        let stepper = {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..50_000 {
                    counter.step_relb();
                }
            })
        };
        let mut targets_met = 0;
        for target in (0..50_000).step_by(1_000) {
            let value = counter.ensure_later_acqb(target);
            assert!(value > target);
            assert!(counter.current_acqb() > target);
            targets_met += 1;
        }
        stepper.join().unwrap();
        assert_eq!(targets_met, 50);
        assert!(counter.current_nob() >= 50_000);
    }
}
