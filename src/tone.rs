//! Tone value and the bounded tone queue.

use parking_lot::{Condvar, Mutex};

use crate::limits::{FOREVER_DURATION_US, FREQ_MAX, FREQ_MIN};

/// How the envelope is applied to a tone's leading/trailing samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeMode {
    /// No envelope; full amplitude for the whole tone.
    None,
    /// Apply the rising edge only.
    Rising,
    /// Apply the falling edge only.
    Falling,
    /// Apply both rising and falling edges.
    Standard,
}

/// Result of an enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Ok,
    Full,
    Invalid,
}

/// Result of a dequeue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DequeueOutcome {
    Dequeued,
    Empty,
}

/// One immutable description of a tone: a frequency held for a duration,
/// with an envelope and first/forever flags.
///
/// `duration_us == 0` tones are dropped silently on enqueue.
/// `duration_us == FOREVER_DURATION_US` combined with `is_forever == true`
/// marks a tone the consumer must keep redelivering until a successor
/// arrives (used by the straight key to hold carrier or silence).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: u16,
    pub duration_us: i32,
    pub slope_mode: SlopeMode,
    pub is_first: bool,
    pub is_forever: bool,
}

impl Tone {
    /// Build an audible or silent tone of finite duration.
    pub fn new(frequency_hz: u16, duration_us: i32, slope_mode: SlopeMode) -> Self {
        Tone {
            frequency_hz,
            duration_us,
            slope_mode,
            is_first: false,
            is_forever: false,
        }
    }

    /// Build a "forever" tone: held by the consumer until a successor is
    /// enqueued. Used by the straight key.
    pub fn forever(frequency_hz: u16) -> Self {
        Tone {
            frequency_hz,
            duration_us: FOREVER_DURATION_US,
            slope_mode: SlopeMode::None,
            is_first: false,
            is_forever: true,
        }
    }

    pub fn with_first(mut self, is_first: bool) -> Self {
        self.is_first = is_first;
        self
    }

    fn is_valid(&self) -> bool {
        self.frequency_hz <= FREQ_MAX && self.frequency_hz >= FREQ_MIN && self.duration_us >= 0
            || (self.is_forever && self.duration_us == FOREVER_DURATION_US)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueState {
    Idle,
    Busy,
}

struct QueueInner {
    buf: Vec<Tone>,
    head: usize,
    tail: usize,
    len: usize,
    capacity: usize,
    state: QueueState,
    high_water_mark: usize,
    low_water_mark: usize,
}

impl QueueInner {
    fn new(capacity: usize) -> Self {
        QueueInner {
            buf: vec![Tone::new(0, 0, SlopeMode::None); capacity],
            head: 0,
            tail: 0,
            len: 0,
            capacity,
            state: QueueState::Idle,
            high_water_mark: capacity,
            low_water_mark: 0,
        }
    }
}

/// Bounded circular buffer of [`Tone`] coordinating one producer and one
/// consumer. Reached only through a [`crate::generator::Generator`];
/// never exposed as a standalone public abstraction.
pub(crate) struct ToneQueue {
    inner: Mutex<QueueInner>,
    /// Signaled whenever `len` changes; `wait_for_level` callers wait on this.
    level_changed: Condvar,
    /// Signaled when the queue becomes non-empty; the consumer waits on this.
    non_empty: Condvar,
    low_water_callback: Mutex<Option<Box<dyn Fn(usize) + Send + 'static>>>,
}

impl ToneQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        ToneQueue {
            inner: Mutex::new(QueueInner::new(capacity)),
            level_changed: Condvar::new(),
            non_empty: Condvar::new(),
            low_water_callback: Mutex::new(None),
        }
    }

    pub(crate) fn set_low_water_mark(&self, level: usize) {
        self.inner.lock().low_water_mark = level;
    }

    pub(crate) fn set_high_water_mark(&self, level: usize) {
        self.inner.lock().high_water_mark = level;
    }

    pub(crate) fn set_low_water_callback<F>(&self, callback: F)
    where
        F: Fn(usize) + Send + 'static,
    {
        *self.low_water_callback.lock() = Some(Box::new(callback));
    }

    pub(crate) fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueue a tone. Rejects out-of-range frequency/duration; silently
    /// accepts (and drops) `duration_us == 0` tones.
    pub(crate) fn enqueue(&self, tone: Tone) -> EnqueueOutcome {
        if tone.duration_us == 0 {
            return EnqueueOutcome::Ok;
        }
        if !tone.is_valid() {
            return EnqueueOutcome::Invalid;
        }

        let mut became_busy = false;
        {
            let mut inner = self.inner.lock();
            if inner.len >= inner.capacity {
                return EnqueueOutcome::Full;
            }
            let was_empty = inner.len == 0;
            let tail = inner.tail;
            inner.buf[tail] = tone;
            inner.tail = (inner.tail + 1) % inner.capacity;
            inner.len += 1;
            if was_empty {
                inner.state = QueueState::Busy;
                became_busy = true;
            }
        }
        self.level_changed.notify_all();
        if became_busy {
            self.non_empty.notify_one();
        }
        EnqueueOutcome::Ok
    }

    /// Dequeue one tone into `out`. A "forever" tone anchored at `len == 1`
    /// is returned every call without advancing `head`.
    pub(crate) fn dequeue(&self, out: &mut Tone) -> DequeueOutcome {
        let mut fire_low_water: Option<usize> = None;
        let outcome;
        {
            let mut inner = self.inner.lock();
            if inner.len == 0 {
                inner.state = QueueState::Idle;
                return DequeueOutcome::Empty;
            }
            let head = inner.head;
            *out = inner.buf[head];
            let keep_forever = out.is_forever && inner.len == 1;
            if !keep_forever {
                let len_before = inner.len;
                inner.head = (inner.head + 1) % inner.capacity;
                inner.len -= 1;
                let len_after = inner.len;
                if len_after == 0 {
                    inner.state = QueueState::Idle;
                }
                if len_before > inner.low_water_mark && inner.low_water_mark >= len_after {
                    fire_low_water = Some(len_after);
                }
            }
            outcome = DequeueOutcome::Dequeued;
        }
        self.level_changed.notify_all();
        if let Some(level) = fire_low_water {
            if let Some(cb) = self.low_water_callback.lock().as_ref() {
                cb(level);
            }
        }
        outcome
    }

    /// Block until `len <= level` is observed under the mutex.
    pub(crate) fn wait_for_level(&self, level: usize) {
        let mut inner = self.inner.lock();
        while inner.len > level {
            self.level_changed.wait(&mut inner);
        }
    }

    /// Block the consumer until the queue is non-empty.
    pub(crate) fn wait_while_empty(&self) {
        let mut inner = self.inner.lock();
        while inner.len == 0 {
            self.non_empty.wait(&mut inner);
        }
    }

    /// Atomically clear the queue.
    pub(crate) fn flush(&self) {
        {
            let mut inner = self.inner.lock();
            inner.len = 0;
            inner.head = inner.tail;
            inner.state = QueueState::Idle;
        }
        self.level_changed.notify_all();
    }

    /// Truncate the queue to just before the most recently enqueued tone
    /// with `is_first == true`. No effect if no such tone remains (the
    /// character has already begun playing).
    pub(crate) fn backspace(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.len == 0 {
                return;
            }
            let mut scanned = 0usize;
            let mut cursor = (inner.tail + inner.capacity - 1) % inner.capacity;
            loop {
                if inner.buf[cursor].is_first {
                    let new_len = inner.len - scanned - 1;
                    inner.tail = cursor;
                    inner.len = new_len;
                    if new_len == 0 {
                        inner.head = inner.tail;
                        inner.state = QueueState::Idle;
                    }
                    break;
                }
                scanned += 1;
                if scanned >= inner.len {
                    break;
                }
                cursor = (cursor + inner.capacity - 1) % inner.capacity;
            }
        }
        self.level_changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: u16, dur: i32) -> Tone {
        Tone::new(freq, dur, SlopeMode::None)
    }

    #[test]
    fn fifo_and_empty_return_codes() {
        let q = ToneQueue::new(64);
        for i in 0..30u16 {
            assert_eq!(q.enqueue(tone(i, 20_000)), EnqueueOutcome::Ok);
        }
        let mut out = tone(0, 0);
        for i in 0..30u16 {
            assert_eq!(q.dequeue(&mut out), DequeueOutcome::Dequeued);
            assert_eq!(out.frequency_hz, i);
        }
        assert_eq!(q.dequeue(&mut out), DequeueOutcome::Empty);
        assert_eq!(q.dequeue(&mut out), DequeueOutcome::Empty);
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn forever_tone_repeats_until_successor() {
        let q = ToneQueue::new(8);
        let t1 = Tone::forever(600);
        assert_eq!(q.enqueue(t1), EnqueueOutcome::Ok);
        let mut out = tone(0, 0);
        for _ in 0..5 {
            assert_eq!(q.dequeue(&mut out), DequeueOutcome::Dequeued);
            assert_eq!(out, t1);
            assert_eq!(q.len(), 1);
        }
        let t2 = tone(700, 10_000);
        assert_eq!(q.enqueue(t2), EnqueueOutcome::Ok);
        assert_eq!(q.dequeue(&mut out), DequeueOutcome::Dequeued);
        assert_eq!(out, t1);
        assert_eq!(q.dequeue(&mut out), DequeueOutcome::Dequeued);
        assert_eq!(out, t2);
        assert_eq!(q.dequeue(&mut out), DequeueOutcome::Empty);
    }

    #[test]
    fn zero_duration_is_dropped_silently() {
        let q = ToneQueue::new(8);
        assert_eq!(q.enqueue(tone(500, 0)), EnqueueOutcome::Ok);
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn invalid_frequency_rejected() {
        let q = ToneQueue::new(8);
        assert_eq!(q.enqueue(tone(5000, 10_000)), EnqueueOutcome::Invalid);
    }

    #[test]
    fn full_queue_rejects() {
        let q = ToneQueue::new(2);
        assert_eq!(q.enqueue(tone(500, 10)), EnqueueOutcome::Ok);
        assert_eq!(q.enqueue(tone(500, 10)), EnqueueOutcome::Ok);
        assert_eq!(q.enqueue(tone(500, 10)), EnqueueOutcome::Full);
    }

    #[test]
    fn backspace_drops_last_character_only() {
        let q = ToneQueue::new(16);
        // Character A: dot, mark-space, dash, mark-space; only dot is_first.
        assert_eq!(q.enqueue(tone(600, 60_000).with_first(true)), EnqueueOutcome::Ok);
        assert_eq!(q.enqueue(tone(0, 60_000)), EnqueueOutcome::Ok);
        assert_eq!(q.enqueue(tone(600, 180_000)), EnqueueOutcome::Ok);
        assert_eq!(q.enqueue(tone(0, 60_000)), EnqueueOutcome::Ok);
        assert_eq!(q.len(), 4);
        q.backspace();
        assert_eq!(q.len(), 0);

        assert_eq!(q.enqueue(tone(600, 60_000).with_first(true)), EnqueueOutcome::Ok);
        assert_eq!(q.enqueue(tone(0, 60_000)), EnqueueOutcome::Ok);
        assert_eq!(q.enqueue(tone(600, 180_000)), EnqueueOutcome::Ok);
        assert_eq!(q.enqueue(tone(0, 60_000)), EnqueueOutcome::Ok);
        let mut out = tone(0, 0);
        q.dequeue(&mut out); // dot leaves the queue
        q.backspace();
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn low_water_callback_fires_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let q = ToneQueue::new(30);
        q.set_low_water_mark(5);
        let seen = Arc::new(AtomicUsize::new(usize::MAX));
        let seen2 = seen.clone();
        q.set_low_water_callback(move |level| {
            seen2.store(level, Ordering::SeqCst);
        });
        for _ in 0..20 {
            assert_eq!(q.enqueue(tone(600, 40_000)), EnqueueOutcome::Ok);
        }
        let mut out = tone(0, 0);
        while q.dequeue(&mut out) == DequeueOutcome::Dequeued {}
        let observed = seen.load(Ordering::SeqCst);
        assert!(observed == 4 || observed == 5, "observed={observed}");
    }

    #[test]
    fn flush_clears_queue() {
        let q = ToneQueue::new(8);
        for _ in 0..5 {
            q.enqueue(tone(600, 1000));
        }
        q.flush();
        assert_eq!(q.len(), 0);
    }
}
