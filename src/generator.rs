//! The generator: owns the tone queue, slope table, sample synthesizer,
//! and sink; exposes enqueue primitives.

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, warn};

use crate::limits::{
    DEFAULT_CAPACITY, FOREVER_QUANTUM_US, FREQ_MAX, FREQ_MIN, GAP_MAX, SPEED_MAX, SPEED_MIN,
    VOL_MAX, WEIGHT_MAX, WEIGHT_MIN,
};
use crate::sink::Sink;
use crate::slope::{validate_slope_request, SlopeShape, SlopeTable};
use crate::synth::Synthesizer;
use crate::timing::Timing;
use crate::tone::{DequeueOutcome, EnqueueOutcome, SlopeMode, Tone, ToneQueue};
use crate::CwError;

/// Which mark kind to enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    Dot,
    Dash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Created,
    Running,
    Stopped,
}

/// Atomically-writable parameters the consumer thread re-reads at tone
/// boundaries.
struct Parameters {
    speed_wpm: AtomicU32,
    frequency_hz: AtomicU16,
    volume_percent: AtomicU32,
    gap: AtomicU32,
    weighting: AtomicU32,
}

impl Parameters {
    fn new(speed_wpm: u32, frequency_hz: u16, volume_percent: u32, gap: u32, weighting: u32) -> Self {
        Parameters {
            speed_wpm: AtomicU32::new(speed_wpm),
            frequency_hz: AtomicU16::new(frequency_hz),
            volume_percent: AtomicU32::new(volume_percent),
            gap: AtomicU32::new(gap),
            weighting: AtomicU32::new(weighting),
        }
    }
}

struct Shared {
    queue: ToneQueue,
    params: Parameters,
    do_run: AtomicBool,
    keying_state_callback: parking_lot::Mutex<Option<Box<dyn Fn(bool) + Send + 'static>>>,
    last_error: parking_lot::Mutex<Option<String>>,
    /// Pending `(shape, length_us)` request from [`Generator::set_slope`],
    /// applied to the consumer thread's local `SlopeTable` at the next
    /// tone boundary.
    slope_request: parking_lot::Mutex<Option<(Option<SlopeShape>, Option<i32>)>>,
}

type SinkFactory = Box<dyn FnOnce() -> Box<dyn Sink> + Send>;

/// Owns the real-time tone pipeline: tone queue, derived timing, slope
/// table, sample synthesizer, and consumer thread writing to a `dyn Sink`.
///
/// Lifecycle: `Created -> Running -> Stopped`. A key may hold a
/// non-owning `Arc<Generator>` back-reference; the `Arc` keeps the
/// generator alive for as long as any key still references it.
pub struct Generator {
    shared: Arc<Shared>,
    consumer: std::sync::Mutex<Option<JoinHandle<()>>>,
    state: std::sync::Mutex<LifecycleState>,
    sink_factory: std::sync::Mutex<Option<SinkFactory>>,
    sample_rate: AtomicU32,
}

impl Generator {
    /// Construct a generator around a sink factory. The sink itself is
    /// built and opened on the consumer thread spawned by [`Generator::start`]
    /// rather than here, since backends like `RodioSink` hold a stream
    /// handle that some platforms cannot move between threads.
    pub fn new<F>(make_sink: F) -> Self
    where
        F: FnOnce() -> Box<dyn Sink> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            queue: ToneQueue::new(DEFAULT_CAPACITY),
            params: Parameters::new(
                crate::limits::SPEED_INITIAL,
                crate::limits::FREQ_INITIAL,
                crate::limits::VOL_INITIAL,
                0,
                crate::limits::WEIGHT_INITIAL,
            ),
            do_run: AtomicBool::new(false),
            keying_state_callback: parking_lot::Mutex::new(None),
            last_error: parking_lot::Mutex::new(None),
            slope_request: parking_lot::Mutex::new(None),
        });
        shared.queue.set_low_water_mark(2);

        Generator {
            shared,
            consumer: std::sync::Mutex::new(None),
            state: std::sync::Mutex::new(LifecycleState::Created),
            sink_factory: std::sync::Mutex::new(Some(Box::new(make_sink))),
            sample_rate: AtomicU32::new(0),
        }
    }

    /// Register a callback invoked on low-water-mark crossings, with all
    /// queue locks released.
    pub fn set_low_water_callback<F>(&self, level: usize, callback: F)
    where
        F: Fn(usize) + Send + 'static,
    {
        self.shared.queue.set_low_water_mark(level);
        self.shared.queue.set_low_water_callback(callback);
    }

    /// Register a callback invoked whenever keying state (mark/space)
    /// transitions, so external hardware can track it.
    pub fn set_keying_state_callback<F>(&self, callback: F)
    where
        F: Fn(bool) + Send + 'static,
    {
        *self.shared.keying_state_callback.lock() = Some(Box::new(callback));
    }

    /// Spawn the consumer thread, which builds and opens the sink itself
    /// before entering its loop. Blocks until the sink reports its
    /// negotiated `sample_rate`/`buffer_n_samples`, or the open failed.
    /// `Created -> Running`.
    pub fn start(&self, device: Option<String>) -> Result<(), CwError> {
        let mut state = self.state.lock().unwrap();
        if *state != LifecycleState::Created {
            return Err(CwError::Busy("generator already started"));
        }
        let make_sink = self
            .sink_factory
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| CwError::SinkError("sink factory missing".into()))?;

        self.shared.do_run.store(true, Ordering::SeqCst);
        let shared = self.shared.clone();
        let (config_tx, config_rx) = std::sync::mpsc::sync_channel(1);
        let handle = std::thread::spawn(move || {
            let mut sink = make_sink();
            let config = match sink.open(device.as_deref()) {
                Ok(config) => config,
                Err(e) => {
                    let _ = config_tx.send(Err(e));
                    return;
                }
            };
            let _ = config_tx.send(Ok(config));
            consumer_loop(shared, sink, config);
        });
        let config = config_rx.recv().map_err(|_| {
            CwError::SinkError("consumer thread exited before opening sink".into())
        })??;
        self.sample_rate.store(config.sample_rate, Ordering::SeqCst);
        *self.consumer.lock().unwrap() = Some(handle);
        *state = LifecycleState::Running;
        Ok(())
    }

    /// Enqueue a zero-duration silencing tone, stop the consumer, and join
    /// it. `Running -> Stopped`.
    pub fn stop(&self) -> Result<(), CwError> {
        let mut state = self.state.lock().unwrap();
        if *state != LifecycleState::Running {
            return Ok(());
        }
        self.shared.do_run.store(false, Ordering::SeqCst);
        // Release a consumer possibly parked in wait_while_empty.
        self.shared.queue.enqueue(Tone::new(0, 1, SlopeMode::None));
        if let Some(handle) = self.consumer.lock().unwrap().take() {
            let _ = handle.join();
        }
        *state = LifecycleState::Stopped;
        Ok(())
    }

    pub(crate) fn current_timing(&self) -> Timing {
        Timing::synchronize(
            self.shared.params.speed_wpm.load(Ordering::Relaxed),
            self.shared.params.gap.load(Ordering::Relaxed),
            self.shared.params.weighting.load(Ordering::Relaxed),
        )
    }

    fn current_frequency(&self) -> u16 {
        self.shared.params.frequency_hz.load(Ordering::Relaxed)
    }

    // -- Parameter setters -------------------------------------------------

    pub fn set_speed(&self, wpm: u32) -> Result<(), CwError> {
        if !(SPEED_MIN..=SPEED_MAX).contains(&wpm) {
            return Err(CwError::Invalid(format!("speed {wpm} out of range")));
        }
        self.shared.params.speed_wpm.store(wpm, Ordering::Relaxed);
        Ok(())
    }

    pub fn set_frequency(&self, hz: u16) -> Result<(), CwError> {
        if !(FREQ_MIN..=FREQ_MAX).contains(&hz) {
            return Err(CwError::Invalid(format!("frequency {hz} out of range")));
        }
        self.shared.params.frequency_hz.store(hz, Ordering::Relaxed);
        Ok(())
    }

    pub fn set_volume(&self, percent: u32) -> Result<(), CwError> {
        if percent > VOL_MAX {
            return Err(CwError::Invalid(format!("volume {percent} out of range")));
        }
        self.shared.params.volume_percent.store(percent, Ordering::Relaxed);
        Ok(())
    }

    pub fn set_gap(&self, gap: u32) -> Result<(), CwError> {
        if gap > GAP_MAX {
            return Err(CwError::Invalid(format!("gap {gap} out of range")));
        }
        self.shared.params.gap.store(gap, Ordering::Relaxed);
        Ok(())
    }

    pub fn set_weighting(&self, weighting: u32) -> Result<(), CwError> {
        if !(WEIGHT_MIN..=WEIGHT_MAX).contains(&weighting) {
            return Err(CwError::Invalid(format!("weighting {weighting} out of range")));
        }
        self.shared.params.weighting.store(weighting, Ordering::Relaxed);
        Ok(())
    }

    /// Change the envelope shape and/or length applied at tone edges.
    /// Validated here; applied by the consumer thread at the next tone
    /// boundary.
    pub fn set_slope(&self, shape: Option<SlopeShape>, length_us: Option<i32>) -> Result<(), CwError> {
        validate_slope_request(shape, length_us)?;
        *self.shared.slope_request.lock() = Some((shape, length_us));
        Ok(())
    }

    /// The sink's negotiated sample rate. Zero until [`Generator::start`]
    /// has completed.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::SeqCst)
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn queue_capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    pub fn wait_for_level(&self, level: usize) {
        self.shared.queue.wait_for_level(level)
    }

    pub fn flush(&self) {
        self.shared.queue.flush()
    }

    pub fn backspace(&self) {
        self.shared.queue.backspace()
    }

    // -- Enqueue primitives -------------------------------------------------

    /// One audible tone (dot/dash) followed by one silent mark-space tone.
    pub fn enqueue_mark(&self, kind: MarkKind, is_first: bool) -> Result<(), CwError> {
        let timing = self.current_timing();
        let freq = self.current_frequency();
        let dur = match kind {
            MarkKind::Dot => timing.dot_len_us,
            MarkKind::Dash => timing.dash_len_us,
        };
        let mark = Tone::new(freq, dur, SlopeMode::Standard).with_first(is_first);
        match self.shared.queue.enqueue(mark) {
            EnqueueOutcome::Ok => {}
            EnqueueOutcome::Full => return Err(CwError::Full),
            EnqueueOutcome::Invalid => return Err(CwError::Invalid("mark tone".into())),
        }
        let space = Tone::new(0, timing.mark_space_us, SlopeMode::None);
        match self.shared.queue.enqueue(space) {
            EnqueueOutcome::Ok => Ok(()),
            EnqueueOutcome::Full => Err(CwError::Full),
            EnqueueOutcome::Invalid => Err(CwError::Invalid("mark space".into())),
        }
    }

    /// Three consecutive silent tones summing to `eoc_additional_us`,
    /// rather than one, so a low-water callback has a chance to fire
    /// partway through a long space instead of only at its end.
    pub fn enqueue_eoc_space(&self) -> Result<(), CwError> {
        let timing = self.current_timing();
        self.enqueue_split_silence(timing.eoc_additional_us + timing.additional_space_us)
    }

    /// Three silent tones summing to `eow_additional_us`.
    pub fn enqueue_eow_space(&self) -> Result<(), CwError> {
        let timing = self.current_timing();
        self.enqueue_split_silence(timing.eow_additional_us + timing.adjustment_space_us)
    }

    fn enqueue_split_silence(&self, total_us: i32) -> Result<(), CwError> {
        let third = total_us / 3;
        let remainder = total_us - third * 2;
        for dur in [third, third, remainder] {
            match self.shared.queue.enqueue(Tone::new(0, dur, SlopeMode::None)) {
                EnqueueOutcome::Ok => {}
                EnqueueOutcome::Full => return Err(CwError::Full),
                EnqueueOutcome::Invalid => return Err(CwError::Invalid("silence tone".into())),
            }
        }
        Ok(())
    }

    /// Enqueue a raw `.`/`-` representation string.
    pub fn enqueue_representation(&self, repr: &str) -> Result<(), CwError> {
        for (i, c) in repr.chars().enumerate() {
            let kind = match c {
                '.' => MarkKind::Dot,
                '-' => MarkKind::Dash,
                other => return Err(CwError::Invalid(format!("not a dot/dash: '{other}'"))),
            };
            self.enqueue_mark(kind, i == 0)?;
        }
        Ok(())
    }

    /// Look up `c`'s representation and enqueue it plus end-of-character
    /// spacing. `' '` enqueues only end-of-word spacing. `'\u{8}'`
    /// (backspace) truncates the queue instead.
    pub fn enqueue_character(&self, c: char) -> Result<(), CwError> {
        if c == '\u{8}' {
            self.backspace();
            return Ok(());
        }
        if c == ' ' {
            return self.enqueue_eow_space();
        }
        match crate::table::representation_of(c) {
            Some(repr) => {
                self.enqueue_representation(repr)?;
                self.enqueue_eoc_space()
            }
            None => Err(CwError::Invalid(format!("no representation for '{c}'"))),
        }
    }

    /// Enqueue each character of `s` in turn, aborting (leaving whatever
    /// is already queued intact) on the first failure.
    pub fn enqueue_string(&self, s: &str) -> Result<(), CwError> {
        for c in s.chars() {
            self.enqueue_character(c)?;
        }
        Ok(())
    }

    /// Enqueue a "forever" tone at the current frequency (carrier on),
    /// for the straight key.
    pub fn enqueue_begin_mark(&self) -> Result<(), CwError> {
        let freq = self.current_frequency();
        match self.shared.queue.enqueue(Tone::forever(freq)) {
            EnqueueOutcome::Ok => Ok(()),
            EnqueueOutcome::Full => Err(CwError::Full),
            EnqueueOutcome::Invalid => Err(CwError::Invalid("begin mark".into())),
        }
    }

    /// Enqueue a "forever" silent tone (carrier off), for the straight key.
    pub fn enqueue_begin_space(&self) -> Result<(), CwError> {
        match self.shared.queue.enqueue(Tone::forever(0)) {
            EnqueueOutcome::Ok => Ok(()),
            EnqueueOutcome::Full => Err(CwError::Full),
            EnqueueOutcome::Invalid => Err(CwError::Invalid("begin space".into())),
        }
    }
}

fn consumer_loop(shared: Arc<Shared>, mut sink: Box<dyn Sink>, config: crate::sink::SinkConfig) {
    let mut synth = Synthesizer::new(config.sample_rate, config.buffer_n_samples);
    let mut slopes = SlopeTable::new(config.sample_rate);
    slopes.set_slope(Some(SlopeShape::RaisedCosine), Some(4_000)).ok();
    let mut out = Tone::new(0, 0, SlopeMode::None);
    let mut last_keying_state = false;

    while shared.do_run.load(Ordering::SeqCst) {
        shared.queue.wait_while_empty();
        if !shared.do_run.load(Ordering::SeqCst) && shared.queue.is_empty() {
            break;
        }

        if let Some((shape, length_us)) = shared.slope_request.lock().take() {
            slopes.set_slope(shape, length_us).ok();
        }

        match shared.queue.dequeue(&mut out) {
            DequeueOutcome::Empty => continue,
            DequeueOutcome::Dequeued => {}
        }

        let keying_state = out.frequency_hz != 0;
        if keying_state != last_keying_state {
            if let Some(cb) = shared.keying_state_callback.lock().as_ref() {
                cb(keying_state);
            }
            last_keying_state = keying_state;
        }

        let volume = shared.params.volume_percent.load(Ordering::Relaxed);
        synth.set_volume_percent(volume);

        if out.is_forever {
            let n_samples =
                (FOREVER_QUANTUM_US as i64 * config.sample_rate as i64 / 1_000_000).max(1) as usize;
            synth.render_tone(&out, &slopes, n_samples, |block| match sink.write_block(block) {
                Ok(()) => true,
                Err(e) => {
                    warn!("cw-engine: sink error on forever tone: {e}");
                    false
                }
            });
            continue;
        }

        let n_samples =
            (out.duration_us as i64 * config.sample_rate as i64 / 1_000_000).max(0) as usize;
        synth.render_tone(&out, &slopes, n_samples, |block| match sink.write_block(block) {
            Ok(()) => true,
            Err(e) => {
                warn!("cw-engine: sink write_block failed: {e}; dropping tone, resetting phase");
                *shared.last_error.lock() = Some(e.to_string());
                false
            }
        });
    }

    synth.flush_partial(|block| {
        let _ = sink.write_block(block);
    });
    sink.close();
    debug!("cw-engine: consumer thread exiting");
}

impl Drop for Generator {
    fn drop(&mut self) {
        let running = matches!(*self.state.lock().unwrap(), LifecycleState::Running);
        if running {
            let _ = self.stop();
        }
    }
}
