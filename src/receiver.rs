//! Adaptive receiver: streaming classifier turning keying timestamps into
//! dots, dashes, and character/word boundaries, with adaptive speed
//! tracking.

use crate::limits::{SPEED_MAX, SPEED_MIN, TOL_MAX};
use crate::timing::Timing;
use crate::CwError;

/// The receiver's internal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveState {
    Idle,
    InMark,
    AfterMark,
    InSpace,
    EoC,
    EoW,
    Error,
}

/// Running mean/variance accumulator (Welford's algorithm), one per mark
/// kind, feeding [`ReceiveStatistics`].
#[derive(Debug, Clone, Copy, Default)]
struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn observe(&mut self, value_us: i64) {
        self.count += 1;
        let delta = value_us as f64 - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value_us as f64 - self.mean;
        self.m2 += delta * delta2;
    }

    fn mean(&self) -> f64 {
        self.mean
    }

    fn stddev(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / self.count as f64).sqrt()
        }
    }
}

/// Snapshot of the receiver's adaptive statistics.
#[derive(Debug, Clone, Copy)]
pub struct ReceiveStatistics {
    pub dot_mean_us: f64,
    pub dot_stddev_us: f64,
    pub dash_mean_us: f64,
    pub dash_stddev_us: f64,
    pub speed_wpm: u32,
}

/// Result of a completed poll: a representation ready to be decoded.
#[derive(Debug, Clone)]
pub struct PolledRepresentation {
    pub representation: String,
    pub is_end_of_word: bool,
    pub is_error: bool,
}

/// Streaming timestamp classifier. Timestamps are caller-defined
/// microsecond ticks from a monotonic clock; the receiver never reads a
/// wall clock itself.
pub struct Receiver {
    state: ReceiveState,
    adaptive: bool,
    tolerance_percent: u32,
    noise_spike_threshold_us: i64,
    dot_len_estimate_us: i64,
    mark_begin_ts: Option<i64>,
    last_edge_ts: Option<i64>,
    representation: String,
    is_error: bool,
    dot_stats: RunningStats,
    dash_stats: RunningStats,
    speed_wpm: u32,
}

impl Receiver {
    pub fn new(initial_speed_wpm: u32, adaptive: bool) -> Self {
        let speed_wpm = initial_speed_wpm.clamp(SPEED_MIN, SPEED_MAX);
        let dot_len_estimate_us = Timing::synchronize(speed_wpm, 0, 50).dot_len_us as i64;
        Receiver {
            state: ReceiveState::Idle,
            adaptive,
            tolerance_percent: crate::limits::TOL_INITIAL,
            noise_spike_threshold_us: dot_len_estimate_us / 10,
            dot_len_estimate_us,
            mark_begin_ts: None,
            last_edge_ts: None,
            representation: String::new(),
            is_error: false,
            dot_stats: RunningStats::default(),
            dash_stats: RunningStats::default(),
            speed_wpm,
        }
    }

    pub fn set_tolerance(&mut self, tolerance_percent: u32) -> Result<(), CwError> {
        if tolerance_percent > TOL_MAX {
            return Err(CwError::Invalid(format!(
                "tolerance {tolerance_percent} out of range"
            )));
        }
        self.tolerance_percent = tolerance_percent;
        Ok(())
    }

    pub fn set_adaptive(&mut self, adaptive: bool) {
        self.adaptive = adaptive;
    }

    pub fn set_noise_spike_threshold_us(&mut self, threshold_us: i64) {
        self.noise_spike_threshold_us = threshold_us.max(0);
    }

    pub fn state(&self) -> ReceiveState {
        self.state
    }

    pub fn speed_wpm(&self) -> u32 {
        self.speed_wpm
    }

    fn dot_dash_threshold_us(&self) -> i64 {
        2 * self.dot_len_estimate_us
    }

    fn eoc_threshold_us(&self) -> i64 {
        let base = 2 * self.dot_len_estimate_us;
        base + base * self.tolerance_percent as i64 / 100
    }

    fn eow_threshold_us(&self) -> i64 {
        let base = 5 * self.dot_len_estimate_us;
        base + base * self.tolerance_percent as i64 / 100
    }

    /// Record a falling-edge (key-down) timestamp. Rejects if already in
    /// a mark.
    pub fn mark_begin(&mut self, ts: i64) -> Result<(), CwError> {
        if self.state == ReceiveState::InMark {
            return Err(CwError::Busy("mark_begin called while already in mark"));
        }
        self.mark_begin_ts = Some(ts);
        self.state = ReceiveState::InMark;
        Ok(())
    }

    /// Record a rising-edge (key-up) timestamp, classifying the completed
    /// mark as a dot or dash and appending it to the in-progress
    /// representation. Marks shorter than the noise-spike threshold are
    /// discarded entirely.
    pub fn mark_end(&mut self, ts: i64) -> Result<(), CwError> {
        let begin = self
            .mark_begin_ts
            .take()
            .ok_or(CwError::Busy("mark_end called without mark_begin"))?;
        let mark_us = ts - begin;

        if mark_us < self.noise_spike_threshold_us {
            self.state = ReceiveState::Idle;
            return Ok(());
        }

        let threshold = self.dot_dash_threshold_us().max(1);
        let deviation_pct = ((mark_us - threshold).abs() * 100) / threshold;
        let ambiguous = deviation_pct <= self.tolerance_percent as i64;

        let symbol = if mark_us < threshold {
            self.dot_stats.observe(mark_us);
            '.'
        } else {
            self.dash_stats.observe(mark_us);
            '-'
        };
        self.representation.push(symbol);
        self.last_edge_ts = Some(ts);
        self.is_error = self.is_error || ambiguous;
        self.state = if ambiguous {
            ReceiveState::Error
        } else {
            ReceiveState::AfterMark
        };

        if self.adaptive && symbol == '.' {
            self.dot_len_estimate_us = self.dot_stats.mean().round() as i64;
            let inferred = 1_200_000i64 / self.dot_len_estimate_us.max(1);
            self.speed_wpm = (inferred as u32).clamp(SPEED_MIN, SPEED_MAX);
        }

        Ok(())
    }

    /// Programmatic mark append bypassing timing entirely.
    pub fn add_mark(&mut self, ts: i64, symbol: char) -> Result<(), CwError> {
        if symbol != '.' && symbol != '-' {
            return Err(CwError::Invalid(format!("not a dot/dash: '{symbol}'")));
        }
        self.representation.push(symbol);
        self.last_edge_ts = Some(ts);
        self.state = ReceiveState::AfterMark;
        Ok(())
    }

    /// Consult the time since the last edge and, if a character or word
    /// boundary has been crossed, return the accumulated representation
    /// and reset for the next character.
    pub fn poll_representation(&mut self, ts: i64) -> Result<PolledRepresentation, CwError> {
        let last_edge = self.last_edge_ts.ok_or(CwError::NotReady)?;
        let elapsed = ts - last_edge;

        if elapsed < self.eoc_threshold_us() {
            self.state = ReceiveState::InSpace;
            return Err(CwError::NotReady);
        }

        let is_end_of_word = elapsed >= self.eow_threshold_us();
        self.state = if is_end_of_word {
            ReceiveState::EoW
        } else {
            ReceiveState::EoC
        };

        let representation = std::mem::take(&mut self.representation);
        let is_error = self.is_error;
        self.is_error = false;
        self.last_edge_ts = None;
        self.state = ReceiveState::Idle;

        Ok(PolledRepresentation {
            representation,
            is_end_of_word,
            is_error,
        })
    }

    /// As [`Receiver::poll_representation`], but also decodes the
    /// representation into a character via [`crate::table::char_of`].
    pub fn poll_character(&mut self, ts: i64) -> Result<(char, PolledRepresentation), CwError> {
        let polled = self.poll_representation(ts)?;
        let c = crate::table::char_of(&polled.representation)
            .ok_or_else(|| CwError::Invalid(format!("no character for '{}'", polled.representation)))?;
        Ok((c, polled))
    }

    pub fn get_receive_statistics(&self) -> ReceiveStatistics {
        ReceiveStatistics {
            dot_mean_us: self.dot_stats.mean(),
            dot_stddev_us: self.dot_stats.stddev(),
            dash_mean_us: self.dash_stats.mean(),
            dash_stddev_us: self.dash_stats.stddev(),
            speed_wpm: self.speed_wpm,
        }
    }
}
