//! Sine-wave sample synthesis with continuous phase across tones, envelope
//! application, and fixed-size block writes to a [`crate::sink::Sink`].

use crate::slope::SlopeTable;
use crate::tone::{SlopeMode, Tone};

/// Owns the running phase and writes samples for one tone at a time into
/// a caller-provided fixed-size block, flushing to the sink whenever the
/// block fills.
pub(crate) struct Synthesizer {
    sample_rate: u32,
    volume_percent: u32,
    phase: f64,
    block: Vec<i16>,
    sub_start: usize,
}

impl Synthesizer {
    pub(crate) fn new(sample_rate: u32, buffer_n_samples: usize) -> Self {
        Synthesizer {
            sample_rate,
            volume_percent: 70,
            phase: 0.0,
            block: vec![0i16; buffer_n_samples],
            sub_start: 0,
        }
    }

    pub(crate) fn set_volume_percent(&mut self, volume_percent: u32) {
        self.volume_percent = volume_percent;
    }

    /// Synthesize `tone` in full, flushing the block to `write_block`
    /// every time it fills. `slopes` supplies the envelope amplitudes.
    /// `write_block` returns `false` to abort: rendering stops immediately,
    /// without computing the tone's remaining samples, and phase resets as
    /// if the tone had ended in silence.
    pub(crate) fn render_tone(
        &mut self,
        tone: &Tone,
        slopes: &SlopeTable,
        n_samples: usize,
        mut write_block: impl FnMut(&[i16]) -> bool,
    ) {
        let volume_abs = (self.volume_percent.min(100) as f64 / 100.0) * i16::MAX as f64;
        let (rising, falling) = match tone.slope_mode {
            SlopeMode::None => (false, false),
            SlopeMode::Rising => (true, false),
            SlopeMode::Falling => (false, true),
            SlopeMode::Standard => (true, true),
        };

        if tone.frequency_hz == 0 {
            self.phase = 0.0;
        }

        let mut k = 0usize;
        while k < n_samples {
            let block_len = self.block.len();
            let remaining_in_block = block_len - self.sub_start;
            let remaining_in_tone = n_samples - k;
            let chunk = remaining_in_block.min(remaining_in_tone);

            for i in 0..chunk {
                let sample_index = k + i;
                let envelope = slopes.envelope(sample_index, n_samples, rising, falling);
                let value = if tone.frequency_hz == 0 {
                    0.0
                } else {
                    let angle = self.phase
                        + 2.0 * std::f64::consts::PI * tone.frequency_hz as f64 * (i as f64)
                            / self.sample_rate as f64;
                    volume_abs * envelope as f64 * angle.sin()
                };
                self.block[self.sub_start + i] = value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            }

            if tone.frequency_hz != 0 {
                let increment = 2.0 * std::f64::consts::PI * tone.frequency_hz as f64 * chunk as f64
                    / self.sample_rate as f64;
                self.phase = (self.phase + increment) % (2.0 * std::f64::consts::PI);
            }

            self.sub_start += chunk;
            k += chunk;

            if self.sub_start == block_len {
                let keep_going = write_block(&self.block);
                self.sub_start = 0;
                if !keep_going {
                    self.phase = 0.0;
                    return;
                }
            }
        }
    }

    /// Flush a partially-filled block, padding the remainder with silence.
    /// Used on shutdown to drain whatever samples were already computed.
    pub(crate) fn flush_partial(&mut self, mut write_block: impl FnMut(&[i16])) {
        if self.sub_start > 0 {
            for s in &mut self.block[self.sub_start..] {
                *s = 0;
            }
            write_block(&self.block);
            self.sub_start = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::SlopeMode;

    #[test]
    fn silence_emits_zero_samples() {
        let mut synth = Synthesizer::new(8000, 64);
        let tone = Tone::new(0, 1000, SlopeMode::None);
        let slopes = SlopeTable::new(8000);
        let mut flushed = Vec::new();
        synth.render_tone(&tone, &slopes, 8, |block| {
            flushed.push(block.to_vec());
            true
        });
        synth.flush_partial(|block| flushed.push(block.to_vec()));
        assert!(flushed.iter().flatten().all(|&s| s == 0));
    }

    #[test]
    fn tone_fills_multiple_blocks_and_flushes_on_boundary() {
        let mut synth = Synthesizer::new(8000, 4);
        synth.set_volume_percent(100);
        let tone = Tone::new(1000, 1000, SlopeMode::None);
        let slopes = SlopeTable::new(8000);
        let mut flush_count = 0;
        // n_samples computed the way the generator would: dur_us * rate / 1e6
        let n_samples = 1000 * 8000 / 1_000_000;
        synth.render_tone(&tone, &slopes, n_samples, |_| {
            flush_count += 1;
            true
        });
        assert_eq!(flush_count, n_samples / 4);
    }

    #[test]
    fn abort_mid_tone_stops_rendering_and_resets_phase() {
        let mut synth = Synthesizer::new(8000, 4);
        synth.set_volume_percent(100);
        let tone = Tone::new(1000, 1000, SlopeMode::None);
        let slopes = SlopeTable::new(8000);
        let n_samples = 1000 * 8000 / 1_000_000; // 8 samples, 2 blocks
        let mut blocks_seen = 0;
        synth.render_tone(&tone, &slopes, n_samples, |_| {
            blocks_seen += 1;
            false
        });
        assert_eq!(blocks_seen, 1, "rendering should stop at the first aborted block");
        assert_eq!(synth.phase, 0.0);
    }
}
