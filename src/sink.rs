//! Audio sink interface and the ambient backend implementations the demo
//! binary and tests use. The core only ever talks to `dyn Sink`; it never
//! couples to a specific backend's types.

use crate::CwError;

/// Negotiated parameters returned by [`Sink::open`].
#[derive(Debug, Clone, Copy)]
pub struct SinkConfig {
    pub sample_rate: u32,
    pub buffer_n_samples: usize,
}

/// `{ open, write_block, close, is_possible }`. Implemented by concrete
/// backends; the generator is generic over this trait only.
///
/// Deliberately not `Send`: `RodioSink` wraps a `cpal` stream handle that
/// some backends cannot hand across threads, so the generator builds and
/// opens a sink entirely on its consumer thread via a `Send` factory
/// closure instead of moving an already-open sink into that thread.
pub trait Sink {
    fn open(&mut self, device: Option<&str>) -> Result<SinkConfig, CwError>;
    fn write_block(&mut self, samples: &[i16]) -> Result<(), CwError>;
    fn close(&mut self);
    fn is_possible(&self, device: Option<&str>) -> bool;
}

/// Discards every block. Used by tests and headless callers.
pub struct NullSink {
    sample_rate: u32,
    buffer_n_samples: usize,
}

impl NullSink {
    pub fn new(sample_rate: u32, buffer_n_samples: usize) -> Self {
        NullSink {
            sample_rate,
            buffer_n_samples,
        }
    }
}

impl Sink for NullSink {
    fn open(&mut self, _device: Option<&str>) -> Result<SinkConfig, CwError> {
        Ok(SinkConfig {
            sample_rate: self.sample_rate,
            buffer_n_samples: self.buffer_n_samples,
        })
    }

    fn write_block(&mut self, _samples: &[i16]) -> Result<(), CwError> {
        Ok(())
    }

    fn close(&mut self) {}

    fn is_possible(&self, _device: Option<&str>) -> bool {
        true
    }
}

/// Writes every block to a WAV file via `hound`.
pub struct WavFileSink {
    path: String,
    sample_rate: u32,
    buffer_n_samples: usize,
    writer: Option<hound::WavWriter<std::io::BufWriter<std::fs::File>>>,
}

impl WavFileSink {
    pub fn new(path: impl Into<String>, sample_rate: u32, buffer_n_samples: usize) -> Self {
        WavFileSink {
            path: path.into(),
            sample_rate,
            buffer_n_samples,
            writer: None,
        }
    }
}

impl Sink for WavFileSink {
    fn open(&mut self, _device: Option<&str>) -> Result<SinkConfig, CwError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(&self.path, spec)
            .map_err(|e| CwError::SinkError(e.to_string()))?;
        self.writer = Some(writer);
        Ok(SinkConfig {
            sample_rate: self.sample_rate,
            buffer_n_samples: self.buffer_n_samples,
        })
    }

    fn write_block(&mut self, samples: &[i16]) -> Result<(), CwError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CwError::SinkError("sink not opened".into()))?;
        for &s in samples {
            writer
                .write_sample(s)
                .map_err(|e| CwError::SinkError(e.to_string()))?;
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(writer) = self.writer.take() {
            let _ = writer.finalize();
        }
    }

    fn is_possible(&self, _device: Option<&str>) -> bool {
        true
    }
}

/// Plays blocks through the default output device via `rodio`.
pub struct RodioSink {
    sample_rate: u32,
    buffer_n_samples: usize,
    stream: Option<rodio::OutputStream>,
    sink: Option<rodio::Sink>,
}

impl RodioSink {
    pub fn new(sample_rate: u32, buffer_n_samples: usize) -> Self {
        RodioSink {
            sample_rate,
            buffer_n_samples,
            stream: None,
            sink: None,
        }
    }
}

impl Sink for RodioSink {
    fn open(&mut self, _device: Option<&str>) -> Result<SinkConfig, CwError> {
        let (stream, handle) =
            rodio::OutputStream::try_default().map_err(|e| CwError::SinkError(e.to_string()))?;
        let sink = rodio::Sink::try_new(&handle).map_err(|e| CwError::SinkError(e.to_string()))?;
        self.stream = Some(stream);
        self.sink = Some(sink);
        Ok(SinkConfig {
            sample_rate: self.sample_rate,
            buffer_n_samples: self.buffer_n_samples,
        })
    }

    fn write_block(&mut self, samples: &[i16]) -> Result<(), CwError> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| CwError::SinkError("sink not opened".into()))?;
        let floats: Vec<f32> = samples.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
        let source = rodio::buffer::SamplesBuffer::new(1, self.sample_rate, floats);
        sink.append(source);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.sleep_until_end();
        }
        self.stream = None;
    }

    fn is_possible(&self, _device: Option<&str>) -> bool {
        rodio::OutputStream::try_default().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sink_accepts_any_block() {
        let mut sink = NullSink::new(8000, 64);
        let cfg = sink.open(None).unwrap();
        assert_eq!(cfg.sample_rate, 8000);
        assert!(sink.write_block(&[0i16; 64]).is_ok());
        sink.close();
    }
}
