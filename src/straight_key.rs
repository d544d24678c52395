//! Straight key: a two-state input that enqueues a "forever" tone while
//! closed.

use std::sync::Arc;

use crate::generator::Generator;
use crate::CwError;

/// Tracks whether the key is currently closed (carrier on) or open
/// (silence), and drives the owning [`Generator`] accordingly. Holds a
/// non-owning `Arc` back-reference; the caller is responsible for keeping
/// the generator alive for as long as the key is used.
pub struct StraightKey {
    generator: Arc<Generator>,
    closed: bool,
}

impl StraightKey {
    pub fn new(generator: Arc<Generator>) -> Self {
        StraightKey {
            generator,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Report the key's new physical state. No-op if unchanged.
    pub fn set_closed(&mut self, closed: bool) -> Result<(), CwError> {
        if closed == self.closed {
            return Ok(());
        }
        self.closed = closed;
        if closed {
            self.generator.enqueue_begin_mark()
        } else {
            self.generator.enqueue_begin_space()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;

    fn test_generator() -> Arc<Generator> {
        Arc::new(Generator::new(|| Box::new(NullSink::new(8000, 64)) as Box<dyn crate::sink::Sink>))
    }

    #[test]
    fn unchanged_state_is_a_noop() {
        let gen = test_generator();
        let mut key = StraightKey::new(gen.clone());
        key.set_closed(false).unwrap();
        assert_eq!(gen.queue_len(), 0);
    }

    #[test]
    fn closing_enqueues_forever_carrier() {
        let gen = test_generator();
        let mut key = StraightKey::new(gen.clone());
        key.set_closed(true).unwrap();
        assert_eq!(gen.queue_len(), 1);
        key.set_closed(false).unwrap();
        assert_eq!(gen.queue_len(), 2);
    }
}
