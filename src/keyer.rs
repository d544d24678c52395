//! Iambic (dual-paddle) keyer: a 9-state machine driving dot/dash tone
//! requests from two paddle booleans, with Curtis mode A/B latching.
//!
//! The state machine itself ([`IambicCore`]) is a pure, synchronous value
//! type so it can be unit-tested without threads. [`IambicKeyer`] wraps it
//! with a dedicated timer thread, using an `mpsc` channel and
//! `recv_timeout` as the timer instead of a signal handler, which avoids
//! tearing down a condvar a signal handler might be blocked on.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::generator::{Generator, MarkKind};

/// The iambic keyer's state graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyerState {
    Idle,
    InDotA,
    InDashA,
    AfterDotA,
    AfterDashA,
    InDotB,
    InDashB,
    AfterDotB,
    AfterDashB,
}

/// Pure iambic keyer state machine, independent of timing and I/O.
///
/// Drive it with [`IambicCore::notify_paddle_event`] on paddle transitions
/// and [`IambicCore::timer_expired`] when the current mark's timer elapses;
/// both return the next mark to enqueue, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IambicCore {
    graph_state: KeyerState,
    dot_paddle: bool,
    dash_paddle: bool,
    dot_latch: bool,
    dash_latch: bool,
    curtis_mode_b: bool,
    curtis_b_latch: bool,
}

impl IambicCore {
    pub fn new(curtis_mode_b: bool) -> Self {
        IambicCore {
            graph_state: KeyerState::Idle,
            dot_paddle: false,
            dash_paddle: false,
            dot_latch: false,
            dash_latch: false,
            curtis_mode_b,
            curtis_b_latch: false,
        }
    }

    pub fn state(&self) -> KeyerState {
        self.graph_state
    }

    pub fn set_curtis_mode_b(&mut self, enabled: bool) {
        self.curtis_mode_b = enabled;
    }

    /// Edge-sensitive paddle update. A `false -> true` transition sets the
    /// corresponding latch; holding both paddles at once arms the Curtis
    /// mode B "squeeze" latch. If the machine is Idle, it advances
    /// immediately.
    pub fn notify_paddle_event(&mut self, dot: bool, dash: bool) -> Option<MarkKind> {
        if dot && !self.dot_paddle {
            self.dot_latch = true;
        }
        if dash && !self.dash_paddle {
            self.dash_latch = true;
        }
        if dot && dash && self.curtis_mode_b {
            self.curtis_b_latch = true;
        }
        self.dot_paddle = dot;
        self.dash_paddle = dash;

        if self.graph_state == KeyerState::Idle {
            self.begin_from_idle()
        } else {
            None
        }
    }

    fn begin_from_idle(&mut self) -> Option<MarkKind> {
        if self.dot_paddle {
            self.dot_latch = false;
            self.graph_state = self.entry_state(MarkKind::Dot);
            Some(MarkKind::Dot)
        } else if self.dash_paddle {
            self.dash_latch = false;
            self.graph_state = self.entry_state(MarkKind::Dash);
            Some(MarkKind::Dash)
        } else {
            None
        }
    }

    fn entry_state(&self, kind: MarkKind) -> KeyerState {
        match (kind, self.curtis_mode_b) {
            (MarkKind::Dot, false) => KeyerState::InDotA,
            (MarkKind::Dot, true) => KeyerState::InDotB,
            (MarkKind::Dash, false) => KeyerState::InDashA,
            (MarkKind::Dash, true) => KeyerState::InDashB,
        }
    }

    /// Called when the current mark's timer (duration + mark-space) has
    /// elapsed. Transitions through the `After*` state and immediately
    /// decides the next mark, preferring the opposite of what was just
    /// sent if its latch (or the Curtis B squeeze latch) is set.
    pub fn timer_expired(&mut self) -> Option<MarkKind> {
        let just_sent = match self.graph_state {
            KeyerState::InDotA => {
                self.graph_state = KeyerState::AfterDotA;
                MarkKind::Dot
            }
            KeyerState::InDotB => {
                self.graph_state = KeyerState::AfterDotB;
                MarkKind::Dot
            }
            KeyerState::InDashA => {
                self.graph_state = KeyerState::AfterDashA;
                MarkKind::Dash
            }
            KeyerState::InDashB => {
                self.graph_state = KeyerState::AfterDashB;
                MarkKind::Dash
            }
            _ => return None,
        };
        self.decide_next(just_sent)
    }

    fn decide_next(&mut self, just_sent: MarkKind) -> Option<MarkKind> {
        let opposite_latched = match just_sent {
            MarkKind::Dot => self.dash_latch,
            MarkKind::Dash => self.dot_latch,
        };
        let both_held = self.dot_paddle && self.dash_paddle;

        let next = if opposite_latched {
            match just_sent {
                MarkKind::Dot => self.dash_latch = false,
                MarkKind::Dash => self.dot_latch = false,
            }
            Some(opposite(just_sent))
        } else if both_held {
            // Continuous squeeze: alternate regardless of which latched first.
            Some(opposite(just_sent))
        } else if self.same_paddle_held(just_sent) {
            Some(just_sent)
        } else if self.opposite_paddle_held(just_sent) {
            Some(opposite(just_sent))
        } else if self.curtis_b_latch {
            // Mode B remembers a past squeeze even after both paddles have
            // been released, and queues exactly one more opposite mark
            // that mode A would not send.
            self.curtis_b_latch = false;
            Some(opposite(just_sent))
        } else {
            None
        };

        self.graph_state = match next {
            Some(kind) => self.entry_state(kind),
            None => KeyerState::Idle,
        };
        next
    }

    fn same_paddle_held(&self, kind: MarkKind) -> bool {
        match kind {
            MarkKind::Dot => self.dot_paddle,
            MarkKind::Dash => self.dash_paddle,
        }
    }

    fn opposite_paddle_held(&self, kind: MarkKind) -> bool {
        match kind {
            MarkKind::Dot => self.dash_paddle,
            MarkKind::Dash => self.dot_paddle,
        }
    }
}

fn opposite(kind: MarkKind) -> MarkKind {
    match kind {
        MarkKind::Dot => MarkKind::Dash,
        MarkKind::Dash => MarkKind::Dot,
    }
}

enum KeyerMsg {
    Paddle(bool, bool),
    Shutdown,
}

/// Threaded iambic keyer driving a [`Generator`] from paddle events.
pub struct IambicKeyer {
    tx: mpsc::Sender<KeyerMsg>,
    handle: Option<JoinHandle<()>>,
}

impl IambicKeyer {
    pub fn new(generator: Arc<Generator>, curtis_mode_b: bool) -> Self {
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || run(generator, rx, curtis_mode_b));
        IambicKeyer {
            tx,
            handle: Some(handle),
        }
    }

    /// Report the current paddle state. Edge-sensitive; call on every
    /// transition, not just "interesting" ones.
    pub fn notify_paddle_event(&self, dot: bool, dash: bool) {
        let _ = self.tx.send(KeyerMsg::Paddle(dot, dash));
    }
}

impl Drop for IambicKeyer {
    fn drop(&mut self) {
        let _ = self.tx.send(KeyerMsg::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(generator: Arc<Generator>, rx: mpsc::Receiver<KeyerMsg>, curtis_mode_b: bool) {
    let mut core = IambicCore::new(curtis_mode_b);
    loop {
        let timeout = match core.state() {
            KeyerState::Idle => Duration::from_secs(3600),
            KeyerState::InDotA | KeyerState::InDotB => {
                let t = generator.current_timing();
                Duration::from_micros((t.dot_len_us + t.mark_space_us).max(0) as u64)
            }
            KeyerState::InDashA | KeyerState::InDashB => {
                let t = generator.current_timing();
                Duration::from_micros((t.dash_len_us + t.mark_space_us).max(0) as u64)
            }
            // After* states are never observed between loop iterations;
            // timer_expired() resolves them synchronously.
            _ => Duration::from_micros(1),
        };

        match rx.recv_timeout(timeout) {
            Ok(KeyerMsg::Paddle(dot, dash)) => {
                if let Some(kind) = core.notify_paddle_event(dot, dash) {
                    let _ = generator.enqueue_mark(kind, false);
                }
            }
            Ok(KeyerMsg::Shutdown) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if let Some(kind) = core.timer_expired() {
                    let _ = generator.enqueue_mark(kind, false);
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_with_no_paddles_stays_idle() {
        let mut core = IambicCore::new(false);
        assert_eq!(core.notify_paddle_event(false, false), None);
        assert_eq!(core.state(), KeyerState::Idle);
    }

    #[test]
    fn dot_paddle_starts_a_dot() {
        let mut core = IambicCore::new(false);
        assert_eq!(core.notify_paddle_event(true, false), Some(MarkKind::Dot));
        assert_eq!(core.state(), KeyerState::InDotA);
    }

    #[test]
    fn dash_paddle_starts_a_dash() {
        let mut core = IambicCore::new(false);
        assert_eq!(core.notify_paddle_event(false, true), Some(MarkKind::Dash));
        assert_eq!(core.state(), KeyerState::InDashA);
    }

    #[test]
    fn alternation_mode_a() {
        let mut core = IambicCore::new(false);
        assert_eq!(core.notify_paddle_event(true, true), Some(MarkKind::Dot));
        // both paddles remain held through the mark
        assert_eq!(core.timer_expired(), Some(MarkKind::Dash));
        assert_eq!(core.timer_expired(), Some(MarkKind::Dot));
        assert_eq!(core.timer_expired(), Some(MarkKind::Dash));
    }

    #[test]
    fn releasing_both_paddles_returns_to_idle() {
        let mut core = IambicCore::new(false);
        core.notify_paddle_event(true, false);
        core.notify_paddle_event(false, false);
        assert_eq!(core.timer_expired(), None);
        assert_eq!(core.state(), KeyerState::Idle);
    }

    #[test]
    fn curtis_mode_b_queues_one_extra_opposite_mark_after_release() {
        let mut core = IambicCore::new(true);
        // squeeze both paddles, then release before the dot's timer fires
        core.notify_paddle_event(true, false);
        core.notify_paddle_event(true, true); // squeeze arms curtis_b_latch
        core.notify_paddle_event(false, false); // release both
        // the opposite latch (armed by the dash edge) completes the pair first
        assert_eq!(core.timer_expired(), Some(MarkKind::Dash));
        // then Curtis B's remembered squeeze queues one more opposite mark,
        // even though no paddle is held anymore
        assert_eq!(core.timer_expired(), Some(MarkKind::Dot));
        assert_eq!(core.timer_expired(), None);
        assert_eq!(core.state(), KeyerState::Idle);
    }

    #[test]
    fn curtis_mode_a_does_not_queue_extra_mark_after_release() {
        let mut core = IambicCore::new(false);
        core.notify_paddle_event(true, false);
        core.notify_paddle_event(true, true);
        core.notify_paddle_event(false, false);
        // plain latch still completes the pair (dash), same as mode B
        assert_eq!(core.timer_expired(), Some(MarkKind::Dash));
        // but mode A has no memory of the squeeze, so it stops here
        assert_eq!(core.timer_expired(), None);
        assert_eq!(core.state(), KeyerState::Idle);
    }

    #[test]
    fn latch_set_during_mark_is_honored_once() {
        let mut core = IambicCore::new(false);
        core.notify_paddle_event(true, false); // start dot
        core.notify_paddle_event(true, true); // dash latch arms mid-mark
        assert_eq!(core.timer_expired(), Some(MarkKind::Dash));
        core.notify_paddle_event(false, false); // release before dash finishes
        assert_eq!(core.timer_expired(), None);
    }
}
