use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cw_engine::generator::Generator;
use cw_engine::keyer::{IambicCore, IambicKeyer, KeyerState};
use cw_engine::sink::{NullSink, Sink};

#[test]
fn squeeze_then_hold_dot_repeats_dots() {
    let mut core = IambicCore::new(false);
    assert_eq!(core.notify_paddle_event(true, false), Some(cw_engine::MarkKind::Dot));
    assert_eq!(core.timer_expired(), Some(cw_engine::MarkKind::Dot));
    assert_eq!(core.timer_expired(), Some(cw_engine::MarkKind::Dot));
    assert_eq!(core.state(), KeyerState::InDotA);
}

#[test]
fn curtis_mode_b_can_be_toggled_after_construction() {
    let mut core = IambicCore::new(false);
    core.set_curtis_mode_b(true);
    core.notify_paddle_event(true, false);
    core.notify_paddle_event(true, true);
    core.notify_paddle_event(false, false);
    assert_eq!(core.timer_expired(), Some(cw_engine::MarkKind::Dash));
    // mode B was enabled before the squeeze, so the remembered extra mark fires
    assert_eq!(core.timer_expired(), Some(cw_engine::MarkKind::Dot));
}

#[test]
fn threaded_keyer_enqueues_marks_onto_the_generator() {
    let gen = Arc::new(Generator::new(|| Box::new(NullSink::new(8_000, 64)) as Box<dyn Sink>));
    gen.start(None).unwrap();
    gen.set_speed(60).unwrap();

    let keyer = IambicKeyer::new(gen.clone(), false);
    keyer.notify_paddle_event(true, false);
    // Let the dot complete and the keyer return to idle.
    thread::sleep(Duration::from_millis(100));
    keyer.notify_paddle_event(false, false);
    drop(keyer);

    gen.wait_for_level(0);
    assert_eq!(gen.queue_len(), 0);
}
