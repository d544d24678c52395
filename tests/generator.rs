use std::sync::Arc;
use std::time::Duration;

use cw_engine::generator::Generator;
use cw_engine::sink::{NullSink, Sink};
use cw_engine::CwError;

fn headless_generator() -> Generator {
    let gen = Generator::new(|| Box::new(NullSink::new(8_000, 64)) as Box<dyn Sink>);
    gen.start(None).unwrap();
    gen.set_speed(60).unwrap();
    gen
}

#[test]
fn start_negotiates_sample_rate_from_the_sink() {
    let gen = headless_generator();
    assert_eq!(gen.sample_rate(), 8_000);
}

#[test]
fn starting_twice_is_rejected() {
    let gen = headless_generator();
    assert!(matches!(gen.start(None), Err(CwError::Busy(_))));
}

#[test]
fn out_of_range_speed_is_rejected_and_leaves_state_untouched() {
    let gen = headless_generator();
    assert!(gen.set_speed(1000).is_err());
    assert!(gen.set_frequency(50_000).is_err());
    assert!(gen.set_volume(200).is_err());
}

#[test]
fn enqueuing_a_string_drains_through_a_null_sink() {
    let gen = headless_generator();
    gen.enqueue_string("SOS").unwrap();
    assert!(gen.queue_len() > 0);
    gen.wait_for_level(0);
    assert_eq!(gen.queue_len(), 0);
}

#[test]
fn flush_empties_the_queue_without_waiting_for_drain() {
    let gen = Generator::new(|| Box::new(NullSink::new(8_000, 64)) as Box<dyn Sink>);
    // Deliberately not started: nothing drains the queue, so flush must be
    // the only thing clearing it.
    gen.set_speed(4).unwrap();
    gen.enqueue_string("PARIS PARIS PARIS").unwrap();
    assert!(gen.queue_len() > 0);
    gen.flush();
    assert_eq!(gen.queue_len(), 0);
}

#[test]
fn low_water_callback_fires_once_per_crossing() {
    let gen = Arc::new(Generator::new(|| Box::new(NullSink::new(8_000, 64)) as Box<dyn Sink>));
    gen.start(None).unwrap();
    gen.set_speed(60).unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    gen.set_low_water_callback(2, move |level| {
        let _ = tx.send(level);
    });

    gen.enqueue_string("E").unwrap(); // one short mark + one space tone
    gen.wait_for_level(0);

    let fired = rx.recv_timeout(Duration::from_secs(2));
    assert!(fired.is_ok());
}

#[test]
fn backspace_removes_the_most_recently_begun_character() {
    let gen = Generator::new(|| Box::new(NullSink::new(8_000, 64)) as Box<dyn Sink>);
    gen.set_speed(20).unwrap();
    gen.enqueue_string("E").unwrap();
    let len_after_e = gen.queue_len();
    gen.enqueue_string("T").unwrap();
    assert!(gen.queue_len() > len_after_e);
    gen.backspace();
    assert_eq!(gen.queue_len(), len_after_e);
}

#[test]
fn begin_mark_enqueues_a_single_forever_tone() {
    let gen = Generator::new(|| Box::new(NullSink::new(8_000, 64)) as Box<dyn Sink>);
    gen.enqueue_begin_mark().unwrap();
    assert_eq!(gen.queue_len(), 1);
    gen.enqueue_begin_space().unwrap();
    assert_eq!(gen.queue_len(), 2);
}
