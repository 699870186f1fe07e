//! End-to-end sequencing through JigService → Sequencer → real expander
//! driver → mock bus.
//!
//! Default timing: offsets 2000/3000/3500/3500 ms, so after START at `T`
//! solenoid 2 joins at `T+1000`, solenoid 3 at `T+1500`, solenoid 4 at
//! `T+1501` (minimum gap), the settle delay ends at `T+3501` and the result
//! hold at `T+5501`.

use pneujig::fsm::{Phase, SequencerTimer};
use pneujig::safety::StopLatch;

use super::mock_hw::{raw_for, Jig};

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_releases_everything_and_applies_default_relay() {
    static LATCH: StopLatch = StopLatch::new();
    let jig = Jig::new(&LATCH);

    let st = jig.bus.borrow();
    assert_eq!(st.input_release_writes, 1);
    // Released word, then the default model's relay in one more write.
    let words: Vec<u16> = st.output_writes.iter().map(|(_, w)| *w).collect();
    assert_eq!(words, vec![0xFFFF, 0xFF7F]);
    drop(st);

    assert_eq!(jig.app.phase(), Phase::Idle);
    assert_eq!(jig.solenoids(), [false; 4]);
    assert!(jig.relay_on());
}

// ── Cumulative actuation and pass report ─────────────────────

#[test]
fn full_cycle_reports_ok_and_returns_to_idle() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    let t = jig.press_start();
    assert_eq!(jig.app.phase(), Phase::Active);
    assert_eq!(jig.solenoids(), [true, false, false, false]);
    assert!(jig.buzzer_on(), "start beep");

    jig.run_until(t + 60);
    assert!(!jig.buzzer_on(), "start beep over");

    jig.run_until(t + 999);
    assert_eq!(jig.solenoids(), [true, false, false, false]);
    jig.run_until(t + 1000);
    assert_eq!(jig.solenoids(), [true, true, false, false]);

    jig.run_until(t + 1500);
    assert_eq!(jig.solenoids(), [true, true, true, false]);
    jig.run_until(t + 1501);
    assert_eq!(jig.solenoids(), [true; 4]);
    assert_eq!(jig.app.step(), 3);

    jig.run_until(t + 3500);
    assert_eq!(jig.app.phase(), Phase::Active, "still settling");
    jig.run_until(t + 3501);
    assert_eq!(jig.app.phase(), Phase::Result);
    assert_eq!(jig.sink.lines(), vec!["START", "OK:data=0,0,0,0,0"]);
    assert!(jig.pass_led());
    assert!(!jig.fail_led());
    assert!(jig.buzzer_on(), "pass beep");
    assert!(jig.app.last_result().is_some_and(|r| r.overall_ok()));

    jig.run_until(t + 3501 + 120);
    assert!(!jig.buzzer_on());

    // Hold elapsed: 2–4 released together, solenoid 1 a second later.
    jig.run_until(t + 5501);
    assert_eq!(jig.app.phase(), Phase::Idle);
    assert_eq!(jig.solenoids(), [true, false, false, false]);
    assert!(jig.pass_led(), "verdict stays latched in Idle");

    jig.run_until(t + 6500);
    assert!(jig.solenoid_on(1));
    jig.run_until(t + 6501);
    assert_eq!(jig.solenoids(), [false; 4]);
    assert_eq!(jig.app.scheduler().armed_count(), 0);
}

#[test]
fn channel_a_out_of_range_reports_ng() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);
    jig.adc.raw[0] = raw_for(100);

    let t = jig.press_start();
    jig.run_until(t + 3501);

    assert_eq!(jig.sink.lines(), vec!["START", "NG:data=0,0,0,1,0"]);
    assert!(jig.fail_led());
    assert!(!jig.pass_led());
    assert!(jig.buzzer_on());

    // Fail beep is long.
    jig.run_until(t + 3501 + 1999);
    assert!(jig.buzzer_on());
    jig.run_until(t + 3501 + 2000);
    assert!(!jig.buzzer_on());
}

#[test]
fn unsensed_target_reports_sensor_field() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);
    // Sensor 2 high: target not present.
    jig.bus.borrow_mut().input_word = 0xFFFA;

    let t = jig.press_start();
    jig.run_until(t + 3501);
    assert_eq!(jig.sink.lines().last(), Some(&"NG:data=0,1,0,0,0"));
}

#[test]
fn missing_converter_fails_both_channels() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);
    jig.adc.ready = false;

    let t = jig.press_start();
    jig.run_until(t + 3501);
    assert_eq!(jig.sink.lines().last(), Some(&"NG:data=0,0,0,1,1"));
}

#[test]
fn window_edges_with_hysteresis_pass() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);
    // Channel A at min − hysteresis, channel B at max + hysteresis.
    jig.adc.raw[0] = raw_for(980);
    jig.adc.raw[1] = raw_for(3615);

    let t = jig.press_start();
    jig.run_until(t + 3501);
    assert_eq!(jig.sink.lines().last(), Some(&"OK:data=0,0,0,0,0"));
}

// ── Idle re-entrancy ─────────────────────────────────────────

#[test]
fn start_while_active_changes_nothing() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    let t = jig.press_start();
    jig.run_until(t + 200);
    let writes = jig.write_count();
    let step_timer = jig.app.sequencer().timer_id(SequencerTimer::Step);

    let again = jig.press_start();
    assert_eq!(jig.write_count(), writes, "no output touched");
    assert_eq!(jig.app.phase(), Phase::Active);
    assert_eq!(jig.app.step(), 0);
    assert_eq!(
        jig.app.scheduler().remaining_ms(step_timer, again),
        Some(1000 - (again - t)),
        "step timer not re-armed"
    );
    assert_eq!(jig.sink.lines(), vec!["START"]);
}

#[test]
fn start_during_result_hold_is_ignored() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    let t = jig.press_start();
    jig.run_until(t + 4000);
    assert_eq!(jig.app.phase(), Phase::Result);
    let writes = jig.write_count();

    jig.press_start();
    assert_eq!(jig.app.phase(), Phase::Result);
    assert_eq!(jig.write_count(), writes);

    // Hold still ends when first scheduled.
    jig.run_until(t + 5501);
    assert_eq!(jig.app.phase(), Phase::Idle);
}

#[test]
fn next_start_clears_latched_verdict() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    let t = jig.press_start();
    jig.run_until(t + 7000);
    assert!(jig.pass_led());

    jig.press_start();
    assert_eq!(jig.app.phase(), Phase::Active);
    assert!(!jig.pass_led());
    assert!(!jig.fail_led());
    assert_eq!(jig.solenoids(), [true, false, false, false]);
}

// ── Stop ordering ────────────────────────────────────────────

#[test]
fn stop_releases_trailing_before_first_in_every_phase() {
    // (offset after START, solenoids on at that moment)
    let cases: [(u32, usize); 5] = [(500, 1), (1200, 2), (1500, 3), (2500, 4), (4000, 4)];

    for (offset, on_count) in cases {
        static LATCH: StopLatch = StopLatch::new();
        let mut jig = Jig::new(&LATCH);

        let t = jig.press_start();
        jig.run_until(t + offset);
        let before = jig.solenoids();
        assert_eq!(before.iter().filter(|&&on| on).count(), on_count);

        let c = jig.press_stop();
        assert_eq!(jig.app.phase(), Phase::Idle, "offset {offset}");
        assert_eq!(jig.sink.lines().last(), Some(&"STOP"));
        assert!(!jig.pass_led() && !jig.fail_led() && !jig.buzzer_on());

        jig.run_until(c + 1000);
        for n in 2..=on_count {
            assert_eq!(jig.solenoid_off_at(n, c), Some(c), "solenoid {n}, offset {offset}");
        }
        assert_eq!(jig.solenoid_off_at(1, c), Some(c + 1000), "offset {offset}");
        assert_eq!(jig.solenoids(), [false; 4]);
        assert_eq!(jig.app.scheduler().armed_count(), 0);
    }
}

#[test]
fn stop_cancels_pending_evaluation() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    let t = jig.press_start();
    jig.run_until(t + 2000);
    jig.press_stop();
    jig.run_until(t + 8000);

    assert_eq!(jig.sink.lines(), vec!["START", "STOP"]);
    assert!(jig.app.last_result().is_none());
    assert_eq!(jig.app.phase(), Phase::Idle);
}

#[test]
fn stop_bounce_without_held_line_is_ignored() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    let t = jig.press_start();
    jig.run_until(t + 300);

    // Edge latched but the line is already back high.
    LATCH.raise();
    jig.run_until(t + 400);
    assert_eq!(jig.app.phase(), Phase::Active);
    assert_eq!(jig.sink.lines(), vec!["START"]);
}

#[test]
fn held_stop_fires_once() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    jig.press_start();
    LATCH.raise();
    jig.inputs.stop_asserted = true;
    let held_until = jig.now + 500;
    jig.run_until(held_until);
    assert!(jig.app.stop_held());

    // A bounce while held does not count as a second press.
    LATCH.raise();
    jig.run_until(held_until + 100);
    let stops = jig.sink.lines().iter().filter(|l| **l == "STOP").count();
    assert_eq!(stops, 1);
}

// ── Batching through the real driver ─────────────────────────

#[test]
fn each_step_is_a_single_bus_write() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    let t = jig.press_start();
    jig.run_until(t + 3000);

    let st = jig.bus.borrow();
    for at in [t + 1000, t + 1500, t + 1501] {
        let n = st.output_writes.iter().filter(|(at_ms, _)| *at_ms == at).count();
        assert_eq!(n, 1, "writes at {at}");
    }
}

#[test]
fn stop_from_last_step_releases_three_in_one_write() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    let t = jig.press_start();
    jig.run_until(t + 2000);
    let c = jig.press_stop();

    let st = jig.bus.borrow();
    let at_c: Vec<u16> = st
        .output_writes
        .iter()
        .filter(|(at_ms, _)| *at_ms == c)
        .map(|(_, word)| *word)
        .collect();
    assert_eq!(at_c.len(), 1);
    // Solenoid 1 still driven low, 2–4 released high.
    assert_eq!(at_c[0] & 0x000F, 0b1110);
}

#[test]
fn failed_write_is_carried_by_the_next_one() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    let t = jig.press_start();
    jig.run_until(t + 999);
    jig.bus.borrow_mut().fail_writes = 1;
    jig.run_until(t + 1000);
    assert_eq!(jig.hw.bus_failures(), 1);
    assert!(!jig.solenoid_on(2), "write was NACKed");

    jig.run_until(t + 1500);
    assert_eq!(jig.solenoids(), [true, true, true, false]);
}

// ── Input polling ────────────────────────────────────────────

#[test]
fn inputs_are_polled_on_the_configured_interval() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    jig.run_until(100);
    // Polled on the first pass, then every 10 ms.
    assert_eq!(jig.bus.borrow().input_reads, 10);
}

#[test]
fn failed_input_reads_keep_last_snapshot() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    jig.run_until(20);
    jig.bus.borrow_mut().fail_reads = u32::MAX;
    jig.bus.borrow_mut().input_word = 0xFFFF;

    let t = jig.press_start();
    jig.run_until(t + 3501);
    assert_eq!(jig.sink.lines().last(), Some(&"OK:data=0,0,0,0,0"));
    assert!(jig.hw.bus_failures() > 0);
}
