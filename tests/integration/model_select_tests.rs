//! Host command → model selector → relay output.

use pneujig::app::events::AppEvent;
use pneujig::fsm::Phase;
use pneujig::model::{AdcPair, ModelId};
use pneujig::safety::StopLatch;

use super::mock_hw::{raw_for, Jig};

#[test]
fn lowercase_command_switches_profile_and_relay() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);
    assert!(jig.relay_on());
    let writes = jig.write_count();

    jig.feed(b"model=dj9600269a\n");

    assert_eq!(jig.app.active_model(), ModelId::Dj9600269a);
    assert_eq!(jig.app.active_profile().adc_pair, AdcPair::Second);
    assert!(!jig.relay_on());
    assert_eq!(jig.write_count(), writes + 1, "relay written immediately");
    assert_eq!(
        jig.sink.lines(),
        vec!["ACK MODEL=DJ9600269A RELAY=OFF ADCPAIR=3-4"]
    );
}

#[test]
fn unknown_commands_change_nothing() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);
    let writes = jig.write_count();

    jig.feed(b"MODEL=DJ0000000X\n");
    jig.feed(b"hello\r\n");
    jig.feed(b"\n\n");

    assert_eq!(jig.app.active_model(), ModelId::Dj9600267a);
    assert!(jig.relay_on());
    assert_eq!(jig.write_count(), writes);
    assert!(jig.sink.lines().is_empty());
}

#[test]
fn command_split_across_reads_with_crlf() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    jig.feed(b"  MODEL=DJ96");
    assert_eq!(jig.app.active_model(), ModelId::Dj9600267a);
    jig.feed(b"00269A  \r\n");

    assert_eq!(jig.app.active_model(), ModelId::Dj9600269a);
    assert_eq!(jig.sink.lines().len(), 1, "CR and LF end a single line");
}

#[test]
fn overlong_line_is_dropped_whole() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    let mut noise = vec![b'x'; 60];
    noise.extend_from_slice(b"MODEL=DJ9600269A\n");
    jig.feed(&noise);
    assert_eq!(jig.app.active_model(), ModelId::Dj9600267a);

    jig.feed(b"MODEL=DJ9600269A\n");
    assert_eq!(jig.app.active_model(), ModelId::Dj9600269a);
}

#[test]
fn reselecting_same_model_acks_without_bus_traffic() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);
    let writes = jig.write_count();

    jig.feed(b"MODEL=DJ9600267A\n");

    assert_eq!(jig.write_count(), writes);
    assert_eq!(
        jig.sink.lines(),
        vec!["ACK MODEL=DJ9600267A RELAY=ON ADCPAIR=1-2"]
    );
    assert!(jig
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::ModelSelected(p) if p.id == ModelId::Dj9600267a)));
}

#[test]
fn switch_back_restores_relay() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    jig.feed(b"MODEL=DJ9600269A\nMODEL=DJ9600267A\n");

    assert_eq!(jig.app.active_model(), ModelId::Dj9600267a);
    assert!(jig.relay_on());
    assert_eq!(jig.sink.lines().len(), 2);
}

#[test]
fn second_model_evaluates_its_own_channel_pair() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);
    // Pair 1-2 in range, pair 3-4 channel B far out of range.
    jig.adc.raw[3] = raw_for(4000);

    jig.feed(b"MODEL=DJ9600269A\n");
    let t = jig.press_start();
    jig.run_until(t + 3501);

    assert_eq!(jig.sink.lines().last(), Some(&"NG:data=0,0,0,0,1"));
    assert!(jig.adc.reads.iter().all(|&ch| ch == 2 || ch == 3));
    let result = jig.app.last_result().copied();
    assert_eq!(result.map(|r| r.model()), Some(ModelId::Dj9600269a));
}

#[test]
fn selection_mid_sequence_keeps_sequence_running() {
    static LATCH: StopLatch = StopLatch::new();
    let mut jig = Jig::new(&LATCH);

    let t = jig.press_start();
    jig.run_until(t + 1200);
    jig.feed(b"MODEL=DJ9600269A\n");

    assert_eq!(jig.app.phase(), Phase::Active);
    assert_eq!(jig.solenoids(), [true, true, false, false]);
    assert!(!jig.relay_on());

    jig.run_until(t + 3501);
    assert_eq!(jig.app.phase(), Phase::Result);
    assert_eq!(
        jig.app.last_result().map(|r| r.model()),
        Some(ModelId::Dj9600269a)
    );
}
