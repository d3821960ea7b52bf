//! Whole-cycle tests against a simulated board.


use embedded_hal_mock::eh1::delay::NoopDelay;
use raingauge::analog::AnalogSampler;
use raingauge::consts::{FRAME_LEN, SYNC_WORD, TX_FREQUENCY_HZ, TX_POLL_ATTEMPTS};
use raingauge::cycle::{CycleState, PowerCycle};
use raingauge::frame::{DeviceIdentity, decode};
use raingauge::platform::{PinRole, SleepLevel, WakeReason, sleep_level};
use raingauge::radio::{TxOutcome, TxSequencer};
use raingauge::tips::TipCounter;
use sim_board::{
    ActivityLed, FaultLed, PIN_MAP, Shared, SimAdc, SimIrq, SimPlatform, SimRadio, TIP_PIN, board,
    tip,
};

type Gauge = PowerCycle<
    'static,
    SimPlatform,
    SimAdc,
    SimRadio,
    ActivityLed,
    SimIrq,
    FaultLed,
    NoopDelay,
>;

fn gauge(board: &Shared, tips: &'static TipCounter) -> Gauge {
    PowerCycle::new(
        SimPlatform {
            board: board.clone(),
            tips,
        },
        AnalogSampler::new(SimAdc(board.clone())),
        TxSequencer::new(SimRadio(board.clone()), ActivityLed(board.clone())),
        SimIrq(board.clone()),
        FaultLed(board.clone()),
        NoopDelay::new(),
        tips,
    )
}

fn assert_quiesced(board: &Shared) {
    let b = board.borrow();
    for (index, role) in PIN_MAP.into_iter().enumerate() {
        assert_eq!(b.pins[index], sleep_level(role), "pin {index} ({role:?})");
    }
    assert!(!b.clocks_on);
    assert!(!b.adc_on);
    assert!(!b.activity_led);
    assert!(!b.fault_led);
}

#[test]
fn test_first_cycle_sends_decodable_frame() {
    static TIPS: TipCounter = TipCounter::new();
    let board = board();
    let mut gauge = gauge(&board, &TIPS);

    let report = gauge.run_cycle();

    let b = board.borrow();
    assert_eq!(b.radio_config, Some((TX_FREQUENCY_HZ, SYNC_WORD)));
    assert_eq!(b.sent.len(), 1);
    assert_eq!(b.sent[0].len(), FRAME_LEN);
    let telemetry = decode(&b.sent[0]).unwrap();
    assert_eq!(telemetry.identity, DeviceIdentity::DEPLOYED);
    assert_eq!(telemetry.snapshot.battery, 600);
    assert_eq!(telemetry.snapshot.temperature, 450);
    assert_eq!(telemetry.snapshot.tips, 0);
    assert_eq!(telemetry.snapshot.sequence, 0);
    assert!(!b.radio_awake);

    let tx = report.transmission.unwrap();
    assert_eq!(tx.sequence, 0);
    assert!(tx.radio_asleep);
    assert!(matches!(tx.outcome, TxOutcome::Completed { flags: 0x08, polls: 1 }));
}

#[test]
fn test_tips_during_sleep_reach_next_frame() {
    static TIPS: TipCounter = TipCounter::new();
    let board = board();
    let mut gauge = gauge(&board, &TIPS);
    board.borrow_mut().edges_in_sleep = 3;

    let first = gauge.run_cycle();
    assert_eq!(first.wake, Some(WakeReason::TipEdge));
    let _ = gauge.run_cycle();

    let b = board.borrow();
    let second = decode(&b.sent[1]).unwrap().snapshot;
    assert_eq!(second.tips, 3);
    assert_eq!(second.sequence, 1);
    assert_eq!(gauge.message_count(), 2);
}

#[test]
fn test_tip_count_never_decreases() {
    static TIPS: TipCounter = TipCounter::new();
    let board = board();
    let mut gauge = gauge(&board, &TIPS);

    for edges in [2, 0, 5, 1] {
        board.borrow_mut().edges_in_sleep = edges;
        let _ = gauge.run_cycle();
    }
    let _ = gauge.run_cycle();

    let b = board.borrow();
    let tips: Vec<u32> = b
        .sent
        .iter()
        .map(|bytes| decode(bytes).unwrap().snapshot.tips)
        .collect();
    assert_eq!(tips, [0, 2, 2, 7, 8]);
    let sequences: Vec<u32> = b
        .sent
        .iter()
        .map(|bytes| decode(bytes).unwrap().snapshot.sequence)
        .collect();
    assert_eq!(sequences, [0, 1, 2, 3, 4]);
}

#[test]
fn test_quiesce_leaves_only_tip_line_awake() {
    static TIPS: TipCounter = TipCounter::new();
    let board = board();
    let mut gauge = gauge(&board, &TIPS);

    let mut state = CycleState::BringUp;
    while state != CycleState::Sleep {
        state = gauge.step(state);
    }

    assert_quiesced(&board);
    assert_eq!(board.borrow().pins[TIP_PIN], SleepLevel::Input);
    assert_eq!(PIN_MAP[TIP_PIN], PinRole::TipInput);

    // The bucket tips while the core is parked.
    board.borrow_mut().edges_in_sleep = 1;
    assert_eq!(gauge.step(state), CycleState::BringUp);
    assert_eq!(TIPS.snapshot(), 1);
    assert!(!board.borrow().tip_pending);
}

#[test]
fn test_sleep_without_edge_is_not_a_tip_wake() {
    static TIPS: TipCounter = TipCounter::new();
    let board = board();
    let mut gauge = gauge(&board, &TIPS);

    let report = gauge.run_cycle();

    assert_eq!(report.wake, Some(WakeReason::Other));
    assert_eq!(TIPS.snapshot(), 0);
}

#[test]
fn test_tip_after_quiesce_wakes_the_node() {
    static TIPS: TipCounter = TipCounter::new();
    let board = board();
    let mut gauge = gauge(&board, &TIPS);
    board.borrow_mut().edges_in_sleep = 1;

    let report = gauge.run_cycle();

    assert_eq!(report.wake, Some(WakeReason::TipEdge));
    assert_eq!(TIPS.snapshot(), 1);
}

#[test]
fn test_configured_identity_is_sent() {
    static TIPS: TipCounter = TipCounter::new();
    let board = board();
    let identity = DeviceIdentity {
        device_type: [0x00, 0x01],
        address: [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88],
        firmware: 0x08,
    };
    let mut gauge = gauge(&board, &TIPS).with_identity(identity);

    let _ = gauge.run_cycle();

    let b = board.borrow();
    assert_eq!(
        &b.sent[0][1..11],
        &[0x00, 0x01, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]
    );
    assert_eq!(b.sent[0][11], 0x08);
    assert_eq!(decode(&b.sent[0]).unwrap().identity, identity);
}

#[test]
fn test_low_battery_skips_radio() {
    static TIPS: TipCounter = TipCounter::new();
    let board = board();
    board.borrow_mut().battery = 499;
    let mut gauge = gauge(&board, &TIPS);

    let report = gauge.run_cycle();

    assert_eq!(report.snapshot.map(|s| s.battery), Some(499));
    assert_eq!(report.transmission, None);
    let b = board.borrow();
    assert!(b.sent.is_empty());
    assert_eq!(b.radio_config, None);
    assert_eq!(b.fault_flashes, 3);
    drop(b);
    assert_quiesced(&board);
    assert_eq!(gauge.message_count(), 0);
}

#[test]
fn test_battery_at_threshold_transmits() {
    static TIPS: TipCounter = TipCounter::new();
    let board = board();
    board.borrow_mut().battery = 500;
    let mut gauge = gauge(&board, &TIPS);

    let report = gauge.run_cycle();

    assert!(report.transmission.is_some());
    assert_eq!(board.borrow().sent.len(), 1);
    assert_eq!(board.borrow().fault_flashes, 0);
}

#[test]
fn test_silent_radio_still_sleeps() {
    static TIPS: TipCounter = TipCounter::new();
    let board = board();
    board.borrow_mut().radio_responds = false;
    let mut gauge = gauge(&board, &TIPS);

    let report = gauge.run_cycle();

    let tx = report.transmission.unwrap();
    assert_eq!(tx.outcome, TxOutcome::TimedOut);
    assert!(tx.radio_asleep);
    let b = board.borrow();
    assert_eq!(b.status_reads, u32::from(TX_POLL_ATTEMPTS));
    assert!(!b.radio_awake);
    drop(b);
    assert_quiesced(&board);

    // The next cycle still carries the next sequence number.
    board.borrow_mut().radio_responds = true;
    let _ = gauge.run_cycle();
    assert_eq!(decode(&board.borrow().sent[1]).unwrap().snapshot.sequence, 1);
}

#[test]
fn test_edge_before_bring_up_is_not_counted() {
    static TIPS: TipCounter = TipCounter::new();
    let board = board();
    let _gauge = gauge(&board, &TIPS);

    tip(&board, &TIPS);

    assert_eq!(TIPS.snapshot(), 0);
}
