//! End-to-end scenarios through the full firmware stack: loopback
//! transport → protocol parser → ring queue → motion controller →
//! simulated steppers and endstop.

use sandplot_common::config::FirmwareConfig;
use sandplot_common::hal::Axis;
use sandplot_common::wire::{HEADER, Opcode};
use sandplot_firmware::firmware::Firmware;
use sandplot_firmware::motion::MotionState;
use sandplot_firmware::queue::QUEUE_CAPACITY;
use sandplot_firmware::sim::{LoopbackTransport, SimEndstop, SimStepperBank, sim_rig};

fn frame(opcode: Opcode) -> Vec<u8> {
    vec![HEADER[0], HEADER[1], opcode.wire()]
}

fn position_frame(r: i32, phi: i32) -> Vec<u8> {
    let mut bytes = frame(Opcode::Position);
    bytes.extend_from_slice(&r.to_be_bytes());
    bytes.extend_from_slice(&phi.to_be_bytes());
    bytes
}

fn speed_frame(speed: u16) -> Vec<u8> {
    let mut bytes = frame(Opcode::Speed);
    bytes.extend_from_slice(&speed.to_be_bytes());
    bytes
}

fn test_config() -> FirmwareConfig {
    FirmwareConfig {
        r_min_steps: 0,
        r_max_steps: 1_000,
        r_home_offset_steps: 0,
        homing_speed: -600.0,
        initial_speed: 800.0,
        tick_interval_us: 1_000,
    }
}

fn firmware(start_r: i32) -> Firmware<LoopbackTransport, SimStepperBank, SimEndstop> {
    let (steppers, endstop) = sim_rig(start_r);
    Firmware::new(&test_config(), LoopbackTransport::new(), steppers, endstop)
}

/// Run ticks until the firmware settles or the budget runs out.
fn run_until_settled(fw: &mut Firmware<LoopbackTransport, SimStepperBank, SimEndstop>, budget: u32) {
    for _ in 0..budget {
        fw.tick();
        if fw.is_settled() {
            return;
        }
    }
    panic!("firmware did not settle within {budget} ticks");
}

#[test]
fn position_frame_acks_and_increments_occupancy() {
    let mut fw = firmware(50);
    fw.transport_mut().push_bytes(&position_frame(100, 50));

    fw.tick();

    assert_eq!(fw.transport_mut().take_tx(), frame(Opcode::Ack));
    assert_eq!(fw.queue().occupancy(), 1);
}

#[test]
fn queue_backpressure_reports_full_and_preserves_framing() {
    // Keep the controller busy homing so nothing drains while we flood.
    let mut fw = firmware(10_000);

    for i in 0..(QUEUE_CAPACITY - 1) as i32 {
        fw.transport_mut().push_bytes(&position_frame(i, i));
        fw.tick();
        assert_eq!(fw.transport_mut().take_tx(), frame(Opcode::Ack));
    }
    assert_eq!(fw.queue().occupancy() as usize, QUEUE_CAPACITY - 1);

    // One more: rejected with QueueFull, occupancy unchanged, and the
    // 8 payload bytes fully consumed from the stream.
    fw.transport_mut().push_bytes(&position_frame(777, 777));
    fw.tick();
    assert_eq!(fw.transport_mut().take_tx(), frame(Opcode::QueueFull));
    assert_eq!(fw.queue().occupancy() as usize, QUEUE_CAPACITY - 1);
    assert_eq!(fw.transport_mut().bytes_available_rx(), 0);

    // Framing intact: a depth query still parses and answers.
    fw.transport_mut().push_bytes(&frame(Opcode::QueryQueueDepth));
    fw.tick();
    let mut expected = frame(Opcode::QueueDepthReply);
    expected.push((QUEUE_CAPACITY - 1) as u8);
    assert_eq!(fw.transport_mut().take_tx(), expected);
}

#[test]
fn homing_establishes_origin_then_moves() {
    let mut fw = firmware(40);
    assert_eq!(fw.motion().state(), MotionState::Homing);

    // 40 steps to the switch, one per tick, then the completion tick.
    for _ in 0..41 {
        fw.tick();
    }
    assert!(fw.motion().is_homed());
    assert_eq!(fw.motion().state(), MotionState::Moving);
    assert_eq!(fw.motion().steppers().position(Axis::R), 0);
    assert_eq!(fw.motion().steppers().position(Axis::Phi), 0);
}

#[test]
fn garbage_prefix_resynchronizes_on_next_header() {
    let mut fw = firmware(50);
    let mut bytes = vec![0xFF, 0x13, HEADER[0], 0x99, 0x00];
    bytes.extend_from_slice(&position_frame(10, 20));
    fw.transport_mut().push_bytes(&bytes);

    fw.tick();

    assert_eq!(fw.transport_mut().take_tx(), frame(Opcode::Ack));
    assert_eq!(fw.queue().occupancy(), 1);
}

#[test]
fn full_session_homes_moves_and_accumulates_phi() {
    let mut fw = firmware(25);
    run_until_settled(&mut fw, 100); // boot homing establishes the origin
    assert!(fw.motion().is_homed());

    let mut session = frame(Opcode::Home);
    session.extend_from_slice(&speed_frame(500));
    session.extend_from_slice(&position_frame(30, 40));
    session.extend_from_slice(&position_frame(2_000, -15)); // r clamps to 1000
    session.extend_from_slice(&frame(Opcode::Start));
    fw.transport_mut().push_bytes(&session);

    run_until_settled(&mut fw, 5_000);

    // Both targets consumed; phi accumulated 40 + (-15), r clamped.
    assert_eq!(fw.stats().targets_drained, 2);
    assert_eq!(fw.motion().target().r, 1_000);
    assert_eq!(fw.motion().target().phi, 25);
    assert_eq!(fw.motion().steppers().position(Axis::R), 1_000);
    assert_eq!(fw.motion().steppers().position(Axis::Phi), 25);
    assert_eq!(fw.motion().state(), MotionState::Finished);
    // home + speed + 2 positions + start, each answered exactly once.
    assert_eq!(fw.parser().commands_completed(), 5);
}

#[test]
fn clear_discards_queue_and_halts() {
    let mut fw = firmware(500); // long homing keeps the queue untouched
    fw.transport_mut().push_bytes(&position_frame(10, 0));
    fw.transport_mut().push_bytes(&position_frame(20, 0));
    fw.tick();
    assert_eq!(fw.queue().occupancy(), 2);

    fw.transport_mut().push_bytes(&frame(Opcode::Clear));
    fw.tick();

    assert!(fw.queue().is_empty());
    assert_eq!(fw.motion().state(), MotionState::Idle);

    // The clear interrupted boot homing, so fresh positions queue up but
    // stay parked: motion must not start from an unestablished origin.
    fw.transport_mut().push_bytes(&position_frame(5, 5));
    fw.tick();
    fw.tick();
    assert_eq!(fw.queue().occupancy(), 1);
    assert_eq!(fw.motion().state(), MotionState::Idle);
    assert_eq!(fw.stats().targets_drained, 0);

    // A homing pass establishes the origin; the parked target then drains
    // and motion runs to completion.
    fw.transport_mut().push_bytes(&frame(Opcode::Home));
    run_until_settled(&mut fw, 1_000);
    assert!(fw.motion().is_homed());
    assert_eq!(fw.stats().targets_drained, 1);
    assert_eq!(fw.motion().steppers().position(Axis::R), 5);
    assert_eq!(fw.motion().steppers().position(Axis::Phi), 5);
}

#[test]
fn speed_command_applies_to_both_axes() {
    let mut fw = firmware(0);
    fw.transport_mut().push_bytes(&speed_frame(350));
    fw.tick();

    assert_eq!(fw.transport_mut().take_tx(), frame(Opcode::Ack));
    assert_eq!(fw.motion().steppers().max_speed(Axis::R), 350.0);
    assert_eq!(fw.motion().steppers().max_speed(Axis::Phi), 350.0);
}

#[test]
fn rehome_after_session() {
    let mut fw = firmware(8);
    run_until_settled(&mut fw, 100); // initial homing + zero move

    fw.transport_mut().push_bytes(&position_frame(6, 0));
    run_until_settled(&mut fw, 100);
    assert_eq!(fw.motion().steppers().position(Axis::R), 6);

    // Host asks for a fresh homing pass: the carriage drives back to the
    // switch, the origin is re-established, and the standing target is
    // re-issued, so the carriage ends up back at r = 6.
    fw.transport_mut().push_bytes(&frame(Opcode::Home));
    fw.tick();
    assert_eq!(fw.motion().state(), MotionState::Homing);

    run_until_settled(&mut fw, 100);
    assert!(fw.motion().is_homed());
    assert_eq!(fw.motion().steppers().position(Axis::R), 6);
    assert_eq!(fw.motion().state(), MotionState::Finished);
}

#[test]
fn partial_frame_across_many_ticks() {
    let mut fw = firmware(1_000); // homing keeps running throughout
    let bytes = position_frame(123, -456);

    // Deliver one byte per tick; the parser parks mid-frame without
    // emitting anything until the last byte lands.
    for &byte in &bytes[..bytes.len() - 1] {
        fw.transport_mut().push_bytes(&[byte]);
        fw.tick();
        assert!(fw.transport_mut().take_tx().is_empty());
    }
    fw.transport_mut().push_bytes(&[bytes[bytes.len() - 1]]);
    fw.tick();

    assert_eq!(fw.transport_mut().take_tx(), frame(Opcode::Ack));
    assert_eq!(fw.queue().occupancy(), 1);
}
