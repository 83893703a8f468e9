//! End-to-end scenarios: channel → poller → queue → controller → FPGA.

use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::{Value, json};
use thermalctl::Node;
use thermalctl::adapters::loopback::LoopbackChannel;
use thermalctl::app::ack::Ack;
use thermalctl::app::commands::{CommandKind, CommandName};
use thermalctl::app::events::AppEvent;
use thermalctl::error::{AdmissionError, Error, HardwareError};
use thermalctl::fsm::SummaryState;

use crate::harness::{ACK_TIMEOUT, Harness, test_config};
use crate::mock_hw::{MockFpga, RecordingSink, manual_clock, wait_until};

#[test]
fn start_nominal_moves_standby_to_disabled() {
    let h = Harness::start();
    assert_eq!(h.node.state(), SummaryState::Standby);

    let (id, ack) = h.send(CommandName::Start, json!({"settingsToApply": "nominal"}));
    assert_eq!(ack, Ack::Complete);
    assert_eq!(h.node.state(), SummaryState::Disabled);
    assert_eq!(h.channel.acks_for(id), [Ack::InProgress, Ack::Complete]);
    assert!(h.sink.events().contains(&AppEvent::SummaryStateChanged {
        from: SummaryState::Standby,
        to: SummaryState::Disabled,
    }));
}

#[test]
fn start_with_empty_settings_fails_without_queueing() {
    let h = Harness::start();
    let writes_before = h.fpga.command_write_count();

    let (id, ack) = h.send(CommandName::Start, json!({"settingsToApply": ""}));
    assert_eq!(
        ack,
        Ack::Failed {
            code: AdmissionError::MissingSettings.code(),
            message: AdmissionError::MissingSettings.to_string(),
        }
    );
    // Rejected at admission: no in-progress ack, nothing reached the FPGA.
    assert_eq!(h.channel.acks_for(id).len(), 1);
    assert_eq!(h.fpga.command_write_count(), writes_before);
    assert_eq!(h.node.state(), SummaryState::Standby);
}

#[test]
fn undecodable_params_fail_synchronously() {
    let h = Harness::start();
    let (_, ack) = h.send(CommandName::Start, json!({"settings": 5}));
    assert!(matches!(ack, Ack::Failed { code: 102, .. }));
    assert_eq!(h.node.state(), SummaryState::Standby);
}

#[test]
fn command_in_wrong_state_is_refused_at_execution() {
    let h = Harness::start();
    let (id, ack) = h.send(CommandName::Enable, Value::Null);
    assert_eq!(
        ack,
        Ack::Failed {
            code: 202,
            message: "enable not allowed in Standby state".into()
        }
    );
    // It was admitted, so it was queued and acknowledged in progress first.
    assert_eq!(h.channel.acks_for(id)[0], Ack::InProgress);
    assert_eq!(h.node.state(), SummaryState::Standby);
}

#[test]
fn five_ticks_while_enabled_produce_five_updates() {
    let h = Harness::start();
    h.bring_to_enabled();

    for _ in 0..5 {
        h.clock.tick();
    }
    assert!(wait_until(ACK_TIMEOUT, || h.fpga.status_requests() == 5));
    h.settle();
    assert_eq!(h.fpga.status_requests(), 5);
    assert_eq!(
        h.sink.count(|e| matches!(e, AppEvent::ThermalData(t) if t.records.len() == 4)),
        5
    );
}

#[test]
fn disable_after_third_tick_stops_updates() {
    let h = Harness::start();
    h.bring_to_enabled();

    for tick in 1..=5 {
        h.clock.tick();
        if tick == 3 {
            assert!(wait_until(ACK_TIMEOUT, || h.fpga.status_requests() == 3));
            assert_eq!(h.send(CommandName::Disable, Value::Null).1, Ack::Complete);
            assert_eq!(h.node.state(), SummaryState::Disabled);
        }
    }
    h.settle();
    assert_eq!(h.fpga.status_requests(), 3);
}

#[test]
fn ticks_before_enable_are_skipped() {
    let h = Harness::start();
    for _ in 0..3 {
        h.clock.tick();
    }
    h.settle();
    assert_eq!(h.fpga.status_requests(), 0);
}

#[test]
fn hardware_fault_fails_command_and_next_one_runs() {
    let h = Harness::start();

    h.fpga.fail_writes.store(true, Ordering::SeqCst);
    let ack = h.start_cmd("nominal");
    assert!(
        matches!(ack, Ack::Failed { code: 201, .. }),
        "expected hardware failure, got {ack:?}"
    );
    assert_eq!(h.node.state(), SummaryState::Standby);

    h.fpga.fail_writes.store(false, Ordering::SeqCst);
    assert_eq!(h.start_cmd("nominal"), Ack::Complete);
    assert_eq!(h.node.state(), SummaryState::Disabled);
    assert!(h.node.metrics().failed >= 1);
}

#[test]
fn update_fault_moves_to_fault_and_standby_recovers() {
    let h = Harness::start();
    h.bring_to_enabled();

    h.fpga.fail_reads.store(true, Ordering::SeqCst);
    h.clock.tick();
    assert!(wait_until(ACK_TIMEOUT, || h.node.state() == SummaryState::Fault));

    // Fault is not active: ticks no longer produce work.
    h.fpga.fail_reads.store(false, Ordering::SeqCst);
    let requests = h.fpga.status_requests();
    h.clock.tick();
    h.settle();
    assert_eq!(h.fpga.status_requests(), requests);

    // Best-effort disable was sent to the ILCs.
    assert_eq!(h.fpga.last_mode(), Some(1));

    assert!(matches!(
        h.send(CommandName::Enable, Value::Null).1,
        Ack::Failed { code: 202, .. }
    ));
    assert_eq!(h.send(CommandName::Standby, Value::Null).1, Ack::Complete);
    assert_eq!(h.node.state(), SummaryState::Standby);
}

#[test]
fn panicking_command_is_isolated() {
    let h = Harness::start();

    h.fpga.panic_on_write.store(true, Ordering::SeqCst);
    let ack = h.start_cmd("nominal");
    assert!(matches!(ack, Ack::Failed { code: 204, .. }), "got {ack:?}");

    h.fpga.panic_on_write.store(false, Ordering::SeqCst);
    assert_eq!(h.start_cmd("nominal"), Ack::Complete);

    let m = h.node.metrics();
    assert_eq!(m.panicked, 1);
    assert_eq!(m.max_concurrent, 1);
}

#[test]
fn every_external_command_gets_exactly_one_terminal_ack() {
    let h = Harness::start();
    let mut ids = vec![
        h.channel.submit(CommandName::Enable, Value::Null),
        h.channel.submit(CommandName::Start, json!({"settingsToApply": ""})),
        h.channel.submit(CommandName::Start, json!({"settingsToApply": "a"})),
        h.channel.submit(CommandName::Enable, Value::Null),
        h.channel.submit(CommandName::Disable, json!([1])),
        h.channel.submit(CommandName::Disable, Value::Null),
        h.channel.submit(CommandName::Standby, Value::Null),
        h.channel.submit(CommandName::ExitControl, Value::Null),
    ];
    for _ in 0..3 {
        h.clock.tick();
    }
    ids.push(h.channel.submit(CommandName::Start, json!({"settingsToApply": "b"})));

    for &id in &ids {
        assert!(h.channel.wait_terminal(id, ACK_TIMEOUT).is_some(), "#{id}");
    }
    h.settle();

    for &id in &ids {
        let acks = h.channel.acks_for(id);
        let terminal = acks.iter().filter(|a| a.is_terminal()).count();
        assert_eq!(terminal, 1, "#{id}: {acks:?}");
        assert!(acks.last().unwrap().is_terminal(), "#{id}: {acks:?}");
    }
}

#[test]
fn set_log_level_is_handled_inline() {
    let h = Harness::start();
    let previous = log::max_level();

    let (id, ack) = h.send(CommandName::SetLogLevel, json!({"level": 30}));
    assert_eq!(ack, Ack::Complete);
    assert_eq!(h.channel.acks_for(id), [Ack::Complete]);
    assert!(wait_until(ACK_TIMEOUT, || h
        .sink
        .events()
        .contains(&AppEvent::LogLevel(30))));
    assert_eq!(log::max_level(), log::LevelFilter::Warn);

    log::set_max_level(previous);
}

#[test]
fn exit_control_unblocks_wait_and_shutdown_closes_fpga() {
    let h = Harness::start();
    assert!(!h.node.wait_for_exit_timeout(Duration::from_millis(5)));

    assert_eq!(h.send(CommandName::ExitControl, Value::Null).1, Ack::Complete);
    assert!(h.node.wait_for_exit_timeout(ACK_TIMEOUT));
    assert!(h.node.exit_requested());
    // Already raised: returns at once.
    h.node.wait_for_exit();
    assert!(h.sink.events().contains(&AppEvent::ExitRequested));

    let fpga = h.fpga.clone();
    let service = h.node.shutdown().unwrap();
    assert_eq!(service.state(), SummaryState::Standby);
    assert!(fpga.closed.load(Ordering::SeqCst));
    assert!(fpga.finalized.load(Ordering::SeqCst));
}

#[test]
fn shutdown_fails_commands_left_in_queue() {
    let h = Harness::start();
    h.fpga.write_delay_ms.store(300, Ordering::SeqCst);

    let slow = h.channel.submit(CommandName::Start, json!({"settingsToApply": "slow"}));
    let queued: Vec<i32> = (0..3)
        .map(|_| h.channel.submit(CommandName::Standby, Value::Null))
        .collect();
    let last = *queued.last().unwrap();
    assert!(wait_until(ACK_TIMEOUT, || !h.channel.acks_for(last).is_empty()));

    let channel = h.channel.clone();
    let service = h.node.shutdown().unwrap();

    // The in-flight command finished; the rest were failed, not dropped.
    assert_eq!(channel.acks_for(slow).last(), Some(&Ack::Complete));
    for id in queued {
        let acks = channel.acks_for(id);
        assert_eq!(acks.len(), 2, "#{id}: {acks:?}");
        assert!(matches!(acks[1], Ack::Failed { code: 203, .. }), "#{id}: {acks:?}");
    }
    assert_eq!(service.state(), SummaryState::Disabled);
}

#[test]
fn direct_submission_runs_through_the_queue() {
    let h = Harness::start();
    h.node
        .submit(CommandKind::Start {
            settings_to_apply: "direct".into(),
        })
        .unwrap();
    assert!(wait_until(ACK_TIMEOUT, || h.node.state() == SummaryState::Disabled));

    let err = h
        .node
        .submit(CommandKind::Start {
            settings_to_apply: String::new(),
        })
        .unwrap_err();
    assert_eq!(err, AdmissionError::MissingSettings);
}

#[test]
fn fpga_init_failure_is_fatal() {
    let (fpga, control) = MockFpga::new();
    control.fail_init.store(true, Ordering::SeqCst);
    let (_clock, ticker) = manual_clock();
    let result = Node::start_with_ticker(
        &test_config(),
        fpga,
        std::sync::Arc::new(LoopbackChannel::new()),
        RecordingSink::new(),
        ticker,
    );
    assert!(matches!(
        result,
        Err(Error::Hardware(HardwareError::Init(_)))
    ));
}

#[test]
fn invalid_config_is_rejected_before_touching_hardware() {
    let (fpga, control) = MockFpga::new();
    let mut config = test_config();
    config.outer_loop_period_ms = 0;
    let result = Node::start(
        &config,
        fpga,
        std::sync::Arc::new(LoopbackChannel::new()),
        RecordingSink::new(),
    );
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(!control.finalized.load(Ordering::SeqCst));
}
