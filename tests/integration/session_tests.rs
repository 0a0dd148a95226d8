//! Tag session behaviour through the service: connect preconditions,
//! ordered I/O on the worker, capacity checks, tag loss and legacy
//! one-shot writes.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use crate::mock_nfc::{
    Bridge, MockNdef, MockTag, TechCall, WAIT, eventually, responder, text_message, wait,
};

use nfcbridge::session::SessionState;
use nfcbridge::{CommandOutput, NdefMessage, NdefRecord, NfcError, Responder, TagIoError};

// ── Connect preconditions ─────────────────────────────────────

#[test]
fn connect_without_detected_tag_fails() {
    let bridge = Bridge::new();
    assert_eq!(bridge.connect(), Err(NfcError::NoTagDetected));
    assert!(!bridge.service.is_connected());
}

#[test]
fn connect_to_unsupported_tag_fails() {
    let bridge = Bridge::new();
    bridge.discover(MockTag::bare(&[9]));
    assert_eq!(bridge.connect(), Err(NfcError::TagUnsupported));
    assert!(!bridge.service.is_connected());
}

#[test]
fn second_connect_is_rejected_until_close() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[1, 2, 3], MockNdef::new(64));
    bridge.discover(tag);

    assert_eq!(bridge.connect(), Ok(CommandOutput::Done));
    assert_eq!(bridge.service.session_state(), Some(SessionState::Connected));
    assert_eq!(bridge.connect(), Err(NfcError::AlreadyConnected));

    assert_eq!(bridge.close(), Ok(CommandOutput::Done));
    assert!(!bridge.service.is_connected());
    assert_eq!(bridge.connect(), Ok(CommandOutput::Done));
    assert_eq!(
        ndef.calls(),
        vec![TechCall::Connect, TechCall::Close, TechCall::Connect]
    );
    bridge.close().unwrap();
}

#[test]
fn commands_without_session_report_not_connected() {
    let bridge = Bridge::new();
    assert_eq!(bridge.close(), Err(NfcError::NotConnected));
    assert_eq!(
        bridge.run(|s, r| s.read_ndef(r)),
        Err(NfcError::NotConnected)
    );
    assert_eq!(
        bridge.run(|s, r| s.write_ndef(text_message("x"), r)),
        Err(NfcError::NotConnected)
    );
}

#[test]
fn ordinary_connect_failure_keeps_session_open() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[1], MockNdef::new(64));
    ndef.fail_next(TechCall::Connect, TagIoError::Io("timeout".into()));
    bridge.discover(tag);

    let err = bridge.connect().unwrap_err();
    assert_eq!(err.to_string(), "NFC tag connect failed: timeout");
    assert!(bridge.service.is_connected());
    assert_eq!(
        bridge.service.session_state(),
        Some(SessionState::ConnectFailed)
    );
    assert_eq!(bridge.close(), Ok(CommandOutput::Done));
}

// ── Ordered I/O ───────────────────────────────────────────────

#[test]
fn requests_run_in_issue_order_behind_a_slow_connect() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[7], MockNdef::new(64));
    let release = ndef.hold_connect();
    bridge.discover(tag);

    let (connect_reply, connect_rx) = responder();
    let (write_reply, write_rx) = responder();
    let (read_reply, read_rx) = responder();
    bridge.service.connect(connect_reply);
    bridge.service.write_ndef(text_message("first"), write_reply);
    bridge.service.read_ndef(read_reply);

    // Nothing has reached the hardware while the connect is held.
    assert!(write_rx.try_recv().is_err());
    release.send(()).unwrap();

    assert_eq!(wait(&connect_rx), Ok(CommandOutput::Done));
    assert_eq!(wait(&write_rx), Ok(CommandOutput::Done));
    assert_eq!(
        wait(&read_rx),
        Ok(CommandOutput::Message(Some(text_message("first"))))
    );
    assert_eq!(
        ndef.calls(),
        vec![TechCall::Connect, TechCall::Write, TechCall::Read]
    );
    bridge.close().unwrap();
}

#[test]
fn close_waits_for_a_held_write_and_answers_last() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[7], MockNdef::new(64));
    bridge.discover(tag);
    bridge.connect().unwrap();
    let release = ndef.hold_write();

    let (tx, rx) = mpsc::channel();
    let answer = |label: &'static str| -> Responder {
        let tx = tx.clone();
        Box::new(move |r| {
            let _ = tx.send((label, r));
        })
    };
    bridge.service.write_ndef(text_message("slow"), answer("write"));
    bridge.service.read_ndef(answer("read"));
    bridge.service.close(answer("close"));

    // The slot is free at once; the hardware is not closed yet.
    assert!(!bridge.service.is_connected());
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert!(!ndef.calls().contains(&TechCall::Close));
    release.send(()).unwrap();

    let answers: Vec<_> = (0..3).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
    assert_eq!(
        answers,
        vec![
            ("write", Ok(CommandOutput::Done)),
            ("read", Ok(CommandOutput::Message(Some(text_message("slow"))))),
            ("close", Ok(CommandOutput::Done)),
        ]
    );
    assert_eq!(
        ndef.calls(),
        vec![TechCall::Connect, TechCall::Write, TechCall::Read, TechCall::Close]
    );
}

#[test]
fn a_long_backlog_behind_a_slow_connect_is_never_refused() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[7], MockNdef::new(64).with_message(text_message("x")));
    let release = ndef.hold_connect();
    bridge.discover(tag);

    let (connect_reply, connect_rx) = responder();
    bridge.service.connect(connect_reply);
    let reads: Vec<_> = (0..40)
        .map(|_| {
            let (reply, rx) = responder();
            bridge.service.read_ndef(reply);
            rx
        })
        .collect();
    release.send(()).unwrap();

    assert_eq!(wait(&connect_rx), Ok(CommandOutput::Done));
    for rx in &reads {
        assert_eq!(wait(rx), Ok(CommandOutput::Message(Some(text_message("x")))));
    }
    assert_eq!(ndef.calls().iter().filter(|c| **c == TechCall::Read).count(), 40);
    bridge.close().unwrap();
}

#[test]
fn read_returns_the_stored_message() {
    let bridge = Bridge::new();
    let stored = text_message("stored");
    let (tag, _) = MockTag::ndef(&[1], MockNdef::new(64).with_message(stored.clone()));
    bridge.discover(tag);
    bridge.connect().unwrap();

    assert_eq!(
        bridge.run(|s, r| s.read_ndef(r)),
        Ok(CommandOutput::Message(Some(stored)))
    );
    bridge.close().unwrap();
}

#[test]
fn read_failure_is_reported_and_session_survives() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[1], MockNdef::new(64));
    bridge.discover(tag);
    bridge.connect().unwrap();

    ndef.fail_next(TechCall::Read, TagIoError::Io("bad CRC".into()));
    let err = bridge.run(|s, r| s.read_ndef(r)).unwrap_err();
    assert_eq!(err.to_string(), "NDEF read error: bad CRC");
    assert_eq!(bridge.service.session_state(), Some(SessionState::Connected));
    assert_eq!(bridge.events.count("tag-lost"), 0);
    bridge.close().unwrap();
}

#[test]
fn read_on_formatable_tag_fails_at_once() {
    let bridge = Bridge::new();
    let (tag, _) = MockTag::formatable(&[5]);
    bridge.discover(tag);
    bridge.connect().unwrap();
    assert_eq!(bridge.run(|s, r| s.read_ndef(r)), Err(NfcError::NotNdef));
    bridge.close().unwrap();
}

// ── Writes ────────────────────────────────────────────────────

#[test]
fn write_to_read_only_tag_is_refused() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[1], MockNdef::new(64).read_only());
    bridge.discover(tag);
    bridge.connect().unwrap();

    let err = bridge
        .run(|s, r| s.write_ndef(text_message("x"), r))
        .unwrap_err();
    assert_eq!(err, NfcError::ReadOnly);
    assert!(!ndef.calls().contains(&TechCall::Write));
    bridge.close().unwrap();
}

#[test]
fn capacity_boundary_uses_exact_encoded_length() {
    let message = NdefMessage::new(vec![NdefRecord::mime("text/plain", vec![0x41; 40])]).unwrap();
    let size = message.byte_len();

    for (capacity, fits) in [(size, true), (size - 1, false)] {
        let bridge = Bridge::new();
        let (tag, ndef) = MockTag::ndef(&[1], MockNdef::new(capacity));
        bridge.discover(tag);
        bridge.connect().unwrap();

        let msg = message.clone();
        let result = bridge.run(move |s, r| s.write_ndef(msg, r));
        if fits {
            assert_eq!(result, Ok(CommandOutput::Done));
            assert_eq!(ndef.stored.lock().unwrap().as_ref(), Some(&message));
        } else {
            assert_eq!(result, Err(NfcError::TooLarge { capacity, size }));
            assert!(!ndef.calls().contains(&TechCall::Write));
        }
        bridge.close().unwrap();
    }
}

#[test]
fn formatable_tag_is_formatted_with_the_message() {
    let bridge = Bridge::new();
    let (tag, formatable) = MockTag::formatable(&[5]);
    bridge.discover(tag);
    bridge.connect().unwrap();

    let result = bridge.run(|s, r| s.write_ndef(text_message("fresh"), r));
    assert_eq!(result, Ok(CommandOutput::Done));
    assert_eq!(
        formatable.formatted.lock().unwrap().as_ref(),
        Some(&text_message("fresh"))
    );
    bridge.close().unwrap();
}

// ── Tag loss ──────────────────────────────────────────────────

fn assert_torn_down(bridge: &Bridge, ndef: &MockNdef) {
    assert!(eventually(|| !bridge.service.is_connected()));
    assert_eq!(bridge.events.count("tag-lost"), 1);
    assert_eq!(bridge.service.detected_tag_id(), None);
    assert_eq!(ndef.calls().last(), Some(&TechCall::Close));
}

#[test]
fn tag_loss_during_connect_tears_down() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[1], MockNdef::new(64));
    ndef.fail_next(TechCall::Connect, TagIoError::TagLost);
    bridge.discover(tag);

    assert_eq!(bridge.connect(), Err(NfcError::TagLost));
    assert_torn_down(&bridge, &ndef);
}

#[test]
fn tag_loss_during_read_tears_down() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[1], MockNdef::new(64));
    bridge.discover(tag);
    bridge.connect().unwrap();

    ndef.fail_next(TechCall::Read, TagIoError::TagLost);
    let err = bridge.run(|s, r| s.read_ndef(r)).unwrap_err();
    assert_eq!(err.to_string(), "Tag left the field");
    assert_torn_down(&bridge, &ndef);
}

#[test]
fn tag_loss_during_write_tears_down_and_fails_queued_work() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[1], MockNdef::new(64));
    bridge.discover(tag);
    bridge.connect().unwrap();

    ndef.fail_next(TechCall::Write, TagIoError::TagLost);
    let (write_reply, write_rx) = responder();
    let (read_reply, read_rx) = responder();
    bridge.service.write_ndef(text_message("x"), write_reply);
    bridge.service.read_ndef(read_reply);

    assert_eq!(wait(&write_rx), Err(NfcError::TagLost));
    assert_eq!(wait(&read_rx), Err(NfcError::NotConnected));
    assert_torn_down(&bridge, &ndef);
    assert_eq!(bridge.close(), Err(NfcError::NotConnected));
}

#[test]
fn tag_loss_keeps_a_newer_detected_tag() {
    let bridge = Bridge::new();
    let (old_tag, ndef) = MockTag::ndef(&[1], MockNdef::new(64));
    bridge.discover(old_tag);
    bridge.connect().unwrap();

    let (new_tag, _) = MockTag::ndef(&[2], MockNdef::new(64));
    bridge.discover(new_tag);

    ndef.fail_next(TechCall::Read, TagIoError::TagLost);
    assert_eq!(bridge.run(|s, r| s.read_ndef(r)), Err(NfcError::TagLost));
    assert!(eventually(|| !bridge.service.is_connected()));
    assert_eq!(bridge.service.detected_tag_id(), Some(vec![2]));
    assert_eq!(bridge.connect(), Ok(CommandOutput::Done));
    bridge.close().unwrap();
}

// ── Legacy one-shot write ─────────────────────────────────────

#[test]
fn write_tag_without_connect_leaves_no_session() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[1], MockNdef::new(64));
    bridge.discover(tag);

    let result = bridge.run(|s, r| s.write_tag(text_message("legacy"), r));
    assert_eq!(result, Ok(CommandOutput::Done));
    assert!(!bridge.service.is_connected());
    assert!(eventually(|| ndef.calls().last() == Some(&TechCall::Close)));
    assert_eq!(
        ndef.calls(),
        vec![TechCall::Connect, TechCall::Write, TechCall::Close]
    );

    assert_eq!(bridge.connect(), Ok(CommandOutput::Done));
    bridge.close().unwrap();
}

#[test]
fn write_tag_uses_an_open_session() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[1], MockNdef::new(64));
    bridge.discover(tag);
    bridge.connect().unwrap();

    let result = bridge.run(|s, r| s.write_tag(text_message("same"), r));
    assert_eq!(result, Ok(CommandOutput::Done));
    assert!(bridge.service.is_connected());
    assert_eq!(ndef.calls(), vec![TechCall::Connect, TechCall::Write]);
    bridge.close().unwrap();
}

#[test]
fn write_tag_inline_connect_failure_is_reported() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[1], MockNdef::new(64));
    ndef.fail_next(TechCall::Connect, TagIoError::Io("no answer".into()));
    bridge.discover(tag);

    let err = bridge
        .run(|s, r| s.write_tag(text_message("x"), r))
        .unwrap_err();
    assert_eq!(err.to_string(), "NFC tag connect failed: no answer");
    assert!(!ndef.calls().contains(&TechCall::Write));
    assert!(!bridge.service.is_connected());
}

#[test]
fn write_tag_inline_tag_loss_emits_tag_lost() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[1], MockNdef::new(64));
    ndef.fail_next(TechCall::Connect, TagIoError::TagLost);
    bridge.discover(tag);

    assert_eq!(
        bridge.run(|s, r| s.write_tag(text_message("x"), r)),
        Err(NfcError::TagLost)
    );
    assert_torn_down(&bridge, &ndef);
}

#[test]
fn write_tag_without_detected_tag_fails() {
    let bridge = Bridge::new();
    assert_eq!(
        bridge.run(|s, r| s.write_tag(text_message("x"), r)),
        Err(NfcError::NoTagDetected)
    );
}

#[test]
fn close_failure_is_reported() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[1], MockNdef::new(64));
    bridge.discover(tag);
    bridge.connect().unwrap();

    ndef.fail_next(TechCall::Close, TagIoError::Io("busy".into()));
    let err = bridge.close().unwrap_err();
    assert_eq!(err.to_string(), "Failed to close NFC tag connection: busy");
    assert!(!bridge.service.is_connected());
}

#[test]
fn sessions_are_independent_of_the_tag_handle() {
    // The detected slot keeps the tag alive; dropping ours changes nothing.
    let bridge = Bridge::new();
    let (tag, _) = MockTag::ndef(&[3], MockNdef::new(64));
    bridge.discover(Arc::clone(&tag));
    drop(tag);
    assert_eq!(bridge.connect(), Ok(CommandOutput::Done));
    bridge.close().unwrap();
}
