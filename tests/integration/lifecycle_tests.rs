//! Pause / resume / destroy and adapter availability.

use std::sync::Arc;

use crate::mock_nfc::{
    AdapterCall, Bridge, MockAdapter, MockNdef, MockProvider, MockTag, RecordingSink, TechCall,
    text_message,
};

use nfcbridge::adapters::control::InlineControl;
use nfcbridge::app::ports::EventSink;
use nfcbridge::dispatch::Interest;
use nfcbridge::{BridgeConfig, NfcError, NfcPorts, NfcService};

fn service_with(adapter: Option<Arc<MockAdapter>>) -> NfcService {
    let ports = NfcPorts {
        adapters: Arc::new(MockProvider { adapter }),
        control: Arc::new(InlineControl),
        events: Arc::new(RecordingSink::default()) as Arc<dyn EventSink>,
    };
    NfcService::new(BridgeConfig::default(), ports).unwrap()
}

#[test]
fn pause_disables_dispatch_and_push_and_drops_the_adapter() {
    let bridge = Bridge::new();
    assert!(bridge.service.adapter_active());

    bridge.service.on_pause();
    assert!(!bridge.service.adapter_active());
    let calls = bridge.adapter.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[AdapterCall::DisableDispatch, AdapterCall::DisablePush]
    );
}

#[test]
fn resume_reinstalls_registration_and_reapplies_p2p() {
    let bridge = Bridge::new();
    bridge.service.register(Interest::ndef());
    bridge.service.share_tag(text_message("p2p"));
    bridge.service.on_pause();

    bridge.service.on_resume();
    let calls = bridge.adapter.calls();
    let tail = &calls[calls.len() - 2..];
    assert!(matches!(&tail[0], AdapterCall::EnableDispatch(r) if r.tech_lists.len() == 1));
    assert_eq!(tail[1], AdapterCall::EnablePush(text_message("p2p")));
}

#[test]
fn share_while_backgrounded_is_applied_on_resume() {
    let bridge = Bridge::backgrounded();
    bridge.service.share_tag(text_message("later"));
    assert!(bridge.adapter.calls().is_empty());
    assert_eq!(bridge.service.p2p_message(), Some(text_message("later")));

    bridge.service.on_resume();
    assert_eq!(
        bridge.adapter.calls().last(),
        Some(&AdapterCall::EnablePush(text_message("later")))
    );
}

#[test]
fn resume_with_adapter_still_held_is_ignored() {
    let bridge = Bridge::new();
    let before = bridge.adapter.calls().len();
    bridge.service.on_resume();
    assert_eq!(bridge.adapter.calls().len(), before);
}

#[test]
fn destroy_reaps_a_leaked_session() {
    let bridge = Bridge::new();
    let (tag, ndef) = MockTag::ndef(&[1], MockNdef::new(64));
    bridge.discover(tag);
    bridge.connect().unwrap();

    bridge.service.on_destroy();
    assert!(!bridge.service.is_connected());
    assert_eq!(ndef.calls(), vec![TechCall::Connect, TechCall::Close]);

    // Idempotent once the slot is empty.
    bridge.service.on_destroy();
    assert_eq!(ndef.calls().len(), 2);
}

#[test]
fn init_reports_missing_or_disabled_adapter() {
    assert_eq!(service_with(None).init(), Err(NfcError::NoNfc));
    let disabled = Arc::new(MockAdapter::new(false));
    assert_eq!(service_with(Some(disabled)).init(), Err(NfcError::NfcDisabled));
}

#[test]
fn device_without_nfc_never_holds_an_adapter() {
    let service = service_with(None);
    service.on_resume();
    assert!(!service.adapter_active());
    service.register(Interest::tag());
    service.on_pause();
}

#[test]
fn invalid_config_is_rejected() {
    let ports = NfcPorts {
        adapters: Arc::new(MockProvider { adapter: None }),
        control: Arc::new(InlineControl),
        events: Arc::new(RecordingSink::default()) as Arc<dyn EventSink>,
    };
    let config = BridgeConfig {
        worker_stack_kb: 1,
        ..BridgeConfig::default()
    };
    assert!(matches!(
        NfcService::new(config, ports),
        Err(NfcError::Config(_))
    ));
}
