use core::time::Duration;

use jamnet::{
    config::device::DeviceConfig,
    jamnet::{
        mailbox::StoreError,
        packet::{
            Ack, App, DataRequest, DataResponse, DataUplink, DecodeError, JoinRequest,
            JoinResponse, NetworkName, Packet, PacketType, Resp, Scan,
        },
        phy::{Mode, RadioFault, Tuning},
    },
    role::{gateway::RelayState, DeviceRole, Gateway, Outcome},
};

use mock::{Call, MockError, MockRadio, DOWNLINK_HZ, UPLINK_HZ};

const GATEWAY: u16 = 0xCAFE;

fn gateway_config() -> DeviceConfig {
    DeviceConfig::new_gateway(GATEWAY, NetworkName::new("jamnet").unwrap())
}

fn create_gateway() -> Gateway<MockRadio> {
    let mut gateway = Gateway::new(MockRadio::new(), gateway_config());
    gateway.start().unwrap();
    gateway
}

fn submit(gateway: &mut Gateway<MockRadio>, packet: Packet) -> Outcome<MockError> {
    gateway.submit_received_bytes(&packet.encode()).unwrap()
}

fn join(gateway: &mut Gateway<MockRadio>, address: u16) {
    let outcome = submit(
        gateway,
        Packet::JoinRequest(JoinRequest {
            source_address: address,
        }),
    );
    assert_eq!(outcome, Outcome::Replied(PacketType::JoinResponse));
}

fn uplink(target: u16, source: u16, data: &[u8]) -> Packet {
    Packet::DataUplink(DataUplink::new(target, source, App::Button, data).unwrap())
}

fn last_reply(gateway: &Gateway<MockRadio>) -> Packet {
    gateway.arbiter().radio().last_packet().unwrap()
}

#[test]
fn test_relay_scenario() {
    let mut gateway = create_gateway();

    join(&mut gateway, 0x0001);
    assert_eq!(
        last_reply(&gateway),
        Packet::JoinResponse(JoinResponse {
            resp: Resp::Success,
            target_address: GATEWAY,
            source_address: 0x0001,
        })
    );

    submit(&mut gateway, uplink(0x0001, 0x0002, b"abc"));
    assert_eq!(
        last_reply(&gateway),
        Packet::Ack(Ack {
            resp: Resp::Success,
            packet_queue: 1,
            target_address: 0x0001,
        })
    );

    submit(
        &mut gateway,
        Packet::DataRequest(DataRequest {
            source_address: 0x0001,
        }),
    );
    match last_reply(&gateway) {
        Packet::DataResponse(response) => {
            assert_eq!(response.resp, Resp::Success);
            assert_eq!(response.packet_queue, 0);
            assert_eq!(response.packet_length(), 3);
            assert_eq!(response.app, App::Button);
            assert_eq!(&response.data[..], b"abc");
        }
        other => panic!("unexpected {:?}", other),
    }

    let stats = gateway.stats();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.replies, 3);
    assert_eq!(stats.mail_stored, 1);
    assert_eq!(stats.mail_delivered, 1);
}

#[test]
fn test_scan_answered_with_identity() {
    let mut gateway = create_gateway();
    let outcome = submit(&mut gateway, Packet::Scan(Scan { uplink_channel: 10 }));
    assert_eq!(outcome, Outcome::Replied(PacketType::ScanResponse));

    match last_reply(&gateway) {
        Packet::ScanResponse(response) => {
            assert_eq!(response.identity.uplink_channel, 10);
            assert_eq!(response.identity.downlink_channel, 11);
            assert_eq!(response.identity.name.as_str(), Some("jamnet"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(gateway.registry().is_empty());
}

#[test]
fn test_duplicate_join_rejected() {
    let mut gateway = create_gateway();
    join(&mut gateway, 0x0001);
    join(&mut gateway, 0x0001);

    assert_eq!(
        last_reply(&gateway),
        Packet::JoinResponse(JoinResponse {
            resp: Resp::Failure,
            target_address: GATEWAY,
            source_address: 0x0001,
        })
    );
    assert_eq!(gateway.stats().joins_admitted, 1);
    assert_eq!(gateway.stats().joins_rejected, 1);
}

#[test]
fn test_join_for_gateway_address_rejected() {
    let mut gateway = create_gateway();
    join(&mut gateway, GATEWAY);
    match last_reply(&gateway) {
        Packet::JoinResponse(response) => assert_eq!(response.resp, Resp::Failure),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_uplink_to_unknown_destination() {
    let mut gateway = create_gateway();
    submit(&mut gateway, uplink(0x0009, 0x0002, b"x"));
    assert_eq!(
        last_reply(&gateway),
        Packet::Ack(Ack {
            resp: Resp::Failure,
            packet_queue: 0,
            target_address: 0x0009,
        })
    );
    assert_eq!(gateway.mailbox().total(), 0);
}

#[test]
fn test_uplink_to_full_mailbox() {
    let mut gateway = Gateway::new(MockRadio::new(), gateway_config().with_mailbox_capacity(2));
    gateway.start().unwrap();
    join(&mut gateway, 0x0001);

    for _ in 0..2 {
        submit(&mut gateway, uplink(0x0001, 0x0002, b"x"));
    }
    submit(&mut gateway, uplink(0x0001, 0x0002, b"y"));
    assert_eq!(
        last_reply(&gateway),
        Packet::Ack(Ack {
            resp: Resp::Failure,
            packet_queue: 2,
            target_address: 0x0001,
        })
    );
    assert_eq!(gateway.mailbox().depth(0x0001), 2);
}

#[test]
fn test_liveness_probe_reports_source_depth() {
    let mut gateway = create_gateway();
    join(&mut gateway, 0x0001);
    join(&mut gateway, 0x0002);
    submit(&mut gateway, uplink(0x0002, 0x0001, b"a"));
    submit(&mut gateway, uplink(0x0002, 0x0001, b"b"));

    submit(&mut gateway, uplink(GATEWAY, 0x0002, b""));
    assert_eq!(
        last_reply(&gateway),
        Packet::Ack(Ack {
            resp: Resp::Success,
            packet_queue: 2,
            target_address: GATEWAY,
        })
    );
    assert_eq!(gateway.mailbox().total(), 2);
}

#[test]
fn test_data_request_on_empty_mailbox() {
    let mut gateway = create_gateway();
    join(&mut gateway, 0x0001);
    submit(
        &mut gateway,
        Packet::DataRequest(DataRequest {
            source_address: 0x0001,
        }),
    );
    assert_eq!(last_reply(&gateway), Packet::DataResponse(DataResponse::empty()));
}

#[test]
fn test_data_request_reports_remaining_depth() {
    let mut gateway = create_gateway();
    join(&mut gateway, 0x0001);
    for data in [b"1", b"2", b"3"] {
        submit(&mut gateway, uplink(0x0001, 0x0002, data));
    }

    for (expected, remaining) in [(b'1', 2), (b'2', 1), (b'3', 0)] {
        submit(
            &mut gateway,
            Packet::DataRequest(DataRequest {
                source_address: 0x0001,
            }),
        );
        match last_reply(&gateway) {
            Packet::DataResponse(response) => {
                assert_eq!(response.data[0], expected);
                assert_eq!(response.packet_queue, remaining);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn test_malformed_frames_dropped_without_reply() {
    let mut gateway = create_gateway();
    gateway.arbiter_mut().radio_mut().clear_calls();

    assert_eq!(
        gateway.submit_received_bytes(&[0x04, 0x01]).unwrap(),
        Outcome::Dropped(DecodeError::TruncatedPacket {
            expected: 5,
            actual: 1
        })
    );
    assert_eq!(
        gateway.submit_received_bytes(&[0x42]).unwrap(),
        Outcome::Dropped(DecodeError::UnknownType(0x42))
    );
    assert!(gateway.arbiter().radio().calls().is_empty());
    assert_eq!(gateway.stats().dropped, 2);
    assert_eq!(gateway.state(), RelayState::Listening);
}

#[test]
fn test_reply_types_ignored_at_gateway() {
    let mut gateway = create_gateway();
    gateway.arbiter_mut().radio_mut().clear_calls();

    let outcome = submit(
        &mut gateway,
        Packet::Ack(Ack {
            resp: Resp::Success,
            packet_queue: 0,
            target_address: 1,
        }),
    );
    assert_eq!(outcome, Outcome::Ignored(PacketType::Ack));
    assert!(gateway.arbiter().radio().transmitted().is_empty());
}

#[test]
fn test_reply_channel_discipline() {
    let mut gateway = create_gateway();
    gateway.arbiter_mut().radio_mut().clear_calls();

    join(&mut gateway, 0x0001);
    let calls = gateway.arbiter().radio().calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0], Call::SetFrequency(DOWNLINK_HZ));
    assert!(matches!(calls[1], Call::Transmit(_)));
    assert_eq!(calls[2], Call::SetFrequency(UPLINK_HZ));
    assert_eq!(calls[3], Call::StartReceive);
    assert_eq!(gateway.arbiter().mode(), Mode::Listening);
    assert_eq!(gateway.arbiter().tuning(), Some(Tuning::Uplink));
}

#[test]
fn test_transmit_fault_still_resumes_listening() {
    let mut gateway = create_gateway();
    gateway.arbiter_mut().radio_mut().set_fail_transmit(true);
    gateway.arbiter_mut().radio_mut().clear_calls();

    let outcome = submit(&mut gateway, Packet::Scan(Scan { uplink_channel: 10 }));
    assert_eq!(
        outcome,
        Outcome::TransmitFailed {
            packet: PacketType::ScanResponse,
            fault: RadioFault::TransmitFailure(MockError::Error),
        }
    );
    assert_eq!(
        gateway.arbiter().radio().calls(),
        &[
            Call::SetFrequency(DOWNLINK_HZ),
            Call::SetFrequency(UPLINK_HZ),
            Call::StartReceive,
        ]
    );
    assert_eq!(gateway.stats().transmit_faults, 1);
}

#[test]
fn test_failed_resume_is_surfaced() {
    let mut gateway = create_gateway();
    gateway.arbiter_mut().radio_mut().set_fail_frequency(Some(UPLINK_HZ));

    let result = gateway.submit_received_bytes(&Packet::Scan(Scan { uplink_channel: 10 }).encode());
    assert_eq!(
        result,
        Err(RadioFault::TuneFailure {
            channel: 10,
            cause: Some(MockError::Error)
        })
    );
}

#[test]
fn test_gateway_originated_mail() {
    let config = gateway_config().with_default_target(0x0001);
    let mut gateway = Gateway::new(MockRadio::new(), config);
    gateway.start().unwrap();

    assert_eq!(
        gateway.user_transmit_request(App::HelloWorld, b"hi").unwrap(),
        Outcome::Rejected(StoreError::UnknownDestination)
    );

    join(&mut gateway, 0x0001);
    gateway.arbiter_mut().radio_mut().clear_calls();
    assert_eq!(
        gateway.user_transmit_request(App::HelloWorld, b"hi").unwrap(),
        Outcome::Queued { depth: 1 }
    );
    assert!(gateway.arbiter().radio().calls().is_empty());

    let entry = gateway.mailbox().depth(0x0001);
    assert_eq!(entry, 1);
    submit(
        &mut gateway,
        Packet::DataRequest(DataRequest {
            source_address: 0x0001,
        }),
    );
    match last_reply(&gateway) {
        Packet::DataResponse(response) => {
            assert_eq!(response.app, App::HelloWorld);
            assert_eq!(&response.data[..], b"hi");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_user_transmit_without_target() {
    let mut gateway = create_gateway();
    assert_eq!(
        gateway.user_transmit_request(App::Button, b"").unwrap(),
        Outcome::Rejected(StoreError::UnknownDestination)
    );
}

#[test]
fn test_join_time_follows_tick() {
    let mut gateway = create_gateway();
    gateway.tick(Duration::from_secs(42));
    join(&mut gateway, 0x0001);
    assert_eq!(
        gateway.registry().get(0x0001).unwrap().joined_at,
        Duration::from_secs(42)
    );
}
