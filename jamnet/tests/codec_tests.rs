use jamnet::jamnet::packet::{
    decode, Ack, App, DataRequest, DataResponse, DataUplink, DecodeError, JoinRequest,
    JoinResponse, NetworkIdentity, NetworkName, Packet, PacketType, Resp, Scan, ScanResponse,
    MAX_PAYLOAD_SIZE,
};

fn identity() -> NetworkIdentity {
    NetworkIdentity {
        uplink_channel: 10,
        downlink_channel: 11,
        name: NetworkName::new("jamnet").unwrap(),
    }
}

#[test]
fn test_every_packet_type_round_trips() {
    let packets = [
        Packet::Scan(Scan { uplink_channel: 10 }),
        Packet::ScanResponse(ScanResponse {
            identity: identity(),
        }),
        Packet::JoinRequest(JoinRequest {
            source_address: 0x0042,
        }),
        Packet::JoinResponse(JoinResponse {
            resp: Resp::Success,
            target_address: 0xCAFE,
            source_address: 0x0042,
        }),
        Packet::DataUplink(DataUplink::new(0x0043, 0x0042, App::HelloWorld, b"hello").unwrap()),
        Packet::Ack(Ack {
            resp: Resp::Failure,
            packet_queue: 3,
            target_address: 0x0043,
        }),
        Packet::DataRequest(DataRequest {
            source_address: 0x0043,
        }),
        Packet::DataResponse(DataResponse {
            resp: Resp::Success,
            packet_queue: 0,
            app: App::Other(7),
            data: jamnet::jamnet::Payload::from_slice(&[1, 2, 3]).unwrap(),
        }),
    ];

    for packet in packets.iter() {
        let frame = packet.encode();
        assert_eq!(frame[0], packet.packet_type() as u8);
        assert_eq!(
            frame.len(),
            1 + packet.packet_type().expected_size()
                + match packet {
                    Packet::DataUplink(p) => p.data.len(),
                    Packet::DataResponse(p) => p.data.len(),
                    _ => 0,
                }
        );
        assert_eq!(&Packet::from_bytes(&frame).unwrap(), packet);
    }
}

#[test]
fn test_data_uplink_wire_layout() {
    let packet =
        Packet::DataUplink(DataUplink::new(0x1234, 0xABCD, App::HelloWorld, b"hi").unwrap());
    let frame = packet.encode();
    assert_eq!(
        &frame[..],
        &[0x05, 2, 0x34, 0x12, 0xCD, 0xAB, 1, b'h', b'i']
    );
}

#[test]
fn test_scan_response_carries_name_slot() {
    let frame = Packet::ScanResponse(ScanResponse {
        identity: identity(),
    })
    .encode();
    assert_eq!(frame.len(), 19);
    assert_eq!(&frame[3..9], b"jamnet");
    assert!(frame[9..].iter().all(|b| *b == 0));

    match Packet::from_bytes(&frame).unwrap() {
        Packet::ScanResponse(response) => {
            assert_eq!(response.identity.name.as_str(), Some("jamnet"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_truncated_packets_rejected() {
    assert_eq!(
        Packet::from_bytes(&[]),
        Err(DecodeError::TruncatedPacket {
            expected: 1,
            actual: 0
        })
    );
    assert_eq!(
        decode(0x04, &[1, 0xFE]),
        Err(DecodeError::TruncatedPacket {
            expected: 5,
            actual: 2
        })
    );
    assert_eq!(
        decode(0x02, &[10, 11, b'j']),
        Err(DecodeError::TruncatedPacket {
            expected: 18,
            actual: 3
        })
    );
}

#[test]
fn test_every_short_prefix_is_truncated() {
    for tag in 0x01u8..=0x08 {
        let expected = PacketType::try_from(tag).unwrap().expected_size();
        let zeros = [0u8; 32];
        for len in 0..expected {
            assert_eq!(
                decode(tag, &zeros[..len]),
                Err(DecodeError::TruncatedPacket {
                    expected,
                    actual: len
                }),
                "tag 0x{:02X}, {} bytes",
                tag,
                len
            );
        }
        // A zero length field means the fixed part alone is a whole packet.
        let packet = decode(tag, &zeros[..expected]).unwrap();
        assert_eq!(packet.packet_type() as u8, tag);
    }
}

#[test]
fn test_declared_length_beyond_frame_is_truncation() {
    // Declares 10 bytes of data, carries 3.
    let bytes = [10, 0x43, 0x00, 0x42, 0x00, 0, 1, 2, 3];
    assert_eq!(
        decode(0x05, &bytes),
        Err(DecodeError::TruncatedPacket {
            expected: 16,
            actual: 9
        })
    );
}

#[test]
fn test_declared_length_beyond_slot_is_overflow() {
    let mut bytes = [0u8; 4 + 250];
    bytes[2] = 250;
    assert_eq!(
        decode(0x08, &bytes),
        Err(DecodeError::PayloadOverflow {
            declared: 250,
            capacity: MAX_PAYLOAD_SIZE
        })
    );
}

#[test]
fn test_unknown_type_rejected() {
    assert_eq!(Packet::from_bytes(&[0x09, 0, 0]), Err(DecodeError::UnknownType(0x09)));
    assert_eq!(PacketType::try_from(0x00), Err(DecodeError::UnknownType(0x00)));
}

#[test]
fn test_trailing_bytes_ignored() {
    let packet = decode(0x07, &[0x43, 0x00, 0xFF, 0xFF]).unwrap();
    assert_eq!(
        packet,
        Packet::DataRequest(DataRequest {
            source_address: 0x0043
        })
    );
}

#[test]
fn test_resp_and_app_bytes() {
    assert_eq!(Resp::from(1), Resp::Success);
    assert_eq!(Resp::from(0), Resp::Failure);
    assert_eq!(Resp::from(2), Resp::Failure);
    assert_eq!(u8::from(Resp::Success), 1);

    assert_eq!(App::from(0), App::Button);
    assert_eq!(App::from(1), App::HelloWorld);
    assert_eq!(App::from(9), App::Other(9));
    assert_eq!(u8::from(App::Other(9)), 9);
}

#[test]
fn test_oversized_uplink_rejected_at_construction() {
    let data = [0u8; MAX_PAYLOAD_SIZE + 1];
    assert_eq!(
        DataUplink::new(1, 2, App::Button, &data),
        Err(DecodeError::PayloadOverflow {
            declared: MAX_PAYLOAD_SIZE + 1,
            capacity: MAX_PAYLOAD_SIZE
        })
    );

    let full = [0xAAu8; MAX_PAYLOAD_SIZE];
    let packet = Packet::DataUplink(DataUplink::new(1, 2, App::Button, &full).unwrap());
    assert_eq!(Packet::from_bytes(&packet.encode()).unwrap(), packet);
}

#[test]
fn test_network_name_validation() {
    assert!(NetworkName::new("sixteen-chars-ok").is_ok());
    assert!(NetworkName::new("seventeen-chars!!").is_err());
    assert!(NetworkName::new("tab\tname").is_err());
}
