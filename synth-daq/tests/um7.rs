//! UM7 protocol integration tests over the mock transport.

mod common;

use common::{all_proc_frame, health_frame, um7_sensor};
use synth_daq::transport::MockTransport;
use synth_daq::um7::constants::{CREG_COM_RATES4, DREG_HEALTH, ZERO_GYROS};
use synth_daq::um7::{
    decode, encode, FramingError, Packet, PacketReader, RegisterClient, SensorSession,
    SharedHeartbeat, MAX_ATTEMPTS,
};
use synth_daq::Error;

#[test]
fn test_retry_ceiling_is_exact() {
    // Replies, but always for the wrong register
    let transport = MockTransport::new()
        .with_responder(|_| encode(&Packet::write(DREG_HEALTH, &[0; 4]).unwrap()));
    let handle = transport.clone();
    let mut client = RegisterClient::new(transport).with_response_polls(3);

    match client.write(CREG_COM_RATES4, &[0, 0, 0, 255]) {
        Err(Error::NoResponse { address, attempts }) => {
            assert_eq!(address, CREG_COM_RATES4);
            assert_eq!(attempts, MAX_ATTEMPTS);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(handle.write_count(), MAX_ATTEMPTS as usize);
}

#[test]
fn test_every_transmission_is_the_same_frame() {
    let handle = MockTransport::new();
    let mut client = RegisterClient::new(handle.clone()).with_response_polls(1);
    assert!(client.command(ZERO_GYROS).is_err());

    let written = handle.get_written();
    let frame = encode(&Packet::write(ZERO_GYROS, &[]).unwrap());
    assert_eq!(written.len(), frame.len() * MAX_ATTEMPTS as usize);
    assert!(written.chunks(frame.len()).all(|chunk| chunk == frame.as_slice()));
}

#[test]
fn test_reader_resynchronizes_through_noise() {
    let mut stream = vec![0x00, b's', b'n', 0xFF, b's'];
    stream.extend(health_frame(0x0400));
    // Corrupt one checksum byte of the next frame
    let mut broken = all_proc_frame(&[0.25; 12]);
    let last = broken.len() - 2;
    broken[last] ^= 0x01;
    stream.extend(&broken);
    stream.extend(all_proc_frame(&[0.5; 12]));

    let mut reader = PacketReader::new();
    let mut packets = Vec::new();
    // Feed in awkward chunk sizes
    for chunk in stream.chunks(5) {
        reader.push(chunk);
        while let Some(packet) = reader.next_packet() {
            packets.push(packet);
        }
    }

    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0].address(), DREG_HEALTH);
    assert_eq!(packets[1].register_f32(11), Some(0.5));
    assert_eq!(reader.stats().checksum_errors, 1);
}

#[test]
fn test_checksum_sensitivity() {
    let frame = encode(&Packet::write(0x61, &[1, 2, 3, 4]).unwrap());
    for i in 3..frame.len() - 1 {
        let mut flipped = frame.clone();
        flipped[i] ^= 0x10;
        assert!(
            decode(&flipped).is_err(),
            "flip at byte {} went unnoticed",
            i
        );
    }
    assert_eq!(decode(&frame[..6]), Err(FramingError::Truncated));
}

#[test]
fn test_bring_up_against_sensor_model() {
    let sensor = um7_sensor((0b11 << 26) | (0b101 << 10));
    let shared = SharedHeartbeat::new();
    let mut session = SensorSession::new(RegisterClient::new(sensor), shared.clone());

    session
        .bring_up(&synth_daq::config::SensorConfig::default())
        .unwrap();

    let hb = shared.latest().unwrap();
    assert_eq!(hb.satellites_used, 3);
    assert_eq!(hb.satellites_in_view, 5);
    assert!(hb.faults().is_empty());
    assert_eq!(session.firmware(), Some("U2C1"));
}
