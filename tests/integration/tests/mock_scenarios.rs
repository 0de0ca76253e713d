use std::time::{Duration, Instant};

use aqua_core::{PollStrategy, ResultBuffer, Timeout, TransportError};
use aqua_transport::{functional, BoundedReader, MockTransport, ReaderConfig, Transport};
use bytes::Bytes;

fn sleepy() -> ReaderConfig {
    ReaderConfig {
        poll: PollStrategy::Sleep(Duration::from_millis(1)),
        ..Default::default()
    }
}

#[test]
fn test_five_byte_handshake() {
    let mut transport = MockTransport::new();
    transport.inject_read(&[0x01, 0x02, 0x03, 0x04, 0x05]);
    let mut reader = BoundedReader::new(&mut transport);

    assert_eq!(reader.pending().unwrap(), 5);
    reader.wait_available(5, Timeout::from_secs_f64(1.0)).unwrap();
    let data = reader.read_exact(5, None).unwrap();
    assert_eq!(data, Bytes::from_static(&[0x01, 0x02, 0x03, 0x04, 0x05]));
}

#[test]
fn test_timeout_lands_inside_window() {
    let mut transport = MockTransport::new();
    transport.inject_read(b"abc");
    let mut reader = BoundedReader::with_config(&mut transport, sleepy());

    let start = Instant::now();
    let result = reader.read_exact(10, Some(Timeout::from_secs_f64(0.2)));
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(TransportError::TimedOut { .. })));
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(700));
}

#[test]
fn test_consecutive_lines_keep_boundaries() {
    let mut transport = MockTransport::new();
    transport.inject_read(b"OK\r\nEXTRA");
    transport.inject_read_after(Duration::from_millis(20), b"\r\n");
    let mut reader = BoundedReader::with_config(&mut transport, sleepy());

    let first = reader.read_line(64, b"\r\n", Timeout::from_secs_f64(1.0)).unwrap();
    let second = reader.read_line(64, b"\r\n", Timeout::from_secs_f64(1.0)).unwrap();
    assert_eq!(first, Bytes::from_static(b"OK\r\n"));
    assert_eq!(first.len(), 4);
    assert_eq!(second, Bytes::from_static(b"EXTRA\r\n"));
}

#[test]
fn test_functional_echo_pipeline() {
    let mut input = MockTransport::closed();
    let mut output = MockTransport::closed();
    input.inject_read(b"frame");

    // Bring both up, shovel one frame across, shut both down
    let frame = functional::read(functional::up(&mut input), 5);
    functional::write(functional::flush_tx(functional::up(&mut output)), &frame);
    functional::down(&mut input);
    functional::down(&mut output);

    assert_eq!(output.written(), b"frame");
    assert_eq!(input.open_calls(), 1);
    assert_eq!(output.close_calls(), 1);
    assert!(!input.is_open());
}

#[test]
fn test_functional_read_closed_then_write_skips() {
    let mut input = MockTransport::closed();
    let mut output = MockTransport::new();

    let frame = functional::read(&mut input, 4);
    assert_eq!(frame, ResultBuffer::unavailable());
    assert!(frame.as_slice().is_err());

    functional::write(&mut output, &frame);
    assert_eq!(output.write_calls(), 0);
}

#[test]
fn test_typed_and_functional_tiers_agree_on_data() {
    let mut transport = MockTransport::new();
    transport.inject_read(b"0123456789");

    let head = functional::read(&mut transport, 4).into_bytes().unwrap();
    let tail = BoundedReader::new(&mut transport)
        .read_exact(6, Some(Timeout::Immediate))
        .unwrap();
    assert_eq!(head, Bytes::from_static(b"0123"));
    assert_eq!(tail, Bytes::from_static(b"456789"));
}
