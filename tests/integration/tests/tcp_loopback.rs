use std::time::Duration;

use aqua_core::{PollStrategy, ResultBuffer, Timeout, TransportError};
use aqua_transport::{functional, BoundedReader, LineTimeout, ReaderConfig, Transport};
use bytes::Bytes;
use integration_tests::loopback_pair;

#[test]
fn test_request_reply_over_loopback() {
    let (mut client, mut server) = loopback_pair();

    functional::write(&mut client, &ResultBuffer::from_slice(b"HELLO\n"));

    let mut server_reader = BoundedReader::new(&mut server);
    let request = server_reader
        .read_line(64, b"\n", Timeout::After(Duration::from_secs(2)))
        .unwrap();
    assert_eq!(request, Bytes::from_static(b"HELLO\n"));
    server_reader.write_all_once(b"WORLD\r\n").unwrap();

    let reply = BoundedReader::new(&mut client)
        .read_line(64, b"\r\n", Timeout::After(Duration::from_secs(2)))
        .unwrap();
    assert_eq!(reply, Bytes::from_static(b"WORLD\r\n"));
}

#[test]
fn test_exact_read_waits_for_trickle() {
    let (mut client, mut server) = loopback_pair();

    let writer = std::thread::spawn(move || {
        for chunk in [&b"ab"[..], b"cd", b"ef"] {
            server.write_once(chunk).unwrap();
            std::thread::sleep(Duration::from_millis(20));
        }
        server
    });

    let config = ReaderConfig {
        poll: PollStrategy::Sleep(Duration::from_millis(1)),
        line_timeout: LineTimeout::WholeLine,
        cancel: None,
    };
    let data = BoundedReader::with_config(&mut client, config)
        .read_exact(6, Some(Timeout::After(Duration::from_secs(2))))
        .unwrap();
    assert_eq!(data, Bytes::from_static(b"abcdef"));
    let _server = writer.join().unwrap();
}

#[test]
fn test_large_exact_read_over_loopback() {
    let (mut client, mut server) = loopback_pair();
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let expected = payload.clone();

    let writer = std::thread::spawn(move || {
        let mut sent = 0;
        while sent < payload.len() {
            sent += server.write_once(&payload[sent..]).unwrap();
        }
        server
    });

    let config = ReaderConfig {
        poll: PollStrategy::Sleep(Duration::from_millis(1)),
        ..Default::default()
    };
    let data = BoundedReader::with_config(&mut client, config)
        .read_exact(10_000, Some(Timeout::After(Duration::from_secs(5))))
        .unwrap();
    assert_eq!(&data[..], &expected[..]);
    let _server = writer.join().unwrap();
}

#[test]
fn test_silent_peer_times_out() {
    let (mut client, _server) = loopback_pair();
    let result = BoundedReader::new(&mut client).read_line(16, b"\n", Timeout::from_millis(50));
    assert!(matches!(result, Err(TransportError::TimedOut { .. })));
}

#[test]
fn test_functional_read_after_down_is_unavailable() {
    let (mut client, mut server) = loopback_pair();
    server.write_once(b"data").unwrap();

    functional::down(&mut client);
    assert!(!client.is_open());
    assert!(!functional::read(&mut client, 4).is_available());

    // The listener is gone, so reconnecting fails and up() swallows the error
    assert!(!functional::up(&mut client).is_open());
}
