//! Helpers shared by the integration tests

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use aqua_core::Timeout;
use aqua_transport::{TcpConfig, TcpServer, TcpTransport};

/// A connected client/server pair over loopback TCP
pub fn loopback_pair() -> (TcpTransport, TcpTransport) {
    let mut server = TcpServer::bind_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .expect("bind loopback listener");
    let port = server.local_addr().expect("listener address").port();

    let client = TcpTransport::connect(TcpConfig::new("127.0.0.1", port)).expect("connect client");
    let accepted = server
        .accept(Timeout::After(Duration::from_secs(5)))
        .expect("accept client");

    (client, accepted)
}
